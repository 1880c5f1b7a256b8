//! Postcode prefix to area derivation.
//!
//! The mapping is data: an ordered `(prefix, area)` table. The longest matching
//! prefix wins and equal-length matches resolve to the earliest declared rule.
//! A prefix ending in a letter only matches when the next postcode character is
//! not a letter, so `S` (Sheffield) never captures `SA1` or `SW1A`.

use std::sync::OnceLock;

pub const FALLBACK_AREA: &str = "Other";

const DEFAULT_RULES: &[(&str, &str)] = &[
    ("M", "Manchester"),
    ("M5", "Salford"),
    ("M6", "Salford"),
    ("M7", "Salford"),
    ("SK", "Stockport"),
    ("LS", "Leeds"),
    ("BD", "Bradford"),
    ("L", "Liverpool"),
    ("B", "Birmingham"),
    ("CV", "Coventry"),
    ("BS", "Bristol"),
    ("BA", "Bath"),
    ("S", "Sheffield"),
    ("NG", "Nottingham"),
    ("NE", "Newcastle"),
    ("LE", "Leicester"),
    ("OX", "Oxford"),
    ("CB", "Cambridge"),
    ("EH", "Edinburgh"),
    ("G", "Glasgow"),
    ("CF", "Cardiff"),
    ("YO", "York"),
    ("E", "London"),
    ("EC", "London"),
    ("N", "London"),
    ("NW", "London"),
    ("SE", "London"),
    ("SW", "London"),
    ("W", "London"),
    ("WC", "London"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaRule {
    pub prefix: String,
    pub area: String,
}

#[derive(Debug, Clone)]
pub struct AreaRuleTable {
    rules: Vec<AreaRule>,
}

impl AreaRuleTable {
    pub fn new<P, A>(rules: impl IntoIterator<Item = (P, A)>) -> Self
    where
        P: Into<String>,
        A: Into<String>,
    {
        let rules = rules
            .into_iter()
            .map(|(prefix, area)| AreaRule {
                prefix: normalize_postcode(&prefix.into()),
                area: area.into(),
            })
            .collect();
        Self { rules }
    }

    pub fn standard() -> &'static AreaRuleTable {
        static STANDARD: OnceLock<AreaRuleTable> = OnceLock::new();
        STANDARD.get_or_init(|| AreaRuleTable::new(DEFAULT_RULES.iter().copied()))
    }

    pub fn rules(&self) -> &[AreaRule] {
        &self.rules
    }

    /// The stored spelling of an area name, matched case-insensitively.
    pub fn canonical_area(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        if name.eq_ignore_ascii_case(FALLBACK_AREA) {
            return Some(FALLBACK_AREA);
        }
        self.rules
            .iter()
            .map(|rule| rule.area.as_str())
            .find(|area| area.eq_ignore_ascii_case(name))
    }

    pub fn derive_area(&self, postcode: &str) -> &str {
        let normalized = normalize_postcode(postcode);
        let mut best: Option<&AreaRule> = None;

        for rule in &self.rules {
            if !prefix_matches(&normalized, &rule.prefix) {
                continue;
            }
            // Strictly longer only: equal lengths keep the earlier rule.
            if best.map_or(true, |current| rule.prefix.len() > current.prefix.len()) {
                best = Some(rule);
            }
        }

        best.map(|rule| rule.area.as_str()).unwrap_or(FALLBACK_AREA)
    }
}

pub fn normalize_postcode(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ch.is_whitespace())
        .map(|ch| ch.to_ascii_uppercase())
        .collect()
}

fn prefix_matches(postcode: &str, prefix: &str) -> bool {
    if prefix.is_empty() || !postcode.starts_with(prefix) {
        return false;
    }

    let ends_alphabetic = prefix
        .chars()
        .last()
        .map(|ch| ch.is_ascii_alphabetic())
        .unwrap_or(false);

    if !ends_alphabetic {
        return true;
    }

    postcode[prefix.len()..]
        .chars()
        .next()
        .map_or(true, |next| !next.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_city_from_outward_code() {
        let table = AreaRuleTable::standard();
        assert_eq!(table.derive_area("M14 5TH"), "Manchester");
        assert_eq!(table.derive_area("ls6 1aa"), "Leeds");
        assert_eq!(table.derive_area("L7 8TX"), "Liverpool");
        assert_eq!(table.derive_area("SW1A 1AA"), "London");
    }

    #[test]
    fn longest_prefix_beats_shorter_prefix() {
        let table = AreaRuleTable::standard();
        assert_eq!(table.derive_area("M6 5PU"), "Salford");
        assert_eq!(table.derive_area("M13 9PL"), "Manchester");
    }

    #[test]
    fn letter_prefix_does_not_capture_longer_area_code() {
        let table = AreaRuleTable::standard();
        assert_eq!(table.derive_area("S10 2TN"), "Sheffield");
        assert_eq!(table.derive_area("SA1 8PP"), FALLBACK_AREA);
    }

    #[test]
    fn equal_length_matches_use_declaration_order() {
        let table =
            AreaRuleTable::new([("LS6", "Headingley"), ("LS6", "Hyde Park"), ("LS", "Leeds")]);
        assert_eq!(table.derive_area("LS6 3HN"), "Headingley");
        assert_eq!(table.derive_area("LS2 9JT"), "Leeds");
    }

    #[test]
    fn unknown_postcodes_fall_back() {
        let table = AreaRuleTable::standard();
        assert_eq!(table.derive_area("ZZ9 9ZZ"), FALLBACK_AREA);
        assert_eq!(table.derive_area("123"), FALLBACK_AREA);
    }

    #[test]
    fn canonical_area_ignores_case_and_padding() {
        let table = AreaRuleTable::standard();
        assert_eq!(table.canonical_area(" leeds "), Some("Leeds"));
        assert_eq!(table.canonical_area("OTHER"), Some(FALLBACK_AREA));
        assert_eq!(table.canonical_area("Atlantis"), None);
    }
}
