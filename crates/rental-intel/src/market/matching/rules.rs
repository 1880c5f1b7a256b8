//! Independent scoring rules, applied in the order of [`RULES`].
//!
//! Each rule looks at one aspect of the fit and returns zero or more
//! adjustments. Reason order in the final match follows this table.

use super::weights::MatchWeights;
use super::{CandidateProperty, MatchCriterion, PropertyPreference, ScoreAdjustment};

pub(crate) type ScoringRule =
    fn(&PropertyPreference, &CandidateProperty, &MatchWeights) -> Vec<ScoreAdjustment>;

pub(crate) const RULES: &[ScoringRule] = &[
    location,
    university,
    budget,
    property_type,
    bedrooms,
    features,
    bills,
    furnishing,
];

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle)
}

fn adjustment(criterion: MatchCriterion, delta: i32, reason: String) -> ScoreAdjustment {
    ScoreAdjustment {
        criterion,
        delta,
        reason,
        feature: None,
    }
}

pub(crate) fn location(
    preference: &PropertyPreference,
    property: &CandidateProperty,
    weights: &MatchWeights,
) -> Vec<ScoreAdjustment> {
    let Some(wanted) = preference.location.as_deref() else {
        return Vec::new();
    };
    let in_address = contains_ignore_case(&property.address, wanted);
    let in_city = property
        .city
        .as_deref()
        .map_or(false, |city| contains_ignore_case(city, wanted));

    if in_address || in_city {
        vec![adjustment(
            MatchCriterion::Location,
            weights.location_match,
            format!("Located in {}", wanted.trim()),
        )]
    } else {
        Vec::new()
    }
}

pub(crate) fn university(
    preference: &PropertyPreference,
    property: &CandidateProperty,
    weights: &MatchWeights,
) -> Vec<ScoreAdjustment> {
    let Some(wanted) = preference.university.as_deref() else {
        return Vec::new();
    };
    let wanted = wanted.trim();

    let mut adjustments = Vec::new();
    if property
        .university
        .as_deref()
        .map_or(false, |university| contains_ignore_case(university, wanted))
    {
        adjustments.push(adjustment(
            MatchCriterion::University,
            weights.university_match,
            format!("Serves {wanted}"),
        ));
    } else if property
        .nearby_universities
        .iter()
        .any(|university| contains_ignore_case(university, wanted))
    {
        adjustments.push(adjustment(
            MatchCriterion::University,
            weights.nearby_university_match,
            format!("Near {wanted}"),
        ));
    } else {
        return adjustments;
    }

    if let Some(distance) = property
        .distance_to_university
        .filter(|distance| *distance < weights.walking_distance)
    {
        adjustments.push(adjustment(
            MatchCriterion::University,
            weights.walking_distance_bonus,
            format!("Walking distance to campus ({distance:.1})"),
        ));
    }
    adjustments
}

pub(crate) fn budget(
    preference: &PropertyPreference,
    property: &CandidateProperty,
    weights: &MatchWeights,
) -> Vec<ScoreAdjustment> {
    let Some(budget) = preference.budget.filter(|budget| *budget > 0.0) else {
        return Vec::new();
    };
    let rent = property.monthly_rent;

    if rent <= budget {
        let mut adjustments = vec![adjustment(
            MatchCriterion::Budget,
            weights.within_budget,
            format!("£{rent:.0} per month is within your £{budget:.0} budget"),
        )];
        if rent <= budget * weights.well_under_budget_ratio {
            adjustments.push(adjustment(
                MatchCriterion::Budget,
                weights.well_under_budget_bonus,
                "Well under budget".to_string(),
            ));
        }
        adjustments
    } else if rent <= budget * weights.slightly_over_budget_ratio {
        vec![adjustment(
            MatchCriterion::Budget,
            weights.slightly_over_budget,
            format!("Slightly over budget by £{:.0}", rent - budget),
        )]
    } else {
        vec![adjustment(
            MatchCriterion::Budget,
            weights.over_budget,
            format!("Over budget by £{:.0}", rent - budget),
        )]
    }
}

pub(crate) fn property_type(
    preference: &PropertyPreference,
    property: &CandidateProperty,
    weights: &MatchWeights,
) -> Vec<ScoreAdjustment> {
    match preference.property_type {
        Some(wanted) if wanted == property.property_type => vec![adjustment(
            MatchCriterion::PropertyType,
            weights.property_type_match,
            format!("{} as requested", wanted.label()),
        )],
        _ => Vec::new(),
    }
}

pub(crate) fn bedrooms(
    preference: &PropertyPreference,
    property: &CandidateProperty,
    weights: &MatchWeights,
) -> Vec<ScoreAdjustment> {
    let Some(minimum) = preference.min_bedrooms else {
        return Vec::new();
    };
    if property.bedrooms >= minimum {
        vec![adjustment(
            MatchCriterion::Bedrooms,
            weights.bedrooms_met,
            format!("{} bedrooms (wanted at least {minimum})", property.bedrooms),
        )]
    } else {
        vec![adjustment(
            MatchCriterion::Bedrooms,
            weights.bedrooms_short,
            format!("Only {} bedrooms (wanted at least {minimum})", property.bedrooms),
        )]
    }
}

pub(crate) fn features(
    preference: &PropertyPreference,
    property: &CandidateProperty,
    weights: &MatchWeights,
) -> Vec<ScoreAdjustment> {
    preference
        .must_have_features
        .iter()
        .map(|wanted| wanted.trim())
        .filter(|wanted| !wanted.is_empty())
        .map(|wanted| {
            let present = property
                .features
                .iter()
                .any(|feature| contains_ignore_case(feature, wanted));
            if present {
                ScoreAdjustment {
                    criterion: MatchCriterion::Features,
                    delta: weights.feature_present,
                    reason: format!("Has {wanted}"),
                    feature: Some(wanted.to_string()),
                }
            } else {
                adjustment(
                    MatchCriterion::Features,
                    weights.feature_missing,
                    format!("Missing {wanted}"),
                )
            }
        })
        .collect()
}

pub(crate) fn bills(
    _preference: &PropertyPreference,
    property: &CandidateProperty,
    weights: &MatchWeights,
) -> Vec<ScoreAdjustment> {
    if property.bills_included {
        vec![adjustment(
            MatchCriterion::BillsIncluded,
            weights.bills_included,
            "Bills included".to_string(),
        )]
    } else {
        Vec::new()
    }
}

pub(crate) fn furnishing(
    _preference: &PropertyPreference,
    property: &CandidateProperty,
    weights: &MatchWeights,
) -> Vec<ScoreAdjustment> {
    if property.furnished {
        vec![adjustment(
            MatchCriterion::Furnished,
            weights.furnished,
            "Furnished".to_string(),
        )]
    } else {
        Vec::new()
    }
}
