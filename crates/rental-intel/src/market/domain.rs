use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    Flat,
    Terraced,
    SemiDetached,
    Detached,
    Other,
}

impl PropertyType {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Flat,
            Self::Terraced,
            Self::SemiDetached,
            Self::Detached,
            Self::Other,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Terraced => "terraced",
            Self::SemiDetached => "semi-detached",
            Self::Detached => "detached",
            Self::Other => "other",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Flat => "Flat",
            Self::Terraced => "Terraced house",
            Self::SemiDetached => "Semi-detached house",
            Self::Detached => "Detached house",
            Self::Other => "Other property",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        PropertyType::ordered()
            .into_iter()
            .find(|kind| kind.key() == normalized)
            .ok_or_else(|| format!("unknown property type '{raw}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContributionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// A single user-submitted rent observation. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributedRentalRecord {
    pub id: ContributionId,
    pub submitter: Option<UserId>,
    pub postcode: String,
    pub area: String,
    pub property_type: PropertyType,
    pub bedrooms: u32,
    pub monthly_rent: f64,
    pub bills_included: bool,
    pub anonymous: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Unvalidated contribution as received from a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionDraft {
    #[serde(default)]
    pub submitter: Option<UserId>,
    pub postcode: String,
    pub property_type: PropertyType,
    pub bedrooms: i32,
    pub monthly_rent: f64,
    #[serde(default)]
    pub bills_included: bool,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// AND-combined filters over stored contributions.
///
/// `area` ignores case and `postcode` is a case-insensitive substring match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionQuery {
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub postcode: Option<String>,
}

impl ContributionQuery {
    pub fn for_area(area: impl Into<String>) -> Self {
        Self {
            area: Some(area.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &ContributedRentalRecord) -> bool {
        if let Some(area) = &self.area {
            if !record.area.eq_ignore_ascii_case(area.trim()) {
                return false;
            }
        }
        if let Some(kind) = self.property_type {
            if record.property_type != kind {
                return false;
            }
        }
        if let Some(bedrooms) = self.bedrooms {
            if record.bedrooms != bedrooms {
                return false;
            }
        }
        if let Some(fragment) = &self.postcode {
            let haystack = record.postcode.to_ascii_uppercase();
            if !haystack.contains(&fragment.trim().to_ascii_uppercase()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyTypeAverage {
    pub property_type: PropertyType,
    pub average_rent: f64,
    pub data_points: usize,
}

/// Derived per-area rollup; only ever written by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaStatistics {
    pub area: String,
    pub average_rent: f64,
    pub property_type_averages: Vec<PropertyTypeAverage>,
    pub data_point_count: usize,
    pub last_recalculated_at: DateTime<Utc>,
}

impl AreaStatistics {
    pub fn type_average(&self, kind: PropertyType) -> Option<f64> {
        self.property_type_averages
            .iter()
            .find(|entry| entry.property_type == kind)
            .map(|entry| entry.average_rent)
    }
}

/// Stored investment suggestion; a user's rows are always replaced as a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentRecommendation {
    pub user_id: UserId,
    pub area: String,
    /// `None` when the row summarises every property type in the area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    pub average_price: f64,
    pub monthly_rent: f64,
    pub rental_yield: f64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
