//! External market figures and the adapters that normalize them.

mod csv_export;
mod fixture;
mod http;

pub use csv_export::{CsvLoadError, CsvSourceAdapter, LATEST_PERIOD};
pub use fixture::{FixtureArea, FixtureSourceAdapter};
pub use http::HttpSourceAdapter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::domain::PropertyType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    HousePriceIndex,
    RentalStatistics,
    PricePaid,
}

impl SourceKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::HousePriceIndex => "house price index",
            Self::RentalStatistics => "rental statistics",
            Self::PricePaid => "price paid transactions",
        }
    }

    pub const fn path(self) -> &'static str {
        match self {
            Self::HousePriceIndex => "house-price-index",
            Self::RentalStatistics => "rental-statistics",
            Self::PricePaid => "price-paid",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-type sale and rent figures within one area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyTypeFigures {
    pub property_type: PropertyType,
    #[serde(default)]
    pub average_price: Option<f64>,
    #[serde(default)]
    pub average_rent: Option<f64>,
}

/// Canonical per-area figures. Any field a source does not publish stays `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AreaFigures {
    pub area: String,
    #[serde(default)]
    pub average_price: Option<f64>,
    #[serde(default)]
    pub average_rent: Option<f64>,
    #[serde(default)]
    pub annual_price_change: Option<f64>,
    #[serde(default)]
    pub annual_rent_change: Option<f64>,
    #[serde(default)]
    pub transactions: Option<u32>,
    #[serde(default)]
    pub property_types: Vec<PropertyTypeFigures>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub source: SourceKind,
    pub region: String,
    pub period: String,
}

/// Normalized, timestamped copy of one source's figures for a region and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub source: SourceKind,
    pub region: String,
    pub period: String,
    pub fetched_at: DateTime<Utc>,
    pub areas: Vec<AreaFigures>,
}

impl MarketSnapshot {
    pub fn area(&self, name: &str) -> Option<&AreaFigures> {
        self.areas
            .iter()
            .find(|figures| figures.area.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error("{kind} unavailable: {reason}")]
    Unavailable { kind: SourceKind, reason: String },
    #[error("{kind} did not respond within {after:?}")]
    Timeout { kind: SourceKind, after: Duration },
    #[error("{kind} returned an unreadable payload: {reason}")]
    Malformed { kind: SourceKind, reason: String },
}

impl SourceError {
    pub fn source_kind(&self) -> SourceKind {
        match self {
            Self::Unavailable { kind, .. }
            | Self::Timeout { kind, .. }
            | Self::Malformed { kind, .. } => *kind,
        }
    }
}

/// Fetches one source and returns its figures already in canonical shape.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(
        &self,
        source: SourceKind,
        region: &str,
        period: &str,
    ) -> Result<Vec<AreaFigures>, SourceError>;
}
