use serde::{Deserialize, Serialize};

use super::yields::round2;
use crate::market::domain::{ContributedRentalRecord, PropertyType};
use crate::market::statistics::{mean, median};

pub const LOW_BAND_RATIO: f64 = 0.9;
pub const HIGH_BAND_RATIO: f64 = 1.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorOverview {
    pub comparable_listings: usize,
    pub min_rent: f64,
    pub max_rent: f64,
    pub average_rent: f64,
    pub median_rent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
    pub listings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoints {
    pub low: PriceBand,
    pub medium: PriceBand,
    pub high: PriceBand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketGap {
    pub property_type: PropertyType,
    pub bedrooms: u32,
    pub listings: usize,
    pub note: String,
}

/// Absent sections mean there were no comparable records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompetitorAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<CompetitorOverview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_points: Option<PricePoints>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gaps: Option<MarketGap>,
}

pub fn analyze_competitors(records: &[ContributedRentalRecord]) -> CompetitorAnalysis {
    let rents: Vec<f64> = records.iter().map(|record| record.monthly_rent).collect();
    let (Some(average), Some(middle)) = (mean(&rents), median(&rents)) else {
        return CompetitorAnalysis::default();
    };

    let min_rent = rents.iter().copied().fold(f64::INFINITY, f64::min);
    let max_rent = rents.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let low_ceiling = average * LOW_BAND_RATIO;
    let high_floor = average * HIGH_BAND_RATIO;
    let low = rents.iter().filter(|rent| **rent < low_ceiling).count();
    let high = rents.iter().filter(|rent| **rent > high_floor).count();

    let price_points = PricePoints {
        low: PriceBand {
            from: None,
            to: Some(round2(low_ceiling)),
            listings: low,
        },
        medium: PriceBand {
            from: Some(round2(low_ceiling)),
            to: Some(round2(high_floor)),
            listings: rents.len() - low - high,
        },
        high: PriceBand {
            from: Some(round2(high_floor)),
            to: None,
            listings: high,
        },
    };

    CompetitorAnalysis {
        overview: Some(CompetitorOverview {
            comparable_listings: rents.len(),
            min_rent,
            max_rent,
            average_rent: round2(average),
            median_rent: round2(middle),
        }),
        price_points: Some(price_points),
        gaps: least_supplied(records),
    }
}

/// The type and bedroom combination with the fewest listings; first seen wins ties.
fn least_supplied(records: &[ContributedRentalRecord]) -> Option<MarketGap> {
    let mut groups: Vec<((PropertyType, u32), usize)> = Vec::new();
    for record in records {
        let key = (record.property_type, record.bedrooms);
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, count)) => *count += 1,
            None => groups.push((key, 1)),
        }
    }

    groups
        .into_iter()
        .min_by_key(|(_, count)| *count)
        .map(|((property_type, bedrooms), listings)| MarketGap {
            property_type,
            bedrooms,
            listings,
            note: format!(
                "Only {listings} {bedrooms}-bed {} listing{} reported; supply looks thin",
                property_type.label().to_ascii_lowercase(),
                if listings == 1 { "" } else { "s" }
            ),
        })
}
