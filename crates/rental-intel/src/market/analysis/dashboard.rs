use serde::{Deserialize, Serialize};

use super::yields::round2;
use crate::market::domain::{AreaStatistics, ContributedRentalRecord, PropertyType};
use crate::market::statistics::{mean, median};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardFilters {
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_contributions: usize,
    pub average_rent: f64,
    pub median_rent: f64,
    pub min_rent: f64,
    pub max_rent: f64,
    pub bills_included_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyTypeBreakdown {
    pub property_type: PropertyType,
    pub label: String,
    pub contributions: usize,
    pub average_rent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaBreakdown {
    pub area: String,
    pub data_points: usize,
    pub average_rent: f64,
    pub last_recalculated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDashboard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_stats: Option<OverallStats>,
    pub property_type_breakdown: Vec<PropertyTypeBreakdown>,
    pub area_breakdown: Vec<AreaBreakdown>,
}

/// `records` must already be filtered; `statistics` is filtered here by area only.
pub fn build_dashboard(
    records: &[ContributedRentalRecord],
    statistics: &[AreaStatistics],
    filters: &DashboardFilters,
) -> MarketDashboard {
    let rents: Vec<f64> = records.iter().map(|record| record.monthly_rent).collect();
    let overall_stats = mean(&rents).zip(median(&rents)).map(|(average, middle)| {
        let bills = records.iter().filter(|record| record.bills_included).count();
        OverallStats {
            total_contributions: rents.len(),
            average_rent: round2(average),
            median_rent: round2(middle),
            min_rent: rents.iter().copied().fold(f64::INFINITY, f64::min),
            max_rent: rents.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            bills_included_share: round2(bills as f64 / rents.len() as f64),
        }
    });

    let property_type_breakdown = PropertyType::ordered()
        .into_iter()
        .filter_map(|kind| {
            let rents: Vec<f64> = records
                .iter()
                .filter(|record| record.property_type == kind)
                .map(|record| record.monthly_rent)
                .collect();
            mean(&rents).map(|average| PropertyTypeBreakdown {
                property_type: kind,
                label: kind.label().to_string(),
                contributions: rents.len(),
                average_rent: round2(average),
            })
        })
        .collect();

    let mut area_breakdown: Vec<AreaBreakdown> = statistics
        .iter()
        .filter(|stats| {
            filters
                .area
                .as_deref()
                .map_or(true, |area| stats.area.eq_ignore_ascii_case(area))
        })
        .map(|stats| AreaBreakdown {
            area: stats.area.clone(),
            data_points: stats.data_point_count,
            average_rent: round2(stats.average_rent),
            last_recalculated_at: stats.last_recalculated_at,
        })
        .collect();
    area_breakdown.sort_by(|a, b| b.data_points.cmp(&a.data_points).then(a.area.cmp(&b.area)));

    MarketDashboard {
        overall_stats,
        property_type_breakdown,
        area_breakdown,
    }
}
