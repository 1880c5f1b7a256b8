use chrono::{DateTime, Utc};

use super::domain::{AreaStatistics, ContributedRentalRecord, PropertyType, PropertyTypeAverage};

/// Fold every record for one area into a fresh rollup.
///
/// Returns `None` for an empty slice so callers leave any prior rollup intact.
pub fn aggregate_area(
    area: &str,
    records: &[ContributedRentalRecord],
    now: DateTime<Utc>,
) -> Option<AreaStatistics> {
    let rents: Vec<f64> = records
        .iter()
        .filter(|record| record.area == area)
        .map(|record| record.monthly_rent)
        .collect();
    let average_rent = mean(&rents)?;

    let property_type_averages = PropertyType::ordered()
        .into_iter()
        .filter_map(|kind| {
            let rents: Vec<f64> = records
                .iter()
                .filter(|record| record.area == area && record.property_type == kind)
                .map(|record| record.monthly_rent)
                .collect();
            mean(&rents).map(|average_rent| PropertyTypeAverage {
                property_type: kind,
                average_rent,
                data_points: rents.len(),
            })
        })
        .collect();

    Some(AreaStatistics {
        area: area.to_string(),
        average_rent,
        property_type_averages,
        data_point_count: rents.len(),
        last_recalculated_at: now,
    })
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
