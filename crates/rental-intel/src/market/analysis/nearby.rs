use serde::{Deserialize, Serialize};

use super::fusion::FusedArea;
use super::yields::round2;

pub const SIGNIFICANT_PRICE_GAP: f64 = 50_000.0;
pub const SIGNIFICANT_RENT_GAP: f64 = 200.0;

const NEIGHBOURS: &[(&str, &[&str])] = &[
    ("Manchester", &["Salford", "Stockport", "Liverpool"]),
    ("Salford", &["Manchester", "Stockport"]),
    ("Stockport", &["Manchester", "Salford"]),
    ("Leeds", &["Bradford", "Sheffield", "York"]),
    ("Bradford", &["Leeds"]),
    ("Liverpool", &["Manchester"]),
    ("Birmingham", &["Coventry", "Nottingham"]),
    ("Coventry", &["Birmingham", "Leicester"]),
    ("Bristol", &["Bath", "Cardiff"]),
    ("Bath", &["Bristol"]),
    ("Sheffield", &["Leeds", "Nottingham"]),
    ("Nottingham", &["Sheffield", "Leicester", "Birmingham"]),
    ("Newcastle", &["York"]),
    ("Edinburgh", &["Glasgow"]),
    ("Glasgow", &["Edinburgh"]),
    ("London", &["Oxford", "Cambridge"]),
];

pub fn neighbours_of(area: &str) -> &'static [&'static str] {
    NEIGHBOURS
        .iter()
        .find(|(city, _)| city.eq_ignore_ascii_case(area))
        .map(|(_, neighbours)| *neighbours)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighbourComparison {
    pub area: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_difference: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_difference: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yield_difference: Option<f64>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyComparison {
    pub area: String,
    pub neighbours: Vec<NeighbourComparison>,
}

fn difference(neighbour: Option<f64>, base: Option<f64>) -> Option<f64> {
    neighbour.zip(base).map(|(n, b)| round2(n - b))
}

/// Compare `base` with each listed neighbour that has figures in `areas`.
pub fn compare_nearby(base: &FusedArea, areas: &[FusedArea]) -> NearbyComparison {
    let neighbours = neighbours_of(&base.area)
        .iter()
        .filter_map(|name| {
            areas
                .iter()
                .find(|candidate| candidate.area.eq_ignore_ascii_case(name))
        })
        .map(|neighbour| {
            let price_difference = difference(neighbour.average_price, base.average_price);
            let rent_difference = difference(neighbour.average_rent, base.average_rent);
            let yield_difference = difference(neighbour.rental_yield, base.rental_yield);
            NeighbourComparison {
                area: neighbour.area.clone(),
                price_difference,
                rent_difference,
                yield_difference,
                summary: describe(&neighbour.area, &base.area, price_difference, rent_difference),
            }
        })
        .collect();

    NearbyComparison {
        area: base.area.clone(),
        neighbours,
    }
}

fn describe(
    neighbour: &str,
    base: &str,
    price_difference: Option<f64>,
    rent_difference: Option<f64>,
) -> String {
    let significant = price_difference.map_or(false, |d| d.abs() > SIGNIFICANT_PRICE_GAP)
        || rent_difference.map_or(false, |d| d.abs() > SIGNIFICANT_RENT_GAP);
    let qualifier = if significant { "significantly" } else { "slightly" };

    let mut clauses = Vec::new();
    if let Some(delta) = price_difference {
        let direction = if delta < 0.0 { "cheaper" } else { "more expensive" };
        clauses.push(format!(
            "is {qualifier} {direction} to buy (£{:.0} difference)",
            delta.abs()
        ));
    }
    if let Some(delta) = rent_difference {
        let direction = if delta < 0.0 { "lower" } else { "higher" };
        clauses.push(format!(
            "has rents {qualifier} {direction} (£{:.0} per month)",
            delta.abs()
        ));
    }

    if clauses.is_empty() {
        format!("Not enough data to compare {neighbour} with {base}")
    } else {
        format!("Compared with {base}, {neighbour} {}", clauses.join(" and "))
    }
}
