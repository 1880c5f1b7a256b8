use serde::{Deserialize, Serialize};

use super::fusion::FusedArea;
use super::trends::TrendBand;
use super::yields::{rental_yield, round2};
use crate::market::domain::PropertyType;

pub const TOP_AREA_LIMIT: usize = 3;
pub const UNDERVALUED_MIN_YIELD: f64 = 4.5;
pub const YIELD_FOCUS_MIN_YIELD: f64 = 5.0;
pub const BALANCED_MIN_YIELD: f64 = 4.0;
pub const BALANCED_RISING_BONUS: f64 = 1.0;
pub const BALANCED_STABLE_BONUS: f64 = 0.5;

pub const PREDICTION_DISCLAIMER: &str = "Predictions extrapolate current trend bands over 12 \
months for illustration only. They are not financial advice; seek independent advice before \
making investment decisions.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaPerformance {
    pub area: String,
    pub sale_trend: TrendBand,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_trend: Option<TrendBand>,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_price_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_rent_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndervaluedArea {
    pub area: String,
    pub rental_yield: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rent: Option<f64>,
    pub upside: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub area: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_rent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_rent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_change_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_yield: Option<f64>,
    pub disclaimer: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityArea {
    pub area: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_yield: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_trend: Option<TrendBand>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityBucket {
    pub strategy: &'static str,
    pub description: &'static str,
    pub areas: Vec<OpportunityArea>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentOpportunities {
    pub yield_focus: OpportunityBucket,
    pub capital_growth: OpportunityBucket,
    pub balanced: OpportunityBucket,
}

fn sale_weight(band: TrendBand) -> u8 {
    match band {
        TrendBand::RisingFast => 2,
        TrendBand::Rising => 1,
        _ => 0,
    }
}

fn rent_weight(band: Option<TrendBand>) -> u8 {
    match band {
        Some(TrendBand::RisingFast) => 2,
        Some(TrendBand::Rising) => 1,
        _ => 0,
    }
}

/// Areas with rising sale prices, ranked by sale weight plus rent weight.
pub fn top_performing_areas(areas: &[FusedArea]) -> Vec<AreaPerformance> {
    let mut ranked: Vec<AreaPerformance> = areas
        .iter()
        .filter_map(|area| {
            let sale_trend = area.sale_trend.filter(|band| band.is_rising())?;
            Some(AreaPerformance {
                area: area.area.clone(),
                sale_trend,
                rent_trend: area.rent_trend,
                score: sale_weight(sale_trend) + rent_weight(area.rent_trend),
                annual_price_change: area.annual_price_change,
                annual_rent_change: area.annual_rent_change,
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(TOP_AREA_LIMIT);
    ranked
}

/// Areas yielding above 4.5%, highest first.
pub fn undervalued_areas(areas: &[FusedArea], kind: Option<PropertyType>) -> Vec<UndervaluedArea> {
    let mut ranked: Vec<UndervaluedArea> = areas
        .iter()
        .filter_map(|area| {
            let rental_yield = area.yield_for(kind).filter(|y| *y > UNDERVALUED_MIN_YIELD)?;
            let (average_price, average_rent) = match kind {
                Some(kind) => area
                    .property_type(kind)
                    .map_or((None, None), |entry| (entry.average_price, entry.average_rent)),
                None => (area.average_price, area.average_rent),
            };
            let upside = if area.sale_trend.map_or(false, TrendBand::is_rising) {
                "High"
            } else {
                "Moderate"
            };
            Some(UndervaluedArea {
                area: area.area.clone(),
                rental_yield,
                average_price,
                average_rent,
                upside: upside.to_string(),
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.rental_yield.total_cmp(&a.rental_yield));
    ranked.truncate(TOP_AREA_LIMIT);
    ranked
}

pub fn predict(area: &FusedArea) -> Prediction {
    let price_change_pct = area.sale_trend.map(TrendBand::price_prediction_delta);
    let rent_change_pct = area.rent_trend.map(TrendBand::rent_prediction_delta);

    let predicted_price = area
        .average_price
        .zip(price_change_pct)
        .map(|(price, pct)| (price * (1.0 + pct / 100.0)).round());
    let predicted_rent = area
        .average_rent
        .zip(rent_change_pct)
        .map(|(rent, pct)| round2(rent * (1.0 + pct / 100.0)));

    Prediction {
        area: area.area.clone(),
        current_price: area.average_price,
        predicted_price,
        price_change_pct,
        current_rent: area.average_rent,
        predicted_rent,
        rent_change_pct,
        predicted_yield: rental_yield(predicted_price, predicted_rent),
        disclaimer: PREDICTION_DISCLAIMER,
    }
}

fn bucket(
    strategy: &'static str,
    description: &'static str,
    mut areas: Vec<OpportunityArea>,
) -> OpportunityBucket {
    areas.sort_by(|a, b| b.score.total_cmp(&a.score));
    areas.truncate(TOP_AREA_LIMIT);
    OpportunityBucket {
        strategy,
        description,
        areas,
    }
}

pub fn investment_opportunities(
    areas: &[FusedArea],
    kind: Option<PropertyType>,
) -> InvestmentOpportunities {
    let yield_focus = areas
        .iter()
        .filter_map(|area| {
            let rental_yield = area.yield_for(kind).filter(|y| *y > YIELD_FOCUS_MIN_YIELD)?;
            Some(OpportunityArea {
                area: area.area.clone(),
                rental_yield: Some(rental_yield),
                sale_trend: area.sale_trend,
                score: rental_yield,
            })
        })
        .collect();

    let capital_growth = areas
        .iter()
        .filter_map(|area| {
            let band = area.sale_trend.filter(|band| band.is_rising())?;
            Some(OpportunityArea {
                area: area.area.clone(),
                rental_yield: area.yield_for(kind),
                sale_trend: Some(band),
                score: f64::from(sale_weight(band)),
            })
        })
        .collect();

    let balanced = areas
        .iter()
        .filter_map(|area| {
            let rental_yield = area.yield_for(kind).filter(|y| *y > BALANCED_MIN_YIELD)?;
            let bonus = match area.sale_trend? {
                TrendBand::Rising => BALANCED_RISING_BONUS,
                TrendBand::Stable => BALANCED_STABLE_BONUS,
                _ => return None,
            };
            Some(OpportunityArea {
                area: area.area.clone(),
                rental_yield: Some(rental_yield),
                sale_trend: area.sale_trend,
                score: round2(rental_yield + bonus),
            })
        })
        .collect();

    InvestmentOpportunities {
        yield_focus: bucket(
            "yield_focus",
            "Highest rental yields above 5% for income-led investors",
            yield_focus,
        ),
        capital_growth: bucket(
            "capital_growth",
            "Areas with rising sale prices for long-term capital appreciation",
            capital_growth,
        ),
        balanced: bucket(
            "balanced",
            "Yields above 4% in rising or stable markets",
            balanced,
        ),
    }
}
