use serde::{Deserialize, Serialize};

/// Annualized rent over price as a percentage, rounded to two decimals.
///
/// Missing or non-positive operands yield `None`; a zero yield is never invented.
pub fn rental_yield(average_price: Option<f64>, monthly_rent: Option<f64>) -> Option<f64> {
    let price = average_price.filter(|value| value.is_finite() && *value > 0.0)?;
    let rent = monthly_rent.filter(|value| value.is_finite() && *value > 0.0)?;
    Some(round2(rent * 12.0 * 100.0 / price))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Gap, in percentage points, inside which a yield counts as "in line" with its area.
pub const IN_LINE_TOLERANCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldVerdict {
    Above,
    InLine,
    Below,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketComparison {
    pub area: String,
    pub area_yield: f64,
    pub difference: f64,
    pub verdict: YieldVerdict,
}

impl MarketComparison {
    pub fn new(area: impl Into<String>, candidate_yield: f64, area_yield: f64) -> Self {
        let difference = round2(candidate_yield - area_yield);
        let verdict = if difference > IN_LINE_TOLERANCE {
            YieldVerdict::Above
        } else if difference < -IN_LINE_TOLERANCE {
            YieldVerdict::Below
        } else {
            YieldVerdict::InLine
        };
        Self {
            area: area.into(),
            area_yield,
            difference,
            verdict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldCalculation {
    pub purchase_price: f64,
    pub monthly_rent: f64,
    pub annual_rent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_yield: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_comparison: Option<MarketComparison>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_exact_yield() {
        assert_eq!(rental_yield(Some(120_000.0), Some(1_000.0)), Some(10.0));
        assert_eq!(rental_yield(Some(235_000.0), Some(1_150.0)), Some(5.87));
    }

    #[test]
    fn omits_yield_without_operands() {
        assert_eq!(rental_yield(None, Some(1_000.0)), None);
        assert_eq!(rental_yield(Some(0.0), Some(1_000.0)), None);
        assert_eq!(rental_yield(Some(120_000.0), Some(0.0)), None);
        assert_eq!(rental_yield(Some(120_000.0), None), None);
    }

    #[test]
    fn comparison_verdicts() {
        assert_eq!(MarketComparison::new("Leeds", 6.5, 5.0).verdict, YieldVerdict::Above);
        assert_eq!(MarketComparison::new("Leeds", 5.3, 5.0).verdict, YieldVerdict::InLine);
        assert_eq!(MarketComparison::new("Leeds", 4.0, 5.0).verdict, YieldVerdict::Below);
    }
}
