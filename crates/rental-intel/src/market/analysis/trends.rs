use serde::{Deserialize, Serialize};

/// Sale-price bands: beyond ±5% is "fast", beyond ±1% is a move.
pub const SALE_FAST_THRESHOLD: f64 = 5.0;
pub const SALE_MOVE_THRESHOLD: f64 = 1.0;
/// Rents move less, so the fast band starts at ±4%.
pub const RENT_FAST_THRESHOLD: f64 = 4.0;
pub const RENT_MOVE_THRESHOLD: f64 = 1.0;

/// 12-month % deltas applied per band, ordered rising_fast..falling_fast.
pub const PRICE_PREDICTION_DELTAS: [f64; 5] = [7.0, 4.0, 1.0, -2.0, -5.0];
pub const RENT_PREDICTION_DELTAS: [f64; 5] = [6.0, 3.0, 1.0, -1.0, -3.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendBand {
    RisingFast,
    Rising,
    Stable,
    Falling,
    FallingFast,
}

impl TrendBand {
    pub const fn label(self) -> &'static str {
        match self {
            Self::RisingFast => "rising fast",
            Self::Rising => "rising",
            Self::Stable => "stable",
            Self::Falling => "falling",
            Self::FallingFast => "falling fast",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::RisingFast => 0,
            Self::Rising => 1,
            Self::Stable => 2,
            Self::Falling => 3,
            Self::FallingFast => 4,
        }
    }

    pub const fn is_rising(self) -> bool {
        matches!(self, Self::RisingFast | Self::Rising)
    }

    pub fn price_prediction_delta(self) -> f64 {
        PRICE_PREDICTION_DELTAS[self.index()]
    }

    pub fn rent_prediction_delta(self) -> f64 {
        RENT_PREDICTION_DELTAS[self.index()]
    }
}

/// Band edges belong to the calmer band: exactly +5.0 is `Rising`, exactly -1.0 is `Stable`.
fn classify(change: f64, fast: f64, moving: f64) -> TrendBand {
    if change > fast {
        TrendBand::RisingFast
    } else if change > moving {
        TrendBand::Rising
    } else if change < -fast {
        TrendBand::FallingFast
    } else if change < -moving {
        TrendBand::Falling
    } else {
        TrendBand::Stable
    }
}

pub fn classify_sale_trend(annual_change: f64) -> TrendBand {
    classify(annual_change, SALE_FAST_THRESHOLD, SALE_MOVE_THRESHOLD)
}

pub fn classify_rent_trend(annual_change: f64) -> TrendBand {
    classify(annual_change, RENT_FAST_THRESHOLD, RENT_MOVE_THRESHOLD)
}
