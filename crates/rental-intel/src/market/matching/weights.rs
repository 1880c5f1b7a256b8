use serde::{Deserialize, Serialize};

pub const BASE_SCORE: i32 = 50;
pub const LOCATION_MATCH: i32 = 25;
pub const UNIVERSITY_MATCH: i32 = 20;
pub const NEARBY_UNIVERSITY_MATCH: i32 = 15;
pub const WALKING_DISTANCE_BONUS: i32 = 10;
pub const WALKING_DISTANCE: f64 = 1.5;
pub const WITHIN_BUDGET: i32 = 20;
pub const WELL_UNDER_BUDGET_BONUS: i32 = 10;
pub const WELL_UNDER_BUDGET_RATIO: f64 = 0.85;
pub const SLIGHTLY_OVER_BUDGET: i32 = -5;
pub const SLIGHTLY_OVER_BUDGET_RATIO: f64 = 1.10;
pub const OVER_BUDGET: i32 = -15;
pub const PROPERTY_TYPE_MATCH: i32 = 15;
pub const BEDROOMS_MET: i32 = 15;
pub const BEDROOMS_SHORT: i32 = -10;
pub const FEATURE_PRESENT: i32 = 10;
pub const FEATURE_MISSING: i32 = -5;
pub const BILLS_INCLUDED: i32 = 10;
pub const FURNISHED: i32 = 10;

/// Scoring rubric. `Default` carries the tuned production weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub base_score: i32,
    pub location_match: i32,
    pub university_match: i32,
    pub nearby_university_match: i32,
    pub walking_distance_bonus: i32,
    pub walking_distance: f64,
    pub within_budget: i32,
    pub well_under_budget_bonus: i32,
    pub well_under_budget_ratio: f64,
    pub slightly_over_budget: i32,
    pub slightly_over_budget_ratio: f64,
    pub over_budget: i32,
    pub property_type_match: i32,
    pub bedrooms_met: i32,
    pub bedrooms_short: i32,
    pub feature_present: i32,
    pub feature_missing: i32,
    pub bills_included: i32,
    pub furnished: i32,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            base_score: BASE_SCORE,
            location_match: LOCATION_MATCH,
            university_match: UNIVERSITY_MATCH,
            nearby_university_match: NEARBY_UNIVERSITY_MATCH,
            walking_distance_bonus: WALKING_DISTANCE_BONUS,
            walking_distance: WALKING_DISTANCE,
            within_budget: WITHIN_BUDGET,
            well_under_budget_bonus: WELL_UNDER_BUDGET_BONUS,
            well_under_budget_ratio: WELL_UNDER_BUDGET_RATIO,
            slightly_over_budget: SLIGHTLY_OVER_BUDGET,
            slightly_over_budget_ratio: SLIGHTLY_OVER_BUDGET_RATIO,
            over_budget: OVER_BUDGET,
            property_type_match: PROPERTY_TYPE_MATCH,
            bedrooms_met: BEDROOMS_MET,
            bedrooms_short: BEDROOMS_SHORT,
            feature_present: FEATURE_PRESENT,
            feature_missing: FEATURE_MISSING,
            bills_included: BILLS_INCLUDED,
            furnished: FURNISHED,
        }
    }
}
