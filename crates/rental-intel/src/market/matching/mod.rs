mod rules;
pub mod weights;

pub use weights::MatchWeights;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cache::TtlCache;
use super::clock::Clock;
use super::domain::PropertyType;

pub const MAX_CANDIDATES: usize = 50;
pub const DEFAULT_RECOMMENDATION_COUNT: usize = 4;
pub const DEFAULT_MATCH_TTL_MINUTES: i64 = 5;
/// Cache size above which expired entries are pruned after a write.
pub const MATCH_CACHE_PRUNE_THRESHOLD: usize = 100;

/// What a tenant is looking for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyPreference {
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub min_bedrooms: Option<u32>,
    #[serde(default)]
    pub must_have_features: Vec<String>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub move_in_date: Option<NaiveDate>,
}

/// Listing supplied by the property catalog for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProperty {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: Option<String>,
    pub property_type: PropertyType,
    pub bedrooms: u32,
    pub monthly_rent: f64,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub bills_included: bool,
    #[serde(default)]
    pub furnished: bool,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub nearby_universities: Vec<String>,
    #[serde(default)]
    pub distance_to_university: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCriterion {
    Location,
    University,
    Budget,
    PropertyType,
    Bedrooms,
    Features,
    BillsIncluded,
    Furnished,
}

/// One rule's contribution to a score, kept for audit trails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreAdjustment {
    pub criterion: MatchCriterion,
    pub delta: i32,
    pub reason: String,
    /// Requested feature this adjustment confirmed, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMatch {
    pub property_id: String,
    pub score: u8,
    pub matched_features: BTreeSet<String>,
    pub matched_criteria: BTreeSet<MatchCriterion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_reasons: Vec<String>,
}

/// Stateless scorer folding the rule table over one property.
#[derive(Debug, Clone, Default)]
pub struct PropertyMatchScorer {
    weights: MatchWeights,
}

impl PropertyMatchScorer {
    pub fn new(weights: MatchWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &MatchWeights {
        &self.weights
    }

    /// Every adjustment in rule order.
    pub fn adjustments(
        &self,
        preference: &PropertyPreference,
        property: &CandidateProperty,
    ) -> Vec<ScoreAdjustment> {
        rules::RULES
            .iter()
            .flat_map(|rule| rule(preference, property, &self.weights))
            .collect()
    }

    pub fn score(
        &self,
        preference: &PropertyPreference,
        property: &CandidateProperty,
        include_reasons: bool,
    ) -> PropertyMatch {
        let adjustments = self.adjustments(preference, property);
        let total = adjustments
            .iter()
            .fold(self.weights.base_score, |total, a| total.saturating_add(a.delta));

        let matched_criteria = adjustments
            .iter()
            .filter(|a| a.delta > 0)
            .map(|a| a.criterion)
            .collect();
        let matched_features = adjustments
            .iter()
            .filter_map(|a| a.feature.clone())
            .collect();
        let match_reasons = if include_reasons {
            adjustments.into_iter().map(|a| a.reason).collect()
        } else {
            Vec::new()
        };

        PropertyMatch {
            property_id: property.id.clone(),
            score: total.clamp(0, 100) as u8,
            matched_features,
            matched_criteria,
            match_reasons,
        }
    }
}

#[derive(Serialize)]
struct MatchCacheKey<'a> {
    preference: &'a PropertyPreference,
    candidates: Vec<&'a str>,
    count: usize,
    include_reasons: bool,
}

/// Ranks candidate batches and remembers identical requests for a short window.
pub struct PropertyRecommender {
    scorer: PropertyMatchScorer,
    cache: TtlCache<String, Vec<PropertyMatch>>,
}

impl PropertyRecommender {
    pub fn new(scorer: PropertyMatchScorer, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            scorer,
            cache: TtlCache::new(ttl, clock),
        }
    }

    pub fn scorer(&self) -> &PropertyMatchScorer {
        &self.scorer
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Top `count` matches (default 4) from at most the first 50 candidates.
    ///
    /// Equal scores keep their candidate order.
    pub fn recommend(
        &self,
        preference: &PropertyPreference,
        candidates: &[CandidateProperty],
        count: Option<usize>,
        include_reasons: bool,
    ) -> Vec<PropertyMatch> {
        let count = count.unwrap_or(DEFAULT_RECOMMENDATION_COUNT);
        let batch = &candidates[..candidates.len().min(MAX_CANDIDATES)];

        let key = serde_json::to_string(&MatchCacheKey {
            preference,
            candidates: batch.iter().map(|candidate| candidate.id.as_str()).collect(),
            count,
            include_reasons,
        })
        .ok();

        if let Some(cached) = key.as_ref().and_then(|key| self.cache.get(key)) {
            debug!(candidates = batch.len(), "property match cache hit");
            return cached;
        }

        let mut ranked: Vec<PropertyMatch> = batch
            .iter()
            .map(|property| self.scorer.score(preference, property, include_reasons))
            .collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked.truncate(count);

        if let Some(key) = key {
            self.cache.set(key, ranked.clone());
            if self.cache.len() > MATCH_CACHE_PRUNE_THRESHOLD {
                let pruned = self.cache.evict_expired();
                debug!(pruned, "pruned expired property match entries");
            }
        }
        ranked
    }
}
