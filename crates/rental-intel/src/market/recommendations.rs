use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::analysis::yields::{rental_yield, round2};
use super::analysis::{FusedArea, FusedMarket};
use super::clock::Clock;
use super::domain::{ContributedRentalRecord, InvestmentRecommendation, PropertyType, UserId};
use super::locks::KeyedLocks;
use super::repository::{retry_on_conflict, RecommendationRepository, RepositoryError};
use super::sources::SourceError;
use super::statistics::mean;

pub const MAX_RECOMMENDATIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentCriteria {
    pub user_id: UserId,
    #[serde(default)]
    pub min_yield: f64,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub max_budget: Option<f64>,
    #[serde(default)]
    pub period: Option<String>,
}

impl InvestmentCriteria {
    pub fn for_user(user_id: impl Into<String>, min_yield: f64) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            min_yield,
            area: None,
            property_type: None,
            bedrooms: None,
            max_budget: None,
            period: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CriteriaError {
    #[error("user id is required")]
    MissingUser,
    #[error("minimum yield must be a non-negative number (got {0})")]
    InvalidMinYield(f64),
    #[error("maximum budget must be greater than zero (got {0})")]
    InvalidBudget(f64),
}

#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error(transparent)]
    Validation(#[from] CriteriaError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("concurrent update to recommendations for {user} could not be applied")]
    ConcurrencyConflict { user: String },
    #[error(transparent)]
    Repository(RepositoryError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationOutcome {
    pub recommendations: Vec<InvestmentRecommendation>,
    pub saved_recommendation_count: usize,
}

pub fn validate_criteria(criteria: &InvestmentCriteria) -> Result<(), CriteriaError> {
    if criteria.user_id.0.trim().is_empty() {
        return Err(CriteriaError::MissingUser);
    }
    if !(criteria.min_yield.is_finite() && criteria.min_yield >= 0.0) {
        return Err(CriteriaError::InvalidMinYield(criteria.min_yield));
    }
    if let Some(budget) = criteria.max_budget {
        if !(budget.is_finite() && budget > 0.0) {
            return Err(CriteriaError::InvalidBudget(budget));
        }
    }
    Ok(())
}

pub fn describe(
    area: &str,
    property_type: Option<PropertyType>,
    rental_yield: f64,
    average_price: f64,
    monthly_rent: f64,
) -> String {
    let label = property_type.map_or("Residential", PropertyType::label);
    format!(
        "{label} properties in {area} offer an estimated rental yield of {rental_yield:.1}% \
         with an average price of £{average_price:.0} and average rent of £{monthly_rent:.0} per month."
    )
}

/// Rank fused areas against `criteria`, best yield first, at most five rows.
///
/// Without a type filter every priced property type in every area competes
/// on its own; an area with no per-type figures falls back to one
/// area-wide row. With a bedroom filter, community records for that exact
/// size replace the source rent when any exist.
pub fn rank_opportunities(
    market: &FusedMarket,
    criteria: &InvestmentCriteria,
    comparables: &[ContributedRentalRecord],
    now: DateTime<Utc>,
) -> Vec<InvestmentRecommendation> {
    let mut rows: Vec<InvestmentRecommendation> = market
        .areas
        .iter()
        .filter(|area| {
            criteria
                .area
                .as_deref()
                .map_or(true, |wanted| area.area.eq_ignore_ascii_case(wanted.trim()))
        })
        .flat_map(|area| candidate_figures(area, criteria.property_type))
        .filter_map(|candidate| recommend(candidate, criteria, comparables, now))
        .collect();

    rows.sort_by(|a, b| b.rental_yield.total_cmp(&a.rental_yield));
    rows.truncate(MAX_RECOMMENDATIONS);
    rows
}

/// Price and source rent for one (area, property type) pairing.
struct Candidate<'a> {
    area: &'a str,
    property_type: Option<PropertyType>,
    price: f64,
    source_rent: Option<f64>,
}

fn candidate_figures(area: &FusedArea, wanted: Option<PropertyType>) -> Vec<Candidate<'_>> {
    let typed = move |kind: PropertyType| {
        let figures = area.property_type(kind)?;
        Some(Candidate {
            area: &area.area,
            property_type: Some(kind),
            price: figures.average_price?,
            source_rent: figures.average_rent,
        })
    };

    if let Some(kind) = wanted {
        return typed(kind).into_iter().collect();
    }

    let per_type: Vec<Candidate<'_>> = area
        .property_types
        .iter()
        .filter_map(|entry| typed(entry.property_type))
        .collect();
    if !per_type.is_empty() {
        return per_type;
    }
    area.average_price
        .map(|price| Candidate {
            area: &area.area,
            property_type: None,
            price,
            source_rent: area.average_rent,
        })
        .into_iter()
        .collect()
}

fn recommend(
    candidate: Candidate<'_>,
    criteria: &InvestmentCriteria,
    comparables: &[ContributedRentalRecord],
    now: DateTime<Utc>,
) -> Option<InvestmentRecommendation> {
    let Candidate {
        area,
        property_type,
        price,
        source_rent,
    } = candidate;

    let sized_rent = criteria.bedrooms.and_then(|bedrooms| {
        let rents: Vec<f64> = comparables
            .iter()
            .filter(|record| {
                record.area.eq_ignore_ascii_case(area)
                    && record.bedrooms == bedrooms
                    && property_type.map_or(true, |kind| record.property_type == kind)
            })
            .map(|record| record.monthly_rent)
            .collect();
        mean(&rents)
    });
    let rent = sized_rent.or(source_rent)?;
    let rental_yield = rental_yield(Some(price), Some(rent))?;

    if rental_yield < criteria.min_yield {
        return None;
    }
    if criteria.max_budget.map_or(false, |budget| price > budget) {
        return None;
    }

    let monthly_rent = round2(rent);
    Some(InvestmentRecommendation {
        user_id: criteria.user_id.clone(),
        area: area.to_string(),
        property_type,
        average_price: price,
        monthly_rent,
        rental_yield,
        description: describe(area, property_type, rental_yield, price, monthly_rent),
        created_at: now,
    })
}

/// Replaces a user's stored recommendations as one unit.
///
/// Writes for the same user are serialized; the repository swap guarantees a
/// reader sees either the old set or the new one.
pub struct RecommendationPersister<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks,
}

impl<R> RecommendationPersister<R>
where
    R: RecommendationRepository + 'static,
{
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            locks: KeyedLocks::default(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn replace(
        &self,
        user: &UserId,
        rows: Vec<InvestmentRecommendation>,
    ) -> Result<usize, RecommendationError> {
        let slot = self.locks.slot(&user.0);
        let _user_guard = slot.lock().expect("user lock poisoned");

        let saved = retry_on_conflict(|| self.repository.replace_for_user(user, rows.clone()))
            .map_err(|error| match error {
                RepositoryError::Conflict => RecommendationError::ConcurrencyConflict {
                    user: user.0.clone(),
                },
                other => RecommendationError::Repository(other),
            })?;

        info!(user = %user.0, saved, "investment recommendations replaced");
        Ok(saved)
    }

    /// `None` until recommendations have been generated for the user at least once.
    pub fn stored(
        &self,
        user: &UserId,
    ) -> Result<Option<Vec<InvestmentRecommendation>>, RepositoryError> {
        self.repository.for_user(user)
    }
}
