use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::areas::{normalize_postcode, AreaRuleTable};
use super::clock::Clock;
use super::domain::{
    AreaStatistics, ContributedRentalRecord, ContributionDraft, ContributionId, ContributionQuery,
};
use super::locks::KeyedLocks;
use super::repository::{
    retry_on_conflict, ContributionRepository, RepositoryError, StatisticsRepository,
};
use super::statistics::aggregate_area;

static CONTRIBUTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_contribution_id() -> ContributionId {
    let id = CONTRIBUTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ContributionId(format!("rent-{id:06}"))
}

/// Rejection reasons for a malformed observation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("monthly rent must be greater than zero (got {0})")]
    NonPositiveRent(f64),
    #[error("bedroom count cannot be negative (got {0})")]
    NegativeBedrooms(i32),
    #[error("postcode is required")]
    MissingPostcode,
}

#[derive(Debug, thiserror::Error)]
pub enum ContributionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("concurrent update to {area} could not be applied")]
    ConcurrencyConflict { area: String },
    #[error(transparent)]
    Repository(RepositoryError),
}

impl ContributionError {
    fn from_repository(area: &str, error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict => Self::ConcurrencyConflict {
                area: area.to_string(),
            },
            other => Self::Repository(other),
        }
    }
}

/// Stored record plus the rollup it produced, read back under the same area lock.
#[derive(Debug, Clone, Serialize)]
pub struct ContributionReceipt {
    pub record: ContributedRentalRecord,
    pub statistics: AreaStatistics,
}

pub fn validate_draft(draft: &ContributionDraft) -> Result<(), ValidationError> {
    if !(draft.monthly_rent.is_finite() && draft.monthly_rent > 0.0) {
        return Err(ValidationError::NonPositiveRent(draft.monthly_rent));
    }
    if draft.bedrooms < 0 {
        return Err(ValidationError::NegativeBedrooms(draft.bedrooms));
    }
    if draft.postcode.trim().is_empty() {
        return Err(ValidationError::MissingPostcode);
    }
    Ok(())
}

/// Persists observations and keeps `AreaStatistics` consistent with them.
///
/// Insert and recompute for one area run under that area's lock, so two
/// concurrent contributions can never fold into a rollup that misses either.
pub struct ContributionStore<C, S> {
    contributions: Arc<C>,
    statistics: Arc<S>,
    clock: Arc<dyn Clock>,
    areas: Arc<AreaRuleTable>,
    locks: KeyedLocks,
}

impl<C, S> ContributionStore<C, S>
where
    C: ContributionRepository + 'static,
    S: StatisticsRepository + 'static,
{
    pub fn new(
        contributions: Arc<C>,
        statistics: Arc<S>,
        clock: Arc<dyn Clock>,
        areas: Arc<AreaRuleTable>,
    ) -> Self {
        Self {
            contributions,
            statistics,
            clock,
            areas,
            locks: KeyedLocks::default(),
        }
    }

    pub fn derive_area(&self, postcode: &str) -> String {
        self.areas.derive_area(postcode).to_string()
    }

    /// Validate, store, and synchronously refresh the area rollup.
    pub fn contribute(
        &self,
        draft: ContributionDraft,
    ) -> Result<ContributionReceipt, ContributionError> {
        validate_draft(&draft)?;

        let area = self.derive_area(&draft.postcode);
        let slot = self.locks.slot(&area);
        let _area_guard = slot.lock().expect("area lock poisoned");

        let created_at = self.clock.now();
        let record = retry_on_conflict(|| {
            self.contributions.insert(ContributedRentalRecord {
                id: next_contribution_id(),
                submitter: if draft.anonymous {
                    None
                } else {
                    draft.submitter.clone()
                },
                postcode: normalize_display_postcode(&draft.postcode),
                area: area.clone(),
                property_type: draft.property_type,
                bedrooms: draft.bedrooms as u32,
                monthly_rent: draft.monthly_rent,
                bills_included: draft.bills_included,
                anonymous: draft.anonymous,
                notes: draft.notes.clone().filter(|notes| !notes.trim().is_empty()),
                created_at,
            })
        })
        .map_err(|error| ContributionError::from_repository(&area, error))?;

        let statistics = match self.recompute_locked(&area) {
            Ok(Some(statistics)) => statistics,
            Ok(None) => {
                self.discard(&record);
                return Err(ContributionError::Repository(RepositoryError::NotFound));
            }
            Err(error) => {
                self.discard(&record);
                return Err(error);
            }
        };

        info!(
            area = %area,
            record = %record.id.0,
            data_points = statistics.data_point_count,
            average_rent = statistics.average_rent,
            "rental contribution stored"
        );

        Ok(ContributionReceipt { record, statistics })
    }

    /// Rebuild the rollup for `area` from every stored record.
    ///
    /// With no records the prior rollup (if any) is returned untouched.
    pub fn recompute(&self, area: &str) -> Result<Option<AreaStatistics>, ContributionError> {
        let area = self.canonical_area(area)?;
        let slot = self.locks.slot(&area);
        let _area_guard = slot.lock().expect("area lock poisoned");
        self.recompute_locked(&area)
    }

    /// Resolve a caller-supplied area name to the spelling records are stored under.
    fn canonical_area(&self, area: &str) -> Result<String, ContributionError> {
        let area = area.trim();
        if let Some(known) = self.areas.canonical_area(area) {
            return Ok(known.to_string());
        }
        let records = self
            .contributions
            .list(&ContributionQuery::for_area(area))
            .map_err(|error| ContributionError::from_repository(area, error))?;
        Ok(records
            .first()
            .map_or_else(|| area.to_string(), |record| record.area.clone()))
    }

    /// Undo an insert whose rollup could not be written.
    fn discard(&self, record: &ContributedRentalRecord) {
        match self.contributions.remove(&record.id) {
            Ok(()) => warn!(
                area = %record.area,
                record = %record.id.0,
                "rollup failed; contribution withdrawn"
            ),
            Err(error) => error!(
                area = %record.area,
                record = %record.id.0,
                %error,
                "rollup failed and contribution could not be withdrawn"
            ),
        }
    }

    fn recompute_locked(&self, area: &str) -> Result<Option<AreaStatistics>, ContributionError> {
        let records = self
            .contributions
            .list(&ContributionQuery::for_area(area))
            .map_err(|error| ContributionError::from_repository(area, error))?;

        match aggregate_area(area, &records, self.clock.now()) {
            Some(statistics) => {
                retry_on_conflict(|| self.statistics.upsert(statistics.clone()))
                    .map_err(|error| ContributionError::from_repository(area, error))?;
                debug!(
                    area,
                    data_points = statistics.data_point_count,
                    "area statistics recomputed"
                );
                Ok(Some(statistics))
            }
            None => {
                debug!(area, "no contributions; keeping prior statistics");
                self.statistics
                    .fetch(area)
                    .map_err(|error| ContributionError::from_repository(area, error))
            }
        }
    }

    pub fn list(
        &self,
        query: &ContributionQuery,
    ) -> Result<Vec<ContributedRentalRecord>, RepositoryError> {
        self.contributions.list(query)
    }

    pub fn area_statistics(&self, area: &str) -> Result<Option<AreaStatistics>, RepositoryError> {
        self.statistics.fetch(area)
    }

    pub fn all_area_statistics(&self) -> Result<Vec<AreaStatistics>, RepositoryError> {
        self.statistics.all()
    }
}

/// Uppercase with a single space before the three-character inward code.
fn normalize_display_postcode(raw: &str) -> String {
    let compact = normalize_postcode(raw);
    if compact.len() > 3 && compact.is_ascii() {
        let (outward, inward) = compact.split_at(compact.len() - 3);
        format!("{outward} {inward}")
    } else {
        compact
    }
}
