use serde::{Deserialize, Serialize};

use super::domain::{
    AreaStatistics, ContributedRentalRecord, ContributionId, ContributionQuery,
    InvestmentRecommendation, UserId,
};

/// Storage for raw rent observations.
pub trait ContributionRepository: Send + Sync {
    fn insert(
        &self,
        record: ContributedRentalRecord,
    ) -> Result<ContributedRentalRecord, RepositoryError>;
    fn list(&self, query: &ContributionQuery)
        -> Result<Vec<ContributedRentalRecord>, RepositoryError>;
    /// Delete one record; used to undo an insert whose rollup failed.
    fn remove(&self, id: &ContributionId) -> Result<(), RepositoryError>;
}

/// Storage for the derived per-area rollups.
pub trait StatisticsRepository: Send + Sync {
    fn upsert(&self, statistics: AreaStatistics) -> Result<(), RepositoryError>;
    fn fetch(&self, area: &str) -> Result<Option<AreaStatistics>, RepositoryError>;
    fn all(&self) -> Result<Vec<AreaStatistics>, RepositoryError>;
}

/// Storage for per-user investment recommendations.
///
/// `replace_for_user` must swap the whole set in one step: readers see either
/// the previous rows or the new rows, never an empty interim state.
pub trait RecommendationRepository: Send + Sync {
    fn replace_for_user(
        &self,
        user: &UserId,
        rows: Vec<InvestmentRecommendation>,
    ) -> Result<usize, RepositoryError>;
    fn for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<Vec<InvestmentRecommendation>>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum RepositoryError {
    #[error("conflicting concurrent write")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Run a repository write, retrying exactly once when it reports a conflict.
pub(crate) fn retry_on_conflict<T>(
    mut operation: impl FnMut() -> Result<T, RepositoryError>,
) -> Result<T, RepositoryError> {
    match operation() {
        Err(RepositoryError::Conflict) => operation(),
        other => other,
    }
}
