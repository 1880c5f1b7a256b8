//! Mutex-backed repositories used by the API binary, the demo, and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use super::domain::{
    AreaStatistics, ContributedRentalRecord, ContributionId, ContributionQuery,
    InvestmentRecommendation, UserId,
};
use super::repository::{
    ContributionRepository, RecommendationRepository, RepositoryError, StatisticsRepository,
};

#[derive(Default, Clone)]
pub struct InMemoryContributionRepository {
    records: Arc<Mutex<Vec<ContributedRentalRecord>>>,
}

impl InMemoryContributionRepository {
    pub fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContributionRepository for InMemoryContributionRepository {
    fn insert(
        &self,
        record: ContributedRentalRecord,
    ) -> Result<ContributedRentalRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn list(
        &self,
        query: &ContributionQuery,
    ) -> Result<Vec<ContributedRentalRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }

    fn remove(&self, id: &ContributionId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let before = guard.len();
        guard.retain(|record| &record.id != id);
        if guard.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryStatisticsRepository {
    areas: Arc<Mutex<BTreeMap<String, AreaStatistics>>>,
}

impl StatisticsRepository for InMemoryStatisticsRepository {
    fn upsert(&self, statistics: AreaStatistics) -> Result<(), RepositoryError> {
        let mut guard = self.areas.lock().expect("repository mutex poisoned");
        guard.insert(statistics.area.clone(), statistics);
        Ok(())
    }

    fn fetch(&self, area: &str) -> Result<Option<AreaStatistics>, RepositoryError> {
        let guard = self.areas.lock().expect("repository mutex poisoned");
        Ok(guard.get(area).cloned())
    }

    fn all(&self) -> Result<Vec<AreaStatistics>, RepositoryError> {
        let guard = self.areas.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryRecommendationRepository {
    rows: Arc<Mutex<HashMap<UserId, Vec<InvestmentRecommendation>>>>,
}

impl RecommendationRepository for InMemoryRecommendationRepository {
    fn replace_for_user(
        &self,
        user: &UserId,
        rows: Vec<InvestmentRecommendation>,
    ) -> Result<usize, RepositoryError> {
        // Staged swap: the new set is fully built before the single map write.
        let count = rows.len();
        let mut guard = self.rows.lock().expect("repository mutex poisoned");
        guard.insert(user.clone(), rows);
        Ok(count)
    }

    fn for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<Vec<InvestmentRecommendation>>, RepositoryError> {
        let guard = self.rows.lock().expect("repository mutex poisoned");
        Ok(guard.get(user).cloned())
    }
}
