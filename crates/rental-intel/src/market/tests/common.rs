use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::MarketConfig;
use crate::market::clock::{Clock, ManualClock};
use crate::market::domain::{
    AreaStatistics, ContributedRentalRecord, ContributionDraft, ContributionId, ContributionQuery,
    InvestmentRecommendation, PropertyType, UserId,
};
use crate::market::matching::CandidateProperty;
use crate::market::memory::{
    InMemoryContributionRepository, InMemoryRecommendationRepository, InMemoryStatisticsRepository,
};
use crate::market::repository::{
    ContributionRepository, RecommendationRepository, RepositoryError, StatisticsRepository,
};
use crate::market::service::MarketIntelligenceService;
use crate::market::sources::{
    AreaFigures, FixtureSourceAdapter, SourceAdapter, SourceError, SourceKind,
};

pub(super) type MemoryService = MarketIntelligenceService<
    InMemoryContributionRepository,
    InMemoryStatisticsRepository,
    InMemoryRecommendationRepository,
>;

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0)
        .single()
        .expect("valid start instant")
}

pub(super) fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start()))
}

pub(super) fn test_config() -> MarketConfig {
    MarketConfig {
        fetch_timeout: StdDuration::from_millis(200),
        ..MarketConfig::default()
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<MemoryService>,
    pub(super) adapter: Arc<FixtureSourceAdapter>,
    pub(super) clock: Arc<ManualClock>,
    pub(super) contributions: Arc<InMemoryContributionRepository>,
    pub(super) recommendations: Arc<InMemoryRecommendationRepository>,
}

pub(super) fn harness_with(adapter: FixtureSourceAdapter) -> Harness {
    let adapter = Arc::new(adapter);
    let clock = manual_clock();
    let contributions = Arc::new(InMemoryContributionRepository::default());
    let recommendations = Arc::new(InMemoryRecommendationRepository::default());
    let shared_clock: Arc<dyn Clock> = clock.clone();
    let source: Arc<dyn SourceAdapter> = adapter.clone();

    let service = Arc::new(MarketIntelligenceService::new(
        contributions.clone(),
        Arc::new(InMemoryStatisticsRepository::default()),
        recommendations.clone(),
        source,
        shared_clock,
        &test_config(),
    ));

    Harness {
        service,
        adapter,
        clock,
        contributions,
        recommendations,
    }
}

pub(super) fn harness() -> Harness {
    harness_with(FixtureSourceAdapter::standard())
}

/// Three areas whose area-wide yields are 3.2%, 6.5%, and 8.1%.
pub(super) fn yield_fixture() -> FixtureSourceAdapter {
    let area = |name: &str, price: f64, rent: f64, change: f64| AreaFigures {
        area: name.to_string(),
        average_price: Some(price),
        average_rent: Some(rent),
        annual_price_change: Some(change),
        annual_rent_change: Some(change),
        transactions: Some(100),
        property_types: Vec::new(),
    };
    FixtureSourceAdapter::new(vec![
        area("Leeds", 150_000.0, 400.0, 2.0),
        area("Liverpool", 120_000.0, 650.0, 3.0),
        area("Salford", 100_000.0, 675.0, 6.0),
    ])
}

pub(super) fn draft(
    postcode: &str,
    kind: PropertyType,
    bedrooms: i32,
    rent: f64,
) -> ContributionDraft {
    ContributionDraft {
        submitter: Some(UserId("tenant-7".to_string())),
        postcode: postcode.to_string(),
        property_type: kind,
        bedrooms,
        monthly_rent: rent,
        bills_included: false,
        anonymous: false,
        notes: None,
    }
}

pub(super) fn prior_recommendation(user: &str, area: &str) -> InvestmentRecommendation {
    InvestmentRecommendation {
        user_id: UserId(user.to_string()),
        area: area.to_string(),
        property_type: None,
        average_price: 420_000.0,
        monthly_rent: 1_500.0,
        rental_yield: 4.29,
        description: "stale".to_string(),
        created_at: start(),
    }
}

pub(super) fn candidate(id: &str, rent: f64) -> CandidateProperty {
    CandidateProperty {
        id: id.to_string(),
        title: format!("Listing {id}"),
        address: "22 Wilmslow Road, Fallowfield".to_string(),
        city: Some("Manchester".to_string()),
        property_type: PropertyType::Flat,
        bedrooms: 2,
        monthly_rent: rent,
        features: vec!["Washing machine".to_string(), "Bike storage".to_string()],
        bills_included: true,
        furnished: true,
        university: Some("University of Manchester".to_string()),
        nearby_universities: vec!["Manchester Metropolitan University".to_string()],
        distance_to_university: Some(0.8),
    }
}

/// Adapter that never answers inside any sensible timeout.
pub(super) struct SlowAdapter;

#[async_trait::async_trait]
impl SourceAdapter for SlowAdapter {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn fetch(
        &self,
        _source: SourceKind,
        _region: &str,
        _period: &str,
    ) -> Result<Vec<AreaFigures>, SourceError> {
        tokio::time::sleep(StdDuration::from_secs(5)).await;
        Ok(Vec::new())
    }
}

/// Rejects every insert as a conflicting write and counts the attempts.
#[derive(Default)]
pub(super) struct ConflictContributions {
    pub(super) attempts: AtomicUsize,
}

impl ContributionRepository for ConflictContributions {
    fn insert(
        &self,
        _record: ContributedRentalRecord,
    ) -> Result<ContributedRentalRecord, RepositoryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::Conflict)
    }

    fn list(
        &self,
        _query: &ContributionQuery,
    ) -> Result<Vec<ContributedRentalRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn remove(&self, _id: &ContributionId) -> Result<(), RepositoryError> {
        Err(RepositoryError::NotFound)
    }
}

pub(super) struct UnavailableContributions;

impl ContributionRepository for UnavailableContributions {
    fn insert(
        &self,
        _record: ContributedRentalRecord,
    ) -> Result<ContributedRentalRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(
        &self,
        _query: &ContributionQuery,
    ) -> Result<Vec<ContributedRentalRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn remove(&self, _id: &ContributionId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Accepts reads but refuses every rollup write.
#[derive(Default)]
pub(super) struct UnavailableStatistics;

impl StatisticsRepository for UnavailableStatistics {
    fn upsert(&self, _statistics: AreaStatistics) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("statistics store offline".to_string()))
    }

    fn fetch(&self, _area: &str) -> Result<Option<AreaStatistics>, RepositoryError> {
        Ok(None)
    }

    fn all(&self) -> Result<Vec<AreaStatistics>, RepositoryError> {
        Ok(Vec::new())
    }
}

/// Conflicts on the first `conflicts` replacements, then delegates to memory.
pub(super) struct FlakyRecommendations {
    pub(super) inner: InMemoryRecommendationRepository,
    pub(super) conflicts: usize,
    pub(super) attempts: AtomicUsize,
}

impl FlakyRecommendations {
    pub(super) fn new(conflicts: usize) -> Self {
        Self {
            inner: InMemoryRecommendationRepository::default(),
            conflicts,
            attempts: AtomicUsize::new(0),
        }
    }
}

impl RecommendationRepository for FlakyRecommendations {
    fn replace_for_user(
        &self,
        user: &UserId,
        rows: Vec<InvestmentRecommendation>,
    ) -> Result<usize, RepositoryError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.conflicts {
            return Err(RepositoryError::Conflict);
        }
        self.inner.replace_for_user(user, rows)
    }

    fn for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<Vec<InvestmentRecommendation>>, RepositoryError> {
        self.inner.for_user(user)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
