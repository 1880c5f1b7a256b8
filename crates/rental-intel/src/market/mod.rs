//! Rental market intelligence: community rent contributions, external market
//! snapshots, analysis, property matching, and investment recommendations.

pub mod analysis;
pub mod areas;
pub mod cache;
pub mod clock;
pub mod contributions;
pub mod domain;
pub(crate) mod locks;
pub mod matching;
pub mod memory;
pub mod recommendations;
pub mod repository;
pub mod router;
pub mod service;
pub mod snapshots;
pub mod sources;
pub(crate) mod statistics;

#[cfg(test)]
mod tests;

pub use analysis::{
    AnalysisParams, CompetitorAnalysis, DashboardFilters, FusedArea, MarketAnalysis,
    MarketAnalysisEngine, MarketDashboard, TrendBand, YieldCalculation,
};
pub use areas::{AreaRuleTable, FALLBACK_AREA};
pub use cache::TtlCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use contributions::{ContributionError, ContributionReceipt, ContributionStore, ValidationError};
pub use domain::{
    AreaStatistics, ContributedRentalRecord, ContributionDraft, ContributionId, ContributionQuery,
    InvestmentRecommendation, PropertyType, PropertyTypeAverage, UserId,
};
pub use matching::{
    CandidateProperty, MatchCriterion, MatchWeights, PropertyMatch, PropertyMatchScorer,
    PropertyPreference, PropertyRecommender,
};
pub use memory::{
    InMemoryContributionRepository, InMemoryRecommendationRepository, InMemoryStatisticsRepository,
};
pub use recommendations::{
    CriteriaError, InvestmentCriteria, RecommendationError, RecommendationOutcome,
    RecommendationPersister,
};
pub use repository::{
    ContributionRepository, RecommendationRepository, RepositoryError, StatisticsRepository,
};
pub use router::market_router;
pub use service::{CompetitorQuery, MarketIntelligenceService, MatchRequest, YieldRequest};
pub use snapshots::MarketDataCache;
pub use sources::{
    CsvSourceAdapter, FixtureSourceAdapter, HttpSourceAdapter, MarketSnapshot, SourceAdapter,
    SourceError, SourceKind,
};
