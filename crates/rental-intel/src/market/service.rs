use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::analysis::yields::{rental_yield, round2};
use super::analysis::{
    analyze_competitors, build_dashboard, AnalysisParams, CompetitorAnalysis, DashboardFilters,
    MarketAnalysis, MarketAnalysisEngine, MarketDashboard, YieldCalculation,
};
use super::areas::AreaRuleTable;
use super::clock::Clock;
use super::contributions::{ContributionError, ContributionReceipt, ContributionStore};
use super::domain::{
    AreaStatistics, ContributedRentalRecord, ContributionDraft, ContributionQuery,
    InvestmentRecommendation, PropertyType, UserId,
};
use super::matching::{
    CandidateProperty, PropertyMatch, PropertyMatchScorer, PropertyPreference,
    PropertyRecommender,
};
use super::recommendations::{
    rank_opportunities, validate_criteria, InvestmentCriteria, RecommendationError,
    RecommendationOutcome, RecommendationPersister,
};
use super::repository::{
    ContributionRepository, RecommendationRepository, RepositoryError, StatisticsRepository,
};
use super::snapshots::MarketDataCache;
use super::sources::SourceAdapter;
use crate::config::MarketConfig;

/// Filters for the competitor view over contributed rents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitorQuery {
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldRequest {
    pub purchase_price: f64,
    pub monthly_rent: f64,
    #[serde(default)]
    pub area: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub preferences: PropertyPreference,
    pub candidates: Vec<CandidateProperty>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub include_reasons: bool,
}

/// Service composing the contribution store, analysis engine, match scorer,
/// and recommendation persister behind one facade.
pub struct MarketIntelligenceService<C, S, R> {
    store: ContributionStore<C, S>,
    snapshots: Arc<MarketDataCache>,
    engine: MarketAnalysisEngine,
    recommender: PropertyRecommender,
    persister: RecommendationPersister<R>,
}

impl<C, S, R> MarketIntelligenceService<C, S, R>
where
    C: ContributionRepository + 'static,
    S: StatisticsRepository + 'static,
    R: RecommendationRepository + 'static,
{
    pub fn new(
        contributions: Arc<C>,
        statistics: Arc<S>,
        recommendations: Arc<R>,
        adapter: Arc<dyn SourceAdapter>,
        clock: Arc<dyn Clock>,
        config: &MarketConfig,
    ) -> Self {
        let snapshots = Arc::new(MarketDataCache::new(
            adapter,
            clock.clone(),
            config.snapshot_ttl(),
            config.fetch_timeout,
        ));
        let engine = MarketAnalysisEngine::new(
            snapshots.clone(),
            clock.clone(),
            config.analysis_ttl(),
            config.region.clone(),
            config.period.clone(),
        );

        Self {
            store: ContributionStore::new(
                contributions,
                statistics,
                clock.clone(),
                Arc::new(AreaRuleTable::standard().clone()),
            ),
            snapshots,
            engine,
            recommender: PropertyRecommender::new(
                PropertyMatchScorer::default(),
                clock.clone(),
                config.match_ttl(),
            ),
            persister: RecommendationPersister::new(recommendations, clock),
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.snapshots.adapter_name()
    }

    pub fn region(&self) -> &str {
        self.engine.region()
    }

    pub fn default_period(&self) -> &str {
        self.engine.default_period()
    }

    pub fn contribute(
        &self,
        draft: ContributionDraft,
    ) -> Result<ContributionReceipt, ContributionError> {
        self.store.contribute(draft)
    }

    pub fn list_contributions(
        &self,
        query: &ContributionQuery,
    ) -> Result<Vec<ContributedRentalRecord>, RepositoryError> {
        self.store.list(query)
    }

    /// Statistics for `area`, matching the stored name without regard to case.
    pub fn area_statistics(&self, area: &str) -> Result<Option<AreaStatistics>, RepositoryError> {
        let area = area.trim();
        if let Some(statistics) = self.store.area_statistics(area)? {
            return Ok(Some(statistics));
        }
        Ok(self
            .store
            .all_area_statistics()?
            .into_iter()
            .find(|statistics| statistics.area.eq_ignore_ascii_case(area)))
    }

    pub fn all_area_statistics(&self) -> Result<Vec<AreaStatistics>, RepositoryError> {
        self.store.all_area_statistics()
    }

    pub fn collect_market_dashboard_data(
        &self,
        filters: &DashboardFilters,
    ) -> Result<MarketDashboard, RepositoryError> {
        let records = self.store.list(&ContributionQuery {
            area: filters.area.clone(),
            property_type: filters.property_type,
            bedrooms: filters.bedrooms,
            postcode: None,
        })?;
        let statistics = self.store.all_area_statistics()?;
        Ok(build_dashboard(&records, &statistics, filters))
    }

    /// Best-effort analysis; community data that cannot be read is left out.
    pub async fn generate_market_analysis(&self, params: &AnalysisParams) -> MarketAnalysis {
        let community = self.community_or_empty();
        let comparables = self
            .store
            .list(&ContributionQuery {
                area: params.area.clone(),
                property_type: params.property_type,
                ..ContributionQuery::default()
            })
            .unwrap_or_else(|error| {
                warn!(error = %error, "analysis continuing without comparable contributions");
                Vec::new()
            });
        self.engine.analyze(params, &community, &comparables).await
    }

    /// Rank, then atomically replace the user's stored recommendations.
    ///
    /// Fails on invalid criteria or when sale prices cannot be fetched.
    pub async fn generate_investment_recommendations(
        &self,
        criteria: &InvestmentCriteria,
    ) -> Result<RecommendationOutcome, RecommendationError> {
        validate_criteria(criteria)?;

        let community = self.community_or_empty();
        let market = self
            .engine
            .fused_market_requiring_prices(criteria.period.as_deref(), &community)
            .await?;
        let comparables = if criteria.bedrooms.is_some() {
            self.store
                .list(&ContributionQuery {
                    area: criteria.area.clone(),
                    property_type: criteria.property_type,
                    bedrooms: criteria.bedrooms,
                    postcode: None,
                })
                .map_err(RecommendationError::Repository)?
        } else {
            Vec::new()
        };

        let recommendations =
            rank_opportunities(&market, criteria, &comparables, self.persister.now());
        let saved_recommendation_count = self
            .persister
            .replace(&criteria.user_id, recommendations.clone())?;

        Ok(RecommendationOutcome {
            recommendations,
            saved_recommendation_count,
        })
    }

    pub fn stored_recommendations(
        &self,
        user: &UserId,
    ) -> Result<Option<Vec<InvestmentRecommendation>>, RepositoryError> {
        self.persister.stored(user)
    }

    pub async fn calculate_rental_yield(&self, request: &YieldRequest) -> YieldCalculation {
        let candidate_yield =
            rental_yield(Some(request.purchase_price), Some(request.monthly_rent));
        let market_comparison = match request.area.as_deref() {
            Some(area) if !area.trim().is_empty() => {
                let community = self.community_or_empty();
                self.engine
                    .market_comparison(area.trim(), candidate_yield, &community)
                    .await
            }
            _ => None,
        };

        YieldCalculation {
            purchase_price: request.purchase_price,
            monthly_rent: request.monthly_rent,
            annual_rent: round2(request.monthly_rent * 12.0),
            rental_yield: candidate_yield,
            market_comparison,
        }
    }

    pub fn get_competitor_analysis(
        &self,
        query: &CompetitorQuery,
    ) -> Result<CompetitorAnalysis, RepositoryError> {
        let records = self.store.list(&ContributionQuery {
            area: query.area.clone(),
            property_type: query.property_type,
            bedrooms: query.bedrooms,
            postcode: None,
        })?;
        Ok(analyze_competitors(&records))
    }

    pub fn generate_property_recommendations(&self, request: &MatchRequest) -> Vec<PropertyMatch> {
        self.recommender.recommend(
            &request.preferences,
            &request.candidates,
            request.count,
            request.include_reasons,
        )
    }

    fn community_or_empty(&self) -> Vec<AreaStatistics> {
        self.store.all_area_statistics().unwrap_or_else(|error| {
            warn!(error = %error, "community statistics unavailable");
            Vec::new()
        })
    }
}
