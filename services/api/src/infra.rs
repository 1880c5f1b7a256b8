use metrics_exporter_prometheus::PrometheusHandle;
use rental_intel::config::{MarketConfig, MarketSourceMode};
use rental_intel::error::AppError;
use rental_intel::market::{
    Clock, CsvSourceAdapter, FixtureSourceAdapter, HttpSourceAdapter,
    InMemoryContributionRepository, InMemoryRecommendationRepository,
    InMemoryStatisticsRepository, MarketIntelligenceService, SourceAdapter, SystemClock,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type ApiService = MarketIntelligenceService<
    InMemoryContributionRepository,
    InMemoryStatisticsRepository,
    InMemoryRecommendationRepository,
>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Adapter for the configured market source. CSV exports are read once up front.
pub(crate) fn market_adapter(config: &MarketConfig) -> Result<Arc<dyn SourceAdapter>, AppError> {
    let adapter: Arc<dyn SourceAdapter> = match &config.source {
        MarketSourceMode::Fixture => Arc::new(FixtureSourceAdapter::standard()),
        MarketSourceMode::Http { base_url } => {
            Arc::new(HttpSourceAdapter::new(base_url.clone(), config.fetch_timeout)?)
        }
        MarketSourceMode::Csv { path } => Arc::new(CsvSourceAdapter::from_path(path)?),
    };
    info!(source = adapter.name(), "market source adapter selected");
    Ok(adapter)
}

/// Service over in-memory repositories and the wall clock.
pub(crate) fn in_memory_service(
    adapter: Arc<dyn SourceAdapter>,
    config: &MarketConfig,
) -> Arc<ApiService> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    Arc::new(MarketIntelligenceService::new(
        Arc::new(InMemoryContributionRepository::default()),
        Arc::new(InMemoryStatisticsRepository::default()),
        Arc::new(InMemoryRecommendationRepository::default()),
        adapter,
        clock,
        config,
    ))
}
