use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::analysis::{AnalysisParams, DashboardFilters};
use super::contributions::ContributionError;
use super::domain::{ContributionDraft, ContributionQuery, UserId};
use super::recommendations::{InvestmentCriteria, RecommendationError};
use super::repository::{
    ContributionRepository, RecommendationRepository, RepositoryError, StatisticsRepository,
};
use super::service::{CompetitorQuery, MarketIntelligenceService, MatchRequest, YieldRequest};

type SharedService<C, S, R> = Arc<MarketIntelligenceService<C, S, R>>;

/// Router builder exposing the market intelligence endpoints.
pub fn market_router<C, S, R>(service: SharedService<C, S, R>) -> Router
where
    C: ContributionRepository + 'static,
    S: StatisticsRepository + 'static,
    R: RecommendationRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/market/contributions",
            post(contribute_handler::<C, S, R>).get(list_contributions_handler::<C, S, R>),
        )
        .route(
            "/api/v1/market/areas/:area/statistics",
            get(area_statistics_handler::<C, S, R>),
        )
        .route("/api/v1/market/dashboard", post(dashboard_handler::<C, S, R>))
        .route("/api/v1/market/analysis", post(analysis_handler::<C, S, R>))
        .route("/api/v1/market/yield", post(yield_handler::<C, S, R>))
        .route(
            "/api/v1/market/competitors",
            post(competitors_handler::<C, S, R>),
        )
        .route(
            "/api/v1/market/investments",
            post(investments_handler::<C, S, R>),
        )
        .route(
            "/api/v1/market/investments/:user_id",
            get(stored_investments_handler::<C, S, R>),
        )
        .route("/api/v1/market/matches", post(matches_handler::<C, S, R>))
        .with_state(service)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (status, axum::Json(payload)).into_response()
}

fn repository_failure(error: RepositoryError) -> Response {
    let status = match error {
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error.to_string())
}

pub(crate) async fn contribute_handler<C, S, R>(
    State(service): State<SharedService<C, S, R>>,
    axum::Json(draft): axum::Json<ContributionDraft>,
) -> Response
where
    C: ContributionRepository + 'static,
    S: StatisticsRepository + 'static,
    R: RecommendationRepository + 'static,
{
    match service.contribute(draft) {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Err(ContributionError::Validation(error)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        Err(error @ ContributionError::ConcurrencyConflict { .. }) => {
            error_response(StatusCode::CONFLICT, error.to_string())
        }
        Err(ContributionError::Repository(error)) => repository_failure(error),
    }
}

pub(crate) async fn list_contributions_handler<C, S, R>(
    State(service): State<SharedService<C, S, R>>,
    Query(query): Query<ContributionQuery>,
) -> Response
where
    C: ContributionRepository + 'static,
    S: StatisticsRepository + 'static,
    R: RecommendationRepository + 'static,
{
    match service.list_contributions(&query) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(error) => repository_failure(error),
    }
}

pub(crate) async fn area_statistics_handler<C, S, R>(
    State(service): State<SharedService<C, S, R>>,
    Path(area): Path<String>,
) -> Response
where
    C: ContributionRepository + 'static,
    S: StatisticsRepository + 'static,
    R: RecommendationRepository + 'static,
{
    match service.area_statistics(&area) {
        Ok(Some(statistics)) => (StatusCode::OK, axum::Json(statistics)).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("no contributed rents recorded for {area}"),
        ),
        Err(error) => repository_failure(error),
    }
}

pub(crate) async fn dashboard_handler<C, S, R>(
    State(service): State<SharedService<C, S, R>>,
    axum::Json(filters): axum::Json<DashboardFilters>,
) -> Response
where
    C: ContributionRepository + 'static,
    S: StatisticsRepository + 'static,
    R: RecommendationRepository + 'static,
{
    match service.collect_market_dashboard_data(&filters) {
        Ok(dashboard) => (StatusCode::OK, axum::Json(dashboard)).into_response(),
        Err(error) => repository_failure(error),
    }
}

pub(crate) async fn analysis_handler<C, S, R>(
    State(service): State<SharedService<C, S, R>>,
    axum::Json(params): axum::Json<AnalysisParams>,
) -> Response
where
    C: ContributionRepository + 'static,
    S: StatisticsRepository + 'static,
    R: RecommendationRepository + 'static,
{
    let analysis = service.generate_market_analysis(&params).await;
    (StatusCode::OK, axum::Json(analysis)).into_response()
}

pub(crate) async fn yield_handler<C, S, R>(
    State(service): State<SharedService<C, S, R>>,
    axum::Json(request): axum::Json<YieldRequest>,
) -> Response
where
    C: ContributionRepository + 'static,
    S: StatisticsRepository + 'static,
    R: RecommendationRepository + 'static,
{
    let calculation = service.calculate_rental_yield(&request).await;
    (StatusCode::OK, axum::Json(calculation)).into_response()
}

pub(crate) async fn competitors_handler<C, S, R>(
    State(service): State<SharedService<C, S, R>>,
    axum::Json(query): axum::Json<CompetitorQuery>,
) -> Response
where
    C: ContributionRepository + 'static,
    S: StatisticsRepository + 'static,
    R: RecommendationRepository + 'static,
{
    match service.get_competitor_analysis(&query) {
        Ok(analysis) => (StatusCode::OK, axum::Json(analysis)).into_response(),
        Err(error) => repository_failure(error),
    }
}

pub(crate) async fn investments_handler<C, S, R>(
    State(service): State<SharedService<C, S, R>>,
    axum::Json(criteria): axum::Json<InvestmentCriteria>,
) -> Response
where
    C: ContributionRepository + 'static,
    S: StatisticsRepository + 'static,
    R: RecommendationRepository + 'static,
{
    match service.generate_investment_recommendations(&criteria).await {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(RecommendationError::Validation(error)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        Err(RecommendationError::Source(error)) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, error.to_string())
        }
        Err(error @ RecommendationError::ConcurrencyConflict { .. }) => {
            error_response(StatusCode::CONFLICT, error.to_string())
        }
        Err(RecommendationError::Repository(error)) => repository_failure(error),
    }
}

pub(crate) async fn stored_investments_handler<C, S, R>(
    State(service): State<SharedService<C, S, R>>,
    Path(user_id): Path<String>,
) -> Response
where
    C: ContributionRepository + 'static,
    S: StatisticsRepository + 'static,
    R: RecommendationRepository + 'static,
{
    let user = UserId(user_id);
    match service.stored_recommendations(&user) {
        Ok(Some(rows)) => (StatusCode::OK, axum::Json(rows)).into_response(),
        Ok(None) => {
            let payload = json!({
                "user_id": user.0,
                "status": "not_generated",
                "recommendations": serde_json::Value::Null,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => repository_failure(error),
    }
}

pub(crate) async fn matches_handler<C, S, R>(
    State(service): State<SharedService<C, S, R>>,
    axum::Json(request): axum::Json<MatchRequest>,
) -> Response
where
    C: ContributionRepository + 'static,
    S: StatisticsRepository + 'static,
    R: RecommendationRepository + 'static,
{
    let matches = service.generate_property_recommendations(&request);
    (StatusCode::OK, axum::Json(matches)).into_response()
}
