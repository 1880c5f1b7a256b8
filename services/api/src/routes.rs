use crate::infra::{ApiService, AppState};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use rental_intel::market::market_router;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_market_routes(service: Arc<ApiService>) -> Router {
    let info = Router::new()
        .route("/api/v1/market/source", axum::routing::get(source_endpoint))
        .with_state(service.clone());

    market_router(service)
        .merge(info)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "initializing")
    };
    (status, Json(json!({ "status": label })))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Which adapter feeds the analysis and the cache lifetimes it runs with.
pub(crate) async fn source_endpoint(
    State(service): State<Arc<ApiService>>,
) -> Json<serde_json::Value> {
    Json(json!({
        "source": service.source_name(),
        "region": service.region(),
        "period": service.default_period(),
    }))
}
