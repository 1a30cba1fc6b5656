use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json};
use fleetmatch::workflows::matching::{
    matching_router, CatalogStore, MatchingPipeline, RulesRepository, SemanticSearch,
};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::warn;

pub(crate) fn with_service_routes<C, R>(pipeline: Arc<MatchingPipeline<C, R>>) -> axum::Router
where
    C: CatalogStore + 'static,
    R: RulesRepository + 'static,
{
    matching_router(pipeline)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/match/index", get(index_status_endpoint))
        .route("/api/v1/match/index/refresh", post(index_refresh_endpoint))
        .route("/api/v1/match/providers", get(provider_health_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// The service is ready once it is bound. The index may still be building;
/// search falls back to a filter scan until it finishes.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let index_ready = state.index.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready", "semantic_search": index_ready })
    } else {
        json!({ "status": "initializing", "semantic_search": index_ready })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn index_status_endpoint(Extension(state): Extension<AppState>) -> Response {
    (StatusCode::OK, Json(state.index.status())).into_response()
}

pub(crate) async fn index_refresh_endpoint(Extension(state): Extension<AppState>) -> Response {
    match state.index.refresh().await {
        Ok(stats) => (StatusCode::OK, Json(json!({ "refreshed": stats }))).into_response(),
        Err(err) => {
            warn!(error = %err, "manual index refresh failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

pub(crate) async fn provider_health_endpoint(
    Extension(state): Extension<AppState>,
) -> Json<serde_json::Value> {
    Json(json!({ "providers": state.gateway.health() }))
}
