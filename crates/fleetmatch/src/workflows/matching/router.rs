use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{CatalogItem, ItemId, RankingContext};
use super::pipeline::{MatchingPipeline, PipelineError, RecommendationRequest};
use super::repository::{CatalogStore, RepositoryError, RulesRepository};

fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub context: RankingContext,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Either inline items or catalog ids to hydrate.
#[derive(Debug, Deserialize)]
pub struct RankRequest {
    #[serde(default)]
    pub items: Vec<CatalogItem>,
    #[serde(default)]
    pub item_ids: Vec<ItemId>,
    pub context: RankingContext,
}

#[derive(Debug, Deserialize)]
pub struct EligibilityRequest {
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub item: Option<CatalogItem>,
    pub jurisdiction: String,
}

/// Router exposing search, ranking, eligibility and recommendations.
pub fn matching_router<C, R>(pipeline: Arc<MatchingPipeline<C, R>>) -> Router
where
    C: CatalogStore + 'static,
    R: RulesRepository + 'static,
{
    Router::new()
        .route("/api/v1/match/search", post(search_handler::<C, R>))
        .route("/api/v1/match/rank", post(rank_handler::<C, R>))
        .route("/api/v1/match/eligibility", post(eligibility_handler::<C, R>))
        .route("/api/v1/match/recommend", post(recommend_handler::<C, R>))
        .with_state(pipeline)
}

pub(crate) async fn search_handler<C, R>(
    State(pipeline): State<Arc<MatchingPipeline<C, R>>>,
    axum::Json(request): axum::Json<SearchRequest>,
) -> Response
where
    C: CatalogStore + 'static,
    R: RulesRepository + 'static,
{
    match pipeline
        .search(&request.query, &request.context, request.limit)
        .await
    {
        Ok(candidates) => (StatusCode::OK, axum::Json(candidates)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rank_handler<C, R>(
    State(pipeline): State<Arc<MatchingPipeline<C, R>>>,
    axum::Json(request): axum::Json<RankRequest>,
) -> Response
where
    C: CatalogStore + 'static,
    R: RulesRepository + 'static,
{
    let mut items = request.items;
    if !request.item_ids.is_empty() {
        match pipeline.hydrate(&request.item_ids) {
            Ok(hydrated) => items.extend(hydrated),
            Err(error) => return error_response(error),
        }
    }

    let ranked = pipeline.rank(items, &request.context);
    (StatusCode::OK, axum::Json(ranked)).into_response()
}

pub(crate) async fn eligibility_handler<C, R>(
    State(pipeline): State<Arc<MatchingPipeline<C, R>>>,
    axum::Json(request): axum::Json<EligibilityRequest>,
) -> Response
where
    C: CatalogStore + 'static,
    R: RulesRepository + 'static,
{
    let result = match (request.item, request.item_id) {
        (Some(item), _) => Ok(pipeline
            .evaluate_eligibility(&item, &request.jurisdiction)
            .await),
        (None, Some(item_id)) => {
            pipeline
                .evaluate_by_id(&item_id, &request.jurisdiction)
                .await
        }
        (None, None) => Err(PipelineError::InvalidRequest(
            "either item or item_id is required".to_string(),
        )),
    };

    match result {
        Ok(eligibility) => (StatusCode::OK, axum::Json(eligibility)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn recommend_handler<C, R>(
    State(pipeline): State<Arc<MatchingPipeline<C, R>>>,
    axum::Json(request): axum::Json<RecommendationRequest>,
) -> Response
where
    C: CatalogStore + 'static,
    R: RulesRepository + 'static,
{
    match pipeline.recommend(request).await {
        Ok(recommendation) => (StatusCode::OK, axum::Json(recommendation)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: PipelineError) -> Response {
    let status = match &error {
        PipelineError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Catalog(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        PipelineError::Catalog(RepositoryError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
