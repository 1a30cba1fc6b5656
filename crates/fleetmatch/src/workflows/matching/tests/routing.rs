use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::matching::router::matching_router;

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

fn router() -> axum::Router {
    let catalog = Arc::new(MemoryCatalog::with(sample_catalog()));
    let pipeline = build_pipeline(
        catalog.clone(),
        MemoryRules::with(jurisdiction(), Some(populated_snapshot())),
        offline_gateway(),
        index_over(catalog),
    );
    matching_router(Arc::new(pipeline))
}

#[tokio::test]
async fn search_route_reports_the_filter_scan() {
    let response = router()
        .oneshot(post(
            "/api/v1/match/search",
            json!({
                "query": "family suv",
                "context": { "use_case": "family", "body_types": ["suv"] },
                "limit": 3
            }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["semantic"], false);
    assert_eq!(body["candidates"][0]["item"]["id"], "compass");
}

#[tokio::test]
async fn rank_route_hydrates_catalog_ids() {
    let response = router()
        .oneshot(post(
            "/api/v1/match/rank",
            json!({
                "item_ids": ["hb20", "compass"],
                "context": { "use_case": "family" }
            }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let ranked = body.as_array().expect("array");
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0]["item"]["id"], "compass");
    assert!(ranked[0]["breakdown"]["final_score"].as_f64().expect("score") <= 100.0);
}

#[tokio::test]
async fn rank_route_returns_not_found_for_unknown_ids() {
    let response = router()
        .oneshot(post(
            "/api/v1/match/rank",
            json!({ "item_ids": ["ghost"], "context": { "use_case": "economy" } }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn eligibility_route_evaluates_catalog_items() {
    let response = router()
        .oneshot(post(
            "/api/v1/match/eligibility",
            json!({ "item_id": "corolla-altis", "jurisdiction": "sp" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["decisions"]["standard"]["approved"], true);
    assert_eq!(body["decisions"]["standard"]["provenance"]["kind"], "allow_list");
    assert_eq!(body["decisions"]["premium"]["approved"], false);
}

#[tokio::test]
async fn eligibility_route_requires_an_item() {
    let response = router()
        .oneshot(post(
            "/api/v1/match/eligibility",
            json!({ "jurisdiction": "sp" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert!(body["error"].as_str().expect("message").contains("item_id"));
}

#[tokio::test]
async fn recommend_route_filters_by_required_category() {
    let response = router()
        .oneshot(post(
            "/api/v1/match/recommend",
            json!({
                "query": "",
                "context": { "use_case": "ride_hailing" },
                "jurisdiction": "sp",
                "required_category": "standard"
            }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let items = body["items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["item"]["id"], "corolla-altis");
    assert_eq!(items[0]["position"], 1);
}

#[tokio::test]
async fn unavailable_catalogs_surface_as_service_unavailable() {
    let pipeline = build_pipeline(
        Arc::new(UnavailableCatalog),
        MemoryRules::default(),
        offline_gateway(),
        index_over(Arc::new(MemoryCatalog::default())),
    );

    let response = matching_router(Arc::new(pipeline))
        .oneshot(post(
            "/api/v1/match/search",
            json!({ "query": "anything", "context": { "use_case": "commute" } }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
