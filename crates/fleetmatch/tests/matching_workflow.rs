//! End-to-end matching scenarios exercised through the public pipeline and router.
//!
//! Collaborators are in-memory so the full search, rank and eligibility path runs
//! without network access. The generative fallback is scripted per test.

mod common {
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use fleetmatch::gateway::{
        ChatMessage, CompletionOptions, CompletionProvider, GatewaySettings, GenerativeGateway,
        ProviderConfig, ProviderError,
    };
    use fleetmatch::workflows::matching::{
        CatalogItem, CatalogStore, Category, CsvCatalogImporter, EligibilityConfig,
        EligibilityResolver, EligibilityRule, EmbeddingIndex, HashingEmbedder, ItemId,
        Jurisdiction, MatchingPipeline, NoopEmbeddingStore, Ranker, RankingNarrator,
        RepositoryError, RideTier, RuleSet, RulesRepository,
    };

    pub(super) const CURRENT_YEAR: i32 = 2026;

    const CATALOG: &str = "ID,Brand,Model,Year,Body Type,Transmission,Fuel,Doors,Air Conditioning,Price,Mileage,Comfort,Economy,Space,Safety,Value,Description\n\
corolla,Toyota,Corolla XEi,2021,Sedan,CVT,Flex,4,yes,118900,48000,8,7,7,9,7,Comfortable family sedan with a large trunk\n\
onix,Chevrolet,Onix Plus LT,2023,Sedan,Automatic,Flex,4,yes,94000,22000,7,8,6,8,8,Compact sedan for ride-hailing drivers\n\
kwid,Renault,Kwid Zen,2015,Hatchback,Manual,Flex,4,yes,39900,120000,4,9,3,5,9,Cheap city hatch\n\
strada,Fiat,Strada Freedom,2022,Pickup,Manual,Flex,2,yes,99000,42000,5,7,9,6,8,Light pickup for deliveries\n\
bmw,BMW,320i M Sport,2020,Sedan,Automatic,Gasoline,4,yes,215000,56000,10,5,7,9,5,Premium sports sedan\n";

    pub(super) fn catalog_items() -> Vec<CatalogItem> {
        CsvCatalogImporter::from_reader(CATALOG.as_bytes()).expect("catalog fixture imports")
    }

    pub(super) struct Catalog(pub(super) Vec<CatalogItem>);

    impl CatalogStore for Catalog {
        fn all(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
            Ok(self.0.clone())
        }

        fn by_ids(&self, ids: &[ItemId]) -> Result<Vec<CatalogItem>, RepositoryError> {
            Ok(ids
                .iter()
                .filter_map(|id| self.0.iter().find(|item| &item.id == id).cloned())
                .collect())
        }
    }

    pub(super) struct Rules {
        jurisdictions: Vec<Jurisdiction>,
        snapshots: Vec<RuleSet>,
    }

    impl RulesRepository for Rules {
        fn jurisdiction(&self, code: &str) -> Result<Option<Jurisdiction>, RepositoryError> {
            Ok(self
                .jurisdictions
                .iter()
                .find(|jurisdiction| jurisdiction.code == code)
                .cloned())
        }

        fn jurisdictions(&self) -> Result<Vec<Jurisdiction>, RepositoryError> {
            Ok(self.jurisdictions.clone())
        }

        fn latest_snapshot(&self, jurisdiction: &str) -> Result<Option<RuleSet>, RepositoryError> {
            Ok(self
                .snapshots
                .iter()
                .find(|snapshot| snapshot.jurisdiction == jurisdiction)
                .cloned())
        }
    }

    fn jurisdiction(code: &str, max_age_years: u8) -> Jurisdiction {
        Jurisdiction {
            code: code.to_string(),
            name: code.to_uppercase(),
            max_age_years,
            policy_summary: "Four doors, air conditioning, recent model year.".to_string(),
            extension_categories: Vec::new(),
        }
    }

    fn rule(brand: &str, model: &str, min_year: i32) -> EligibilityRule {
        EligibilityRule {
            brand: brand.to_string(),
            model: model.to_string(),
            min_year,
            provenance: "fixture".to_string(),
        }
    }

    /// `sp` carries a fresh allow-list; `rj` has no snapshot at all.
    pub(super) fn rules() -> Rules {
        let mut rules_by_category = BTreeMap::new();
        rules_by_category.insert(
            Category::from(RideTier::Standard),
            vec![rule("Toyota", "Corolla", 2016), rule("Chevrolet", "Onix", 2018)],
        );
        rules_by_category.insert(
            Category::from(RideTier::Comfort),
            vec![rule("Toyota", "Corolla", 2020)],
        );
        rules_by_category.insert(
            Category::from(RideTier::Premium),
            vec![rule("BMW", "320i", 2019)],
        );

        Rules {
            jurisdictions: vec![jurisdiction("sp", 10), jurisdiction("rj", 8)],
            snapshots: vec![RuleSet {
                jurisdiction: "sp".to_string(),
                fetched_at: Utc::now(),
                ttl_seconds: 3_600,
                source: "fixture".to_string(),
                rules_by_category,
            }],
        }
    }

    pub(super) struct Scripted {
        replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    }

    impl Scripted {
        pub(super) fn new(replies: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> Result<String, ProviderError> {
            self.replies
                .lock()
                .expect("script mutex poisoned")
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Transport("script exhausted".to_string())))
        }
    }

    pub(super) fn gateway(provider: Option<Arc<Scripted>>) -> Arc<GenerativeGateway> {
        let settings = GatewaySettings {
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            request_timeout: Duration::from_secs(2),
            max_concurrency: 4,
        };
        let gateway = GenerativeGateway::new(settings);
        Arc::new(match provider {
            Some(provider) => gateway.with_provider(ProviderConfig::new("scripted", 0), provider),
            None => gateway,
        })
    }

    pub(super) async fn pipeline(
        provider: Option<Arc<Scripted>>,
    ) -> Arc<MatchingPipeline<Catalog, Rules>> {
        let catalog = Arc::new(Catalog(catalog_items()));
        let index = EmbeddingIndex::new(
            catalog.clone(),
            Arc::new(NoopEmbeddingStore),
            Arc::new(HashingEmbedder::new(256)),
        );
        index.refresh().await.expect("index builds");

        let gateway = gateway(provider);
        Arc::new(MatchingPipeline::new(
            catalog,
            Arc::new(index),
            Ranker::new(CURRENT_YEAR),
            EligibilityResolver::new(
                EligibilityConfig::for_year(CURRENT_YEAR),
                Arc::new(rules()),
                gateway.clone(),
            ),
            RankingNarrator::new(gateway),
        ))
    }
}

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::*;
use fleetmatch::workflows::matching::{
    matching_router, Category, ItemId, Provenance, RankingContext, RecommendationRequest,
    RideTier, UseCase,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn request(use_case: UseCase, query: &str) -> RecommendationRequest {
    RecommendationRequest {
        query: query.to_string(),
        context: RankingContext::new(use_case),
        limit: 3,
        jurisdiction: None,
        required_category: None,
        narrate: false,
    }
}

#[tokio::test]
async fn recommendation_uses_semantic_retrieval_once_indexed() {
    let pipeline = pipeline(None).await;
    assert!(pipeline.index_ready());

    let recommendation = pipeline
        .recommend(request(UseCase::Family, "comfortable family sedan large trunk"))
        .await
        .expect("recommendation succeeds");

    assert!(recommendation.semantic);
    assert!(!recommendation.items.is_empty());
    assert!(recommendation.items.len() <= 3);
    let positions: Vec<usize> = recommendation.items.iter().map(|entry| entry.position).collect();
    assert_eq!(positions, (1..=recommendation.items.len()).collect::<Vec<_>>());
    assert!(recommendation
        .items
        .windows(2)
        .all(|pair| pair[0].breakdown.final_score >= pair[1].breakdown.final_score));
    assert!(recommendation
        .items
        .iter()
        .all(|entry| entry.similarity.is_some()));
}

#[tokio::test]
async fn budget_filters_apply_before_ranking() {
    let pipeline = pipeline(None).await;
    let mut req = request(UseCase::Economy, "");
    req.context = RankingContext::new(UseCase::Economy).with_budget(100_000);
    req.limit = 10;

    let recommendation = pipeline.recommend(req).await.expect("recommendation succeeds");

    assert!(!recommendation.semantic);
    assert!(recommendation
        .items
        .iter()
        .all(|entry| entry.item.price <= 100_000));
    assert!(recommendation
        .items
        .iter()
        .all(|entry| entry.item.id.0 != "bmw" && entry.item.id.0 != "corolla"));
}

#[tokio::test]
async fn allow_list_decides_fresh_jurisdictions_without_the_provider() {
    let provider = Scripted::new(Vec::new());
    let pipeline = pipeline(Some(provider)).await;

    let result = pipeline
        .evaluate_by_id(&ItemId("corolla".to_string()), "sp")
        .await
        .expect("item exists");

    let standard = result
        .decision(&Category::from(RideTier::Standard))
        .expect("standard decided");
    assert!(standard.approved);
    assert!(matches!(standard.provenance, Provenance::AllowList { .. }));
    assert!(result.is_approved(&Category::from(RideTier::Comfort)));
    assert!(!result.is_approved(&Category::from(RideTier::Premium)));
}

#[tokio::test]
async fn hard_gates_and_age_cutoffs_precede_rules() {
    let pipeline = pipeline(None).await;

    let strada = pipeline
        .evaluate_by_id(&ItemId("strada".to_string()), "sp")
        .await
        .expect("item exists");
    assert!(strada
        .decisions
        .values()
        .all(|decision| !decision.approved && decision.provenance == Provenance::HardGate));

    let kwid = pipeline
        .evaluate_by_id(&ItemId("kwid".to_string()), "sp")
        .await
        .expect("item exists");
    assert!(kwid
        .decisions
        .values()
        .all(|decision| !decision.approved && decision.provenance == Provenance::AgeCutoff));
}

#[tokio::test]
async fn missing_snapshot_falls_back_to_the_provider() {
    let reply = json!({
        "categories": {
            "standard": true,
            "comfort": { "approved": false, "reasoning": "compact cabin" },
            "premium": false
        },
        "confidence": 0.8
    })
    .to_string();
    let pipeline = pipeline(Some(Scripted::new(vec![Ok(reply)]))).await;

    let result = pipeline
        .evaluate_by_id(&ItemId("onix".to_string()), "rj")
        .await
        .expect("item exists");

    let standard = result
        .decision(&Category::from(RideTier::Standard))
        .expect("standard decided");
    assert!(standard.approved);
    assert!((standard.confidence - 0.8).abs() < f32::EPSILON);
    assert_eq!(
        standard.provenance,
        Provenance::GenerativeFallback {
            provider: Some("scripted".to_string())
        }
    );
    let comfort = result
        .decision(&Category::from(RideTier::Comfort))
        .expect("comfort decided");
    assert!(!comfort.approved);
    assert_eq!(comfort.reasoning, "compact cabin");
}

#[tokio::test]
async fn unreachable_providers_degrade_to_low_confidence_rejections() {
    let pipeline = pipeline(None).await;

    let result = pipeline
        .evaluate_by_id(&ItemId("onix".to_string()), "rj")
        .await
        .expect("item exists");

    assert_eq!(result.decisions.len(), 3);
    assert!(result
        .decisions
        .values()
        .all(|decision| !decision.approved && (decision.confidence - 0.2).abs() < 1e-6));
}

#[tokio::test]
async fn recommend_route_filters_by_required_category() {
    let pipeline = pipeline(None).await;
    let app = matching_router(pipeline);

    let body = json!({
        "query": "",
        "context": { "use_case": "ride_hailing" },
        "limit": 5,
        "jurisdiction": "sp",
        "required_category": "premium"
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/match/recommend")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let payload: Value = serde_json::from_slice(&bytes).expect("json body");
    let items = payload["items"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["item"]["id"], "bmw");
    assert_eq!(items[0]["position"], 1);
}
