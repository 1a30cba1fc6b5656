use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use crate::gateway::{
    ChatMessage, CompletionOptions, CompletionProvider, GatewaySettings, GenerativeGateway,
    ProviderConfig, ProviderError,
};
use crate::workflows::matching::domain::{
    BodyType, CatalogItem, Category, EligibilityRule, FuelType, ItemId, Jurisdiction, RideTier,
    RuleSet, SubScores, Transmission,
};
use crate::workflows::matching::eligibility::{EligibilityConfig, EligibilityResolver};
use crate::workflows::matching::index::{EmbeddingIndex, HashingEmbedder};
use crate::workflows::matching::pipeline::MatchingPipeline;
use crate::workflows::matching::ranking::{Ranker, RankingNarrator};
use crate::workflows::matching::repository::{
    CatalogStore, NoopEmbeddingStore, RepositoryError, RulesRepository,
};

pub(super) const CURRENT_YEAR: i32 = 2026;

pub(super) fn item(id: &str, brand: &str, model: &str, year: i32) -> CatalogItem {
    CatalogItem {
        id: ItemId(id.to_string()),
        brand: brand.to_string(),
        model: model.to_string(),
        model_year: year,
        body_type: BodyType::Sedan,
        transmission: Transmission::Automatic,
        fuel: FuelType::Flex,
        doors: 4,
        air_conditioning: true,
        price: 90_000,
        distance_km: 60_000,
        scores: SubScores {
            comfort: 7,
            economy: 7,
            space: 7,
            safety: 7,
            value: 7,
        },
        description: None,
    }
}

pub(super) fn corolla_altis() -> CatalogItem {
    item("corolla-altis", "Toyota", "Corolla Altis", 2016)
}

pub(super) fn hb20() -> CatalogItem {
    let mut hb20 = item("hb20", "Hyundai", "HB20", 2020);
    hb20.body_type = BodyType::Hatchback;
    hb20.transmission = Transmission::Manual;
    hb20
}

pub(super) fn sample_catalog() -> Vec<CatalogItem> {
    let mut compass = item("compass", "Jeep", "Compass Longitude", 2024);
    compass.body_type = BodyType::Suv;
    compass.price = 160_000;
    compass.distance_km = 18_000;
    compass.scores = SubScores {
        comfort: 9,
        economy: 5,
        space: 8,
        safety: 9,
        value: 6,
    };

    let mut strada = item("strada", "Fiat", "Strada Freedom", 2022);
    strada.body_type = BodyType::Pickup;
    strada.transmission = Transmission::Manual;
    strada.price = 95_000;
    strada.distance_km = 42_000;
    strada.scores = SubScores {
        comfort: 5,
        economy: 8,
        space: 9,
        safety: 6,
        value: 8,
    };

    vec![corolla_altis(), hb20(), compass, strada]
}

/// São Paulo-like jurisdiction: ten-year age limit, floor 2016 in 2026.
pub(super) fn jurisdiction() -> Jurisdiction {
    Jurisdiction {
        code: "sp".to_string(),
        name: "São Paulo".to_string(),
        max_age_years: 10,
        policy_summary: "Comfort requires sedans or SUVs; premium requires luxury brands."
            .to_string(),
        extension_categories: Vec::new(),
    }
}

pub(super) fn rule(brand: &str, model: &str, min_year: i32) -> EligibilityRule {
    EligibilityRule {
        brand: brand.to_string(),
        model: model.to_string(),
        min_year,
        provenance: "platform help centre".to_string(),
    }
}

pub(super) fn snapshot(rules: Vec<(RideTier, Vec<EligibilityRule>)>) -> RuleSet {
    RuleSet {
        jurisdiction: "sp".to_string(),
        fetched_at: Utc::now(),
        ttl_seconds: 3600,
        source: "sp-2026-10".to_string(),
        rules_by_category: rules
            .into_iter()
            .map(|(tier, rules)| (Category::from(tier), rules))
            .collect::<BTreeMap<_, _>>(),
    }
}

pub(super) fn stale(mut snapshot: RuleSet) -> RuleSet {
    snapshot.fetched_at = Utc::now() - ChronoDuration::hours(3);
    snapshot
}

/// Allow-lists for every tier, so the fallback is never needed.
pub(super) fn populated_snapshot() -> RuleSet {
    snapshot(vec![
        (RideTier::Standard, vec![rule("Toyota", "Corolla", 2011)]),
        (RideTier::Comfort, vec![rule("Toyota", "Corolla", 2018)]),
        (RideTier::Premium, vec![rule("BMW", "320i", 2020)]),
    ])
}

#[derive(Default, Clone)]
pub(super) struct MemoryCatalog {
    pub(super) items: Arc<Mutex<Vec<CatalogItem>>>,
}

impl MemoryCatalog {
    pub(super) fn with(items: Vec<CatalogItem>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items)),
        }
    }
}

impl CatalogStore for MemoryCatalog {
    fn all(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        Ok(self.items.lock().expect("catalog mutex poisoned").clone())
    }

    fn by_ids(&self, ids: &[ItemId]) -> Result<Vec<CatalogItem>, RepositoryError> {
        let items = self.items.lock().expect("catalog mutex poisoned");
        Ok(ids
            .iter()
            .filter_map(|id| items.iter().find(|item| &item.id == id).cloned())
            .collect())
    }
}

pub(super) struct UnavailableCatalog;

impl CatalogStore for UnavailableCatalog {
    fn all(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        Err(RepositoryError::Unavailable("catalog offline".to_string()))
    }

    fn by_ids(&self, _ids: &[ItemId]) -> Result<Vec<CatalogItem>, RepositoryError> {
        Err(RepositoryError::Unavailable("catalog offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRules {
    jurisdictions: Arc<Mutex<HashMap<String, Jurisdiction>>>,
    snapshots: Arc<Mutex<HashMap<String, RuleSet>>>,
}

impl MemoryRules {
    pub(super) fn with(jurisdiction: Jurisdiction, snapshot: Option<RuleSet>) -> Self {
        let rules = Self::default();
        if let Some(snapshot) = snapshot {
            rules
                .snapshots
                .lock()
                .expect("rules mutex poisoned")
                .insert(jurisdiction.code.clone(), snapshot);
        }
        rules
            .jurisdictions
            .lock()
            .expect("rules mutex poisoned")
            .insert(jurisdiction.code.clone(), jurisdiction);
        rules
    }
}

impl RulesRepository for MemoryRules {
    fn jurisdiction(&self, code: &str) -> Result<Option<Jurisdiction>, RepositoryError> {
        let guard = self.jurisdictions.lock().expect("rules mutex poisoned");
        Ok(guard.get(code).cloned())
    }

    fn jurisdictions(&self) -> Result<Vec<Jurisdiction>, RepositoryError> {
        let guard = self.jurisdictions.lock().expect("rules mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn latest_snapshot(&self, jurisdiction: &str) -> Result<Option<RuleSet>, RepositoryError> {
        let guard = self.snapshots.lock().expect("rules mutex poisoned");
        Ok(guard.get(jurisdiction).cloned())
    }
}

/// Replays scripted completions and counts calls; repeats the last step.
pub(super) struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(super) fn replying(texts: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(texts.iter().map(|text| Ok(text.to_string())).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub(super) fn failing() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::from([Err("connection refused".to_string())])),
            calls: AtomicUsize::new(0),
        })
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().expect("script mutex poisoned");
        let step = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        match step {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(ProviderError::Transport(reason)),
            None => Err(ProviderError::EmptyResponse),
        }
    }
}

pub(super) fn fast_settings() -> GatewaySettings {
    GatewaySettings {
        failure_threshold: 3,
        cooldown: Duration::from_millis(50),
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        request_timeout: Duration::from_millis(200),
        max_concurrency: 4,
    }
}

pub(super) fn gateway_with(provider: Arc<ScriptedProvider>) -> Arc<GenerativeGateway> {
    Arc::new(
        GenerativeGateway::new(fast_settings())
            .with_provider(ProviderConfig::new("scripted", 0), provider),
    )
}

pub(super) fn offline_gateway() -> Arc<GenerativeGateway> {
    Arc::new(GenerativeGateway::new(fast_settings()))
}

pub(super) fn resolver(
    rules: MemoryRules,
    gateway: Arc<GenerativeGateway>,
) -> EligibilityResolver<MemoryRules> {
    EligibilityResolver::new(
        EligibilityConfig::for_year(CURRENT_YEAR),
        Arc::new(rules),
        gateway,
    )
}

pub(super) fn build_pipeline<C>(
    catalog: Arc<C>,
    rules: MemoryRules,
    gateway: Arc<GenerativeGateway>,
    index: Arc<EmbeddingIndex>,
) -> MatchingPipeline<C, MemoryRules>
where
    C: CatalogStore + 'static,
{
    MatchingPipeline::new(
        catalog,
        index,
        Ranker::new(CURRENT_YEAR),
        resolver(rules, gateway.clone()),
        RankingNarrator::new(gateway),
    )
}

pub(super) fn index_over(catalog: Arc<MemoryCatalog>) -> Arc<EmbeddingIndex> {
    Arc::new(EmbeddingIndex::new(
        catalog,
        Arc::new(NoopEmbeddingStore),
        Arc::new(HashingEmbedder::new(256)),
    ))
}
