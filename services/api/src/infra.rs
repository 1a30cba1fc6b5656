use fleetmatch::gateway::GenerativeGateway;
use fleetmatch::workflows::matching::{
    CatalogItem, CatalogStore, EmbeddingIndex, EmbeddingRecord, EmbeddingStore, ItemId,
    Jurisdiction, RepositoryError, RuleSet, RulesRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) index: EmbeddingIndex,
    pub(crate) gateway: Arc<GenerativeGateway>,
}

fn poisoned<T>(_: PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("in-memory store lock poisoned".to_string())
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCatalog {
    items: Arc<RwLock<Vec<CatalogItem>>>,
}

impl InMemoryCatalog {
    pub(crate) fn new(items: Vec<CatalogItem>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items
            .read()
            .map(|items| items.len())
            .unwrap_or_default()
    }
}

impl CatalogStore for InMemoryCatalog {
    fn all(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        Ok(self.items.read().map_err(poisoned)?.clone())
    }

    fn by_ids(&self, ids: &[ItemId]) -> Result<Vec<CatalogItem>, RepositoryError> {
        let guard = self.items.read().map_err(poisoned)?;
        Ok(ids
            .iter()
            .filter_map(|id| guard.iter().find(|item| &item.id == id).cloned())
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRules {
    jurisdictions: Arc<RwLock<Vec<Jurisdiction>>>,
    snapshots: Arc<RwLock<HashMap<String, RuleSet>>>,
}

impl InMemoryRules {
    pub(crate) fn new(jurisdictions: Vec<Jurisdiction>, snapshots: Vec<RuleSet>) -> Self {
        let snapshots = snapshots
            .into_iter()
            .map(|snapshot| (snapshot.jurisdiction.to_ascii_lowercase(), snapshot))
            .collect();
        Self {
            jurisdictions: Arc::new(RwLock::new(jurisdictions)),
            snapshots: Arc::new(RwLock::new(snapshots)),
        }
    }
}

impl RulesRepository for InMemoryRules {
    fn jurisdiction(&self, code: &str) -> Result<Option<Jurisdiction>, RepositoryError> {
        let guard = self.jurisdictions.read().map_err(poisoned)?;
        Ok(guard
            .iter()
            .find(|jurisdiction| jurisdiction.code.eq_ignore_ascii_case(code.trim()))
            .cloned())
    }

    fn jurisdictions(&self) -> Result<Vec<Jurisdiction>, RepositoryError> {
        Ok(self.jurisdictions.read().map_err(poisoned)?.clone())
    }

    fn latest_snapshot(&self, jurisdiction: &str) -> Result<Option<RuleSet>, RepositoryError> {
        let guard = self.snapshots.read().map_err(poisoned)?;
        Ok(guard
            .get(&jurisdiction.trim().to_ascii_lowercase())
            .cloned())
    }
}

/// Embedding records kept for the lifetime of the process.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEmbeddingStore {
    records: Arc<Mutex<HashMap<ItemId, EmbeddingRecord>>>,
}

impl EmbeddingStore for InMemoryEmbeddingStore {
    fn load(&self) -> Result<Vec<EmbeddingRecord>, RepositoryError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard.values().cloned().collect())
    }

    fn persist(&self, record: &EmbeddingRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        guard.insert(record.item_id.clone(), record.clone());
        Ok(())
    }
}
