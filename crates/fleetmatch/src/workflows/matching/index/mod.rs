//! Semantic candidate retrieval over the catalog.
//!
//! [`EmbeddingIndex`] keeps one vector per catalog item and answers
//! nearest-neighbour queries with an exhaustive cosine scan. Vectors are keyed
//! by a blake3 hash of the item's source text, so a refresh only embeds items
//! whose text changed. The index is usable before it is built: until the first
//! refresh completes every search returns no hits.

mod embedder;
mod search;

pub use embedder::{EmbeddingError, EmbeddingProvider, HashingEmbedder, HttpEmbeddingProvider};
pub use search::cosine_similarity;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::domain::ItemId;
use super::repository::{CatalogStore, EmbeddingStore, RepositoryError};

/// Stored embedding for one catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub item_id: ItemId,
    pub vector: Vec<f32>,
    pub source_text: String,
    pub content_hash: String,
}

pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub item_id: ItemId,
    pub similarity: f32,
}

/// Nearest-neighbour lookup. Implementations may be approximate.
#[async_trait]
pub trait SemanticSearch: Send + Sync {
    fn is_ready(&self) -> bool;

    async fn search(&self, query: &str, k: usize) -> Vec<SearchHit>;
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error(transparent)]
    Catalog(#[from] RepositoryError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Counters from one refresh pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub items: usize,
    pub computed: usize,
    pub reused: usize,
    pub removed: usize,
    pub persist_failures: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub ready: bool,
    pub provider: String,
    pub dimensions: usize,
    pub items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<IndexStats>,
}

struct IndexInner {
    catalog: Arc<dyn CatalogStore>,
    store: Arc<dyn EmbeddingStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    records: RwLock<Vec<EmbeddingRecord>>,
    ready: AtomicBool,
    loaded_from_store: AtomicBool,
    last_refresh: Mutex<Option<(DateTime<Utc>, IndexStats)>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

/// Exhaustive cosine-similarity index. Cheap to clone.
#[derive(Clone)]
pub struct EmbeddingIndex {
    inner: Arc<IndexInner>,
}

impl EmbeddingIndex {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        store: Arc<dyn EmbeddingStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(IndexInner {
                catalog,
                store,
                embedder,
                records: RwLock::new(Vec::new()),
                ready: AtomicBool::new(false),
                loaded_from_store: AtomicBool::new(false),
                last_refresh: Mutex::new(None),
                refresh_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Builds the index on a detached task and returns immediately.
    pub fn initialize(&self) -> JoinHandle<()> {
        let index = self.clone();
        tokio::spawn(async move {
            if let Err(err) = index.refresh().await {
                warn!(error = %err, "embedding index initialisation failed, semantic search disabled");
            }
        })
    }

    /// Re-indexes the catalog, embedding only items whose source text changed.
    pub async fn refresh(&self) -> Result<IndexStats, IndexError> {
        let _guard = self.inner.refresh_lock.lock().await;
        let items = self.inner.catalog.all()?;
        let dimensions = self.inner.embedder.dimensions();

        let mut known: HashMap<(ItemId, String), Vec<f32>> = HashMap::new();
        if !self.inner.loaded_from_store.swap(true, Ordering::SeqCst) {
            match self.inner.store.load() {
                Ok(stored) => {
                    for record in stored {
                        known.insert((record.item_id, record.content_hash), record.vector);
                    }
                }
                Err(err) => warn!(error = %err, "could not load stored embeddings"),
            }
        }

        let previous_ids: HashSet<ItemId> = {
            let records = self.read_records();
            for record in records.iter() {
                known.insert(
                    (record.item_id.clone(), record.content_hash.clone()),
                    record.vector.clone(),
                );
            }
            records.iter().map(|record| record.item_id.clone()).collect()
        };

        let mut stats = IndexStats {
            items: items.len(),
            ..IndexStats::default()
        };
        let mut slots: Vec<Option<EmbeddingRecord>> = Vec::with_capacity(items.len());
        let mut pending: Vec<usize> = Vec::new();
        let mut pending_texts: Vec<String> = Vec::new();

        for item in &items {
            let source_text = item.source_text();
            let hash = content_hash(&source_text);
            match known.remove(&(item.id.clone(), hash.clone())) {
                Some(vector) if vector.len() == dimensions => {
                    stats.reused += 1;
                    slots.push(Some(EmbeddingRecord {
                        item_id: item.id.clone(),
                        vector,
                        source_text,
                        content_hash: hash,
                    }));
                }
                _ => {
                    pending.push(slots.len());
                    pending_texts.push(source_text);
                    slots.push(None);
                }
            }
        }

        if !pending_texts.is_empty() {
            let vectors = self.inner.embedder.embed_batch(&pending_texts).await?;
            for ((slot, text), vector) in pending.into_iter().zip(pending_texts).zip(vectors) {
                let item = &items[slot];
                let record = EmbeddingRecord {
                    item_id: item.id.clone(),
                    vector,
                    content_hash: content_hash(&text),
                    source_text: text,
                };
                if let Err(err) = self.inner.store.persist(&record) {
                    stats.persist_failures += 1;
                    warn!(item = %record.item_id, error = %err, "failed to persist embedding");
                }
                stats.computed += 1;
                slots[slot] = Some(record);
            }
        }

        let records: Vec<EmbeddingRecord> = slots.into_iter().flatten().collect();
        let current_ids: HashSet<&ItemId> = records.iter().map(|record| &record.item_id).collect();
        stats.removed = previous_ids
            .iter()
            .filter(|id| !current_ids.contains(id))
            .count();

        let indexed = records.len();
        *self
            .inner
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner) = records;
        self.inner.ready.store(true, Ordering::SeqCst);
        *self
            .inner
            .last_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((Utc::now(), stats.clone()));

        metrics::gauge!("fleetmatch_index_items").set(indexed as f64);
        info!(
            items = stats.items,
            computed = stats.computed,
            reused = stats.reused,
            removed = stats.removed,
            persist_failures = stats.persist_failures,
            "embedding index refreshed"
        );

        Ok(stats)
    }

    pub fn status(&self) -> IndexStatus {
        let last = self
            .inner
            .last_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        IndexStatus {
            ready: self.is_ready(),
            provider: self.inner.embedder.name().to_string(),
            dimensions: self.inner.embedder.dimensions(),
            items: self.read_records().len(),
            refreshed_at: last.as_ref().map(|(at, _)| *at),
            last_refresh: last.map(|(_, stats)| stats),
        }
    }

    fn read_records(&self) -> std::sync::RwLockReadGuard<'_, Vec<EmbeddingRecord>> {
        self.inner
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SemanticSearch for EmbeddingIndex {
    fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    async fn search(&self, query: &str, k: usize) -> Vec<SearchHit> {
        if !self.is_ready() {
            debug!("embedding index not ready, returning no hits");
            return Vec::new();
        }
        if k == 0 || query.trim().is_empty() {
            return Vec::new();
        }

        let vector = match self.inner.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!(error = %err, "query embedding failed, returning no hits");
                return Vec::new();
            }
        };

        let records = self.read_records();
        search::nearest(&vector, &records, k)
    }
}
