use super::domain::{CatalogFilter, CatalogItem, EligibilityRule, ItemId, Jurisdiction, RuleSet};
use super::index::EmbeddingRecord;

/// Read access to the catalog. Ordering of `all` is the catalog insertion order.
pub trait CatalogStore: Send + Sync {
    fn all(&self) -> Result<Vec<CatalogItem>, RepositoryError>;

    /// Items for `ids`, in the order requested. Unknown ids are skipped.
    fn by_ids(&self, ids: &[ItemId]) -> Result<Vec<CatalogItem>, RepositoryError>;

    fn filter(&self, filter: &CatalogFilter) -> Result<Vec<CatalogItem>, RepositoryError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|item| filter.matches(item))
            .collect())
    }
}

/// Jurisdiction policies and versioned allow-list snapshots.
pub trait RulesRepository: Send + Sync {
    fn jurisdiction(&self, code: &str) -> Result<Option<Jurisdiction>, RepositoryError>;

    fn jurisdictions(&self) -> Result<Vec<Jurisdiction>, RepositoryError>;

    /// Most recent snapshot, fresh or not. Freshness is judged by the caller.
    fn latest_snapshot(&self, jurisdiction: &str) -> Result<Option<RuleSet>, RepositoryError>;

    fn list_rules(&self, jurisdiction: &str) -> Result<Vec<EligibilityRule>, RepositoryError> {
        Ok(self
            .latest_snapshot(jurisdiction)?
            .map(|snapshot| snapshot.rules_by_category.into_values().flatten().collect())
            .unwrap_or_default())
    }
}

/// Durable home for computed embeddings.
pub trait EmbeddingStore: Send + Sync {
    fn load(&self) -> Result<Vec<EmbeddingRecord>, RepositoryError>;
    fn persist(&self, record: &EmbeddingRecord) -> Result<(), RepositoryError>;
}

/// Error enumeration for collaborator failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Store that keeps nothing. Embeddings are recomputed on every start.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmbeddingStore;

impl EmbeddingStore for NoopEmbeddingStore {
    fn load(&self) -> Result<Vec<EmbeddingRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn persist(&self, _record: &EmbeddingRecord) -> Result<(), RepositoryError> {
        Ok(())
    }
}
