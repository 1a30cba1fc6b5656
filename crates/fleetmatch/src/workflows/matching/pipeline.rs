//! Orchestration: search, hydrate, rank, then annotate with eligibility.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::{
    CatalogFilter, CatalogItem, Category, EligibilityResult, ItemId, RankingContext,
};
use super::eligibility::EligibilityResolver;
use super::index::SemanticSearch;
use super::ranking::{Narrative, RankedItem, Ranker, RankingNarrator, ScoreBreakdown};
use super::repository::{CatalogStore, RepositoryError, RulesRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Extra semantic hits fetched per requested candidate, absorbing the ones
    /// the context filters drop.
    pub overfetch_factor: usize,
    pub max_limit: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            overfetch_factor: 3,
            max_limit: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub item: CatalogItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

/// Search output. `semantic` is false when the filter-scan fallback answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateList {
    pub semantic: bool,
    pub candidates: Vec<Candidate>,
}

impl CandidateList {
    pub fn items(&self) -> Vec<CatalogItem> {
        self.candidates
            .iter()
            .map(|candidate| candidate.item.clone())
            .collect()
    }
}

fn default_limit() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecommendationRequest {
    pub query: String,
    pub context: RankingContext,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    /// Drop items not approved for this category. Needs `jurisdiction`.
    #[serde(default)]
    pub required_category: Option<Category>,
    #[serde(default)]
    pub narrate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommended {
    pub position: usize,
    pub item: CatalogItem,
    pub breakdown: ScoreBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<EligibilityResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub semantic: bool,
    pub items: Vec<Recommended>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<Narrative>,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] RepositoryError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub struct MatchingPipeline<C, R> {
    catalog: Arc<C>,
    index: Arc<dyn SemanticSearch>,
    ranker: Ranker,
    resolver: EligibilityResolver<R>,
    narrator: RankingNarrator,
    settings: PipelineSettings,
}

impl<C, R> MatchingPipeline<C, R>
where
    C: CatalogStore + 'static,
    R: RulesRepository + 'static,
{
    pub fn new(
        catalog: Arc<C>,
        index: Arc<dyn SemanticSearch>,
        ranker: Ranker,
        resolver: EligibilityResolver<R>,
        narrator: RankingNarrator,
    ) -> Self {
        Self {
            catalog,
            index,
            ranker,
            resolver,
            narrator,
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn index_ready(&self) -> bool {
        self.index.is_ready()
    }

    /// Semantic candidates that satisfy the context filters, best first.
    pub async fn search(
        &self,
        query: &str,
        context: &RankingContext,
        k: usize,
    ) -> Result<CandidateList, PipelineError> {
        let k = k.min(self.settings.max_limit);
        let filter = CatalogFilter::from(context);

        if !self.index.is_ready() || query.trim().is_empty() {
            debug!(ready = self.index.is_ready(), "answering search with a filter scan");
            return self.filter_scan(&filter, k);
        }

        let hits = self
            .index
            .search(query, k.saturating_mul(self.settings.overfetch_factor.max(1)))
            .await;
        if hits.is_empty() {
            debug!(query, "semantic search found nothing, answering with a filter scan");
            return self.filter_scan(&filter, k);
        }
        let similarity: HashMap<ItemId, f32> = hits
            .iter()
            .map(|hit| (hit.item_id.clone(), hit.similarity))
            .collect();
        let ids: Vec<ItemId> = hits.into_iter().map(|hit| hit.item_id).collect();

        let candidates: Vec<Candidate> = self
            .catalog
            .by_ids(&ids)?
            .into_iter()
            .filter(|item| filter.matches(item))
            .take(k)
            .map(|item| Candidate {
                similarity: similarity.get(&item.id).copied(),
                item,
            })
            .collect();

        debug!(query, candidates = candidates.len(), "semantic search complete");
        Ok(CandidateList {
            semantic: true,
            candidates,
        })
    }

    fn filter_scan(
        &self,
        filter: &CatalogFilter,
        k: usize,
    ) -> Result<CandidateList, PipelineError> {
        let candidates = self
            .catalog
            .filter(filter)?
            .into_iter()
            .take(k)
            .map(|item| Candidate {
                item,
                similarity: None,
            })
            .collect();
        Ok(CandidateList {
            semantic: false,
            candidates,
        })
    }

    /// Catalog items for `ids` in request order. Any unknown id is an error.
    pub fn hydrate(&self, ids: &[ItemId]) -> Result<Vec<CatalogItem>, PipelineError> {
        let items = self.catalog.by_ids(ids)?;
        if items.len() != ids.len() {
            return Err(RepositoryError::NotFound.into());
        }
        Ok(items)
    }

    pub fn rank(&self, items: Vec<CatalogItem>, context: &RankingContext) -> Vec<RankedItem> {
        self.ranker.rank(items, context)
    }

    pub async fn evaluate_eligibility(
        &self,
        item: &CatalogItem,
        jurisdiction: &str,
    ) -> EligibilityResult {
        self.resolver.evaluate(item, jurisdiction).await
    }

    pub async fn evaluate_by_id(
        &self,
        item_id: &ItemId,
        jurisdiction: &str,
    ) -> Result<EligibilityResult, PipelineError> {
        let item = self
            .hydrate(std::slice::from_ref(item_id))?
            .into_iter()
            .next()
            .ok_or(RepositoryError::NotFound)?;
        Ok(self.resolver.evaluate(&item, jurisdiction).await)
    }

    /// search → rank → top `limit` → optional eligibility and narrative.
    pub async fn recommend(
        &self,
        request: RecommendationRequest,
    ) -> Result<Recommendation, PipelineError> {
        if request.required_category.is_some() && request.jurisdiction.is_none() {
            return Err(PipelineError::InvalidRequest(
                "required_category needs a jurisdiction".to_string(),
            ));
        }

        let limit = request.limit.clamp(1, self.settings.max_limit);
        let pool = limit.saturating_mul(self.settings.overfetch_factor.max(1));
        let candidates = self.search(&request.query, &request.context, pool).await?;
        let similarity: HashMap<ItemId, f32> = candidates
            .candidates
            .iter()
            .filter_map(|candidate| {
                candidate
                    .similarity
                    .map(|value| (candidate.item.id.clone(), value))
            })
            .collect();

        let mut ranked = self.rank(candidates.items(), &request.context);
        // Only the filtered path needs every candidate evaluated.
        if request.required_category.is_none() {
            ranked.truncate(limit);
        }

        let eligibility: Vec<Option<EligibilityResult>> = match request.jurisdiction.as_deref() {
            Some(jurisdiction) => join_all(
                ranked
                    .iter()
                    .map(|entry| self.resolver.evaluate(&entry.item, jurisdiction)),
            )
            .await
            .into_iter()
            .map(Some)
            .collect(),
            None => vec![None; ranked.len()],
        };

        let mut items: Vec<Recommended> = ranked
            .into_iter()
            .zip(eligibility)
            .filter(|(_, eligibility)| match (&request.required_category, eligibility) {
                (Some(category), Some(result)) => result.is_approved(category),
                _ => true,
            })
            .take(limit)
            .map(|(entry, eligibility)| Recommended {
                position: 0,
                similarity: similarity.get(&entry.item.id).copied(),
                item: entry.item,
                breakdown: entry.breakdown,
                eligibility,
            })
            .collect();
        for (position, entry) in items.iter_mut().enumerate() {
            entry.position = position + 1;
        }

        let narrative = match items.first() {
            Some(top) if request.narrate => {
                let ranked = RankedItem {
                    item: top.item.clone(),
                    breakdown: top.breakdown.clone(),
                };
                Some(self.narrator.narrate(&ranked, &request.context).await)
            }
            _ => None,
        };

        info!(
            semantic = candidates.semantic,
            candidates = candidates.candidates.len(),
            returned = items.len(),
            jurisdiction = request.jurisdiction.as_deref().unwrap_or("-"),
            "recommendation assembled"
        );

        Ok(Recommendation {
            semantic: candidates.semantic,
            items,
            narrative,
        })
    }
}
