//! Vehicle matching and eligibility decisions.
//!
//! Requests flow through [`MatchingPipeline`]: semantic retrieval over the
//! catalog ([`index`]), deterministic use-case ranking ([`ranking`]) and layered
//! per-jurisdiction eligibility ([`eligibility`]) backed by the generative
//! gateway for categories without known rules.

pub mod catalog;
pub mod domain;
pub mod eligibility;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod ranking;
pub mod repository;
pub mod router;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogImportError, CsvCatalogImporter};
pub use domain::{
    BodyType, CatalogFilter, CatalogItem, Category, CategoryDecision, EligibilityResult,
    EligibilityRule, FuelType, ItemId, Jurisdiction, Provenance, RankingContext, RideTier,
    RuleSet, ScoreDimension, SubScores, Transmission, UseCase,
};
pub use eligibility::{EligibilityConfig, EligibilityResolver, GateFailure};
pub use error::MatchingError;
pub use index::{
    EmbeddingIndex, EmbeddingProvider, EmbeddingRecord, HashingEmbedder, HttpEmbeddingProvider,
    IndexStats, IndexStatus, SearchHit, SemanticSearch,
};
pub use pipeline::{
    Candidate, CandidateList, MatchingPipeline, PipelineError, PipelineSettings, Recommendation,
    RecommendationRequest, Recommended,
};
pub use ranking::{
    Narrative, RankedItem, Ranker, RankingNarrator, ScoreAdjustment, ScoreBreakdown, WeightVector,
};
pub use repository::{
    CatalogStore, EmbeddingStore, NoopEmbeddingStore, RepositoryError, RulesRepository,
};
pub use router::matching_router;
