//! Deterministic, explainable ranking for a declared use-case.
//!
//! Scoring never calls out: the same items and context always produce the same
//! order and the same breakdowns.

mod config;
mod insights;
mod narrative;
mod rules;

pub use config::{WeightVector, PRIORITY_BOOST};
pub use narrative::{Narrative, RankingNarrator};
pub use rules::{ScoreAdjustment, MAX_SCORE};

use std::collections::BTreeMap;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CatalogItem, RankingContext, ScoreDimension};
use rules::ScoreLedger;

/// Audit trail for one item's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub final_score: f64,
    pub base_score: f64,
    /// Each dimension's contribution to the base score.
    pub weighted: BTreeMap<ScoreDimension, f64>,
    pub bonuses: Vec<ScoreAdjustment>,
    pub penalties: Vec<ScoreAdjustment>,
    pub highlights: Vec<String>,
    pub concerns: Vec<String>,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub item: CatalogItem,
    pub breakdown: ScoreBreakdown,
}

/// Maps a 1–10 sub-score onto 50–100 so that missing data never scores zero.
pub fn rescale(value: u8) -> f64 {
    let clamped = f64::from(value.clamp(1, 10));
    50.0 + (clamped - 1.0) * 50.0 / 9.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ranker {
    current_year: i32,
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(Utc::now().year())
    }
}

impl Ranker {
    pub fn new(current_year: i32) -> Self {
        Self { current_year }
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn score(&self, item: &CatalogItem, context: &RankingContext) -> ScoreBreakdown {
        let weights =
            WeightVector::for_use_case(context.use_case).with_priorities(&context.priorities);

        let weighted: BTreeMap<ScoreDimension, f64> = ScoreDimension::ALL
            .into_iter()
            .map(|dimension| {
                (
                    dimension,
                    rescale(item.scores.get(dimension)) * weights.get(dimension),
                )
            })
            .collect();
        let base_score = weighted.values().sum::<f64>().clamp(0.0, MAX_SCORE);

        let mut ledger = ScoreLedger::starting_at(base_score);
        rules::apply_bonuses(&mut ledger, item, context, self.current_year);
        rules::apply_penalties(&mut ledger, item, context);
        let (final_score, bonuses, penalties) = ledger.finish();

        let insights = insights::generate_insights(item, context, &weights, self.current_year);

        ScoreBreakdown {
            final_score,
            base_score,
            weighted,
            bonuses,
            penalties,
            highlights: insights.highlights,
            concerns: insights.concerns,
            reasoning: insights::reasoning(final_score, item, context),
        }
    }

    /// Scores and orders `items`: score desc, then model year desc, then
    /// distance asc, then input order.
    pub fn rank(&self, items: Vec<CatalogItem>, context: &RankingContext) -> Vec<RankedItem> {
        let mut ranked: Vec<RankedItem> = items
            .into_iter()
            .map(|item| {
                let breakdown = self.score(&item, context);
                RankedItem { item, breakdown }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.breakdown
                .final_score
                .total_cmp(&a.breakdown.final_score)
                .then_with(|| b.item.model_year.cmp(&a.item.model_year))
                .then_with(|| a.item.distance_km.cmp(&b.item.distance_km))
        });
        ranked
    }
}
