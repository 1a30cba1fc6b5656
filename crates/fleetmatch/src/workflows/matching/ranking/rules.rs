use serde::{Deserialize, Serialize};

use super::super::domain::{BodyType, CatalogItem, FuelType, RankingContext, UseCase};

pub const MAX_SCORE: f64 = 100.0;

/// Named contribution to the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreAdjustment {
    pub label: String,
    pub points: f64,
}

/// Running total with an audit trail. Bonuses never push the total past 100.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScoreLedger {
    total: f64,
    bonuses: Vec<ScoreAdjustment>,
    penalties: Vec<ScoreAdjustment>,
}

impl ScoreLedger {
    pub(crate) fn starting_at(base: f64) -> Self {
        Self {
            total: base.clamp(0.0, MAX_SCORE),
            ..Self::default()
        }
    }

    pub(crate) fn award(&mut self, label: &str, points: f64) {
        let applied = points.min(MAX_SCORE - self.total);
        if applied > 0.0 {
            self.total += applied;
            self.bonuses.push(ScoreAdjustment {
                label: label.to_string(),
                points: applied,
            });
        }
    }

    pub(crate) fn deduct(&mut self, label: &str, points: f64) {
        self.total -= points;
        self.penalties.push(ScoreAdjustment {
            label: label.to_string(),
            points: -points,
        });
    }

    pub(crate) fn finish(self) -> (f64, Vec<ScoreAdjustment>, Vec<ScoreAdjustment>) {
        (self.total.clamp(0.0, MAX_SCORE), self.bonuses, self.penalties)
    }
}

pub(crate) fn apply_bonuses(
    ledger: &mut ScoreLedger,
    item: &CatalogItem,
    context: &RankingContext,
    current_year: i32,
) {
    if item.model_year >= current_year - 2 {
        ledger.award("recent model year", 5.0);
        if item.model_year >= current_year {
            ledger.award("current model year", 3.0);
        }
    }

    if item.distance_km < 30_000 {
        ledger.award("low distance travelled", 5.0);
    } else if item.distance_km < 50_000 {
        ledger.award("moderate distance travelled", 3.0);
    }

    if context.use_case.comfort_relevant() && item.transmission.is_automatic() {
        ledger.award("automatic transmission", 5.0);
    }

    let scores = &item.scores;
    match context.use_case {
        UseCase::Family => {
            if scores.space >= 8 {
                ledger.award("spacious cabin", 4.0);
            }
            if scores.safety >= 8 {
                ledger.award("strong safety record", 4.0);
            }
            if matches!(
                item.body_type,
                BodyType::Suv | BodyType::Minivan | BodyType::Wagon
            ) {
                ledger.award("family-friendly body", 3.0);
            }
        }
        UseCase::Economy => {
            if scores.economy >= 8 {
                ledger.award("low running costs", 4.0);
            }
            if scores.value >= 8 {
                ledger.award("strong value for money", 4.0);
            }
            if matches!(
                item.fuel,
                FuelType::Flex | FuelType::Hybrid | FuelType::Electric
            ) {
                ledger.award("efficient fuel option", 3.0);
            }
        }
        UseCase::RideHailing => {
            if scores.comfort >= 8 {
                ledger.award("passenger comfort", 4.0);
            }
            if scores.economy >= 8 {
                ledger.award("low cost per kilometre", 4.0);
            }
            if item.body_type == BodyType::Sedan && item.doors >= 4 {
                ledger.award("sedan preferred by riders", 3.0);
            }
        }
        UseCase::Delivery => {
            if scores.space >= 8 {
                ledger.award("cargo space", 4.0);
            }
            if scores.economy >= 8 {
                ledger.award("low cost per kilometre", 4.0);
            }
            if matches!(
                item.body_type,
                BodyType::Pickup | BodyType::Van | BodyType::Wagon
            ) {
                ledger.award("cargo-friendly body", 3.0);
            }
        }
        UseCase::Commute => {
            if scores.comfort >= 8 {
                ledger.award("comfortable daily drive", 4.0);
            }
            if scores.economy >= 8 {
                ledger.award("low running costs", 3.0);
            }
        }
        UseCase::FirstCar => {
            if scores.safety >= 8 {
                ledger.award("strong safety record", 4.0);
            }
            if scores.value >= 8 {
                ledger.award("strong value for money", 4.0);
            }
            if scores.economy >= 8 {
                ledger.award("low running costs", 3.0);
            }
        }
    }
}

pub(crate) fn apply_penalties(
    ledger: &mut ScoreLedger,
    item: &CatalogItem,
    context: &RankingContext,
) {
    if let Some(budget) = context.budget {
        if item.price > budget {
            ledger.deduct("over budget", 10.0);
        }
    }
    if let Some(min_year) = context.min_year {
        if item.model_year < min_year {
            ledger.deduct("older than requested", 5.0);
        }
    }
    if let Some(max_distance) = context.max_distance {
        if item.distance_km > max_distance {
            ledger.deduct("more distance than requested", 5.0);
        }
    }
}
