use serde::{Deserialize, Serialize};

use super::super::domain::{CatalogItem, Jurisdiction};
use super::config::EligibilityConfig;

/// Jurisdiction-independent feature the item lacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateFailure {
    MissingAirConditioning,
    TooFewDoors { doors: u8, required: u8 },
}

impl GateFailure {
    pub fn summary(&self) -> String {
        match self {
            GateFailure::MissingAirConditioning => "air conditioning is required".to_string(),
            GateFailure::TooFewDoors { doors, required } => {
                format!("at least {required} doors are required, item has {doors}")
            }
        }
    }
}

pub(crate) fn hard_gate_failures(
    item: &CatalogItem,
    config: &EligibilityConfig,
) -> Vec<GateFailure> {
    let mut failures = Vec::new();
    if config.require_air_conditioning && !item.air_conditioning {
        failures.push(GateFailure::MissingAirConditioning);
    }
    if item.doors < config.min_doors {
        failures.push(GateFailure::TooFewDoors {
            doors: item.doors,
            required: config.min_doors,
        });
    }
    failures
}

/// `Some(floor)` when the item is older than the jurisdiction allows.
pub(crate) fn below_age_floor(
    item: &CatalogItem,
    jurisdiction: &Jurisdiction,
    config: &EligibilityConfig,
) -> Option<i32> {
    let floor = jurisdiction.age_floor(config.current_year);
    (item.model_year < floor).then_some(floor)
}
