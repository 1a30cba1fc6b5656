use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Jurisdiction-independent knobs of the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityConfig {
    pub current_year: i32,
    pub min_doors: u8,
    pub require_air_conditioning: bool,
}

impl EligibilityConfig {
    pub fn for_year(current_year: i32) -> Self {
        Self {
            current_year,
            ..Self::default()
        }
    }
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            current_year: Utc::now().year(),
            min_doors: 4,
            require_air_conditioning: true,
        }
    }
}
