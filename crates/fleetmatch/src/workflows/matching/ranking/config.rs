use serde::{Deserialize, Serialize};

use super::super::domain::{ScoreDimension, UseCase};

/// Weight added to each dimension the requester prioritised, before renormalising.
pub const PRIORITY_BOOST: f64 = 0.10;

/// Use-case weights over the five sub-scores. Always sums to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    pub comfort: f64,
    pub economy: f64,
    pub space: f64,
    pub safety: f64,
    pub value: f64,
}

impl WeightVector {
    pub fn for_use_case(use_case: UseCase) -> Self {
        let (comfort, economy, space, safety, value) = match use_case {
            UseCase::Family => (0.15, 0.15, 0.30, 0.30, 0.10),
            UseCase::Economy => (0.10, 0.40, 0.10, 0.10, 0.30),
            UseCase::RideHailing => (0.30, 0.30, 0.15, 0.10, 0.15),
            UseCase::Delivery => (0.05, 0.35, 0.35, 0.10, 0.15),
            UseCase::Commute => (0.25, 0.30, 0.10, 0.15, 0.20),
            UseCase::FirstCar => (0.10, 0.25, 0.10, 0.30, 0.25),
        };
        Self {
            comfort,
            economy,
            space,
            safety,
            value,
        }
    }

    pub fn get(&self, dimension: ScoreDimension) -> f64 {
        match dimension {
            ScoreDimension::Comfort => self.comfort,
            ScoreDimension::Economy => self.economy,
            ScoreDimension::Space => self.space,
            ScoreDimension::Safety => self.safety,
            ScoreDimension::Value => self.value,
        }
    }

    fn get_mut(&mut self, dimension: ScoreDimension) -> &mut f64 {
        match dimension {
            ScoreDimension::Comfort => &mut self.comfort,
            ScoreDimension::Economy => &mut self.economy,
            ScoreDimension::Space => &mut self.space,
            ScoreDimension::Safety => &mut self.safety,
            ScoreDimension::Value => &mut self.value,
        }
    }

    pub fn total(&self) -> f64 {
        ScoreDimension::ALL
            .iter()
            .map(|dimension| self.get(*dimension))
            .sum()
    }

    /// Boosts each listed dimension once, then renormalises to sum 1.
    pub fn with_priorities(mut self, priorities: &[ScoreDimension]) -> Self {
        let mut boosted: Vec<ScoreDimension> = Vec::new();
        for dimension in priorities {
            if !boosted.contains(dimension) {
                *self.get_mut(*dimension) += PRIORITY_BOOST;
                boosted.push(*dimension);
            }
        }

        let total = self.total();
        if boosted.is_empty() || total <= f64::EPSILON {
            return self;
        }
        for dimension in ScoreDimension::ALL {
            *self.get_mut(dimension) /= total;
        }
        self
    }
}
