mod config;
mod fallback;
mod policy;
mod rules;

pub use config::EligibilityConfig;
pub use policy::GateFailure;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{
    CatalogItem, Category, CategoryDecision, EligibilityResult, EligibilityRule, Jurisdiction,
    Provenance, RideTier, RuleSet,
};
use super::error::MatchingError;
use super::repository::RulesRepository;
use crate::gateway::GenerativeGateway;

/// Layered eligibility decisions: hard gate, age cutoff, allow-lists, then the
/// generative fallback for categories nobody has written rules for.
pub struct EligibilityResolver<R> {
    config: EligibilityConfig,
    rules: Arc<R>,
    gateway: Arc<GenerativeGateway>,
}

impl<R> EligibilityResolver<R>
where
    R: RulesRepository + 'static,
{
    pub fn new(config: EligibilityConfig, rules: Arc<R>, gateway: Arc<GenerativeGateway>) -> Self {
        Self {
            config,
            rules,
            gateway,
        }
    }

    pub fn config(&self) -> &EligibilityConfig {
        &self.config
    }

    /// Decides every category of `jurisdiction` for `item`. Never fails: problems
    /// become rejections whose confidence reflects what is known.
    pub async fn evaluate(&self, item: &CatalogItem, jurisdiction: &str) -> EligibilityResult {
        let lookup = self.rules.jurisdiction(jurisdiction);
        let categories = match &lookup {
            Ok(Some(found)) => found.categories(),
            _ => default_categories(),
        };
        let code = match &lookup {
            Ok(Some(found)) => found.code.clone(),
            _ => jurisdiction.to_string(),
        };

        let failures = policy::hard_gate_failures(item, &self.config);
        if !failures.is_empty() {
            let reasoning = failures
                .iter()
                .map(GateFailure::summary)
                .collect::<Vec<_>>()
                .join("; ");
            debug!(item = %item.id, %reasoning, "hard gate rejected item");
            return EligibilityResult::uniform(
                item.id.clone(),
                code,
                &categories,
                CategoryDecision::reject(1.0, reasoning, Provenance::HardGate),
            );
        }

        let jurisdiction = match lookup {
            Ok(Some(found)) => found,
            Ok(None) => {
                return invalid(
                    item,
                    jurisdiction,
                    &categories,
                    MatchingError::InvalidInput(format!("unknown jurisdiction {jurisdiction}")),
                );
            }
            Err(err) => {
                warn!(jurisdiction, error = %err, "jurisdiction lookup failed");
                return invalid(
                    item,
                    jurisdiction,
                    &categories,
                    MatchingError::InvalidInput(format!(
                        "jurisdiction {jurisdiction} could not be loaded"
                    )),
                );
            }
        };

        let missing = item.missing_attributes();
        if !missing.is_empty() {
            return invalid(
                item,
                &jurisdiction.code,
                &categories,
                MatchingError::InvalidInput(format!("item is missing {}", missing.join(", "))),
            );
        }

        if let Some(floor) = policy::below_age_floor(item, &jurisdiction, &self.config) {
            return EligibilityResult::uniform(
                item.id.clone(),
                &jurisdiction.code,
                &categories,
                CategoryDecision::reject(
                    1.0,
                    format!(
                        "model year {} is older than the {} floor of {}",
                        item.model_year, jurisdiction.code, floor
                    ),
                    Provenance::AgeCutoff,
                ),
            );
        }

        let floor = jurisdiction.age_floor(self.config.current_year);
        let snapshot = self.fresh_snapshot(&jurisdiction.code);

        let mut decisions = BTreeMap::new();
        let mut unknown = Vec::new();
        for category in &categories {
            let allow_list = snapshot
                .as_ref()
                .map(|snapshot| snapshot.rules_for(category))
                .unwrap_or(&[]);
            if allow_list.is_empty() {
                unknown.push(category.clone());
                continue;
            }

            let source = snapshot
                .as_ref()
                .map(|snapshot| snapshot.source.clone())
                .unwrap_or_default();
            decisions.insert(category.clone(), decide_by_rules(item, allow_list, floor, source));
        }

        if !unknown.is_empty() {
            let resolved = self
                .resolve_with_fallback(item, &jurisdiction, &unknown, floor)
                .await;
            decisions.extend(resolved);
        }

        info!(
            item = %item.id,
            jurisdiction = %jurisdiction.code,
            approved = decisions.values().filter(|decision| decision.approved).count(),
            fallback_categories = unknown.len(),
            "eligibility evaluated"
        );

        EligibilityResult {
            item_id: item.id.clone(),
            jurisdiction: jurisdiction.code,
            decisions,
        }
    }

    /// Latest snapshot when still within its TTL. Stale or missing snapshots
    /// leave every category to the fallback.
    fn fresh_snapshot(&self, jurisdiction: &str) -> Option<RuleSet> {
        let snapshot = match self.rules.latest_snapshot(jurisdiction) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(jurisdiction, error = %err, "rules repository unavailable");
                None
            }
        };

        match snapshot {
            Some(snapshot) if snapshot.is_fresh(Utc::now()) => Some(snapshot),
            _ => {
                let signal = MatchingError::StaleOrMissingRuleSet {
                    jurisdiction: jurisdiction.to_string(),
                };
                debug!(reason = %signal, "using generative fallback for every category");
                None
            }
        }
    }

    async fn resolve_with_fallback(
        &self,
        item: &CatalogItem,
        jurisdiction: &Jurisdiction,
        categories: &[Category],
        floor: i32,
    ) -> BTreeMap<Category, CategoryDecision> {
        let prompt = fallback::build_prompt(item, jurisdiction, categories);
        let completion = self.gateway.complete(&prompt, fallback::options()).await;

        match fallback::interpret(&completion, item, categories, floor) {
            Ok(decisions) => decisions,
            Err(err) => {
                warn!(item = %item.id, error = %err, "generative fallback inconclusive");
                let decision = CategoryDecision::reject(
                    err.rejection_confidence(),
                    err.reasoning(),
                    Provenance::GenerativeFallback {
                        provider: completion.provider.clone(),
                    },
                );
                categories
                    .iter()
                    .map(|category| (category.clone(), decision.clone()))
                    .collect()
            }
        }
    }
}

fn decide_by_rules(
    item: &CatalogItem,
    allow_list: &[EligibilityRule],
    floor: i32,
    source: String,
) -> CategoryDecision {
    let provenance = Provenance::AllowList { source };
    match rules::find_rule(item, allow_list) {
        None => CategoryDecision::reject(
            1.0,
            format!("{} {} is not in allow-list", item.brand, item.model),
            provenance,
        ),
        Some(rule) => {
            let effective = rules::effective_min_year(floor, rule.min_year);
            if item.model_year < effective {
                CategoryDecision::reject(
                    1.0,
                    format!(
                        "{} {} is allowed from {} but item is from {}",
                        rule.brand, rule.model, effective, item.model_year
                    ),
                    provenance,
                )
            } else {
                CategoryDecision::approve(
                    1.0,
                    format!(
                        "matches allow-list entry {} {} (from {})",
                        rule.brand, rule.model, effective
                    ),
                    provenance,
                )
            }
        }
    }
}

fn default_categories() -> Vec<Category> {
    RideTier::ALL.into_iter().map(Category::from).collect()
}

fn invalid(
    item: &CatalogItem,
    jurisdiction: &str,
    categories: &[Category],
    error: MatchingError,
) -> EligibilityResult {
    EligibilityResult::uniform(
        item.id.clone(),
        jurisdiction,
        categories,
        CategoryDecision::reject(
            error.rejection_confidence(),
            error.reasoning(),
            Provenance::InvalidInput,
        ),
    )
}
