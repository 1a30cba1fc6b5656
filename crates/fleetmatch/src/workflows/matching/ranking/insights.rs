use super::super::domain::{CatalogItem, RankingContext, ScoreDimension};
use super::config::WeightVector;

const MAX_HIGHLIGHTS: usize = 3;
const MAX_CONCERNS: usize = 2;

pub(crate) struct Insights {
    pub highlights: Vec<String>,
    pub concerns: Vec<String>,
}

pub(crate) fn generate_insights(
    item: &CatalogItem,
    context: &RankingContext,
    weights: &WeightVector,
    current_year: i32,
) -> Insights {
    let mut highlights = Vec::new();
    if item.model_year >= current_year - 2 {
        highlights.push(format!("recent vehicle ({})", item.model_year));
    }
    if item.distance_km < 30_000 {
        highlights.push(format!("low distance travelled ({} km)", item.distance_km));
    }
    if item.transmission.is_automatic() && context.use_case.comfort_relevant() {
        highlights.push(format!("{} transmission", item.transmission.label()));
    }
    // Strongest dimensions the use-case cares about, heaviest weight first.
    let mut dimensions: Vec<ScoreDimension> = ScoreDimension::ALL.to_vec();
    dimensions.sort_by(|a, b| weights.get(*b).total_cmp(&weights.get(*a)));
    for dimension in &dimensions {
        if item.scores.get(*dimension) >= 9 {
            highlights.push(format!("excellent {}", dimension.label()));
        }
    }
    if let Some(budget) = context.budget {
        if u64::from(item.price) * 10 <= u64::from(budget) * 8 {
            highlights.push("comfortably within budget".to_string());
        }
    }
    highlights.truncate(MAX_HIGHLIGHTS);

    let mut concerns = Vec::new();
    if let Some(budget) = context.budget {
        if item.price > budget {
            concerns.push(format!("over budget by {}", item.price - budget));
        }
    }
    if item.distance_km > 100_000 {
        concerns.push(format!("high distance travelled ({} km)", item.distance_km));
    }
    if item.model_year < current_year - 8 {
        concerns.push(format!("older vehicle ({})", item.model_year));
    }
    for dimension in &dimensions {
        if weights.get(*dimension) >= 0.25 && item.scores.get(*dimension) <= 4 {
            concerns.push(format!(
                "weak {} for {} use",
                dimension.label(),
                context.use_case.label()
            ));
        }
    }
    concerns.truncate(MAX_CONCERNS);

    Insights {
        highlights,
        concerns,
    }
}

pub(crate) fn reasoning(final_score: f64, item: &CatalogItem, context: &RankingContext) -> String {
    let use_case = context.use_case.label();
    let name = item.display_name();
    if final_score >= 90.0 {
        format!("{name} is an excellent match for {use_case} use.")
    } else if final_score >= 75.0 {
        format!("{name} is a strong match for {use_case} use.")
    } else if final_score >= 60.0 {
        format!("{name} is a reasonable option for {use_case} use, with some trade-offs.")
    } else {
        format!("{name} is a weak fit for {use_case} use.")
    }
}
