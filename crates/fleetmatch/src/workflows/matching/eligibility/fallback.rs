//! Generative fallback for categories without a known allow-list.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::super::domain::{CatalogItem, Category, CategoryDecision, Jurisdiction, Provenance};
use super::super::error::MatchingError;
use crate::gateway::{decode_json, ChatMessage, Completion, CompletionOptions};

pub(crate) const DEFAULT_CONFIDENCE: f32 = 0.6;
pub(crate) const OMITTED_CONFIDENCE: f32 = 0.5;

const SYSTEM_PROMPT: &str = "You assess whether a vehicle qualifies for ride-hailing \
categories under a regional policy. Reply with a single JSON object and nothing else: \
{\"categories\": {\"<category>\": {\"approved\": true|false, \"reasoning\": \"...\"}}, \
\"confidence\": 0.0-1.0, \"reasoning\": \"...\"}. Include every category you were asked about.";

pub(crate) fn options() -> CompletionOptions {
    CompletionOptions {
        temperature: 0.0,
        max_tokens: 600,
    }
}

pub(crate) fn build_prompt(
    item: &CatalogItem,
    jurisdiction: &Jurisdiction,
    categories: &[Category],
) -> Vec<ChatMessage> {
    let requested = categories
        .iter()
        .map(Category::key)
        .collect::<Vec<_>>()
        .join(", ");

    let user = format!(
        "Jurisdiction: {name} ({code})\n\
         Maximum vehicle age: {age} years\n\
         Policy: {policy}\n\n\
         Vehicle: {brand} {model}, model year {year}\n\
         Body type: {body}; transmission: {transmission}; fuel: {fuel}; doors: {doors}; \
         air conditioning: {ac}\n\n\
         Categories to assess: {requested}",
        name = jurisdiction.name,
        code = jurisdiction.code,
        age = jurisdiction.max_age_years,
        policy = jurisdiction.policy_summary,
        brand = item.brand,
        model = item.model,
        year = item.model_year,
        body = item.body_type.label(),
        transmission = item.transmission.label(),
        fuel = item.fuel.label(),
        doors = item.doors,
        ac = if item.air_conditioning { "yes" } else { "no" },
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// Per-category verdict: a bare flag or an object with detail.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategoryVerdict {
    Flag(bool),
    Detailed {
        approved: bool,
        #[serde(default)]
        confidence: Option<f32>,
        #[serde(default)]
        reasoning: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct FallbackVerdict {
    categories: BTreeMap<String, CategoryVerdict>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Turns a gateway completion into one decision per requested category.
///
/// `floor` is the jurisdiction's minimum model year; approvals for items below
/// it are overturned whatever the provider said.
pub(crate) fn interpret(
    completion: &Completion,
    item: &CatalogItem,
    categories: &[Category],
    floor: i32,
) -> Result<BTreeMap<Category, CategoryDecision>, MatchingError> {
    if completion.degraded {
        return Err(MatchingError::ProviderUnavailable);
    }

    let verdict: FallbackVerdict = decode_json(&completion.text)?;
    let overall_confidence = verdict.confidence.unwrap_or(DEFAULT_CONFIDENCE);
    let overall_reasoning = verdict
        .reasoning
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| "assessed by generative fallback".to_string());

    let answers: BTreeMap<Category, CategoryVerdict> = verdict
        .categories
        .into_iter()
        .map(|(key, answer)| (Category::from(key), answer))
        .collect();

    let provenance = Provenance::GenerativeFallback {
        provider: completion.provider.clone(),
    };
    let decisions = categories
        .iter()
        .map(|category| {
            let decision = match answers.get(category) {
                None => CategoryDecision::reject(
                    OMITTED_CONFIDENCE,
                    "fallback response omitted this category",
                    provenance.clone(),
                ),
                Some(answer) => {
                    let (approved, confidence, reasoning) = match answer {
                        CategoryVerdict::Flag(approved) => {
                            (*approved, overall_confidence, overall_reasoning.clone())
                        }
                        CategoryVerdict::Detailed {
                            approved,
                            confidence,
                            reasoning,
                        } => (
                            *approved,
                            confidence.unwrap_or(overall_confidence),
                            reasoning
                                .clone()
                                .filter(|text| !text.trim().is_empty())
                                .unwrap_or_else(|| overall_reasoning.clone()),
                        ),
                    };

                    if approved && item.model_year < floor {
                        CategoryDecision::reject(
                            1.0,
                            format!(
                                "model year {} is below the minimum {}",
                                item.model_year, floor
                            ),
                            Provenance::AgeCutoff,
                        )
                    } else if approved {
                        CategoryDecision::approve(confidence, reasoning, provenance.clone())
                    } else {
                        CategoryDecision::reject(confidence, reasoning, provenance.clone())
                    }
                }
            };
            (category.clone(), decision)
        })
        .collect();

    Ok(decisions)
}
