use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::super::domain::RankingContext;
use super::RankedItem;
use crate::gateway::{decode_json, ChatMessage, CompletionOptions, GenerativeGateway};

/// Customer-facing explanation of a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narrative {
    pub text: String,
    pub generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

#[derive(Deserialize)]
struct NarrativeReply {
    summary: String,
}

/// Writes a short pitch for a ranked item. Falls back to the ranker's own
/// reasoning sentence when no provider answers usefully.
pub struct RankingNarrator {
    gateway: Arc<GenerativeGateway>,
}

impl RankingNarrator {
    pub fn new(gateway: Arc<GenerativeGateway>) -> Self {
        Self { gateway }
    }

    pub async fn narrate(&self, ranked: &RankedItem, context: &RankingContext) -> Narrative {
        let breakdown = &ranked.breakdown;
        let prompt = vec![
            ChatMessage::system(
                "You write two-sentence vehicle recommendations. Only use the facts given. \
                 Reply with JSON: {\"summary\": \"...\"}.",
            ),
            ChatMessage::user(format!(
                "Vehicle: {}\nUse: {}\nScore: {:.0}/100\nHighlights: {}\nConcerns: {}",
                ranked.item.display_name(),
                context.use_case.label(),
                breakdown.final_score,
                breakdown.highlights.join("; "),
                breakdown.concerns.join("; "),
            )),
        ];

        let completion = self
            .gateway
            .complete(
                &prompt,
                CompletionOptions {
                    temperature: 0.4,
                    max_tokens: 200,
                },
            )
            .await;

        if !completion.degraded {
            match decode_json::<NarrativeReply>(&completion.text) {
                Ok(reply) if !reply.summary.trim().is_empty() => {
                    return Narrative {
                        text: reply.summary.trim().to_string(),
                        generated: true,
                        provider: completion.provider,
                    };
                }
                Ok(_) => debug!("narrative reply was empty"),
                Err(err) => debug!(error = %err, "narrative reply could not be decoded"),
            }
        }

        Narrative {
            text: breakdown.reasoning.clone(),
            generated: false,
            provider: None,
        }
    }
}
