use crate::gateway::DecodeError;

/// Failure taxonomy of the decision core.
///
/// None of these escape `evaluate` or `rank`: the resolver folds each one into
/// a typed [`CategoryDecision`](super::domain::CategoryDecision) with an
/// explanatory reasoning and a confidence that reflects how much is known.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("no generative provider produced a completion")]
    ProviderUnavailable,
    #[error("rule set for {jurisdiction} is missing or stale")]
    StaleOrMissingRuleSet { jurisdiction: String },
    #[error(transparent)]
    MalformedGenerativeResponse(#[from] DecodeError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl MatchingError {
    /// Confidence attached to the rejections this error produces.
    pub fn rejection_confidence(&self) -> f32 {
        match self {
            MatchingError::ProviderUnavailable => 0.2,
            MatchingError::StaleOrMissingRuleSet { .. } => 0.2,
            MatchingError::MalformedGenerativeResponse(_) => 0.5,
            MatchingError::InvalidInput(_) => 0.0,
        }
    }

    /// Reasoning recorded on the rejected categories.
    pub fn reasoning(&self) -> String {
        match self {
            MatchingError::ProviderUnavailable => {
                "generative fallback unavailable; rejected until rules are known".to_string()
            }
            MatchingError::StaleOrMissingRuleSet { jurisdiction } => {
                format!("no current allow-list for {jurisdiction}")
            }
            MatchingError::MalformedGenerativeResponse(_) => {
                "could not parse fallback response".to_string()
            }
            MatchingError::InvalidInput(reason) => reason.clone(),
        }
    }
}
