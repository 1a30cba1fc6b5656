//! Typed decoding of JSON objects embedded in generative text.
//!
//! Providers tend to wrap JSON in markdown fences or surround it with prose.
//! Every consumer goes through [`decode_json`] so the unwrapping rules live in
//! one place and callers only ever see a typed value or a [`DecodeError`].

use serde::de::DeserializeOwned;

const FENCE: &str = "```";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("generative response was empty")]
    Empty,
    #[error("generative response contained no JSON object")]
    MissingObject,
    #[error("generative response did not match the expected shape: {0}")]
    Schema(#[from] serde_json::Error),
}

pub fn decode_json<T: DeserializeOwned>(text: &str) -> Result<T, DecodeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    let unfenced = strip_code_fence(trimmed);
    let object = extract_object(unfenced).ok_or(DecodeError::MissingObject)?;
    Ok(serde_json::from_str(object)?)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(open) = text.find(FENCE) else {
        return text;
    };

    // Skip the optional language tag (```json).
    let body = text[open + FENCE.len()..].trim_start_matches(|c: char| c.is_ascii_alphabetic());
    match body.find(FENCE) {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
