//! Vision response normalizer
//!
//! Turns the raw text returned by the vision model into one of three
//! canonical outcomes:
//!
//! - [`AnalysisOutcome::NotFish`] when the model answered `"isFish": false`
//! - [`AnalysisOutcome::Fish`] with every field validated and sanitized
//! - [`AnalysisOutcome::ParseError`] when the text is not JSON at all
//!
//! # Degradation policy
//! Nothing here fails a request. Malformed JSON becomes a fallback record
//! that keeps the raw model text; valid JSON with unexpected shapes is
//! repaired field by field. The only error is an empty input, which the
//! caller reports as "analysis unavailable".
//!
//! # Example
//! ```rust,ignore
//! use catchlog_ai::services::ResponseNormalizer;
//!
//! let normalizer = ResponseNormalizer::new();
//! let outcome = normalizer.normalize("```json\n{\"isFish\": false}\n```")?;
//! assert!(!outcome.is_fish());
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, warn};

use super::sanitizer::{coerce_to_string, sanitize_or, sanitize_value};
use crate::models::fish_analysis::{
    DEFAULT_CAN_KEEP, DEFAULT_LOCAL_RULES, DEFAULT_SIZE_LIMIT, DEFAULT_SPECIAL_RULES,
    MAX_CHARACTERISTICS, NOT_APPLICABLE, NOT_FISH_FALLBACK_REASON, UNKNOWN_SPECIES,
};
use crate::models::{AnalysisOutcome, Confidence, FishAnalysis, NotFishResult, Regulations};

/// Normalizer errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// The vision model returned no text
    #[error("No response text provided")]
    MissingInput,
}

/// Receives diagnostics from the normalizer's failure paths
pub trait NormalizerObserver: Send + Sync {
    /// Called when the input text was empty
    fn missing_input(&self);

    /// Called when the input could not be parsed as a JSON record
    fn parse_failed(&self, raw_text: &str, error: &str);
}

/// Default observer: structured `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl NormalizerObserver for TracingObserver {
    fn missing_input(&self) {
        warn!("Vision analysis unavailable: no response text provided");
    }

    fn parse_failed(&self, raw_text: &str, error: &str) {
        error!(
            error = %error,
            raw_response = %raw_text,
            "Failed to parse vision response as JSON"
        );
    }
}

/// Stateless vision response normalizer
#[derive(Clone)]
pub struct ResponseNormalizer {
    observer: Arc<dyn NormalizerObserver>,
}

impl ResponseNormalizer {
    /// Normalizer reporting through `tracing`
    pub fn new() -> Self {
        Self {
            observer: Arc::new(TracingObserver),
        }
    }

    /// Normalizer reporting to a custom observer
    pub fn with_observer(observer: Arc<dyn NormalizerObserver>) -> Self {
        Self { observer }
    }

    /// Normalize raw vision-model text
    pub fn normalize(&self, raw_text: &str) -> Result<AnalysisOutcome, NormalizeError> {
        if raw_text.is_empty() {
            self.observer.missing_input();
            return Err(NormalizeError::MissingInput);
        }

        let cleaned = strip_code_fence(raw_text);

        let parsed = match serde_json::from_str::<Value>(cleaned) {
            Ok(Value::Null) => {
                self.observer
                    .parse_failed(raw_text, "top-level null carries no analysis fields");
                return Ok(AnalysisOutcome::ParseError(FishAnalysis::parse_error_fallback(
                    raw_text,
                )));
            }
            Ok(value) => value,
            Err(e) => {
                self.observer.parse_failed(raw_text, &e.to_string());
                return Ok(AnalysisOutcome::ParseError(FishAnalysis::parse_error_fallback(
                    raw_text,
                )));
            }
        };

        if parsed.get("isFish") == Some(&Value::Bool(false)) {
            return Ok(AnalysisOutcome::NotFish(NotFishResult {
                reason: sanitize_or(parsed.get("reason"), NOT_FISH_FALLBACK_REASON),
            }));
        }

        Ok(AnalysisOutcome::Fish(validate_fish_analysis(&parsed)))
    }
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove one surrounding Markdown code fence, if present
///
/// Accepts an optional language tag after the opening fence
/// (```` ```json ````). Text between the fences is returned untouched apart
/// from surrounding whitespace and byte order marks.
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = trim_padding(text);

    if let Some(rest) = body.strip_prefix("```") {
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        body = &rest[tag_len..];
    }

    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }

    trim_padding(body)
}

/// Whitespace plus U+FEFF, which `str::trim` keeps
fn trim_padding(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

/// Build a validated fish record from parsed JSON
///
/// Each field is repaired independently; the input may be any JSON value.
pub fn validate_fish_analysis(data: &Value) -> FishAnalysis {
    FishAnalysis {
        // Only reached after the explicit not-fish check
        is_fish: true,
        species: sanitize_or(data.get("species"), UNKNOWN_SPECIES),
        scientific_name: sanitize_or(data.get("scientificName"), NOT_APPLICABLE),
        confidence: validate_confidence(data.get("confidence")),
        characteristics: validate_list(data.get("characteristics")),
        habitat: sanitize_or(data.get("habitat"), NOT_APPLICABLE),
        size: sanitize_or(data.get("size"), NOT_APPLICABLE),
        regulations: validate_regulations(data.get("regulations")),
        additional_info: sanitize_or(data.get("additionalInfo"), ""),
        parse_error: false,
    }
}

/// Case-insensitive match against high/medium/low; anything else is low
pub fn validate_confidence(value: Option<&Value>) -> Confidence {
    let label = value
        .map(coerce_to_string)
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    Confidence::from_label(&label).unwrap_or_default()
}

/// Sanitized, non-empty entries of a JSON array, capped at
/// [`MAX_CHARACTERISTICS`]
pub fn validate_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| !item.is_null())
        .map(sanitize_value)
        .filter(|item| !item.is_empty())
        .take(MAX_CHARACTERISTICS)
        .collect()
}

/// Regulations filled field by field; non-objects give the full default
pub fn validate_regulations(value: Option<&Value>) -> Regulations {
    let Some(Value::Object(regs)) = value else {
        return Regulations::default();
    };

    let field = |map: &Map<String, Value>, key: &str, default: &str| {
        sanitize_or(map.get(key), default)
    };

    Regulations {
        can_keep: field(regs, "canKeep", DEFAULT_CAN_KEEP),
        minimum_size: field(regs, "minimumSize", DEFAULT_SIZE_LIMIT),
        maximum_size: field(regs, "maximumSize", DEFAULT_SIZE_LIMIT),
        seasonal_restrictions: field(regs, "seasonalRestrictions", DEFAULT_LOCAL_RULES),
        bag_limit: field(regs, "bagLimit", DEFAULT_LOCAL_RULES),
        special_rules: field(regs, "specialRules", DEFAULT_SPECIAL_RULES),
    }
}
