//! Canonical analysis records produced from vision-model output
//!
//! Every string in these records is already HTML-escaped by the
//! normalizer, except `additional_info` of a parse-error fallback, which
//! carries the raw model text untouched.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Species shown when the model gave none
pub const UNKNOWN_SPECIES: &str = "Unknown";

/// Placeholder for optional descriptive fields
pub const NOT_APPLICABLE: &str = "N/A";

/// Reason used when a not-fish answer carries no usable reason
pub const NOT_FISH_FALLBACK_REASON: &str = "This image does not appear to contain a fish.";

/// Upper bound on `characteristics` entries kept from the model
pub const MAX_CHARACTERISTICS: usize = 20;

pub const DEFAULT_CAN_KEEP: &str = "unknown";
pub const DEFAULT_SIZE_LIMIT: &str = "not specified";
pub const DEFAULT_LOCAL_RULES: &str = "check local regulations";
pub const DEFAULT_SPECIAL_RULES: &str = "Check local regulations";

/// Identification confidence reported by the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

impl Confidence {
    /// Match an already trimmed, lower-cased label
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Typical US fishing regulations for the identified species
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Regulations {
    /// "yes", "no", "conditional" or "unknown" (free text from the model)
    pub can_keep: String,
    pub minimum_size: String,
    pub maximum_size: String,
    pub seasonal_restrictions: String,
    pub bag_limit: String,
    pub special_rules: String,
}

impl Default for Regulations {
    fn default() -> Self {
        Self {
            can_keep: DEFAULT_CAN_KEEP.to_string(),
            minimum_size: DEFAULT_SIZE_LIMIT.to_string(),
            maximum_size: DEFAULT_SIZE_LIMIT.to_string(),
            seasonal_restrictions: DEFAULT_LOCAL_RULES.to_string(),
            bag_limit: DEFAULT_LOCAL_RULES.to_string(),
            special_rules: DEFAULT_SPECIAL_RULES.to_string(),
        }
    }
}

/// Validated fish identification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FishAnalysis {
    pub is_fish: bool,
    pub species: String,
    pub scientific_name: String,
    pub confidence: Confidence,
    pub characteristics: Vec<String>,
    pub habitat: String,
    pub size: String,
    pub regulations: Regulations,
    pub additional_info: String,
    pub parse_error: bool,
}

impl FishAnalysis {
    /// Deterministic record used when the model text is not JSON
    ///
    /// `raw_text` is kept verbatim so an operator (or the user) can still
    /// read what the model said.
    pub fn parse_error_fallback(raw_text: &str) -> Self {
        Self {
            is_fish: true,
            species: UNKNOWN_SPECIES.to_string(),
            scientific_name: NOT_APPLICABLE.to_string(),
            confidence: Confidence::Low,
            characteristics: Vec::new(),
            habitat: NOT_APPLICABLE.to_string(),
            size: NOT_APPLICABLE.to_string(),
            regulations: Regulations::default(),
            additional_info: raw_text.to_string(),
            parse_error: true,
        }
    }
}

/// The model said the photo shows no fish
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotFishResult {
    pub reason: String,
}

impl Serialize for NotFishResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("NotFishResult", 2)?;
        state.serialize_field("isFish", &false)?;
        state.serialize_field("reason", &self.reason)?;
        state.end()
    }
}

/// Result of normalizing one vision-model response
///
/// Serializes to the bare record (`FishAnalysis` or `NotFishResult`), which
/// is also the shape stored in the `analyses` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Fish(FishAnalysis),
    NotFish(NotFishResult),
    ParseError(FishAnalysis),
}

impl AnalysisOutcome {
    pub fn is_fish(&self) -> bool {
        !matches!(self, Self::NotFish(_))
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::ParseError(_))
    }

    /// Identified species, if the outcome is a parsed fish record
    pub fn species(&self) -> Option<&str> {
        match self {
            Self::Fish(analysis) => Some(&analysis.species),
            _ => None,
        }
    }

    /// Rebuild an outcome from its stored JSON record
    pub fn from_stored_json(json: &str) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;

        if value.get("isFish") == Some(&serde_json::Value::Bool(false)) {
            return serde_json::from_value(value).map(Self::NotFish);
        }

        let analysis: FishAnalysis = serde_json::from_value(value)?;
        if analysis.parse_error {
            Ok(Self::ParseError(analysis))
        } else {
            Ok(Self::Fish(analysis))
        }
    }
}
