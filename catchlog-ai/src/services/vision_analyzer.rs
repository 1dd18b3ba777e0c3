//! Vision model client
//!
//! Sends a catch photo plus a fixed instruction prompt to a multimodal
//! model and returns the model's raw text. The text is untrusted and goes
//! straight to [`super::ResponseNormalizer`].
//!
//! [`GeminiClient`] talks to the Google Generative Language REST API
//! (`models/{model}:generateContent`). Requests are spaced by a minimum
//! interval so bursts of uploads do not trip the provider's rate limit.
//! The API key travels in a request header, never in the URL, so transport
//! errors (which carry the URL) cannot leak it.

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
const USER_AGENT: &str = concat!("CatchLog/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;
const RATE_LIMIT_MS: u64 = 250;

/// Instruction sent with every photo
pub const FISH_ANALYSIS_PROMPT: &str = r#"Analyze this image carefully. First, determine if this image contains a fish. If it does NOT contain a fish, return this exact JSON structure:
{
  "isFish": false,
  "reason": "brief explanation of what the image contains instead"
}

If the image DOES contain a fish, return this JSON structure:
{
  "isFish": true,
  "species": "common name of the fish species",
  "scientificName": "scientific/latin name",
  "confidence": "high/medium/low - your confidence in the identification",
  "characteristics": ["list", "of", "notable", "physical", "characteristics"],
  "habitat": "typical habitat description",
  "size": "typical size range",
  "regulations": {
    "canKeep": "yes/no/conditional - whether this fish can typically be kept in the US",
    "minimumSize": "provide typical/average minimum size across US states (e.g., '12-15 inches in most states') or 'none' if no minimum. Do NOT just say 'varies by state'",
    "maximumSize": "provide typical/average maximum size if applicable (e.g., '20-24 inches in most states') or 'none' if no maximum. Do NOT just say 'varies by state'",
    "seasonalRestrictions": "provide common seasonal patterns (e.g., 'typically open year-round' or 'often closed March-May for spawning') or 'none'. Do NOT just say 'varies by state'",
    "bagLimit": "provide typical bag limits (e.g., '5-10 fish per day in most states') or 'none' if unlimited. Do NOT just say 'varies by state'",
    "specialRules": "any special rules like slot limits, gender restrictions, or catch-and-release only zones. Provide specific examples where common."
  },
  "additionalInfo": "any other relevant information"
}

IMPORTANT: For regulations, provide actual typical values, ranges, or common patterns across US states rather than saying "varies by state". Only return valid JSON, no additional text or markdown formatting."#;

/// Vision client errors
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limited by vision provider")]
    RateLimited,

    #[error("Vision model returned no text")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Anything that can describe a photo as text
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// Analyze one image; `mime_type` is the image's real content type
    async fn analyze(&self, image: &[u8], mime_type: &str) -> Result<String, VisionError>;
}

/// Minimum spacing between outgoing requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Vision rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: Option<String>) -> Result<Self, VisionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| VisionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different API root (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request_body(image: &[u8], mime_type: &str) -> Value {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        json!({
            "contents": [{
                "parts": [
                    { "text": FISH_ANALYSIS_PROMPT },
                    { "inlineData": { "mimeType": mime_type, "data": encoded } }
                ]
            }]
        })
    }

    /// Concatenated text parts of the first candidate
    fn parse_response(body: &Value) -> Result<String, VisionError> {
        let candidate = body["candidates"]
            .as_array()
            .and_then(|candidates| candidates.first())
            .ok_or_else(|| VisionError::Parse("Missing 'candidates' in response".to_string()))?;

        let parts = candidate["content"]["parts"]
            .as_array()
            .ok_or_else(|| VisionError::Parse("Missing 'parts' in candidate content".to_string()))?;

        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();

        if text.is_empty() {
            return Err(VisionError::EmptyResponse);
        }
        Ok(text)
    }

    fn map_http_error(status: reqwest::StatusCode, body_text: String) -> VisionError {
        match status.as_u16() {
            401 | 403 => VisionError::InvalidApiKey,
            429 => VisionError::RateLimited,
            code => VisionError::Api(code, body_text),
        }
    }
}

#[async_trait]
impl VisionAnalyzer for GeminiClient {
    async fn analyze(&self, image: &[u8], mime_type: &str) -> Result<String, VisionError> {
        self.rate_limiter.wait().await;

        tracing::debug!(
            model = %self.model,
            bytes = image.len(),
            mime_type = %mime_type,
            "Requesting vision analysis"
        );

        let response = self
            .http_client
            .post(self.endpoint_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&Self::build_request_body(image, mime_type))
            .send()
            .await
            .map_err(|e| VisionError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, error_text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| VisionError::Parse(e.without_url().to_string()))?;

        let text = Self::parse_response(&body)?;
        tracing::info!(
            model = %self.model,
            response_chars = text.len(),
            "Vision analysis received"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_defaults_model() {
        let client = GeminiClient::new("test_key".to_string(), None).unwrap();
        assert_eq!(client.model(), DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn test_endpoint_url() {
        let client = GeminiClient::new("k123".to_string(), Some("gemini-1.5-flash".to_string()))
            .unwrap()
            .with_base_url("http://localhost:9999/v1beta/");
        assert_eq!(
            client.endpoint_url(),
            "http://localhost:9999/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_transport_error_omits_api_key() {
        // Nothing listens on port 1
        let client = GeminiClient::new("SECRET-KEY-123".to_string(), None)
            .unwrap()
            .with_base_url("http://127.0.0.1:1/v1beta");

        let err = client.analyze(b"\xff\xd8\xff", "image/jpeg").await.unwrap_err();

        assert!(matches!(err, VisionError::Network(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
        assert!(!err.to_string().contains("127.0.0.1"));
    }

    #[test]
    fn test_request_body_carries_prompt_and_image() {
        let body = GeminiClient::build_request_body(b"\xff\xd8\xff", "image/jpeg");
        let parts = body["contents"][0]["parts"].as_array().unwrap();

        assert_eq!(parts[0]["text"], FISH_ANALYSIS_PROMPT);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "/9j/");
    }

    #[test]
    fn test_parse_response_joins_text_parts() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [ {"text": "{\"isFish\": "}, {"text": "false}"} ] }
            }]
        });
        assert_eq!(
            GeminiClient::parse_response(&body).unwrap(),
            "{\"isFish\": false}"
        );
    }

    #[test]
    fn test_parse_response_errors() {
        let missing = json!({});
        assert!(matches!(
            GeminiClient::parse_response(&missing),
            Err(VisionError::Parse(_))
        ));

        let empty = json!({"candidates": [{"content": {"parts": []}}]});
        assert!(matches!(
            GeminiClient::parse_response(&empty),
            Err(VisionError::EmptyResponse)
        ));
    }

    #[test]
    fn test_http_error_mapping() {
        use reqwest::StatusCode;

        assert!(matches!(
            GeminiClient::map_http_error(StatusCode::FORBIDDEN, String::new()),
            VisionError::InvalidApiKey
        ));
        assert!(matches!(
            GeminiClient::map_http_error(StatusCode::TOO_MANY_REQUESTS, String::new()),
            VisionError::RateLimited
        ));
        assert!(matches!(
            GeminiClient::map_http_error(StatusCode::BAD_GATEWAY, "upstream".to_string()),
            VisionError::Api(502, _)
        ));
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(100);
        let start = Instant::now();

        for _ in 0..3 {
            limiter.wait().await;
        }

        // Two waits of ~100ms after the first request
        assert!(start.elapsed() >= Duration::from_millis(180));
    }
}
