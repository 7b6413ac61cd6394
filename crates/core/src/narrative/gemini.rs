//! Gemini `generateContent` backend.
//!
//! The blocking `reqwest` client is built inside [`GeminiBackend::generate`], which always runs
//! on a blocking-pool thread. Building or dropping a blocking client on an async worker thread
//! panics.

use super::NarrativeBackend;
use crate::error::BackendError;
use crate::prompt::Prompt;
use crate::{ReportError, ReportResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Clone)]
pub struct GeminiConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
    http_timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl GeminiConfig {
    /// Builds the config from raw environment values. Blank values count as unset.
    pub fn from_env_values(
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        fn non_blank(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            api_key: non_blank(api_key),
            model: non_blank(model).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: non_blank(base_url)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Caps each HTTP call. Keep it close to the requester timeout so abandoned calls end soon.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Clone)]
pub struct GeminiBackend {
    config: GeminiConfig,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }
}

impl NarrativeBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn ensure_configured(&self) -> ReportResult<()> {
        if self.config.api_key.is_none() {
            return Err(ReportError::Configuration(format!(
                "{GEMINI_API_KEY_ENV} is not set"
            )));
        }
        Ok(())
    }

    fn generate(&self, prompt: &Prompt) -> Result<String, BackendError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::Unavailable(format!("{GEMINI_API_KEY_ENV} is not set")))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(self.config.http_timeout)
            .build()?;

        tracing::debug!(model = %self.config.model, "calling gemini generateContent");
        let response = client
            .post(self.config.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&GenerateContentRequest::new(prompt.as_str()))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_failure(status.as_u16(), body));
        }

        let body: GenerateContentResponse = response
            .json()
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
        body.into_text()
    }
}

fn classify_failure(status: u16, body: String) -> BackendError {
    let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    match status {
        401 | 403 => BackendError::Unauthorized { status },
        429 => BackendError::QuotaExceeded(body),
        _ => BackendError::Status { status, body },
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            contents: [RequestContent {
                parts: [RequestPart { text }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate.
    fn into_text(self) -> Result<String, BackendError> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_a_configuration_error() {
        let backend = GeminiBackend::new(GeminiConfig::from_env_values(Some("  ".into()), None, None));
        assert!(matches!(
            backend.ensure_configured(),
            Err(ReportError::Configuration(_))
        ));
    }

    #[test]
    fn defaults_and_endpoint() {
        let config = GeminiConfig::from_env_values(Some("k".into()), None, None);
        assert_eq!(config.model(), "gemini-1.5-flash");
        assert_eq!(
            config.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );

        let custom = GeminiConfig::from_env_values(
            Some("k".into()),
            Some("gemini-pro".into()),
            Some("http://localhost:9000/v1/".into()),
        );
        assert_eq!(
            custom.endpoint(),
            "http://localhost:9000/v1/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn debug_redacts_key() {
        let config = GeminiConfig::from_env_values(Some("secret-key".into()), None, None);
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn request_body_shape() {
        let json = serde_json::to_value(GenerateContentRequest::new("hello")).unwrap();
        assert_eq!(json, serde_json::json!({"contents": [{"parts": [{"text": "hello"}]}]}));
    }

    #[test]
    fn response_text_is_joined_from_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": "**Summary**\n"}, {"text": "ok"}], "role": "model"}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ],
            "usageMetadata": {"totalTokenCount": 10}
        }))
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "**Summary**\nok");
    }

    #[test]
    fn empty_response_is_an_error() {
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({"candidates": []})).unwrap();
        assert!(matches!(response.into_text(), Err(BackendError::EmptyResponse)));

        let blocked: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}}))
                .unwrap();
        assert!(matches!(blocked.into_text(), Err(BackendError::EmptyResponse)));
    }

    #[test]
    fn failures_are_classified_by_status() {
        assert!(matches!(
            classify_failure(403, String::new()),
            BackendError::Unauthorized { status: 403 }
        ));
        assert!(matches!(
            classify_failure(429, "quota".into()),
            BackendError::QuotaExceeded(body) if body == "quota"
        ));
        let long = "x".repeat(2_000);
        match classify_failure(500, long) {
            BackendError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), MAX_ERROR_BODY_CHARS);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
