use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::clients::traits::{AgentError, CompletionRequest, LessonModel, ResponseFormat};
use crate::config::Config;

const BODY_SNIPPET_CHARS: usize = 500;
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent` client over plain HTTPS
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout_ms: u64,
    ) -> Result<Self, AgentError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| AgentError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout_ms,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AgentError> {
        Self::new(
            config.provider.base_url.clone(),
            config.runtime.gemini_api_key.clone(),
            config.provider.timeout_ms,
        )
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }
}

#[async_trait]
impl LessonModel for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, AgentError> {
        let api_key = self.api_key.as_deref().ok_or(AgentError::MissingApiKey)?;

        let mut generation_config = json!({ "temperature": request.temperature });
        if request.format == ResponseFormat::Json {
            generation_config["responseMimeType"] = json!("application/json");
        }
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
            "generationConfig": generation_config,
        });

        let started = Instant::now();
        let resp = self
            .http
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    AgentError::Transport(e.to_string())
                }
            })?;

        // Check response status before parsing
        let status = resp.status();
        if !status.is_success() {
            let body_text = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(AgentError::Http {
                status: status.as_u16(),
                body: truncate_chars(body_text.trim(), BODY_SNIPPET_CHARS),
            });
        }

        let val: Value = resp
            .json()
            .await
            .map_err(|e| AgentError::ParseError(e.to_string()))?;
        let text = take_text(&val);

        tracing::debug!(
            "Gemini call completed: model={}, {} chars, {}ms",
            request.model,
            text.len(),
            started.elapsed().as_millis()
        );

        if text.trim().is_empty() {
            return Err(AgentError::Empty);
        }
        Ok(text)
    }
}

/// Pull the generated text out of a `generateContent` response.
///
/// Looks at `candidates[0].content.parts[*].text` first, then at a flat
/// `text` or `response.text` field some proxies return.
pub fn take_text(val: &Value) -> String {
    if let Some(parts) = val
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
    {
        let joined: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        if !joined.is_empty() {
            return joined;
        }
    }
    val.get("text")
        .and_then(|t| t.as_str())
        .or_else(|| val.pointer("/response/text").and_then(|t| t.as_str()))
        .unwrap_or_default()
        .to_string()
}

pub fn truncate_chars(input: &str, max: usize) -> String {
    let mut out = String::new();
    for (idx, ch) in input.chars().enumerate() {
        if idx >= max {
            out.push_str("...");
            break;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_text_joins_candidate_parts() {
        let val = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "# Les\n" }, { "text": "Inhoud" }] }
            }]
        });
        assert_eq!(take_text(&val), "# Les\nInhoud");
    }

    #[test]
    fn test_take_text_flat_fallbacks() {
        assert_eq!(take_text(&json!({ "text": "flat" })), "flat");
        assert_eq!(take_text(&json!({ "response": { "text": "nested" } })), "nested");
        assert_eq!(take_text(&json!({ "candidates": [] })), "");
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("één twee", 3), "één...");
        assert_eq!(truncate_chars("kort", 10), "kort");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = GeminiClient::new("https://example.test/", None, 1000).unwrap();
        assert_eq!(
            client.endpoint("gemini-1.5-pro"),
            "https://example.test/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_any_request() {
        let client = GeminiClient::new(DEFAULT_BASE_URL, Some("  ".to_string()), 1000).unwrap();
        let err = client
            .complete(&CompletionRequest::text("gemini-1.5-flash", "ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MissingApiKey));
    }
}
