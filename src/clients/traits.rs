use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What kind of output the caller expects back from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub format: ResponseFormat,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            format: ResponseFormat::Text,
            temperature: 0.7,
        }
    }

    pub fn json(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            format: ResponseFormat::Json,
            ..Self::text(model, prompt)
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("provider API key is not configured")]
    MissingApiKey,
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("model returned no text")]
    Empty,
}

/// Text completion seam. The HTTP layer only ever talks to this trait.
#[async_trait]
pub trait LessonModel: Send + Sync {
    /// Short provider label for health output and logs
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, AgentError>;
}
