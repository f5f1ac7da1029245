//! Domain-specific error types for lesson-forge

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::clients::AgentError;

/// Main error type for the lesson-forge backend
#[derive(Error, Debug)]
pub enum LessonForgeError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Upstream model error during {operation}: {source}")]
    Upstream {
        operation: &'static str,
        #[source]
        source: AgentError,
    },

    #[error("Model returned empty content for {operation}")]
    EmptyGeneration { operation: &'static str },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Route not found")]
    NotFound,
}

impl LessonForgeError {
    pub fn validation(message: impl Into<String>) -> Self {
        LessonForgeError::Validation {
            message: message.into(),
        }
    }

    pub fn upstream(operation: &'static str, source: AgentError) -> Self {
        match source {
            AgentError::Timeout { timeout_ms } => LessonForgeError::Timeout {
                operation: operation.to_string(),
                timeout_ms,
            },
            AgentError::Empty => LessonForgeError::EmptyGeneration { operation },
            other => LessonForgeError::Upstream {
                operation,
                source: other,
            },
        }
    }

    /// HTTP status the route layer reports for this error
    pub fn status(&self) -> StatusCode {
        match self {
            LessonForgeError::Validation { .. } => StatusCode::BAD_REQUEST,
            LessonForgeError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the browser. Provider diagnostics stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            LessonForgeError::Validation { message } => message.clone(),
            LessonForgeError::Upstream { operation, .. } => {
                format!("Internal error while {operation}")
            }
            LessonForgeError::EmptyGeneration { .. } => "Model returned empty content".to_string(),
            LessonForgeError::Timeout { operation, .. } => {
                format!("Model timed out while {operation}")
            }
            LessonForgeError::Config { .. } => "Server misconfigured".to_string(),
            LessonForgeError::NotFound => "Not found".to_string(),
            LessonForgeError::Serialization { .. } | LessonForgeError::Internal { .. } => {
                "Unexpected server error".to_string()
            }
        }
    }
}

impl From<anyhow::Error> for LessonForgeError {
    fn from(err: anyhow::Error) -> Self {
        LessonForgeError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for LessonForgeError {
    fn from(err: serde_json::Error) -> Self {
        LessonForgeError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for LessonForgeError {
    fn from(err: toml::de::Error) -> Self {
        LessonForgeError::Config {
            message: err.to_string(),
        }
    }
}

/// Convert LessonForgeError to an HTTP response with a `{ error, status }` body
impl IntoResponse for LessonForgeError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            LessonForgeError::Validation { message } => {
                tracing::debug!("Rejected request: {}", message);
            }
            LessonForgeError::NotFound => {}
            LessonForgeError::Upstream {
                operation,
                source: AgentError::Http { status, body },
            } => {
                tracing::error!(
                    operation = *operation,
                    provider_status = *status,
                    body_snippet = %body,
                    "Provider returned an error"
                );
            }
            other => tracing::error!("{}", other),
        }

        let body = Json(json!({
            "error": self.public_message(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for lesson-forge operations
pub type Result<T> = std::result::Result<T, LessonForgeError>;
