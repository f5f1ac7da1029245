//! Lesson workflow: suggestion cards, then a full enhanced lesson document.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clients::{CompletionRequest, LessonModel};
use crate::config::Config;
use crate::enhance::{Enhancement, Enhancer};
use crate::error::{LessonForgeError, Result};
use crate::prompts;
use crate::schemas::{GenerateRequest, SuggestRequest, Suggestion};
use crate::suggest::parse_suggestions;

const PROBE_PROMPT: &str = "Antwoord met precies één woord: ok";
const PROBE_TIMEOUT_MS: u64 = 15_000;

/// Result of the `/diag` connectivity probe
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub ok: bool,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

pub struct LessonService {
    config: Arc<Config>,
    model: Arc<dyn LessonModel>,
    enhancer: Enhancer,
}

impl LessonService {
    pub fn new(config: Arc<Config>, model: Arc<dyn LessonModel>) -> Self {
        let enhancer = Enhancer::new(config.causes.clone());
        Self {
            config,
            model,
            enhancer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn enhancer(&self) -> &Enhancer {
        &self.enhancer
    }

    pub fn provider_name(&self) -> &str {
        self.model.name()
    }

    /// Ask the suggest model for cards. Unparseable or empty output is an
    /// empty list, not an error.
    pub async fn suggest(&self, req: &SuggestRequest) -> Result<Vec<Suggestion>> {
        req.validate()?;
        let provider = &self.config.provider;
        let count = provider.suggestion_count;

        let prompt = prompts::suggestion_prompt(req, &self.config.periods, count);
        let request = CompletionRequest::json(&provider.suggest_model, prompt)
            .with_temperature(provider.temperature);

        let text = match self.call("suggesting", &request, provider.timeout_ms).await {
            Err(LessonForgeError::EmptyGeneration { .. }) => String::new(),
            other => other?,
        };

        let suggestions = parse_suggestions(&text, count);
        tracing::info!(
            period = req.period_id.as_deref().unwrap_or("-"),
            topic = req.topic_id.as_deref().unwrap_or("-"),
            "Suggested {} of {} cards",
            suggestions.len(),
            count
        );
        Ok(suggestions)
    }

    /// Generate the lesson for the chosen card and run it through the enhancer.
    pub async fn generate(&self, req: &GenerateRequest) -> Result<Enhancement> {
        let card = req.chosen_card()?;
        let provider = &self.config.provider;

        let prompt = prompts::lesson_prompt(&card, req, &self.config.periods);
        let request = CompletionRequest::text(&provider.generate_model, prompt)
            .with_temperature(provider.temperature);

        let raw = self.call("generating", &request, provider.timeout_ms).await?;
        if raw.trim().is_empty() {
            return Err(LessonForgeError::EmptyGeneration {
                operation: "generating",
            });
        }

        let enhancement = self
            .enhancer
            .enhance(&raw, &req.enhancement_context(&card));
        tracing::info!(
            outcome = enhancement.outcome(),
            "Generated lesson for {:?} ({} chars)",
            card.question(),
            enhancement.markdown().len()
        );
        Ok(enhancement)
    }

    /// One tiny completion against the suggest model.
    pub async fn probe(&self) -> ProbeReport {
        let model = self.config.provider.suggest_model.clone();
        let request = CompletionRequest::text(&model, PROBE_PROMPT).with_temperature(0.0);
        let timeout_ms = self.config.provider.timeout_ms.min(PROBE_TIMEOUT_MS);

        let started = Instant::now();
        let result = self.call("probing", &request, timeout_ms).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let error = result.err().map(|e| {
            tracing::warn!("Provider probe failed: {}", e);
            e.to_string()
        });
        ProbeReport {
            ok: error.is_none(),
            provider: self.model.name().to_string(),
            model,
            latency_ms,
            error,
            checked_at: Utc::now(),
        }
    }

    async fn call(
        &self,
        operation: &'static str,
        request: &CompletionRequest,
        timeout_ms: u64,
    ) -> Result<String> {
        let started = Instant::now();
        let outcome =
            tokio::time::timeout(Duration::from_millis(timeout_ms), self.model.complete(request))
                .await;
        tracing::debug!(
            model = %request.model,
            latency_ms = started.elapsed().as_millis() as u64,
            "Provider call finished while {}",
            operation
        );

        match outcome {
            Err(_) => Err(LessonForgeError::Timeout {
                operation: operation.to_string(),
                timeout_ms,
            }),
            Ok(Err(e)) => Err(LessonForgeError::upstream(operation, e)),
            Ok(Ok(text)) => Ok(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::AgentError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns queued replies in order and records every prompt.
    struct Scripted {
        replies: Mutex<Vec<std::result::Result<String, AgentError>>>,
        prompts: Mutex<Vec<CompletionRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<std::result::Result<String, AgentError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LessonModel for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> std::result::Result<String, AgentError> {
            self.prompts.lock().unwrap().push(request.clone());
            self.replies.lock().unwrap().pop().unwrap_or(Err(AgentError::Empty))
        }
    }

    fn service(model: Arc<Scripted>) -> LessonService {
        LessonService::new(Arc::new(Config::default()), model)
    }

    #[tokio::test]
    async fn test_suggest_uses_json_mode_and_parses() {
        let model = Scripted::new(vec![Ok(r#"[{"title": "A"}, {"title": "B"}]"#.into())]);
        let svc = service(model.clone());
        let req: SuggestRequest = serde_json::from_str(r#"{"tv": 6}"#).unwrap();

        let cards = svc.suggest(&req).await.unwrap();
        assert_eq!(cards.len(), 2);
        let sent = model.prompts.lock().unwrap();
        assert_eq!(sent[0].format, crate::clients::ResponseFormat::Json);
        assert_eq!(sent[0].model, svc.config().provider.suggest_model);
    }

    #[tokio::test]
    async fn test_suggest_validation_skips_provider() {
        let model = Scripted::new(vec![]);
        let svc = service(model.clone());
        let err = svc.suggest(&SuggestRequest::default()).await.unwrap_err();
        assert!(matches!(err, LessonForgeError::Validation { .. }));
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_suggest_empty_reply_is_empty_list() {
        let svc = service(Scripted::new(vec![Err(AgentError::Empty)]));
        let req: SuggestRequest = serde_json::from_str(r#"{"ka": 23}"#).unwrap();
        assert!(svc.suggest(&req).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_enhances_model_output() {
        let svc = service(Scripted::new(vec![Ok(
            "```markdown\n## Leerlingversie\nDoe dit.\n```".into(),
        )]));
        let req: GenerateRequest = serde_json::from_str(
            r#"{"chosen": {"title": "T", "head_question": "Was dit terecht?"}, "tv": "TV6"}"#,
        )
        .unwrap();

        let out = svc.generate(&req).await.unwrap();
        assert!(!out.is_degraded());
        assert!(
            out.markdown()
                .starts_with("# Lesdocument — Was dit terecht? (Period TV6)")
        );
        assert!(!out.markdown().contains("```"));
    }

    #[tokio::test]
    async fn test_generate_empty_and_failed_calls() {
        let req: GenerateRequest = serde_json::from_str(r#"{"chosen": "T"}"#).unwrap();

        let svc = service(Scripted::new(vec![Ok("   ".into())]));
        assert!(matches!(
            svc.generate(&req).await.unwrap_err(),
            LessonForgeError::EmptyGeneration { .. }
        ));

        let svc = service(Scripted::new(vec![Err(AgentError::Http {
            status: 503,
            body: "overloaded".into(),
        })]));
        let err = svc.generate(&req).await.unwrap_err();
        assert_eq!(err.public_message(), "Internal error while generating");
    }

    #[tokio::test]
    async fn test_probe_reports_failure() {
        let svc = service(Scripted::new(vec![Err(AgentError::MissingApiKey)]));
        let report = svc.probe().await;
        assert!(!report.ok);
        assert_eq!(report.provider, "scripted");
        assert!(report.error.unwrap().contains("API key"));
    }
}
