//! Markdown enhancement pipeline for generated lesson documents.
//!
//! Raw model output goes through a fixed sequence of stages:
//!
//! 1. line-ending/Unicode normalization and fence stripping
//! 2. level-1 heading guarantee
//! 3. anti-presentism framing block
//! 4. categorized causes list at a structural anchor
//! 5. whitespace normalization
//!
//! Every stage is pure and idempotent, so running the pipeline on its own
//! output changes nothing. The orchestrator never lets a failure escape: a
//! panicking stage degrades to the trimmed raw input.

pub mod causes;
pub mod fences;
pub mod heading;
pub mod intro;
pub mod normalize;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use causes::{CauseCategory, CausesPlacement, build_causes_block, default_causes, inject_causes};
pub use fences::strip_fences;
pub use heading::ensure_heading;
pub use intro::{SENTINEL, ensure_intro};
pub use normalize::normalize;

/// Request-scoped metadata the pipeline interpolates into the document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancementContext {
    #[serde(default)]
    pub head_question: Option<String>,
    #[serde(default)]
    pub period_id: Option<String>,
    #[serde(default)]
    pub topic_id: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    /// Overrides the enhancer's default categories when non-empty
    #[serde(default)]
    pub causes: Option<Vec<CauseCategory>>,
}

impl EnhancementContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_head_question(mut self, value: impl Into<String>) -> Self {
        self.head_question = Some(value.into());
        self
    }

    pub fn with_period_id(mut self, value: impl Into<String>) -> Self {
        self.period_id = Some(value.into());
        self
    }

    pub fn with_topic_id(mut self, value: impl Into<String>) -> Self {
        self.topic_id = Some(value.into());
        self
    }

    pub fn with_theme(mut self, value: impl Into<String>) -> Self {
        self.theme = Some(value.into());
        self
    }

    pub fn with_causes(mut self, causes: Vec<CauseCategory>) -> Self {
        self.causes = Some(causes);
        self
    }

    pub fn head_question(&self) -> Option<String> {
        clean_field(self.head_question.as_deref())
    }

    pub fn period_id(&self) -> Option<String> {
        clean_field(self.period_id.as_deref())
    }

    pub fn topic_id(&self) -> Option<String> {
        clean_field(self.topic_id.as_deref())
    }

    pub fn theme(&self) -> Option<String> {
        clean_field(self.theme.as_deref())
    }
}

/// Flatten a caller-supplied value onto one line: whitespace runs become a
/// single space and fence delimiters are removed, so interpolated text can
/// never open a heading or a code block.
pub(crate) fn inline_text(value: &str) -> String {
    let mut text = value.to_string();
    while text.contains("```") {
        text = text.replace("```", "");
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`inline_text`], with blank becoming `None`.
fn clean_field(value: Option<&str>) -> Option<String> {
    let text = inline_text(value?);
    (!text.is_empty()).then_some(text)
}

/// What the pipeline changed, for logs and API consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementReport {
    pub fences_stripped: bool,
    pub heading_synthesized: bool,
    pub heading_rewritten: bool,
    pub intro_injected: bool,
    pub causes: CausesPlacement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Enhancement {
    /// Every stage ran
    Complete {
        markdown: String,
        report: EnhancementReport,
    },
    /// A stage failed; `markdown` is the trimmed raw input
    Degraded { markdown: String, reason: String },
}

impl Enhancement {
    pub fn markdown(&self) -> &str {
        match self {
            Enhancement::Complete { markdown, .. } | Enhancement::Degraded { markdown, .. } => {
                markdown
            }
        }
    }

    pub fn into_markdown(self) -> String {
        match self {
            Enhancement::Complete { markdown, .. } | Enhancement::Degraded { markdown, .. } => {
                markdown
            }
        }
    }

    pub fn report(&self) -> Option<&EnhancementReport> {
        match self {
            Enhancement::Complete { report, .. } => Some(report),
            Enhancement::Degraded { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Enhancement::Degraded { .. })
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            Enhancement::Complete { .. } => "complete",
            Enhancement::Degraded { .. } => "degraded",
        }
    }
}

/// Pipeline entry point. Holds the default causes as an immutable value so
/// one instance can be shared across requests.
#[derive(Debug, Clone)]
pub struct Enhancer {
    default_causes: Arc<[CauseCategory]>,
}

impl Default for Enhancer {
    fn default() -> Self {
        Self::new(default_causes())
    }
}

impl Enhancer {
    pub fn new(default_causes: Vec<CauseCategory>) -> Self {
        Self {
            default_causes: default_causes.into(),
        }
    }

    pub fn default_causes(&self) -> &[CauseCategory] {
        &self.default_causes
    }

    /// Run every stage in order. Never panics; see [`Enhancement::Degraded`].
    pub fn enhance(&self, raw: &str, ctx: &EnhancementContext) -> Enhancement {
        fail_open(raw, || self.run(raw, ctx))
    }

    fn run(&self, raw: &str, ctx: &EnhancementContext) -> Enhancement {
        let unix = normalize::normalize_line_endings(raw);

        let unfenced = strip_fences(&unix);
        let fences_stripped = unfenced.matches("```").count() < unix.matches("```").count();

        let had_h1 = heading::count_h1(&unfenced) > 0;
        let headed = ensure_heading(&unfenced, ctx);
        let heading_rewritten = had_h1 && headed != unfenced;

        let framed = ensure_intro(&headed, ctx);
        let intro_injected = framed != headed;

        let categories = ctx
            .causes
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(self.default_causes());
        let (with_causes, placement) =
            causes::place_causes(&framed, &build_causes_block(categories));
        if placement == CausesPlacement::AppendedAtEnd {
            tracing::warn!("No table or student-version anchor found, causes appended at end");
        }

        let markdown = normalize(&with_causes);
        let report = EnhancementReport {
            fences_stripped,
            heading_synthesized: !had_h1,
            heading_rewritten,
            intro_injected,
            causes: placement,
        };
        tracing::debug!(?report, "Enhancement complete");

        Enhancement::Complete { markdown, report }
    }
}

/// Run `stages`; if any of them panics, fall back to the trimmed raw text.
fn fail_open(raw: &str, stages: impl FnOnce() -> Enhancement) -> Enhancement {
    match panic::catch_unwind(AssertUnwindSafe(stages)) {
        Ok(done) => done,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "enhancement stage panicked".to_string());
            tracing::warn!("Enhancement degraded to raw output: {}", reason);
            Enhancement::Degraded {
                markdown: raw.trim().to_string(),
                reason,
            }
        }
    }
}

/// Enhance with the built-in default causes and return the document text.
pub fn enhance(raw: &str, ctx: &EnhancementContext) -> String {
    Enhancer::default().enhance(raw, ctx).into_markdown()
}
