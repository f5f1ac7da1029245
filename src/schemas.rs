//! Request and response bodies of the lesson API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deserializers::{de_lenient_string, de_opt_id, de_string_list};
use crate::enhance::{CauseCategory, EnhancementContext, EnhancementReport};
use crate::error::{LessonForgeError, Result};

/// One candidate lesson proposal ("card")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default, alias = "titel", deserialize_with = "de_lenient_string")]
    pub title: String,
    /// Presentist question students are asked to judge
    #[serde(
        default,
        alias = "hoofdvraag",
        deserialize_with = "de_lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub head_question: String,
    #[serde(
        default,
        deserialize_with = "de_lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub context: String,
    #[serde(
        default,
        deserialize_with = "de_string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub learning_summary: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub mini_rationale: String,
    #[serde(default, deserialize_with = "de_string_list")]
    pub core_collections: Vec<String>,
    #[serde(default, deserialize_with = "de_string_list")]
    pub dimensions: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub reasoning_hook: String,
}

impl Suggestion {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// The head question, falling back to the title
    pub fn question(&self) -> &str {
        let q = self.head_question.trim();
        if q.is_empty() { self.title.trim() } else { q }
    }
}

/// Body of `POST /api/suggest`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestRequest {
    #[serde(default, alias = "tv", alias = "tijdvak", deserialize_with = "de_opt_id")]
    pub period_id: Option<String>,
    #[serde(default, alias = "ka", deserialize_with = "de_opt_id")]
    pub topic_id: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub context: String,
    #[serde(default, deserialize_with = "de_string_list")]
    pub required_sources: Vec<String>,
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}

impl SuggestRequest {
    pub fn validate(&self) -> Result<()> {
        if self.period_id.is_none() && self.topic_id.is_none() {
            return Err(LessonForgeError::validation("Missing period_id or topic_id"));
        }
        Ok(())
    }
}

/// The picked proposal: a bare title or a full card
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Chosen {
    Title(String),
    Card(Suggestion),
}

/// Body of `POST /api/generate`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default, alias = "chosen_card", alias = "selectedSuggestion")]
    pub chosen: Option<Chosen>,
    #[serde(default, alias = "tv", alias = "tijdvak", deserialize_with = "de_opt_id")]
    pub period_id: Option<String>,
    #[serde(default, alias = "ka", deserialize_with = "de_opt_id")]
    pub topic_id: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub theme: String,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub context: String,
    #[serde(default, deserialize_with = "de_string_list")]
    pub required_sources: Vec<String>,
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
    /// Custom causes list for this lesson; defaults apply when absent
    #[serde(default)]
    pub causes: Option<Vec<CauseCategory>>,
    /// Older clients nest period, topic and theme here
    #[serde(default)]
    pub options: Option<LessonOptions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LessonOptions {
    #[serde(default, alias = "tv", deserialize_with = "de_opt_id")]
    pub period_id: Option<String>,
    #[serde(default, alias = "ka", deserialize_with = "de_opt_id")]
    pub topic_id: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub theme: String,
}

impl GenerateRequest {
    /// Resolve the chosen proposal into a card, rejecting one without a title or question.
    pub fn chosen_card(&self) -> Result<Suggestion> {
        let card = match &self.chosen {
            Some(Chosen::Title(title)) => Suggestion::titled(title.trim()),
            Some(Chosen::Card(card)) => card.clone(),
            None => Suggestion::default(),
        };
        if card.question().is_empty() {
            return Err(LessonForgeError::validation(
                "Missing chosen title or head question",
            ));
        }
        Ok(card)
    }

    pub fn period_id(&self) -> Option<&str> {
        self.period_id
            .as_deref()
            .or_else(|| self.options.as_ref()?.period_id.as_deref())
    }

    pub fn topic_id(&self) -> Option<&str> {
        self.topic_id
            .as_deref()
            .or_else(|| self.options.as_ref()?.topic_id.as_deref())
    }

    pub fn theme(&self) -> &str {
        match &self.options {
            Some(opts) if self.theme.trim().is_empty() => &opts.theme,
            _ => &self.theme,
        }
    }

    pub fn enhancement_context(&self, card: &Suggestion) -> EnhancementContext {
        EnhancementContext {
            head_question: Some(card.question().to_string()),
            period_id: self.period_id().map(str::to_string),
            topic_id: self.topic_id().map(str::to_string),
            theme: Some(self.theme().to_string()),
            causes: self.causes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestResponse {
    pub status: &'static str,
    pub count: usize,
    pub suggestions: Vec<Suggestion>,
}

impl SuggestResponse {
    pub fn ok(suggestions: Vec<Suggestion>) -> Self {
        Self {
            status: "ok",
            count: suggestions.len(),
            suggestions,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub status: &'static str,
    /// Enhanced lesson document
    pub markdown: String,
    /// "complete" or "degraded"
    pub enhancement: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<EnhancementReport>,
    pub generated_at: DateTime<Utc>,
}
