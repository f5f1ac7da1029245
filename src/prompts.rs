//! Model prompts for the two generation stages.
//!
//! Instructions live in Markdown templates next to this module; the request
//! specifics (period, topic, chosen card, extra wishes) are appended per call.

use crate::catalog::{Period, find_period, find_topic};
use crate::schemas::{GenerateRequest, SuggestRequest, Suggestion};

const SUGGEST_TEMPLATE: &str = include_str!("prompts/suggest.md");
const LESSON_TEMPLATE: &str = include_str!("prompts/lesson.md");

/// Prompt asking for exactly `count` suggestion cards as a JSON array.
pub fn suggestion_prompt(req: &SuggestRequest, periods: &[Period], count: usize) -> String {
    let mut prompt = SUGGEST_TEMPLATE.replace("{count}", &count.to_string());
    prompt.push('\n');

    push_scope(
        &mut prompt,
        periods,
        req.period_id.as_deref(),
        req.topic_id.as_deref(),
    );
    push_field(&mut prompt, "Context", &req.context);
    push_list(&mut prompt, "Verplichte bronnen", &req.required_sources);
    push_extra(&mut prompt, req.extra.as_ref());

    prompt
}

/// Prompt for the full lesson document built around the chosen card.
pub fn lesson_prompt(card: &Suggestion, req: &GenerateRequest, periods: &[Period]) -> String {
    let mut prompt = LESSON_TEMPLATE.to_string();
    prompt.push('\n');

    push_field(&mut prompt, "Titel", &card.title);
    push_field(&mut prompt, "Hoofdvraag (presentistisch)", card.question());
    let context = if card.context.trim().is_empty() {
        &req.context
    } else {
        &card.context
    };
    push_field(&mut prompt, "Context", context);
    push_list(&mut prompt, "Leeropbrengst", &card.learning_summary);
    push_list(&mut prompt, "Collecties", &card.core_collections);
    push_list(&mut prompt, "Dimensies", &card.dimensions);
    push_field(&mut prompt, "Denkstap", &card.reasoning_hook);

    push_scope(&mut prompt, periods, req.period_id(), req.topic_id());
    push_field(&mut prompt, "Thema", req.theme());
    push_list(&mut prompt, "Verplichte bronnen", &req.required_sources);
    push_extra(&mut prompt, req.extra.as_ref());

    prompt
}

/// Period and topic lines, with catalog labels when the ids are known.
fn push_scope(prompt: &mut String, periods: &[Period], period_id: Option<&str>, topic_id: Option<&str>) {
    if let Some(id) = period_id {
        let line = match find_period(periods, id) {
            Some(period) => format!("{} ({})", period.label, period.id),
            None => id.to_string(),
        };
        push_field(prompt, "Tijdvak", &line);
    }
    if let Some(id) = topic_id {
        let line = match find_topic(periods, id) {
            Some(topic) => format!("{} (KA {})", topic.name, topic.id),
            None => format!("KA {id}"),
        };
        push_field(prompt, "Kenmerkend aspect", &line);
    }
}

fn push_field(prompt: &mut String, label: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        prompt.push_str(&format!("{label}: {value}\n"));
    }
}

fn push_list(prompt: &mut String, label: &str, items: &[String]) {
    let items: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !items.is_empty() {
        prompt.push_str(&format!("{label}: {}\n", items.join("; ")));
    }
}

fn push_extra(prompt: &mut String, extra: Option<&serde_json::Value>) {
    match extra {
        None | Some(serde_json::Value::Null) => {}
        Some(serde_json::Value::String(s)) => push_field(prompt, "Extra wensen", s),
        Some(other) => push_field(prompt, "Extra wensen", &other.to_string()),
    }
}
