//! Lenient parsing of the suggestion stage's model output.
//!
//! Models are asked for a strict JSON array but regularly wrap it in fences,
//! prose or an envelope object. Parsing never fails: anything unusable yields
//! an empty list.

use serde_json::Value;

use crate::enhance::strip_fences;
use crate::schemas::Suggestion;

/// Parse up to `limit` suggestion cards from raw model text.
pub fn parse_suggestions(text: &str, limit: usize) -> Vec<Suggestion> {
    let cleaned = strip_fences(text);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        let cards = cards_from_value(value, limit);
        if !cards.is_empty() {
            return cards;
        }
    }

    for candidate in extract_json_candidates(&cleaned) {
        let Ok(value) = serde_json::from_str::<Value>(candidate) else {
            continue;
        };
        let cards = cards_from_value(value, limit);
        if !cards.is_empty() {
            return cards;
        }
    }

    tracing::warn!(
        "No suggestion cards found in model output ({} chars)",
        text.chars().count()
    );
    Vec::new()
}

/// Accepts a bare array, an envelope (`suggestions` / `items`) or one card.
fn cards_from_value(value: Value, limit: usize) -> Vec<Suggestion> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map
            .remove("suggestions")
            .or_else(|| map.remove("items"))
        {
            Some(Value::Array(items)) => items,
            _ => vec![Value::Object(map)],
        },
        _ => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Suggestion>(item) {
            Ok(card) => Some(card),
            Err(e) => {
                tracing::debug!("Skipping malformed suggestion: {}", e);
                None
            }
        })
        .filter(|card| !card.title.trim().is_empty())
        .take(limit)
        .collect()
}

/// Balanced top-level `{...}` / `[...]` substrings, in order of appearance.
/// Quotes only count inside a candidate, so apostrophes in prose are harmless.
pub fn extract_json_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escape = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match ch {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if !stack.is_empty() => in_string = true,
            '{' | '[' => {
                if stack.is_empty() {
                    start = Some(idx);
                }
                stack.push(ch);
            }
            '}' | ']' => {
                let open = if ch == '}' { '{' } else { '[' };
                if stack.last() == Some(&open) {
                    stack.pop();
                    if stack.is_empty()
                        && let Some(s) = start.take()
                    {
                        candidates.push(&text[s..idx + 1]);
                    }
                } else {
                    stack.clear();
                    start = None;
                }
            }
            _ => {}
        }
    }

    candidates
}
