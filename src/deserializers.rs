//! Custom deserializers for forgiving request and model-output parsing.
//!
//! The browser sends period/topic ids as numbers or strings, and models return
//! list fields as either a JSON array or one string. These helpers accept both
//! while keeping the Rust types strict.

use serde::{Deserialize, Deserializer};

/// Deserializes an optional identifier that may arrive as a string or a number.
///
/// # Accepted Formats
///
/// * **String**: `"TV6"`, `" 23 "` (trimmed; blank → `None`)
/// * **Number**: `6` → `"6"`
/// * **Null / missing**: `None`
///
/// # Examples
///
/// ```json
/// { "period_id": "TV6" }
/// { "tv": 6 }
/// ```
pub fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let opt = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(v) = opt else { return Ok(None) };
    match v {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        serde_json::Value::String(s) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        other => Err(D::Error::custom(format!(
            "invalid identifier, expected string or number: {}",
            other
        ))),
    }
}

/// Deserializes a list of strings that may arrive as one string.
///
/// * **Array**: non-string entries are rendered with their JSON text
/// * **String**: split on newlines, leading bullet markers removed
/// * **Null / missing**: empty list
pub fn de_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<serde_json::Value>::deserialize(deserializer)?;
    let items = match opt {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(serde_json::Value::Array(values)) => values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Some(serde_json::Value::String(s)) => s
            .lines()
            .map(|l| l.trim().trim_start_matches(['-', '*', '•']).trim().to_string())
            .collect(),
        Some(other) => vec![other.to_string()],
    };
    Ok(items.into_iter().filter(|s| !s.trim().is_empty()).collect())
}

/// Deserializes free text that models sometimes return as a number or list.
pub fn de_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match opt {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Array(values)) => values
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(" "),
        Some(other) => other.to_string(),
    })
}
