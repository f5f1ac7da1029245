//! Fence delimiter removal.

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading fence, optionally followed by a language tag on the same line.
static OPENING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\A```(?:[ \t]*[a-z0-9_+-]*[ \t]*(?:\n|\z))?").expect("opening fence regex")
});

/// A fence pair wrapping a sub-block somewhere inside the text.
static INNER_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)```(?:markdown|md|json)?\s*(.*?)\s*```").expect("inner fence regex")
});

/// A delimiter left over once every pair is gone.
static STRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```(?:markdown|md|json)?").expect("stray fence regex"));

/// Remove fence delimiters from model output and trim it.
///
/// A delimiter at the very start (with or without a language tag) and one at
/// the very end are dropped independently, then every remaining pair is
/// unwrapped. Passes repeat until nothing changes, so the result is a fixed
/// point. A delimiter without a partner is then dropped, so the result holds
/// no fence at all and a second call is a no-op.
pub fn strip_fences(text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    if current.contains("```") {
        tracing::debug!("Dropping unpaired fence delimiter");
        current = STRAY.replace_all(&current, "").trim().to_string();
    }
    current
}

fn strip_once(text: &str) -> String {
    let mut body = text;
    if let Some(m) = OPENING.find(body) {
        body = &body[m.end()..];
    }
    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    INNER_PAIR.replace_all(body, "$1").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_only_trimmed() {
        assert_eq!(strip_fences("  # Les\n\nTekst  \n"), "# Les\n\nTekst");
    }

    #[test]
    fn test_wrapped_markdown_is_unwrapped() {
        let raw = "```markdown\n# Les\n\n## Leerlingversie\n```";
        assert_eq!(strip_fences(raw), "# Les\n\n## Leerlingversie");
    }

    #[test]
    fn test_tag_is_case_insensitive_and_optional() {
        assert_eq!(strip_fences("```MD\nhallo\n```"), "hallo");
        assert_eq!(strip_fences("```\nhallo\n```"), "hallo");
        assert_eq!(strip_fences("```Markdown\nhallo"), "hallo");
    }

    #[test]
    fn test_inner_sub_block_is_unwrapped() {
        let raw = "# Les\n\nIntro\n```json\n{\"a\": 1}\n```\nSlot";
        let out = strip_fences(raw);
        assert!(!out.contains("```"));
        assert!(out.contains("{\"a\": 1}"));
        assert!(out.starts_with("# Les"));
    }

    #[test]
    fn test_nested_outer_fences_converge() {
        let raw = "```\n```md\nInhoud\n```\n```";
        assert_eq!(strip_fences(raw), "Inhoud");
    }

    #[test]
    fn test_idempotent_on_awkward_input() {
        for raw in [
            "```\n```\nx",
            "a ``` b ``` c ```",
            "```",
            "tekst\n```",
            "```python\nprint(1)\n```\n\nmeer",
        ] {
            let once = strip_fences(raw);
            assert_eq!(strip_fences(&once), once, "input: {raw:?}");
            assert!(!once.contains("```"), "input: {raw:?}");
        }
    }

    #[test]
    fn test_unpaired_delimiter_mid_text_is_dropped() {
        assert_eq!(strip_fences("A\n```json\n# T"), "A\n\n# T");
    }

    #[test]
    fn test_lone_fence_becomes_empty() {
        assert_eq!(strip_fences("```"), "");
        assert_eq!(strip_fences("   "), "");
    }
}
