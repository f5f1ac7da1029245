use once_cell::sync::Lazy;
use regex::Regex;

use super::EnhancementContext;
use super::heading::is_h1;

/// Phrase unique to the framing block; its presence means "already framed".
pub const SENTINEL: &str = "Het Vreemde Verleden";
const FOCUS_FALLBACK: &str = "historische context van het onderwerp";

static SENTINEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)het[ \t]+vreemde[ \t]+verleden").expect("sentinel regex"));

/// Sentinel check over the body; level-1 heading lines are skipped so a head
/// question quoting the phrase does not suppress the framing block.
pub fn has_intro(doc: &str) -> bool {
    doc.lines().any(|line| !is_h1(line) && SENTINEL_RE.is_match(line))
}

/// `theme · Period X · Topic Y`, skipping whatever is absent.
pub fn focus_line(ctx: &EnhancementContext) -> String {
    let parts: Vec<String> = [
        ctx.theme(),
        ctx.period_id().map(|p| format!("Period {p}")),
        ctx.topic_id().map(|t| format!("Topic {t}")),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        FOCUS_FALLBACK.to_string()
    } else {
        parts.join(" · ")
    }
}

/// The anti-presentism callout, one quoted line per element.
pub fn build_intro(ctx: &EnhancementContext) -> String {
    [
        format!("> ### {SENTINEL} — kijk met de bril van toen"),
        "> In deze les onderzoeken we **waarom** mensen in hun **eigen tijd** keuzes maakten die wij nu vreemd of fout kunnen vinden.".to_string(),
        "> Gebruik alleen informatie die **toen** beschikbaar was, met hun waarden, belangen en risico’s.".to_string(),
        format!("> *Focus:* {}", focus_line(ctx)),
    ]
    .join("\n")
}

/// Add the framing block below the first H1 (or at the top) unless the
/// sentinel already appears outside the heading.
pub fn ensure_intro(doc: &str, ctx: &EnhancementContext) -> String {
    if has_intro(doc) {
        tracing::debug!("Intro sentinel present, skipping injection");
        return doc.to_string();
    }
    let intro = build_intro(ctx);

    let mut offset = 0;
    for line in doc.split_inclusive('\n') {
        offset += line.len();
        if is_h1(line) {
            let (head, rest) = doc.split_at(offset);
            let sep = if head.ends_with('\n') { "" } else { "\n" };
            return format!("{head}{sep}\n{intro}\n\n{}", rest.trim_start_matches('\n'));
        }
    }

    format!("{intro}\n\n{doc}")
}
