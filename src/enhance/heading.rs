use once_cell::sync::Lazy;
use regex::Regex;

use super::EnhancementContext;

const HEADING_TITLE: &str = "# Lesdocument";

static H1_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*#[ \t]+\S").expect("h1 regex"));

/// True for a level-1 heading line (`# Title`, optionally indented).
pub fn is_h1(line: &str) -> bool {
    H1_LINE.is_match(line)
}

pub fn count_h1(doc: &str) -> usize {
    doc.lines().filter(|l| is_h1(l)).count()
}

/// Heading used when the model produced none, e.g.
/// `# Lesdocument — Was dit terecht? (Period TV6) (Topic 23)`.
pub fn synthesize_heading(ctx: &EnhancementContext) -> String {
    let tail: Vec<String> = [
        ctx.head_question(),
        ctx.period_id().map(|p| format!("(Period {p})")),
        ctx.topic_id().map(|t| format!("(Topic {t})")),
    ]
    .into_iter()
    .flatten()
    .collect();

    if tail.is_empty() {
        HEADING_TITLE.to_string()
    } else {
        format!("{HEADING_TITLE} — {}", tail.join(" "))
    }
}

/// Guarantee a single level-1 heading as the first non-blank line.
///
/// A document whose only H1 already leads is returned as is. Without any H1 a
/// heading is synthesized from the context and prepended. An H1 further down
/// is hoisted to the top and any extra H1 lines are demoted to H2.
pub fn ensure_heading(doc: &str, ctx: &EnhancementContext) -> String {
    let lines: Vec<&str> = doc.lines().collect();
    let h1_at: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| is_h1(l))
        .map(|(i, _)| i)
        .collect();

    let Some(&first) = h1_at.first() else {
        let heading = synthesize_heading(ctx);
        tracing::debug!("No H1 found, synthesized {:?}", heading);
        return format!("{heading}\n\n{doc}");
    };

    let first_content = lines.iter().position(|l| !l.trim().is_empty());
    let leads = first_content == Some(first);
    if leads && h1_at.len() == 1 {
        return doc.to_string();
    }

    let heading = lines[first].trim_start();
    let rest: Vec<String> = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != first && (!leads || *i > first))
        .map(|(i, l)| {
            if h1_at.contains(&i) {
                l.replacen('#', "##", 1)
            } else {
                l.to_string()
            }
        })
        .collect();

    tracing::debug!(
        "Rewrote headings: hoisted={}, demoted={}",
        !leads,
        h1_at.len() - 1
    );

    let rest = rest.join("\n");
    let rest = rest.trim_start_matches('\n');
    if rest.is_empty() {
        heading.to_string()
    } else if leads {
        format!("{heading}\n{rest}")
    } else {
        format!("{heading}\n\n{rest}")
    }
}
