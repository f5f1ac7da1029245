//! Categorized causes list: rendering and placement at a structural anchor.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::inline_text;

/// Heading text of the rendered causes section, also the duplicate guard.
pub const CAUSES_HEADING: &str = "Keuzelijst: mogelijke oorzaken (kies wat past bij je uitleg)";
const CAUSES_INSTRUCTION: &str = "_Gebruik deze lijst om per bron → oorzaak expliciet te maken. Je mag combineren, maar wees concreet._";

/// A category label with its ordered exemplar phrases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseCategory {
    #[serde(alias = "cat", alias = "label")]
    pub category: String,
    #[serde(default, alias = "examples")]
    pub items: Vec<String>,
}

impl CauseCategory {
    pub fn new(category: impl Into<String>, items: &[&str]) -> Self {
        Self {
            category: category.into(),
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The six built-in categories used when a request brings none.
pub fn default_causes() -> Vec<CauseCategory> {
    vec![
        CauseCategory::new(
            "Politiek/bestuur",
            &["centralisatie", "legitimiteit (droit divin)", "orde & veiligheid"],
        ),
        CauseCategory::new(
            "Economisch/fiscaal",
            &["oorlogskosten", "belastingdruk", "handel/mercantilisme"],
        ),
        CauseCategory::new(
            "Ideologisch/religieus",
            &["eenheid van geloof", "gehoorzaamheid", "ketterijbestrijding"],
        ),
        CauseCategory::new(
            "Pragmatisch/orde",
            &["einde aan chaos/burgeroorlog", "efficiëntie", "hofdiscipline"],
        ),
        CauseCategory::new(
            "Emotioneel/veiligheid",
            &["angst/trauma", "groepsdruk", "eer/loyaliteit"],
        ),
        CauseCategory::new(
            "Extern",
            &[
                "buitenlandse dreiging",
                "bondgenootschappen",
                "handelsoorlogen",
                "migratie",
            ],
        ),
    ]
}

/// Render the causes section: level-3 heading, instruction, one bullet per
/// category in input order, trailing blank line. Labels and exemplars are
/// flattened to a single line each.
pub fn build_causes_block(categories: &[CauseCategory]) -> String {
    let mut out = format!("### {CAUSES_HEADING}\n{CAUSES_INSTRUCTION}\n\n");
    for c in categories {
        let items: Vec<String> = c
            .items
            .iter()
            .map(|item| inline_text(item))
            .filter(|item| !item.is_empty())
            .collect();
        let line = format!("- **{}:** {}", inline_text(&c.category), items.join(", "));
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Where the causes block ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CausesPlacement {
    /// Inserted right above the collaboration/positioning table section
    BeforeTableAnchor,
    /// Inserted right below the student version header
    AfterStudentVersion,
    /// No anchor found; appended to the end of the document
    AppendedAtEnd,
    /// The document already carries a causes section
    AlreadyPresent,
}

struct Anchor {
    placement: CausesPlacement,
    pattern: Regex,
}

/// Anchors in priority order. Each matches a `##` or `###` header line; any
/// numbering or "2×2" prefix is tolerated before the name.
static ANCHORS: Lazy<Vec<Anchor>> = Lazy::new(|| {
    vec![
        Anchor {
            placement: CausesPlacement::BeforeTableAnchor,
            pattern: Regex::new(
                r"(?im)^#{2,3}[ \t]*(?:[0-9.)×xX-]+[ \t]*)*(?:samenwerkings-?tabel|positioneer-?t?abel|positioneer-?kwadrant|collaboration[ \t]+table|positioning[ \t]+(?:table|quadrant))[^\n]*$",
            )
            .expect("table anchor regex"),
        },
        Anchor {
            placement: CausesPlacement::AfterStudentVersion,
            pattern: Regex::new(
                r"(?im)^#{2,3}[ \t]*(?:[0-9.)]+[ \t]*)*(?:leerling[- ]?versie|student[ \t]+version)[^\n]*$",
            )
            .expect("student version anchor regex"),
        },
    ]
});

/// A header line naming the causes section; prose mentioning it does not count.
static EXISTING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*#{1,6}[ \t]*keuzelijst:[ \t]*mogelijke[ \t]+oorzaken")
        .expect("causes guard regex")
});

pub fn has_causes(doc: &str) -> bool {
    EXISTING.is_match(doc)
}

/// Insert `block` at the first matching anchor and report where it went.
pub fn place_causes(doc: &str, block: &str) -> (String, CausesPlacement) {
    if has_causes(doc) {
        return (doc.to_string(), CausesPlacement::AlreadyPresent);
    }

    for anchor in ANCHORS.iter() {
        let Some(m) = anchor.pattern.find(doc) else {
            continue;
        };
        let out = match anchor.placement {
            CausesPlacement::BeforeTableAnchor => {
                let mut head = doc[..m.start()].to_string();
                if !head.is_empty() && !head.ends_with("\n\n") {
                    head.push('\n');
                }
                format!("{head}{block}{}", &doc[m.start()..])
            }
            _ => {
                let rest = doc[m.end()..].trim_start_matches(['\r', '\n']);
                format!("{}\n\n{block}{rest}", &doc[..m.end()])
            }
        };
        return (out, anchor.placement);
    }

    let trimmed = doc.trim_end();
    if trimmed.is_empty() {
        (block.to_string(), CausesPlacement::AppendedAtEnd)
    } else {
        (format!("{trimmed}\n\n{block}"), CausesPlacement::AppendedAtEnd)
    }
}

/// Insert `block` into `doc`; see [`place_causes`] for the anchor rules.
pub fn inject_causes(doc: &str, block: &str) -> String {
    place_causes(doc, block).0
}
