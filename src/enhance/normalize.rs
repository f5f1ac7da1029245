//! Whitespace normalization for the finished document.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// A line break followed by two or more blank (or whitespace-only) lines.
static BLANK_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("blank run regex"));

/// Convert CRLF / CR line endings to LF and compose to Unicode NFC.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .nfc()
        .collect()
}

/// Collapse every run of three or more line breaks into a single blank line
/// and trim the whole document.
pub fn normalize(doc: &str) -> String {
    let unix = normalize_line_endings(doc);
    BLANK_RUN.replace_all(&unix, "\n\n").trim().to_string()
}
