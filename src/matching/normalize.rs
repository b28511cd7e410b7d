// src/matching/normalize.rs
//! Text canonicalization for field matching.
//!
//! Extracted page text and claimed values are normalized identically so
//! comparisons are case- and punctuation-insensitive.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid non-word pattern"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// Canonicalizes text for comparison.
///
/// Lower-cases, strips all characters that are neither word characters nor
/// whitespace, collapses whitespace runs to a single space, and trims the
/// ends. Pure and total; `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
    collapsed.trim().to_string()
}
