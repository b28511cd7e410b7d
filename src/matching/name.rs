// src/matching/name.rs
//! Name matching against extracted pages.
//!
//! A claimed name matches when its words appear as a consecutive,
//! whitespace-separated run in a page. A run that anchors on the claim's
//! first and last words but differs in its interior (extra or missing
//! words) is reported as `FoundButWrong` rather than `NotFound`: the
//! document clearly mentions the person, but not under the exact claimed
//! name.

use crate::matching::normalize::normalize;
use crate::models::field::VerificationStatus;
use regex::Regex;

/// Upper bound on interior words between the first and last claim tokens
/// when looking for a mismatched run. Keeps a first name on page one and a
/// matching surname three paragraphs later from counting as a "run".
const MAX_INTERIOR_WORDS: usize = 3;

/// Matches a claimed name against the extracted pages.
///
/// Pages are scanned in original order. The first exact run short-circuits
/// to `Found`; a mismatched run is remembered as `FoundButWrong` but never
/// overrides an exact match on a later page.
pub fn match_name(pages: &[String], claim: &str) -> VerificationStatus {
    let normalized_claim = normalize(claim);
    let tokens: Vec<&str> = normalized_claim.split_whitespace().collect();
    if tokens.is_empty() {
        return VerificationStatus::NotFound;
    }

    let exact = exact_run_pattern(&tokens);
    let loose = loose_run_pattern(&tokens);

    let mut mismatched_run = false;
    for page in pages {
        let normalized_page = normalize(page);

        if let Some(re) = &exact {
            if re.is_match(&normalized_page) {
                return VerificationStatus::Found;
            }
        }

        // No exact run on this page: any run the loose pattern locates
        // necessarily differs from the claim in word count or content.
        if let Some(re) = &loose {
            if re.is_match(&normalized_page) {
                mismatched_run = true;
            }
        }
    }

    if mismatched_run {
        VerificationStatus::FoundButWrong
    } else {
        VerificationStatus::NotFound
    }
}

/// Pattern requiring every claim token, in order, separated by whitespace.
fn exact_run_pattern(tokens: &[&str]) -> Option<Regex> {
    let escaped: Vec<String> = tokens.iter().map(|t| regex::escape(t)).collect();
    let pattern = format!(r"(?i)\b{}\b", escaped.join(r"\s+"));
    Regex::new(&pattern).ok()
}

/// Pattern anchoring on the first and last claim tokens with a bounded
/// number of arbitrary words between them. Only meaningful for claims of
/// two or more words.
fn loose_run_pattern(tokens: &[&str]) -> Option<Regex> {
    if tokens.len() < 2 {
        return None;
    }
    let first = regex::escape(tokens[0]);
    let last = regex::escape(tokens[tokens.len() - 1]);
    let pattern = format!(
        r"(?i)\b{}(?:\s+\w+){{0,{}}}?\s+{}\b",
        first, MAX_INTERIOR_WORDS, last
    );
    Regex::new(&pattern).ok()
}
