// src/matching/numeric.rs
//! CGPA matching against extracted pages.
//!
//! Numeric claims cannot go through full normalization (it would strip the
//! decimal point), so this matcher works on the raw page text with
//! case-insensitive patterns. A labeled pattern (`CGPA: 9.4`, `9.4 CGPA`,
//! ...) yields a candidate number compared against the claim within an
//! absolute tolerance; a labeled candidate outside tolerance is what makes
//! a grade claim `FoundButWrong` rather than merely absent.

use crate::models::field::VerificationStatus;
use once_cell::sync::Lazy;
use regex::Regex;

/// Absolute tolerance when comparing a labeled candidate to the claim.
const TOLERANCE: f64 = 0.01;

/// How far (in characters) the literal claim value may sit from a grade
/// keyword for the proximity fallback to accept it.
const PROXIMITY_WINDOW: usize = 50;

const NUMBER: &str = r"(\d+(?:[.,]\d+)?)";
const KEYWORDS: &str = r"(?:cgpa|gpa|grade\s+point\s+average)";

/// Labeled grade patterns, each capturing one candidate number.
static LABELED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    let sources = [
        format!(r"(?i)\bcgpa\s*[:=\-]?\s*{}", NUMBER),
        format!(r"(?i){}\s*cgpa\b", NUMBER),
        format!(r"(?i)\bgpa\s*[:=\-]?\s*{}", NUMBER),
        format!(r"(?i){}\s*gpa\b", NUMBER),
        format!(r"(?i)grade\s+point\s+average\s*[:=\-]?\s*{}", NUMBER),
    ];
    sources
        .iter()
        .map(|s| Regex::new(s).expect("valid grade pattern"))
        .collect()
});

/// Matches a claimed CGPA against the extracted pages.
pub fn match_cgpa(pages: &[String], claim: &str) -> VerificationStatus {
    let claimed_value = match parse_decimal(claim) {
        Some(v) => v,
        None => return VerificationStatus::NotFound,
    };

    let mut wrong_candidate = false;
    for page in pages {
        for pattern in LABELED_PATTERNS.iter() {
            for caps in pattern.captures_iter(page) {
                let candidate = caps.get(1).and_then(|m| parse_decimal(m.as_str()));
                match candidate {
                    Some(value) if (value - claimed_value).abs() <= TOLERANCE + f64::EPSILON => {
                        return VerificationStatus::Found;
                    }
                    Some(_) => wrong_candidate = true,
                    None => {}
                }
            }
        }
    }

    // No labeled pattern matched anywhere: accept the literal value near a
    // grade keyword instead.
    if !wrong_candidate {
        if let Some(fallback) = proximity_patterns(claim) {
            for page in pages {
                if fallback.iter().any(|re| re.is_match(page)) {
                    return VerificationStatus::Found;
                }
            }
        }
    }

    if wrong_candidate {
        VerificationStatus::FoundButWrong
    } else {
        VerificationStatus::NotFound
    }
}

/// Parses a decimal, accepting `,` as the decimal separator.
fn parse_decimal(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace(',', ".");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Builds the proximity fallback patterns: the literal claim value (both
/// `.` and `,` spellings) within the window of a grade keyword, in either
/// direction.
fn proximity_patterns(claim: &str) -> Option<Vec<Regex>> {
    let trimmed = claim.trim();
    if trimmed.is_empty() {
        return None;
    }
    let dot_form = trimmed.replace(',', ".");
    let comma_form = trimmed.replace('.', ",");

    let mut patterns = Vec::new();
    for value in [dot_form, comma_form] {
        let escaped = regex::escape(&value);
        let keyword_first = format!(
            r"(?is){}.{{0,{}}}?\b{}\b",
            KEYWORDS, PROXIMITY_WINDOW, escaped
        );
        let value_first = format!(
            r"(?is)\b{}\b.{{0,{}}}?{}",
            escaped, PROXIMITY_WINDOW, KEYWORDS
        );
        patterns.push(Regex::new(&keyword_first).ok()?);
        patterns.push(Regex::new(&value_first).ok()?);
    }
    Some(patterns)
}
