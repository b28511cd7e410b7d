// src/matching/mod.rs
//! Field matching: decides, for one claimed field against the full set of
//! extracted pages, one of `Found`, `FoundButWrong`, `NotFound`.
//!
//! "Wrongness" means different things per field kind, so each kind gets its
//! own algorithm: names match as word runs (`name`), grades as labeled
//! numbers within tolerance (`numeric`), and identifiers/institutes as
//! plain normalized substrings, which either literally appear or don't and
//! therefore never produce `FoundButWrong`.
//!
//! Matching never fails: malformed claims or page text degrade to
//! `NotFound`.

pub mod name;
pub mod normalize;
pub mod numeric;

use crate::models::field::{ClaimedField, FieldKind, VerificationStatus};
use normalize::normalize;

/// Matches one claimed field against the extracted pages.
pub fn verify_field(field: &ClaimedField, pages: &[String]) -> VerificationStatus {
    match field.kind {
        FieldKind::Name => name::match_name(pages, &field.value),
        FieldKind::Cgpa => numeric::match_cgpa(pages, &field.value),
        FieldKind::AcademicId | FieldKind::PanId | FieldKind::Institute => {
            match_substring(pages, &field.value)
        }
    }
}

/// Normalized substring containment over any page.
///
/// Used for identifiers and institute names; yields only `Found` or
/// `NotFound`.
fn match_substring(pages: &[String], claim: &str) -> VerificationStatus {
    let normalized_claim = normalize(claim);
    if normalized_claim.is_empty() {
        return VerificationStatus::NotFound;
    }
    let present = pages
        .iter()
        .any(|page| normalize(page).contains(&normalized_claim));
    if present {
        VerificationStatus::Found
    } else {
        VerificationStatus::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::ClaimedField;

    fn pages(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_pan_id_case_insensitive_substring() {
        let pages = pages(&["Permanent Account Number. pan: abcde1234f"]);
        let field = ClaimedField::new(FieldKind::PanId, "ABCDE1234F");
        assert_eq!(verify_field(&field, &pages), VerificationStatus::Found);
    }

    #[test]
    fn test_pan_id_absent() {
        let pages = pages(&["No identifiers on this page."]);
        let field = ClaimedField::new(FieldKind::PanId, "ABCDE1234F");
        assert_eq!(verify_field(&field, &pages), VerificationStatus::NotFound);
    }

    #[test]
    fn test_identifiers_never_found_but_wrong() {
        // A near-miss identifier is plain NotFound; there is no notion of
        // a "wrong" identifier match.
        let pages = pages(&["pan: abcde1234x"]);
        let field = ClaimedField::new(FieldKind::PanId, "ABCDE1234F");
        assert_eq!(verify_field(&field, &pages), VerificationStatus::NotFound);
    }

    #[test]
    fn test_academic_id_found_across_pages() {
        let pages = pages(&["Cover page", "Roll No: 2019-CS-1042"]);
        let field = ClaimedField::new(FieldKind::AcademicId, "2019CS1042");
        assert_eq!(verify_field(&field, &pages), VerificationStatus::Found);
    }

    #[test]
    fn test_institute_substring() {
        let pages = pages(&["Issued by the Indian Institute of Technology, Delhi"]);
        let field = ClaimedField::new(FieldKind::Institute, "Indian Institute of Technology");
        assert_eq!(verify_field(&field, &pages), VerificationStatus::Found);

        let other = ClaimedField::new(FieldKind::Institute, "Example University");
        assert_eq!(verify_field(&other, &pages), VerificationStatus::NotFound);
    }

    #[test]
    fn test_empty_claim_always_not_found() {
        let pages = pages(&["Some content"]);
        for kind in [
            FieldKind::Name,
            FieldKind::AcademicId,
            FieldKind::Institute,
            FieldKind::Cgpa,
            FieldKind::PanId,
        ] {
            let field = ClaimedField::new(kind, "");
            assert_eq!(
                verify_field(&field, &pages),
                VerificationStatus::NotFound,
                "empty {:?} claim must be NotFound",
                kind
            );
        }
    }

    #[test]
    fn test_dispatch_uses_name_matcher() {
        let pages = pages(&["Certificate of Jane Middle Doe"]);
        let field = ClaimedField::new(FieldKind::Name, "Jane Doe");
        assert_eq!(verify_field(&field, &pages), VerificationStatus::FoundButWrong);
    }

    #[test]
    fn test_dispatch_uses_cgpa_matcher() {
        let pages = pages(&["CGPA: 8.1"]);
        let field = ClaimedField::new(FieldKind::Cgpa, "9.4");
        assert_eq!(verify_field(&field, &pages), VerificationStatus::FoundButWrong);
    }
}
