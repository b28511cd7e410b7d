// src/models/field.rs
//! Claimed field and verification status data model.
//!
//! A claimed field is one fact (name, ID, institute, GPA) asserted by the
//! requester that the subject's document must substantiate. The tri-state
//! verification status is the central domain concept: it distinguishes
//! "the document doesn't mention this" from "the document mentions this but
//! the claim is false".

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The kinds of facts a verification request can claim.
///
/// A closed enumeration carried end-to-end; status handling never threads
/// loosely-typed strings through the system.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKind {
    /// The subject's full name as printed on the document.
    Name,
    /// Academic enrollment/roll identifier.
    AcademicId,
    /// Issuing institute name.
    Institute,
    /// Cumulative grade point average.
    Cgpa,
    /// Indian Permanent Account Number.
    PanId,
}

impl FieldKind {
    /// User-facing label for this field kind.
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Name => "Name",
            FieldKind::AcademicId => "Academic ID",
            FieldKind::Institute => "Institute",
            FieldKind::Cgpa => "CGPA",
            FieldKind::PanId => "PAN ID",
        }
    }
}

/// One fact asserted by the requester about the subject's document.
///
/// Supplied at request-creation time and never mutated by the subject. The
/// value is kept verbatim: proof requests must carry the literal claimed
/// bytes, so canonicalization happens only inside the matcher.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClaimedField {
    /// What kind of fact this is.
    pub kind: FieldKind,
    /// The claimed value, verbatim as entered by the requester.
    pub value: String,
}

impl ClaimedField {
    /// Creates a claimed field.
    pub fn new(kind: FieldKind, value: impl Into<String>) -> Self {
        ClaimedField {
            kind,
            value: value.into(),
        }
    }
}

/// Outcome of matching one claimed field against the extracted pages.
///
/// - `Found`: exact normalized match
/// - `FoundButWrong`: the field's pattern/keyword was located but the exact
///   value does not match (wrong word count, wrong numeric value, ...)
/// - `NotFound`: no trace of the field located at all
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Found,
    FoundButWrong,
    NotFound,
}

impl VerificationStatus {
    /// User-facing label for this status.
    pub fn label(&self) -> &'static str {
        match self {
            VerificationStatus::Found => "Found",
            VerificationStatus::FoundButWrong => "Found (mismatch)",
            VerificationStatus::NotFound => "Not Found",
        }
    }

    /// Whether this status permits proof generation for its field.
    ///
    /// Only an exact `Found` qualifies; `FoundButWrong` blocks generation.
    pub fn is_found(&self) -> bool {
        matches!(self, VerificationStatus::Found)
    }
}

/// PAN layout: five letters, four digits, one letter.
static PAN_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("valid PAN pattern"));

/// Checks whether a value has the PAN identifier layout.
///
/// Format validity is independent of the tri-state match result: a
/// malformed PAN can still be `Found` in a document, and a well-formed one
/// can be absent.
pub fn is_valid_pan_format(value: &str) -> bool {
    PAN_FORMAT.is_match(value)
}
