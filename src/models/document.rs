// src/models/document.rs
//! Extracted document data model.

use serde::{Deserialize, Serialize};

/// Signature outcome reported by the extraction capability.
///
/// `is_valid == false` is a terminal condition for the upload attempt: no
/// field checks and no proof generation are permitted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    /// Whether the embedded digital signature verified.
    pub is_valid: bool,
    /// DER-encoded SubjectPublicKeyInfo of the signer, when available.
    pub public_key_der: Option<Vec<u8>>,
}

/// Text and signature data extracted from one uploaded document.
///
/// Produced once per uploaded file and discarded wholesale when the subject
/// uploads a new file; extractions are never merged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Page texts in original page order, one entry per PDF page.
    pub pages: Vec<String>,
    /// Signature validity and signer key material.
    pub signature: SignatureInfo,
}

impl ExtractedDocument {
    /// Number of extracted pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
