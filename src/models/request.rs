// src/models/request.rs
//! Verification request data model.
//!
//! A verification request is the persisted record tying a requester to a
//! subject and the set of facts the subject must substantiate. The core
//! treats it as load-once/save-once: loaded at session start, completed
//! exactly once with the subject's public key and proof bundle.

use crate::models::field::ClaimedField;
use crate::models::proof::ProofBundle;
use serde::{Deserialize, Serialize};

/// Persisted verification request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    /// Unique request identifier.
    pub id: String,
    /// Email of the party asking for proof.
    pub requester_email: String,
    /// Email of the party who must substantiate the claims.
    pub subject_email: String,
    /// The facts to substantiate; immutable once the request is created.
    pub fields: Vec<ClaimedField>,
    /// Terminal flag: once true, no further uploads or proof generation
    /// are permitted for this request.
    pub is_verified: bool,
    /// PEM-armored public key of the document signer, set at completion.
    pub public_key_pem: Option<String>,
    /// The proof bundle delivered to the requester, set at completion.
    pub proof_bundle: Option<ProofBundle>,
}

impl VerificationRequest {
    /// Creates a fresh, unverified request.
    pub fn new(
        id: impl Into<String>,
        requester_email: impl Into<String>,
        subject_email: impl Into<String>,
        fields: Vec<ClaimedField>,
    ) -> Self {
        VerificationRequest {
            id: id.into(),
            requester_email: requester_email.into(),
            subject_email: subject_email.into(),
            fields,
            is_verified: false,
            public_key_pem: None,
            proof_bundle: None,
        }
    }
}

/// The triple written exactly once when a session completes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompletionRecord {
    /// PEM-armored public key of the document signer, when one was
    /// recovered from the signature.
    pub public_key_pem: Option<String>,
    /// The generated proof bundle.
    pub proof_bundle: ProofBundle,
}
