// src/error.rs
//! Error types for the document verification core.
//!
//! Every failure in the crate is scoped to the current session or upload
//! attempt and recoverable by a fresh user action; nothing here is fatal to
//! the process. Matching-layer problems never surface as errors at all (a
//! field that cannot be matched degrades to `NotFound`), so this taxonomy
//! only covers the extraction, orchestration, persistence and mail layers.

use crate::models::field::FieldKind;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by the persistence collaborator.
///
/// The core surfaces these untouched and never retries (the store backend
/// owns its own retry policy, if any).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Failure reported by the mail collaborator.
///
/// Mail dispatch is fire-and-forget from the core's perspective: a send
/// failure surfaces as a session-level error but does not roll back an
/// already-persisted proof bundle.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct MailError(pub String);

/// Failure reported by the opaque PDF extraction capability.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct EngineError(pub String);

/// Top-level error taxonomy for the verification core.
///
/// # Variants
/// - `ExtractionFailed`: the extraction capability threw or reported
///   failure; blocks all further progress for the upload attempt
/// - `InvalidSignature`: extraction succeeded but the document signature
///   check came back false; same blocking effect, distinct user messaging
/// - `PreconditionFailed`: a state-machine transition was attempted out of
///   order or with unmet field statuses; names the first offending field
///   when one exists
/// - `ProofGenerationFailed` / `ProofVerificationFailed`: partial or total
///   failure contacting the external prover/verifier; never partially
///   applied
/// - `Timeout`: a bounded-time external call exceeded its budget, distinct
///   from a prover-reported rejection so callers can tell "try again later"
///   from "the claim is false"
/// - `Persistence` / `Mail`: collaborator failures, surfaced untouched
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Extraction capability threw or reported `success: false`.
    #[error("document extraction failed: {0}")]
    ExtractionFailed(String),

    /// Extraction succeeded but the embedded signature is not valid.
    #[error("document signature is invalid")]
    InvalidSignature,

    /// A session transition was attempted with its precondition unmet.
    #[error("precondition failed: {reason}")]
    PreconditionFailed {
        /// Human-readable description of the unmet precondition.
        reason: String,
        /// The first claimed field blocking the transition, when the
        /// precondition is a per-field status requirement.
        field: Option<FieldKind>,
    },

    /// One or more prover calls failed; no partial bundle was kept.
    #[error("proof generation failed: {0}")]
    ProofGenerationFailed(String),

    /// One or more verifier calls failed at the transport layer.
    #[error("proof verification failed: {0}")]
    ProofVerificationFailed(String),

    /// An external call exceeded its time budget.
    #[error("external call timed out after {0:?}")]
    Timeout(Duration),

    /// Load/save collaborator failure.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Mail collaborator failure.
    #[error("mail dispatch failed: {0}")]
    Mail(#[from] MailError),
}

impl VerifyError {
    /// Builds a `PreconditionFailed` that names the blocking field.
    pub fn unmet_field(kind: FieldKind, reason: impl Into<String>) -> Self {
        VerifyError::PreconditionFailed {
            reason: reason.into(),
            field: Some(kind),
        }
    }

    /// Builds a `PreconditionFailed` with no associated field.
    pub fn precondition(reason: impl Into<String>) -> Self {
        VerifyError::PreconditionFailed {
            reason: reason.into(),
            field: None,
        }
    }
}
