// src/lib.rs
//! # Document Field Verification & Proof Orchestration
//!
//! Core library for proving facts about an identity document (name,
//! academic record, PAN identifier) without disclosing the full document.
//! A government-signed PDF is validated and text-extracted by an opaque
//! engine; claimed fields are matched against the extracted text with a
//! tri-state outcome; zero-knowledge proofs that the claimed substrings
//! exist in the signed document are requested from an external prover and
//! mailed to the requester.
//!
//! ## Architecture Overview
//! 1. **Matching Layer**: text normalization and per-field-kind matching
//!    (`matching`)
//! 2. **Document Layer**: the opaque signature/extraction capability and
//!    its normalizing adapter (`document`)
//! 3. **Session Layer**: the per-subject state machine gating proof
//!    generation and mail dispatch (`session`)
//! 4. **Proof Layer**: concurrent prover/verifier HTTP orchestration
//!    (`proof`)
//! 5. **Collaborator Contracts**: persistence and mail (`storage`, `mail`)
//!
//! ## Environment Variables
//! - `PROVER_URL`: (Optional) base URL of the proving service
//!   (default: http://localhost:3001)

// Module declarations (organized by functional domain)
pub mod document; // opaque extraction capability + adapter
pub mod error; // typed failure taxonomy
pub mod mail; // mail collaborator contract
pub mod matching; // field matching algorithms
pub mod models; // data structures
pub mod proof; // external prover orchestration
pub mod session; // per-subject state machine
pub mod storage; // persistence collaborator contract
pub mod utils; // helper functions

pub use document::{install_engine, PdfEngine, SignatureAdapter};
pub use error::VerifyError;
pub use matching::verify_field;
pub use models::{
    ClaimedField, ExtractedDocument, FieldKind, ProofArtifact, ProofBundle, SignatureInfo,
    VerificationRequest, VerificationStatus,
};
pub use proof::ProofOrchestrator;
pub use session::{create_verification_request, SessionState, VerificationSession};
pub use storage::{InMemoryRequestStore, RequestStore};
