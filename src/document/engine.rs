// src/document/engine.rs
//! Contract for the opaque PDF signature-verification and text-extraction
//! capability.
//!
//! The engine does the hardest cryptographic/parsing work and is consumed,
//! never reimplemented: the core only depends on this trait and on the raw
//! wire shape its implementations report. Implementations may be slow.

use crate::error::EngineError;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Raw signature block as reported by the capability.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RawSignature {
    /// Signature validity according to the capability.
    pub is_valid: bool,
    /// Base64-encoded DER SubjectPublicKeyInfo of the signer.
    #[serde(default)]
    pub public_key: Option<String>,
}

/// Raw extraction result as reported by the capability.
///
/// The validity flag may arrive nested in `signature` or as the top-level
/// `is_valid`; reconciling the two is the adapter's job, not the engine's.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RawExtraction {
    /// Whether the capability processed the document at all.
    pub success: bool,
    /// Extracted page texts, page-ordered.
    #[serde(default)]
    pub pages: Option<Vec<String>>,
    /// Nested signature block, when the capability produced one.
    #[serde(default)]
    pub signature: Option<RawSignature>,
    /// Top-level validity flag, used by older capability builds.
    #[serde(default)]
    pub is_valid: Option<bool>,
    /// Capability-reported failure detail.
    #[serde(default)]
    pub error: Option<String>,
}

/// The opaque extraction capability.
///
/// Input is the raw document bytes; output is the raw wire shape above or
/// an engine-level failure. Both are treated identically to an invalid
/// signature for downstream gating; no partial trust is extended.
pub trait PdfEngine: Send + Sync {
    /// Validates the embedded signature and extracts page text.
    fn verify_and_extract(&self, pdf_bytes: &[u8]) -> Result<RawExtraction, EngineError>;
}

/// Process-wide engine handle, installed once.
static GLOBAL_ENGINE: OnceCell<Arc<dyn PdfEngine>> = OnceCell::new();

/// Installs the process-wide engine handle.
///
/// Idempotent: the first install wins and later calls return `false`
/// without replacing the handle. Thread-safe; replaces the mutable
/// "initialized" flag pattern with a lazily-initialized singleton.
pub fn install_engine(engine: Arc<dyn PdfEngine>) -> bool {
    GLOBAL_ENGINE.set(engine).is_ok()
}

/// The installed process-wide engine handle, if any.
pub fn global_engine() -> Option<Arc<dyn PdfEngine>> {
    GLOBAL_ENGINE.get().cloned()
}
