// src/document/adapter.rs
//! Adapter normalizing the raw extraction capability output into a typed
//! outcome.
//!
//! A capability failure (the engine errored, or it reported
//! `success: false`) is treated identically to an invalid signature for
//! downstream gating; the distinction survives only in error messaging.

use crate::document::engine::{global_engine, PdfEngine, RawExtraction};
use crate::error::VerifyError;
use crate::models::document::{ExtractedDocument, SignatureInfo};
use std::sync::Arc;

/// Thin wrapper over the opaque capability.
#[derive(Clone)]
pub struct SignatureAdapter {
    engine: Arc<dyn PdfEngine>,
}

impl SignatureAdapter {
    /// Wraps an engine handle.
    pub fn new(engine: Arc<dyn PdfEngine>) -> Self {
        SignatureAdapter { engine }
    }

    /// Wraps the process-wide installed engine, when one exists.
    pub fn from_global() -> Option<Self> {
        global_engine().map(SignatureAdapter::new)
    }

    /// Runs extraction and normalizes the result.
    ///
    /// # Errors
    /// `VerifyError::ExtractionFailed` when the engine errors or reports
    /// `success: false`. An invalid signature is NOT an error here: it
    /// comes back as `Ok` with `signature.is_valid == false` so the caller
    /// can message it distinctly.
    pub fn extract(&self, pdf_bytes: &[u8]) -> Result<ExtractedDocument, VerifyError> {
        let raw = self
            .engine
            .verify_and_extract(pdf_bytes)
            .map_err(|e| VerifyError::ExtractionFailed(e.to_string()))?;

        if !raw.success {
            let reason = raw
                .error
                .unwrap_or_else(|| "capability reported failure".to_string());
            return Err(VerifyError::ExtractionFailed(reason));
        }

        Ok(normalize_raw(raw))
    }
}

/// Reconciles the raw wire shape into the typed document.
///
/// The nested signature flag, when present, takes precedence over the
/// top-level one; with neither present the signature counts as invalid.
fn normalize_raw(raw: RawExtraction) -> ExtractedDocument {
    let pages = raw.pages.unwrap_or_default();

    let (is_valid, public_key_b64) = match raw.signature {
        Some(sig) => (sig.is_valid, sig.public_key),
        None => (raw.is_valid.unwrap_or(false), None),
    };

    let public_key_der = public_key_b64.and_then(|b64| match base64::decode(&b64) {
        Ok(der) => Some(der),
        Err(e) => {
            log::warn!("could not decode signer public key: {}", e);
            None
        }
    });

    ExtractedDocument {
        pages,
        signature: SignatureInfo {
            is_valid,
            public_key_der,
        },
    }
}
