// src/models/proof.rs
//! Proof artifact and bundle data model.

use crate::models::field::FieldKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One zero-knowledge proof that a specific substring exists at a specific
/// location in the signed document.
///
/// The payload is whatever JSON the external prover returned; the core
/// never inspects it beyond carrying it to the verifier.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProofArtifact {
    /// The claimed field this artifact substantiates.
    pub field: FieldKind,
    /// Opaque prover output.
    pub payload: serde_json::Value,
}

/// The complete set of proof artifacts for one verification attempt.
///
/// Bundles are immutable once generated; a new upload attempt replaces the
/// bundle entirely. Artifacts are keyed by field kind, so presentation
/// order is stable regardless of the order the prover calls completed in.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProofBundle {
    /// One artifact per claimed field.
    pub artifacts: BTreeMap<FieldKind, ProofArtifact>,
    /// When the bundle was assembled.
    pub generated_at: DateTime<Utc>,
}

impl ProofBundle {
    /// Assembles a bundle from per-field artifacts, stamped now.
    pub fn new(artifacts: BTreeMap<FieldKind, ProofArtifact>) -> Self {
        ProofBundle {
            artifacts,
            generated_at: Utc::now(),
        }
    }

    /// The artifact for a field kind, when present.
    pub fn artifact(&self, kind: FieldKind) -> Option<&ProofArtifact> {
        self.artifacts.get(&kind)
    }

    /// Number of artifacts in the bundle.
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether the bundle carries no artifacts.
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
