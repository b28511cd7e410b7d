// src/proof/orchestrator.rs
//! Proof orchestration against the external prover/verifier service.
//!
//! One proof request is issued per claimed field, concurrently; the
//! fan-out exists purely to cut wall-clock latency, and the branches share
//! no mutable state. Generation is all-or-nothing: a single failed prover
//! call discards every partial result, so a retry always starts from zero
//! artifacts. No retries are built in here; failures surface to the
//! session and require a fresh user action.

use crate::error::VerifyError;
use crate::models::field::ClaimedField;
use crate::models::proof::{ProofArtifact, ProofBundle};
use futures::future;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default prover service base URL.
pub const DEFAULT_PROVER_URL: &str = "http://localhost:3001";

/// Proof computation is expensive; generation requests get five minutes.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Verification requests use an ordinary request timeout.
const VERIFICATION_TIMEOUT: Duration = Duration::from_secs(30);

/// The prover locates the literal substring itself; page and offset are
/// fixed rather than derived from the match position.
const PROOF_PAGE_NUMBER: u8 = 1;
const PROOF_OFFSET: u32 = 0;

/// Body of `POST /prove`.
#[derive(Serialize)]
struct ProveRequest<'a> {
    pdf_bytes: &'a [u8],
    page_number: u8,
    offset: u32,
    sub_string: &'a str,
}

/// Body of a `POST /verify` response; the service reports either key.
#[derive(Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    valid: Option<bool>,
}

/// Client for the external proving/verification service.
#[derive(Clone)]
pub struct ProofOrchestrator {
    client: reqwest::Client,
    prove_url: String,
    verify_url: String,
    generation_timeout: Duration,
}

impl ProofOrchestrator {
    /// Creates an orchestrator against a prover service base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        let base = base.trim_end_matches('/');
        ProofOrchestrator {
            client: reqwest::Client::new(),
            prove_url: format!("{}/prove", base),
            verify_url: format!("{}/verify", base),
            generation_timeout: GENERATION_TIMEOUT,
        }
    }

    /// Creates an orchestrator from the `PROVER_URL` environment variable,
    /// falling back to [`DEFAULT_PROVER_URL`].
    pub fn from_env() -> Self {
        let base = std::env::var("PROVER_URL").unwrap_or_else(|_| DEFAULT_PROVER_URL.to_string());
        ProofOrchestrator::new(base)
    }

    /// Overrides the generation timeout (used by tests).
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Generates one proof per claimed field, concurrently.
    ///
    /// # Errors
    /// - `ProofGenerationFailed` if any prover call fails or returns
    ///   non-2xx; partial results are discarded and never stored
    /// - `Timeout` if a prover call exceeds the generation budget
    pub async fn generate(
        &self,
        fields: &[ClaimedField],
        document_bytes: &[u8],
    ) -> Result<ProofBundle, VerifyError> {
        log::info!("requesting {} proofs from {}", fields.len(), self.prove_url);

        let requests = fields
            .iter()
            .map(|field| self.prove_one(field, document_bytes));
        let results = future::join_all(requests).await;

        let mut artifacts = BTreeMap::new();
        for result in results {
            let artifact = result?;
            artifacts.insert(artifact.field, artifact);
        }

        log::info!("assembled proof bundle with {} artifacts", artifacts.len());
        Ok(ProofBundle::new(artifacts))
    }

    /// Verifies every artifact present in a bundle, concurrently.
    ///
    /// Absent artifacts are vacuously valid; the overall result is the
    /// logical AND of the per-artifact verdicts.
    ///
    /// # Errors
    /// - `ProofVerificationFailed` on transport or decoding failure, so
    ///   callers can tell "try again later" from "the claim is false"
    /// - `Timeout` if a verifier call exceeds the request timeout
    pub async fn verify_bundle(&self, bundle: &ProofBundle) -> Result<bool, VerifyError> {
        let checks = bundle
            .artifacts
            .values()
            .map(|artifact| self.verify_one(artifact));
        let results = future::join_all(checks).await;

        let mut all_valid = true;
        for result in results {
            all_valid &= result?;
        }
        Ok(all_valid)
    }

    async fn prove_one(
        &self,
        field: &ClaimedField,
        document_bytes: &[u8],
    ) -> Result<ProofArtifact, VerifyError> {
        // The prover must locate the literal bytes in the document, so the
        // claimed value goes over the wire verbatim, not normalized.
        let body = ProveRequest {
            pdf_bytes: document_bytes,
            page_number: PROOF_PAGE_NUMBER,
            offset: PROOF_OFFSET,
            sub_string: &field.value,
        };

        let response = self
            .client
            .post(&self.prove_url)
            .timeout(self.generation_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VerifyError::Timeout(self.generation_timeout)
                } else {
                    VerifyError::ProofGenerationFailed(format!(
                        "{} proof request failed: {}",
                        field.kind.label(),
                        e
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let diagnostic = response.text().await.unwrap_or_default();
            return Err(VerifyError::ProofGenerationFailed(format!(
                "prover returned {} for {}: {}",
                status,
                field.kind.label(),
                diagnostic
            )));
        }

        let payload = response.json::<serde_json::Value>().await.map_err(|e| {
            VerifyError::ProofGenerationFailed(format!(
                "could not decode {} proof: {}",
                field.kind.label(),
                e
            ))
        })?;

        Ok(ProofArtifact {
            field: field.kind,
            payload,
        })
    }

    async fn verify_one(&self, artifact: &ProofArtifact) -> Result<bool, VerifyError> {
        let response = self
            .client
            .post(&self.verify_url)
            .timeout(VERIFICATION_TIMEOUT)
            .json(&artifact.payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VerifyError::Timeout(VERIFICATION_TIMEOUT)
                } else {
                    VerifyError::ProofVerificationFailed(format!(
                        "{} verification request failed: {}",
                        artifact.field.label(),
                        e
                    ))
                }
            })?;

        // A non-2xx answer is the service rejecting the proof, not a
        // transport problem.
        if !response.status().is_success() {
            log::warn!(
                "verifier rejected {} proof with status {}",
                artifact.field.label(),
                response.status()
            );
            return Ok(false);
        }

        let verdict: VerifyResponse = response.json().await.map_err(|e| {
            VerifyError::ProofVerificationFailed(format!(
                "could not decode {} verdict: {}",
                artifact.field.label(),
                e
            ))
        })?;

        Ok(verdict.success.or(verdict.valid).unwrap_or(false))
    }
}
