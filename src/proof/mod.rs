// src/proof/mod.rs
//! External prover/verifier orchestration.

pub mod orchestrator;

pub use orchestrator::{ProofOrchestrator, DEFAULT_PROVER_URL};
