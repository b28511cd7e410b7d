// src/document/mod.rs
//! Opaque extraction capability contract and its normalizing adapter.

pub mod adapter;
pub mod engine;

pub use adapter::SignatureAdapter;
pub use engine::{global_engine, install_engine, PdfEngine, RawExtraction, RawSignature};
