// src/storage/request_store.rs
//! Persistence contract for verification requests, plus an in-memory
//! implementation.
//!
//! The core is load-once/save-once with respect to a request: a session
//! loads its request at start and writes the completion triple (public
//! key, proof bundle, verified flag) exactly once. The store backend is a
//! collaborator; its failures surface untouched and are never retried by
//! the core.

use crate::error::StoreError;
use crate::models::request::{CompletionRecord, VerificationRequest};
use std::collections::HashMap;
use std::sync::RwLock;

/// Persistence collaborator for verification requests.
pub trait RequestStore: Send + Sync {
    /// Creates a new request record.
    ///
    /// # Errors
    /// `StoreError` if a record with the same id already exists or the
    /// backend fails.
    fn create(&self, request: VerificationRequest) -> Result<(), StoreError>;

    /// Loads a request by id; `Ok(None)` when no such request exists.
    fn load(&self, id: &str) -> Result<Option<VerificationRequest>, StoreError>;

    /// Writes the completion triple and flips the request to verified.
    ///
    /// # Errors
    /// `StoreError` if the request does not exist, was already completed,
    /// or the backend fails. The already-completed guard is what makes the
    /// save exactly-once.
    fn save_completion(&self, id: &str, completion: CompletionRecord) -> Result<(), StoreError>;
}

/// In-memory request store.
///
/// Thread-safe via an internal `RwLock`; suitable for tests and
/// single-process deployments. O(1) average lookup by request id.
pub struct InMemoryRequestStore {
    /// Requests keyed by their id.
    requests: RwLock<HashMap<String, VerificationRequest>>,
}

impl InMemoryRequestStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        InMemoryRequestStore {
            requests: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored requests.
    pub fn len(&self) -> usize {
        self.requests.read().map(|map| map.len()).unwrap_or(0)
    }

    /// Whether the store holds no requests.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryRequestStore {
    fn default() -> Self {
        InMemoryRequestStore::new()
    }
}

impl RequestStore for InMemoryRequestStore {
    fn create(&self, request: VerificationRequest) -> Result<(), StoreError> {
        let mut map = self
            .requests
            .write()
            .map_err(|_| StoreError("request store lock poisoned".to_string()))?;
        if map.contains_key(&request.id) {
            return Err(StoreError(format!(
                "verification request {} already exists",
                request.id
            )));
        }
        map.insert(request.id.clone(), request);
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<VerificationRequest>, StoreError> {
        let map = self
            .requests
            .read()
            .map_err(|_| StoreError("request store lock poisoned".to_string()))?;
        Ok(map.get(id).cloned())
    }

    fn save_completion(&self, id: &str, completion: CompletionRecord) -> Result<(), StoreError> {
        let mut map = self
            .requests
            .write()
            .map_err(|_| StoreError("request store lock poisoned".to_string()))?;
        let request = map
            .get_mut(id)
            .ok_or_else(|| StoreError(format!("verification request {} not found", id)))?;
        if request.is_verified {
            return Err(StoreError(format!(
                "verification request {} is already completed",
                id
            )));
        }
        request.public_key_pem = completion.public_key_pem;
        request.proof_bundle = Some(completion.proof_bundle);
        request.is_verified = true;
        Ok(())
    }
}
