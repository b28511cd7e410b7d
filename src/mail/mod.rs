// src/mail/mod.rs
//! Mail collaborator contract.
//!
//! Mail is fire-and-forget from the core's perspective: the session hands a
//! fully-assembled message to the collaborator and only learns success or
//! failure. A failed send surfaces as a session error but never rolls back
//! an already-persisted completion.

use crate::error::MailError;
use crate::models::field::ClaimedField;
use std::sync::Mutex;

/// Which template a message renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTemplate {
    /// Sent to the subject when a request is created, linking to the
    /// verification flow.
    VerificationInvite,
    /// Sent to the requester at completion, carrying the public key and
    /// proof bundle.
    ProofDelivery,
}

/// One outbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    /// Recipient address.
    pub to: String,
    /// Template to render.
    pub template: MailTemplate,
    /// The verification request this message belongs to.
    pub request_id: String,
    /// The claimed fields, echoed in both templates.
    pub fields: Vec<ClaimedField>,
    /// PEM public key; only set for proof delivery.
    pub public_key_pem: Option<String>,
    /// Serialized proof bundle; only set for proof delivery.
    pub proof_bundle_json: Option<String>,
}

/// Mail collaborator.
pub trait Mailer: Send + Sync {
    /// Dispatches one message.
    fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Mailer that records messages instead of sending them.
///
/// Used by tests and by deployments that wire delivery elsewhere.
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        RecordingMailer {
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every message recorded so far.
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Default for RecordingMailer {
    fn default() -> Self {
        RecordingMailer::new()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        log::info!(
            "recording {:?} mail to {} for request {}",
            message.template,
            message.to,
            message.request_id
        );
        self.sent
            .lock()
            .map_err(|_| MailError("mail recorder lock poisoned".to_string()))?
            .push(message.clone());
        Ok(())
    }
}

/// Mailer that always fails; used to exercise failure paths.
pub struct FailingMailer;

impl Mailer for FailingMailer {
    fn send(&self, _message: &MailMessage) -> Result<(), MailError> {
        Err(MailError("mail relay unavailable".to_string()))
    }
}
