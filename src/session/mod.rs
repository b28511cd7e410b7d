// src/session/mod.rs
//! Per-subject verification session state machine.
//!
//! A session holds the in-memory state for one subject working through one
//! verification request: upload → signature check → field check → proof
//! generation → proof dispatch. Sessions are single-subject and
//! single-tab scoped; each request has exactly one subject, so no
//! cross-session coordination exists. All transitions are synchronous
//! within one session, and every failure is recoverable by a fresh user
//! action.

use crate::document::SignatureAdapter;
use crate::error::{StoreError, VerifyError};
use crate::mail::{MailMessage, MailTemplate, Mailer};
use crate::matching::verify_field;
use crate::models::field::{is_valid_pan_format, FieldKind, VerificationStatus};
use crate::models::proof::ProofBundle;
use crate::models::request::{CompletionRecord, VerificationRequest};
use crate::proof::ProofOrchestrator;
use crate::storage::RequestStore;
use crate::utils::public_key_to_pem;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where a session stands.
///
/// `Processing` is held only while an upload attempt is being worked on
/// and is never observable between calls. `AlreadyVerified` is terminal:
/// it is entered instead of `AwaitingUpload` when the loaded request
/// already carries the verified flag, and again after a completed mail
/// dispatch is re-fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No document under consideration. The flag records whether the last
    /// attempt ended in an extraction/signature failure, for presentation.
    AwaitingUpload { invalid_signature: bool },
    /// An upload attempt is being extracted and matched.
    Processing,
    /// Extraction succeeded with a valid signature; per-field statuses are
    /// available.
    Checked {
        statuses: BTreeMap<FieldKind, VerificationStatus>,
    },
    /// A proof bundle exists for the current attempt but has not been
    /// dispatched.
    ProofGenerated {
        statuses: BTreeMap<FieldKind, VerificationStatus>,
        bundle: ProofBundle,
    },
    /// The completion was persisted and the confirmation mail went out.
    MailSent,
    /// The request was already completed; no uploads are accepted.
    AlreadyVerified,
}

/// Presentation row for one claimed field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReport {
    /// Field kind.
    pub kind: FieldKind,
    /// User-facing field label.
    pub label: &'static str,
    /// The claimed value, verbatim.
    pub claimed_value: String,
    /// Match status for the current attempt, if one was checked.
    pub status: Option<VerificationStatus>,
    /// User-facing status label ("Pending" before any check).
    pub status_label: &'static str,
    /// For PAN claims, whether the value has the PAN layout; format
    /// validity never influences the match status.
    pub pan_format_valid: Option<bool>,
}

/// The in-memory state machine for one subject's verification attempt.
pub struct VerificationSession {
    request: VerificationRequest,
    state: SessionState,
    adapter: SignatureAdapter,
    orchestrator: ProofOrchestrator,
    store: Arc<dyn RequestStore>,
    mailer: Arc<dyn Mailer>,
    /// Raw bytes of the current upload attempt; the prover needs them.
    document_bytes: Option<Vec<u8>>,
    /// Signer public key recovered from the current attempt.
    public_key_pem: Option<String>,
    /// Signature verdict of the current attempt.
    signature_valid: Option<bool>,
    /// Page texts of the current attempt, for presentation.
    pages: Vec<String>,
    /// Set once the completion triple has been written; guards the
    /// exactly-once save even if mail dispatch needs a retry.
    completion_persisted: bool,
}

impl VerificationSession {
    /// Loads the persisted request and opens a session on it.
    ///
    /// # Errors
    /// `VerifyError::Persistence` if the store fails or the request does
    /// not exist.
    pub fn load(
        request_id: &str,
        adapter: SignatureAdapter,
        orchestrator: ProofOrchestrator,
        store: Arc<dyn RequestStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, VerifyError> {
        let request = store.load(request_id)?.ok_or_else(|| {
            VerifyError::Persistence(StoreError(format!(
                "verification request {} not found",
                request_id
            )))
        })?;
        Ok(Self::from_request(
            request,
            adapter,
            orchestrator,
            store,
            mailer,
        ))
    }

    fn from_request(
        request: VerificationRequest,
        adapter: SignatureAdapter,
        orchestrator: ProofOrchestrator,
        store: Arc<dyn RequestStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let state = if request.is_verified {
            SessionState::AlreadyVerified
        } else {
            SessionState::AwaitingUpload {
                invalid_signature: false,
            }
        };
        VerificationSession {
            request,
            state,
            adapter,
            orchestrator,
            store,
            mailer,
            document_bytes: None,
            public_key_pem: None,
            signature_valid: None,
            pages: Vec::new(),
            completion_persisted: false,
        }
    }

    /// The loaded request.
    pub fn request(&self) -> &VerificationRequest {
        &self.request
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Per-field statuses of the current attempt, once checked.
    pub fn statuses(&self) -> Option<&BTreeMap<FieldKind, VerificationStatus>> {
        match &self.state {
            SessionState::Checked { statuses }
            | SessionState::ProofGenerated { statuses, .. } => Some(statuses),
            _ => None,
        }
    }

    /// Signature verdict of the current attempt.
    pub fn signature_valid(&self) -> Option<bool> {
        self.signature_valid
    }

    /// Signer public key of the current attempt, PEM-armored.
    pub fn public_key_pem(&self) -> Option<&str> {
        self.public_key_pem.as_deref()
    }

    /// Extracted page texts of the current attempt.
    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    /// Whether the last attempt ended in an extraction/signature failure.
    pub fn invalid_signature(&self) -> bool {
        matches!(
            self.state,
            SessionState::AwaitingUpload {
                invalid_signature: true
            }
        )
    }

    /// Processes an uploaded document: full per-attempt reset, extraction,
    /// signature gating, then one match per claimed field.
    ///
    /// # Errors
    /// - `PreconditionFailed` when the request is already verified
    /// - `ExtractionFailed` when the capability errors or reports failure
    /// - `InvalidSignature` when extraction succeeds but the signature
    ///   check is false
    ///
    /// Both failure shapes land the session back in `AwaitingUpload` with
    /// the invalid-signature flag raised; the subject must re-upload.
    pub fn upload(&mut self, pdf_bytes: &[u8]) -> Result<(), VerifyError> {
        if self.request.is_verified
            || self.completion_persisted
            || matches!(
                self.state,
                SessionState::AlreadyVerified | SessionState::MailSent
            )
        {
            return Err(VerifyError::precondition(
                "request is already verified; uploads are closed",
            ));
        }

        // A session holds state for at most one upload attempt at a time:
        // statuses, bundle and key material of any prior attempt go away.
        self.reset_attempt();
        self.state = SessionState::Processing;

        let document = match self.adapter.extract(pdf_bytes) {
            Ok(document) => document,
            Err(e) => {
                log::warn!("upload rejected for {}: {}", self.request.id, e);
                self.state = SessionState::AwaitingUpload {
                    invalid_signature: true,
                };
                return Err(e);
            }
        };

        self.signature_valid = Some(document.signature.is_valid);
        if !document.signature.is_valid {
            log::warn!("invalid document signature for {}", self.request.id);
            self.state = SessionState::AwaitingUpload {
                invalid_signature: true,
            };
            return Err(VerifyError::InvalidSignature);
        }

        self.public_key_pem = document
            .signature
            .public_key_der
            .as_deref()
            .map(public_key_to_pem);
        self.document_bytes = Some(pdf_bytes.to_vec());

        let statuses: BTreeMap<FieldKind, VerificationStatus> = self
            .request
            .fields
            .iter()
            .map(|field| (field.kind, verify_field(field, &document.pages)))
            .collect();
        self.pages = document.pages;

        let found = statuses.values().filter(|s| s.is_found()).count();
        log::info!(
            "checked {}: {}/{} fields found",
            self.request.id,
            found,
            statuses.len()
        );

        self.state = SessionState::Checked { statuses };
        Ok(())
    }

    /// Generates the proof bundle for the current attempt.
    ///
    /// Permitted only when every claimed field's status is exactly
    /// `Found`; `FoundButWrong` blocks generation just like `NotFound`.
    ///
    /// # Errors
    /// - `PreconditionFailed` naming the first unmet field (in claimed
    ///   order), or describing the out-of-order transition
    /// - any `ProofOrchestrator::generate` failure, with the session left
    ///   in `Checked` so the subject can retry
    pub async fn generate_proofs(&mut self) -> Result<(), VerifyError> {
        if self.request.is_verified || matches!(self.state, SessionState::AlreadyVerified) {
            return Err(VerifyError::precondition(
                "request is already verified; proof generation is closed",
            ));
        }

        let statuses = match &self.state {
            SessionState::Checked { statuses } => statuses.clone(),
            SessionState::ProofGenerated { .. } => {
                return Err(VerifyError::precondition(
                    "a proof bundle was already generated for this attempt",
                ))
            }
            _ => {
                return Err(VerifyError::precondition(
                    "no checked document; upload a document first",
                ))
            }
        };

        for field in &self.request.fields {
            let status = statuses
                .get(&field.kind)
                .copied()
                .unwrap_or(VerificationStatus::NotFound);
            if !status.is_found() {
                return Err(VerifyError::unmet_field(
                    field.kind,
                    format!(
                        "{} must be found exactly in the document (status: {})",
                        field.kind.label(),
                        status.label()
                    ),
                ));
            }
        }

        let document_bytes = self.document_bytes.clone().ok_or_else(|| {
            VerifyError::precondition("no document bytes retained for this attempt")
        })?;

        let bundle = self
            .orchestrator
            .generate(&self.request.fields, &document_bytes)
            .await?;

        self.state = SessionState::ProofGenerated { statuses, bundle };
        Ok(())
    }

    /// Persists the completion triple and dispatches the confirmation
    /// mail to the requester.
    ///
    /// The save happens exactly once per completed session; a mail failure
    /// surfaces as an error but never rolls the persisted completion back,
    /// and a retry skips straight to the mail dispatch.
    ///
    /// # Errors
    /// - `PreconditionFailed` when no bundle exists or the request is
    ///   already completed
    /// - `Persistence` / `Mail` collaborator failures
    pub fn send_mail(&mut self) -> Result<(), VerifyError> {
        let bundle = match &self.state {
            SessionState::ProofGenerated { bundle, .. } => bundle.clone(),
            SessionState::MailSent | SessionState::AlreadyVerified => {
                return Err(VerifyError::precondition(
                    "the confirmation mail was already sent for this request",
                ))
            }
            _ => {
                return Err(VerifyError::precondition(
                    "no proof bundle exists; generate proofs first",
                ))
            }
        };

        if !self.completion_persisted {
            self.store.save_completion(
                &self.request.id,
                CompletionRecord {
                    public_key_pem: self.public_key_pem.clone(),
                    proof_bundle: bundle.clone(),
                },
            )?;
            self.completion_persisted = true;
        }

        let bundle_json = serde_json::to_string(&bundle)
            .map_err(|e| crate::error::MailError(format!("bundle serialization: {}", e)))?;
        let message = MailMessage {
            to: self.request.requester_email.clone(),
            template: MailTemplate::ProofDelivery,
            request_id: self.request.id.clone(),
            fields: self.request.fields.clone(),
            public_key_pem: self.public_key_pem.clone(),
            proof_bundle_json: Some(bundle_json),
        };
        self.mailer.send(&message)?;

        log::info!(
            "proof mail for {} sent to {}",
            self.request.id,
            self.request.requester_email
        );

        // Reflect the persisted verified flag for subsequent views.
        if let Some(request) = self.store.load(&self.request.id)? {
            self.request = request;
        }
        self.state = SessionState::MailSent;
        Ok(())
    }

    /// Re-fetches the persisted request and resets the session to
    /// `AwaitingUpload` or `AlreadyVerified`.
    ///
    /// A no-op while an upload attempt is mid-processing.
    pub fn refresh(&mut self) -> Result<(), VerifyError> {
        if matches!(self.state, SessionState::Processing) {
            return Ok(());
        }
        let request = self.store.load(&self.request.id)?.ok_or_else(|| {
            VerifyError::Persistence(StoreError(format!(
                "verification request {} not found",
                self.request.id
            )))
        })?;
        self.request = request;
        self.reset_attempt();
        self.state = if self.request.is_verified {
            SessionState::AlreadyVerified
        } else {
            SessionState::AwaitingUpload {
                invalid_signature: false,
            }
        };
        Ok(())
    }

    /// Remotely verifies the proof bundle persisted on the request
    /// (requester side).
    ///
    /// # Errors
    /// - `PreconditionFailed` when the request carries no bundle
    /// - any `ProofOrchestrator::verify_bundle` failure
    pub async fn verify_received_bundle(&self) -> Result<bool, VerifyError> {
        let bundle = self.request.proof_bundle.as_ref().ok_or_else(|| {
            VerifyError::precondition("no proof bundle has been received for this request")
        })?;
        self.orchestrator.verify_bundle(bundle).await
    }

    /// Presentation rows for every claimed field.
    pub fn field_reports(&self) -> Vec<FieldReport> {
        let statuses = self.statuses();
        self.request
            .fields
            .iter()
            .map(|field| {
                let status = statuses.and_then(|s| s.get(&field.kind).copied());
                FieldReport {
                    kind: field.kind,
                    label: field.kind.label(),
                    claimed_value: field.value.clone(),
                    status,
                    status_label: status.map(|s| s.label()).unwrap_or("Pending"),
                    pan_format_valid: if field.kind == FieldKind::PanId {
                        Some(is_valid_pan_format(&field.value))
                    } else {
                        None
                    },
                }
            })
            .collect()
    }

    fn reset_attempt(&mut self) {
        self.document_bytes = None;
        self.public_key_pem = None;
        self.signature_valid = None;
        self.pages = Vec::new();
    }
}

/// Creates a verification request and mails the invite to the subject.
///
/// This is the requester-side entry point; the subject later opens a
/// [`VerificationSession`] against the stored request.
pub fn create_verification_request(
    store: &dyn RequestStore,
    mailer: &dyn Mailer,
    request: VerificationRequest,
) -> Result<(), VerifyError> {
    store.create(request.clone())?;
    let message = MailMessage {
        to: request.subject_email.clone(),
        template: MailTemplate::VerificationInvite,
        request_id: request.id.clone(),
        fields: request.fields.clone(),
        public_key_pem: None,
        proof_bundle_json: None,
    };
    mailer.send(&message)?;
    log::info!(
        "verification request {} created; invite sent to {}",
        request.id,
        request.subject_email
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::engine::{PdfEngine, RawExtraction, RawSignature};
    use crate::error::EngineError;
    use crate::mail::{FailingMailer, RecordingMailer};
    use crate::models::field::ClaimedField;
    use crate::storage::InMemoryRequestStore;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Engine stub returning a canned result for every upload.
    struct FakeEngine(Result<RawExtraction, EngineError>);

    impl PdfEngine for FakeEngine {
        fn verify_and_extract(&self, _pdf_bytes: &[u8]) -> Result<RawExtraction, EngineError> {
            self.0.clone()
        }
    }

    fn engine_with_pages(pages: &[&str], signature_valid: bool) -> SignatureAdapter {
        SignatureAdapter::new(Arc::new(FakeEngine(Ok(RawExtraction {
            success: true,
            pages: Some(pages.iter().map(|p| p.to_string()).collect()),
            signature: Some(RawSignature {
                is_valid: signature_valid,
                public_key: Some(base64::encode(b"spki-der")),
            }),
            is_valid: None,
            error: None,
        }))))
    }

    fn failing_engine() -> SignatureAdapter {
        SignatureAdapter::new(Arc::new(FakeEngine(Err(EngineError(
            "unreadable file".to_string(),
        )))))
    }

    const MATCHING_PAGE: &str = "This certifies that Jane Doe, Roll No 2019CS1042, \
         of the Indian Institute of Science, graduated with CGPA: 9.40.";

    fn claimed_fields() -> Vec<ClaimedField> {
        vec![
            ClaimedField::new(FieldKind::Name, "Jane Doe"),
            ClaimedField::new(FieldKind::AcademicId, "2019CS1042"),
            ClaimedField::new(FieldKind::Institute, "Indian Institute of Science"),
            ClaimedField::new(FieldKind::Cgpa, "9.4"),
        ]
    }

    fn seeded_store(id: &str, fields: Vec<ClaimedField>) -> Arc<InMemoryRequestStore> {
        let store = Arc::new(InMemoryRequestStore::new());
        store
            .create(VerificationRequest::new(
                id,
                "requester@example.com",
                "subject@example.com",
                fields,
            ))
            .unwrap();
        store
    }

    fn session_with(
        adapter: SignatureAdapter,
        prover_base: &str,
        store: Arc<InMemoryRequestStore>,
        mailer: Arc<dyn Mailer>,
    ) -> VerificationSession {
        VerificationSession::load(
            "req-1",
            adapter,
            ProofOrchestrator::new(prover_base),
            store,
            mailer,
        )
        .unwrap()
    }

    #[test]
    fn test_load_enters_awaiting_upload() {
        init_logging();
        let store = seeded_store("req-1", claimed_fields());
        let session = session_with(
            engine_with_pages(&[MATCHING_PAGE], true),
            "http://127.0.0.1:9",
            store,
            Arc::new(RecordingMailer::new()),
        );
        assert_eq!(
            *session.state(),
            SessionState::AwaitingUpload {
                invalid_signature: false
            }
        );
        assert!(!session.invalid_signature());
    }

    #[test]
    fn test_load_missing_request_is_persistence_error() {
        init_logging();
        let store = Arc::new(InMemoryRequestStore::new());
        let result = VerificationSession::load(
            "ghost",
            engine_with_pages(&[], true),
            ProofOrchestrator::new("http://127.0.0.1:9"),
            store,
            Arc::new(RecordingMailer::new()),
        );
        assert!(matches!(result, Err(VerifyError::Persistence(_))));
    }

    #[test]
    fn test_upload_checks_every_field() {
        init_logging();
        let store = seeded_store("req-1", claimed_fields());
        let mut session = session_with(
            engine_with_pages(&[MATCHING_PAGE], true),
            "http://127.0.0.1:9",
            store,
            Arc::new(RecordingMailer::new()),
        );

        session.upload(b"%PDF-1.7 bytes").unwrap();

        let statuses = session.statuses().unwrap();
        assert_eq!(statuses.len(), 4);
        assert!(statuses.values().all(|s| s.is_found()));
        assert_eq!(session.signature_valid(), Some(true));
        assert!(session.public_key_pem().unwrap().contains("BEGIN PUBLIC KEY"));
        assert_eq!(session.pages().len(), 1);
    }

    #[test]
    fn test_upload_invalid_signature() {
        init_logging();
        let store = seeded_store("req-1", claimed_fields());
        let mut session = session_with(
            engine_with_pages(&[MATCHING_PAGE], false),
            "http://127.0.0.1:9",
            store,
            Arc::new(RecordingMailer::new()),
        );

        let result = session.upload(b"%PDF");
        assert!(matches!(result, Err(VerifyError::InvalidSignature)));
        assert!(session.invalid_signature());
        assert_eq!(session.signature_valid(), Some(false));
        assert!(session.statuses().is_none());
    }

    #[test]
    fn test_upload_extraction_failure() {
        init_logging();
        let store = seeded_store("req-1", claimed_fields());
        let mut session = session_with(
            failing_engine(),
            "http://127.0.0.1:9",
            store,
            Arc::new(RecordingMailer::new()),
        );

        let result = session.upload(b"not a pdf");
        assert!(matches!(result, Err(VerifyError::ExtractionFailed(_))));
        assert!(session.invalid_signature());
    }

    #[tokio::test]
    async fn test_generate_blocked_by_found_but_wrong_names_field() {
        init_logging();
        // The document names Jane Middle Doe; everything else matches.
        let page = "Jane Middle Doe, Roll No 2019CS1042, \
             Indian Institute of Science, CGPA: 9.40";
        let store = seeded_store("req-1", claimed_fields());
        let mut session = session_with(
            engine_with_pages(&[page], true),
            "http://127.0.0.1:9",
            store,
            Arc::new(RecordingMailer::new()),
        );

        session.upload(b"%PDF").unwrap();
        assert_eq!(
            session.statuses().unwrap()[&FieldKind::Name],
            VerificationStatus::FoundButWrong
        );

        match session.generate_proofs().await {
            Err(VerifyError::PreconditionFailed { field, reason }) => {
                assert_eq!(field, Some(FieldKind::Name));
                assert!(reason.contains("Name"));
            }
            other => panic!("expected PreconditionFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_before_upload_fails() {
        init_logging();
        let store = seeded_store("req-1", claimed_fields());
        let mut session = session_with(
            engine_with_pages(&[MATCHING_PAGE], true),
            "http://127.0.0.1:9",
            store,
            Arc::new(RecordingMailer::new()),
        );

        assert!(matches!(
            session.generate_proofs().await,
            Err(VerifyError::PreconditionFailed { field: None, .. })
        ));
    }

    #[tokio::test]
    async fn test_full_flow_to_mail_sent() {
        init_logging();
        let _prove = mockito::mock("POST", "/sess-flow/prove")
            .with_status(200)
            .with_body(r#"{"proof": "0xabc"}"#)
            .create();

        let store = seeded_store("req-1", claimed_fields());
        let mailer = Arc::new(RecordingMailer::new());
        let mut session = session_with(
            engine_with_pages(&[MATCHING_PAGE], true),
            &format!("{}/sess-flow", mockito::server_url()),
            store.clone(),
            mailer.clone(),
        );

        session.upload(b"%PDF").unwrap();
        session.generate_proofs().await.unwrap();
        match session.state() {
            SessionState::ProofGenerated { bundle, .. } => assert_eq!(bundle.len(), 4),
            other => panic!("expected ProofGenerated, got {:?}", other),
        }

        session.send_mail().unwrap();
        assert_eq!(*session.state(), SessionState::MailSent);
        assert!(session.request().is_verified);

        // The completion triple was persisted.
        let persisted = store.load("req-1").unwrap().unwrap();
        assert!(persisted.is_verified);
        assert!(persisted.public_key_pem.is_some());
        assert_eq!(persisted.proof_bundle.unwrap().len(), 4);

        // The confirmation mail carries key and bundle.
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].template, MailTemplate::ProofDelivery);
        assert_eq!(sent[0].to, "requester@example.com");
        assert!(sent[0].public_key_pem.is_some());
        assert!(sent[0].proof_bundle_json.as_ref().unwrap().contains("0xabc"));

        // Terminal: mail only goes once, uploads are closed.
        assert!(matches!(
            session.send_mail(),
            Err(VerifyError::PreconditionFailed { .. })
        ));
        assert!(matches!(
            session.upload(b"%PDF"),
            Err(VerifyError::PreconditionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_reupload_resets_attempt_state() {
        init_logging();
        let _prove = mockito::mock("POST", "/sess-reset/prove")
            .with_status(200)
            .with_body("{}")
            .create();

        let store = seeded_store("req-1", claimed_fields());
        let mut session = session_with(
            engine_with_pages(&[MATCHING_PAGE], true),
            &format!("{}/sess-reset", mockito::server_url()),
            store,
            Arc::new(RecordingMailer::new()),
        );

        session.upload(b"%PDF first").unwrap();
        session.generate_proofs().await.unwrap();

        // A fresh upload discards the unsent bundle and prior statuses.
        session.upload(b"%PDF second").unwrap();
        assert!(matches!(session.state(), SessionState::Checked { .. }));

        // Generation is permitted again and starts from zero artifacts.
        session.generate_proofs().await.unwrap();
        assert!(matches!(session.state(), SessionState::ProofGenerated { .. }));
    }

    #[tokio::test]
    async fn test_mail_failure_keeps_persisted_completion() {
        init_logging();
        let _prove = mockito::mock("POST", "/sess-mailfail/prove")
            .with_status(200)
            .with_body("{}")
            .create();

        let store = seeded_store("req-1", claimed_fields());
        let mut session = session_with(
            engine_with_pages(&[MATCHING_PAGE], true),
            &format!("{}/sess-mailfail", mockito::server_url()),
            store.clone(),
            Arc::new(FailingMailer),
        );

        session.upload(b"%PDF").unwrap();
        session.generate_proofs().await.unwrap();

        assert!(matches!(session.send_mail(), Err(VerifyError::Mail(_))));

        // The completion stays persisted; the session did not advance.
        assert!(store.load("req-1").unwrap().unwrap().is_verified);
        assert!(matches!(session.state(), SessionState::ProofGenerated { .. }));

        // A retry does not attempt a second save (which would fail the
        // store's exactly-once guard); only the mail fails again.
        assert!(matches!(session.send_mail(), Err(VerifyError::Mail(_))));
    }

    #[test]
    fn test_already_verified_is_terminal() {
        init_logging();
        let store = Arc::new(InMemoryRequestStore::new());
        let mut request = VerificationRequest::new(
            "req-1",
            "requester@example.com",
            "subject@example.com",
            claimed_fields(),
        );
        request.is_verified = true;
        store.create(request).unwrap();

        let mut session = session_with(
            engine_with_pages(&[MATCHING_PAGE], true),
            "http://127.0.0.1:9",
            store,
            Arc::new(RecordingMailer::new()),
        );

        assert_eq!(*session.state(), SessionState::AlreadyVerified);
        assert!(matches!(
            session.upload(b"%PDF"),
            Err(VerifyError::PreconditionFailed { .. })
        ));
        assert!(matches!(
            session.send_mail(),
            Err(VerifyError::PreconditionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_already_verified_blocks_generate() {
        init_logging();
        let store = Arc::new(InMemoryRequestStore::new());
        let mut request = VerificationRequest::new(
            "req-1",
            "requester@example.com",
            "subject@example.com",
            claimed_fields(),
        );
        request.is_verified = true;
        store.create(request).unwrap();

        let mut session = session_with(
            engine_with_pages(&[MATCHING_PAGE], true),
            "http://127.0.0.1:9",
            store,
            Arc::new(RecordingMailer::new()),
        );
        assert!(matches!(
            session.generate_proofs().await,
            Err(VerifyError::PreconditionFailed { .. })
        ));
    }

    #[test]
    fn test_refresh_resets_to_awaiting_or_terminal() {
        init_logging();
        let store = seeded_store("req-1", claimed_fields());
        let mut session = session_with(
            engine_with_pages(&[MATCHING_PAGE], true),
            "http://127.0.0.1:9",
            store.clone(),
            Arc::new(RecordingMailer::new()),
        );

        session.upload(b"%PDF").unwrap();
        session.refresh().unwrap();
        assert_eq!(
            *session.state(),
            SessionState::AwaitingUpload {
                invalid_signature: false
            }
        );
        assert!(session.statuses().is_none());

        // Another party completes the request out of band.
        store
            .save_completion(
                "req-1",
                CompletionRecord {
                    public_key_pem: None,
                    proof_bundle: ProofBundle::new(BTreeMap::new()),
                },
            )
            .unwrap();
        session.refresh().unwrap();
        assert_eq!(*session.state(), SessionState::AlreadyVerified);
    }

    #[tokio::test]
    async fn test_verify_received_bundle() {
        init_logging();
        let _verify = mockito::mock("POST", "/sess-verify/verify")
            .with_status(200)
            .with_body(r#"{"success": true}"#)
            .create();

        let store = Arc::new(InMemoryRequestStore::new());
        store
            .create(VerificationRequest::new(
                "req-1",
                "requester@example.com",
                "subject@example.com",
                claimed_fields(),
            ))
            .unwrap();
        let mut bundle_artifacts = BTreeMap::new();
        bundle_artifacts.insert(
            FieldKind::Name,
            crate::models::proof::ProofArtifact {
                field: FieldKind::Name,
                payload: serde_json::json!({"proof": "a"}),
            },
        );
        store
            .save_completion(
                "req-1",
                CompletionRecord {
                    public_key_pem: None,
                    proof_bundle: ProofBundle::new(bundle_artifacts),
                },
            )
            .unwrap();

        let session = session_with(
            engine_with_pages(&[], true),
            &format!("{}/sess-verify", mockito::server_url()),
            store,
            Arc::new(RecordingMailer::new()),
        );
        assert!(session.verify_received_bundle().await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_received_bundle_requires_bundle() {
        init_logging();
        let store = seeded_store("req-1", claimed_fields());
        let session = session_with(
            engine_with_pages(&[], true),
            "http://127.0.0.1:9",
            store,
            Arc::new(RecordingMailer::new()),
        );
        assert!(matches!(
            session.verify_received_bundle().await,
            Err(VerifyError::PreconditionFailed { .. })
        ));
    }

    #[test]
    fn test_field_reports_presentation() {
        init_logging();
        let fields = vec![
            ClaimedField::new(FieldKind::Name, "Jane Doe"),
            ClaimedField::new(FieldKind::PanId, "ABCDE1234F"),
        ];
        let store = seeded_store("req-1", fields);
        let mut session = session_with(
            engine_with_pages(&["Jane Doe, pan: abcde1234f"], true),
            "http://127.0.0.1:9",
            store,
            Arc::new(RecordingMailer::new()),
        );

        // Before any upload every row is pending.
        let reports = session.field_reports();
        assert_eq!(reports[0].status_label, "Pending");
        assert_eq!(reports[1].pan_format_valid, Some(true));

        session.upload(b"%PDF").unwrap();
        let reports = session.field_reports();
        assert_eq!(reports[0].label, "Name");
        assert_eq!(reports[0].status, Some(VerificationStatus::Found));
        assert_eq!(reports[0].status_label, "Found");
        assert_eq!(reports[1].status, Some(VerificationStatus::Found));
    }

    #[test]
    fn test_create_request_sends_invite() {
        init_logging();
        let store = InMemoryRequestStore::new();
        let mailer = RecordingMailer::new();
        let request = VerificationRequest::new(
            "req-9",
            "requester@example.com",
            "subject@example.com",
            claimed_fields(),
        );

        create_verification_request(&store, &mailer, request).unwrap();

        assert!(store.load("req-9").unwrap().is_some());
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].template, MailTemplate::VerificationInvite);
        assert_eq!(sent[0].to, "subject@example.com");
        assert_eq!(sent[0].fields.len(), 4);
    }
}
