//! Diagnosis session
//!
//! One instance per diagnosis workflow:
//!
//! ```text
//! Idle -> CandidateSelected -> Submitting -> ResultReady | SubmissionFailed -> Idle
//! ```
//!
//! At most one submission is in flight per session. The provider call runs on its own task,
//! bound to a cancellation token owned by the session; `reset` and dropping the session both
//! cancel it, and a cancelled completion never touches session state.

use crate::history::HistoryService;
use crate::notify::Notifier;
use chrono::Utc;
use leafguard_core::models::{
    DiagnosisResult, HistoryEntry, Notice, PreviewUri, SelectedFile, UploadCandidate,
};
use leafguard_core::{LeafguardConfig, LeafguardError};
use leafguard_processing::{
    preview_encoder_from_config, validator_from_config, ImageValidator, PreviewEncoder,
};
use leafguard_providers::DiagnosisProvider;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    CandidateSelected,
    Submitting,
    ResultReady,
    SubmissionFailed,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::CandidateSelected => "candidate_selected",
            SessionState::Submitting => "submitting",
            SessionState::ResultReady => "result_ready",
            SessionState::SubmissionFailed => "submission_failed",
        };
        write!(f, "{}", label)
    }
}

/// How a spawned submission ended.
#[derive(Debug)]
pub enum SubmissionOutcome {
    Completed(DiagnosisResult),
    Failed(LeafguardError),
    /// Cancelled, or superseded by a reset. Session state was left untouched.
    Cancelled,
}

/// Handle to an in-flight submission.
pub struct SubmissionHandle {
    join: JoinHandle<SubmissionOutcome>,
    token: CancellationToken,
}

impl SubmissionHandle {
    /// Cancel this submission. The session returns to `CandidateSelected`.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub async fn wait(self) -> SubmissionOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => SubmissionOutcome::Cancelled,
            Err(e) => SubmissionOutcome::Failed(LeafguardError::Internal(format!(
                "Submission task failed: {}",
                e
            ))),
        }
    }
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    candidate: Option<UploadCandidate>,
    result: Option<DiagnosisResult>,
    last_error: Option<String>,
    source_reference: Option<String>,
    in_flight: Option<CancellationToken>,
    // Bumped by every submit and reset; completions from older generations are stale
    generation: u64,
    recorded_id: Option<String>,
}

pub struct DiagnosisSession {
    id: Uuid,
    validator: ImageValidator,
    encoder: PreviewEncoder,
    provider: Arc<dyn DiagnosisProvider>,
    notifier: Arc<dyn Notifier>,
    root: CancellationToken,
    inner: Arc<Mutex<Inner>>,
}

impl DiagnosisSession {
    pub fn new(
        validator: ImageValidator,
        encoder: PreviewEncoder,
        provider: Arc<dyn DiagnosisProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(session_id = %id, provider = %provider.name(), "Diagnosis session started");
        Self {
            id,
            validator,
            encoder,
            provider,
            notifier,
            root: CancellationToken::new(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn from_config(
        config: &LeafguardConfig,
        provider: Arc<dyn DiagnosisProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::new(
            validator_from_config(config),
            preview_encoder_from_config(config),
            provider,
            notifier,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn candidate(&self) -> Option<UploadCandidate> {
        self.inner.lock().await.candidate.clone()
    }

    pub async fn preview(&self) -> Option<PreviewUri> {
        self.inner
            .lock()
            .await
            .candidate
            .as_ref()
            .map(|c| c.preview().clone())
    }

    pub async fn result(&self) -> Option<DiagnosisResult> {
        self.inner.lock().await.result.clone()
    }

    /// Message of the last failed submission, cleared by the next submit or select.
    pub async fn last_error(&self) -> Option<String> {
        self.inner.lock().await.last_error.clone()
    }

    /// Validate and preview a file, making it the current candidate.
    ///
    /// A rejected file raises a notice and leaves the session exactly as it was.
    pub async fn select(&self, file: SelectedFile) -> Result<(), LeafguardError> {
        if self.state().await == SessionState::Submitting {
            return Err(self.busy());
        }

        if let Err(e) = self.validator.validate(&file) {
            tracing::info!(
                session_id = %self.id,
                file_name = %file.file_name,
                reason = %e,
                "Image rejected"
            );
            self.notifier.notify(e.to_notice());
            return Err(e.into());
        }

        let preview = match self.encoder.encode_async(file.clone()).await {
            Ok(preview) => preview,
            Err(e) => {
                tracing::warn!(session_id = %self.id, file_name = %file.file_name, error = %e, "Preview encoding failed");
                let err = LeafguardError::from(e);
                self.notifier.notify(err.to_notice());
                return Err(err);
            }
        };

        let mut inner = self.inner.lock().await;
        // A submit may have started while the preview was being encoded
        if inner.state == SessionState::Submitting {
            return Err(self.busy());
        }

        tracing::info!(
            session_id = %self.id,
            file_name = %file.file_name,
            size_bytes = file.size_bytes(),
            "Image selected"
        );
        inner.source_reference = Some(file.file_name.clone());
        inner.candidate = Some(UploadCandidate::new(file, preview));
        inner.state = SessionState::CandidateSelected;
        inner.result = None;
        inner.last_error = None;
        inner.recorded_id = None;
        drop(inner);

        self.notifier.notify(Notice::success(
            "Image ready!",
            "Click 'Analyze with AI' to proceed.",
        ));
        Ok(())
    }

    /// Start diagnosing the current candidate.
    ///
    /// Returns `Ok(None)` when a submission is already in flight; the repeated request is
    /// ignored.
    pub async fn submit(&self) -> Result<Option<SubmissionHandle>, LeafguardError> {
        let mut inner = self.inner.lock().await;

        if inner.state == SessionState::Submitting {
            tracing::debug!(session_id = %self.id, "Submission already in flight, ignoring");
            return Ok(None);
        }

        let candidate = match inner.state {
            SessionState::CandidateSelected | SessionState::SubmissionFailed => {
                inner.candidate.clone()
            }
            _ => None,
        };
        let Some(candidate) = candidate else {
            drop(inner);
            self.notifier.notify(Notice::warning(
                "No image selected",
                "Please upload an image first.",
            ));
            return Err(LeafguardError::InvalidInput(
                "No image selected".to_string(),
            ));
        };

        let token = self.root.child_token();
        inner.generation += 1;
        let generation = inner.generation;
        inner.in_flight = Some(token.clone());
        inner.state = SessionState::Submitting;
        inner.last_error = None;
        drop(inner);

        tracing::info!(
            session_id = %self.id,
            provider = %self.provider.name(),
            file_name = %candidate.file().file_name,
            "Submitting image for diagnosis"
        );

        let task = SubmissionTask {
            session_id: self.id,
            generation,
            token: token.clone(),
            provider: self.provider.clone(),
            notifier: self.notifier.clone(),
            inner: self.inner.clone(),
        };
        let join = tokio::spawn(task.run(candidate));

        Ok(Some(SubmissionHandle { join, token }))
    }

    /// Return to `Idle`, cancelling any in-flight submission.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(token) = inner.in_flight.take() {
            token.cancel();
            tracing::info!(session_id = %self.id, "Cancelled in-flight submission");
        }

        let generation = inner.generation + 1;
        *inner = Inner {
            generation,
            ..Default::default()
        };
        tracing::debug!(session_id = %self.id, "Session reset");
    }

    /// Commit the ready result to history. Each result is recorded at most once.
    ///
    /// The session lock is released while the store writes, so a slow backend does not block
    /// `state()` or `reset()`. The entry id is reserved first so concurrent calls cannot record
    /// the same result twice.
    pub async fn record(&self, history: &HistoryService) -> Result<HistoryEntry, LeafguardError> {
        let (entry, generation) = {
            let mut inner = self.inner.lock().await;

            let result = match (inner.state, inner.result.as_ref()) {
                (SessionState::ResultReady, Some(result)) => result.clone(),
                _ => {
                    return Err(LeafguardError::InvalidInput(
                        "No diagnosis result to record".to_string(),
                    ))
                }
            };
            if let Some(id) = &inner.recorded_id {
                return Err(LeafguardError::InvalidInput(format!(
                    "Diagnosis already recorded as {}",
                    id
                )));
            }

            let source_reference = result
                .artifacts()
                .annotated_image_url
                .clone()
                .or_else(|| inner.source_reference.clone())
                .unwrap_or_default();
            let entry = HistoryEntry::from_result(result, source_reference, Utc::now());
            inner.recorded_id = Some(entry.id.clone());
            (entry, inner.generation)
        };

        if let Err(e) = history.append(entry.clone()).await {
            let mut inner = self.inner.lock().await;
            if inner.generation == generation {
                inner.recorded_id = None;
            }
            return Err(e);
        }

        tracing::info!(session_id = %self.id, entry_id = %entry.id, "Diagnosis recorded");
        Ok(entry)
    }

    fn busy(&self) -> LeafguardError {
        LeafguardError::InvalidInput("A diagnosis is already in progress".to_string())
    }
}

impl Drop for DiagnosisSession {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

struct SubmissionTask {
    session_id: Uuid,
    generation: u64,
    token: CancellationToken,
    provider: Arc<dyn DiagnosisProvider>,
    notifier: Arc<dyn Notifier>,
    inner: Arc<Mutex<Inner>>,
}

impl SubmissionTask {
    async fn run(self, candidate: UploadCandidate) -> SubmissionOutcome {
        let outcome = tokio::select! {
            biased;
            _ = self.token.cancelled() => SubmissionOutcome::Cancelled,
            res = self.provider.diagnose(&candidate) => match res {
                Ok(result) => SubmissionOutcome::Completed(result),
                Err(e) => SubmissionOutcome::Failed(e),
            },
        };

        let mut inner = self.inner.lock().await;
        if inner.generation != self.generation {
            tracing::debug!(session_id = %self.session_id, "Discarding completion of a reset submission");
            return SubmissionOutcome::Cancelled;
        }
        inner.in_flight = None;

        if self.token.is_cancelled() {
            inner.state = SessionState::CandidateSelected;
            tracing::info!(session_id = %self.session_id, "Submission cancelled");
            return SubmissionOutcome::Cancelled;
        }

        match &outcome {
            SubmissionOutcome::Completed(result) => {
                tracing::info!(
                    session_id = %self.session_id,
                    disease = %result.disease_name(),
                    confidence = result.confidence().value(),
                    "Diagnosis complete"
                );
                inner.state = SessionState::ResultReady;
                inner.result = Some(result.clone());
                inner.candidate = None;
                self.notifier.notify(Notice::success(
                    "Analysis Complete",
                    "You can now view and download the report.",
                ));
            }
            SubmissionOutcome::Failed(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "Diagnosis failed");
                inner.state = SessionState::SubmissionFailed;
                inner.last_error = Some(e.to_string());
                self.notifier.notify(e.to_notice());
            }
            SubmissionOutcome::Cancelled => {}
        }

        outcome
    }
}
