//! Diagnosis provider abstraction
//!
//! The session submits candidates through this trait so the mock and live paths are
//! swapped by configuration, not by branches in the workflow.

use async_trait::async_trait;
use leafguard_core::models::{DiagnosisResult, UploadCandidate};
use leafguard_core::LeafguardError;

/// Resolves an accepted upload into a normalized diagnosis.
///
/// Implementations report every failure as `LeafguardError::SubmissionFailed` (or `Internal`
/// for misconfiguration) and never retry on their own.
#[async_trait]
pub trait DiagnosisProvider: Send + Sync {
    /// Short identifier used in logs (`mock`, `live`)
    fn name(&self) -> &str;

    async fn diagnose(&self, candidate: &UploadCandidate) -> Result<DiagnosisResult, LeafguardError>;
}
