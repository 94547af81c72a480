use crate::provider::DiagnosisProvider;
use crate::schema;
use async_trait::async_trait;
use leafguard_api_client::ApiClient;
use leafguard_core::models::{DiagnosisResult, UploadCandidate};
use leafguard_core::LeafguardError;
use std::time::Instant;

/// Submits the raw image to the remote diagnosis endpoint.
pub struct LiveDiagnosisProvider {
    client: ApiClient,
    predict_path: String,
}

impl LiveDiagnosisProvider {
    pub fn new(client: ApiClient, predict_path: impl Into<String>) -> Self {
        Self {
            client,
            predict_path: predict_path.into(),
        }
    }
}

#[async_trait]
impl DiagnosisProvider for LiveDiagnosisProvider {
    fn name(&self) -> &str {
        "live"
    }

    async fn diagnose(&self, candidate: &UploadCandidate) -> Result<DiagnosisResult, LeafguardError> {
        let file = candidate.file();
        let start = Instant::now();

        let payload = self
            .client
            .predict(&self.predict_path, file)
            .await
            .map_err(|e| {
                tracing::warn!(
                    error = %format!("{:#}", e),
                    file_name = %file.file_name,
                    "Diagnosis request failed"
                );
                LeafguardError::SubmissionFailed(format!("{:#}", e))
            })?;

        let result = schema::normalize_with(&payload, |reference| {
            self.client.resolve_url(reference)
        })
        .map_err(|e| {
            tracing::warn!(error = %e, "Diagnosis response could not be interpreted");
            LeafguardError::SubmissionFailed(format!("Malformed diagnosis response: {}", e))
        })?;

        tracing::info!(
            provider = "live",
            file_name = %file.file_name,
            disease = %result.disease_name(),
            confidence = result.confidence().value(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Diagnosis received"
        );

        Ok(result)
    }
}
