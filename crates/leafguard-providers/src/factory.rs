#[cfg(feature = "provider-live")]
use crate::LiveDiagnosisProvider;
#[cfg(feature = "provider-mock")]
use crate::MockDiagnosisProvider;
use crate::DiagnosisProvider;
use leafguard_core::{LeafguardConfig, LeafguardError, ProviderMode};
use std::sync::Arc;

/// Create the diagnosis provider selected by configuration
pub fn create_provider(config: &LeafguardConfig) -> Result<Arc<dyn DiagnosisProvider>, LeafguardError> {
    let provider: Arc<dyn DiagnosisProvider> = match config.provider {
        #[cfg(feature = "provider-mock")]
        ProviderMode::Mock => Arc::new(MockDiagnosisProvider::new(
            std::time::Duration::from_millis(config.mock_delay_ms),
        )),

        #[cfg(not(feature = "provider-mock"))]
        ProviderMode::Mock => {
            return Err(LeafguardError::Internal(
                "Mock provider not available (provider-mock feature not enabled)".to_string(),
            ))
        }

        #[cfg(feature = "provider-live")]
        ProviderMode::Live => {
            let client = leafguard_api_client::ApiClient::from_config(config)?;
            Arc::new(LiveDiagnosisProvider::new(client, config.predict_path.clone()))
        }

        #[cfg(not(feature = "provider-live"))]
        ProviderMode::Live => {
            return Err(LeafguardError::Internal(
                "Live provider not available (provider-live feature not enabled)".to_string(),
            ))
        }
    };

    tracing::debug!(provider = %provider.name(), "Diagnosis provider ready");
    Ok(provider)
}
