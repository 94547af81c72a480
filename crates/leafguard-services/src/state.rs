//! Application state shared by front ends.

use crate::history::HistoryService;
use crate::notify::Notifier;
use crate::presenter::ResultPresenter;
use crate::session::DiagnosisSession;
use leafguard_api_client::ApiClient;
use leafguard_core::{HistoryBackend, LeafguardConfig, LeafguardError};
use leafguard_providers::{create_provider, DiagnosisProvider};
use leafguard_storage::create_history_store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<LeafguardConfig>,
    pub provider: Arc<dyn DiagnosisProvider>,
    pub history: Arc<HistoryService>,
    pub presenter: ResultPresenter,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// One session per diagnosis workflow; sessions share provider and history.
    pub fn new_session(&self) -> DiagnosisSession {
        DiagnosisSession::from_config(&self.config, self.provider.clone(), self.notifier.clone())
    }
}

/// Build the application state from validated configuration.
///
/// A misconfigured provider is fatal. History that cannot be opened is not: the state comes
/// up with an in-memory store and a notice.
pub async fn initialize_state(
    config: LeafguardConfig,
    notifier: Arc<dyn Notifier>,
) -> Result<AppState, LeafguardError> {
    config.validate()?;

    let provider = create_provider(&config)?;

    let client = match config.history_backend {
        HistoryBackend::Remote => Some(ApiClient::from_config(&config)?),
        HistoryBackend::Local | HistoryBackend::Memory => None,
    };
    let history = match create_history_store(&config, client).await {
        Ok(store) => HistoryService::new(store, notifier.clone()),
        Err(e) => HistoryService::unavailable(e, notifier.clone()),
    };

    tracing::info!(
        provider = %config.provider,
        history_backend = %config.history_backend,
        environment = %config.environment,
        "LeafGuard initialized"
    );

    Ok(AppState {
        presenter: ResultPresenter::new(config.confidence_decimals),
        config: Arc::new(config),
        provider,
        history: Arc::new(history),
        notifier,
    })
}
