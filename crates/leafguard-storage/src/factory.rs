use crate::{
    FileKeyValueStore, HistoryError, HistoryResult, HistoryStore, LocalHistoryStore,
    MemoryHistoryStore, RemoteHistoryStore,
};
use leafguard_api_client::ApiClient;
use leafguard_core::{HistoryBackend, LeafguardConfig};
use std::sync::Arc;

/// Create the history store selected by configuration.
///
/// The remote backend needs an API client; local and memory backends ignore it.
pub async fn create_history_store(
    config: &LeafguardConfig,
    client: Option<ApiClient>,
) -> HistoryResult<Arc<dyn HistoryStore>> {
    let store: Arc<dyn HistoryStore> = match config.history_backend {
        HistoryBackend::Local => {
            let kv = FileKeyValueStore::new(&config.history_dir).await?;
            Arc::new(LocalHistoryStore::new(Arc::new(kv)))
        }

        HistoryBackend::Remote => {
            let client = client.ok_or_else(|| {
                HistoryError::ConfigError(
                    "Remote history backend requires an API client".to_string(),
                )
            })?;
            let kv = FileKeyValueStore::new(&config.history_dir).await?;
            Arc::new(RemoteHistoryStore::new(
                client,
                config.history_path.clone(),
                config.clear_mode,
                Arc::new(kv),
            ))
        }

        HistoryBackend::Memory => Arc::new(MemoryHistoryStore::new()),
    };

    tracing::debug!(
        backend = %store.backend_type(),
        history_dir = %config.history_dir.display(),
        "History store ready"
    );

    Ok(store)
}
