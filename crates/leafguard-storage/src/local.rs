use crate::traits::{ClearOutcome, HistoryError, HistoryResult, HistoryStore, KeyValueStore};
use async_trait::async_trait;
use leafguard_core::models::HistoryEntry;
use leafguard_core::HistoryBackend;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Key under which the serialized history list is stored.
pub const HISTORY_KEY: &str = "leafguard-diagnoses";

/// History kept in client-local key/value storage as one JSON array.
pub struct LocalHistoryStore {
    kv: Arc<dyn KeyValueStore>,
    // Serializes read-modify-write cycles on the stored list
    lock: Mutex<()>,
}

impl LocalHistoryStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> HistoryResult<Vec<HistoryEntry>> {
        match self.kv.get(HISTORY_KEY).await? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    async fn save(&self, entries: &[HistoryEntry]) -> HistoryResult<()> {
        let raw = serde_json::to_string(entries)?;
        self.kv.set(HISTORY_KEY, &raw).await
    }
}

#[async_trait]
impl HistoryStore for LocalHistoryStore {
    async fn append(&self, entry: HistoryEntry) -> HistoryResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;

        if entries.iter().any(|e| e.id == entry.id) {
            return Err(HistoryError::DuplicateId(entry.id));
        }

        tracing::info!(
            id = %entry.id,
            disease = %entry.result.disease_name(),
            "Recorded diagnosis in local history"
        );
        entries.push(entry);
        self.save(&entries).await
    }

    async fn list(&self) -> HistoryResult<Vec<HistoryEntry>> {
        self.load().await
    }

    async fn remove(&self, id: &str) -> HistoryResult<bool> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        let before = entries.len();
        entries.retain(|e| e.id != id);

        if entries.len() == before {
            return Ok(false);
        }

        self.save(&entries).await?;
        Ok(true)
    }

    async fn clear(&self) -> HistoryResult<ClearOutcome> {
        let _guard = self.lock.lock().await;
        let removed = self.load().await.map(|e| e.len()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Clearing unreadable local history");
            0
        });
        self.kv.remove(HISTORY_KEY).await?;

        Ok(ClearOutcome {
            removed,
            server_side_cleared: false,
            server_records_kept: false,
        })
    }

    fn backend_type(&self) -> HistoryBackend {
        HistoryBackend::Local
    }
}
