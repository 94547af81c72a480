//! History service
//!
//! Front door to the configured [`HistoryStore`]. Storage failures never reach callers as
//! hard errors: the service raises a `PersistenceUnavailable` notice once and keeps working
//! against an in-memory store for the rest of the process.

use crate::notify::Notifier;
use leafguard_core::models::{HistoryEntry, HistoryStats, Notice};
use leafguard_core::{HistoryBackend, LeafguardError};
use leafguard_storage::{ClearOutcome, HistoryError, HistoryStore, MemoryHistoryStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct HistoryService {
    store: RwLock<Arc<dyn HistoryStore>>,
    degraded: AtomicBool,
    notifier: Arc<dyn Notifier>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn HistoryStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store: RwLock::new(store),
            degraded: AtomicBool::new(false),
            notifier,
        }
    }

    /// Start on a memory store because the configured one could not be opened.
    pub fn unavailable(err: HistoryError, notifier: Arc<dyn Notifier>) -> Self {
        tracing::error!(error = %err, "History storage unavailable, using memory");
        notifier.notify(LeafguardError::from(err).to_notice());
        Self {
            store: RwLock::new(Arc::new(MemoryHistoryStore::new())),
            degraded: AtomicBool::new(true),
            notifier,
        }
    }

    /// Whether the service fell back to process memory after a storage failure.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub async fn backend_type(&self) -> HistoryBackend {
        self.store.read().await.backend_type()
    }

    /// Commit an entry. Only a duplicate id is reported back as an error.
    pub async fn append(&self, entry: HistoryEntry) -> Result<(), LeafguardError> {
        let store = self.current().await;
        match store.append(entry.clone()).await {
            Ok(()) => {
                tracing::debug!(entry_id = %entry.id, "Diagnosis saved to history");
                Ok(())
            }
            Err(e @ HistoryError::DuplicateId(_)) => Err(e.into()),
            Err(e) => {
                let fallback = self.degrade(e).await;
                fallback.append(entry).await.map_err(Into::into)
            }
        }
    }

    pub async fn list(&self) -> Vec<HistoryEntry> {
        let store = self.current().await;
        match store.list().await {
            Ok(entries) => entries,
            Err(e) => {
                let fallback = self.degrade(e).await;
                fallback.list().await.unwrap_or_default()
            }
        }
    }

    /// Remove one entry. An unknown id is not an error.
    pub async fn remove(&self, id: &str) -> bool {
        let store = self.current().await;
        let removed = match store.remove(id).await {
            Ok(removed) => removed,
            Err(e) => {
                let fallback = self.degrade(e).await;
                fallback.remove(id).await.unwrap_or(false)
            }
        };

        if removed {
            tracing::info!(entry_id = %id, "History entry removed");
        } else {
            tracing::debug!(entry_id = %id, "No history entry to remove");
        }
        removed
    }

    /// Clear history and tell the user what happened on the server side.
    ///
    /// A failing store is not reported as cleared: its records are still on disk or on the
    /// server, so the caller gets a `PersistenceUnavailable` error instead.
    pub async fn clear(&self) -> Result<ClearOutcome, LeafguardError> {
        let store = self.current().await;
        let outcome = match store.clear().await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = e.to_string();
                self.degrade(e).await;
                tracing::warn!(error = %message, "History was not cleared");
                return Err(LeafguardError::PersistenceUnavailable(message));
            }
        };

        if outcome.server_records_kept {
            self.notifier.notify(Notice::warning(
                "History cleared locally",
                "Records on the server were kept. They are hidden from this view only.",
            ));
        } else {
            self.notifier.notify(Notice::success(
                "History cleared",
                "All diagnosis records have been removed.",
            ));
        }

        tracing::info!(
            removed = outcome.removed,
            server_side_cleared = outcome.server_side_cleared,
            "History cleared"
        );
        Ok(outcome)
    }

    pub async fn stats(&self) -> HistoryStats {
        HistoryStats::from_entries(&self.list().await)
    }

    async fn current(&self) -> Arc<dyn HistoryStore> {
        self.store.read().await.clone()
    }

    /// Swap in a memory store. Only the first failure notifies.
    async fn degrade(&self, err: HistoryError) -> Arc<dyn HistoryStore> {
        let mut store = self.store.write().await;
        if !self.degraded.swap(true, Ordering::SeqCst) {
            tracing::error!(
                error = %err,
                backend = %store.backend_type(),
                "History storage failed, falling back to memory"
            );
            self.notifier.notify(LeafguardError::from(err).to_notice());
            *store = Arc::new(MemoryHistoryStore::new());
        } else {
            tracing::warn!(error = %err, "History storage failed again");
        }
        store.clone()
    }
}
