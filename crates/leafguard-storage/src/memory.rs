use crate::traits::{ClearOutcome, HistoryError, HistoryResult, HistoryStore};
use async_trait::async_trait;
use leafguard_core::models::HistoryEntry;
use leafguard_core::HistoryBackend;
use tokio::sync::RwLock;

/// Process-lifetime history, used directly or as the fallback when persistence fails.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: RwLock<Vec<HistoryEntry>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, entry: HistoryEntry) -> HistoryResult<()> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.id == entry.id) {
            return Err(HistoryError::DuplicateId(entry.id));
        }
        entries.push(entry);
        Ok(())
    }

    async fn list(&self) -> HistoryResult<Vec<HistoryEntry>> {
        Ok(self.entries.read().await.clone())
    }

    async fn remove(&self, id: &str) -> HistoryResult<bool> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        Ok(entries.len() != before)
    }

    async fn clear(&self) -> HistoryResult<ClearOutcome> {
        let removed = std::mem::take(&mut *self.entries.write().await).len();
        Ok(ClearOutcome {
            removed,
            server_side_cleared: false,
            server_records_kept: false,
        })
    }

    fn backend_type(&self) -> HistoryBackend {
        HistoryBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::entry;

    #[tokio::test]
    async fn test_round_trip() {
        let store = MemoryHistoryStore::new();
        store.append(entry("a", "Apple Scab")).await.unwrap();
        assert!(store.list().await.unwrap().iter().any(|e| e.id == "a"));
        assert!(store.append(entry("a", "Apple Scab")).await.is_err());

        assert!(store.remove("a").await.unwrap());
        assert!(!store.list().await.unwrap().iter().any(|e| e.id == "a"));
        assert!(!store.remove("missing").await.unwrap());
    }
}
