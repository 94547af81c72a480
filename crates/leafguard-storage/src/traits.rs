//! History store abstraction
//!
//! This module defines the HistoryStore trait that every history backend implements,
//! plus the KeyValueStore seam used by backends that persist client-side.

use async_trait::async_trait;
use leafguard_core::models::HistoryEntry;
use leafguard_core::{HistoryBackend, LeafguardError};
use thiserror::Error;

/// History operation errors
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History entry already exists: {0}")]
    DuplicateId(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Stored history is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("History endpoint error: {0}")]
    Remote(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

impl From<HistoryError> for LeafguardError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::DuplicateId(id) => {
                LeafguardError::InvalidInput(format!("History entry already exists: {}", id))
            }
            other => LeafguardError::PersistenceUnavailable(other.to_string()),
        }
    }
}

/// What a clear actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClearOutcome {
    /// Entries removed from the visible list
    pub removed: usize,
    /// Whether the server deleted its records too
    pub server_side_cleared: bool,
    /// Records still exist on a server and were only hidden from this client
    pub server_records_kept: bool,
}

/// History store trait
///
/// Backends are interchangeable: callers never branch on which one is active.
/// Entries are listed in insertion order (or the order the remote endpoint returns).
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a new entry. Fails with `DuplicateId` if the id is already present.
    async fn append(&self, entry: HistoryEntry) -> HistoryResult<()>;

    async fn list(&self) -> HistoryResult<Vec<HistoryEntry>>;

    /// Remove one entry. Returns `false` when no entry had that id.
    async fn remove(&self, id: &str) -> HistoryResult<bool>;

    async fn clear(&self) -> HistoryResult<ClearOutcome>;

    fn backend_type(&self) -> HistoryBackend;
}

/// String-keyed get/set storage, the client-local persistence medium.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> HistoryResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> HistoryResult<()>;

    async fn remove(&self, key: &str) -> HistoryResult<()>;
}
