//! LeafGuard History Storage
//!
//! This crate provides the HistoryStore abstraction and its backends: client-local
//! key/value storage, the remote history endpoint, and process memory.
//!
//! # Key format
//!
//! Local persistence uses flat string keys (`leafguard-diagnoses`,
//! `leafguard-remote-overlay`). Keys must not contain `/`, `..` or start with `.`.

pub mod factory;
pub mod kv;
pub mod local;
pub mod memory;
pub mod remote;
pub mod traits;

// Re-export commonly used types
pub use factory::create_history_store;
pub use kv::{FileKeyValueStore, MemoryKeyValueStore};
pub use leafguard_core::HistoryBackend;
pub use local::LocalHistoryStore;
pub use memory::MemoryHistoryStore;
pub use remote::RemoteHistoryStore;
pub use traits::{ClearOutcome, HistoryError, HistoryResult, HistoryStore, KeyValueStore};
