//! LeafGuard Core Library
//!
//! This crate provides the domain models, error taxonomy and configuration shared by
//! every component of the plant-disease diagnosis workflow.

pub mod backends;
pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use backends::{ClearMode, HistoryBackend, ProviderMode};
pub use config::LeafguardConfig;
pub use error::{ErrorMetadata, LeafguardError, LogLevel};
