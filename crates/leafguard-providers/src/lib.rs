//! Diagnosis providers
//!
//! The [`DiagnosisProvider`] trait plus its implementations: a simulated provider backed by a
//! fixed catalog and a live provider that calls the diagnosis endpoint. Response payloads are
//! normalized by the [`schema`] adapters.

pub mod factory;
#[cfg(feature = "provider-live")]
pub mod live;
#[cfg(feature = "provider-mock")]
pub mod mock;
pub mod provider;
pub mod schema;

pub use factory::create_provider;
#[cfg(feature = "provider-live")]
pub use live::LiveDiagnosisProvider;
#[cfg(feature = "provider-mock")]
pub use mock::{default_catalog, MockDiagnosisProvider};
pub use provider::DiagnosisProvider;
pub use schema::{normalize, normalize_with, ResponseSchema, SchemaError};
