use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// History store backends
///
/// Defined in core because they are selected by configuration and reported by stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    /// Client-local key/value storage
    Local,
    /// Remote history listing endpoint
    Remote,
    /// Process memory only
    Memory,
}

impl FromStr for HistoryBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(HistoryBackend::Local),
            "remote" => Ok(HistoryBackend::Remote),
            "memory" => Ok(HistoryBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid history backend: {}", s)),
        }
    }
}

impl Display for HistoryBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            HistoryBackend::Local => write!(f, "local"),
            HistoryBackend::Remote => write!(f, "remote"),
            HistoryBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Which diagnosis provider answers submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Simulated diagnoses from a fixed catalog
    Mock,
    /// Remote diagnosis endpoint
    Live,
}

impl FromStr for ProviderMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(ProviderMode::Mock),
            "live" => Ok(ProviderMode::Live),
            _ => Err(anyhow::anyhow!("Invalid provider mode: {}", s)),
        }
    }
}

impl Display for ProviderMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProviderMode::Mock => write!(f, "mock"),
            ProviderMode::Live => write!(f, "live"),
        }
    }
}

/// What "clear history" does when history is served by a remote endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClearMode {
    /// Hide entries from the local view only; server records survive
    LocalOnly,
    /// Ask the server to delete its records as well
    Remote,
}

impl FromStr for ClearMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local-only" | "local_only" | "local" => Ok(ClearMode::LocalOnly),
            "remote" => Ok(ClearMode::Remote),
            _ => Err(anyhow::anyhow!("Invalid clear mode: {}", s)),
        }
    }
}

impl Display for ClearMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ClearMode::LocalOnly => write!(f, "local-only"),
            ClearMode::Remote => write!(f, "remote"),
        }
    }
}
