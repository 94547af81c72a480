//! Configuration module
//!
//! Deployment settings for the diagnosis workflow: which provider answers submissions,
//! where the diagnosis and history endpoints live, validation limits, and which
//! history backend is active. Everything is read from the environment with defaults.

use std::env;
use std::path::PathBuf;

use crate::backends::{ClearMode, HistoryBackend, ProviderMode};

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_PREDICT_PATH: &str = "/predict";
const DEFAULT_HISTORY_PATH: &str = "/history";
const HTTP_TIMEOUT_SECS: u64 = 60;
const MOCK_DELAY_MS: u64 = 2500;
const MAX_FILE_SIZE_MB: usize = 10;
const PREVIEW_MAX_DIMENSION: u32 = 512;
const CONFIDENCE_DECIMALS: usize = 2;
const DEFAULT_HISTORY_DIR: &str = ".leafguard";
const DEFAULT_ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Application configuration
#[derive(Clone, Debug)]
pub struct LeafguardConfig {
    pub environment: String,
    // Diagnosis backend
    pub api_url: String,
    pub api_key: Option<String>,
    pub predict_path: String,
    pub history_path: String,
    pub http_timeout_secs: u64,
    pub provider: ProviderMode,
    pub mock_delay_ms: u64,
    // Upload validation
    pub max_file_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
    /// Longest preview edge in pixels; 0 keeps the original bytes
    pub preview_max_dimension: u32,
    // History
    pub history_backend: HistoryBackend,
    pub history_dir: PathBuf,
    pub clear_mode: ClearMode,
    // Display policy
    pub confidence_decimals: usize,
}

impl Default for LeafguardConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            predict_path: DEFAULT_PREDICT_PATH.to_string(),
            history_path: DEFAULT_HISTORY_PATH.to_string(),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            provider: ProviderMode::Mock,
            mock_delay_ms: MOCK_DELAY_MS,
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            preview_max_dimension: PREVIEW_MAX_DIMENSION,
            history_backend: HistoryBackend::Local,
            history_dir: PathBuf::from(DEFAULT_HISTORY_DIR),
            clear_mode: ClearMode::LocalOnly,
            confidence_decimals: CONFIDENCE_DECIMALS,
        }
    }
}

impl LeafguardConfig {
    /// Load configuration from the process environment (after `.env`, if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            environment: var("LEAFGUARD_ENV").unwrap_or(defaults.environment),
            api_url: var("LEAFGUARD_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            api_key: var("LEAFGUARD_API_KEY"),
            predict_path: var("LEAFGUARD_PREDICT_PATH").unwrap_or(defaults.predict_path),
            history_path: var("LEAFGUARD_HISTORY_PATH").unwrap_or(defaults.history_path),
            http_timeout_secs: var("LEAFGUARD_HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_timeout_secs),
            provider: match var("LEAFGUARD_PROVIDER") {
                Some(v) => v.parse()?,
                None => defaults.provider,
            },
            mock_delay_ms: var("LEAFGUARD_MOCK_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.mock_delay_ms),
            max_file_size_bytes: match var("LEAFGUARD_MAX_FILE_SIZE_MB")
                .and_then(|v| v.parse::<usize>().ok())
            {
                Some(mb) => mb.checked_mul(1024 * 1024).ok_or_else(|| {
                    anyhow::anyhow!("LEAFGUARD_MAX_FILE_SIZE_MB is too large: {}", mb)
                })?,
                None => defaults.max_file_size_bytes,
            },
            allowed_content_types: var("LEAFGUARD_ALLOWED_CONTENT_TYPES")
                .map(|s| {
                    s.split(',')
                        .map(|ct| ct.trim().to_lowercase())
                        .filter(|ct| !ct.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.allowed_content_types),
            preview_max_dimension: var("LEAFGUARD_PREVIEW_MAX_DIMENSION")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.preview_max_dimension),
            history_backend: match var("LEAFGUARD_HISTORY_BACKEND") {
                Some(v) => v.parse()?,
                None => defaults.history_backend,
            },
            history_dir: var("LEAFGUARD_HISTORY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.history_dir),
            clear_mode: match var("LEAFGUARD_HISTORY_CLEAR_MODE") {
                Some(v) => v.parse()?,
                None => defaults.clear_mode,
            },
            confidence_decimals: var("LEAFGUARD_CONFIDENCE_DECIMALS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.confidence_decimals),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "LEAFGUARD_API_URL must be an http(s) URL, got {}",
                self.api_url
            ));
        }

        if !self.predict_path.starts_with('/') || !self.history_path.starts_with('/') {
            return Err(anyhow::anyhow!(
                "LEAFGUARD_PREDICT_PATH and LEAFGUARD_HISTORY_PATH must start with '/'"
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "LEAFGUARD_MAX_FILE_SIZE_MB must be greater than zero"
            ));
        }

        if self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "LEAFGUARD_ALLOWED_CONTENT_TYPES must list at least one content type"
            ));
        }

        if let Some(ct) = self
            .allowed_content_types
            .iter()
            .find(|ct| !ct.starts_with("image/"))
        {
            return Err(anyhow::anyhow!(
                "LEAFGUARD_ALLOWED_CONTENT_TYPES may only contain image types, got {}",
                ct
            ));
        }

        if self.confidence_decimals > 6 {
            return Err(anyhow::anyhow!(
                "LEAFGUARD_CONFIDENCE_DECIMALS must be between 0 and 6"
            ));
        }

        if self.clear_mode == ClearMode::Remote && self.history_backend != HistoryBackend::Remote {
            tracing::warn!(
                history_backend = %self.history_backend,
                "LEAFGUARD_HISTORY_CLEAR_MODE=remote has no effect without the remote history backend"
            );
        }

        Ok(())
    }
}
