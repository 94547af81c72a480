use crate::traits::{HistoryError, HistoryResult, KeyValueStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// Key/value store backed by a directory, one `<key>.json` file per key.
#[derive(Clone, Debug)]
pub struct FileKeyValueStore {
    base_path: PathBuf,
}

impl FileKeyValueStore {
    /// Create the store, creating `base_path` if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> HistoryResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            HistoryError::ConfigError(format!(
                "Failed to create history directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Keys are flat names; anything that could escape the base directory is rejected.
    fn key_to_path(&self, key: &str) -> HistoryResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.contains("..")
            && !key.starts_with('.');

        if !valid {
            return Err(HistoryError::InvalidKey(key.to_string()));
        }

        Ok(self.base_path.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> HistoryResult<Option<String>> {
        let path = self.key_to_path(key)?;

        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> HistoryResult<()> {
        let path = self.key_to_path(key)?;
        let tmp_path = path.with_extension("json.tmp");

        // Write then rename so a crash never leaves a truncated file behind.
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(value.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, &path).await?;

        tracing::debug!(
            path = %path.display(),
            key = %key,
            size_bytes = value.len(),
            "Stored history value"
        );

        Ok(())
    }

    async fn remove(&self, key: &str) -> HistoryResult<()> {
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process key/value store.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> HistoryResult<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> HistoryResult<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> HistoryResult<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}
