//! History served by the backend's listing endpoint.
//!
//! The endpoint is read-only in practice: the backend appends a record itself for every
//! prediction. Entries appended by this client that the server does not know about are
//! kept in a local overlay, and removals are kept as a set of hidden ids. Both live in a
//! key/value store so they survive restarts.

use crate::traits::{ClearOutcome, HistoryError, HistoryResult, HistoryStore, KeyValueStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use leafguard_api_client::{ApiClient, RemoteHistoryRecord};
use leafguard_core::models::{
    record_id_from_reference, Artifacts, Confidence, DiagnosisResult, HistoryEntry, Severity,
    Treatment, TreatmentStatus,
};
use leafguard_core::{ClearMode, HistoryBackend};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Key under which the overlay is stored.
pub const OVERLAY_KEY: &str = "leafguard-remote-overlay";

/// Backend timestamps look like `20240501_101500`.
const BACKEND_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Overlay {
    #[serde(default)]
    appended: Vec<HistoryEntry>,
    #[serde(default)]
    hidden: BTreeSet<String>,
}

pub struct RemoteHistoryStore {
    client: ApiClient,
    history_path: String,
    clear_mode: ClearMode,
    kv: Arc<dyn KeyValueStore>,
    lock: Mutex<()>,
}

impl RemoteHistoryStore {
    pub fn new(
        client: ApiClient,
        history_path: impl Into<String>,
        clear_mode: ClearMode,
        kv: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            client,
            history_path: history_path.into(),
            clear_mode,
            kv,
            lock: Mutex::new(()),
        }
    }

    pub fn clear_mode(&self) -> ClearMode {
        self.clear_mode
    }

    async fn load_overlay(&self) -> HistoryResult<Overlay> {
        match self.kv.get(OVERLAY_KEY).await? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Overlay::default()),
        }
    }

    async fn save_overlay(&self, overlay: &Overlay) -> HistoryResult<()> {
        let raw = serde_json::to_string(overlay)?;
        self.kv.set(OVERLAY_KEY, &raw).await
    }

    async fn fetch_server_entries(&self) -> HistoryResult<Vec<HistoryEntry>> {
        let records = self
            .client
            .list_history(&self.history_path)
            .await
            .map_err(|e| HistoryError::Remote(format!("{:#}", e)))?;

        let mut entries: Vec<HistoryEntry> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| self.record_to_entry(index, record))
            .collect();
        disambiguate_ids(&mut entries);
        Ok(entries)
    }

    /// Map one listing record onto a history entry, skipping records without a usable confidence.
    fn record_to_entry(&self, index: usize, record: RemoteHistoryRecord) -> Option<HistoryEntry> {
        let confidence = match record.confidence.map(Confidence::from_reported) {
            Some(Ok(confidence)) => confidence,
            other => {
                tracing::warn!(
                    index,
                    confidence = ?record.confidence,
                    error = ?other.and_then(|r| r.err()),
                    "Skipping history record with unusable confidence"
                );
                return None;
            }
        };

        let id = record
            .id
            .clone()
            .or_else(|| record.report_filename.as_deref().and_then(record_id_from_reference))
            .or_else(|| record.report_url.as_deref().and_then(record_id_from_reference))
            .or_else(|| record.timestamp.clone())
            .unwrap_or_else(|| format!("remote_{}", index));

        let artifacts = Artifacts {
            report_url: record.report_url.as_deref().map(|u| self.client.resolve_url(u)),
            annotated_image_url: record.image_url.as_deref().map(|u| self.client.resolve_url(u)),
        };
        let source_image_reference = artifacts.annotated_image_url.clone().unwrap_or_default();

        let result = DiagnosisResult::builder(record.prediction.unwrap_or_default(), confidence)
            .severity(record.severity.as_deref().and_then(Severity::parse_lenient))
            .treatment(record.treatment.map(Treatment::Text))
            .prevention(record.prevention)
            .artifacts(artifacts)
            .record_id(Some(id.clone()))
            .build();

        let status = record
            .status
            .as_deref()
            .and_then(TreatmentStatus::parse_lenient)
            .unwrap_or(if result.is_healthy() {
                TreatmentStatus::Healthy
            } else {
                TreatmentStatus::Untreated
            });

        Some(HistoryEntry {
            id,
            timestamp: record
                .timestamp
                .as_deref()
                .and_then(parse_backend_timestamp)
                .unwrap_or_default(),
            source_image_reference,
            status,
            result,
        })
    }

    fn merge(server: Vec<HistoryEntry>, overlay: &Overlay) -> Vec<HistoryEntry> {
        let server_ids: BTreeSet<String> = server.iter().map(|e| e.id.clone()).collect();
        server
            .into_iter()
            .chain(
                overlay
                    .appended
                    .iter()
                    .filter(|e| !server_ids.contains(&e.id))
                    .cloned(),
            )
            .filter(|e| !overlay.hidden.contains(&e.id))
            .collect()
    }
}

/// Suffix repeated ids with `_2`, `_3`, ... in listing order.
///
/// The backend names records after a per-second timestamp, so two predictions in the same
/// second share one. The result keeps its original record id so artifacts still resolve.
fn disambiguate_ids(entries: &mut [HistoryEntry]) {
    let mut seen = BTreeSet::new();
    for entry in entries.iter_mut() {
        if seen.insert(entry.id.clone()) {
            continue;
        }
        let base = entry.id.clone();
        let mut n = 2;
        while seen.contains(&format!("{}_{}", base, n)) {
            n += 1;
        }
        entry.id = format!("{}_{}", base, n);
        tracing::debug!(original = %base, id = %entry.id, "Renamed repeated server record id");
        seen.insert(entry.id.clone());
    }
}

fn parse_backend_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, BACKEND_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
}

#[async_trait]
impl HistoryStore for RemoteHistoryStore {
    async fn append(&self, entry: HistoryEntry) -> HistoryResult<()> {
        let _guard = self.lock.lock().await;
        let mut overlay = self.load_overlay().await?;

        if overlay.appended.iter().any(|e| e.id == entry.id) {
            return Err(HistoryError::DuplicateId(entry.id));
        }

        let server = self.fetch_server_entries().await?;
        if server.iter().any(|e| e.id == entry.id) {
            // The backend recorded this diagnosis when it served the prediction.
            if overlay.hidden.remove(&entry.id) {
                self.save_overlay(&overlay).await?;
            }
            tracing::debug!(id = %entry.id, "Diagnosis already recorded by the server");
            return Ok(());
        }

        overlay.hidden.remove(&entry.id);
        tracing::info!(id = %entry.id, "Recorded diagnosis in local overlay");
        overlay.appended.push(entry);
        self.save_overlay(&overlay).await
    }

    async fn list(&self) -> HistoryResult<Vec<HistoryEntry>> {
        let server = self.fetch_server_entries().await?;
        let overlay = self.load_overlay().await?;
        Ok(Self::merge(server, &overlay))
    }

    async fn remove(&self, id: &str) -> HistoryResult<bool> {
        let _guard = self.lock.lock().await;
        let mut overlay = self.load_overlay().await?;
        let server = self.fetch_server_entries().await?;

        let visible = Self::merge(server, &overlay).iter().any(|e| e.id == id);
        if !visible {
            return Ok(false);
        }

        overlay.appended.retain(|e| e.id != id);
        overlay.hidden.insert(id.to_string());
        self.save_overlay(&overlay).await?;
        Ok(true)
    }

    async fn clear(&self) -> HistoryResult<ClearOutcome> {
        let _guard = self.lock.lock().await;
        let mut overlay = self.load_overlay().await?;
        let server = self.fetch_server_entries().await?;
        let visible = Self::merge(server, &overlay);
        let removed = visible.len();

        match self.clear_mode {
            ClearMode::Remote => {
                self.client
                    .clear_history(&self.history_path)
                    .await
                    .map_err(|e| HistoryError::Remote(format!("{:#}", e)))?;
                self.kv.remove(OVERLAY_KEY).await?;

                tracing::info!(removed, "Cleared server-side history");
                Ok(ClearOutcome {
                    removed,
                    server_side_cleared: true,
                    server_records_kept: false,
                })
            }
            ClearMode::LocalOnly => {
                overlay.hidden.extend(visible.into_iter().map(|e| e.id));
                overlay.appended.clear();
                self.save_overlay(&overlay).await?;

                tracing::warn!(
                    removed,
                    "History hidden locally; server records were not deleted"
                );
                Ok(ClearOutcome {
                    removed,
                    server_side_cleared: false,
                    server_records_kept: true,
                })
            }
        }
    }

    fn backend_type(&self) -> HistoryBackend {
        HistoryBackend::Remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKeyValueStore;
    use crate::test_support::entry;
    use std::time::Duration;

    const LISTING: &str = r#"[
        {"timestamp":"20240501_101500","prediction":"Apple Scab","confidence":0.85,
         "severity":"Moderate","status":"treated","image_url":"/images/20240501_101500.png",
         "report_url":"/reports/20240501_101500.pdf","reportFilename":"20240501_101500.pdf"},
        {"timestamp":"20240502_090000","prediction":"Healthy","confidence":0.97,
         "severity":"N/A","status":"healthy","image_url":"/images/20240502_090000.png",
         "report_url":"/reports/20240502_090000.pdf","reportFilename":"20240502_090000.pdf"}
    ]"#;

    async fn listing_server() -> mockito::ServerGuard {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/history")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(LISTING)
            .create_async()
            .await;
        server
    }

    fn store(server: &mockito::ServerGuard, clear_mode: ClearMode) -> RemoteHistoryStore {
        let client = ApiClient::new(server.url(), None, Duration::from_secs(5)).unwrap();
        RemoteHistoryStore::new(
            client,
            "/history",
            clear_mode,
            Arc::new(MemoryKeyValueStore::new()),
        )
    }

    fn ids(entries: &[HistoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_maps_server_records() {
        let server = listing_server().await;
        let store = store(&server, ClearMode::LocalOnly);

        let entries = store.list().await.unwrap();
        assert_eq!(ids(&entries), vec!["20240501_101500", "20240502_090000"]);

        let scab = &entries[0];
        assert_eq!(scab.result.severity(), Severity::Medium);
        assert_eq!(scab.status, TreatmentStatus::Treated);
        assert_eq!(
            scab.result.artifacts().report_url.as_deref(),
            Some(format!("{}/reports/20240501_101500.pdf", server.url()).as_str())
        );
        assert_eq!(scab.timestamp.format("%Y-%m-%d %H:%M").to_string(), "2024-05-01 10:15");

        assert!(entries[1].result.is_healthy());
        assert_eq!(entries[1].result.severity(), Severity::None);
    }

    #[tokio::test]
    async fn test_append_merges_overlay_and_dedups_server_ids() {
        let server = listing_server().await;
        let store = store(&server, ClearMode::LocalOnly);

        store.append(entry("local-1", "Corn Common Rust")).await.unwrap();
        // Already on the server: acknowledged without duplicating.
        store.append(entry("20240501_101500", "Apple Scab")).await.unwrap();
        assert!(matches!(
            store.append(entry("local-1", "Corn Common Rust")).await,
            Err(HistoryError::DuplicateId(_))
        ));

        let entries = store.list().await.unwrap();
        assert_eq!(
            ids(&entries),
            vec!["20240501_101500", "20240502_090000", "local-1"]
        );
    }

    #[tokio::test]
    async fn test_remove_hides_entries() {
        let server = listing_server().await;
        let store = store(&server, ClearMode::LocalOnly);
        store.append(entry("local-1", "Corn Common Rust")).await.unwrap();

        assert!(store.remove("20240501_101500").await.unwrap());
        assert!(store.remove("local-1").await.unwrap());
        assert!(!store.remove("missing").await.unwrap());

        let entries = store.list().await.unwrap();
        assert_eq!(ids(&entries), vec!["20240502_090000"]);
    }

    #[tokio::test]
    async fn test_local_only_clear_keeps_server_records() {
        let server = listing_server().await;
        let store = store(&server, ClearMode::LocalOnly);

        let outcome = store.clear().await.unwrap();
        assert_eq!(outcome.removed, 2);
        assert!(!outcome.server_side_cleared);
        assert!(outcome.server_records_kept);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remote_clear_calls_delete() {
        let mut server = listing_server().await;
        let delete = server
            .mock("DELETE", "/history")
            .with_status(204)
            .create_async()
            .await;
        let store = store(&server, ClearMode::Remote);

        let outcome = store.clear().await.unwrap();
        assert_eq!(outcome.removed, 2);
        assert!(outcome.server_side_cleared);
        assert!(!outcome.server_records_kept);
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_same_second_records_get_distinct_ids() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/history")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                {"timestamp":"20240501_101500","prediction":"Apple Scab","confidence":0.85,
                 "reportFilename":"20240501_101500.pdf"},
                {"timestamp":"20240501_101500","prediction":"Corn Common Rust","confidence":0.78,
                 "reportFilename":"20240501_101500.pdf"},
                {"prediction":"Healthy","confidence":0.97,"id":"20240501_101500_2"}
            ]"#,
            )
            .create_async()
            .await;
        let store = store(&server, ClearMode::LocalOnly);

        let entries = store.list().await.unwrap();
        let unique: BTreeSet<&str> = ids(&entries).into_iter().collect();
        assert_eq!(unique.len(), entries.len());
        assert_eq!(
            ids(&entries),
            vec!["20240501_101500", "20240501_101500_2", "20240501_101500_2_2"]
        );
        assert_eq!(entries[1].result.record_id(), Some("20240501_101500"));

        // Hiding one of the pair leaves the other visible
        assert!(store.remove("20240501_101500").await.unwrap());
        let remaining = store.list().await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].result.disease_name(), "Corn Common Rust");
    }

    #[tokio::test]
    async fn test_endpoint_failure_is_remote_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/history")
            .with_status(500)
            .with_body(r#"{"error":"boom"}"#)
            .create_async()
            .await;
        let store = store(&server, ClearMode::LocalOnly);

        assert!(matches!(store.list().await, Err(HistoryError::Remote(_))));
    }

    #[test]
    fn test_parse_backend_timestamp() {
        assert!(parse_backend_timestamp("20240501_101500").is_some());
        assert!(parse_backend_timestamp("2024-05-01T10:15:00Z").is_some());
        assert!(parse_backend_timestamp("yesterday").is_none());
    }
}
