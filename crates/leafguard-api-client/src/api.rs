//! Domain methods for the diagnosis backend.
//!
//! The prediction payload is returned as raw JSON because its shape varies between
//! backend revisions; normalization happens in the providers crate.

use crate::ApiClient;
use anyhow::{Context, Result};
use bytes::Bytes;
use leafguard_core::models::SelectedFile;

/// One record of the remote history listing.
///
/// Every field is optional: older backends wrote `disease`/`image` with a percentage
/// confidence, newer ones write `prediction`/`image_url` with a fraction.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RemoteHistoryRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, alias = "disease")]
    pub prediction: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub prevention: Option<String>,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default, alias = "pdf_url")]
    pub report_url: Option<String>,
    #[serde(default, rename = "reportFilename")]
    pub report_filename: Option<String>,
}

/// Ids were written as numbers (millisecond timestamps) by older clients.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl ApiClient {
    /// Upload one image as the single multipart field `file` and return the raw payload.
    pub async fn predict(&self, path: &str, file: &SelectedFile) -> Result<serde_json::Value> {
        let part = reqwest::multipart::Part::bytes(file.data.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .with_context(|| format!("Invalid content type: {}", file.content_type))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::debug!(
            path = %path,
            file_name = %file.file_name,
            size_bytes = file.size_bytes(),
            "Submitting image for diagnosis"
        );

        self.post_multipart(path, form).await
    }

    /// List past diagnoses recorded by the backend, in the order it returns them.
    pub async fn list_history(&self, path: &str) -> Result<Vec<RemoteHistoryRecord>> {
        self.get(path, &[]).await
    }

    /// Ask the backend to delete its recorded diagnoses.
    pub async fn clear_history(&self, path: &str) -> Result<()> {
        self.delete(path).await
    }

    /// Download a generated PDF report by file name.
    pub async fn download_report(&self, filename: &str) -> Result<Bytes> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return Err(anyhow::anyhow!("Invalid report file name: {}", filename));
        }

        self.get_bytes(&format!("/download/pdf/{}", urlencoding::encode(filename)))
            .await
            .with_context(|| format!("Failed to download report {}", filename))
    }

    /// Resolve an artifact reference returned by the backend into an absolute URL.
    pub fn resolve_url(&self, reference: &str) -> String {
        if reference.starts_with("http://")
            || reference.starts_with("https://")
            || reference.starts_with("data:")
        {
            reference.to_string()
        } else {
            self.build_url(reference)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(base_url.to_string(), None, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_predict_posts_multipart_file() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_header(
                "content-type",
                mockito::Matcher::Regex("multipart/form-data".to_string()),
            )
            .match_body(mockito::Matcher::Regex(r#"name="file""#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"prediction":"Apple Scab","confidence":0.85}"#)
            .create_async()
            .await;

        let file = SelectedFile::new("leaf.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]);
        let payload = client(&server.url()).predict("/predict", &file).await.unwrap();

        assert_eq!(payload["prediction"], "Apple Scab");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_history_accepts_both_record_shapes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/history")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"timestamp":"20240501_101500","prediction":"Apple Scab","confidence":0.85,
                     "severity":"Moderate","status":"treated","image_url":"/images/20240501_101500.png",
                     "report_url":"/reports/20240501_101500.pdf","reportFilename":"20240501_101500.pdf"},
                    {"id":3,"disease":"Healthy","confidence":98}
                ]"#,
            )
            .create_async()
            .await;

        let records = client(&server.url()).list_history("/history").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].report_filename.as_deref(), Some("20240501_101500.pdf"));
        assert_eq!(records[0].severity.as_deref(), Some("Moderate"));
        assert_eq!(records[1].id.as_deref(), Some("3"));
        assert_eq!(records[1].prediction.as_deref(), Some("Healthy"));
    }

    #[tokio::test]
    async fn test_list_history_legacy_record() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/history")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"3","disease":"Healthy","confidence":98,"image":"/images/a.png"}]"#)
            .create_async()
            .await;

        let records = client(&server.url()).list_history("/history").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].prediction.as_deref(), Some("Healthy"));
        assert_eq!(records[0].image_url.as_deref(), Some("/images/a.png"));
        assert_eq!(records[0].confidence, Some(98.0));
    }

    #[tokio::test]
    async fn test_download_report() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/download/pdf/20240501_101500.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.4")
            .create_async()
            .await;

        let api = client(&server.url());
        let bytes = api.download_report("20240501_101500.pdf").await.unwrap();
        assert_eq!(bytes.as_ref(), b"%PDF-1.4");

        assert!(api.download_report("../secrets.pdf").await.is_err());
    }

    #[tokio::test]
    async fn test_download_missing_report() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/download/pdf/missing.pdf")
            .with_status(404)
            .with_body(r#"{"error":"PDF not found"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .download_report("missing.pdf")
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("404"));
    }

    #[test]
    fn test_resolve_url() {
        let api = client("http://localhost:8000");
        assert_eq!(
            api.resolve_url("/reports/a.pdf"),
            "http://localhost:8000/reports/a.pdf"
        );
        assert_eq!(
            api.resolve_url("https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
    }
}
