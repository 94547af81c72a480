//! HTTP client for the LeafGuard diagnosis backend.
//!
//! Provides a minimal client with optional X-API-Key auth,
//! generic GET/POST/DELETE helpers, and domain methods (predict, history, report download).
//! The live provider, the remote history store and the CLI all share this client.

pub mod api;

use anyhow::{Context, Result};
use bytes::Bytes;
use leafguard_core::LeafguardConfig;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Authentication strategy for the backend.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `X-API-Key: {key}`
    XApiKey(String),
}

/// HTTP client for the diagnosis backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Option<Auth>,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Option<Auth>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Create client from configuration. `LEAFGUARD_API_KEY`, when set, is sent as X-API-Key.
    pub fn from_config(config: &LeafguardConfig) -> Result<Self> {
        Self::new(
            config.api_url.clone(),
            config.api_key.clone().map(Auth::XApiKey),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(Auth::XApiKey(key)) => request.header("X-API-Key", key.as_str()),
            None => request,
        }
    }

    /// Turn a non-2xx response into an error carrying the status and body.
    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(anyhow::anyhow!(
            "API request failed with status {}: {}",
            status,
            error_text
        ))
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.build_url(path);
        let mut request = self.apply_auth(self.client.get(&url));

        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.context("Failed to send request")?;
        let response = Self::ensure_success(response).await?;

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// GET request returning the raw body.
    pub async fn get_bytes(&self, path: &str) -> Result<Bytes> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.get(&url));

        let response = request.send().await.context("Failed to send request")?;
        let response = Self::ensure_success(response).await?;

        response
            .bytes()
            .await
            .context("Failed to read response body")
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url).multipart(form));

        let response = request.send().await.context("Failed to send request")?;
        let response = Self::ensure_success(response).await?;

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// DELETE request. Returns Ok(()) on success.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.delete(&url));

        let response = request.send().await.context("Failed to send request")?;
        Self::ensure_success(response).await?;

        Ok(())
    }
}

pub use api::RemoteHistoryRecord;

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str, auth: Option<Auth>) -> ApiClient {
        ApiClient::new(base_url.to_string(), auth, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_build_url() {
        let api = client("http://localhost:8000/", None);
        assert_eq!(api.base_url(), "http://localhost:8000");
        assert_eq!(api.build_url("/predict"), "http://localhost:8000/predict");
        assert_eq!(api.build_url("history"), "http://localhost:8000/history");
    }

    #[tokio::test]
    async fn test_get_sends_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/history")
            .match_header("x-api-key", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let api = client(&server.url(), Some(Auth::XApiKey("secret".to_string())));
        let body: Vec<serde_json::Value> = api.get("/history", &[]).await.unwrap();
        assert!(body.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/history")
            .with_status(405)
            .with_body("Method Not Allowed")
            .create_async()
            .await;

        let api = client(&server.url(), None);
        let err = api.delete("/history").await.unwrap_err().to_string();
        assert!(err.contains("405"));
        assert!(err.contains("Method Not Allowed"));
    }
}
