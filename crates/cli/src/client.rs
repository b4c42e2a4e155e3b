//! API client for communicating with the analyzer service

use analyzer_lib::RecomputeSummary;
use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Non-success reply from the analyzer
#[derive(Debug, thiserror::Error)]
#[error("API error ({status}): {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

/// API client for the analyzer service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        let url = self.base_url.join(path).context("Invalid path")?;
        debug!(url = %url, "Sending request");
        Ok(url)
    }

    /// Turn error statuses into `ApiError`, preferring the JSON `error` field
    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        debug!(status, url = %response.url(), "Request failed");
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v["error"].as_str().map(str::to_string))
            .unwrap_or(body);
        Err(ApiError { status, message }.into())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path)?)
            .send()
            .await
            .context("Failed to send request")?;

        Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse response")
    }

    /// GET with query parameters
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T> {
        let response = self
            .client
            .get(self.url(path)?)
            .query(query)
            .send()
            .await
            .context("Failed to send request")?;

        Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse response")
    }

    /// POST without a body
    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .post(self.url(path)?)
            .send()
            .await
            .context("Failed to send request")?;

        Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse response")
    }

    /// GET a raw body
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.url(path)?)
            .send()
            .await
            .context("Failed to send request")?;

        let bytes = Self::check(response)
            .await?
            .bytes()
            .await
            .context("Failed to read response body")?;
        Ok(bytes.to_vec())
    }

    /// PUT a raw JSON body
    pub async fn put_json_bytes(&self, path: &str, body: Vec<u8>) -> Result<()> {
        let response = self
            .client
            .put(self.url(path)?)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::check(response).await?;
        Ok(())
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub owners: usize,
    pub records: usize,
    pub generation: u64,
    pub stale: bool,
    #[serde(default)]
    pub last_recompute: Option<RecomputeSummary>,
}
