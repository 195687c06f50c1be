//! HTTP client for feature-info requests.

use std::time::Duration;

use futures::future::BoxFuture;
use tracing::trace;

use super::types::{FeatureInfoClient, QueryError};
use crate::feature::FeatureCollection;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Real feature-info client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestFeatureClient {
    client: reqwest::Client,
}

impl ReqwestFeatureClient {
    /// Creates a new client with the default timeout.
    pub fn new() -> Result<Self, QueryError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueryError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn fetch_collection(&self, url: &str) -> Result<FeatureCollection, QueryError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| QueryError::Http(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| QueryError::Http(format!("Failed to read response: {}", e)))?;

        trace!(url, bytes = body.len(), "Feature info response received");
        parse_collection(&body)
    }
}

impl FeatureInfoClient for ReqwestFeatureClient {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FeatureCollection, QueryError>> {
        Box::pin(self.fetch_collection(url))
    }
}

/// Decodes a GeoJSON feature collection.
pub fn parse_collection(body: &[u8]) -> Result<FeatureCollection, QueryError> {
    serde_json::from_slice(body).map_err(|e| QueryError::Parse(e.to_string()))
}
