//! Fetching registry payloads.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::RegistryError;

/// Default HTTP request timeout for registry fetches.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Fetches a registry payload.
///
/// Abstracted so registry updates can be tested without network access.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetch and decode the JSON document at `url`.
    async fn fetch(&self, url: &str) -> Result<Value, RegistryError>;
}

/// reqwest-backed [`RegistryClient`].
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    client: reqwest::Client,
}

impl HttpRegistryClient {
    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ComfyDL/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::Fetch {
                url: String::new(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn fetch(&self, url: &str) -> Result<Value, RegistryError> {
        let fetch_error = |reason: String| RegistryError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| fetch_error(format!("invalid JSON: {}", e)))
    }
}
