//! Remote size lookup over HTTP.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use std::time::Duration;
use tracing::debug;

use super::credentials::Credentials;
use super::types::{ProbeError, SizeProbe};

/// Upper bound on size requests in flight at once.
pub const MAX_CONCURRENT_PROBES: usize = 4;

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Issues `HEAD` requests, following redirects, and reads `Content-Length`.
pub struct HttpSizeProbe {
    client: reqwest::Client,
    credentials: Credentials,
}

impl HttpSizeProbe {
    pub fn new(credentials: Credentials) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .user_agent(concat!("ComfyDL/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProbeError::Request(e.to_string()))?;
        Ok(Self {
            client,
            credentials,
        })
    }
}

#[async_trait]
impl SizeProbe for HttpSizeProbe {
    async fn remote_size(&self, url: &str) -> Result<Option<u64>, ProbeError> {
        let target = self.credentials.authorize_url(url);
        let mut request = self.client.head(&target);
        if let Some(value) = self.credentials.auth_header(&target) {
            request = request.header(AUTHORIZATION, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        // HEAD responses carry no body, so read the header rather than the body length.
        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_length);

        debug!(url = %url, size = ?size, "Probed remote size");
        Ok(size)
    }
}

fn parse_content_length(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|size| *size > 0)
}
