//! Per-host credentials for model hosts.

use std::fmt;
use url::Url;

use crate::config::Settings;

const CIVITAI_HOSTS: &[&str] = &["civitai.com"];
const HUGGINGFACE_HOSTS: &[&str] = &["huggingface.co", "hf.co"];

/// API tokens attached to requests for the hosts that need them.
///
/// Civitai takes its token as a `token` query parameter; Hugging Face takes
/// a bearer `Authorization` header.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub civitai_token: Option<String>,
    pub hf_token: Option<String>,
}

impl Credentials {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            civitai_token: settings.civitai_token.clone(),
            hf_token: settings.hf_token.clone(),
        }
    }

    /// Returns `url` with the civitai token appended when it applies.
    pub fn authorize_url(&self, url: &str) -> String {
        let Some(token) = self.civitai_token.as_deref() else {
            return url.to_string();
        };
        let Ok(mut parsed) = Url::parse(url) else {
            return url.to_string();
        };
        if !host_matches(&parsed, CIVITAI_HOSTS) {
            return url.to_string();
        }
        if parsed.query_pairs().any(|(k, _)| k == "token") {
            return url.to_string();
        }
        parsed.query_pairs_mut().append_pair("token", token);
        parsed.into()
    }

    /// `Authorization` header value for `url`, if any.
    pub fn auth_header(&self, url: &str) -> Option<String> {
        let token = self.hf_token.as_deref()?;
        let parsed = Url::parse(url).ok()?;
        host_matches(&parsed, HUGGINGFACE_HOSTS).then(|| format!("Bearer {}", token))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("civitai_token", &self.civitai_token.as_ref().map(|_| "<redacted>"))
            .field("hf_token", &self.hf_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn host_matches(url: &Url, hosts: &[&str]) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    hosts
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
}
