//! Civitai model-version lookup.
//!
//! Only used to pick a destination folder and a declared size for a single
//! model file; the result is an ordinary [`SourceDeclaration`].

use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::sources::{FileItem, SourceDeclaration};

const API_BASE: &str = "https://civitai.com/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_FOLDER: &str = "models/checkpoints";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CivitaiError {
    #[error("Could not extract a model version ID from '{0}'")]
    InvalidInput(String),

    #[error("403 Forbidden. Is your CIVITAI_TOKEN correct and does it have permission?")]
    Forbidden,

    #[error("Model version {0} not found")]
    VersionNotFound(String),

    #[error("Civitai returned HTTP {0}")]
    Status(u16),

    #[error("Civitai request failed: {0}")]
    Request(String),

    #[error("No files found for this model version")]
    NoFiles,

    #[error("Invalid file data from API: {0}")]
    InvalidFile(String),
}

// ============================================================================
// API payload
// ============================================================================

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelVersion {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub model: ModelInfo,
    #[serde(default)]
    pub files: Vec<ModelFile>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelInfo {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(rename = "type", default = "default_model_type")]
    pub model_type: String,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            model_type: default_model_type(),
        }
    }
}

fn default_model_name() -> String {
    "Unknown Model".to_string()
}

fn default_model_type() -> String {
    "Checkpoint".to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "downloadUrl", default)]
    pub download_url: Option<String>,
    #[serde(rename = "sizeKB", default)]
    pub size_kb: Option<f64>,
    #[serde(default)]
    pub primary: bool,
}

impl ModelFile {
    pub fn size_bytes(&self) -> Option<u64> {
        self.size_kb
            .filter(|kb| kb.is_finite() && *kb > 0.0)
            .map(|kb| (kb * 1024.0).round() as u64)
    }
}

impl ModelVersion {
    /// The file marked primary, else the first one.
    pub fn primary_file(&self) -> Option<&ModelFile> {
        self.files
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.files.first())
    }

    /// One-item declaration placing the primary file in the type's folder.
    pub fn to_declaration(&self) -> Result<SourceDeclaration, CivitaiError> {
        let file = self.primary_file().ok_or(CivitaiError::NoFiles)?;

        let (name, url) = match (&file.name, &file.download_url) {
            (Some(name), Some(url)) if !name.is_empty() && !url.is_empty() => (name, url),
            _ => return Err(CivitaiError::InvalidFile("missing name or downloadUrl".into())),
        };

        let dest = format!("{}/{}", folder_for_model_type(&self.model.model_type), name);
        let item = FileItem::new(url.as_str(), &dest)
            .map_err(|e| CivitaiError::InvalidFile(e.to_string()))?
            .with_size_hint(file.size_bytes());

        Ok(SourceDeclaration::new(&self.model.name, vec![item]))
    }
}

/// ComfyUI folder for a Civitai model type.
pub fn folder_for_model_type(model_type: &str) -> &'static str {
    match model_type {
        "Checkpoint" => "models/checkpoints",
        "LORA" | "LoCon" => "models/loras",
        "TextualInversion" => "models/embeddings",
        "Hypernetwork" => "models/hypernetworks",
        "ControlNet" => "models/controlnet",
        "VAE" => "models/vae",
        "Upscaler" => "models/upscale_models",
        "MotionModule" => "models/animatediff_models",
        _ => DEFAULT_FOLDER,
    }
}

/// Accepts a bare version ID or a URL containing `models/<id>`.
pub fn extract_version_id(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Some(trimmed.to_string());
    }

    static VERSION_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = VERSION_RE
        .get_or_init(|| Regex::new(r"models/(\d+)").ok())
        .as_ref()?;
    re.captures(trimmed).map(|caps| caps[1].to_string())
}

// ============================================================================
// Client
// ============================================================================

pub struct CivitaiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl CivitaiClient {
    pub fn new(token: Option<String>) -> Result<Self, CivitaiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("ComfyDL/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CivitaiError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: API_BASE.to_string(),
            token,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn fetch_model_version(&self, version_id: &str) -> Result<ModelVersion, CivitaiError> {
        let url = format!("{}/model-versions/{}", self.base_url, version_id);
        debug!(url = %url, "Fetching model version");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CivitaiError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::FORBIDDEN => return Err(CivitaiError::Forbidden),
            StatusCode::NOT_FOUND => return Err(CivitaiError::VersionNotFound(version_id.to_string())),
            status if !status.is_success() => return Err(CivitaiError::Status(status.as_u16())),
            _ => {}
        }

        response
            .json::<ModelVersion>()
            .await
            .map_err(|e| CivitaiError::Request(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_extract_version_id() {
        assert_eq!(extract_version_id("12345").as_deref(), Some("12345"));
        assert_eq!(
            extract_version_id("https://civitai.com/api/download/models/67890").as_deref(),
            Some("67890")
        );
        assert_eq!(
            extract_version_id("https://civitai.com/models/111?modelVersionId=2").as_deref(),
            Some("111")
        );
        assert_eq!(extract_version_id("not-an-id"), None);
        assert_eq!(extract_version_id(""), None);
    }

    #[test]
    fn test_folder_mapping() {
        assert_eq!(folder_for_model_type("LORA"), "models/loras");
        assert_eq!(folder_for_model_type("LoCon"), "models/loras");
        assert_eq!(folder_for_model_type("MotionModule"), "models/animatediff_models");
        assert_eq!(folder_for_model_type("Upscaler"), "models/upscale_models");
        assert_eq!(folder_for_model_type("Wildcards"), "models/checkpoints");
    }

    fn version(json: serde_json::Value) -> ModelVersion {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_to_declaration_prefers_primary_file() {
        let v = version(serde_json::json!({
            "id": 9,
            "model": {"name": "Detail Tweaker", "type": "LORA"},
            "files": [
                {"name": "a.pt", "downloadUrl": "https://civitai.com/api/download/models/9?type=a"},
                {"name": "b.safetensors", "downloadUrl": "https://civitai.com/api/download/models/9",
                 "sizeKB": 2.0, "primary": true}
            ]
        }));

        let decl = v.to_declaration().unwrap();
        assert_eq!(decl.name, "Detail Tweaker");
        assert_eq!(decl.items.len(), 1);
        assert_eq!(decl.items[0].dest, PathBuf::from("models/loras/b.safetensors"));
        assert_eq!(decl.items[0].size_hint, Some(2048));
    }

    #[test]
    fn test_to_declaration_defaults() {
        let v = version(serde_json::json!({
            "files": [{"name": "x.ckpt", "downloadUrl": "https://h/x"}]
        }));
        let decl = v.to_declaration().unwrap();
        assert_eq!(decl.name, "Unknown Model");
        assert_eq!(decl.items[0].dest, PathBuf::from("models/checkpoints/x.ckpt"));
        assert_eq!(decl.items[0].size_hint, None);
    }

    #[test]
    fn test_to_declaration_errors() {
        assert_eq!(
            version(serde_json::json!({"files": []})).to_declaration(),
            Err(CivitaiError::NoFiles)
        );
        assert!(matches!(
            version(serde_json::json!({"files": [{"name": "x"}]})).to_declaration(),
            Err(CivitaiError::InvalidFile(_))
        ));
        assert!(matches!(
            version(serde_json::json!({
                "files": [{"name": "../../../etc/x", "downloadUrl": "https://h/x"}]
            }))
            .to_declaration(),
            Err(CivitaiError::InvalidFile(_))
        ));
    }

    /// Serves one canned HTTP response and hands back the request line.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{}", addr), handle)
    }

    #[tokio::test]
    async fn test_fetch_forbidden() {
        let (base, server) = serve_once("403 Forbidden", "{}").await;
        let client = CivitaiClient::new(Some("secret".to_string()))
            .unwrap()
            .with_base_url(base);

        assert_eq!(
            client.fetch_model_version("42").await,
            Err(CivitaiError::Forbidden)
        );
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /model-versions/42 "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let (base, server) = serve_once("404 Not Found", "{}").await;
        let client = CivitaiClient::new(None).unwrap().with_base_url(base);

        assert_eq!(
            client.fetch_model_version("7").await,
            Err(CivitaiError::VersionNotFound("7".to_string()))
        );
        let request = server.await.unwrap();
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_fetch_other_status() {
        let (base, server) = serve_once("500 Internal Server Error", "{}").await;
        let client = CivitaiClient::new(None).unwrap().with_base_url(base);

        assert_eq!(
            client.fetch_model_version("7").await,
            Err(CivitaiError::Status(500))
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_parses_model_version() {
        let body = r#"{"id":99,"model":{"name":"Film Grain","type":"LORA"},"files":[{"name":"grain.safetensors","downloadUrl":"https://civitai.com/api/download/models/99","sizeKB":4.0,"primary":true}]}"#;
        let (base, server) = serve_once("200 OK", body).await;
        let client = CivitaiClient::new(None).unwrap().with_base_url(base);

        let version = client.fetch_model_version("99").await.unwrap();
        server.await.unwrap();

        assert_eq!(version.id, Some(99));
        assert_eq!(version.model.name, "Film Grain");
        assert_eq!(version.model.model_type, "LORA");
        assert_eq!(version.files.len(), 1);
        assert_eq!(version.files[0].size_kb, Some(4.0));

        let decl = version.to_declaration().unwrap();
        assert_eq!(decl.items[0].dest, PathBuf::from("models/loras/grain.safetensors"));
    }
}
