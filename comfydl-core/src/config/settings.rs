//! Application settings for ComfyDL.
//!
//! Settings are persisted to the SQLite database as JSON.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::db::Database;

/// Database key the serialized settings are stored under.
const SETTINGS_KEY: &str = "settings";

/// Keys accepted by [`Settings::set_value`].
pub const SETTING_KEYS: &[&str] = &[
    "COMFYUI_ROOT",
    "CIVITAI_TOKEN",
    "HF_TOKEN",
    "CUSTOM_SOURCES_DIR",
    "BUNDLED_SOURCES_DIR",
];

/// Errors raised while changing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Unknown configuration key '{key}'. Valid keys: {}", SETTING_KEYS.join(", "))]
    UnknownKey { key: String },
    #[error("Failed to persist settings: {0}")]
    Persist(#[from] anyhow::Error),
}

/// Application settings - persisted to database as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// ComfyUI installation root; every `dest` is relative to it.
    #[serde(default)]
    pub comfyui_root: Option<PathBuf>,

    /// Custom source directory, consulted before the user override directory.
    #[serde(default)]
    pub custom_sources_dir: Option<PathBuf>,

    /// Bundled/working-directory source folder, consulted after the user
    /// override directory. Defaults to `./model_sources` when unset.
    #[serde(default)]
    pub bundled_sources_dir: Option<PathBuf>,

    /// Civitai API token, appended to civitai.com download URLs.
    #[serde(default)]
    pub civitai_token: Option<String>,

    /// Hugging Face token, sent as a bearer header to huggingface.co.
    #[serde(default)]
    pub hf_token: Option<String>,
}

impl Settings {
    /// Load settings from database, using defaults for missing values.
    ///
    /// If settings don't exist or can't be parsed, returns defaults.
    pub fn load(db: &Database) -> Self {
        let mut settings = Self::default();

        match db.get_setting(SETTINGS_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Settings>(&json) {
                Ok(loaded) => settings = loaded,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse settings, using defaults");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read settings, using defaults");
            }
        }

        settings
    }

    /// Save settings to database.
    pub fn save(&self, db: &Database) -> anyhow::Result<()> {
        let json = serde_json::to_string(self)?;
        db.set_setting(SETTINGS_KEY, &json)?;
        Ok(())
    }

    /// Set a value by its user-facing key (e.g. `COMFYUI_ROOT`).
    ///
    /// Key matching is case-insensitive. An empty value clears the setting.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let value = value.trim();
        let text = (!value.is_empty()).then(|| value.to_string());
        let path = text.as_ref().map(PathBuf::from);

        match key.to_ascii_uppercase().as_str() {
            "COMFYUI_ROOT" => self.comfyui_root = path,
            "CUSTOM_SOURCES_DIR" => self.custom_sources_dir = path,
            "BUNDLED_SOURCES_DIR" => self.bundled_sources_dir = path,
            "CIVITAI_TOKEN" => self.civitai_token = text,
            "HF_TOKEN" => self.hf_token = text,
            _ => {
                return Err(SettingsError::UnknownKey {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Set a value and persist the result in one step.
    pub fn set_and_save(
        &mut self,
        db: &Database,
        key: &str,
        value: &str,
    ) -> Result<(), SettingsError> {
        self.set_value(key, value)?;
        self.save(db)?;
        Ok(())
    }

    /// Bundled source directory, falling back to `./model_sources`.
    pub fn bundled_sources_dir(&self) -> PathBuf {
        self.bundled_sources_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("model_sources"))
    }
}
