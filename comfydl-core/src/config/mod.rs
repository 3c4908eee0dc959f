//! Configuration module for ComfyDL.
//!
//! Settings are stored in SQLite, loaded once per process and handed to
//! every component that needs them.

mod settings;

pub use settings::{Settings, SettingsError, SETTING_KEYS};
