//! Subcommand handlers.

pub mod civitai;
pub mod config;
pub mod download;
pub mod registry;
pub mod remove;
pub mod status;
