//! Declaration parsing.
//!
//! Two shapes are accepted, from local YAML files and registry JSON alike:
//!
//! ```yaml
//! - url: https://example.com/a.safetensors
//!   dest: models/checkpoints/a.safetensors
//! ```
//!
//! or the same list under a `downloads` key. Empty content and an object
//! without `downloads` both normalize to an empty declaration. Entries that
//! lack `url` or `dest`, or whose `dest` would escape the root, are dropped
//! with a warning; the rest of the declaration survives.

use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use super::types::{DeclarationError, FileItem, SourceDeclaration};

/// Normalizes an already-deserialized declaration body.
pub fn parse_declaration(name: &str, body: &Value) -> Result<SourceDeclaration, DeclarationError> {
    let entries: &[Value] = match body {
        Value::Null => &[],
        Value::Array(entries) => entries,
        Value::Object(map) => match map.get("downloads") {
            None | Some(Value::Null) => &[],
            Some(Value::Array(entries)) => entries,
            Some(_) => return Err(DeclarationError::InvalidShape),
        },
        _ => return Err(DeclarationError::InvalidShape),
    };

    let mut declaration = SourceDeclaration::new(name, Vec::with_capacity(entries.len()));

    for (index, entry) in entries.iter().enumerate() {
        match parse_entry(entry) {
            Ok(item) => declaration.items.push(item),
            Err(e) => {
                warn!(source = %name, index, error = %e, "Skipping invalid item");
                declaration
                    .warnings
                    .push(format!("Skipping invalid item #{} in '{}': {}", index + 1, name, e));
            }
        }
    }

    debug!(
        source = %name,
        items = declaration.items.len(),
        dropped = declaration.warnings.len(),
        "Parsed declaration"
    );

    Ok(declaration)
}

/// Parses YAML (or JSON) text into a declaration.
pub fn parse_declaration_text(name: &str, text: &str) -> Result<SourceDeclaration, DeclarationError> {
    if text.trim().is_empty() {
        return Ok(SourceDeclaration::new(name, Vec::new()));
    }

    let body: Value =
        serde_yaml::from_str(text).map_err(|e| DeclarationError::Parse(e.to_string()))?;
    parse_declaration(name, &body)
}

/// Reads a declaration file; the source name is the file stem.
pub fn read_declaration_file(path: &Path) -> Result<SourceDeclaration, DeclarationError> {
    let text = fs::read_to_string(path).map_err(|e| DeclarationError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    parse_declaration_text(&name, &text)
}

fn parse_entry(entry: &Value) -> Result<FileItem, DeclarationError> {
    let field = move |key: &'static str| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or(DeclarationError::MissingField { field: key })
    };

    let url = field("url")?;
    let dest = field("dest")?;
    FileItem::new(url, dest)
}
