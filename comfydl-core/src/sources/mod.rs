//! Model source declarations and the layered catalog that resolves them.
//!
//! This module provides:
//! - `types` - `FileItem`, `SourceDeclaration`, `ResolutionOrigin` and errors
//! - `dest` - Normalization of declared destination paths
//! - `declaration` - Parsing of declaration bodies into a `SourceDeclaration`
//! - `catalog` - `SourceCatalog`, the precedence chain over all providers

mod catalog;
mod declaration;
mod dest;
mod types;

pub use catalog::{CatalogConfig, SourceCatalog};
pub use declaration::{parse_declaration, parse_declaration_text, read_declaration_file};
pub use dest::normalize_dest;
pub use types::{
    CatalogError, DeclarationError, FileItem, ResolutionOrigin, ResolvedSource,
    SourceDeclaration,
};
