//! `comfydl status` and `comfydl list`.

use anyhow::Result;
use std::path::PathBuf;

use comfydl_core::{render_status, CatalogError, Reconciler, SourceCatalog};

use crate::context::AppContext;

pub async fn run(ctx: &AppContext, sources: Vec<String>, root: Option<PathBuf>, probe: bool) -> Result<()> {
    let root = ctx.resolve_root(root)?;
    let reconciler = ctx.reconciler()?;
    let store = ctx.registry_store();
    let catalog = SourceCatalog::new(ctx.catalog_config(), &store);

    let names: Vec<String> = if sources.is_empty() {
        catalog.list_available()?.into_iter().collect()
    } else {
        sources
    };

    for name in &names {
        let resolved = match catalog.resolve(name) {
            Ok(resolved) => resolved,
            Err(CatalogError::NotFound(_)) => {
                eprintln!("✗ {}  not found", name);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let status = if probe {
            reconciler.reconcile(&resolved.declaration, &root, true).await
        } else {
            Reconciler::reconcile_local(&resolved.declaration, &root)
        };
        println!("{}", render_status(&status));
    }

    Ok(())
}

pub fn list(ctx: &AppContext) -> Result<()> {
    let store = ctx.registry_store();
    let catalog = SourceCatalog::new(ctx.catalog_config(), &store);
    let names = catalog.list_available()?;

    if names.is_empty() {
        println!("No model sources found. Try 'comfydl registry update'.");
        return Ok(());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}
