//! `comfydl download`.

use anyhow::Result;
use std::path::{Path, PathBuf};

use comfydl_core::{
    format_bytes, render_status, CatalogError, ConfirmPolicy, DownloadPlanner, ExecutionResult,
    ItemResult, SourceCatalog, SourceDeclaration,
};

use crate::context::AppContext;
use crate::prompt::{confirm_policy, select_sources};

pub async fn run(ctx: &AppContext, sources: Vec<String>, root: Option<PathBuf>, yes: bool) -> Result<()> {
    let root = ctx.resolve_root(root)?;
    let planner = ctx.download_planner()?;
    let store = ctx.registry_store();
    let catalog = SourceCatalog::new(ctx.catalog_config(), &store);

    let sources = if sources.is_empty() {
        let available: Vec<String> = catalog.list_available()?.into_iter().collect();
        if available.is_empty() {
            println!("No model sources found. Try 'comfydl registry update'.");
            return Ok(());
        }
        let picked = select_sources(&available)?;
        if picked.is_empty() {
            println!("No sources selected.");
            return Ok(());
        }
        picked
    } else {
        sources
    };

    ctx.install_interrupt_handler();
    let policy = confirm_policy(yes);
    let mut failed_sources = 0;

    for name in &sources {
        if ctx.is_interrupted() {
            break;
        }

        let resolved = match catalog.resolve(name) {
            Ok(resolved) => resolved,
            Err(CatalogError::NotFound(_)) => {
                eprintln!("Error: Model source '{}' not found.", name);
                eprintln!("Expected a file path, a name in a source directory, or a registry source.");
                failed_sources += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        println!("\nProcessing: {} ({})", resolved.declaration.name, resolved.origin);
        if !install_declaration(&planner, &resolved.declaration, &root, &policy).await? {
            failed_sources += 1;
        }
    }

    if failed_sources > 0 {
        anyhow::bail!("{} of {} source(s) did not complete", failed_sources, sources.len());
    }
    Ok(())
}

/// Plans, confirms and runs one declaration. Returns false when any item failed.
pub async fn install_declaration(
    planner: &DownloadPlanner,
    declaration: &SourceDeclaration,
    root: &Path,
    policy: &ConfirmPolicy,
) -> Result<bool> {
    if declaration.is_empty() {
        println!("Nothing to download for '{}'.", declaration.name);
        return Ok(true);
    }

    let plan = planner.plan(declaration, root).await?;
    println!("{}", render_status(&plan.status));

    if !plan.is_empty() {
        println!(
            "{} file(s) to download, {}",
            plan.pending.len(),
            plan.pending_total_display()
        );
        if let Some(free) = plan.free_space {
            println!("Free space: {}", format_bytes(free));
        }
    }

    let result = planner.execute(&plan, policy).await;
    match &result {
        ExecutionResult::NothingToDo => println!("All files already installed."),
        ExecutionResult::Aborted => println!("Aborted."),
        ExecutionResult::Completed(outcomes) => {
            for outcome in outcomes {
                let dest = outcome.dest.display();
                match &outcome.result {
                    ItemResult::Transferred => println!("  ✓ {}", dest),
                    ItemResult::AlreadyPresent => println!("  ✓ {} (already present)", dest),
                    ItemResult::Failed(reason) => println!("  ✗ {}: {}", dest, reason),
                    ItemResult::NotAttempted => println!("  - {} (interrupted)", dest),
                }
            }
        }
    }

    Ok(result.failed_count() == 0 && !result.was_interrupted())
}
