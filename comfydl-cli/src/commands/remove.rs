//! `comfydl remove`.

use anyhow::Result;
use std::path::PathBuf;

use comfydl_core::{format_bytes, RemovalItemResult, RemovalResult, SourceCatalog};

use crate::context::{relative_to, AppContext};
use crate::prompt::confirm_policy;

pub fn run(ctx: &AppContext, source: &str, root: Option<PathBuf>, yes: bool, dry_run: bool) -> Result<()> {
    let root = ctx.resolve_root(root)?;
    let store = ctx.registry_store();
    let catalog = SourceCatalog::new(ctx.catalog_config(), &store);
    let resolved = catalog.resolve(source)?;

    let planner = ctx.removal_planner();
    let plan = planner.plan(&resolved.declaration, &root)?;

    for skipped in &plan.skipped {
        eprintln!(
            "Warning: skipping {}: {}",
            relative_to(&skipped.path, &root).display(),
            skipped.reason
        );
    }
    for file in &plan.staged {
        println!(
            "  {} ({})",
            relative_to(&file.path, &root).display(),
            format_bytes(file.size)
        );
    }

    ctx.install_interrupt_handler();
    let result = planner.execute(&plan, &confirm_policy(yes), dry_run);
    match &result {
        RemovalResult::DryRun { files, total_size } => {
            println!("Dry run: would delete {} file(s), {}", files, format_bytes(*total_size));
        }
        RemovalResult::NothingToDo => println!("Nothing to remove for '{}'.", plan.source),
        RemovalResult::Aborted => println!("Aborted."),
        RemovalResult::Completed(outcomes) => {
            for outcome in outcomes {
                let path = relative_to(&outcome.path, &root).display();
                match &outcome.result {
                    RemovalItemResult::Deleted => {}
                    RemovalItemResult::Failed(reason) => eprintln!("  ✗ {}: {}", path, reason),
                    RemovalItemResult::NotAttempted => println!("  - {} (interrupted)", path),
                }
            }
            println!("Freed {}", format_bytes(result.freed_bytes()));
            if result.was_interrupted() {
                anyhow::bail!("Removal interrupted");
            }
        }
    }

    Ok(())
}
