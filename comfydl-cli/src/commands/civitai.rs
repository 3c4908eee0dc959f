//! `comfydl civitai`.

use anyhow::Result;
use std::path::PathBuf;

use comfydl_core::{extract_version_id, CivitaiClient, CivitaiError};

use super::download::install_declaration;
use crate::context::AppContext;
use crate::prompt::confirm_policy;

pub async fn run(ctx: &AppContext, input: &str, root: Option<PathBuf>, yes: bool) -> Result<()> {
    let version_id =
        extract_version_id(input).ok_or_else(|| CivitaiError::InvalidInput(input.to_string()))?;
    let root = ctx.resolve_root(root)?;
    let planner = ctx.download_planner()?;

    println!("Fetching info for model version: {}...", version_id);
    let client = CivitaiClient::new(ctx.settings.civitai_token.clone())?;
    let version = client.fetch_model_version(&version_id).await?;
    println!("Found model: {} ({})", version.model.name, version.model.model_type);

    let declaration = version.to_declaration()?;
    if let Some(item) = declaration.items.first() {
        println!("Target: {}", item.dest_display());
    }

    ctx.install_interrupt_handler();
    if !install_declaration(&planner, &declaration, &root, &confirm_policy(yes)).await? {
        anyhow::bail!("Download did not complete");
    }
    Ok(())
}
