//! `comfydl registry ...`.

use anyhow::Result;

use comfydl_core::HttpRegistryClient;

use crate::context::AppContext;

pub fn list(ctx: &AppContext) -> Result<()> {
    let store = ctx.registry_store();
    store.ensure_default()?;

    for endpoint in store.list()? {
        let fetched = endpoint
            .fetched_at
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "never fetched".to_string());
        println!("{}  {}  ({})", endpoint.name, endpoint.url, fetched);
    }
    Ok(())
}

pub fn add(ctx: &AppContext, name: &str, url: &str) -> Result<()> {
    ctx.registry_store().add(name, url)?;
    println!("Added registry '{}'. Run 'comfydl registry update {}' to fetch it.", name, name);
    Ok(())
}

pub fn remove(ctx: &AppContext, name: &str) -> Result<()> {
    if ctx.registry_store().remove(name)? {
        println!("Removed registry '{}'.", name);
    } else {
        println!("Registry '{}' not found.", name);
    }
    Ok(())
}

pub async fn update(ctx: &AppContext, name: Option<&str>) -> Result<()> {
    let client = HttpRegistryClient::new()?;
    let report = ctx.registry_store().update(&client, name).await?;

    for updated in &report.updated {
        println!("  ✓ Updated {}", updated);
    }
    for (failed, error) in &report.failed {
        println!("  ✗ Failed to update {}: {}", failed, error);
    }

    if !report.is_success() {
        anyhow::bail!("{} registry update(s) failed", report.failed.len());
    }
    Ok(())
}
