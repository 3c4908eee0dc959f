//! `comfydl set`.

use anyhow::Result;

use crate::context::AppContext;

pub fn set(ctx: &mut AppContext, key: &str, value: &str) -> Result<()> {
    ctx.settings.set_and_save(&ctx.db, key, value)?;
    if value.is_empty() {
        println!("Cleared {}", key.to_uppercase());
    } else {
        println!("Set {} = {}", key.to_uppercase(), value);
    }
    Ok(())
}
