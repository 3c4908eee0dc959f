//! Terminal prompts.

use comfydl_core::ConfirmPolicy;
use dialoguer::{Confirm, MultiSelect};

/// `--yes` skips the prompt; otherwise ask on the terminal, treating
/// prompt errors as a decline.
pub fn confirm_policy(yes: bool) -> ConfirmPolicy {
    if yes {
        ConfirmPolicy::AlwaysProceed
    } else {
        ConfirmPolicy::ask_user(|prompt| {
            Confirm::new()
                .with_prompt(prompt)
                .default(true)
                .interact()
                .unwrap_or(false)
        })
    }
}

/// Lets the user pick any number of names. Empty when cancelled.
pub fn select_sources(names: &[String]) -> anyhow::Result<Vec<String>> {
    let picked = MultiSelect::new()
        .with_prompt("Select model sources to download (space to toggle, enter to confirm)")
        .items(names)
        .interact_opt()?
        .unwrap_or_default();

    Ok(picked.into_iter().map(|i| names[i].clone()).collect())
}
