use std::fmt;

/// Decides whether a destructive or costly step may go ahead.
pub enum ConfirmPolicy {
    /// Never ask.
    AlwaysProceed,
    /// Ask with a prompt; `true` means proceed.
    AskUser(Box<dyn Fn(&str) -> bool + Send + Sync>),
}

impl ConfirmPolicy {
    pub fn ask_user<F>(prompt: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        ConfirmPolicy::AskUser(Box::new(prompt))
    }

    pub fn confirm(&self, prompt: &str) -> bool {
        match self {
            ConfirmPolicy::AlwaysProceed => true,
            ConfirmPolicy::AskUser(ask) => ask(prompt),
        }
    }
}

impl fmt::Debug for ConfirmPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmPolicy::AlwaysProceed => f.write_str("AlwaysProceed"),
            ConfirmPolicy::AskUser(_) => f.write_str("AskUser(..)"),
        }
    }
}
