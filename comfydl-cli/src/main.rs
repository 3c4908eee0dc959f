//! ComfyDL CLI - model downloader for ComfyUI.

mod commands;
mod context;
mod prompt;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::context::AppContext;

#[derive(Parser)]
#[command(name = "comfydl")]
#[command(version, about = "Download model files into a ComfyUI installation", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download one or more model sources (interactive selection when none given)
    Download {
        /// Source names or paths to declaration files
        sources: Vec<String>,
        /// ComfyUI root (defaults to COMFYUI_ROOT)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the installation state of model sources
    Status {
        /// Source names (defaults to every available source)
        sources: Vec<String>,
        #[arg(long)]
        root: Option<PathBuf>,
        /// Look up remote sizes of missing files
        #[arg(long)]
        probe: bool,
    },
    /// List available model sources
    List,
    /// Delete the files a model source installed
    Remove {
        source: String,
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(short, long)]
        yes: bool,
        /// Only report what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
    /// Download a model version from Civitai by ID or URL
    Civitai {
        /// Model version ID or a URL containing models/<id>
        input: String,
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(short, long)]
        yes: bool,
    },
    /// Set a configuration value (COMFYUI_ROOT, CIVITAI_TOKEN, HF_TOKEN, ...)
    Set { key: String, value: String },
    /// Manage source registries
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
}

#[derive(Subcommand)]
enum RegistryAction {
    /// List configured registries
    List,
    /// Add a registry, or change the URL of an existing one
    Add { name: String, url: String },
    /// Remove a registry and its cached payload
    Remove { name: String },
    /// Fetch one registry, or all of them
    Update { name: Option<String> },
}

/// `RUST_LOG` when set, otherwise the default level for our crates.
fn log_directives(rust_log: Option<String>, verbose: bool) -> String {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| {
            let level = if verbose { "debug" } else { "info" };
            format!("comfydl={}", level)
        })
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let directives = log_directives(std::env::var(EnvFilter::DEFAULT_ENV).ok(), verbose);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    tracing::debug!("Starting ComfyDL v{}", comfydl_core::VERSION);

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    let mut ctx = AppContext::open()?;

    match command {
        Command::Download { sources, root, yes } => {
            commands::download::run(&ctx, sources, root, yes).await
        }
        Command::Status {
            sources,
            root,
            probe,
        } => commands::status::run(&ctx, sources, root, probe).await,
        Command::List => commands::status::list(&ctx),
        Command::Remove {
            source,
            root,
            yes,
            dry_run,
        } => commands::remove::run(&ctx, &source, root, yes, dry_run),
        Command::Civitai { input, root, yes } => {
            commands::civitai::run(&ctx, &input, root, yes).await
        }
        Command::Set { key, value } => commands::config::set(&mut ctx, &key, &value),
        Command::Registry { action } => match action {
            RegistryAction::List => commands::registry::list(&ctx),
            RegistryAction::Add { name, url } => commands::registry::add(&ctx, &name, &url),
            RegistryAction::Remove { name } => commands::registry::remove(&ctx, &name),
            RegistryAction::Update { name } => {
                commands::registry::update(&ctx, name.as_deref()).await
            }
        },
    }
}
