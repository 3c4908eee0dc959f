//! Per-invocation state shared by every command.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use comfydl_core::{
    AppPaths, CatalogConfig, Credentials, Database, DownloadPlanner, ExternalDownloader,
    HttpSizeProbe, PlanError, Reconciler, RegistryStore, RemovalPlanner, Settings,
    SystemSpaceProbe,
};

/// Database, settings and the interrupt flag, loaded once per process.
pub struct AppContext {
    pub db: Database,
    pub paths: AppPaths,
    pub settings: Settings,
    pub cancel: Arc<AtomicBool>,
}

impl AppContext {
    pub fn open() -> Result<Self> {
        let paths = AppPaths::from_home()?;
        paths.ensure_dirs_exist()?;

        let db = Database::open_at(paths.database_path())?;
        db.migrate().context("Failed to migrate database")?;
        let settings = Settings::load(&db);

        Ok(Self {
            db,
            paths,
            settings,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn registry_store(&self) -> RegistryStore<'_> {
        RegistryStore::new(&self.db, &self.paths)
    }

    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig::from_settings(&self.settings, &self.paths)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::from_settings(&self.settings)
    }

    /// The target root from `--root` or `COMFYUI_ROOT`; it must exist.
    pub fn resolve_root(&self, arg: Option<PathBuf>) -> Result<PathBuf> {
        let Some(root) = arg.or_else(|| self.settings.comfyui_root.clone()) else {
            bail!(
                "ComfyUI path not specified.\n\
                 Provide it with --root <path>, or set it globally: comfydl set COMFYUI_ROOT <path>"
            );
        };

        if !root.is_dir() {
            return Err(PlanError::RootNotFound(root).into());
        }

        if !root.join("main.py").is_file() {
            eprintln!(
                "Warning: '{}' does not look like a ComfyUI directory (main.py missing).",
                root.display()
            );
        }

        println!("Using ComfyUI path: {}", root.display());
        Ok(root)
    }

    pub fn reconciler(&self) -> Result<Reconciler> {
        let probe = HttpSizeProbe::new(self.credentials())?;
        Ok(Reconciler::new(Arc::new(probe)))
    }

    /// Fails up front when no external downloader is installed.
    pub fn download_planner(&self) -> Result<DownloadPlanner> {
        let downloader =
            ExternalDownloader::detect(self.credentials()).ok_or(PlanError::NoDownloader)?;
        println!("Using downloader: {}", downloader.kind().program());

        Ok(DownloadPlanner::new(
            self.reconciler()?,
            Arc::new(downloader),
            Arc::new(SystemSpaceProbe::new()),
        )
        .with_cancel_flag(self.cancel.clone()))
    }

    pub fn removal_planner(&self) -> RemovalPlanner {
        RemovalPlanner::new().with_cancel_flag(self.cancel.clone())
    }

    /// Sets the interrupt flag on Ctrl-C instead of killing the process.
    pub fn install_interrupt_handler(&self) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::SeqCst);
                eprintln!("\nInterrupted, stopping after the current file.");
            }
        });
    }

    pub fn is_interrupted(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Shortens a path below the root for display.
pub fn relative_to<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}
