//! Downloads through an external `aria2c` or `wget` process.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use super::credentials::Credentials;
use super::types::{TransferError, TransferExecutor, TransferOutcome};

/// Supported external download tools, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloaderKind {
    Aria2c,
    Wget,
}

impl DownloaderKind {
    pub fn all() -> &'static [DownloaderKind] {
        &[DownloaderKind::Aria2c, DownloaderKind::Wget]
    }

    pub fn program(&self) -> &'static str {
        match self {
            DownloaderKind::Aria2c => "aria2c",
            DownloaderKind::Wget => "wget",
        }
    }
}

/// Transfer executor backed by an external program.
#[derive(Debug, Clone)]
pub struct ExternalDownloader {
    kind: DownloaderKind,
    program: PathBuf,
    credentials: Credentials,
}

impl ExternalDownloader {
    /// Finds the preferred tool on `PATH`.
    pub fn detect(credentials: Credentials) -> Option<Self> {
        let path = std::env::var_os("PATH")?;
        Self::detect_in(&path, credentials)
    }

    /// Finds the preferred tool in an explicit search path.
    pub fn detect_in(search_path: &OsString, credentials: Credentials) -> Option<Self> {
        DownloaderKind::all().iter().find_map(|kind| {
            find_program(search_path, kind.program()).map(|program| {
                debug!(tool = kind.program(), path = %program.display(), "Found downloader");
                Self::with_program(*kind, program, credentials.clone())
            })
        })
    }

    pub fn with_program(kind: DownloaderKind, program: PathBuf, credentials: Credentials) -> Self {
        Self {
            kind,
            program,
            credentials,
        }
    }

    pub fn kind(&self) -> DownloaderKind {
        self.kind
    }

    /// Command-line arguments for fetching `url` into `dest`.
    pub fn build_args(&self, url: &str, dest: &Path) -> Vec<String> {
        let url = self.credentials.authorize_url(url);
        let header = self
            .credentials
            .auth_header(&url)
            .map(|value| format!("--header=Authorization: {}", value));

        let mut args: Vec<String> = Vec::new();
        match self.kind {
            DownloaderKind::Aria2c => {
                let dir = dest.parent().unwrap_or_else(|| Path::new("."));
                let file = dest
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default();
                args.extend(
                    [
                        "-x",
                        "16",
                        "-s",
                        "16",
                        "-k",
                        "1M",
                        "--console-log-level=warn",
                        "-c",
                    ]
                    .map(String::from),
                );
                args.push("-d".into());
                args.push(dir.to_string_lossy().into_owned());
                args.push("-o".into());
                args.push(file);
            }
            DownloaderKind::Wget => {
                args.push("-c".into());
                args.push("-O".into());
                args.push(dest.to_string_lossy().into_owned());
            }
        }
        args.extend(header);
        args.push(url);
        args
    }
}

#[async_trait]
impl TransferExecutor for ExternalDownloader {
    async fn transfer(&self, url: &str, dest: &Path) -> Result<TransferOutcome, TransferError> {
        if dest.is_file() {
            debug!(path = %dest.display(), "Destination exists, skipping");
            return Ok(TransferOutcome::AlreadyPresent);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TransferError::Io {
                    path: parent.to_path_buf(),
                    reason: e.to_string(),
                })?;
        }

        let program = self.kind.program().to_string();
        info!(tool = %program, path = %dest.display(), "Starting download");

        let status = Command::new(&self.program)
            .args(self.build_args(url, dest))
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| TransferError::Spawn {
                program: program.clone(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(TransferError::Failed {
                program,
                code: status.code(),
            });
        }

        Ok(TransferOutcome::Downloaded)
    }
}

fn find_program(search_path: &OsString, name: &str) -> Option<PathBuf> {
    std::env::split_paths(search_path).find_map(|dir| {
        executable_names(name)
            .into_iter()
            .map(|file| dir.join(file))
            .find(|candidate| candidate.is_file())
    })
}

#[cfg(windows)]
fn executable_names(name: &str) -> Vec<String> {
    vec![format!("{}.exe", name), name.to_string()]
}

#[cfg(not(windows))]
fn executable_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn downloader(kind: DownloaderKind, credentials: Credentials) -> ExternalDownloader {
        ExternalDownloader::with_program(kind, PathBuf::from(kind.program()), credentials)
    }

    #[test]
    fn test_aria2c_args() {
        let d = downloader(DownloaderKind::Aria2c, Credentials::default());
        let args = d.build_args("https://example.com/a.bin", Path::new("/root/models/a.bin"));
        assert_eq!(
            args,
            vec![
                "-x", "16", "-s", "16", "-k", "1M", "--console-log-level=warn", "-c", "-d",
                "/root/models", "-o", "a.bin", "https://example.com/a.bin",
            ]
        );
    }

    #[test]
    fn test_wget_args() {
        let d = downloader(DownloaderKind::Wget, Credentials::default());
        let args = d.build_args("https://example.com/a.bin", Path::new("/root/models/a.bin"));
        assert_eq!(args, vec!["-c", "-O", "/root/models/a.bin", "https://example.com/a.bin"]);
    }

    #[test]
    fn test_args_carry_credentials() {
        let creds = Credentials {
            civitai_token: Some("civ".into()),
            hf_token: Some("hf".into()),
        };
        let d = downloader(DownloaderKind::Wget, creds);

        let civitai = d.build_args("https://civitai.com/api/download/models/1", Path::new("/m/a"));
        assert_eq!(
            civitai.last().map(String::as_str),
            Some("https://civitai.com/api/download/models/1?token=civ")
        );

        let hf = d.build_args("https://huggingface.co/o/r/resolve/main/x", Path::new("/m/x"));
        assert!(hf.contains(&"--header=Authorization: Bearer hf".to_string()));
    }

    #[test]
    fn test_detect_prefers_aria2c() {
        let tmp = TempDir::new().unwrap();
        let only_wget = tmp.path().join("a");
        let both = tmp.path().join("b");
        fs::create_dir_all(&only_wget).unwrap();
        fs::create_dir_all(&both).unwrap();
        for name in executable_names("wget") {
            fs::write(only_wget.join(&name), "").unwrap();
        }
        for name in executable_names("aria2c") {
            fs::write(both.join(&name), "").unwrap();
        }

        let path = std::env::join_paths([&only_wget, &both]).unwrap();
        let found = ExternalDownloader::detect_in(&path, Credentials::default()).unwrap();
        assert_eq!(found.kind(), DownloaderKind::Aria2c);

        let path = std::env::join_paths([&only_wget]).unwrap();
        let found = ExternalDownloader::detect_in(&path, Credentials::default()).unwrap();
        assert_eq!(found.kind(), DownloaderKind::Wget);

        let empty = std::env::join_paths([tmp.path()]).unwrap();
        assert!(ExternalDownloader::detect_in(&empty, Credentials::default()).is_none());
    }

    #[tokio::test]
    async fn test_transfer_skips_existing_file() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("a.bin");
        fs::write(&dest, b"data").unwrap();

        let d = ExternalDownloader::with_program(
            DownloaderKind::Wget,
            tmp.path().join("no-such-wget"),
            Credentials::default(),
        );
        let outcome = d.transfer("https://example.com/a.bin", &dest).await.unwrap();
        assert_eq!(outcome, TransferOutcome::AlreadyPresent);
    }

    #[tokio::test]
    async fn test_transfer_reports_spawn_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("nested/dir/a.bin");

        let d = ExternalDownloader::with_program(
            DownloaderKind::Wget,
            tmp.path().join("no-such-wget"),
            Credentials::default(),
        );
        let err = d.transfer("https://example.com/a.bin", &dest).await.unwrap_err();
        assert!(matches!(err, TransferError::Spawn { .. }));
        assert!(tmp.path().join("nested/dir").is_dir());
    }
}
