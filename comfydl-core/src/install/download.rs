//! Download planning and best-effort execution.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::format::format_bytes;
use crate::sources::SourceDeclaration;
use crate::transfer::{SpaceProbe, TransferExecutor, TransferOutcome};

use super::confirm::ConfirmPolicy;
use super::ensure_root;
use super::error::PlanError;
use super::reconcile::Reconciler;
use super::status::{ItemStatus, SourceStatus};

/// What a download run would do, computed before touching anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub root: PathBuf,
    pub status: SourceStatus,
    pub already_installed: Vec<ItemStatus>,
    pub pending: Vec<ItemStatus>,
    /// Sum of known remote sizes of pending items.
    pub pending_total: u64,
    /// Set when any pending size is unknown, so `pending_total` undercounts.
    pub total_is_lower_bound: bool,
    pub free_space: Option<u64>,
    /// Advisory only when the total is a lower bound or free space is unknown.
    pub has_sufficient_space: bool,
}

impl DownloadPlan {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Human-readable pending total, marked when it is a lower bound.
    pub fn pending_total_display(&self) -> String {
        if self.total_is_lower_bound {
            format!("at least {}", format_bytes(self.pending_total))
        } else {
            format_bytes(self.pending_total)
        }
    }

    fn confirmation_prompt(&self) -> String {
        let files = self.pending.len();
        let noun = if files == 1 { "file" } else { "files" };
        match (self.has_sufficient_space, self.free_space) {
            (false, Some(free)) => format!(
                "Not enough free space: need {}, have {}. Download {} {} anyway?",
                self.pending_total_display(),
                format_bytes(free),
                files,
                noun
            ),
            _ => format!("Download {} {} ({})?", files, noun, self.pending_total_display()),
        }
    }
}

/// Per-item result of an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemResult {
    Transferred,
    AlreadyPresent,
    Failed(String),
    /// Skipped because the run was interrupted first.
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub url: String,
    pub dest: PathBuf,
    pub result: ItemResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    NothingToDo,
    Aborted,
    Completed(Vec<ItemOutcome>),
}

impl ExecutionResult {
    pub fn outcomes(&self) -> &[ItemOutcome] {
        match self {
            ExecutionResult::Completed(outcomes) => outcomes,
            _ => &[],
        }
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes()
            .iter()
            .filter(|o| matches!(o.result, ItemResult::Failed(_)))
            .count()
    }

    pub fn was_interrupted(&self) -> bool {
        self.outcomes()
            .iter()
            .any(|o| o.result == ItemResult::NotAttempted)
    }
}

/// Plans and runs downloads for one declaration at a time.
///
/// Transfers run one after another in declaration order. The cancel flag is
/// checked before each transfer; completed files and partial files are left
/// in place.
pub struct DownloadPlanner {
    reconciler: Reconciler,
    transfer: Arc<dyn TransferExecutor>,
    space: Arc<dyn SpaceProbe>,
    cancel: Arc<AtomicBool>,
}

impl DownloadPlanner {
    pub fn new(
        reconciler: Reconciler,
        transfer: Arc<dyn TransferExecutor>,
        space: Arc<dyn SpaceProbe>,
    ) -> Self {
        Self {
            reconciler,
            transfer,
            space,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares an interrupt flag with the caller.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn plan(
        &self,
        declaration: &SourceDeclaration,
        root: &Path,
    ) -> Result<DownloadPlan, PlanError> {
        ensure_root(root)?;

        let status = self.reconciler.reconcile(declaration, root, true).await;
        let (already_installed, pending): (Vec<ItemStatus>, Vec<ItemStatus>) =
            status.items.iter().cloned().partition(|i| i.is_installed);

        let (pending_total, overflowed) = pending
            .iter()
            .filter_map(|i| i.remote_size)
            .fold((0u64, false), |(total, overflowed), size| match total.checked_add(size) {
                Some(sum) => (sum, overflowed),
                None => (u64::MAX, true),
            });
        let total_is_lower_bound =
            overflowed || pending.iter().any(|i| i.remote_size.is_none());
        let free_space = self.space.available_space(root);
        let has_sufficient_space = free_space.map_or(true, |free| free >= pending_total);

        if !has_sufficient_space {
            warn!(
                source = %status.name,
                needed = pending_total,
                available = ?free_space,
                "Insufficient free space"
            );
        }

        Ok(DownloadPlan {
            root: root.to_path_buf(),
            status,
            already_installed,
            pending,
            pending_total,
            total_is_lower_bound,
            free_space,
            has_sufficient_space,
        })
    }

    pub async fn execute(&self, plan: &DownloadPlan, policy: &ConfirmPolicy) -> ExecutionResult {
        if plan.is_empty() {
            info!(source = %plan.status.name, "All files already installed");
            return ExecutionResult::NothingToDo;
        }

        if !policy.confirm(&plan.confirmation_prompt()) {
            info!(source = %plan.status.name, "Download declined");
            return ExecutionResult::Aborted;
        }

        let mut outcomes = Vec::with_capacity(plan.pending.len());
        for item in &plan.pending {
            let result = if self.cancel.load(Ordering::SeqCst) {
                ItemResult::NotAttempted
            } else {
                match self.transfer.transfer(&item.url, &item.path).await {
                    Ok(TransferOutcome::Downloaded) => ItemResult::Transferred,
                    Ok(TransferOutcome::AlreadyPresent) => ItemResult::AlreadyPresent,
                    Err(e) => {
                        warn!(dest = %item.dest_display(), error = %e, "Transfer failed");
                        ItemResult::Failed(e.to_string())
                    }
                }
            };
            outcomes.push(ItemOutcome {
                url: item.url.clone(),
                dest: item.dest.clone(),
                result,
            });
        }

        if self.cancel.load(Ordering::SeqCst) {
            warn!(source = %plan.status.name, "Download interrupted");
        }

        ExecutionResult::Completed(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::reconcile::tests::TableProbe;
    use crate::sources::FileItem;
    use crate::transfer::TransferError;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records calls and writes a small file, failing for URLs containing "fail".
    #[derive(Default)]
    struct RecordingTransfer {
        calls: Mutex<Vec<String>>,
        cancel_after_first: Option<Arc<AtomicBool>>,
    }

    #[async_trait]
    impl TransferExecutor for RecordingTransfer {
        async fn transfer(&self, url: &str, dest: &Path) -> Result<TransferOutcome, TransferError> {
            self.calls.lock().unwrap().push(url.to_string());
            if let Some(flag) = &self.cancel_after_first {
                flag.store(true, Ordering::SeqCst);
            }
            if url.contains("fail") {
                return Err(TransferError::Failed {
                    program: "mock".into(),
                    code: Some(1),
                });
            }
            if dest.is_file() {
                return Ok(TransferOutcome::AlreadyPresent);
            }
            fs::create_dir_all(dest.parent().unwrap()).unwrap();
            fs::write(dest, b"downloaded").unwrap();
            Ok(TransferOutcome::Downloaded)
        }
    }

    struct FixedSpace(Option<u64>);

    impl SpaceProbe for FixedSpace {
        fn available_space(&self, _path: &Path) -> Option<u64> {
            self.0
        }
    }

    fn planner(
        probe: TableProbe,
        transfer: Arc<RecordingTransfer>,
        space: Option<u64>,
    ) -> DownloadPlanner {
        DownloadPlanner::new(
            Reconciler::new(Arc::new(probe)),
            transfer,
            Arc::new(FixedSpace(space)),
        )
    }

    fn declaration(entries: &[(&str, &str)]) -> SourceDeclaration {
        SourceDeclaration::new(
            "test",
            entries
                .iter()
                .map(|(url, dest)| FileItem::new(*url, dest).unwrap())
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_missing_file_is_transferred_once() {
        let tmp = TempDir::new().unwrap();
        let transfer = Arc::new(RecordingTransfer::default());
        let planner = planner(
            TableProbe::with(&[("http://x/a.bin", 10)]),
            transfer.clone(),
            None,
        );
        let decl = declaration(&[("http://x/a.bin", "models/checkpoints/a.bin")]);

        let plan = planner.plan(&decl, tmp.path()).await.unwrap();
        assert!(!plan.status.items[0].is_installed);
        assert_eq!(plan.pending.len(), 1);
        assert_eq!(plan.pending[0].dest, PathBuf::from("models/checkpoints/a.bin"));

        let result = planner.execute(&plan, &ConfirmPolicy::AlwaysProceed).await;
        assert_eq!(*transfer.calls.lock().unwrap(), vec!["http://x/a.bin"]);
        assert_eq!(result.outcomes()[0].result, ItemResult::Transferred);
        assert!(tmp.path().join("models/checkpoints/a.bin").is_file());
    }

    #[tokio::test]
    async fn test_present_file_is_nothing_to_do() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("models/checkpoints/a.bin");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, b"x").unwrap();
        let transfer = Arc::new(RecordingTransfer::default());
        let planner = planner(TableProbe::default(), transfer.clone(), None);
        let decl = declaration(&[("http://x/a.bin", "models/checkpoints/a.bin")]);

        let plan = planner.plan(&decl, tmp.path()).await.unwrap();
        assert!(plan.pending.is_empty());
        assert_eq!(plan.already_installed.len(), 1);

        let result = planner.execute(&plan, &ConfirmPolicy::AlwaysProceed).await;
        assert_eq!(result, ExecutionResult::NothingToDo);
        assert!(transfer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let transfer = Arc::new(RecordingTransfer::default());
        let planner = planner(TableProbe::default(), transfer.clone(), None);
        let decl = declaration(&[("http://x/a", "m/a"), ("http://x/b", "m/b")]);

        let first = planner.plan(&decl, tmp.path()).await.unwrap();
        planner.execute(&first, &ConfirmPolicy::AlwaysProceed).await;
        let second = planner.plan(&decl, tmp.path()).await.unwrap();
        let result = planner.execute(&second, &ConfirmPolicy::AlwaysProceed).await;

        assert_eq!(result, ExecutionResult::NothingToDo);
        assert_eq!(transfer.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let tmp = TempDir::new().unwrap();
        let transfer = Arc::new(RecordingTransfer::default());
        let planner = planner(TableProbe::default(), transfer.clone(), None);
        let decl = declaration(&[
            ("http://x/a", "m/a"),
            ("http://x/fail", "m/fail"),
            ("http://x/c", "m/c"),
        ]);

        let plan = planner.plan(&decl, tmp.path()).await.unwrap();
        let result = planner.execute(&plan, &ConfirmPolicy::AlwaysProceed).await;

        let results: Vec<&ItemResult> = result.outcomes().iter().map(|o| &o.result).collect();
        assert_eq!(results[0], &ItemResult::Transferred);
        assert!(matches!(results[1], ItemResult::Failed(_)));
        assert_eq!(results[2], &ItemResult::Transferred);
        assert_eq!(result.failed_count(), 1);
        assert_eq!(transfer.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_decline_aborts_without_side_effects() {
        let tmp = TempDir::new().unwrap();
        let transfer = Arc::new(RecordingTransfer::default());
        let planner = planner(TableProbe::default(), transfer.clone(), None);
        let decl = declaration(&[("http://x/a", "m/a")]);

        let plan = planner.plan(&decl, tmp.path()).await.unwrap();
        let result = planner.execute(&plan, &ConfirmPolicy::ask_user(|_| false)).await;

        assert_eq!(result, ExecutionResult::Aborted);
        assert!(transfer.calls.lock().unwrap().is_empty());
        assert!(!tmp.path().join("m").exists());
    }

    #[tokio::test]
    async fn test_interrupt_stops_before_next_item() {
        let tmp = TempDir::new().unwrap();
        let cancel = Arc::new(AtomicBool::new(false));
        let transfer = Arc::new(RecordingTransfer {
            calls: Mutex::default(),
            cancel_after_first: Some(cancel.clone()),
        });
        let planner = planner(TableProbe::default(), transfer.clone(), None)
            .with_cancel_flag(cancel);
        let decl = declaration(&[("http://x/a", "m/a"), ("http://x/b", "m/b")]);

        let plan = planner.plan(&decl, tmp.path()).await.unwrap();
        let result = planner.execute(&plan, &ConfirmPolicy::AlwaysProceed).await;

        assert_eq!(transfer.calls.lock().unwrap().len(), 1);
        assert_eq!(result.outcomes()[1].result, ItemResult::NotAttempted);
        assert!(result.was_interrupted());
        assert!(tmp.path().join("m/a").is_file());
    }

    #[tokio::test]
    async fn test_unknown_sizes_make_total_a_lower_bound() {
        let tmp = TempDir::new().unwrap();
        let planner = planner(
            TableProbe::with(&[("http://x/a", 100)]),
            Arc::new(RecordingTransfer::default()),
            Some(150),
        );
        let decl = declaration(&[("http://x/a", "m/a"), ("http://x/b", "m/b")]);

        let plan = planner.plan(&decl, tmp.path()).await.unwrap();
        assert_eq!(plan.pending_total, 100);
        assert!(plan.total_is_lower_bound);
        assert!(plan.has_sufficient_space);
        assert_eq!(plan.pending_total_display(), "at least 100 B");
    }

    #[tokio::test]
    async fn test_oversized_totals_saturate_instead_of_wrapping() {
        let tmp = TempDir::new().unwrap();
        let planner = planner(
            TableProbe::with(&[("http://x/a", u64::MAX), ("http://x/b", 2)]),
            Arc::new(RecordingTransfer::default()),
            Some(1000),
        );
        let decl = declaration(&[("http://x/a", "m/a"), ("http://x/b", "m/b")]);

        let plan = planner.plan(&decl, tmp.path()).await.unwrap();
        assert_eq!(plan.pending_total, u64::MAX);
        assert!(plan.total_is_lower_bound);
        assert!(!plan.has_sufficient_space);
    }

    #[tokio::test]
    async fn test_insufficient_space_still_asks() {
        let tmp = TempDir::new().unwrap();
        let transfer = Arc::new(RecordingTransfer::default());
        let planner = planner(
            TableProbe::with(&[("http://x/a", 5000)]),
            transfer.clone(),
            Some(1000),
        );
        let decl = declaration(&[("http://x/a", "m/a")]);

        let plan = planner.plan(&decl, tmp.path()).await.unwrap();
        assert!(!plan.has_sufficient_space);
        assert!(!plan.total_is_lower_bound);

        let asked = Arc::new(Mutex::new(String::new()));
        let seen = asked.clone();
        let policy = ConfirmPolicy::ask_user(move |prompt| {
            *seen.lock().unwrap() = prompt.to_string();
            true
        });
        planner.execute(&plan, &policy).await;

        assert!(asked.lock().unwrap().starts_with("Not enough free space"));
        assert_eq!(transfer.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_free_space_counts_as_sufficient() {
        let tmp = TempDir::new().unwrap();
        let planner = planner(
            TableProbe::with(&[("http://x/a", u64::MAX)]),
            Arc::new(RecordingTransfer::default()),
            None,
        );
        let plan = planner
            .plan(&declaration(&[("http://x/a", "m/a")]), tmp.path())
            .await
            .unwrap();
        assert!(plan.has_sufficient_space);
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("nope");
        let transfer = Arc::new(RecordingTransfer::default());
        let planner = planner(TableProbe::default(), transfer.clone(), None);

        let err = planner
            .plan(&declaration(&[("http://x/a", "m/a")]), &root)
            .await
            .unwrap_err();
        assert_eq!(err, PlanError::RootNotFound(root));
    }

    #[tokio::test]
    async fn test_empty_declaration_is_nothing_to_do() {
        let tmp = TempDir::new().unwrap();
        let planner = planner(
            TableProbe::default(),
            Arc::new(RecordingTransfer::default()),
            None,
        );
        let plan = planner
            .plan(&SourceDeclaration::new("empty", vec![]), tmp.path())
            .await
            .unwrap();
        assert_eq!(
            planner.execute(&plan, &ConfirmPolicy::AlwaysProceed).await,
            ExecutionResult::NothingToDo
        );
    }
}
