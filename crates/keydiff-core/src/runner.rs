//! Run controller: drives the matrix through both testers and owns all
//! run-scoped state.
//!
//! Cases run sequentially (reference, then target) in enumeration order.
//! The accumulated results are snapshotted every `save_interval` processed
//! cases and once more when the run ends, whether it completed or was
//! interrupted.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::classify::{ClassifiedResult, KeyStatusAggregate, Summary};
use crate::config::RunConfig;
use crate::error::Result;
use crate::exec::Executor;
use crate::matrix::TestCase;
use crate::report::ArtifactWriter;
use crate::target::TargetDescriptor;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Interrupted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// Receives periodic progress updates.
pub trait ProgressSink {
    fn progress(&mut self, processed: usize, total: usize);
}

/// Discards progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&mut self, _processed: usize, _total: usize) {}
}

/// What a finished run looked like.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: RunState,
    /// Cases in the requested window
    pub total: usize,
    pub summary: Summary,
    pub keys: KeyStatusAggregate,
}

impl RunReport {
    #[must_use]
    pub fn processed(&self) -> usize {
        self.summary.total
    }
}

/// Owns the result list, the key aggregate and the artifacts for one run.
#[derive(Debug)]
pub struct RunController {
    reference: Arc<dyn TargetDescriptor>,
    target: Arc<dyn TargetDescriptor>,
    executor: Executor,
    artifacts: ArtifactWriter,
    save_interval: usize,
    progress_interval: usize,
    state: RunState,
    results: Vec<ClassifiedResult>,
    keys: KeyStatusAggregate,
    summary: Summary,
}

impl RunController {
    #[must_use]
    pub fn new(
        reference: Arc<dyn TargetDescriptor>,
        target: Arc<dyn TargetDescriptor>,
        executor: Executor,
        artifacts: ArtifactWriter,
    ) -> Self {
        let defaults = RunConfig::default();
        Self {
            reference,
            target,
            executor,
            artifacts,
            save_interval: defaults.save_interval,
            progress_interval: defaults.progress_interval,
            state: RunState::Idle,
            results: Vec::new(),
            keys: KeyStatusAggregate::new(),
            summary: Summary::default(),
        }
    }

    /// Snapshot and progress cadence, in processed cases. Zero is treated
    /// as one.
    #[must_use]
    pub fn with_intervals(mut self, save_interval: usize, progress_interval: usize) -> Self {
        self.save_interval = save_interval.max(1);
        self.progress_interval = progress_interval.max(1);
        self
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn results(&self) -> &[ClassifiedResult] {
        &self.results
    }

    #[must_use]
    pub fn keys(&self) -> &KeyStatusAggregate {
        &self.keys
    }

    #[must_use]
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    #[must_use]
    pub fn artifacts(&self) -> &ArtifactWriter {
        &self.artifacts
    }

    /// Run every case in `cases` until exhaustion or until `shutdown`
    /// resolves. The case in flight when `shutdown` fires is abandoned
    /// (its child processes are killed) and not recorded.
    ///
    /// Only a failure to write the final snapshot is returned as an error.
    pub async fn run<I, S>(
        &mut self,
        cases: I,
        shutdown: S,
        progress: &mut dyn ProgressSink,
    ) -> Result<RunReport>
    where
        I: IntoIterator<Item = TestCase>,
        I::IntoIter: ExactSizeIterator,
        S: Future<Output = ()>,
    {
        let cases = cases.into_iter();
        let total = cases.len();
        tokio::pin!(shutdown);

        self.state = RunState::Running;
        info!(
            target_name = self.target.name(),
            total, "Starting differential run"
        );

        for case in cases {
            let outcome = tokio::select! {
                biased;
                () = &mut shutdown => None,
                result = self.execute(case) => Some(result),
            };
            let Some(result) = outcome else {
                self.state = RunState::Interrupted;
                info!(processed = self.results.len(), "Run interrupted");
                break;
            };

            self.record(result);
            let processed = self.results.len();
            if processed % self.progress_interval == 0 {
                progress.progress(processed, total);
            }
            if processed % self.save_interval == 0 {
                if let Err(err) = self.artifacts.snapshot(&self.results) {
                    warn!(error = %err, processed, "Periodic snapshot failed");
                }
            }
        }

        if self.state == RunState::Running {
            self.state = RunState::Completed;
        }
        self.artifacts.snapshot(&self.results)?;
        info!(
            state = %self.state,
            processed = self.results.len(),
            mismatches = self.summary.mismatches,
            errors = self.summary.errors,
            "Run finished"
        );

        Ok(RunReport {
            state: self.state,
            total,
            summary: self.summary,
            keys: self.keys.clone(),
        })
    }

    async fn execute(&self, case: TestCase) -> ClassifiedResult {
        let reference_args = self.reference.invocation(&case);
        let reference = self
            .executor
            .invoke(self.reference.executable(), &reference_args)
            .await;

        let target_args = self.target.invocation(&case);
        let target = self
            .executor
            .invoke(self.target.executable(), &target_args)
            .await;

        ClassifiedResult::from_raw(case, reference, target, self.target.as_ref())
    }

    fn record(&mut self, result: ClassifiedResult) {
        if result.status.is_match() {
            trace!(combo = %result.combo(), "Match");
        } else {
            debug!(
                combo = %result.combo(),
                status = %result.status,
                reference_out = %result.reference_out,
                target_out = %result.target_out,
                "Non-match"
            );
        }
        self.keys.record(&result.case.key.name, result.status);
        self.summary.record(result.status);
        self.results.push(result);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::classify::Status;
    use crate::keys::{KeyCatalog, KeyDescriptor};
    use crate::matrix::{Matrix, ProtocolFlags};
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Runs an inline shell snippet; the key name is exported as `$KEY`.
    #[derive(Debug)]
    struct ShellTarget {
        name: &'static str,
        script: &'static str,
        fallback: Option<&'static str>,
        sh: PathBuf,
    }

    impl ShellTarget {
        fn new(name: &'static str, script: &'static str) -> Self {
            Self {
                name,
                script,
                fallback: None,
                sh: PathBuf::from("/bin/sh"),
            }
        }
    }

    impl TargetDescriptor for ShellTarget {
        fn name(&self) -> &str {
            self.name
        }

        fn executable(&self) -> &Path {
            &self.sh
        }

        fn build_invocation(&self, _base: Vec<String>, case: &TestCase) -> Vec<String> {
            vec![
                "-c".to_string(),
                self.script.to_string(),
                "sh".to_string(),
                case.key.name.clone(),
                case.flags.to_string(),
            ]
        }

        fn is_fallback_output(&self, normalized: &str) -> bool {
            self.fallback == Some(normalized)
        }
    }

    #[derive(Default)]
    struct Recorded(Vec<(usize, usize)>);

    impl ProgressSink for Recorded {
        fn progress(&mut self, processed: usize, total: usize) {
            self.0.push((processed, total));
        }
    }

    fn two_key_matrix(flags: u8) -> Matrix {
        Matrix::new(
            &KeyCatalog::from_keys(vec![KeyDescriptor::new("a", 38), KeyDescriptor::new("b", 56)]),
            vec![Vec::new()],
            vec![Vec::new()],
            (0..flags).filter_map(ProtocolFlags::new).collect(),
        )
    }

    fn controller(
        dir: &TempDir,
        reference: ShellTarget,
        target: ShellTarget,
    ) -> RunController {
        RunController::new(
            Arc::new(reference),
            Arc::new(target),
            Executor::new(Duration::from_secs(5)),
            ArtifactWriter::new(
                dir.path().join("results.json"),
                dir.path().join("mismatches.log"),
                "fake",
            ),
        )
    }

    #[tokio::test]
    async fn completed_run_classifies_every_case() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(
            &dir,
            ShellTarget::new("kitty", r#"printf '%s' "$1""#),
            ShellTarget::new("fake", r#"if [ "$1" = b ]; then printf x; else printf '%s' "$1"; fi"#),
        );
        assert_eq!(ctl.state(), RunState::Idle);

        let report = ctl
            .run(two_key_matrix(2).generate(None, None), std::future::pending(), &mut NoProgress)
            .await
            .unwrap();

        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.total, 4);
        assert_eq!(report.processed(), 4);
        assert_eq!(report.summary.matches, 2);
        assert_eq!(report.summary.mismatches, 2);
        assert_eq!(report.keys.is_passing("a"), Some(true));
        assert_eq!(report.keys.is_passing("b"), Some(false));

        let order: Vec<_> = ctl.results().iter().map(|r| r.combo()).collect();
        assert_eq!(
            order,
            vec![
                "Key: a, Flags: 0",
                "Key: a, Flags: 1",
                "Key: b, Flags: 0",
                "Key: b, Flags: 1"
            ]
        );
        assert!(dir.path().join("results.json").exists());
        let log = std::fs::read_to_string(dir.path().join("mismatches.log")).unwrap();
        assert!(log.starts_with("Found 2 mismatches for target 'fake'."));
    }

    #[tokio::test]
    async fn fallback_and_errors_do_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        let mut target = ShellTarget::new(
            "fake",
            r#"if [ "$1" = a ]; then printf '[LEGACY_FALLBACK]'; else echo boom >&2; exit 2; fi"#,
        );
        target.fallback = Some("[LEGACY_FALLBACK]");
        let mut ctl = controller(&dir, ShellTarget::new("kitty", "printf z"), target);

        let report = ctl
            .run(two_key_matrix(1).generate(None, None), std::future::pending(), &mut NoProgress)
            .await
            .unwrap();
        assert_eq!(report.summary.skipped_target_fallback, 1);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(ctl.results()[1].status, Status::Error);
        assert_eq!(
            ctl.results()[1].target_out,
            "[ERROR: Exit code 2, Stderr: boom]"
        );
    }

    #[tokio::test]
    async fn progress_reported_at_interval() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(
            &dir,
            ShellTarget::new("kitty", "printf a"),
            ShellTarget::new("fake", "printf a"),
        )
        .with_intervals(100, 2);

        let mut sink = Recorded::default();
        ctl.run(two_key_matrix(3).generate(None, None), std::future::pending(), &mut sink)
            .await
            .unwrap();
        assert_eq!(sink.0, vec![(2, 6), (4, 6), (6, 6)]);
    }

    #[tokio::test]
    async fn shutdown_before_start_interrupts_with_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(
            &dir,
            ShellTarget::new("kitty", "printf a"),
            ShellTarget::new("fake", "printf a"),
        );
        let report = ctl
            .run(two_key_matrix(2).generate(None, None), std::future::ready(()), &mut NoProgress)
            .await
            .unwrap();
        assert_eq!(report.state, RunState::Interrupted);
        assert_eq!(report.processed(), 0);
        assert_eq!(report.total, 4);
        let json = std::fs::read_to_string(dir.path().join("results.json")).unwrap();
        assert_eq!(json, "[]\n");
    }

    #[tokio::test]
    async fn shutdown_mid_run_keeps_processed_cases() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(
            &dir,
            ShellTarget::new("kitty", "printf a"),
            ShellTarget::new("fake", r#"if [ "$1" = b ]; then exec sleep 5; fi; printf a"#),
        );
        let shutdown = tokio::time::sleep(Duration::from_millis(1_500));
        let report = ctl
            .run(two_key_matrix(2).generate(None, None), shutdown, &mut NoProgress)
            .await
            .unwrap();
        assert_eq!(report.state, RunState::Interrupted);
        assert_eq!(report.processed(), 2);
        assert_eq!(report.summary.matches, 2);
        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("results.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json.as_array().unwrap().len(), 2);
    }
}
