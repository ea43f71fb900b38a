//! Progress tracking for a copy run
//!
//! - `ProgressState` holds the job and byte counters shared with anything that wants to poll
//! - `ProgressReporter` is the narrow display interface ("advance by N")
//! - `TransferBars` draws a Files bar and a Size bar with indicatif
//! - `Aggregator` folds finished jobs into all of the above, in completion order

use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use tracing::error;

use crate::copy::{JobReport, JobResult};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub jobs_total: u64,
    pub jobs_completed: u64,
    pub bytes_total: u64,
    pub bytes_completed: u64,
}

/// Shared, append-only job and byte counters for one run.
///
/// Totals only ever grow. If more work shows up than was counted up front (files created
/// mid-run), the total is raised so `completed <= total` still holds.
#[derive(Debug, Default)]
pub struct ProgressState {
    inner: Mutex<ProgressSnapshot>,
}

impl ProgressState {
    pub fn new(jobs_total: u64, bytes_total: u64) -> Self {
        Self {
            inner: Mutex::new(ProgressSnapshot {
                jobs_total,
                bytes_total,
                ..Default::default()
            }),
        }
    }

    /// Record one finished job that moved `bytes` bytes.
    pub fn advance(&self, bytes: u64) {
        let mut s = self.inner.lock();
        s.jobs_completed += 1;
        s.bytes_completed += bytes;
        s.jobs_total = s.jobs_total.max(s.jobs_completed);
        s.bytes_total = s.bytes_total.max(s.bytes_completed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.inner.lock()
    }
}

/// Receives progress updates. All methods are called from the thread collecting results.
pub trait ProgressReporter: Send + Sync {
    fn set_totals(&self, _jobs: u64, _bytes: u64) {}
    fn advance(&self, _jobs: u64, _bytes: u64) {}
    fn finish(&self, _interrupted: bool) {}
}

pub struct NoProgress;
impl ProgressReporter for NoProgress {}

/// Two stacked bars: file count and transferred size.
pub struct TransferBars {
    files: ProgressBar,
    bytes: ProgressBar,
}

impl TransferBars {
    pub fn new(multi: &MultiProgress) -> Self {
        let files = multi.add(ProgressBar::new(0));
        files.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {prefix:>5.bold} [{bar:40.cyan/blue}] {pos}/{len} {percent:>3}% [{elapsed_precise}]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        files.set_prefix("Files");

        let bytes = multi.add(ProgressBar::new(0));
        bytes.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {prefix:>5.bold} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {binary_bytes_per_sec} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        bytes.set_prefix("Size");

        files.enable_steady_tick(Duration::from_millis(100));
        bytes.enable_steady_tick(Duration::from_millis(100));
        Self { files, bytes }
    }

    /// A bar container that draws nothing.
    pub fn hidden_multi() -> MultiProgress {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }
}

impl ProgressReporter for TransferBars {
    fn set_totals(&self, jobs: u64, bytes: u64) {
        self.files.set_length(jobs);
        self.bytes.set_length(bytes);
    }

    fn advance(&self, jobs: u64, bytes: u64) {
        self.files.inc(jobs);
        self.bytes.inc(bytes);
    }

    fn finish(&self, interrupted: bool) {
        if interrupted {
            self.files.abandon_with_message("interrupted");
            self.bytes.abandon();
        } else {
            self.files.finish();
            self.bytes.finish();
        }
    }
}

/// Per-outcome tallies.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub written: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes_written: u64,
}

impl Tally {
    pub fn jobs(&self) -> u64 {
        self.written + self.skipped + self.failed
    }
}

/// Folds job reports into the shared counters and the display.
pub struct Aggregator<'a> {
    state: Arc<ProgressState>,
    reporter: &'a dyn ProgressReporter,
    tally: Tally,
}

impl<'a> Aggregator<'a> {
    pub fn new(state: Arc<ProgressState>, reporter: &'a dyn ProgressReporter) -> Self {
        let totals = state.snapshot();
        reporter.set_totals(totals.jobs_total, totals.bytes_total);
        Self {
            state,
            reporter,
            tally: Tally::default(),
        }
    }

    /// Count one finished job, whatever its outcome.
    pub fn record(&mut self, report: &JobReport) {
        let bytes = report.result.bytes();
        match &report.result {
            JobResult::Written(n) => {
                self.tally.written += 1;
                self.tally.bytes_written += n;
            }
            JobResult::Skipped(_) => self.tally.skipped += 1,
            JobResult::Failed(err) => {
                self.tally.failed += 1;
                error!("Job failed for {}: {err}", report.job.source.display());
            }
        }
        self.state.advance(bytes);
        self.reporter.advance(1, bytes);
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::{CopyJob, SkipReason};
    use crate::error::{JobAction, JobError};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct Recorder {
        jobs: AtomicU64,
        bytes: AtomicU64,
    }

    impl ProgressReporter for Recorder {
        fn advance(&self, jobs: u64, bytes: u64) {
            self.jobs.fetch_add(jobs, Ordering::SeqCst);
            self.bytes.fetch_add(bytes, Ordering::SeqCst);
        }
    }

    fn report(result: JobResult) -> JobReport {
        JobReport {
            job: CopyJob {
                source: PathBuf::from("/in/a"),
                size: 4,
                destination: PathBuf::from("/out/a"),
                overwrite: false,
            },
            result,
        }
    }

    #[test]
    fn threaded_advance() {
        let state = ProgressState::new(1000, 1000 * 3);
        std::thread::scope(|scope| {
            for _ in 0..10 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        state.advance(3);
                    }
                });
            }
        });
        let snap = state.snapshot();
        assert_eq!(snap.jobs_completed, 1000);
        assert_eq!(snap.bytes_completed, 3000);
        assert_eq!(snap.jobs_total, 1000);
    }

    #[test]
    fn totals_grow_instead_of_being_exceeded() {
        let state = ProgressState::new(1, 2);
        state.advance(2);
        state.advance(5);
        let snap = state.snapshot();
        assert_eq!(snap.jobs_completed, 2);
        assert!(snap.jobs_completed <= snap.jobs_total);
        assert!(snap.bytes_completed <= snap.bytes_total);
    }

    #[test]
    fn aggregator_counts_every_outcome() {
        let state = Arc::new(ProgressState::new(3, 10));
        let recorder = Recorder::default();
        let mut agg = Aggregator::new(state.clone(), &recorder);

        agg.record(&report(JobResult::Written(4)));
        agg.record(&report(JobResult::Skipped(SkipReason::Exists)));
        agg.record(&report(JobResult::Failed(JobError::new(
            JobAction::ReadSource,
            "/in/a",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        ))));

        let tally = agg.tally();
        assert_eq!(tally.jobs(), 3);
        assert_eq!((tally.written, tally.skipped, tally.failed), (1, 1, 1));
        assert_eq!(tally.bytes_written, 4);

        let snap = state.snapshot();
        assert_eq!(snap.jobs_completed, 3);
        assert_eq!(snap.bytes_completed, 4);
        assert_eq!(recorder.jobs.load(Ordering::SeqCst), 3);
        assert_eq!(recorder.bytes.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn hidden_bars_accept_updates() {
        let multi = TransferBars::hidden_multi();
        let bars = TransferBars::new(&multi);
        bars.set_totals(2, 10);
        bars.advance(1, 5);
        bars.finish(false);
    }
}
