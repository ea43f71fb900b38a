//! One copy run: count, walk, dispatch, aggregate.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::HumanBytes;
use tracing::{debug, info, warn};

use crate::config::CopyConfig;
use crate::copy::{copy_job, CopyJob, JobReport};
use crate::error::Result;
use crate::fs_enum::{count_files_until, walk_files};
use crate::pool::{CancelFlag, CopyPool};
use crate::progress::{Aggregator, ProgressReporter, ProgressState};

/// Final counts for a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub jobs: u64,
    pub written: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes_written: u64,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} files: {} written ({}), {} skipped, {} failed in {:.2}s",
            if self.interrupted { "Interrupted after" } else { "Processed" },
            self.jobs,
            self.written,
            HumanBytes(self.bytes_written),
            self.skipped,
            self.failed,
            self.elapsed.as_secs_f64()
        )
    }
}

/// A validated, counted run that has not started copying yet.
pub struct Transfer<'a> {
    config: &'a CopyConfig,
    state: Arc<ProgressState>,
    pool: CopyPool,
}

impl<'a> Transfer<'a> {
    /// Validate the config and size the progress totals.
    ///
    /// Counting stops early once `cancel` is set; the following `run` then dispatches nothing.
    pub fn prepare(config: &'a CopyConfig, cancel: &CancelFlag) -> Result<Self> {
        config.validate()?;
        info!("Spooling...");
        let (jobs, bytes) =
            count_files_until(&config.source_root, &config.filter(), || cancel.is_cancelled())?;
        debug!(jobs, bytes, "counted source files");
        let pool = CopyPool::new(config.workers, config.batch_size)?;
        Ok(Self {
            config,
            state: Arc::new(ProgressState::new(jobs, bytes)),
            pool,
        })
    }

    /// Counters that can be polled from another thread while the run is going.
    pub fn state(&self) -> Arc<ProgressState> {
        Arc::clone(&self.state)
    }

    pub fn run(self, reporter: &dyn ProgressReporter, cancel: &CancelFlag) -> Result<RunSummary> {
        let config = self.config;
        let walk = walk_files(&config.source_root, &config.filter())?;
        let totals = self.state.snapshot();
        info!(
            "Starting parallel copy job for {} files over {} threads.",
            totals.jobs_total,
            self.pool.workers()
        );

        let start = Instant::now();
        let mut aggregator = Aggregator::new(Arc::clone(&self.state), reporter);
        let jobs = walk.map(|file| CopyJob::new(file, config));
        let stats = self.pool.run(
            jobs,
            cancel,
            |job| {
                let result = copy_job(&job);
                JobReport { job, result }
            },
            |report| aggregator.record(&report),
        );
        reporter.finish(stats.interrupted);

        if stats.interrupted {
            warn!(
                "Interrupted: {} of {} dispatched jobs completed.",
                stats.completed, stats.dispatched
            );
        } else {
            info!("Job pool complete.");
        }

        let tally = aggregator.tally();
        Ok(RunSummary {
            jobs: tally.jobs(),
            written: tally.written,
            skipped: tally.skipped,
            failed: tally.failed,
            bytes_written: tally.bytes_written,
            interrupted: stats.interrupted,
            elapsed: start.elapsed(),
        })
    }
}

/// Prepare and run in one go.
pub fn run_copy(
    config: &CopyConfig,
    reporter: &dyn ProgressReporter,
    cancel: &CancelFlag,
) -> Result<RunSummary> {
    Transfer::prepare(config, cancel)?.run(reporter, cancel)
}
