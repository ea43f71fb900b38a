//! pcopy library
//!
//! Parallel local directory copy: enumerate a source tree, hand the files to a bounded pool of
//! worker threads in batches, and tally job and byte progress as results come back.

pub mod cli;
pub mod config;
pub mod copy;
pub mod error;
pub mod fs_enum;
pub mod logger;
pub mod pool;
pub mod progress;
pub mod prompt;
pub mod transfer;

pub use config::{CopyConfig, OutputConfig};
pub use copy::{copy_job, CopyJob, JobReport, JobResult, SkipReason};
pub use error::{CopyError, JobError};
pub use fs_enum::{count_files, count_files_until, walk_files, FileDescriptor, FileFilter};
pub use pool::{CancelFlag, CopyPool};
pub use progress::{NoProgress, ProgressReporter, ProgressState, TransferBars};
pub use transfer::{run_copy, RunSummary, Transfer};
