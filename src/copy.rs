//! Single-file copy jobs.
//!
//! A job never returns an error: every failure is folded into `JobResult::Failed` so one bad
//! file cannot disturb the rest of the pool.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::CopyConfig;
use crate::error::{JobAction, JobError};
use crate::fs_enum::FileDescriptor;

/// The unit of work handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub source: PathBuf,
    pub size: u64,
    pub destination: PathBuf,
    pub overwrite: bool,
}

impl CopyJob {
    pub fn new(file: FileDescriptor, config: &CopyConfig) -> Self {
        let destination = destination_for(&file.path, &config.source_root, &config.destination_root);
        Self {
            source: file.path,
            size: file.size,
            destination,
            overwrite: config.overwrite,
        }
    }

    /// Directory the destination file lands in.
    pub fn destination_dir(&self) -> &Path {
        self.destination.parent().unwrap_or(Path::new(""))
    }
}

/// Why a job wrote nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A file is already there and overwrite is off
    Exists,
    /// The destination path is a directory
    DestinationIsDirectory,
}

/// Outcome of one copy job.
#[derive(Debug)]
pub enum JobResult {
    Skipped(SkipReason),
    Written(u64),
    Failed(JobError),
}

impl JobResult {
    /// Bytes this job contributes to the transferred total.
    pub fn bytes(&self) -> u64 {
        match self {
            Self::Written(bytes) => *bytes,
            Self::Skipped(_) | Self::Failed(_) => 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A finished job as seen by the aggregator.
#[derive(Debug)]
pub struct JobReport {
    pub job: CopyJob,
    pub result: JobResult,
}

/// Compute destination path for a file
///
/// The directory structure below `src_root` is preserved verbatim under `dst_root`.
pub fn destination_for(src_file: &Path, src_root: &Path, dst_root: &Path) -> PathBuf {
    let name = src_file.file_name().unwrap_or_default();
    let sub_dir = src_file
        .parent()
        .and_then(|parent| parent.strip_prefix(src_root).ok());
    match sub_dir {
        Some(sub_dir) => dst_root.join(sub_dir).join(name),
        None => dst_root.join(name),
    }
}

/// Make sure the destination directory exists. Losing a creation race to another worker is fine.
fn ensure_destination_dir(dir: &Path) -> Result<(), JobError> {
    if dir.is_dir() {
        debug!("Path already existed: {}", dir.display());
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| JobError::new(JobAction::CreateDirectory, dir, e))?;
    debug!("Created path: {}", dir.display());
    Ok(())
}

/// Decide whether to write. `Some(reason)` means skip.
fn check_destination(dst: &Path, overwrite: bool) -> Result<Option<SkipReason>, JobError> {
    match fs::metadata(dst) {
        Ok(meta) if meta.is_dir() => {
            debug!(
                "Skipping! Existing directory found at output path: {}",
                dst.display()
            );
            Ok(Some(SkipReason::DestinationIsDirectory))
        }
        Ok(_) if overwrite => {
            debug!("Overwriting existing file at output path: {}", dst.display());
            Ok(None)
        }
        Ok(_) => {
            debug!("Skipping! Existing file found at output path: {}", dst.display());
            Ok(Some(SkipReason::Exists))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(JobError::new(JobAction::InspectDestination, dst, e)),
    }
}

/// Read the whole source into memory, then write it out in one call.
fn write_whole(src: &Path, dst: &Path) -> Result<u64, JobError> {
    let data = fs::read(src).map_err(|e| JobError::new(JobAction::ReadSource, src, e))?;
    fs::write(dst, &data).map_err(|e| JobError::new(JobAction::WriteDestination, dst, e))?;
    debug!(">>> Wrote {}", dst.display());
    Ok(data.len() as u64)
}

fn run_job(job: &CopyJob) -> Result<JobResult, JobError> {
    ensure_destination_dir(job.destination_dir())?;
    if let Some(reason) = check_destination(&job.destination, job.overwrite)? {
        return Ok(JobResult::Skipped(reason));
    }
    write_whole(&job.source, &job.destination).map(JobResult::Written)
}

/// Copy one file, converting any failure into `JobResult::Failed`.
pub fn copy_job(job: &CopyJob) -> JobResult {
    run_job(job).unwrap_or_else(JobResult::Failed)
}
