//! Configuration types for a copy run and its output

use std::path::PathBuf;

use crate::error::{CopyError, Result};
use crate::fs_enum::FileFilter;

/// Default number of jobs handed to a worker per dispatch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Everything a copy run needs, built once and passed by reference.
#[derive(Debug, Clone)]
pub struct CopyConfig {
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
    /// Replace existing destination files
    pub overwrite: bool,
    /// Worker pool size
    pub workers: usize,
    /// Jobs per dispatch
    pub batch_size: usize,
    /// Descend into subdirectories of the source root
    pub recursive: bool,
    /// Only copy files whose name ends with this suffix
    pub extension: Option<String>,
}

impl CopyConfig {
    pub fn new(source_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            overwrite: false,
            workers: num_cpus::get(),
            batch_size: DEFAULT_BATCH_SIZE,
            recursive: false,
            extension: None,
        }
    }

    /// Filter shared by the counting pass and the enumerator.
    pub fn filter(&self) -> FileFilter {
        FileFilter::new(self.extension.as_deref(), self.recursive)
    }

    /// Check roots and counts before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(CopyError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(CopyError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        if !self.source_root.is_dir() {
            return Err(CopyError::invalid_source(&self.source_root));
        }
        if !self.destination_root.is_dir() {
            return Err(CopyError::invalid_destination(&self.destination_root));
        }
        Ok(())
    }
}

/// Output and logging configuration
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Verbosity level: 0=ERROR, 1=INFO, 2+=DEBUG
    pub verbose: u8,
    /// Suppress all log output and the summary line
    pub quiet: bool,
    /// Mirror log output into this file
    pub log_file: Option<PathBuf>,
    /// Draw progress bars
    pub progress: bool,
}
