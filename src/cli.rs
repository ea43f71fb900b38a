//! Command-line surface of the `pcopy` binary

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::debug;

use crate::config::{CopyConfig, OutputConfig, DEFAULT_BATCH_SIZE};

/// Multiprocessing-style file copier.
///
/// Local copies only. Reads each whole file into memory and writes it to OUTPUT_DIR, preserving
/// sub-paths from SOURCE_DIR. Existing files in OUTPUT_DIR are only overwritten with -f.
#[derive(Clone, Debug, Parser)]
#[command(name = "pcopy", author, version, max_term_width = 100)]
pub struct CopyArgs {
    /// Show verbose output. Pass again for debug
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Don't print anything, not even errors or the summary
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Overwrite existing files (output files and the log file)
    #[arg(short, long)]
    pub force: bool,

    /// Capture logging output (at whatever verbosity level) to the specified path
    #[arg(short = 'l', long = "save-logs", value_name = "LOGFILE")]
    pub save_logs: Option<PathBuf>,

    /// Number of worker threads (default: number of available CPU threads)
    #[arg(short = 'n', long = "num-threads", value_name = "THREADS", value_parser = clap::value_parser!(u32).range(1..))]
    pub num_threads: Option<u32>,

    /// Number of jobs each worker thread takes per dispatch
    #[arg(short = 'b', long = "batch-size", value_name = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE as u32, value_parser = clap::value_parser!(u32).range(1..))]
    pub batch_size: u32,

    /// Scan subdirectories as well
    #[arg(short, long)]
    pub recursive: bool,

    /// Only operate on files whose name ends with EXT (plain suffix: `txt` also matches `notes_txt`)
    #[arg(long, value_name = "EXT")]
    pub extension: Option<String>,

    /// Don't draw progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Directory to copy files from
    #[arg(value_name = "SOURCE_DIR")]
    pub source_dir: PathBuf,

    /// Directory to place the copies in
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,
}

impl CopyArgs {
    pub fn copy_config(&self) -> CopyConfig {
        let mut config = CopyConfig::new(&self.source_dir, &self.output_dir);
        config.overwrite = self.force;
        if let Some(n) = self.num_threads {
            config.workers = n as usize;
        }
        config.batch_size = self.batch_size as usize;
        config.recursive = self.recursive;
        config.extension = self.extension.clone();
        config
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            verbose: self.verbose,
            quiet: self.quiet,
            log_file: self.save_logs.clone(),
            progress: !self.quiet && !self.no_progress,
        }
    }

    /// Dump the effective parameters at debug level.
    pub fn log_params(&self, config: &CopyConfig) {
        debug!("'pcopy' command parameters:");
        debug!("  verbose     = {}", self.verbose);
        debug!("  force       = {}", self.force);
        debug!("  save_logs   = {:?}", self.save_logs);
        debug!("  num_threads = {}", config.workers);
        debug!("  batch_size  = {}", config.batch_size);
        debug!("  recursive   = {}", config.recursive);
        debug!("  extension   = {:?}", config.extension);
        debug!("  source_dir  = {}", config.source_root.display());
        debug!("  output_dir  = {}", config.destination_root.display());
    }
}
