//! Logging setup: verbosity, console output that cooperates with the progress bars, and
//! optional capture of every log line into a file.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Local;
use indicatif::MultiProgress;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

use crate::config::OutputConfig;
use crate::error::CopyError;
use crate::prompt::{allow_file_overwrite, Confirm};

/// Filter directive for a verbosity count.
pub fn level_for(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "off";
    }
    match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    }
}

/// `[HH:MM:SS]` in local time.
struct LocalClock;

impl FormatTime for LocalClock {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "[{}]", Local::now().format("%H:%M:%S"))
    }
}

/// Writes to stderr with the progress bars suspended, so lines scroll above them.
#[derive(Clone)]
pub struct ConsoleWriter {
    multi: MultiProgress,
}

impl ConsoleWriter {
    pub fn new(multi: MultiProgress) -> Self {
        Self { multi }
    }
}

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Log file shared by all threads; one event is written under one lock.
#[derive(Clone)]
pub struct SharedFile {
    file: Arc<Mutex<File>>,
}

impl SharedFile {
    pub fn new(file: File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

pub struct SharedFileGuard<'a>(MutexGuard<'a, File>);

impl Write for SharedFileGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFile {
    type Writer = SharedFileGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard(self.file.lock())
    }
}

/// Get the log file ready before logging starts.
///
/// An existing file is only replaced if `force` is set or the user agrees; the parent
/// directory has to exist already.
pub fn open_log_file(path: &Path, force: bool, prompt: &dyn Confirm) -> Result<File, CopyError> {
    if path.is_dir() {
        return Err(CopyError::LogCapture {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, "path is a directory"),
        });
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(CopyError::LogCapture {
                path: path.to_path_buf(),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    "parent directory doesn't exist",
                ),
            });
        }
    }
    if !allow_file_overwrite(path, force, prompt) {
        return Err(CopyError::OverwriteDenied {
            path: path.to_path_buf(),
        });
    }
    File::create(path).map_err(|source| CopyError::LogCapture {
        path: path.to_path_buf(),
        source,
    })
}

/// Install the global subscriber. `RUST_LOG` overrides the verbosity flags when set.
pub fn init_logging(output: &OutputConfig, multi: &MultiProgress, log_file: Option<File>) -> Result<()> {
    let level = level_for(output.verbose, output.quiet);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = tfmt::layer()
        .with_writer(ConsoleWriter::new(multi.clone()))
        .with_timer(LocalClock)
        .with_target(false);
    let file = log_file.map(|file| {
        tfmt::layer()
            .with_writer(SharedFile::new(file))
            .with_timer(LocalClock)
            .with_target(false)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

/// Startup notices about verbosity and the overwrite policy.
pub fn announce(verbose: u8, force: bool) {
    match verbose {
        0 => return,
        1 => info!("Verbose output is on!"),
        _ => debug!("Debug output is on!"),
    }
    if force {
        warn!("Forced overwrite is on!");
    } else {
        info!("Forced overwrite is off!");
    }
}
