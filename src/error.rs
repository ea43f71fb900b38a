//! Error types for pcopy.
//!
//! `CopyError` covers everything that stops a run before or around the pool. Failures of a
//! single file never become a `CopyError`; they are carried by `JobError` inside a job result.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Which side of the copy a root directory belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootRole {
    Source,
    Destination,
}

impl fmt::Display for RootRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Destination => f.write_str("destination"),
        }
    }
}

/// Run-level errors. Any of these aborts the whole run.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("{role} directory does not exist or is not a directory: {}", path.display())]
    InvalidRoot { role: RootRole, path: PathBuf },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("canceling due to denied overwrite of {}", path.display())]
    OverwriteDenied { path: PathBuf },

    #[error("cannot capture logs to {}: {source}", path.display())]
    LogCapture {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to build worker pool: {0}")]
    Pool(String),
}

impl CopyError {
    pub fn invalid_source(path: impl Into<PathBuf>) -> Self {
        Self::InvalidRoot {
            role: RootRole::Source,
            path: path.into(),
        }
    }

    pub fn invalid_destination(path: impl Into<PathBuf>) -> Self {
        Self::InvalidRoot {
            role: RootRole::Destination,
            path: path.into(),
        }
    }
}

/// The step of a single copy job that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    CreateDirectory,
    InspectDestination,
    ReadSource,
    WriteDestination,
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CreateDirectory => "create directory",
            Self::InspectDestination => "inspect destination",
            Self::ReadSource => "read source",
            Self::WriteDestination => "write destination",
        };
        f.write_str(s)
    }
}

/// A failure isolated to one copy job.
#[derive(Debug, thiserror::Error)]
#[error("failed to {action} {}: {source}", path.display())]
pub struct JobError {
    pub path: PathBuf,
    pub action: JobAction,
    #[source]
    pub source: io::Error,
}

impl JobError {
    pub fn new(action: JobAction, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            action,
            source,
        }
    }

    /// Underlying I/O error kind, handy for callers that group failures.
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}

pub type Result<T, E = CopyError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_root_names_role_and_path() {
        let err = CopyError::invalid_source("/no/such/dir");
        assert_eq!(
            err.to_string(),
            "source directory does not exist or is not a directory: /no/such/dir"
        );
        let err = CopyError::invalid_destination("out");
        assert!(err.to_string().starts_with("destination directory"));
    }

    #[test]
    fn job_error_reports_action_and_cause() {
        let err = JobError::new(
            JobAction::ReadSource,
            "/src/a.txt",
            io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied"),
        );
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(
            err.to_string(),
            "failed to read source /src/a.txt: Permission denied"
        );
    }
}
