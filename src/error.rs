//! Error taxonomy for a scan run
//!
//! Every variant except `FatalSetup` and `Sink` is scoped to a single
//! repository, commit or file and is absorbed by the orchestrator.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    /// The run cannot start (working directory, sink, invalid config)
    #[error("setup failed: {0}")]
    FatalSetup(String),

    #[error("clone of {url} failed: {reason}")]
    Clone { url: String, reason: String },

    #[error("cannot read history of {path}: {reason}")]
    RepositoryAccess { path: PathBuf, reason: String },

    #[error("commit {0} not found")]
    CommitNotFound(String),

    #[error("{path} unavailable at {commit}: {reason}")]
    ContentUnavailable {
        commit: String,
        path: String,
        kind: Unavailable,
        reason: String,
    },

    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },

    /// Durable sink write failed; continuing would silently lose findings
    #[error("finding sink error: {0}")]
    Sink(#[from] std::io::Error),

    #[error("discovery error: {0}")]
    Discovery(String),
}

impl ScanError {
    /// Whether this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::FatalSetup(_) | ScanError::Sink(_))
    }

    pub(crate) fn access(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        ScanError::RepositoryAccess {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// The path has no file content at the commit (deleted by it, or a
    /// submodule), as opposed to content that exists but cannot be read
    pub fn is_absent(&self) -> bool {
        matches!(
            self,
            ScanError::ContentUnavailable {
                kind: Unavailable::Absent | Unavailable::NotAFile | Unavailable::Submodule,
                ..
            }
        )
    }

    pub(crate) fn unavailable(
        commit: impl std::fmt::Display,
        path: &[u8],
        kind: Unavailable,
        reason: impl std::fmt::Display,
    ) -> Self {
        ScanError::ContentUnavailable {
            commit: commit.to_string(),
            path: String::from_utf8_lossy(path).into_owned(),
            kind,
            reason: reason.to_string(),
        }
    }
}

/// Why a path's content could not be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    /// No entry at this commit, e.g. the commit deleted it
    Absent,
    Submodule,
    /// An intermediate path component is not a directory
    NotAFile,
    /// Object lookup or decoding failed
    Unreadable,
}

/// Release of a clone directory failed.
///
/// Findings already recorded for the repository remain valid.
#[derive(Error, Debug)]
#[error("could not remove {path}: {source}")]
pub struct CleanupWarning {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
