//! Messages passed between the history walker and the scan jobs

use crate::error::ScanError;
use crate::model::CommitId;
use crate::repository::ChangedFileSet;

/// Produced by the walker thread, in history order
#[derive(Debug)]
pub enum WalkItem {
    /// Commits about to be streamed, and history the walk could not read
    Total { commits: u64, unreadable: u64 },
    Commit {
        id: CommitId,
        changes: Result<ChangedFileSet, ScanError>,
    },
}

/// Result of scanning one (commit, path) pair
#[derive(Debug)]
pub enum FileScan {
    Scanned { new_findings: u64 },
    Directory,
    Failed(ScanError),
}
