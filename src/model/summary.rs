use std::time::Duration;

use crate::error::CleanupWarning;
use crate::util::format_elapsed;

/// Final state of one repository in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Every commit and file was processed
    Complete,
    /// Some commits or files were skipped after errors
    Partial,
    /// Cloned, but history could not be read
    Failed,
    /// Clone never succeeded; nothing to release
    AcquireFailed,
    /// Skipped by name before acquisition
    Skipped,
}

impl ScanStatus {
    pub fn label(self) -> &'static str {
        match self {
            ScanStatus::Complete => "fully scanned",
            ScanStatus::Partial => "partially scanned",
            ScanStatus::Failed => "failed",
            ScanStatus::AcquireFailed => "failed to acquire",
            ScanStatus::Skipped => "skipped",
        }
    }
}

/// Per-repository counters and diagnostics
#[derive(Debug)]
pub struct RepoOutcome {
    pub name: String,
    pub status: ScanStatus,
    pub commits_walked: u64,
    pub commits_skipped: u64,
    pub files_scanned: u64,
    pub dirs_skipped: u64,
    /// Paths with no content at their commit: deletions and submodules
    pub files_absent: u64,
    pub files_failed: u64,
    pub new_findings: u64,
    /// Scanning stopped early on cancellation
    pub interrupted: bool,
    /// Repository-level error, if any
    pub error: Option<String>,
    pub cleanup_warning: Option<CleanupWarning>,
    pub elapsed: Duration,
}

impl RepoOutcome {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: ScanStatus::Complete,
            commits_walked: 0,
            commits_skipped: 0,
            files_scanned: 0,
            dirs_skipped: 0,
            files_absent: 0,
            files_failed: 0,
            new_findings: 0,
            interrupted: false,
            error: None,
            cleanup_warning: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Derive the final status from the item counters
    pub(crate) fn settle(&mut self) {
        if self.status == ScanStatus::Complete
            && (self.commits_skipped > 0 || self.files_failed > 0 || self.interrupted)
        {
            self.status = ScanStatus::Partial;
        }
    }
}

/// Everything a run produced
#[derive(Debug, Default)]
pub struct RunSummary {
    pub repos: Vec<RepoOutcome>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn count(&self, status: ScanStatus) -> usize {
        self.repos.iter().filter(|r| r.status == status).count()
    }

    pub fn total_findings(&self) -> u64 {
        self.repos.iter().map(|r| r.new_findings).sum()
    }

    pub fn cleanup_warnings(&self) -> usize {
        self.repos
            .iter()
            .filter(|r| r.cleanup_warning.is_some())
            .count()
    }

    pub fn outcome(&self, name: &str) -> Option<&RepoOutcome> {
        self.repos.iter().find(|r| r.name == name)
    }

    /// Write the end-of-run report to the log
    pub fn log_report(&self) {
        for r in &self.repos {
            log::info!(
                "{}: {} in {} ({} commits, {} files, {} new findings, {} skipped commits, {} failed files)",
                r.name,
                r.status.label(),
                format_elapsed(r.elapsed),
                r.commits_walked,
                r.files_scanned,
                r.new_findings,
                r.commits_skipped,
                r.files_failed
            );
            if let Some(err) = &r.error {
                log::info!("{}: {}", r.name, err);
            }
            if let Some(w) = &r.cleanup_warning {
                log::warn!("{}: cleanup warning: {}", r.name, w);
            }
        }
        log::info!(
            "Done{}: {} repositories, {} fully scanned, {} partial, {} failed, {} not acquired, {} cleanup warnings, {} new findings",
            if self.cancelled { " (cancelled)" } else { "" },
            self.repos.len(),
            self.count(ScanStatus::Complete),
            self.count(ScanStatus::Partial),
            self.count(ScanStatus::Failed),
            self.count(ScanStatus::AcquireFailed),
            self.cleanup_warnings(),
            self.total_findings()
        );
    }
}
