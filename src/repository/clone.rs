//! Clone providers
//!
//! Materialize a remote repository on local disk.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{Result, ScanError};
use crate::scanner::Cancellation;

/// Abort conditions observed by a running clone
pub struct CloneControl {
    timeout: Duration,
    deadline: Instant,
    aborted: AtomicBool,
    run: Cancellation,
}

impl CloneControl {
    pub fn new(timeout: Duration, run: Cancellation) -> Self {
        Self {
            timeout,
            deadline: Instant::now() + timeout,
            aborted: AtomicBool::new(false),
            run,
        }
    }

    /// Ask the clone to stop at its next checkpoint
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn should_abort(&self) -> bool {
        self.aborted.load(Ordering::SeqCst) || self.run.is_cancelled() || self.expired()
    }
}

/// Materializes a repository at `dest`
pub trait CloneProvider: Send + Sync + 'static {
    fn clone_repo(&self, url: &str, dest: &Path, control: &CloneControl) -> Result<()>;
}

/// Bare clone through libgit2.
///
/// Only the object database is needed, so no working tree is checked out.
pub struct Git2Cloner;

impl CloneProvider for Git2Cloner {
    fn clone_repo(&self, url: &str, dest: &Path, control: &CloneControl) -> Result<()> {
        // Local clones may finish without a single progress callback
        if control.should_abort() {
            return Err(ScanError::Clone {
                url: url.to_string(),
                reason: "cancelled".to_string(),
            });
        }

        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.transfer_progress(|_| !control.should_abort());

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);

        let mut builder = git2::build::RepoBuilder::new();
        builder.bare(true);
        builder.fetch_options(fetch_options);

        match builder.clone(url, dest) {
            Ok(_) => Ok(()),
            Err(_) if control.run.is_cancelled() => Err(ScanError::Clone {
                url: url.to_string(),
                reason: "cancelled".to_string(),
            }),
            Err(e) if control.expired() => Err(ScanError::Timeout {
                what: format!("clone of {} ({})", url, e.message()),
                after: control.timeout,
            }),
            Err(e) => Err(ScanError::Clone {
                url: url.to_string(),
                reason: e.message().to_string(),
            }),
        }
    }
}
