//! Scan orchestrator
//!
//! Drives each repository through acquire, history walk, per-file scan and
//! release.
//!
//! # Architecture
//!
//! - **matcher**: hex token pattern (pure)
//! - **progress**: progress reporting abstraction
//! - **cancel**: run-wide cancellation flag
//! - **types**: messages between the walker thread and scan jobs
//!
//! Within one repository a blocking walker thread streams commits and their
//! changed paths over a bounded channel. Every (commit, path) pair becomes a
//! job on a `JoinSet`, bounded by a semaphore. All jobs are joined before the
//! clone is released.

mod cancel;
mod matcher;
mod progress;
mod types;

pub use cancel::Cancellation;
pub use matcher::find_tokens;
pub use progress::{IndicatifProgress, NoopProgress, ProgressHandle, ProgressReporter};
pub use types::{FileScan, WalkItem};

use gix::bstr::BString;
use rustc_hash::FxHashSet;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};

use crate::config::ScanConfig;
use crate::discovery::RepositorySource;
use crate::error::{Result, ScanError, Unavailable};
use crate::model::{CommitId, RepoOutcome, RepositoryDescriptor, RunSummary, ScanStatus};
use crate::repository::{
    BlobLookup, BlobRetriever, BlobSource, CloneProvider, CommitWalker, FindingSink,
    FindingStore, HandleRegistry, RepositoryHandle, RepositoryLifecycle,
};
use crate::util::format_elapsed;

/// Scans the history of every repository a source yields
pub struct Scanner<C: CloneProvider, S: FindingSink + 'static, B: BlobSource = BlobRetriever> {
    lifecycle: RepositoryLifecycle<C>,
    store: Arc<FindingStore<S>>,
    concurrency: usize,
    timeout: Duration,
    skip: FxHashSet<String>,
    cancel: Cancellation,
    progress: Box<dyn ProgressReporter>,
    blobs: PhantomData<fn() -> B>,
}

impl<C: CloneProvider, S: FindingSink + 'static> Scanner<C, S> {
    pub fn new(
        config: &ScanConfig,
        cloner: C,
        store: Arc<FindingStore<S>>,
        cancel: Cancellation,
    ) -> Result<Self> {
        config.validate()?;
        let lifecycle =
            RepositoryLifecycle::new(&config.workdir, cloner, config.timeout, cancel.clone())?;
        Ok(Self {
            lifecycle,
            store,
            concurrency: config.concurrency,
            timeout: config.timeout,
            skip: config.skip.iter().cloned().collect(),
            cancel,
            progress: Box::new(IndicatifProgress),
            blobs: PhantomData,
        })
    }
}

impl<C: CloneProvider, S: FindingSink + 'static, B: BlobSource> Scanner<C, S, B> {
    /// Read file content through `B` instead of the object database directly
    pub fn with_blob_source<B2: BlobSource>(self) -> Scanner<C, S, B2> {
        Scanner {
            lifecycle: self.lifecycle,
            store: self.store,
            concurrency: self.concurrency,
            timeout: self.timeout,
            skip: self.skip,
            cancel: self.cancel,
            progress: self.progress,
            blobs: PhantomData,
        }
    }

    /// Replace the progress reporter (quiet mode, tests)
    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn lifecycle(&self) -> &RepositoryLifecycle<C> {
        &self.lifecycle
    }

    pub fn registry(&self) -> Arc<HandleRegistry> {
        self.lifecycle.registry()
    }

    pub fn store(&self) -> &Arc<FindingStore<S>> {
        &self.store
    }

    /// Scan every repository `source` yields.
    ///
    /// Only fatal errors (sink failure) end the run early; everything else
    /// is recorded in the summary.
    pub async fn run(&self, source: &mut impl RepositorySource) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        while !self.cancel.is_cancelled() {
            let descriptor = match source.next().await {
                None => break,
                Some(Ok(d)) => d,
                Some(Err(e)) => {
                    log::warn!("Discovery stopped: {:#}", e);
                    break;
                }
            };

            if self.skip.contains(&descriptor.name) {
                log::info!("Skipping {} (skip list)", descriptor.name);
                let mut outcome = RepoOutcome::new(&descriptor.name);
                outcome.status = ScanStatus::Skipped;
                summary.repos.push(outcome);
                continue;
            }

            let outcome = self.scan_repository(&descriptor).await?;
            summary.repos.push(outcome);
        }

        summary.cancelled = self.cancel.is_cancelled();
        Ok(summary)
    }

    /// Acquire, scan and release one repository
    pub async fn scan_repository(&self, descriptor: &RepositoryDescriptor) -> Result<RepoOutcome> {
        let started = Instant::now();
        let mut outcome = RepoOutcome::new(&descriptor.name);
        log::info!("Cloning {}...", descriptor.url);

        let handle = match self.lifecycle.acquire(descriptor).await {
            Ok(h) => h,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("Skipping {}: {}", descriptor.name, e);
                outcome.status = ScanStatus::AcquireFailed;
                outcome.error = Some(e.to_string());
                outcome.elapsed = started.elapsed();
                return Ok(outcome);
            }
        };

        let scanned = self.scan_history(&handle, &mut outcome).await;

        // Every job is joined; a detached timed-out read just fails once the directory is gone
        if let Err(w) = self.lifecycle.release(handle) {
            outcome.cleanup_warning = Some(w);
        }

        match scanned {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("{}: {}", descriptor.name, e);
                outcome.status = ScanStatus::Failed;
                outcome.error = Some(e.to_string());
            }
        }

        outcome.settle();
        outcome.elapsed = started.elapsed();
        log::info!(
            "{}: {} in {}, {} new findings",
            descriptor.name,
            outcome.status.label(),
            format_elapsed(outcome.elapsed),
            outcome.new_findings
        );
        Ok(outcome)
    }

    async fn scan_history(&self, handle: &RepositoryHandle, outcome: &mut RepoOutcome) -> Result<()> {
        let path = handle.path().to_path_buf();
        let blobs = B::open(&path)?;

        let (tx, mut rx) = mpsc::channel(self.concurrency * 4);
        let walker = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || walk_history(&path, &tx))
        };

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut jobs: JoinSet<FileScan> = JoinSet::new();
        let mut fatal: Option<ScanError> = None;
        let mut progress: Option<Box<dyn ProgressHandle>> = None;

        'walk: while let Some(item) = rx.recv().await {
            let (commit, changes) = match item {
                WalkItem::Total { commits, unreadable } => {
                    outcome.commits_skipped += unreadable;
                    progress = Some(self.progress.start(&handle.descriptor().name, commits));
                    continue;
                }
                WalkItem::Commit { id, changes } => (id, changes),
            };
            outcome.commits_walked += 1;
            if let Some(pb) = &progress {
                pb.inc(1);
            }

            let paths = match changes {
                Ok(paths) => paths,
                Err(e) => {
                    log::warn!("Skipping commit {}: {}", commit.short(), e);
                    outcome.commits_skipped += 1;
                    continue;
                }
            };
            log::debug!("{}: {} changed paths", commit.short(), paths.len());

            for file in paths {
                while let Some(done) = jobs.try_join_next() {
                    tally(done, outcome, &mut fatal);
                }
                if fatal.is_some() || self.cancel.is_cancelled() {
                    break 'walk;
                }
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break 'walk;
                };
                jobs.spawn(scan_file(
                    blobs.clone(),
                    self.store.clone(),
                    commit,
                    file,
                    self.timeout,
                    permit,
                ));
            }
        }
        // The walker notices the closed channel on its next send
        drop(rx);

        while let Some(done) = jobs.join_next().await {
            tally(done, outcome, &mut fatal);
        }
        if let Some(pb) = progress {
            pb.finish();
        }

        if self.cancel.is_cancelled() {
            outcome.interrupted = true;
        }
        history_result(&path, walker.await, fatal)
    }
}

/// A fatal job error wins over anything the walker thread reported
fn history_result(
    path: &Path,
    walked: std::result::Result<Result<()>, JoinError>,
    fatal: Option<ScanError>,
) -> Result<()> {
    if let Some(e) = fatal {
        return Err(e);
    }
    walked.map_err(|e| ScanError::access(path, e))?
}

/// Runs on a blocking thread: list commits, then stream each one's changes
fn walk_history(path: &Path, tx: &mpsc::Sender<WalkItem>) -> Result<()> {
    let walker = CommitWalker::open(path)?;
    let (commits, unreadable) = walker.walk_commits()?;
    log::debug!("{}: {} commits", path.display(), commits.len());

    let total = WalkItem::Total {
        commits: commits.len() as u64,
        unreadable,
    };
    if tx.blocking_send(total).is_err() {
        return Ok(());
    }
    for id in commits {
        let changes = walker.list_changed_files(id);
        if tx.blocking_send(WalkItem::Commit { id, changes }).is_err() {
            break;
        }
    }
    Ok(())
}

/// Retrieve one file, scan it and record new tokens.
///
/// A retrieval that outlives the timeout is detached and the job fails at
/// once, returning its permit; its late result is dropped.
async fn scan_file<S: FindingSink + 'static, B: BlobSource>(
    blobs: B,
    store: Arc<FindingStore<S>>,
    commit: CommitId,
    path: BString,
    timeout: Duration,
    _permit: OwnedSemaphorePermit,
) -> FileScan {
    let display = path.to_string();
    let mut fetch = tokio::task::spawn_blocking(move || blobs.get_content(commit, &path));

    let lookup = match tokio::time::timeout(timeout, &mut fetch).await {
        Ok(Ok(lookup)) => lookup,
        Ok(Err(join)) => return FileScan::Failed(job_failed(commit, &display, join)),
        Err(_) => {
            log::debug!("abandoning read of {} at {}", display, commit.short());
            return FileScan::Failed(ScanError::Timeout {
                what: format!("reading {} at {}", display, commit.short()),
                after: timeout,
            });
        }
    };

    let content = match lookup {
        Ok(BlobLookup::File(content)) => content,
        Ok(BlobLookup::Directory) => {
            log::info!("Skipping directory {} at {}", display, commit.short());
            return FileScan::Directory;
        }
        Err(e) => return FileScan::Failed(e),
    };

    let recorded = tokio::task::spawn_blocking(move || {
        let tokens = find_tokens(&content);
        store.record_all(&tokens)
    })
    .await;

    match recorded {
        Ok(Ok(new_findings)) => {
            if new_findings > 0 {
                log::info!(
                    "{} new token(s) in {} at {}",
                    new_findings,
                    display,
                    commit.short()
                );
            }
            FileScan::Scanned { new_findings }
        }
        Ok(Err(e)) => FileScan::Failed(e),
        Err(join) => FileScan::Failed(job_failed(commit, &display, join)),
    }
}

fn job_failed(commit: CommitId, path: &str, join: JoinError) -> ScanError {
    ScanError::unavailable(commit, path.as_bytes(), Unavailable::Unreadable, join)
}

fn tally(
    done: std::result::Result<FileScan, JoinError>,
    outcome: &mut RepoOutcome,
    fatal: &mut Option<ScanError>,
) {
    match done {
        Ok(FileScan::Scanned { new_findings }) => {
            outcome.files_scanned += 1;
            outcome.new_findings += new_findings;
        }
        Ok(FileScan::Directory) => outcome.dirs_skipped += 1,
        Ok(FileScan::Failed(e)) if e.is_absent() => {
            log::debug!("{}", e);
            outcome.files_absent += 1;
        }
        Ok(FileScan::Failed(e)) if e.is_fatal() => {
            outcome.files_failed += 1;
            if fatal.is_none() {
                log::error!("{}", e);
                *fatal = Some(e);
            }
        }
        Ok(FileScan::Failed(e)) => {
            log::warn!("{}", e);
            outcome.files_failed += 1;
        }
        Err(join) => {
            log::warn!("scan job failed: {}", join);
            outcome.files_failed += 1;
        }
    }
}
