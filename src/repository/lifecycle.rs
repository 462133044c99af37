//! Repository lifecycle
//!
//! Acquires local clones and guarantees they are removed again. Every live
//! clone is tracked in a registry that can be swept on shutdown.

use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{CleanupWarning, Result, ScanError};
use crate::model::RepositoryDescriptor;
use crate::scanner::Cancellation;
use crate::util::{abort_grace, clone_dir_name, format_size, pack_size};

use super::clone::{CloneControl, CloneProvider};

/// Paths of every clone currently on disk
#[derive(Default)]
pub struct HandleRegistry {
    live: Mutex<FxHashSet<PathBuf>>,
}

impl HandleRegistry {
    fn register(&self, path: &Path) {
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf());
    }

    fn forget(&self, path: &Path) {
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
    }

    pub fn live(&self) -> usize {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Remove every registered clone. Returns the removals that failed.
    pub fn sweep(&self) -> Vec<CleanupWarning> {
        let paths: Vec<PathBuf> = self
            .live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .collect();
        paths
            .into_iter()
            .filter_map(|path| {
                log::info!("Removing leftover clone {}", path.display());
                remove_clone_dir(&path).err()
            })
            .collect()
    }
}

#[derive(Default)]
struct LifecycleCounters {
    acquired: AtomicU64,
    released: AtomicU64,
}

/// An on-disk clone bound to one descriptor.
///
/// Consumed by [`RepositoryLifecycle::release`]; dropping an unreleased
/// handle removes the clone as a fallback.
pub struct RepositoryHandle {
    descriptor: RepositoryDescriptor,
    path: PathBuf,
    registry: Arc<HandleRegistry>,
    counters: Arc<LifecycleCounters>,
    released: bool,
}

impl RepositoryHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn descriptor(&self) -> &RepositoryDescriptor {
        &self.descriptor
    }

    fn remove(&mut self) -> std::result::Result<(), CleanupWarning> {
        self.released = true;
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        let result = remove_clone_dir(&self.path);
        // A failed removal stays registered so the shutdown sweep retries it
        if result.is_ok() {
            self.registry.forget(&self.path);
        }
        result
    }
}

impl Drop for RepositoryHandle {
    fn drop(&mut self) {
        if !self.released {
            if let Err(w) = self.remove() {
                log::warn!("{}", w);
            }
        }
    }
}

fn remove_clone_dir(path: &Path) -> std::result::Result<(), CleanupWarning> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CleanupWarning {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Clones repositories into a working directory and removes them again
pub struct RepositoryLifecycle<C: CloneProvider> {
    workdir: PathBuf,
    cloner: Arc<C>,
    timeout: Duration,
    cancel: Cancellation,
    registry: Arc<HandleRegistry>,
    counters: Arc<LifecycleCounters>,
    seq: AtomicU64,
}

impl<C: CloneProvider> RepositoryLifecycle<C> {
    /// Create the working directory if needed
    pub fn new(workdir: &Path, cloner: C, timeout: Duration, cancel: Cancellation) -> Result<Self> {
        std::fs::create_dir_all(workdir).map_err(|e| {
            ScanError::FatalSetup(format!(
                "cannot create working directory {}: {}",
                workdir.display(),
                e
            ))
        })?;
        Ok(Self {
            workdir: workdir.to_path_buf(),
            cloner: Arc::new(cloner),
            timeout,
            cancel,
            registry: Arc::new(HandleRegistry::default()),
            counters: Arc::new(LifecycleCounters::default()),
            seq: AtomicU64::new(0),
        })
    }

    /// Clone `descriptor` into a fresh directory under the working directory.
    ///
    /// On failure no handle exists to release. The partial directory is
    /// removed right away, or, for a clone that ignores abort, as soon as
    /// its thread finishes; until then it stays registered for the sweep.
    pub async fn acquire(&self, descriptor: &RepositoryDescriptor) -> Result<RepositoryHandle> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let dest = self.workdir.join(clone_dir_name(&descriptor.name, seq));
        remove_clone_dir(&dest).map_err(|w| ScanError::Clone {
            url: descriptor.url.clone(),
            reason: w.to_string(),
        })?;
        self.registry.register(&dest);

        let control = Arc::new(CloneControl::new(self.timeout, self.cancel.clone()));
        let mut task = {
            let cloner = self.cloner.clone();
            let control = control.clone();
            let url = descriptor.url.clone();
            let dest = dest.clone();
            tokio::task::spawn_blocking(move || cloner.clone_repo(&url, &dest, &control))
        };

        let result = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(r)) => r,
            Ok(Err(join)) => Err(ScanError::Clone {
                url: descriptor.url.clone(),
                reason: join.to_string(),
            }),
            Err(_) => {
                control.abort();
                let timed_out = ScanError::Timeout {
                    what: format!("clone of {}", descriptor.url),
                    after: self.timeout,
                };
                // The directory can only go once the clone thread stops writing
                if tokio::time::timeout(abort_grace(self.timeout), &mut task)
                    .await
                    .is_err()
                {
                    log::warn!(
                        "Clone of {} ignored abort; {} is removed once it stops",
                        descriptor.url,
                        dest.display()
                    );
                    self.remove_when_finished(task, dest);
                    return Err(timed_out);
                }
                Err(timed_out)
            }
        };

        match result {
            Ok(()) => {
                self.counters.acquired.fetch_add(1, Ordering::SeqCst);
                log::info!(
                    "Cloned {} ({} packed)",
                    descriptor.name,
                    format_size(pack_size(&dest))
                );
                Ok(RepositoryHandle {
                    descriptor: descriptor.clone(),
                    path: dest,
                    registry: self.registry.clone(),
                    counters: self.counters.clone(),
                    released: false,
                })
            }
            Err(e) => {
                if let Err(w) = remove_clone_dir(&dest) {
                    log::warn!("{}", w);
                } else {
                    self.registry.forget(&dest);
                }
                Err(e)
            }
        }
    }

    fn remove_when_finished(
        &self,
        task: tokio::task::JoinHandle<Result<()>>,
        dest: PathBuf,
    ) {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            let _ = task.await;
            match remove_clone_dir(&dest) {
                Ok(()) => registry.forget(&dest),
                Err(w) => log::warn!("{}", w),
            }
        });
    }

    /// Remove the clone behind `handle`.
    ///
    /// A failure is returned as a warning; it does not invalidate findings.
    pub fn release(&self, mut handle: RepositoryHandle) -> std::result::Result<(), CleanupWarning> {
        let result = handle.remove();
        match &result {
            Ok(()) => log::info!("Removed clone of {}", handle.descriptor.name),
            Err(w) => log::warn!("{}", w),
        }
        result
    }

    pub fn registry(&self) -> Arc<HandleRegistry> {
        self.registry.clone()
    }

    /// Successful acquisitions so far
    pub fn acquired(&self) -> u64 {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    /// Releases so far, explicit or by drop
    pub fn released(&self) -> u64 {
        self.counters.released.load(Ordering::SeqCst)
    }
}
