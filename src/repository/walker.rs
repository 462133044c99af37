//! Commit walker
//!
//! Enumerates every commit reachable from any reference and the paths each
//! commit touched.

use git2::{Delta, DiffOptions, Oid, Repository, Sort, Tree};
use gix::bstr::BString;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScanError};
use crate::model::CommitId;

/// Paths (repository-relative, raw bytes) changed by one commit
pub type ChangedFileSet = BTreeSet<BString>;

/// Walks the history of a local clone
pub struct CommitWalker {
    repo: Repository,
    path: PathBuf,
}

impl CommitWalker {
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::open(path).map_err(|e| ScanError::access(path, e))?;
        Ok(Self {
            repo,
            path: path.to_path_buf(),
        })
    }

    /// All commits reachable from any reference or HEAD, each exactly once,
    /// parents before children.
    pub fn list_commits(&self) -> Result<Vec<CommitId>> {
        Ok(self.walk_commits()?.0)
    }

    /// Like [`list_commits`](Self::list_commits), also counting commits the
    /// walk could not read.
    ///
    /// libgit2 ends a revwalk at the first missing commit and repeats that
    /// error on every later step, so in that case history is walked again
    /// parent by parent, skipping what cannot be read.
    pub fn walk_commits(&self) -> Result<(Vec<CommitId>, u64)> {
        let tips = self.tips()?;
        let mut walk = self.repo.revwalk().map_err(|e| self.access(e))?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)
            .map_err(|e| self.access(e))?;
        for tip in &tips {
            walk.push(*tip).map_err(|e| self.access(e))?;
        }

        let mut commits = Vec::new();
        for oid in walk {
            match oid {
                Ok(oid) => commits.push(self.commit_id(oid)?),
                Err(e) => {
                    log::warn!(
                        "{}: history walk failed ({}), walking parents one by one",
                        self.path.display(),
                        e.message()
                    );
                    return self.walk_readable(&tips);
                }
            }
        }
        Ok((commits, 0))
    }

    /// Branch, tag and HEAD commits, each once
    fn tips(&self) -> Result<Vec<Oid>> {
        let mut tips = Vec::new();
        let references = self.repo.references().map_err(|e| self.access(e))?;
        for reference in references {
            let reference = match reference {
                Ok(r) => r,
                Err(e) => {
                    log::debug!("skipping unreadable reference: {}", e);
                    continue;
                }
            };
            // Tags on trees or blobs do not lead to history
            if let Ok(commit) = reference.peel_to_commit() {
                tips.push(commit.id());
            }
        }
        // Detached HEAD in a fresh clone is not under refs/
        if let Ok(commit) = self.repo.head().and_then(|h| h.peel_to_commit()) {
            tips.push(commit.id());
        }
        let mut seen = FxHashSet::default();
        tips.retain(|oid| seen.insert(*oid));
        Ok(tips)
    }

    /// Depth-first walk from `tips` emitting parents before children.
    ///
    /// A commit that cannot be read is counted and its ancestry is only
    /// reached through other paths.
    fn walk_readable(&self, tips: &[Oid]) -> Result<(Vec<CommitId>, u64)> {
        let mut commits = Vec::new();
        let mut unreadable = 0;
        let mut visited = FxHashSet::default();
        let mut stack: Vec<(Oid, bool)> = tips.iter().rev().map(|oid| (*oid, false)).collect();

        while let Some((oid, expanded)) = stack.pop() {
            if expanded {
                commits.push(self.commit_id(oid)?);
                continue;
            }
            if !visited.insert(oid) {
                continue;
            }
            let commit = match self.repo.find_commit(oid) {
                Ok(c) => c,
                Err(e) => {
                    log::warn!("{}: skipping commit {}: {}", self.path.display(), oid, e.message());
                    unreadable += 1;
                    continue;
                }
            };
            stack.push((oid, true));
            let parents: Vec<Oid> = commit.parent_ids().collect();
            for parent in parents.into_iter().rev() {
                if !visited.contains(&parent) {
                    stack.push((parent, false));
                }
            }
        }
        Ok((commits, unreadable))
    }

    fn commit_id(&self, oid: Oid) -> Result<CommitId> {
        CommitId::from_git2(oid).ok_or_else(|| self.access(format!("unsupported object id {}", oid)))
    }

    /// Paths touched by `commit`.
    ///
    /// Root commits report every file in their tree. Merges report only paths
    /// that differ from every parent, so a clean merge is empty.
    pub fn list_changed_files(&self, commit: CommitId) -> Result<ChangedFileSet> {
        let not_found = || ScanError::CommitNotFound(commit.to_string());
        let oid = commit.to_git2().ok_or_else(not_found)?;
        let commit_obj = self.repo.find_commit(oid).map_err(|_| not_found())?;
        let tree = commit_obj.tree().map_err(|e| self.access(e))?;

        if commit_obj.parent_count() == 0 {
            return self.diff_paths(None, &tree);
        }

        let mut combined: Option<ChangedFileSet> = None;
        // Commit::parents() stops silently at a parent it cannot read
        for parent_id in commit_obj.parent_ids() {
            let parent = self.repo.find_commit(parent_id).map_err(|e| self.access(e))?;
            let parent_tree = parent.tree().map_err(|e| self.access(e))?;
            let changed = self.diff_paths(Some(&parent_tree), &tree)?;
            combined = Some(match combined {
                None => changed,
                Some(acc) => acc.intersection(&changed).cloned().collect(),
            });
        }
        Ok(combined.unwrap_or_default())
    }

    fn diff_paths(&self, old: Option<&Tree<'_>>, new: &Tree<'_>) -> Result<ChangedFileSet> {
        let mut opts = DiffOptions::new();
        opts.include_typechange(true);
        let diff = self
            .repo
            .diff_tree_to_tree(old, Some(new), Some(&mut opts))
            .map_err(|e| self.access(e))?;

        let mut paths = ChangedFileSet::new();
        for delta in diff.deltas() {
            let file = if delta.status() == Delta::Deleted {
                delta.old_file()
            } else {
                delta.new_file()
            };
            if let Some(path) = file.path_bytes() {
                paths.insert(BString::from(path));
            }
        }
        Ok(paths)
    }

    fn access(&self, err: impl std::fmt::Display) -> ScanError {
        ScanError::access(&self.path, err)
    }
}
