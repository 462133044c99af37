//! Blob retriever
//!
//! Reads file content at a given commit straight from the object database.
//! The working tree is never touched.

use gix::ObjectId;
use gix::prelude::FindExt;
use std::path::Path;

use crate::error::{Result, ScanError, Unavailable};
use crate::model::CommitId;

/// What a path resolved to at a commit
#[derive(Debug, PartialEq, Eq)]
pub enum BlobLookup {
    File(Vec<u8>),
    /// The path names a tree; callers skip it
    Directory,
}

/// Historical file content for scan jobs.
///
/// Opened once per clone and shared by every job reading from it.
pub trait BlobSource: Clone + Send + Sync + 'static {
    fn open(path: &Path) -> Result<Self>;

    /// Content of `path` as it existed at `commit`
    fn get_content(&self, commit: CommitId, path: &[u8]) -> Result<BlobLookup>;
}

/// Thread-safe handle for reading historical file content.
///
/// Cloning is cheap; each call works on a thread-local view of the repository.
#[derive(Clone)]
pub struct BlobRetriever {
    repo: gix::ThreadSafeRepository,
}

impl BlobRetriever {
    pub fn open(path: &Path) -> Result<Self> {
        let repo = gix::open(path).map_err(|e| ScanError::access(path, e))?;
        Ok(Self {
            repo: repo.into_sync(),
        })
    }

    /// Content of `path` as it existed at `commit`
    pub fn get_content(&self, commit: CommitId, path: &[u8]) -> Result<BlobLookup> {
        let repo = self.repo.to_thread_local();
        let odb = &repo.objects;
        let mut buf = Vec::new();

        let mut current: ObjectId = odb
            .find_commit(&commit.0, &mut buf)
            .map_err(|e| ScanError::unavailable(commit, path, Unavailable::Unreadable, e))?
            .tree();

        let mut components = path.split(|b| *b == b'/').filter(|c| !c.is_empty()).peekable();
        if components.peek().is_none() {
            return Ok(BlobLookup::Directory);
        }

        while let Some(name) = components.next() {
            let tree = odb
                .find_tree(&current, &mut buf)
                .map_err(|e| ScanError::unavailable(commit, path, Unavailable::Unreadable, e))?;
            let entry = tree.entries.iter().find(|e| {
                let filename: &[u8] = e.filename;
                filename == name
            });
            let (mode, oid) = match entry {
                Some(e) => (e.mode, e.oid.to_owned()),
                None => {
                    return Err(ScanError::unavailable(
                        commit,
                        path,
                        Unavailable::Absent,
                        "path does not exist at this commit",
                    ));
                }
            };

            if components.peek().is_some() {
                if !mode.is_tree() {
                    return Err(ScanError::unavailable(
                        commit,
                        path,
                        Unavailable::NotAFile,
                        "parent is not a directory",
                    ));
                }
                current = oid;
                continue;
            }

            if mode.is_tree() {
                return Ok(BlobLookup::Directory);
            }
            if mode.is_commit() {
                return Err(ScanError::unavailable(
                    commit,
                    path,
                    Unavailable::Submodule,
                    "submodule reference",
                ));
            }
            let blob = odb
                .find_blob(&oid, &mut buf)
                .map_err(|e| ScanError::unavailable(commit, path, Unavailable::Unreadable, e))?;
            return Ok(BlobLookup::File(blob.data.to_vec()));
        }

        Err(ScanError::unavailable(commit, path, Unavailable::Absent, "empty path"))
    }
}

impl BlobSource for BlobRetriever {
    fn open(path: &Path) -> Result<Self> {
        BlobRetriever::open(path)
    }

    fn get_content(&self, commit: CommitId, path: &[u8]) -> Result<BlobLookup> {
        BlobRetriever::get_content(self, commit, path)
    }
}
