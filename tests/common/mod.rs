// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use git2::{Oid, Repository, Signature};
use hexsweep::config::ScanConfig;
use hexsweep::error::{Result, ScanError};
use hexsweep::model::CommitId;
use hexsweep::repository::{
    BlobLookup, BlobRetriever, BlobSource, CloneControl, CloneProvider, FileSink, FindingStore,
    Git2Cloner,
};
use hexsweep::scanner::{Cancellation, NoopProgress, Scanner};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A deterministic 64-char hex token built from one byte
pub fn token(seed: u8) -> String {
    format!("{:02x}", seed).repeat(32)
}

/// Create a temporary git repository with user config
pub fn create_test_repo() -> (TempDir, PathBuf, Repository) {
    let dir = TempDir::new().unwrap();
    let repo_path = dir.path().join("origin");
    let repo = Repository::init(&repo_path).unwrap();

    // Configure git user for commits
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    (dir, repo_path, repo)
}

/// Add files to the repository and create a commit on HEAD
pub fn add_commit(repo: &Repository, files: &[(&str, &[u8])], message: &str) -> Oid {
    let sig = Signature::now("Test User", "test@example.com").unwrap();

    let mut index = repo.index().unwrap();

    for (path, content) in files {
        // Write file to working directory
        let full_path = repo.workdir().unwrap().join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full_path, content).unwrap();

        // Add to index
        index.add_path(Path::new(path)).unwrap();
    }

    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    // Get parent commit if exists
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// Remove a file from the repository and create a commit
pub fn remove_file_commit(repo: &Repository, path: &str, message: &str) -> Oid {
    let sig = Signature::now("Test User", "test@example.com").unwrap();

    // Remove from working directory
    let full_path = repo.workdir().unwrap().join(path);
    if full_path.exists() {
        std::fs::remove_file(&full_path).unwrap();
    }

    // Remove from index
    let mut index = repo.index().unwrap();
    index.remove_path(Path::new(path)).unwrap();
    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let parent = repo.head().unwrap().peel_to_commit().unwrap();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])
        .unwrap()
}

enum Node {
    File(Vec<u8>, i32),
    Dir(BTreeMap<String, Node>),
}

fn insert_node(dir: &mut BTreeMap<String, Node>, parts: &[&str], node: Node) {
    if parts.len() == 1 {
        dir.insert(parts[0].to_string(), node);
        return;
    }
    let child = dir
        .entry(parts[0].to_string())
        .or_insert_with(|| Node::Dir(BTreeMap::new()));
    if let Node::Dir(children) = child {
        insert_node(children, &parts[1..], node);
    }
}

fn write_tree(repo: &Repository, dir: &BTreeMap<String, Node>) -> Oid {
    let mut builder = repo.treebuilder(None).unwrap();
    for (name, node) in dir {
        match node {
            Node::File(content, mode) if *mode == 0o160000 => {
                let target = Oid::from_bytes(content).unwrap();
                builder.insert(name, target, *mode).unwrap();
            }
            Node::File(content, mode) => {
                let oid = repo.blob(content).unwrap();
                builder.insert(name, oid, *mode).unwrap();
            }
            Node::Dir(children) => {
                let oid = write_tree(repo, children);
                builder.insert(name, oid, 0o040000).unwrap();
            }
        }
    }
    builder.write().unwrap()
}

/// Commit a full snapshot (exactly `files`) with explicit parents.
///
/// `update_ref` follows `Repository::commit`: the first parent must match
/// the ref's current target when the ref exists.
pub fn commit_snapshot(
    repo: &Repository,
    files: &[(&str, &[u8])],
    parents: &[Oid],
    update_ref: Option<&str>,
    message: &str,
) -> Oid {
    commit_snapshot_with_submodules(repo, files, &[], parents, update_ref, message)
}

/// Like `commit_snapshot`, plus gitlink entries pointing at `(path, commit)`
pub fn commit_snapshot_with_submodules(
    repo: &Repository,
    files: &[(&str, &[u8])],
    submodules: &[(&str, Oid)],
    parents: &[Oid],
    update_ref: Option<&str>,
    message: &str,
) -> Oid {
    let sig = Signature::now("Test User", "test@example.com").unwrap();

    let mut root = BTreeMap::new();
    for (path, content) in files {
        let parts: Vec<&str> = path.split('/').collect();
        insert_node(&mut root, &parts, Node::File(content.to_vec(), 0o100644));
    }
    for (path, target) in submodules {
        let parts: Vec<&str> = path.split('/').collect();
        insert_node(&mut root, &parts, Node::File(target.as_bytes().to_vec(), 0o160000));
    }
    let tree_id = write_tree(repo, &root);
    let tree = repo.find_tree(tree_id).unwrap();

    let parents: Vec<git2::Commit<'_>> = parents
        .iter()
        .map(|p| repo.find_commit(*p).unwrap())
        .collect();
    let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

    repo.commit(update_ref, &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

/// Path of the loose object file for `oid` inside a non-bare repository
pub fn loose_object_path(repo_dir: &Path, oid: Oid) -> PathBuf {
    let hex = oid.to_string();
    repo_dir
        .join(".git")
        .join("objects")
        .join(&hex[..2])
        .join(&hex[2..])
}

/// Blob id of `path` at `commit`
pub fn blob_id(repo: &Repository, commit: Oid, path: &str) -> Oid {
    repo.find_commit(commit)
        .unwrap()
        .tree()
        .unwrap()
        .get_path(Path::new(path))
        .unwrap()
        .id()
}

pub fn copy_dir_all(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Clone provider that copies a local repository directory verbatim and
/// then deletes selected loose objects to simulate corruption
pub struct CopyCloner {
    pub remove_objects: Vec<Oid>,
}

impl CloneProvider for CopyCloner {
    fn clone_repo(&self, url: &str, dest: &Path, _control: &CloneControl) -> Result<()> {
        copy_dir_all(Path::new(url), dest).map_err(|e| ScanError::Clone {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        for oid in &self.remove_objects {
            let _ = std::fs::remove_file(loose_object_path(dest, *oid));
        }
        Ok(())
    }
}

/// Clone provider that leaves a partial directory behind and fails
pub struct FailingCloner;

impl CloneProvider for FailingCloner {
    fn clone_repo(&self, url: &str, dest: &Path, _control: &CloneControl) -> Result<()> {
        std::fs::create_dir_all(dest.join("partial")).unwrap();
        std::fs::write(dest.join("partial/pack.tmp"), b"half a pack").unwrap();
        Err(ScanError::Clone {
            url: url.to_string(),
            reason: "network unreachable".to_string(),
        })
    }
}

/// Clone provider that produces a directory that is not a repository
pub struct NotARepoCloner;

impl CloneProvider for NotARepoCloner {
    fn clone_repo(&self, _url: &str, dest: &Path, _control: &CloneControl) -> Result<()> {
        std::fs::create_dir_all(dest).unwrap();
        std::fs::write(dest.join("README"), b"not a repository").unwrap();
        Ok(())
    }
}

/// Fails for URLs containing "broken", real libgit2 clone otherwise
pub struct SelectiveCloner;

impl CloneProvider for SelectiveCloner {
    fn clone_repo(&self, url: &str, dest: &Path, control: &CloneControl) -> Result<()> {
        if url.contains("broken") {
            return Err(ScanError::Clone {
                url: url.to_string(),
                reason: "repository not found".to_string(),
            });
        }
        Git2Cloner.clone_repo(url, dest, control)
    }
}

/// Writes part of a clone, then hangs for `stall` without checking for abort
pub struct StalledCloner {
    pub stall: Duration,
}

impl CloneProvider for StalledCloner {
    fn clone_repo(&self, _url: &str, dest: &Path, _control: &CloneControl) -> Result<()> {
        std::fs::create_dir_all(dest.join("objects")).unwrap();
        std::fs::write(dest.join("objects/pack.tmp"), b"half a pack").unwrap();
        std::thread::sleep(self.stall);
        Ok(())
    }
}

/// Writes part of a clone, then waits until told to abort
pub struct CooperativeCloner;

impl CloneProvider for CooperativeCloner {
    fn clone_repo(&self, url: &str, dest: &Path, control: &CloneControl) -> Result<()> {
        std::fs::create_dir_all(dest.join("objects")).unwrap();
        std::fs::write(dest.join("objects/pack.tmp"), b"half a pack").unwrap();
        while !control.should_abort() {
            std::thread::sleep(Duration::from_millis(10));
        }
        Err(ScanError::Clone {
            url: url.to_string(),
            reason: "aborted".to_string(),
        })
    }
}

/// Reads through libgit2 objects, but takes 3s for any file named `slow.txt`
#[derive(Clone)]
pub struct SlowBlobs(BlobRetriever);

impl BlobSource for SlowBlobs {
    fn open(path: &Path) -> Result<Self> {
        Ok(Self(BlobRetriever::open(path)?))
    }

    fn get_content(&self, commit: CommitId, path: &[u8]) -> Result<BlobLookup> {
        if path.ends_with(b"slow.txt") {
            std::thread::sleep(Duration::from_secs(3));
        }
        self.0.get_content(commit, path)
    }
}

/// Scan config rooted in `dir`, small concurrency, short timeout
pub fn test_config(dir: &Path) -> ScanConfig {
    ScanConfig {
        output: dir.join("found.txt"),
        workdir: dir.join("clones"),
        concurrency: 4,
        timeout: Duration::from_secs(30),
        ..ScanConfig::default()
    }
}

/// Build a quiet scanner writing to `config.output`
pub fn create_scanner<C: CloneProvider>(config: &ScanConfig, cloner: C) -> Scanner<C, FileSink> {
    let store = Arc::new(FindingStore::open(&config.output).unwrap());
    Scanner::new(config, cloner, store, Cancellation::new())
        .unwrap()
        .with_progress(Box::new(NoopProgress))
}

/// Tokens recorded in a sink file, in file order
pub fn read_findings(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter_map(|l| l.strip_prefix("Hex: "))
        .map(str::to_string)
        .collect()
}

/// Number of entries left in the clone working directory
pub fn clones_left(config: &ScanConfig) -> usize {
    std::fs::read_dir(&config.workdir)
        .map(|d| d.count())
        .unwrap_or(0)
}
