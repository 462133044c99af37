// Shared benchmark helpers
// Functions here are used across different benchmark files
#![allow(dead_code)]

use git2::{Repository, Signature};
use std::path::PathBuf;
use tempfile::TempDir;

/// A 64-char hex token derived from `i`
pub fn bench_token(i: usize) -> String {
    format!("{:064x}", (i as u128).wrapping_mul(0x9e37_79b9_7f4a_7c15_f39c_c060_5ced_c834))
}

/// Source-like text of roughly `lines` lines, every `every`th carrying a token
pub fn generate_text(lines: usize, every: usize) -> Vec<u8> {
    let mut out = String::new();
    for i in 0..lines {
        if every > 0 && i % every == 0 {
            out.push_str(&format!("const KEY_{}: &str = \"{}\";\n", i, bench_token(i)));
        } else {
            out.push_str(&format!("fn func_{}() -> u64 {{ 0x{:x} }}\n", i, i * 31));
        }
    }
    out.into_bytes()
}

/// Create a temporary git repository for benchmarks
pub fn create_bench_repo() -> (TempDir, PathBuf, Repository) {
    let dir = TempDir::new().unwrap();
    let repo_path = dir.path().join("origin");
    let repo = Repository::init(&repo_path).unwrap();

    // Configure git user for commits
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Bench User").unwrap();
    config.set_str("user.email", "bench@example.com").unwrap();

    (dir, repo_path, repo)
}

/// Add files and create a commit
pub fn add_commit(repo: &Repository, files: &[(&str, &[u8])], message: &str) -> git2::Oid {
    let sig = Signature::now("Bench User", "bench@example.com").unwrap();
    let mut index = repo.index().unwrap();

    for (path, content) in files {
        let full_path = repo.workdir().unwrap().join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full_path, content).unwrap();
        index.add_path(std::path::Path::new(path)).unwrap();
    }

    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());

    if let Some(parent) = parent {
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent]).unwrap()
    } else {
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[]).unwrap()
    }
}

/// Build a history of `commits` commits over `num_files` files.
///
/// The first commit adds every file; each later one rewrites ten of them,
/// planting a fresh token in one.
pub fn populate_history(repo: &Repository, num_files: usize, commits: usize) {
    let files: Vec<_> = (0..num_files)
        .map(|i| {
            let path = format!("src/dir_{}/file_{}.rs", i / 20, i);
            let content = format!("// File {}\nfn func_{}() {{}}\n", i, i);
            (path, content.into_bytes())
        })
        .collect();
    let file_refs: Vec<_> = files.iter()
        .map(|(p, c)| (p.as_str(), c.as_slice()))
        .collect();
    add_commit(repo, &file_refs, "Initial commit");

    for commit_num in 1..commits {
        let modified: Vec<_> = (0..10)
            .map(|i| {
                let file_idx = (commit_num * 10 + i) % num_files;
                let path = format!("src/dir_{}/file_{}.rs", file_idx / 20, file_idx);
                let content = if i == 0 {
                    format!("// v{}\nconst KEY: &str = \"{}\";\n", commit_num, bench_token(commit_num))
                } else {
                    format!("// File {} version {}\n", file_idx, commit_num)
                };
                (path, content.into_bytes())
            })
            .collect();
        let file_refs: Vec<_> = modified.iter()
            .map(|(p, c)| (p.as_str(), c.as_slice()))
            .collect();
        add_commit(repo, &file_refs, &format!("Commit {}", commit_num));
    }
}
