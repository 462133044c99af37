use std::path::Path;
use walkdir::WalkDir;

/// Turns a repository name into a safe, single-component directory name.
///
/// Anything other than ASCII alphanumerics, '-', '_' and '.' becomes '_',
/// leading dots are dropped, and `seq` is appended so concurrent or repeated
/// names never collide.
pub fn clone_dir_name(name: &str, seq: u64) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let base = if cleaned.is_empty() { "repo" } else { cleaned };
    format!("{}-{}-{}", base, std::process::id(), seq)
}

/// Size of the pack files in a bare clone.
///
/// Only `objects/pack` is visited; loose objects are not counted.
pub fn pack_size(repo: &Path) -> u64 {
    WalkDir::new(repo.join("objects").join("pack"))
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|m| m.len())
        .sum()
}
