use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, ScanError};

pub const DEFAULT_QUERY: &str = "eth";
pub const DEFAULT_OUTPUT: &str = "hex_strings_found.txt";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_REPOS: usize = 30;

/// Settings for one scan run
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Repository search query
    pub query: String,
    /// Findings sink, appended to
    pub output: PathBuf,
    /// Parent directory for temporary clones
    pub workdir: PathBuf,
    /// Concurrent scan jobs within one repository
    pub concurrency: usize,
    /// Bound on a single clone or file retrieval
    pub timeout: Duration,
    /// Explicit repository URLs; when non-empty, search is not used
    pub repos: Vec<String>,
    /// Logical repository names to skip
    pub skip: Vec<String>,
    pub max_repos: usize,
    pub github_token: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            workdir: default_workdir(),
            concurrency: default_concurrency(),
            timeout: DEFAULT_TIMEOUT,
            repos: Vec::new(),
            skip: Vec::new(),
            max_repos: DEFAULT_MAX_REPOS,
            github_token: None,
        }
    }
}

impl ScanConfig {
    /// Reject settings that make the run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ScanError::FatalSetup("concurrency must be at least 1".into()));
        }
        if self.timeout.is_zero() {
            return Err(ScanError::FatalSetup("timeout must be positive".into()));
        }
        if self.repos.is_empty() && self.query.trim().is_empty() {
            return Err(ScanError::FatalSetup(
                "either a search query or at least one --repo is required".into(),
            ));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ScanError::FatalSetup("output path is empty".into()));
        }
        Ok(())
    }
}

/// `<cache dir>/hexsweep/clones`, or a relative directory when no cache dir exists
pub fn default_workdir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("hexsweep").join("clones"))
        .unwrap_or_else(|| PathBuf::from("hexsweep_clones"))
}

pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
