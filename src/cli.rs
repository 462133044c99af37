use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{self, ScanConfig};

#[derive(Parser, Debug)]
#[command(
    name = "hexsweep",
    about = "Scan git history for committed 64-character hex secrets"
)]
pub struct Cli {
    /// Repository search query
    #[arg(short, long, default_value = config::DEFAULT_QUERY)]
    pub query: String,

    /// File that findings are appended to
    #[arg(short, long, default_value = config::DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Directory for temporary clones [default: <cache dir>/hexsweep/clones]
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,

    /// Concurrent file scans per repository [default: CPU count]
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Timeout in seconds for one clone or one file read
    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Scan this repository URL instead of searching (repeatable)
    #[arg(long = "repo", value_name = "URL")]
    pub repos: Vec<String>,

    /// Skip repositories with this name (repeatable)
    #[arg(long, value_name = "NAME")]
    pub skip: Vec<String>,

    /// Maximum number of repositories taken from search
    #[arg(long, default_value_t = config::DEFAULT_MAX_REPOS)]
    pub max_repos: usize,

    /// API token for repository search
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// More logging (debug)
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Less logging (warnings only), no progress bars
    #[arg(long)]
    pub quiet: bool,
}

impl Cli {
    pub fn to_config(&self) -> ScanConfig {
        ScanConfig {
            query: self.query.clone(),
            output: self.output.clone(),
            workdir: self.workdir.clone().unwrap_or_else(config::default_workdir),
            concurrency: self.concurrency.unwrap_or_else(config::default_concurrency),
            timeout: Duration::from_secs(self.timeout),
            repos: self.repos.clone(),
            skip: self.skip.clone(),
            max_repos: self.max_repos,
            github_token: self.github_token.clone(),
        }
    }

    /// Default log filter, overridden by RUST_LOG
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}
