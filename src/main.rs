use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use hexsweep::cli::Cli;
use hexsweep::discovery::{GithubSearch, StaticSource};
use hexsweep::model::RunSummary;
use hexsweep::repository::{FindingStore, Git2Cloner};
use hexsweep::scanner::{Cancellation, NoopProgress, Scanner};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .target(env_logger::Target::Stderr)
        .init();

    match run(&cli).await {
        Ok(summary) if summary.cancelled => ExitCode::from(130),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<RunSummary> {
    let config = cli.to_config();
    config.validate()?;

    let store = Arc::new(
        FindingStore::open(&config.output)
            .with_context(|| format!("Cannot open output {}", config.output.display()))?,
    );
    log::info!("Appending findings to {}", config.output.display());

    let cancel = Cancellation::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, finishing in-flight work and cleaning up...");
                cancel.cancel();
            }
        });
    }

    let mut scanner = Scanner::new(&config, Git2Cloner, store, cancel)?;
    if cli.quiet {
        scanner = scanner.with_progress(Box::new(NoopProgress));
    }
    let registry = scanner.registry();

    let result = if config.repos.is_empty() {
        let mut source =
            GithubSearch::new(&config.query, config.github_token.clone(), config.max_repos)?;
        scanner.run(&mut source).await
    } else {
        scanner.run(&mut StaticSource::from_urls(&config.repos)).await
    };

    for warning in registry.sweep() {
        log::warn!("{}", warning);
    }

    let summary = result?;
    summary.log_report();
    Ok(summary)
}
