//! Repository discovery
//!
//! Sources of repository descriptors for the orchestrator. An `Err` item
//! ends the input; it never aborts the run.

mod github;

pub use github::GithubSearch;

use anyhow::Result;
use std::collections::VecDeque;

use crate::model::RepositoryDescriptor;

/// A lazily produced sequence of repositories to scan
#[allow(async_fn_in_trait)]
pub trait RepositorySource {
    /// Next descriptor, `None` at end of input
    async fn next(&mut self) -> Option<Result<RepositoryDescriptor>>;
}

/// A fixed list of repositories, e.g. from `--repo`
#[derive(Default)]
pub struct StaticSource {
    items: VecDeque<Result<RepositoryDescriptor>>,
}

impl StaticSource {
    pub fn new(descriptors: impl IntoIterator<Item = RepositoryDescriptor>) -> Self {
        Self {
            items: descriptors.into_iter().map(Ok).collect(),
        }
    }

    pub fn from_urls<S: AsRef<str>>(urls: &[S]) -> Self {
        Self::new(
            urls.iter()
                .map(|u| RepositoryDescriptor::from_url(u.as_ref())),
        )
    }

    /// A source that replays `items` verbatim, errors included
    pub fn from_results(items: impl IntoIterator<Item = Result<RepositoryDescriptor>>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }
}

impl RepositorySource for StaticSource {
    async fn next(&mut self) -> Option<Result<RepositoryDescriptor>> {
        self.items.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_yields_in_order() {
        let mut source = StaticSource::from_urls(&["https://h/a.git", "https://h/b"]);
        assert_eq!(source.next().await.unwrap().unwrap().name, "a");
        assert_eq!(source.next().await.unwrap().unwrap().name, "b");
        assert!(source.next().await.is_none());
    }

    #[tokio::test]
    async fn test_static_source_replays_errors() {
        let mut source = StaticSource::from_results(vec![
            Ok(RepositoryDescriptor::from_url("https://h/a.git")),
            Err(anyhow::anyhow!("page 2 failed")),
        ]);
        assert!(source.next().await.unwrap().is_ok());
        assert!(source.next().await.unwrap().is_err());
        assert!(source.next().await.is_none());
    }
}
