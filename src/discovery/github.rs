//! GitHub repository search

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use std::collections::VecDeque;

use crate::model::RepositoryDescriptor;

use super::RepositorySource;

const SEARCH_URL: &str = "https://api.github.com/search/repositories";
/// GitHub caps `per_page` at 100
const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    name: String,
    clone_url: String,
}

fn parse_page(body: &str) -> Result<Vec<RepositoryDescriptor>> {
    let page: SearchPage = serde_json::from_str(body).context("Malformed search response")?;
    Ok(page
        .items
        .into_iter()
        .map(|item| RepositoryDescriptor::new(item.clone_url, item.name))
        .collect())
}

/// Paged repository search against the GitHub REST API
pub struct GithubSearch {
    client: reqwest::Client,
    url: String,
    query: String,
    token: Option<String>,
    per_page: usize,
    page: u32,
    max_repos: usize,
    yielded: usize,
    buffer: VecDeque<RepositoryDescriptor>,
    exhausted: bool,
}

impl GithubSearch {
    pub fn new(query: &str, token: Option<String>, max_repos: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: SEARCH_URL.to_string(),
            query: query.to_string(),
            token,
            per_page: max_repos.clamp(1, MAX_PER_PAGE),
            page: 1,
            max_repos,
            yielded: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        })
    }

    /// Point the search at a different endpoint (GitHub Enterprise)
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn fetch_page(&mut self) -> Result<()> {
        log::info!("Searching repositories for {:?} (page {})", self.query, self.page);
        let per_page = self.per_page.to_string();
        let page = self.page.to_string();
        let mut request = self
            .client
            .get(&self.url)
            .query(&[
                ("q", self.query.as_str()),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
            ])
            .header(USER_AGENT, concat!("hexsweep/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("Search request failed")?;
        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            bail!("Search rate limited (HTTP {})", status);
        }
        if !status.is_success() {
            bail!("Search returned HTTP {}", status);
        }

        let body = response.text().await.context("Failed to read search response")?;
        let items = parse_page(&body)?;
        if items.len() < self.per_page {
            self.exhausted = true;
        }
        self.page += 1;
        self.buffer.extend(items);
        Ok(())
    }
}

impl RepositorySource for GithubSearch {
    async fn next(&mut self) -> Option<Result<RepositoryDescriptor>> {
        if self.yielded >= self.max_repos {
            return None;
        }
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fetch_page().await {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        let descriptor = self.buffer.pop_front()?;
        self.yielded += 1;
        Some(Ok(descriptor))
    }
}
