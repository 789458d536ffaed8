//! Commit feed aggregation.
//!
//! Commits are pulled from a configured list of GitHub commit endpoints,
//! merged, ranked newest first and truncated before being published.

pub mod aggregator;
pub mod refresher;

pub use aggregator::CommitAggregator;
pub use refresher::run_periodic;

use crate::error::FetchError;
use crate::models::CommitRecord;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tracing::debug;

/// One upstream commit history.
#[async_trait]
pub trait CommitSource: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Fetch the source's most recent commits.
    async fn fetch(&self) -> Result<Vec<CommitRecord>, FetchError>;
}

/// A GitHub `GET /repos/{owner}/{repo}/commits` endpoint.
#[derive(Debug, Clone)]
pub struct GithubSource {
    client: reqwest::Client,
    url: String,
    per_page: u32,
}

impl GithubSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>, per_page: u32) -> Self {
        Self {
            client,
            url: url.into(),
            per_page,
        }
    }
}

#[async_trait]
impl CommitSource for GithubSource {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<CommitRecord>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("per_page", self.per_page)])
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(FetchError::Request)?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let commits: Vec<CommitRecord> = response.json().await.map_err(FetchError::Decode)?;
        debug!(source = %self.url, count = commits.len(), "Fetched commits");
        Ok(commits)
    }
}
