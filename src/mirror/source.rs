//! Upstream source host access

use crate::constants::{DEFAULT_SOURCE_API_URL, DEFAULT_USER_AGENT, TAGS_PER_PAGE};
use crate::{ConsoleError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use url::Url;

/// One tag as listed by the source host
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpstreamTag {
    pub name: String,
    pub zipball_url: String,
}

/// Where upstream releases come from
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Every tag of the upstream repository
    async fn list_tags(&self) -> Result<Vec<UpstreamTag>>;

    /// Fetch an archive by URL
    async fn download(&self, url: &str) -> Result<Bytes>;

    /// Archive URL of a branch snapshot
    fn branch_archive_url(&self, branch: &str) -> String;
}

/// GitHub REST API client for one repository
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: Url,
    repository: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, repository: &str, user_agent: &str) -> Result<Self> {
        let api_url = Url::parse(api_url.trim_end_matches('/'))
            .map_err(|e| ConsoleError::config(format!("Invalid source API URL '{}': {}", api_url, e)))?;

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ConsoleError::config(format!("Failed to build source host client: {}", e)))?;

        Ok(Self {
            client,
            api_url,
            repository: repository.trim_matches('/').to_string(),
        })
    }

    /// Client for the public GitHub API
    pub fn github(repository: &str) -> Result<Self> {
        Self::new(DEFAULT_SOURCE_API_URL, repository, DEFAULT_USER_AGENT)
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_url.as_str().trim_end_matches('/'),
            self.repository,
            path
        )
    }

    /// Absolute URLs pass through, paths resolve against the API base
    fn resolve(&self, url: &str) -> Result<Url> {
        self.api_url
            .join(url)
            .map_err(|e| ConsoleError::validation(format!("Invalid archive URL '{}': {}", url, e)))
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.ok();
        Err(ConsoleError::UpstreamRequestFailed {
            message: format!("GET {} returned HTTP {}", url, status.as_u16()),
            status: Some(status.as_u16()),
            body,
        })
    }
}

#[async_trait]
impl SourceHost for GitHubClient {
    async fn list_tags(&self) -> Result<Vec<UpstreamTag>> {
        let mut tags = Vec::new();
        let mut page = 1u32;

        loop {
            let url = self.resolve(&format!(
                "{}?per_page={}&page={}",
                self.endpoint("tags"),
                TAGS_PER_PAGE,
                page
            ))?;
            let batch: Vec<UpstreamTag> = self.get(url).await?.json().await?;
            let count = batch.len();
            tracing::debug!(repository = %self.repository, page, count, "Listed upstream tags");

            tags.extend(batch);
            if count < TAGS_PER_PAGE as usize {
                break;
            }
            page += 1;
        }

        Ok(tags)
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        let url = self.resolve(url)?;
        let bytes = self.get(url).await?.bytes().await?;
        Ok(bytes)
    }

    fn branch_archive_url(&self, branch: &str) -> String {
        self.endpoint(&format!("zipball/{}", branch))
    }
}
