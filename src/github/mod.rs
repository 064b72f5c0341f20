pub mod types;

pub use types::{CommitStatus, Issue, PullResponse, Review};

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::notify::Provider;
use crate::policy::types::{PrRef, GATE_LABEL};

const USER_AGENT: &str = "boopcheck";

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

/// Thin client over the GitHub REST API. The base URL is configurable so
/// tests can point it at a local server.
pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
    api_url: String,
}

impl GitHubClient {
    pub fn new(token: String, api_url: impl Into<String>) -> GitHubClient {
        GitHubClient {
            http: reqwest::Client::new(),
            token,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{}", self.api_url, path))
            .header("User-Agent", USER_AGENT)
            .bearer_auth(&self.token)
    }

    /// List the open issues visible to the bot that carry the gate label.
    #[instrument(skip(self))]
    pub async fn list_gated_issues(&self) -> Result<Vec<Issue>, GitHubError> {
        let issues = self
            .get("/issues")
            .query(&[("filter", "all"), ("state", "open"), ("labels", GATE_LABEL)])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Issue>>()
            .await?;
        debug!(count = issues.len(), "listed gated issues");
        Ok(issues)
    }

    #[instrument(skip(self), fields(owner = %pr.owner, repo = %pr.repo, pr = pr.number))]
    pub async fn get_pull(&self, pr: &PrRef) -> Result<PullResponse, GitHubError> {
        let pull = self
            .get(&format!(
                "/repos/{}/{}/pulls/{}",
                pr.owner, pr.repo, pr.number
            ))
            .send()
            .await?
            .error_for_status()?
            .json::<PullResponse>()
            .await?;
        Ok(pull)
    }

    #[instrument(skip(self), fields(owner = %pr.owner, repo = %pr.repo, pr = pr.number))]
    pub async fn list_reviews(&self, pr: &PrRef) -> Result<Vec<Review>, GitHubError> {
        let reviews = self
            .get(&format!(
                "/repos/{}/{}/pulls/{}/reviews",
                pr.owner, pr.repo, pr.number
            ))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Review>>()
            .await?;
        Ok(reviews)
    }

    /// Commit statuses for a ref, newest first. Queried against the head
    /// repo, which may be a fork.
    #[instrument(skip(self))]
    pub async fn list_statuses(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<Vec<CommitStatus>, GitHubError> {
        let statuses = self
            .get(&format!(
                "/repos/{}/{}/commits/{}/statuses",
                owner, repo, git_ref
            ))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<CommitStatus>>()
            .await?;
        Ok(statuses)
    }

    /// Fetch the raw unified diff via GitHub's diff media type.
    #[instrument(skip(self), fields(owner = %pr.owner, repo = %pr.repo, pr = pr.number))]
    pub async fn get_diff(&self, pr: &PrRef) -> Result<String, GitHubError> {
        let diff_text = self
            .get(&format!(
                "/repos/{}/{}/pulls/{}",
                pr.owner, pr.repo, pr.number
            ))
            .header("Accept", "application/vnd.github.diff")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!(diff_bytes = diff_text.len(), "received PR diff");
        Ok(diff_text)
    }
}

#[async_trait]
impl Provider for GitHubClient {
    async fn remove_label(&self, pr: &PrRef, name: &str) -> Result<(), GitHubError> {
        self.http
            .delete(format!(
                "{}/repos/{}/{}/issues/{}/labels/{}",
                self.api_url, pr.owner, pr.repo, pr.number, name
            ))
            .header("User-Agent", USER_AGENT)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn add_labels(&self, pr: &PrRef, names: &[&str]) -> Result<(), GitHubError> {
        self.http
            .post(format!(
                "{}/repos/{}/{}/issues/{}/labels",
                self.api_url, pr.owner, pr.repo, pr.number
            ))
            .header("User-Agent", USER_AGENT)
            .bearer_auth(&self.token)
            .json(&json!({ "labels": names }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn create_comment(&self, pr: &PrRef, body: &str) -> Result<(), GitHubError> {
        self.http
            .post(format!(
                "{}/repos/{}/{}/issues/{}/comments",
                self.api_url, pr.owner, pr.repo, pr.number
            ))
            .header("User-Agent", USER_AGENT)
            .bearer_auth(&self.token)
            .json(&json!({ "body": body }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
