//! GitHub REST API host adapter

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::config::{FETCH_TIMEOUT_SECS, TAGS_PAGE_SIZE, USER_AGENT};
use crate::error::ProtocolError;
use crate::hosts::CodeHost;
use crate::module::version;
use crate::protocol::RevInfo;

/// Default base URL for the GitHub API
const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Tag entry from the tags listing
#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

/// Commit resource, as returned for both commit and tag refs
#[derive(Debug, Deserialize)]
struct Commit {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    committer: CommitSignature,
}

#[derive(Debug, Deserialize)]
struct CommitSignature {
    date: DateTime<Utc>,
}

/// Repository resource; only the default branch is of interest
#[derive(Debug, Deserialize)]
struct Repository {
    default_branch: String,
}

/// [`CodeHost`] implementation backed by the GitHub REST API
pub struct GitHubHost {
    client: reqwest::Client,
    /// Separate client with redirects disabled, so the archive-link
    /// resource yields its `Location` instead of the archive bytes.
    archive_client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubHost {
    /// Creates a new GitHubHost with a custom base URL and an
    /// optional bearer token against rate limiting.
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        let timeout = std::time::Duration::from_secs(FETCH_TIMEOUT_SECS);
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            archive_client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(timeout)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
            token,
        }
    }

    /// Creates a GitHubHost against the public API.
    pub fn public(token: Option<String>) -> Self {
        Self::new(DEFAULT_BASE_URL, token)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn get_commit(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<Commit, ProtocolError> {
        let url = format!("{}/repos/{owner}/{repo}/commits/{git_ref}", self.base_url);
        let response = self.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProtocolError::NotFound);
        }
        if !status.is_success() {
            warn!("GitHub API returned status {}: {}", status, url);
            return Err(ProtocolError::Upstream(format!(
                "unexpected status {status} from {url}"
            )));
        }

        response
            .json::<Commit>()
            .await
            .map_err(|e| ProtocolError::Upstream(format!("decoding commit: {e}")))
    }
}

impl Default for GitHubHost {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, None)
    }
}

#[async_trait::async_trait]
impl CodeHost for GitHubHost {
    async fn tags(&self, owner: &str, repo: &str) -> Result<Vec<String>, ProtocolError> {
        let mut names = Vec::new();
        let mut page = 1u32;
        loop {
            let url = format!(
                "{}/repos/{owner}/{repo}/tags?per_page={TAGS_PAGE_SIZE}&page={page}",
                self.base_url
            );
            let response = self.get(&url).send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(ProtocolError::NotFound);
            }
            if !status.is_success() {
                warn!("GitHub API returned status {}: {}", status, url);
                return Err(ProtocolError::Upstream(format!(
                    "unexpected status {status} from {url}"
                )));
            }

            let tags: Vec<Tag> = response
                .json()
                .await
                .map_err(|e| ProtocolError::Upstream(format!("decoding tags page {page}: {e}")))?;
            if tags.is_empty() {
                break;
            }

            names.extend(tags.into_iter().map(|t| t.name));
            page += 1;
        }

        Ok(names)
    }

    async fn commit_info(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<RevInfo, ProtocolError> {
        let commit = self.get_commit(owner, repo, sha).await?;
        let time = commit.commit.committer.date;
        let short = version::short_sha(&commit.sha).to_string();
        Ok(RevInfo {
            version: version::pseudo(time, &short),
            name: commit.sha,
            short,
            time,
        })
    }

    async fn tag_info(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<RevInfo, ProtocolError> {
        let commit = self.get_commit(owner, repo, tag).await?;
        Ok(RevInfo {
            version: tag.to_string(),
            name: commit.sha,
            short: tag.to_string(),
            time: commit.commit.committer.date,
        })
    }

    async fn latest_commit(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<(String, DateTime<Utc>), ProtocolError> {
        let url = format!("{}/repos/{owner}/{repo}", self.base_url);
        let response = self.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProtocolError::NotFound);
        }
        if !status.is_success() {
            warn!("GitHub API returned status {}: {}", status, url);
            return Err(ProtocolError::Upstream(format!(
                "unexpected status {status} from {url}"
            )));
        }

        let repository: Repository = response
            .json()
            .await
            .map_err(|e| ProtocolError::Upstream(format!("decoding repository: {e}")))?;

        let commit = self
            .get_commit(owner, repo, &repository.default_branch)
            .await?;
        Ok((commit.sha, commit.commit.committer.date))
    }

    async fn mod_file(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>, ProtocolError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/contents/go.mod?ref={git_ref}",
            self.base_url
        );
        let mut req = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.raw+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let response = req.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProtocolError::NotFound);
        }
        if !status.is_success() {
            warn!("GitHub API returned status {}: {}", status, url);
            return Err(ProtocolError::Upstream(format!(
                "unexpected status {status} from {url}"
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn tar_url(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<String, ProtocolError> {
        let url = format!("{}/repos/{owner}/{repo}/tarball/{git_ref}", self.base_url);
        let mut req = self.archive_client.get(&url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let response = req.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProtocolError::NotFound);
        }
        if status.is_redirection() {
            let location = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    ProtocolError::Upstream(format!("redirect without location from {url}"))
                })?;
            return Ok(location.to_string());
        }
        if status.is_success() {
            // The resource serves the archive directly.
            return Ok(url);
        }

        warn!("GitHub API returned status {}: {}", status, url);
        Err(ProtocolError::Upstream(format!(
            "unexpected status {status} from {url}"
        )))
    }
}
