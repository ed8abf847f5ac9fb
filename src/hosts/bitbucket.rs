//! Bitbucket 2.0 REST API host adapter

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use crate::config::{FETCH_TIMEOUT_SECS, TAGS_PAGE_SIZE, USER_AGENT};
use crate::error::ProtocolError;
use crate::hosts::CodeHost;
use crate::module::version;
use crate::protocol::RevInfo;

/// Default base URL for the Bitbucket 2.0 API
const DEFAULT_API_BASE: &str = "https://api.bitbucket.org/2.0";

/// Default base URL archives are served from
const DEFAULT_ARCHIVE_BASE: &str = "https://bitbucket.org";

/// Commit target, shared by commit, tag ref and branch ref resources
#[derive(Debug, Deserialize)]
struct Commit {
    hash: String,
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TagsPage {
    values: Vec<TagRef>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Ref {
    target: Commit,
}

#[derive(Debug, Deserialize)]
struct Repository {
    mainbranch: Branch,
}

#[derive(Debug, Deserialize)]
struct Branch {
    name: String,
}

/// [`CodeHost`] implementation backed by the Bitbucket 2.0 API
pub struct BitbucketHost {
    client: reqwest::Client,
    api_base: String,
    archive_base: String,
}

impl BitbucketHost {
    /// Creates a new BitbucketHost with custom API and archive base
    /// URLs.
    pub fn new(api_base: &str, archive_base: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
                .build()
                .expect("Failed to create HTTP client"),
            api_base: api_base.to_string(),
            archive_base: archive_base.to_string(),
        }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProtocolError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProtocolError::NotFound);
        }
        if !status.is_success() {
            warn!("Bitbucket API returned status {}: {}", status, url);
            return Err(ProtocolError::Upstream(format!(
                "unexpected status {status} from {url}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ProtocolError::Upstream(format!("decoding {url}: {e}")))
    }
}

impl Default for BitbucketHost {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE, DEFAULT_ARCHIVE_BASE)
    }
}

#[async_trait::async_trait]
impl CodeHost for BitbucketHost {
    async fn tags(&self, owner: &str, repo: &str) -> Result<Vec<String>, ProtocolError> {
        let mut names = Vec::new();
        let mut page = 1u32;
        loop {
            let url = format!(
                "{}/repositories/{owner}/{repo}/refs/tags?pagelen={TAGS_PAGE_SIZE}&page={page}",
                self.api_base
            );
            let body: TagsPage = self.fetch_json(&url).await?;
            if body.values.is_empty() {
                break;
            }

            names.extend(body.values.into_iter().map(|t| t.name));
            // The page past the last is a client error upstream, so a
            // missing next link also terminates.
            if body.next.is_none() {
                break;
            }
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
        let url = format!("{}/repositories/{owner}/{repo}/commit/{sha}", self.api_base);
        let commit: Commit = self.fetch_json(&url).await?;
        let short = version::short_sha(&commit.hash).to_string();
        Ok(RevInfo {
            version: version::pseudo(commit.date, &short),
            name: commit.hash,
            short,
            time: commit.date,
        })
    }

    async fn tag_info(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<RevInfo, ProtocolError> {
        let url = format!(
            "{}/repositories/{owner}/{repo}/refs/tags/{tag}",
            self.api_base
        );
        let tag_ref: Ref = self.fetch_json(&url).await?;
        Ok(RevInfo {
            version: tag.to_string(),
            name: tag_ref.target.hash,
            short: tag.to_string(),
            time: tag_ref.target.date,
        })
    }

    async fn latest_commit(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<(String, DateTime<Utc>), ProtocolError> {
        let url = format!("{}/repositories/{owner}/{repo}", self.api_base);
        let repository: Repository = self.fetch_json(&url).await?;

        let url = format!(
            "{}/repositories/{owner}/{repo}/refs/branches/{}",
            self.api_base, repository.mainbranch.name
        );
        let branch: Ref = self.fetch_json(&url).await?;
        Ok((branch.target.hash, branch.target.date))
    }

    async fn mod_file(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>, ProtocolError> {
        let url = format!(
            "{}/repositories/{owner}/{repo}/src/{git_ref}/go.mod",
            self.api_base
        );
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProtocolError::NotFound);
        }
        if !status.is_success() {
            warn!("Bitbucket API returned status {}: {}", status, url);
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
        Ok(format!(
            "{}/{owner}/{repo}/get/{git_ref}.tar.gz",
            self.archive_base
        ))
    }
}
