//! Vanity import discovery
//!
//! A vanity import path is a domain the module author controls; the
//! real repository is published in a `go-import` meta tag served at
//! `http://<module>?go-get=1`. Each operation performs the discovery,
//! picks the backing protocol by the repository's host prefix, and
//! delegates with the discovered path.

use std::sync::Arc;

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::archive::ZipReader;
use crate::config::{FETCH_TIMEOUT_SECS, USER_AGENT};
use crate::error::ProtocolError;
use crate::module::path::{BITBUCKET_HOST, GITHUB_HOST};
use crate::protocol::{DownloadProtocol, NoOpProtocol, RevInfo};

/// Result of a `go-import` lookup
#[derive(Debug, PartialEq, Eq)]
struct Redirect {
    /// Import path prefix the tag declares; must equal the module
    base: String,
    /// `host + path` of the published repository URL
    path: String,
}

/// Download protocol for vanity import paths
pub struct VanityProtocol {
    github: Arc<dyn DownloadProtocol>,
    bitbucket: Arc<dyn DownloadProtocol>,
    noop: NoOpProtocol,
    client: reqwest::Client,
}

impl VanityProtocol {
    pub fn new(github: Arc<dyn DownloadProtocol>, bitbucket: Arc<dyn DownloadProtocol>) -> Self {
        Self {
            github,
            bitbucket,
            noop: NoOpProtocol,
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    async fn discover(&self, module: &str) -> Result<Redirect, ProtocolError> {
        let url = format!("http://{module}?go-get=1");
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProtocolError::NotFound);
        }
        if !status.is_success() {
            return Err(ProtocolError::Upstream(format!(
                "unexpected status {status} from {url}"
            )));
        }

        let body = response.text().await?;
        let redirect = parse_go_import(&body, module)?;
        debug!("vanity {module} resolves to {}", redirect.path);
        Ok(redirect)
    }

    fn backend(&self, path: &str) -> &dyn DownloadProtocol {
        if path.starts_with(GITHUB_HOST) {
            self.github.as_ref()
        } else if path.starts_with(BITBUCKET_HOST) {
            self.bitbucket.as_ref()
        } else {
            &self.noop
        }
    }
}

/// Extracts the first well-formed `go-import` meta tag and checks its
/// declared prefix against the requested module.
fn parse_go_import(html: &str, module: &str) -> Result<Redirect, ProtocolError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"meta[name="go-import"]"#).expect("static selector");

    for element in document.select(&selector) {
        let Some(content) = element.value().attr("content") else {
            continue;
        };
        let fields: Vec<&str> = content.split_whitespace().collect();
        if fields.len() != 3 {
            continue;
        }

        let base = fields[0];
        let repo_url = Url::parse(fields[2]).map_err(|e| {
            ProtocolError::BadPath(format!("bad go-import target {}: {e}", fields[2]))
        })?;
        let path = format!("{}{}", repo_url.host_str().unwrap_or_default(), repo_url.path());

        if base != module {
            return Err(ProtocolError::BadPath(format!(
                "go-import declares {base}, requested {module}"
            )));
        }

        return Ok(Redirect {
            base: base.to_string(),
            path,
        });
    }

    Err(ProtocolError::BadPath(format!(
        "no go-import meta tag at {module}"
    )))
}

#[async_trait::async_trait]
impl DownloadProtocol for VanityProtocol {
    async fn list(&self, module: &str) -> Result<Vec<String>, ProtocolError> {
        let redirect = self.discover(module).await?;
        self.backend(&redirect.path).list(&redirect.path).await
    }

    async fn info(&self, module: &str, version: &str) -> Result<RevInfo, ProtocolError> {
        let redirect = self.discover(module).await?;
        self.backend(&redirect.path)
            .info(&redirect.path, version)
            .await
    }

    async fn latest(&self, module: &str) -> Result<RevInfo, ProtocolError> {
        let redirect = self.discover(module).await?;
        self.backend(&redirect.path).latest(&redirect.path).await
    }

    async fn go_mod(&self, module: &str, version: &str) -> Result<Vec<u8>, ProtocolError> {
        let redirect = self.discover(module).await?;
        let bytes = self
            .backend(&redirect.path)
            .go_mod(&redirect.path, version)
            .await?;

        // Same rewrite rule as the alias layer: a synthesized
        // manifest must name the vanity path, not the repository.
        if bytes == format!("module {}\n", redirect.path).into_bytes() {
            return Ok(format!("module {module}\n").into_bytes());
        }

        Ok(bytes)
    }

    async fn zip(
        &self,
        module: &str,
        version: &str,
        _prefix_override: &str,
    ) -> Result<ZipReader, ProtocolError> {
        let redirect = self.discover(module).await?;
        self.backend(&redirect.path)
            .zip(&redirect.path, version, &redirect.base)
            .await
    }
}
