//! Download protocol layers
//!
//! This module provides the host-agnostic implementation of the five
//! download protocol operations and the layers that route import
//! paths to it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  Dispatcher │────▶│ HostProtocol │────▶│  CodeHost   │
//! │  (routing)  │     │  (generic)   │     │ (adapters)  │
//! └─────────────┘     └──────────────┘     └─────────────┘
//!        │                    ▲
//!        ▼                    │
//! ┌─────────────┐     ┌──────────────┐
//! │   Vanity    │     │ MajorInPath  │
//! │ (discovery) │     │   (alias)    │
//! └─────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`generic`]: the five operations over a [`crate::hosts::CodeHost`]
//! - [`dispatch`]: prefix-keyed routing between protocol instances
//! - [`alias`]: major-in-path aliases (`gopkg.in/yaml.v2`)
//! - [`vanity`]: HTML meta-tag discovery for vanity import paths
//! - [`noop`]: the protocol unknown paths fall through to

#[cfg(test)]
use mockall::automock;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::archive::ZipReader;
use crate::error::ProtocolError;
use crate::hosts::{BitbucketHost, GitHubHost};
use crate::module::path::{BITBUCKET_HOST, GITHUB_HOST, GOPKG_HOST};

pub mod alias;
pub mod dispatch;
pub mod generic;
pub mod noop;
pub mod vanity;

pub use alias::MajorInPathProtocol;
pub use dispatch::Dispatcher;
pub use generic::HostProtocol;
pub use noop::NoOpProtocol;
pub use vanity::VanityProtocol;

/// A single revision in a module repository
///
/// Serialized form is the `.info` endpoint contract: PascalCase field
/// names and an RFC3339 commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RevInfo {
    /// Client-facing version string
    pub version: String,
    /// Complete commit identifier in the underlying repository
    pub name: String,
    /// Shortened identifier: the tag for tagged revisions, the first
    /// twelve characters of `name` for pseudo-versions
    pub short: String,
    /// Commit time in UTC
    pub time: DateTime<Utc>,
}

/// The five operations of the module download protocol
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait DownloadProtocol: Send + Sync {
    /// All canonical semantic tags of the module, in host order.
    async fn list(&self, module: &str) -> Result<Vec<String>, ProtocolError>;

    /// Revision metadata for one version.
    async fn info(&self, module: &str, version: &str) -> Result<RevInfo, ProtocolError>;

    /// Revision metadata for the default-branch tip, as a
    /// pseudo-version.
    async fn latest(&self, module: &str) -> Result<RevInfo, ProtocolError>;

    /// Raw manifest bytes, or the synthetic single-line manifest when
    /// the repository has none.
    async fn go_mod(&self, module: &str, version: &str) -> Result<Vec<u8>, ProtocolError>;

    /// A streamed zip of the module source, every entry path under
    /// `<module>@<version>/`, or `<prefix_override>@<version>/` when
    /// `prefix_override` is non-empty.
    async fn zip(
        &self,
        module: &str,
        version: &str,
        prefix_override: &str,
    ) -> Result<ZipReader, ProtocolError>;
}

/// Builds the production protocol stack: direct protocols for the
/// GitHub and Bitbucket hosts, the gopkg.in alias on top of GitHub,
/// and vanity discovery as the fallback for unknown hosts.
pub fn standard_stack(github_token: Option<String>) -> Dispatcher {
    let github: Arc<dyn DownloadProtocol> =
        Arc::new(HostProtocol::new(GitHubHost::public(github_token)));
    let bitbucket: Arc<dyn DownloadProtocol> =
        Arc::new(HostProtocol::new(BitbucketHost::default()));
    let gopkg: Arc<dyn DownloadProtocol> =
        Arc::new(MajorInPathProtocol::new(Arc::clone(&github)));
    let vanity: Arc<dyn DownloadProtocol> = Arc::new(VanityProtocol::new(
        Arc::clone(&github),
        Arc::clone(&bitbucket),
    ));

    Dispatcher::new()
        .route(GITHUB_HOST, github)
        .route(BITBUCKET_HOST, bitbucket)
        .route(GOPKG_HOST, gopkg)
        .fallback(vanity)
}
