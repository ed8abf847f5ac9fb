//! Code host capability surface
//!
//! A [`CodeHost`] exposes the primitive operations the generic
//! protocol needs from a hosting service: ref listing, commit and tag
//! metadata, default-branch lookup, raw manifest fetch, and archive
//! URL resolution. Adapters are stateless apart from their HTTP
//! client handles.

#[cfg(test)]
use mockall::automock;

use chrono::{DateTime, Utc};

use crate::error::ProtocolError;
use crate::protocol::RevInfo;

pub mod bitbucket;
pub mod github;

pub use bitbucket::BitbucketHost;
pub use github::GitHubHost;

/// Primitive operations of a code hosting service
///
/// Cancellation is expressed by dropping the operation future, which
/// aborts any in-flight upstream request.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait CodeHost: Send + Sync {
    /// Lists ref names, paging internally until a page comes back
    /// empty. Order follows the host's pagination order.
    async fn tags(&self, owner: &str, repo: &str) -> Result<Vec<String>, ProtocolError>;

    /// Resolves a commit identifier to revision metadata. The
    /// returned record carries a pseudo-version built from the commit
    /// time and short hash.
    async fn commit_info(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<RevInfo, ProtocolError>;

    /// Resolves a tag name to revision metadata. `Short` and
    /// `Version` are the tag itself.
    async fn tag_info(&self, owner: &str, repo: &str, tag: &str)
        -> Result<RevInfo, ProtocolError>;

    /// The tip commit of the default branch.
    async fn latest_commit(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<(String, DateTime<Utc>), ProtocolError>;

    /// Raw bytes of the module manifest at the given ref.
    /// A definitive upstream absence is `NotFound`.
    async fn mod_file(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Absolute URL of a gzipped tar archive of the given ref.
    async fn tar_url(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<String, ProtocolError>;
}
