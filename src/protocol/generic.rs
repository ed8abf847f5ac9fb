//! Host-agnostic protocol implementation
//!
//! [`HostProtocol`] implements the five download protocol operations
//! purely in terms of the [`CodeHost`] capability surface, so one
//! implementation serves every direct host.

use crate::archive::{self, ZipReader};
use crate::config::USER_AGENT;
use crate::error::ProtocolError;
use crate::hosts::CodeHost;
use crate::module::{path, version};
use crate::protocol::{DownloadProtocol, RevInfo};

/// Generic download protocol over a single [`CodeHost`]
pub struct HostProtocol<H> {
    host: H,
    /// Client used for the archive download itself. Built without a
    /// request timeout: archive transfers legitimately run long.
    client: reqwest::Client,
}

impl<H: CodeHost> HostProtocol<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

#[async_trait::async_trait]
impl<H: CodeHost> DownloadProtocol for HostProtocol<H> {
    async fn list(&self, module: &str) -> Result<Vec<String>, ProtocolError> {
        let (owner, repo) = path::split_path(module)?;
        let tags = self.host.tags(&owner, &repo).await?;

        Ok(tags
            .into_iter()
            .filter(|tag| version::is_canonical(tag))
            .collect())
    }

    async fn info(&self, module: &str, version: &str) -> Result<RevInfo, ProtocolError> {
        let stripped = version::strip_incompatible(version);
        let (owner, repo) = path::split_path(module)?;

        let mut info = if version::is_pseudo(stripped) {
            let sha = version::sha_from_pseudo(stripped)?;
            self.host.commit_info(&owner, &repo, sha).await?
        } else {
            self.host.tag_info(&owner, &repo, stripped).await?
        };

        // The upstream ref is the unannotated form; the annotation is
        // reflected back to the client unchanged.
        if stripped != version {
            info.version = version.to_string();
        }
        Ok(info)
    }

    async fn latest(&self, module: &str) -> Result<RevInfo, ProtocolError> {
        let (owner, repo) = path::split_path(module)?;
        let (sha, time) = self.host.latest_commit(&owner, &repo).await?;

        let short = version::short_sha(&sha).to_string();
        Ok(RevInfo {
            version: version::pseudo(time, &short),
            name: sha,
            short,
            time,
        })
    }

    async fn go_mod(&self, module: &str, version: &str) -> Result<Vec<u8>, ProtocolError> {
        let (git_ref, _) = version::normalize(version)?;
        let (owner, repo) = path::split_path(module)?;

        match self.host.mod_file(&owner, &repo, &git_ref).await {
            Ok(bytes) => Ok(bytes),
            // Repositories without a manifest still resolve: answer
            // with the minimal manifest declaring the module path.
            Err(ProtocolError::NotFound) => Ok(format!("module {module}\n").into_bytes()),
            Err(err) => Err(err),
        }
    }

    async fn zip(
        &self,
        module: &str,
        version: &str,
        prefix_override: &str,
    ) -> Result<ZipReader, ProtocolError> {
        let (git_ref, _) = version::normalize(version)?;
        let (owner, repo) = path::split_path(module)?;
        let url = self.host.tar_url(&owner, &repo, &git_ref).await?;

        let prefix = if prefix_override.is_empty() {
            let host = module.split('/').next().unwrap_or_default();
            format!("{host}/{owner}/{repo}@{version}/")
        } else {
            format!("{prefix_override}@{version}/")
        };

        archive::rewrite_tar_to_zip(&self.client, &url, &prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosts::MockCodeHost;
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;

    #[tokio::test]
    async fn list_keeps_only_canonical_semantic_tags_in_host_order() {
        let mut host = MockCodeHost::new();
        host.expect_tags()
            .with(eq("pkg"), eq("errors"))
            .returning(|_, _| {
                Ok(vec![
                    "v1.0.0".to_string(),
                    "v1".to_string(),
                    "v1.0.0+meta".to_string(),
                    "release-2".to_string(),
                    "v0.8.0".to_string(),
                ])
            });

        let protocol = HostProtocol::new(host);
        let tags = protocol.list("github.com/pkg/errors").await.unwrap();

        assert_eq!(tags, vec!["v1.0.0", "v0.8.0"]);
    }

    #[tokio::test]
    async fn info_resolves_tags_through_tag_info() {
        let time = Utc.with_ymd_and_hms(2016, 9, 29, 1, 48, 1).unwrap();
        let mut host = MockCodeHost::new();
        host.expect_tag_info()
            .with(eq("pkg"), eq("errors"), eq("v0.8.0"))
            .returning(move |_, _, tag| {
                Ok(RevInfo {
                    version: tag.to_string(),
                    name: "645ef00459ed84a119197bfb8d8205042c6df63d".to_string(),
                    short: tag.to_string(),
                    time,
                })
            });

        let protocol = HostProtocol::new(host);
        let info = protocol
            .info("github.com/pkg/errors", "v0.8.0")
            .await
            .unwrap();

        assert_eq!(info.version, "v0.8.0");
        assert_eq!(info.short, "v0.8.0");
        assert_eq!(info.name, "645ef00459ed84a119197bfb8d8205042c6df63d");
    }

    #[tokio::test]
    async fn info_resolves_pseudo_versions_through_commit_info() {
        let time = Utc.with_ymd_and_hms(2018, 3, 11, 21, 45, 15).unwrap();
        let mut host = MockCodeHost::new();
        host.expect_commit_info()
            .with(eq("pkg"), eq("errors"), eq("816c9085562c"))
            .returning(move |_, _, _| {
                Ok(RevInfo {
                    version: "v0.0.0-20180311214515-816c9085562c".to_string(),
                    name: "816c9085562cd7ee03e7f8188a1cfd942858cded".to_string(),
                    short: "816c9085562c".to_string(),
                    time,
                })
            });

        let protocol = HostProtocol::new(host);
        let info = protocol
            .info("github.com/pkg/errors", "v0.0.0-20180311214515-816c9085562c")
            .await
            .unwrap();

        assert_eq!(info.short, "816c9085562c");
    }

    #[tokio::test]
    async fn info_strips_the_incompatible_annotation_before_the_upstream_call() {
        let time = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
        let mut host = MockCodeHost::new();
        host.expect_tag_info()
            .with(eq("pkg"), eq("errors"), eq("v2.0.0"))
            .returning(move |_, _, tag| {
                Ok(RevInfo {
                    version: tag.to_string(),
                    name: "0123456789abcdef0123456789abcdef01234567".to_string(),
                    short: tag.to_string(),
                    time,
                })
            });

        let protocol = HostProtocol::new(host);
        let info = protocol
            .info("github.com/pkg/errors", "v2.0.0+incompatible")
            .await
            .unwrap();

        assert_eq!(info.name, "0123456789abcdef0123456789abcdef01234567");
        assert_eq!(info.short, "v2.0.0");
        assert_eq!(info.version, "v2.0.0+incompatible");
    }

    #[tokio::test]
    async fn latest_assembles_a_pseudo_version_from_the_branch_tip() {
        let time = Utc.with_ymd_and_hms(2018, 3, 11, 21, 45, 15).unwrap();
        let mut host = MockCodeHost::new();
        host.expect_latest_commit()
            .with(eq("pkg"), eq("errors"))
            .returning(move |_, _| {
                Ok((
                    "816c9085562cd7ee03e7f8188a1cfd942858cded".to_string(),
                    time,
                ))
            });

        let protocol = HostProtocol::new(host);
        let info = protocol.latest("github.com/pkg/errors").await.unwrap();

        assert_eq!(info.name, "816c9085562cd7ee03e7f8188a1cfd942858cded");
        assert_eq!(info.short, "816c9085562c");
        assert_eq!(info.version, "v0.0.0-20180311214515-816c9085562c");
        assert_eq!(info.time, time);
    }

    #[tokio::test]
    async fn go_mod_returns_the_manifest_bytes() {
        let mut host = MockCodeHost::new();
        host.expect_mod_file()
            .with(eq("kr"), eq("pretty"), eq("v0.1.0"))
            .returning(|_, _, _| Ok(b"module \"github.com/kr/pretty\"\n".to_vec()));

        let protocol = HostProtocol::new(host);
        let bytes = protocol
            .go_mod("github.com/kr/pretty", "v0.1.0")
            .await
            .unwrap();

        assert_eq!(bytes, b"module \"github.com/kr/pretty\"\n");
    }

    #[tokio::test]
    async fn go_mod_synthesizes_a_manifest_when_the_repo_has_none() {
        let mut host = MockCodeHost::new();
        host.expect_mod_file()
            .returning(|_, _, _| Err(ProtocolError::NotFound));

        let protocol = HostProtocol::new(host);
        let bytes = protocol
            .go_mod("github.com/pkg/errors", "v0.8.0")
            .await
            .unwrap();

        assert_eq!(bytes, b"module github.com/pkg/errors\n");
    }

    #[tokio::test]
    async fn go_mod_resolves_pseudo_versions_to_their_commit() {
        let mut host = MockCodeHost::new();
        host.expect_mod_file()
            .with(eq("pkg"), eq("errors"), eq("816c9085562c"))
            .returning(|_, _, _| Ok(b"module github.com/pkg/errors\n".to_vec()));

        let protocol = HostProtocol::new(host);
        protocol
            .go_mod(
                "github.com/pkg/errors",
                "v0.0.0-20180311214515-816c9085562c",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn go_mod_propagates_non_absence_errors() {
        let mut host = MockCodeHost::new();
        host.expect_mod_file()
            .returning(|_, _, _| Err(ProtocolError::Upstream("boom".to_string())));

        let protocol = HostProtocol::new(host);
        let result = protocol.go_mod("github.com/pkg/errors", "v0.8.0").await;

        assert!(matches!(result, Err(ProtocolError::Upstream(_))));
    }

    #[tokio::test]
    async fn operations_reject_paths_for_other_hosts() {
        let protocol = HostProtocol::new(MockCodeHost::new());
        let result = protocol.list("gopkg.in/yaml.v2").await;

        assert!(matches!(result, Err(ProtocolError::BadPath(_))));
    }
}
