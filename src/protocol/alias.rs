//! Major-in-path alias protocol
//!
//! Paths like `gopkg.in/yaml.v2` are aliases for a GitHub repository
//! with the major version carried in the path. Every operation
//! rewrites the alias to the backing path and delegates; `list`
//! additionally narrows the tags to the requested major.

use std::sync::Arc;

use crate::archive::ZipReader;
use crate::error::ProtocolError;
use crate::module::path::{self, GITHUB_HOST};
use crate::module::version;
use crate::protocol::{DownloadProtocol, RevInfo};

/// Download protocol for major-in-path aliases
pub struct MajorInPathProtocol {
    inner: Arc<dyn DownloadProtocol>,
}

impl MajorInPathProtocol {
    /// Wraps the protocol serving the backing host.
    pub fn new(inner: Arc<dyn DownloadProtocol>) -> Self {
        Self { inner }
    }

    fn backing_path(module: &str) -> Result<(String, String), ProtocolError> {
        let (owner, repo, major) = path::parse_major_in_path(module)?;
        Ok((format!("{GITHUB_HOST}/{owner}/{repo}"), major))
    }
}

#[async_trait::async_trait]
impl DownloadProtocol for MajorInPathProtocol {
    async fn list(&self, module: &str) -> Result<Vec<String>, ProtocolError> {
        let (backing, major) = Self::backing_path(module)?;
        let tags = self.inner.list(&backing).await?;

        Ok(tags
            .into_iter()
            .filter(|tag| version::major(tag) == Some(major.as_str()))
            .collect())
    }

    async fn info(&self, module: &str, version: &str) -> Result<RevInfo, ProtocolError> {
        let (backing, _) = Self::backing_path(module)?;
        self.inner.info(&backing, version).await
    }

    async fn latest(&self, module: &str) -> Result<RevInfo, ProtocolError> {
        let (backing, _) = Self::backing_path(module)?;
        self.inner.latest(&backing).await
    }

    async fn go_mod(&self, module: &str, version: &str) -> Result<Vec<u8>, ProtocolError> {
        let (backing, _) = Self::backing_path(module)?;
        let bytes = self.inner.go_mod(&backing, version).await?;

        // A synthesized manifest names the backing path; clients must
        // see the import path they asked for.
        if bytes == format!("module {backing}\n").into_bytes() {
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
        let (backing, _) = Self::backing_path(module)?;
        self.inner.zip(&backing, version, module).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MockDownloadProtocol;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn list_filters_tags_to_the_requested_major() {
        let mut inner = MockDownloadProtocol::new();
        inner
            .expect_list()
            .with(eq("github.com/go-yaml/yaml"))
            .returning(|_| {
                Ok(vec![
                    "v1.0.0".to_string(),
                    "v2.0.0".to_string(),
                    "v2.3.1".to_string(),
                    "v3.0.0".to_string(),
                ])
            });

        let protocol = MajorInPathProtocol::new(Arc::new(inner));
        let tags = protocol.list("gopkg.in/yaml.v2").await.unwrap();

        assert_eq!(tags, vec!["v2.0.0", "v2.3.1"]);
    }

    #[tokio::test]
    async fn info_delegates_with_the_backing_path() {
        let mut inner = MockDownloadProtocol::new();
        inner
            .expect_info()
            .with(eq("github.com/owner/pkg"), eq("v3.0.0"))
            .returning(|_, version| {
                Ok(RevInfo {
                    version: version.to_string(),
                    name: "0123456789abcdef0123456789abcdef01234567".to_string(),
                    short: version.to_string(),
                    time: chrono::Utc::now(),
                })
            });

        let protocol = MajorInPathProtocol::new(Arc::new(inner));
        let info = protocol.info("gopkg.in/owner/pkg.v3", "v3.0.0").await.unwrap();

        assert_eq!(info.version, "v3.0.0");
    }

    #[tokio::test]
    async fn go_mod_rewrites_the_synthesized_manifest_to_the_alias() {
        let mut inner = MockDownloadProtocol::new();
        inner
            .expect_go_mod()
            .returning(|_, _| Ok(b"module github.com/go-yaml/yaml\n".to_vec()));

        let protocol = MajorInPathProtocol::new(Arc::new(inner));
        let bytes = protocol.go_mod("gopkg.in/yaml.v2", "v2.0.0").await.unwrap();

        assert_eq!(bytes, b"module gopkg.in/yaml.v2\n");
    }

    #[tokio::test]
    async fn go_mod_passes_real_manifests_through_unchanged() {
        let mut inner = MockDownloadProtocol::new();
        inner
            .expect_go_mod()
            .returning(|_, _| Ok(b"module gopkg.in/yaml.v2\n\nrequire x v1.0.0\n".to_vec()));

        let protocol = MajorInPathProtocol::new(Arc::new(inner));
        let bytes = protocol.go_mod("gopkg.in/yaml.v2", "v2.0.0").await.unwrap();

        assert_eq!(bytes, b"module gopkg.in/yaml.v2\n\nrequire x v1.0.0\n");
    }

    #[tokio::test]
    async fn zip_overrides_the_output_prefix_with_the_alias() {
        let mut inner = MockDownloadProtocol::new();
        inner
            .expect_zip()
            .with(
                eq("github.com/go-yaml/yaml"),
                eq("v2.0.0"),
                eq("gopkg.in/yaml.v2"),
            )
            .returning(|_, _, _| Ok(Box::new(std::io::Cursor::new(Vec::new())) as ZipReader));

        let protocol = MajorInPathProtocol::new(Arc::new(inner));
        protocol.zip("gopkg.in/yaml.v2", "v2.0.0", "").await.unwrap();
    }

    #[tokio::test]
    async fn malformed_aliases_fail_with_bad_path() {
        let protocol = MajorInPathProtocol::new(Arc::new(MockDownloadProtocol::new()));
        let result = protocol.list("gopkg.in/noVersion").await;

        assert!(matches!(result, Err(ProtocolError::BadPath(_))));
    }
}
