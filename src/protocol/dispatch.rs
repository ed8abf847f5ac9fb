//! Prefix-keyed protocol routing

use std::sync::Arc;

use tracing::debug;

use crate::archive::ZipReader;
use crate::error::ProtocolError;
use crate::protocol::{DownloadProtocol, NoOpProtocol, RevInfo};

/// Routes each operation to the protocol instance whose registered
/// prefix is the longest match on the import path. Unmatched paths go
/// to the fallback, which answers `NotFound` unless replaced.
pub struct Dispatcher {
    /// Kept sorted by descending prefix length, so the first match
    /// wins the longest-prefix rule.
    routes: Vec<(String, Arc<dyn DownloadProtocol>)>,
    fallback: Arc<dyn DownloadProtocol>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            fallback: Arc::new(NoOpProtocol),
        }
    }

    /// Registers a protocol for a host prefix.
    pub fn route(mut self, prefix: &str, protocol: Arc<dyn DownloadProtocol>) -> Self {
        self.routes.push((prefix.to_string(), protocol));
        self.routes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    /// Replaces the protocol unmatched paths fall through to.
    pub fn fallback(mut self, protocol: Arc<dyn DownloadProtocol>) -> Self {
        self.fallback = protocol;
        self
    }

    fn select(&self, module: &str) -> &dyn DownloadProtocol {
        for (prefix, protocol) in &self.routes {
            if module.starts_with(prefix.as_str()) {
                return protocol.as_ref();
            }
        }
        debug!("no protocol for {module}, using fallback");
        self.fallback.as_ref()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DownloadProtocol for Dispatcher {
    async fn list(&self, module: &str) -> Result<Vec<String>, ProtocolError> {
        self.select(module).list(module).await
    }

    async fn info(&self, module: &str, version: &str) -> Result<RevInfo, ProtocolError> {
        self.select(module).info(module, version).await
    }

    async fn latest(&self, module: &str) -> Result<RevInfo, ProtocolError> {
        self.select(module).latest(module).await
    }

    async fn go_mod(&self, module: &str, version: &str) -> Result<Vec<u8>, ProtocolError> {
        self.select(module).go_mod(module, version).await
    }

    async fn zip(
        &self,
        module: &str,
        version: &str,
        prefix_override: &str,
    ) -> Result<ZipReader, ProtocolError> {
        self.select(module)
            .zip(module, version, prefix_override)
            .await
    }
}
