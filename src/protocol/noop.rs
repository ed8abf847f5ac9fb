//! Protocol for paths no layer claims

use crate::archive::ZipReader;
use crate::error::ProtocolError;
use crate::protocol::{DownloadProtocol, RevInfo};

/// Answers every operation with `NotFound`.
pub struct NoOpProtocol;

#[async_trait::async_trait]
impl DownloadProtocol for NoOpProtocol {
    async fn list(&self, _module: &str) -> Result<Vec<String>, ProtocolError> {
        Err(ProtocolError::NotFound)
    }

    async fn info(&self, _module: &str, _version: &str) -> Result<RevInfo, ProtocolError> {
        Err(ProtocolError::NotFound)
    }

    async fn latest(&self, _module: &str) -> Result<RevInfo, ProtocolError> {
        Err(ProtocolError::NotFound)
    }

    async fn go_mod(&self, _module: &str, _version: &str) -> Result<Vec<u8>, ProtocolError> {
        Err(ProtocolError::NotFound)
    }

    async fn zip(
        &self,
        _module: &str,
        _version: &str,
        _prefix_override: &str,
    ) -> Result<ZipReader, ProtocolError> {
        Err(ProtocolError::NotFound)
    }
}
