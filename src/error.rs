use thiserror::Error;

/// Error taxonomy shared by every layer of the protocol engine.
///
/// Host adapters translate upstream status codes into these kinds at
/// the adapter boundary; the protocol layers propagate them unchanged.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed module path: {0}")]
    BadPath(String),

    #[error("malformed version: {0}")]
    BadVersion(String),

    #[error("not found")]
    NotFound,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("archive stream aborted: {0}")]
    StreamAborted(String),
}

impl From<reqwest::Error> for ProtocolError {
    fn from(err: reqwest::Error) -> Self {
        ProtocolError::Upstream(err.to_string())
    }
}
