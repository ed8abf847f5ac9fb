use serde::Deserialize;

// =============================================================================
// Shared constants
// =============================================================================

/// Default port the download protocol server listens on
pub const DEFAULT_PORT: u16 = 8090;

/// Page size used when iterating upstream ref listings
pub const TAGS_PAGE_SIZE: u32 = 100;

/// Timeout for metadata fetches against host APIs (30 seconds)
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// User agent sent on every upstream request
pub const USER_AGENT: &str = "modrelay";

/// Buffer size of the in-memory pipe carrying rewritten zip bytes
pub const ZIP_PIPE_BUF: usize = 64 * 1024;

/// Server configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port to bind on
    pub port: Option<u16>,

    /// Bearer token for the GitHub API, to avoid rate limiting
    pub github_token: Option<String>,

    /// Base URL of an upstream proxy; when set, `NotFound` responses
    /// become 301 redirects to `<redirect_base><original path>`
    pub redirect_base: Option<String>,
}

impl ServerConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}
