//! HTTP frontend
//!
//! Maps the `/<module>/@v/...` endpoint family onto the protocol
//! stack. The module prefix spans an arbitrary number of path
//! segments, so requests are parsed by a fallback handler instead of
//! a route table.

pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::config::ServerConfig;
use crate::protocol::{self, DownloadProtocol};

/// Shared state of the request handlers
#[derive(Clone)]
pub struct AppState {
    pub protocol: Arc<dyn DownloadProtocol>,
    pub redirect_base: Option<String>,
}

/// Builds the application router over a protocol stack.
pub fn router(protocol: Arc<dyn DownloadProtocol>, redirect_base: Option<String>) -> Router {
    Router::new().fallback(routes::handle).with_state(AppState {
        protocol,
        redirect_base,
    })
}

/// Binds and serves the production stack until the process exits.
pub async fn run(config: ServerConfig) -> std::io::Result<()> {
    let stack = Arc::new(protocol::standard_stack(config.github_token.clone()));
    let app = router(stack, config.redirect_base.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port()));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app).await
}
