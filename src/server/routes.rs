//! Request parsing and handlers

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::error::ProtocolError;
use crate::module::path::{decode_path, decode_version};
use crate::server::AppState;

/// One decoded request against the endpoint family
#[derive(Debug, PartialEq, Eq)]
enum ProxyRequest {
    List { module: String },
    Info { module: String, version: String },
    GoMod { module: String, version: String },
    Zip { module: String, version: String },
    Latest { module: String },
}

/// Parses a request path into a protocol operation, decoding the
/// module and version segments.
fn parse(path: &str) -> Result<ProxyRequest, ProtocolError> {
    let trimmed = path.trim_start_matches('/');

    if let Some(module) = trimmed.strip_suffix("/@latest") {
        return Ok(ProxyRequest::Latest {
            module: decode_path(module)?,
        });
    }

    let (module, op) = trimmed
        .split_once("/@v/")
        .ok_or_else(|| ProtocolError::BadPath(format!("unrecognized request path: {path}")))?;
    let module = decode_path(module)?;

    if op == "list" {
        return Ok(ProxyRequest::List { module });
    }
    if let Some(version) = op.strip_suffix(".info") {
        return Ok(ProxyRequest::Info {
            module,
            version: decode_version(version)?,
        });
    }
    if let Some(version) = op.strip_suffix(".mod") {
        return Ok(ProxyRequest::GoMod {
            module,
            version: decode_version(version)?,
        });
    }
    if let Some(version) = op.strip_suffix(".zip") {
        return Ok(ProxyRequest::Zip {
            module,
            version: decode_version(version)?,
        });
    }

    Err(ProtocolError::BadPath(format!(
        "unrecognized operation: {op}"
    )))
}

pub(crate) async fn handle(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    info!("{} {}", request.method(), path);

    let parsed = match parse(&path) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!("rejecting request: {err}");
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    match serve(&state, parsed).await {
        Ok(response) => response,
        Err(err) => error_response(&state, &path, err),
    }
}

async fn serve(state: &AppState, request: ProxyRequest) -> Result<Response, ProtocolError> {
    match request {
        ProxyRequest::List { module } => {
            let versions = state.protocol.list(&module).await?;
            Ok(versions.join("\n").into_response())
        }
        ProxyRequest::Info { module, version } => {
            let info = state.protocol.info(&module, &version).await?;
            Ok(Json(info).into_response())
        }
        ProxyRequest::Latest { module } => {
            let info = state.protocol.latest(&module).await?;
            Ok(Json(info).into_response())
        }
        ProxyRequest::GoMod { module, version } => {
            let bytes = state.protocol.go_mod(&module, &version).await?;
            Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], bytes).into_response())
        }
        ProxyRequest::Zip { module, version } => {
            let reader = state.protocol.zip(&module, &version, "").await?;
            let body = Body::from_stream(ReaderStream::new(reader));
            Ok(([(header::CONTENT_TYPE, "application/zip")], body).into_response())
        }
    }
}

fn error_response(state: &AppState, path: &str, err: ProtocolError) -> Response {
    match err {
        ProtocolError::NotFound => {
            if let Some(base) = &state.redirect_base {
                let target = format!("{}{path}", base.trim_end_matches('/'));
                return (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, target)])
                    .into_response();
            }
            (StatusCode::NOT_FOUND, err.to_string()).into_response()
        }
        err => {
            warn!("{path} failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}
