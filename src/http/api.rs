//! API dispatch endpoint.
//!
//! Flattens the platform request into a neutral record, invokes the bundle,
//! and translates the result back to the wire.

use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::config::ServerEnvironment;
use crate::http::request::build_neutral_request;
use crate::http::response::write_neutral_response;
use crate::http::server::AppState;

/// Handler registered for the seven API methods (GET, POST, PUT, PATCH,
/// DELETE, HEAD, OPTIONS) under `{prefix}/api/{*params}`.
pub async fn api_endpoint(
    State(state): State<AppState>,
    Path(tail): Path<String>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    req: Request<Body>,
) -> Response {
    let Some(bundle) = state.bundle.clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let (parts, body) = req.into_parts();
    let method = parts.method.clone();
    let is_head = method == Method::HEAD;

    // Only mutating methods carry a body worth reading.
    let wants_body =
        method == Method::PATCH || method == Method::POST || method == Method::PUT;
    let body = if wants_body {
        match to_bytes(body, usize::MAX).await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                error!(error = %e, "failed to read API request body");
                return StatusCode::BAD_REQUEST.into_response();
            }
        }
    } else {
        None
    };

    let local = SocketAddr::from(([127, 0, 0, 1], state.server_port));

    let request = build_neutral_request(
        method,
        &parts.uri,
        parts.version,
        &parts.headers,
        body,
        remote,
        local,
    );

    let api_path = format!("/{tail}");
    match bundle.handle_api(&api_path, request).await {
        Ok(Some(resp)) => write_neutral_response(resp, is_head),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(failure) => {
            error!(
                path = %api_path,
                trace = %failure.render_full(),
                "API handler failed"
            );
            let filter = bundle.api_frame_filter();
            if state.env == ServerEnvironment::Dev && failure.any_frame_matches(&filter) {
                // Hide framework internals: the visible trace starts at
                // user code.
                let body = failure.render_truncated(&filter);
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from(body))
                    .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
            } else {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
