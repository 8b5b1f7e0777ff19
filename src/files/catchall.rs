//! The catch-all GET chain and the prod-static page handler.
//!
//! Any GET not claimed by a more specific route lands here. The chain runs
//! a fixed predicate order and exactly one step produces the response:
//! script files, redirects, the dev extra handler, the accept guard, and
//! finally the index fallback.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::config::ServerEnvironment;
use crate::files::server::serve_file;
use crate::http::server::AppState;

/// Catch-all handler for the dev and fullstack assemblies.
pub async fn catchall_endpoint(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let Some(tail) = state.prefixer.tail_of(uri.path()).map(str::to_string) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // 1. The compiled script and its source map are served wherever the
    //    page references them from.
    if let Some(script_name) = state.script.file_name().and_then(|n| n.to_str()) {
        let last = tail.rsplit('/').next().unwrap_or(&tail);
        if last == script_name {
            return match serve_file(&state.script).await {
                Some(resp) => resp,
                None => StatusCode::NOT_FOUND.into_response(),
            };
        }
        if last == format!("{script_name}.map") {
            let map_path = format!("{}.map", state.script.display());
            return match serve_file(map_path.as_ref()).await {
                Some(resp) => resp,
                None => StatusCode::NOT_FOUND.into_response(),
            };
        }
    }

    // 2. Redirects run before file serving, so a rewrite may shadow an
    //    existing file.
    if let Some(resp) = redirect_response(&state, &tail) {
        return resp;
    }

    // 3. Dev serves freshly built content straight from the content root.
    if state.env == ServerEnvironment::Dev {
        if let Some(resp) = state.content.try_serve(&tail).await {
            return resp;
        }
    }

    // 4. A missing subresource must 404, not receive the index page, or
    //    browsers would cache HTML where they expected an image.
    if !accepts_html(&headers) {
        return StatusCode::NOT_FOUND.into_response();
    }

    // 5. The client-side application resolves the route from the index.
    match serve_index(&state).await {
        Some(resp) => resp,
        None => {
            debug!(index = %state.index_file.display(), "index fallback missing");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Page handler for the prod static assembly: redirects, then exported
/// files with `.html` resolution and the site's 404 page.
pub async fn static_site_endpoint(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(tail) = state.prefixer.tail_of(uri.path()).map(str::to_string) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(resp) = redirect_response(&state, &tail) {
        return resp;
    }

    state.site.serve_site_page(&tail).await
}

fn redirect_response(state: &AppState, tail: &str) -> Option<Response> {
    let canonical = format!("/{tail}");
    let rewritten = state.redirects.apply(&canonical)?;
    let location = state.prefixer.join(&rewritten);
    debug!(from = %canonical, to = %location, "redirecting");
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(header::LOCATION, location)
        .body(Body::empty())
        .ok()
}

async fn serve_index(state: &AppState) -> Option<Response> {
    let mut resp = serve_file(&state.index_file).await?;
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/html"),
    );
    Some(resp)
}

/// Whether the Accept header admits an HTML response.
fn accepts_html(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    accept
        .split(',')
        .filter_map(|item| item.split(';').next())
        .map(str::trim)
        .any(|media| media == "text/html" || media == "text/*" || media == "*/*")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_map(accept: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(a) = accept {
            headers.insert(header::ACCEPT, a.parse().unwrap());
        }
        headers
    }

    #[test]
    fn test_accepts_html() {
        assert!(accepts_html(&header_map(Some("text/html"))));
        assert!(accepts_html(&header_map(Some(
            "text/html,application/xhtml+xml,*/*;q=0.8"
        ))));
        assert!(accepts_html(&header_map(Some("*/*"))));
        assert!(!accepts_html(&header_map(Some("image/*"))));
        assert!(!accepts_html(&header_map(Some("application/json"))));
        assert!(!accepts_html(&header_map(None)));
    }
}
