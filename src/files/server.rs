//! Filesystem-backed file serving with traversal protection.

use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Serves files from a single root directory.
#[derive(Debug, Clone)]
pub struct FileServer {
    root: PathBuf,
}

impl FileServer {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL tail onto a path under the root. Rejects any tail that
    /// would escape it.
    pub fn map_path(&self, tail: &str) -> Option<PathBuf> {
        let clean = tail.trim_start_matches('/');
        let mut path = self.root.clone();
        for comp in Path::new(clean).components() {
            match comp {
                Component::Normal(seg) => path.push(seg),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }

    /// Serve `tail` if it resolves to a regular file under the root.
    pub async fn try_serve(&self, tail: &str) -> Option<Response> {
        let path = self.map_path(tail)?;
        if !path.is_file() {
            return None;
        }
        serve_file(&path).await
    }

    /// Resolve `tail` the way an exported static site expects: the literal
    /// file, then `<tail>.html`, then a directory index, then the site's
    /// `404.html`.
    pub async fn serve_site_page(&self, tail: &str) -> Response {
        if let Some(path) = self.map_path(tail) {
            let mut candidates = Vec::new();
            if tail.is_empty() || tail.ends_with('/') {
                candidates.push(path.join("index.html"));
            } else {
                candidates.push(path.clone());
                candidates.push(PathBuf::from(format!("{}.html", path.display())));
                candidates.push(path.join("index.html"));
            }
            for candidate in candidates {
                if candidate.is_file() {
                    if let Some(resp) = serve_file(&candidate).await {
                        return resp;
                    }
                }
            }
        }

        let fallback = self.root.join("404.html");
        if fallback.is_file() {
            if let Ok(bytes) = tokio::fs::read(&fallback).await {
                return Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .header(header::CONTENT_TYPE, "text/html")
                    .body(Body::from(bytes))
                    .unwrap_or_else(|_| StatusCode::NOT_FOUND.into_response());
            }
        }
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Read a file and respond with it, deriving the content type from the
/// extension. `None` when the file cannot be read.
pub async fn serve_file(path: &Path) -> Option<Response> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "file read failed");
            return None;
        }
    };
    let mut response = Response::new(Body::from(bytes));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type(path)),
    );
    Some(response)
}

/// Content type by extension; octet-stream for anything unrecognized.
pub fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
        .as_str()
    {
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "mjs" => "application/javascript",
        "map" => "application/json",
        "json" => "application/json",
        "txt" => "text/plain",
        "wasm" => "application/wasm",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}
