//! Neutral response records and their translation to the wire.

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;

/// The response record a bundle handler returns.
#[derive(Debug, Clone, Default)]
pub struct NeutralResponse {
    /// HTTP status, 100..=599.
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

impl NeutralResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        self.body = body.into();
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Translate a bundle response to the wire. Headers are appended rather
/// than replaced. On HEAD the body is dropped and the content type
/// suppressed.
pub fn write_neutral_response(resp: NeutralResponse, is_head: bool) -> Response {
    let status =
        StatusCode::from_u16(resp.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let body = if is_head {
        Body::empty()
    } else {
        Body::from(resp.body)
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;

    for (name, value) in &resp.headers {
        if let (Ok(name), Ok(value)) = (
            name.parse::<HeaderName>(),
            value.parse::<HeaderValue>(),
        ) {
            response.headers_mut().append(name, value);
        } else {
            tracing::warn!(header = %name, "dropping malformed response header");
        }
    }

    if !is_head {
        if let Some(ct) = resp.content_type.as_deref() {
            if let Ok(value) = ct.parse::<HeaderValue>() {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
        }
    }

    response
}
