//! Dev-mode build status feed.
//!
//! An external build watcher records version bumps and status text in
//! [`ServerGlobals`]; connected browsers observe them over a server-sent
//! event stream and reload or surface errors accordingly. Updates are
//! detected by polling and equality comparison, not notification.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use serde_json::json;

use crate::http::server::AppState;

/// How often the feed wakes to compare against the last transmitted state.
const POLL_PERIOD: Duration = Duration::from_millis(300);

/// One coherent view of the globals. Snapshots are immutable; writers swap
/// in a whole new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalsSnapshot {
    pub version: u64,
    pub status: Option<String>,
    pub is_status_error: bool,
}

/// Process-wide mutable dev state. Written by the build watcher, read by
/// the status feed on every tick without locking.
#[derive(Default)]
pub struct ServerGlobals {
    snapshot: ArcSwap<GlobalsSnapshot>,
}

impl ServerGlobals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<GlobalsSnapshot> {
        self.snapshot.load_full()
    }

    pub fn set_version(&self, version: u64) {
        let mut next = (*self.snapshot.load_full()).clone();
        next.version = version;
        self.snapshot.store(Arc::new(next));
    }

    pub fn set_status(&self, status: Option<String>, is_error: bool) {
        let mut next = (*self.snapshot.load_full()).clone();
        next.status = status;
        next.is_status_error = is_error;
        self.snapshot.store(Arc::new(next));
    }
}

/// `text/event-stream` endpoint publishing live build state (dev only).
pub async fn status_endpoint(State(state): State<AppState>) -> Response {
    let globals = state.globals.clone();

    struct Poll {
        first: bool,
        last_version: Option<u64>,
        last_status: Option<(Option<String>, bool)>,
    }

    // A fresh connection has transmitted nothing: any version differs, but
    // an absent status matches the initial globals and is not re-announced.
    let seed = Poll {
        first: true,
        last_version: None,
        last_status: Some((None, false)),
    };

    let stream = futures_util::stream::unfold(seed, move |mut poll| {
        let globals = globals.clone();
        async move {
            if poll.first {
                poll.first = false;
            } else {
                tokio::time::sleep(POLL_PERIOD).await;
            }

            let snap = globals.snapshot();
            let mut chunk = String::from(": keepalive\n\n");

            if poll.last_version != Some(snap.version) {
                chunk.push_str(&format!("event: version\ndata: {}\n\n", snap.version));
                poll.last_version = Some(snap.version);
            }

            let status_now = (snap.status.clone(), snap.is_status_error);
            if poll.last_status.as_ref() != Some(&status_now) {
                let data = json!({
                    "text": snap.status.clone().unwrap_or_default(),
                    "isError": snap.is_status_error,
                });
                chunk.push_str(&format!("event: status\ndata: {data}\n\n"));
                poll.last_status = Some(status_now);
            }

            Some((chunk, poll))
        }
    })
    .map(Ok::<_, Infallible>);

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
