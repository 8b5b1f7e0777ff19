//! API bundle capability interface.
//!
//! The bundle is externally-supplied code providing the site's API and
//! stream handlers. Loading and instantiation happen outside this crate;
//! the server sees only the [`ApiBundle`] trait and invokes it opaquely.

pub mod failure;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::http::request::NeutralRequest;
use crate::http::response::NeutralResponse;
use crate::stream::StreamHandle;

pub use failure::{keep_all_frames, DispatchFailure, FailureCause, FrameFilter, StackFrame};

/// One event on a logical stream, delivered to the bundle in per-session
/// arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    ClientConnected {
        route: String,
        client_id: u64,
    },
    Text {
        route: String,
        client_id: u64,
        text: String,
    },
    ClientDisconnected {
        route: String,
        client_id: u64,
    },
}

impl StreamEvent {
    pub fn route(&self) -> &str {
        match self {
            StreamEvent::ClientConnected { route, .. }
            | StreamEvent::Text { route, .. }
            | StreamEvent::ClientDisconnected { route, .. } => route,
        }
    }

    pub fn client_id(&self) -> u64 {
        match self {
            StreamEvent::ClientConnected { client_id, .. }
            | StreamEvent::Text { client_id, .. }
            | StreamEvent::ClientDisconnected { client_id, .. } => *client_id,
        }
    }
}

/// Capability interface implemented by a loaded API bundle.
///
/// `handle_api` and `handle_stream_event` must be safe to invoke
/// concurrently; the server shares one bundle across all requests.
#[async_trait]
pub trait ApiBundle: Send + Sync {
    /// Dispatch an HTTP API request. `path` is the captured tail with a
    /// leading `/`. Returning `None` means the bundle knows no such path.
    async fn handle_api(
        &self,
        path: &str,
        request: NeutralRequest,
    ) -> Result<Option<NeutralResponse>, DispatchFailure>;

    /// Dispatch a stream lifecycle or text event. `streams` sends and
    /// broadcasts on the event's (session, route).
    async fn handle_stream_event(
        &self,
        event: StreamEvent,
        streams: StreamHandle,
    ) -> Result<(), DispatchFailure>;

    /// Number of stream routes the bundle declares. When zero, the prod
    /// assembly skips installing the websocket endpoint.
    fn num_api_streams(&self) -> usize {
        0
    }

    /// Sentinel predicate for truncating API failure traces at framework
    /// frames. Supplied by the bundle loader.
    fn api_frame_filter(&self) -> FrameFilter {
        keep_all_frames()
    }

    /// Sentinel predicate for truncating stream failure traces.
    fn stream_frame_filter(&self) -> FrameFilter {
        keep_all_frames()
    }
}

/// Resolve a configured bundle path against the filesystem.
///
/// A configured path whose file is absent is a warning, not a fatal error:
/// the server continues without an API surface.
pub fn check_bundle_path(path: Option<&Path>) -> Option<PathBuf> {
    let path = path?;
    if path.is_file() {
        Some(path.to_path_buf())
    } else {
        tracing::warn!(
            path = %path.display(),
            "API bundle configured but file not found, continuing without APIs"
        );
        None
    }
}
