//! Websocket frame shapes.
//!
//! Every frame is a JSON object `{ "route": ..., "payload": ... }`. Payload
//! tags rely on serde's external tagging: unit variants serialize as bare
//! strings (`"Connect"`), struct variants as single-key objects
//! (`{"Text":{"text":"hi"}}`).

use serde::{Deserialize, Serialize};

/// One frame on the multiplexed websocket, parameterized by direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMessage<P> {
    /// Logical stream this frame belongs to.
    pub route: String,
    pub payload: P,
}

/// Payloads a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientPayload {
    Connect,
    Disconnect,
    Text { text: String },
}

/// Payloads the server may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerPayload {
    Text {
        text: String,
    },
    ServerError {
        #[serde(skip_serializing_if = "Option::is_none")]
        callstack: Option<String>,
    },
}

impl StreamMessage<ServerPayload> {
    pub fn text(route: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            payload: ServerPayload::Text { text: text.into() },
        }
    }

    pub fn server_error(route: impl Into<String>, callstack: Option<String>) -> Self {
        Self {
            route: route.into(),
            payload: ServerPayload::ServerError { callstack },
        }
    }
}
