//! Session registry for the stream multiplexer.
//!
//! One entry per open websocket. The registry hands out process-unique
//! client ids and carries each session's subscribed routes plus its
//! outbound queue. Iteration (broadcast) is safe against concurrent
//! inserts and removals and sees a consistent snapshot of live entries.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::stream::message::{ServerPayload, StreamMessage};

/// What the writer task should put on the wire next.
#[derive(Debug)]
pub enum Outbound {
    /// An encoded JSON text frame.
    Frame(String),
    /// Initiate the close handshake and stop writing.
    Close,
}

/// Per-websocket state. Routes are mutated only from that session's receive
/// loop; the registry enforces nothing here beyond interior mutability.
pub struct StreamSession {
    pub client_id: u64,
    routes: HashSet<String>,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl StreamSession {
    pub fn routes(&self) -> &HashSet<String> {
        &self.routes
    }
}

/// Result of removing a route from a session's set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unsubscribed {
    /// Whether the route was actually in the set.
    pub removed: bool,
    /// Whether the set is now empty.
    pub now_empty: bool,
}

/// Tracks all live websocket sessions.
#[derive(Default)]
pub struct StreamRegistry {
    sessions: DashMap<u64, StreamSession>,
    next_client_id: AtomicU64,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_client_id: AtomicU64::new(1),
        }
    }

    /// Insert a fresh session and return its client id. Ids are assigned
    /// monotonically and never reused within the process lifetime.
    pub fn register(&self, tx: mpsc::UnboundedSender<Outbound>) -> u64 {
        let client_id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(
            client_id,
            StreamSession {
                client_id,
                routes: HashSet::new(),
                tx,
            },
        );
        client_id
    }

    /// Remove the session, returning its final route snapshot for cleanup.
    pub fn remove(&self, client_id: u64) -> Option<HashSet<String>> {
        self.sessions.remove(&client_id).map(|(_, s)| s.routes)
    }

    /// Add `route` to the session's set. Returns false when the session is
    /// gone or the route was already subscribed.
    pub fn subscribe(&self, client_id: u64, route: &str) -> bool {
        match self.sessions.get_mut(&client_id) {
            Some(mut session) => session.routes.insert(route.to_string()),
            None => false,
        }
    }

    /// Remove `route` from the session's set.
    pub fn unsubscribe(&self, client_id: u64, route: &str) -> Unsubscribed {
        match self.sessions.get_mut(&client_id) {
            Some(mut session) => {
                let removed = session.routes.remove(route);
                Unsubscribed {
                    removed,
                    now_empty: session.routes.is_empty(),
                }
            }
            None => Unsubscribed {
                removed: false,
                now_empty: true,
            },
        }
    }

    /// Copy of the session's current route set.
    pub fn routes_snapshot(&self, client_id: u64) -> Vec<String> {
        self.sessions
            .get(&client_id)
            .map(|s| s.routes.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, client_id: u64, route: &str) -> bool {
        self.sessions
            .get(&client_id)
            .map(|s| s.routes.contains(route))
            .unwrap_or(false)
    }

    /// Enqueue one frame on a single session.
    pub fn send_to(&self, client_id: u64, message: &StreamMessage<ServerPayload>) -> bool {
        let Some(session) = self.sessions.get(&client_id) else {
            return false;
        };
        match serde_json::to_string(message) {
            Ok(encoded) => session.tx.send(Outbound::Frame(encoded)).is_ok(),
            Err(e) => {
                tracing::error!(client_id, error = %e, "failed to encode stream frame");
                false
            }
        }
    }

    /// Enqueue a text frame on every session subscribed to `route` whose
    /// client id passes `filter`. Visits a snapshot of the registry;
    /// concurrent registrations or removals are safe but not observed
    /// atomically.
    pub fn broadcast(&self, route: &str, text: &str, filter: &dyn Fn(u64) -> bool) {
        let message = StreamMessage::text(route, text);
        let encoded = match serde_json::to_string(&message) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(route, error = %e, "failed to encode broadcast frame");
                return;
            }
        };
        for session in self.sessions.iter() {
            if session.routes.contains(route) && filter(session.client_id) {
                let _ = session.tx.send(Outbound::Frame(encoded.clone()));
            }
        }
    }

    /// Ask the session's writer to close the websocket.
    pub fn close_session(&self, client_id: u64) {
        if let Some(session) = self.sessions.get(&client_id) {
            let _ = session.tx.send(Outbound::Close);
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
