//! Websocket session loop and event dispatch.
//!
//! Each accepted websocket gets a receive loop (this module) and a writer
//! task. Inbound text frames drive the per-route state machine and are
//! dispatched to the bundle strictly in arrival order; outbound frames are
//! serialized through the session's queue.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

use crate::bundle::{ApiBundle, StreamEvent};
use crate::config::{ServerEnvironment, StreamingConfig};
use crate::http::server::AppState;
use crate::stream::message::{ClientPayload, StreamMessage};
use crate::stream::registry::{Outbound, StreamRegistry};

/// Per-(session, route) capability handed to the bundle with every event.
#[derive(Clone)]
pub struct StreamHandle {
    registry: Arc<StreamRegistry>,
    bundle: Arc<dyn ApiBundle>,
    env: ServerEnvironment,
    client_id: u64,
    route: String,
}

impl StreamHandle {
    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Transmit one text frame on this session only.
    pub fn send(&self, text: &str) -> bool {
        self.registry
            .send_to(self.client_id, &StreamMessage::text(&self.route, text))
    }

    /// Transmit one text frame to every session subscribed to this route
    /// whose client id passes `filter`.
    pub fn broadcast(&self, text: &str, filter: &dyn Fn(u64) -> bool) {
        self.registry.broadcast(&self.route, text, filter);
    }

    /// Drop this route from the session, notify the bundle, and close the
    /// websocket when no routes remain.
    pub fn disconnect(&self) -> BoxFuture<'static, ()> {
        disconnect_route(
            self.registry.clone(),
            self.bundle.clone(),
            self.env,
            self.client_id,
            self.route.clone(),
        )
    }
}

/// Websocket endpoint handler for the multiplexed stream socket.
pub async fn stream_endpoint(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let Some(bundle) = state.bundle.clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let registry = state.registry.clone();
    let env = state.env;
    let streaming = state.streaming;
    ws.on_upgrade(move |socket| run_session(socket, registry, bundle, env, streaming))
}

/// Drive one websocket session to completion, then run cleanup.
pub async fn run_session(
    socket: WebSocket,
    registry: Arc<StreamRegistry>,
    bundle: Arc<dyn ApiBundle>,
    env: ServerEnvironment,
    streaming: StreamingConfig,
) {
    let (sink, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let client_id = registry.register(tx);
    debug!(client_id, "stream session opened");

    let reader = async {
        loop {
            match receiver.next().await {
                Some(Ok(Message::Text(text))) => {
                    handle_frame(&registry, &bundle, env, client_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    trace!(client_id, "stream session closed");
                    break;
                }
                // Binary frames are not part of the protocol; control
                // frames are answered by the websocket layer.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(client_id, error = %e, "stream session I/O error");
                    break;
                }
            }
        }
    };

    // Either side ending tears the whole session down: a writer timeout
    // must not leave a half-dead connection behind.
    tokio::select! {
        _ = reader => {}
        _ = write_loop(sink, rx, streaming) => {}
    }

    // Synthesize a disconnect for every route still subscribed, then drop
    // the session. Routes are unsubscribed one at a time so a failing
    // disconnect handler cannot trigger a second notification.
    for route in registry.routes_snapshot(client_id) {
        let out = registry.unsubscribe(client_id, &route);
        if out.removed {
            deliver(
                registry.clone(),
                bundle.clone(),
                env,
                StreamEvent::ClientDisconnected { route, client_id },
            )
            .await;
        }
    }
    registry.remove(client_id);
    debug!(client_id, "stream session removed");
}

/// Decode one inbound text frame and run the per-route state machine.
async fn handle_frame(
    registry: &Arc<StreamRegistry>,
    bundle: &Arc<dyn ApiBundle>,
    env: ServerEnvironment,
    client_id: u64,
    text: &str,
) {
    let msg: StreamMessage<ClientPayload> = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(client_id, error = %e, "ignoring malformed stream frame");
            return;
        }
    };
    let route = msg.route;

    match msg.payload {
        ClientPayload::Connect => {
            if registry.subscribe(client_id, &route) {
                deliver(
                    registry.clone(),
                    bundle.clone(),
                    env,
                    StreamEvent::ClientConnected { route, client_id },
                )
                .await;
            } else {
                warn!(client_id, route = %route, "Connect for an already subscribed route ignored");
            }
        }
        ClientPayload::Text { text } => {
            if registry.is_subscribed(client_id, &route) {
                deliver(
                    registry.clone(),
                    bundle.clone(),
                    env,
                    StreamEvent::Text {
                        route,
                        client_id,
                        text,
                    },
                )
                .await;
            } else {
                warn!(client_id, route = %route, "Text for an unsubscribed route ignored");
            }
        }
        ClientPayload::Disconnect => {
            if registry.is_subscribed(client_id, &route) {
                disconnect_route(registry.clone(), bundle.clone(), env, client_id, route).await;
            } else {
                warn!(client_id, route = %route, "Disconnect for an unsubscribed route ignored");
            }
        }
    }
}

/// Dispatch one event to the bundle; on failure, report and disconnect the
/// (session, route) per the stream failure policy.
fn deliver(
    registry: Arc<StreamRegistry>,
    bundle: Arc<dyn ApiBundle>,
    env: ServerEnvironment,
    event: StreamEvent,
) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let route = event.route().to_string();
        let client_id = event.client_id();
        let handle = StreamHandle {
            registry: registry.clone(),
            bundle: bundle.clone(),
            env,
            client_id,
            route: route.clone(),
        };

        if let Err(failure) = bundle.handle_stream_event(event.clone(), handle.clone()).await {
            error!(
                route = %route,
                client_id,
                payload = ?event,
                trace = %failure.render_full(),
                "stream handler failed"
            );
            let callstack = matches!(env, ServerEnvironment::Dev)
                .then(|| failure.render_truncated(&bundle.stream_frame_filter()));
            registry.send_to(client_id, &StreamMessage::server_error(&route, callstack));
            handle.disconnect().await;
        }
    })
}

/// Remove one route from the session's set, notify the bundle once, and
/// close the socket when the set empties.
fn disconnect_route(
    registry: Arc<StreamRegistry>,
    bundle: Arc<dyn ApiBundle>,
    env: ServerEnvironment,
    client_id: u64,
    route: String,
) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let out = registry.unsubscribe(client_id, &route);
        if out.removed {
            deliver(
                registry.clone(),
                bundle.clone(),
                env,
                StreamEvent::ClientDisconnected {
                    route: route.clone(),
                    client_id,
                },
            )
            .await;
            if out.now_empty {
                registry.close_session(client_id);
            }
        }
    })
}

/// Sole writer for one session. Forwards queued frames, emits keepalive
/// pings when configured, and enforces the write timeout.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    streaming: StreamingConfig,
) {
    enum Next {
        Out(Outbound),
        Ping,
    }

    let mut ping = streaming.pings_enabled().then(|| {
        tokio::time::interval_at(
            tokio::time::Instant::now() + streaming.ping_period(),
            streaming.ping_period(),
        )
    });

    loop {
        let next = if let Some(interval) = ping.as_mut() {
            tokio::select! {
                out = rx.recv() => match out {
                    Some(out) => Next::Out(out),
                    None => break,
                },
                _ = interval.tick() => Next::Ping,
            }
        } else {
            match rx.recv().await {
                Some(out) => Next::Out(out),
                None => break,
            }
        };

        let (frame, is_close) = match next {
            Next::Out(Outbound::Frame(text)) => (Message::Text(text.into()), false),
            Next::Out(Outbound::Close) => (Message::Close(None), true),
            Next::Ping => (Message::Ping(Vec::new().into()), false),
        };

        match tokio::time::timeout(streaming.timeout(), sink.send(frame)).await {
            Ok(Ok(())) => {
                if is_close {
                    break;
                }
            }
            Ok(Err(e)) => {
                trace!(error = %e, "stream write failed");
                break;
            }
            Err(_) => {
                warn!("stream write timed out, closing session");
                break;
            }
        }
    }
}
