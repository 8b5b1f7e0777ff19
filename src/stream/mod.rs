//! Stream multiplexing subsystem.
//!
//! # Data Flow
//! ```text
//! websocket accept
//!     → registry.rs (fresh client id, session entry)
//!     → multiplexer.rs receive loop (decode frames, run the per-route
//!       state machine, dispatch events to the bundle in arrival order)
//!     → per-session writer task (serialized sends, keepalive pings)
//!
//! On loop exit (clean close, I/O error, cancellation):
//!     synthesize ClientDisconnected per remaining route → remove session
//! ```
//!
//! # Design Decisions
//! - One writer task per session; send and broadcast enqueue only, so
//!   outbound frames never interleave mid-write
//! - Broadcast iterates a registry snapshot; membership changes during the
//!   walk are safe but not observed atomically
//! - Client ids come from a process-wide counter and are never reused

pub mod message;
pub mod multiplexer;
pub mod registry;

pub use message::{ClientPayload, ServerPayload, StreamMessage};
pub use multiplexer::{stream_endpoint, StreamHandle};
pub use registry::{Outbound, StreamRegistry};
