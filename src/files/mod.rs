//! Static and page file serving.
//!
//! # Data Flow
//! ```text
//! GET {prefix}/{tail}
//!     → catchall.rs (script | redirect | dev extra | accept guard | index)
//!     → server.rs (path mapping, traversal guard, content types)
//! ```

pub mod catchall;
pub mod server;

pub use catchall::{catchall_endpoint, static_site_endpoint};
pub use server::FileServer;
