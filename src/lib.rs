//! Request-routing and streaming core for hybrid static/dynamic sites.
//!
//! Serves precompiled client assets, API endpoints dispatched to an
//! externally loaded code bundle, and bidirectional message streams
//! multiplexed over a single websocket. Runs in two environments (dev,
//! prod) and two layouts (fullstack, static); the routing assembler wires
//! one of the four resulting route maps.

// Core subsystems
pub mod bundle;
pub mod config;
pub mod files;
pub mod http;
pub mod routing;
pub mod stream;

// Dev tooling
pub mod status;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;

pub use bundle::ApiBundle;
pub use config::{ServerEnvironment, SiteConfig, SiteLayout};
pub use error::ServerError;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, ShutdownListener};
pub use routing::build_site_router;
pub use status::ServerGlobals;
