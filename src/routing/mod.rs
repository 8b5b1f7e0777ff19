//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! (environment, layout, config, bundle?)
//!     → assembler.rs (select one of four route maps)
//!     → prefix.rs (normalize and join the configured base path)
//!     → redirect.rs (cumulative regex rewrites, 301 on change)
//! ```
//!
//! # Design Decisions
//! - Route maps assembled once at startup, immutable at runtime
//! - Redirect rules fold left-to-right; the output of one feeds the next
//! - The catch-all registers last so explicit routes win

pub mod assembler;
pub mod prefix;
pub mod redirect;

pub use assembler::{build_site_router, STATUS_ROUTE, STREAMS_ROUTE};
pub use prefix::RoutePrefixer;
pub use redirect::RedirectEngine;
