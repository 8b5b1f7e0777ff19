//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Assemble routes → Bind listener → Serve
//!
//! Shutdown:
//!     Signal or trigger → Stop accepting → Drain handlers → Exit
//! ```

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownListener};
