//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, shared state, graceful shutdown)
//!     → [assembled route map decides the handler]
//!     → api.rs (flatten request, invoke bundle, translate response)
//!     → request.rs / response.rs (neutral records at the bundle boundary)
//! ```

pub mod api;
pub mod request;
pub mod response;
pub mod server;

pub use request::{ConnectionDetails, NeutralRequest, RequestConnection};
pub use response::NeutralResponse;
pub use server::{AppState, HttpServer};
