//! HTTP server setup.
//!
//! # Responsibilities
//! - Hold the shared application state injected into handlers
//! - Bind the assembled router to a listener
//! - Serve with graceful shutdown (signal or programmatic trigger)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::bundle::ApiBundle;
use crate::config::{ServerEnvironment, StreamingConfig};
use crate::files::FileServer;
use crate::lifecycle::shutdown::ShutdownListener;
use crate::routing::prefix::RoutePrefixer;
use crate::routing::redirect::RedirectEngine;
use crate::status::ServerGlobals;
use crate::stream::StreamRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub env: ServerEnvironment,
    pub prefixer: RoutePrefixer,
    pub redirects: Arc<RedirectEngine>,
    pub bundle: Option<Arc<dyn ApiBundle>>,
    pub registry: Arc<StreamRegistry>,
    pub globals: Arc<ServerGlobals>,
    pub streaming: StreamingConfig,
    /// Compiled client script; served by name from any tail.
    pub script: PathBuf,
    /// Dev content root served by the extra handler.
    pub content: FileServer,
    /// Exported site root (prod layouts).
    pub site: FileServer,
    /// Index page served as the catch-all fallback.
    pub index_file: PathBuf,
    pub server_port: u16,
}

/// HTTP server for an assembled site router.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Run the server until Ctrl+C, accepting connections on the given
    /// listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server until the given shutdown listener resolves. Used
    /// where the caller owns the lifecycle, e.g. embedding and tests.
    pub async fn run_until(
        self,
        listener: TcpListener,
        shutdown: ShutdownListener,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.triggered())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
