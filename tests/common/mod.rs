//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use gossamer::bundle::{
    ApiBundle, DispatchFailure, FailureCause, FrameFilter, StackFrame, StreamEvent,
};
use gossamer::http::{NeutralRequest, NeutralResponse};
use gossamer::stream::StreamHandle;
use gossamer::{
    build_site_router, HttpServer, ServerEnvironment, ServerGlobals, Shutdown, SiteConfig,
    SiteLayout,
};
use tokio::net::TcpListener;

/// An in-process server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start(
        env: ServerEnvironment,
        layout: SiteLayout,
        config: &SiteConfig,
        bundle: Option<Arc<dyn ApiBundle>>,
        globals: Arc<ServerGlobals>,
    ) -> Self {
        let router = build_site_router(env, layout, config, bundle, globals)
            .expect("router assembly failed");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let listener_shutdown = shutdown.register("http-server");
        let handle = tokio::spawn(async move {
            let _ = HttpServer::new(router)
                .run_until(listener, listener_shutdown)
                .await;
        });

        Self {
            addr,
            shutdown,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub async fn stop(mut self) {
        self.shutdown.trigger();
        // Graceful shutdown waits for in-flight connections; tests may
        // still hold streams open, so fall back to aborting.
        if tokio::time::timeout(Duration::from_secs(2), &mut self.handle)
            .await
            .is_err()
        {
            self.handle.abort();
        }
    }
}

/// HTTP client that does not follow redirects, so 301s can be asserted.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Poll until `cond` holds or a deadline passes.
#[allow(dead_code)]
pub async fn wait_for(cond: impl Fn() -> bool, what: &str) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// A dev site on disk: a content root holding the built index page and the
/// compiled script. Returns the tempdir guard and a config pointing at it.
#[allow(dead_code)]
pub fn dev_site() -> (tempfile::TempDir, SiteConfig) {
    let dir = tempfile::tempdir().unwrap();
    let build = dir.path().join("build");
    std::fs::create_dir_all(&build).unwrap();
    std::fs::write(build.join("index.html"), "<html><body>index</body></html>").unwrap();
    std::fs::write(build.join("site.js"), "console.log('site');\n").unwrap();
    std::fs::write(build.join("site.js.map"), "{\"version\":3}").unwrap();

    let mut config = SiteConfig::default();
    config.port = 8080;
    config.paths.dev.content_root = build.clone();
    config.paths.dev.script = build.join("site.js");
    (dir, config)
}

/// An exported prod site on disk with `system/`, `pages/`, and
/// `resources/`.
#[allow(dead_code)]
pub fn prod_site() -> (tempfile::TempDir, SiteConfig) {
    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("site");
    std::fs::create_dir_all(site.join("system")).unwrap();
    std::fs::create_dir_all(site.join("pages/blog")).unwrap();
    std::fs::create_dir_all(site.join("resources/css")).unwrap();
    std::fs::write(site.join("pages/index.html"), "<html><body>home</body></html>").unwrap();
    std::fs::write(site.join("pages/about.html"), "<html><body>about</body></html>").unwrap();
    std::fs::write(
        site.join("pages/blog/index.html"),
        "<html><body>blog</body></html>",
    )
    .unwrap();
    std::fs::write(site.join("resources/css/app.css"), "body{margin:0}").unwrap();
    std::fs::write(site.join("system/site.js"), "console.log('site');\n").unwrap();

    let mut config = SiteConfig::default();
    config.port = 8080;
    config.paths.prod.site_root = site.clone();
    config.paths.prod.script = site.join("system/site.js");
    config.paths.prod.content_root = site.join("pages");
    (dir, config)
}

/// One API request as the test bundle observed it.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub method: String,
    pub query: std::collections::HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub content_type: Option<String>,
}

/// Scripted bundle used across the integration suite.
///
/// API surface:
/// - `/echo`  → records the request, answers `200 text/plain "ok"` with an
///   `x-bundle` header
/// - `/boom`  → fails with a cause chain whose deeper frames belong to the
///   `ApisFactoryImpl` sentinel
/// - elsewhere → `None` (unknown path)
///
/// Stream surface: records every event; `Text` payloads are commands:
/// - `send:MSG`        → send MSG back on this (session, route)
/// - `bcast:N:MSG`     → broadcast MSG to the route, excluding client id N
/// - `id`              → send `id:N` back with this session's client id
/// - `fail`            → fail with the sentinel cause chain
/// - `bye`             → disconnect this (session, route)
#[derive(Default)]
pub struct TestBundle {
    pub api_requests: Mutex<Vec<RecordedRequest>>,
    pub stream_events: Mutex<Vec<StreamEvent>>,
    pub declared_streams: AtomicUsize,
}

impl TestBundle {
    #[allow(dead_code)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[allow(dead_code)]
    pub fn with_streams(count: usize) -> Arc<Self> {
        let bundle = Self::default();
        bundle.declared_streams.store(count, Ordering::Relaxed);
        Arc::new(bundle)
    }

    #[allow(dead_code)]
    pub fn events(&self) -> Vec<StreamEvent> {
        self.stream_events.lock().unwrap().clone()
    }

    fn sentinel_failure() -> DispatchFailure {
        DispatchFailure::from_cause(
            FailureCause::new("IllegalStateException", "boom").with_frames(vec![
                StackFrame::at("com.site.api.Echo.handle", "Echo.kt:12"),
                StackFrame::new("ApisFactoryImpl$create$2.invoke"),
                StackFrame::new("com.framework.Dispatcher.dispatch"),
            ]),
        )
    }

    fn sentinel_filter() -> FrameFilter {
        Arc::new(|frame: &StackFrame| frame.symbol.starts_with("ApisFactoryImpl"))
    }
}

#[async_trait]
impl ApiBundle for TestBundle {
    async fn handle_api(
        &self,
        path: &str,
        request: NeutralRequest,
    ) -> Result<Option<NeutralResponse>, DispatchFailure> {
        self.api_requests.lock().unwrap().push(RecordedRequest {
            path: path.to_string(),
            method: request.method.to_string(),
            query: request.query.clone(),
            body: request.body.clone(),
            content_type: request.body_content_type.clone(),
        });

        match path {
            "/echo" => Ok(Some(
                NeutralResponse::new(200)
                    .with_body("ok", "text/plain")
                    .with_header("x-bundle", "test"),
            )),
            "/boom" => Err(Self::sentinel_failure()),
            _ => Ok(None),
        }
    }

    async fn handle_stream_event(
        &self,
        event: StreamEvent,
        streams: StreamHandle,
    ) -> Result<(), DispatchFailure> {
        self.stream_events.lock().unwrap().push(event.clone());

        if let StreamEvent::Text { text, .. } = &event {
            if let Some(msg) = text.strip_prefix("send:") {
                streams.send(msg);
            } else if let Some(rest) = text.strip_prefix("bcast:") {
                if let Some((excluded, msg)) = rest.split_once(':') {
                    let excluded: u64 = excluded.parse().unwrap_or(0);
                    streams.broadcast(msg, &|id| id != excluded);
                }
            } else if text == "id" {
                streams.send(&format!("id:{}", streams.client_id()));
            } else if text == "fail" {
                return Err(Self::sentinel_failure());
            } else if text == "bye" {
                streams.disconnect().await;
            }
        }
        Ok(())
    }

    fn num_api_streams(&self) -> usize {
        self.declared_streams.load(Ordering::Relaxed)
    }

    fn api_frame_filter(&self) -> FrameFilter {
        Self::sentinel_filter()
    }

    fn stream_frame_filter(&self) -> FrameFilter {
        Self::sentinel_filter()
    }
}
