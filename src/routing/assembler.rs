//! Route map assembly.
//!
//! Given `(environment, layout, config, bundle?)`, wires the status feed,
//! API dispatch, stream multiplexer, file serving, and catch-all chain into
//! one of four route maps.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, on, MethodFilter, MethodRouter};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::bundle::ApiBundle;
use crate::config::{ServerEnvironment, SiteConfig, SiteLayout};
use crate::error::ServerError;
use crate::files::server::serve_file;
use crate::files::{catchall_endpoint, static_site_endpoint, FileServer};
use crate::http::api::api_endpoint;
use crate::http::server::AppState;
use crate::routing::prefix::RoutePrefixer;
use crate::routing::redirect::RedirectEngine;
use crate::status::{status_endpoint, ServerGlobals};
use crate::stream::{stream_endpoint, StreamRegistry};

/// Route tail of the dev status feed, under `{prefix}/api/`.
pub const STATUS_ROUTE: &str = "kobweb-status";
/// Route tail of the stream websocket, under `{prefix}/api/`.
pub const STREAMS_ROUTE: &str = "kobweb-streams";

/// The seven methods the API surface accepts; anything else (TRACE,
/// CONNECT) is rejected by the HTTP layer before dispatch.
fn api_methods() -> MethodFilter {
    MethodFilter::GET
        .or(MethodFilter::POST)
        .or(MethodFilter::PUT)
        .or(MethodFilter::PATCH)
        .or(MethodFilter::DELETE)
        .or(MethodFilter::HEAD)
        .or(MethodFilter::OPTIONS)
}

/// Build the route map for the given environment and layout.
pub fn build_site_router(
    env: ServerEnvironment,
    layout: SiteLayout,
    config: &SiteConfig,
    bundle: Option<Arc<dyn ApiBundle>>,
    globals: Arc<ServerGlobals>,
) -> Result<Router, ServerError> {
    let prefixer = RoutePrefixer::new(&config.base_path);
    let redirects = Arc::new(RedirectEngine::compile(&config.redirects)?);
    let paths = config.paths_for(env);

    // A static layout never has a bundle; API paths fall through to the
    // catch-all chain.
    let bundle = match layout {
        SiteLayout::Fullstack => bundle,
        SiteLayout::Static => None,
    };

    let index_file = match (env, layout) {
        (ServerEnvironment::Prod, SiteLayout::Fullstack) => {
            paths.site_root.join("pages").join("index.html")
        }
        _ => paths.content_root.join("index.html"),
    };

    let state = AppState {
        env,
        prefixer: prefixer.clone(),
        redirects,
        bundle: bundle.clone(),
        registry: Arc::new(StreamRegistry::new()),
        globals,
        streaming: config.streaming,
        script: paths.script.clone(),
        content: FileServer::new(&paths.content_root),
        site: FileServer::new(&paths.site_root),
        index_file,
        server_port: config.port,
    };

    let router = match (env, layout) {
        (ServerEnvironment::Dev, _) => build_dev_router(&prefixer, bundle),
        (ServerEnvironment::Prod, SiteLayout::Fullstack) => {
            validate_fullstack_site(&paths.site_root)?;
            build_prod_fullstack_router(&prefixer, bundle, &paths.site_root)
        }
        (ServerEnvironment::Prod, SiteLayout::Static) => {
            let mut registered = HashSet::new();
            add_tail_routes(
                Router::new(),
                &prefixer,
                get(static_site_endpoint),
                &mut registered,
            )
        }
    };

    Ok(router.with_state(state).layer(TraceLayer::new_for_http()))
}

fn build_dev_router(
    prefixer: &RoutePrefixer,
    bundle: Option<Arc<dyn ApiBundle>>,
) -> Router<AppState> {
    let mut router = Router::new().route(
        &prefixer.join(&format!("api/{STATUS_ROUTE}")),
        get(status_endpoint),
    );

    if bundle.is_some() {
        router = router
            .route(
                &prefixer.join(&format!("api/{STREAMS_ROUTE}")),
                get(stream_endpoint),
            )
            .route(
                &prefixer.join("api/{*params}"),
                on(api_methods(), api_endpoint),
            );
    }

    let mut registered = HashSet::new();
    add_tail_routes(router, prefixer, get(catchall_endpoint), &mut registered)
}

fn build_prod_fullstack_router(
    prefixer: &RoutePrefixer,
    bundle: Option<Arc<dyn ApiBundle>>,
    site_root: &Path,
) -> Router<AppState> {
    let mut router = Router::new();

    if let Some(bundle) = &bundle {
        router = router.route(
            &prefixer.join("api/{*params}"),
            on(api_methods(), api_endpoint),
        );
        // A bundle with no declared streams never gets the websocket
        // endpoint installed.
        if bundle.num_api_streams() > 0 {
            router = router.route(
                &prefixer.join(&format!("api/{STREAMS_ROUTE}")),
                get(stream_endpoint),
            );
        }
    }

    let mut registered = HashSet::new();
    for (route, file) in collect_site_routes(site_root, prefixer) {
        if registered.insert(route.clone()) {
            let handler = move || {
                let file = file.clone();
                async move {
                    match serve_file(&file).await {
                        Some(resp) => resp,
                        None => StatusCode::NOT_FOUND.into_response(),
                    }
                }
            };
            router = router.route(&route, get(handler));
        }
    }
    info!(routes = registered.len(), "registered exported site routes");

    add_tail_routes(router, prefixer, get(catchall_endpoint), &mut registered)
}

/// Register one method router at the catch-all tail positions: the wildcard,
/// the bare prefix, and the prefix with trailing slash. Positions already
/// taken by explicit file routes are left alone.
fn add_tail_routes(
    mut router: Router<AppState>,
    prefixer: &RoutePrefixer,
    method_router: MethodRouter<AppState>,
    registered: &mut HashSet<String>,
) -> Router<AppState> {
    let mut paths = vec![prefixer.join("{*params}"), prefixer.join("")];
    if !prefixer.prefix().is_empty() {
        paths.push(format!("/{}", prefixer.prefix()));
    }
    for path in paths {
        if registered.insert(path.clone()) {
            router = router.route(&path, method_router.clone());
        }
    }
    router
}

/// Fail fast when the exported site cannot back a fullstack assembly.
fn validate_fullstack_site(site_root: &Path) -> Result<(), ServerError> {
    if !site_root.is_dir() {
        return Err(ServerError::MissingSiteRoot(site_root.to_path_buf()));
    }
    if !site_root.join("system").is_dir() {
        return Err(ServerError::MissingSystemFolder(site_root.to_path_buf()));
    }
    Ok(())
}

/// Explicit GET routes for an exported site: every file under `resources/`
/// at its own path, every file under `pages/` registered extensionless,
/// with `index.html` files also serving their directory.
fn collect_site_routes(site_root: &Path, prefixer: &RoutePrefixer) -> Vec<(String, PathBuf)> {
    let mut routes = Vec::new();

    let resources = site_root.join("resources");
    for file in walk_files(&resources) {
        if let Some(rel) = relative_url(&file, &resources) {
            routes.push((prefixer.join(&rel), file));
        }
    }

    let pages = site_root.join("pages");
    for file in walk_files(&pages) {
        let Some(rel) = relative_url(&file, &pages) else {
            continue;
        };
        match rel.strip_suffix(".html") {
            Some(stem) => {
                routes.push((prefixer.join(stem), file.clone()));
                if let Some(dir) = stem.strip_suffix("index") {
                    // pages/foo/index.html also answers at {prefix}/foo/
                    routes.push((prefixer.join(dir), file.clone()));
                    let trimmed = dir.trim_end_matches('/');
                    if !trimmed.is_empty() {
                        routes.push((prefixer.join(trimmed), file.clone()));
                    } else if !prefixer.prefix().is_empty() {
                        routes.push((format!("/{}", prefixer.prefix()), file.clone()));
                    }
                }
            }
            None => routes.push((prefixer.join(&rel), file)),
        }
    }

    routes
}

fn relative_url(file: &Path, base: &Path) -> Option<String> {
    let rel = file.strip_prefix(base).ok()?;
    let segments: Vec<&str> = rel
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    Some(segments.join("/"))
}

/// Depth-first file listing, sorted for deterministic registration.
fn walk_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return files;
    };
    let mut entries: Vec<_> = entries.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.path());
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            files.extend(walk_files(&path));
        } else if path.is_file() {
            files.push(path);
        }
    }
    files
}
