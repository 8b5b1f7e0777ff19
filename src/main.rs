//! Server binary: load config, assemble the route map, serve.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gossamer::bundle::check_bundle_path;
use gossamer::config::loader::load_config;
use gossamer::{build_site_router, HttpServer, ServerEnvironment, ServerGlobals, SiteLayout};

#[derive(Parser)]
#[command(name = "gossamer")]
#[command(about = "Web server for hybrid static/dynamic sites", long_about = None)]
struct Cli {
    /// Path to the site configuration file.
    #[arg(short, long, default_value = "site.yaml")]
    config: PathBuf,

    /// Server environment.
    #[arg(long, value_enum, default_value = "dev")]
    env: EnvArg,

    /// Site layout.
    #[arg(long, value_enum, default_value = "fullstack")]
    layout: LayoutArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum EnvArg {
    Dev,
    Prod,
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    Fullstack,
    Static,
}

impl From<EnvArg> for ServerEnvironment {
    fn from(arg: EnvArg) -> Self {
        match arg {
            EnvArg::Dev => ServerEnvironment::Dev,
            EnvArg::Prod => ServerEnvironment::Prod,
        }
    }
}

impl From<LayoutArg> for SiteLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Fullstack => SiteLayout::Fullstack,
            LayoutArg::Static => SiteLayout::Static,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gossamer=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let env: ServerEnvironment = cli.env.into();
    let layout: SiteLayout = cli.layout.into();

    let config = load_config(&cli.config)?;

    tracing::info!(
        title = %config.title,
        port = config.port,
        base_path = %config.base_path,
        ?env,
        ?layout,
        "Configuration loaded"
    );

    // Bundle loading happens out of process; embedders pass their bundle
    // through the library API. Here we only surface a misconfigured path.
    let paths = config.paths_for(env);
    let _ = check_bundle_path(paths.api_bundle.as_deref());

    let globals = Arc::new(ServerGlobals::new());
    let router = build_site_router(env, layout, &config, None, globals)?;

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    HttpServer::new(router).run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
