use anyhow::Context;
use clap::Parser;
use identity_backend_lib::{config::Settings, router, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

/// Identity service: registration, login and bearer-token authorization
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML configuration file (default: ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding `server.host` and `server.port`
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

fn init_tracing(settings: &Settings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    if settings.logging.json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("loading configuration")?;
    init_tracing(&settings);

    let addr = match cli.bind {
        Some(addr) => addr,
        None => settings.server.bind_addr()?,
    };

    let state = Arc::new(AppState::from_settings(&settings).await?);
    let app = router::create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
