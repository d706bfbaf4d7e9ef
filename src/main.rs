//! `service-mount`: serve configured services from one host application.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ axum::serve ──▶ Application stack
//!                                        │
//!                     ┌──────────────────┼───────────────────┐
//!                     ▼                  ▼                   ▼
//!              Host: api.users.*    /test prefix        (no match)
//!              users.api router     test router         404
//!                     │
//!                     ▼
//!                 /v1 prefix
//!                 v1 router
//! ```
//!
//! Each configured service answers `/` and `/hi`.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use service_mount::config::{load_config, AppConfig};
use service_mount::lifecycle::{bootstrap, signals, Shutdown};
use service_mount::observability::init_logging;
use service_mount::HttpServer;

#[derive(Parser)]
#[command(name = "service-mount")]
#[command(about = "Mount namespaced services into one HTTP application", long_about = None)]
struct Cli {
    /// TOML configuration file. Without it a single `test` service is
    /// mounted at `/test`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability);
    tracing::info!("service-mount v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        request_timeout_secs = config.listener.request_timeout_secs,
        "Configuration loaded"
    );

    let boot = bootstrap(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::trigger_on_signal(shutdown.clone());

    let server = HttpServer::new(boot.app, config.listener.clone());
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
