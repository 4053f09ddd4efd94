//! Load balancer binary entry point.
//!
//! ```text
//!                         ┌──────────────────────────────────────────┐
//!                         │              LOAD BALANCER               │
//!                         │                                          │
//!     Client Request      │  ┌─────────┐   ┌──────────────────────┐  │
//!     ────────────────────┼─▶│  http   │──▶│ load_balancer        │  │
//!                         │  │ server  │   │ registry + roundrobin│  │
//!                         │  └─────────┘   └──────────┬───────────┘  │
//!                         │                           ▼              │
//!     Client Response     │  ┌─────────┐   ┌──────────────────────┐  │
//!     ◀───────────────────┼──│ relay   │◀──│ forwarder + client   │◀─┼── Backend
//!                         │  └─────────┘   └──────────────────────┘  │
//!                         │                                          │
//!                         │  health prober ──(status flips)──▶ pool  │
//!                         │  config · observability · lifecycle      │
//!                         └──────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use load_balancer::config::{self, ProxyConfig};
use load_balancer::http::HttpServer;
use load_balancer::lifecycle::{signals, Shutdown};
use load_balancer::observability::{logging, metrics};

/// HTTP reverse-proxy load balancer.
#[derive(Debug, Parser)]
#[command(name = "load-balancer", version)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        probe_interval_secs = config.health_check.interval_secs,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
