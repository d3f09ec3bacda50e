//! origin-server
//!
//! A minimal origin HTTP server that serves and stores files under a web root.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                    ORIGIN SERVER                      │
//!                     │                                                       │
//!   Client Request    │  ┌──────────┐   ┌───────────┐   ┌──────────────┐     │
//!   ──────────────────┼─▶│ listener │──▶│ admission │──▶│ worker pool  │     │
//!                     │  │ (accept) │   │   gate    │   │  (N tasks)   │     │
//!                     │  └──────────┘   └─────┬─────┘   └──────┬───────┘     │
//!                     │                       │ 503            ▼             │
//!   ◀─────────────────┼───────────────────────┘         ┌──────────────┐     │
//!                     │                                 │    parser    │     │
//!                     │                                 └──────┬───────┘     │
//!                     │                                        ▼             │
//!   Client Response   │  ┌──────────┐                   ┌──────────────┐     │
//!   ◀─────────────────┼──│ response │◀──────────────────│  dispatcher  │──▶ web root
//!                     │  └──────────┘                   │ + multipart  │     │
//!                     │                                 └──────────────┘     │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use origin_server::config::{self, ConfigError, ServerConfig};
use origin_server::net::Listener;
use origin_server::observability::{logging, metrics};
use origin_server::{lifecycle, HttpServer};

#[derive(Parser, Debug)]
#[command(name = "origin-server")]
#[command(about = "Minimal origin HTTP server backed by a directory", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory served and written to
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Number of connection workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// In-flight connections before new ones get a 503
    #[arg(long)]
    max_connections: Option<usize>,

    /// Log level or filter directive
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(root) = &self.root {
            config.storage.web_root = root.clone();
        }
        if let Some(workers) = self.workers {
            config.workers.pool_size = workers;
        }
        if let Some(max) = self.max_connections {
            config.listener.max_connections = max;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

fn load(cli: &Cli) -> Result<ServerConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ServerConfig::default(),
    };
    cli.apply_overrides(&mut config);
    config::validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "origin-server starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                address = %config.observability.metrics_address,
                error = %e,
                "Invalid metrics address, metrics disabled"
            ),
        }
    }

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        max_connections = config.listener.max_connections,
        pool_size = config.workers.pool_size,
        web_root = %config.storage.web_root.display(),
        "Configuration loaded"
    );

    let listener = Listener::bind(&config.listener).await?;
    let server = Arc::new(HttpServer::new(config));

    let stopper = Arc::clone(&server);
    tokio::spawn(async move {
        lifecycle::terminate_signal().await;
        stopper.stop();
    });

    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
