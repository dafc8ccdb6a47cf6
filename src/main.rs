//! RPC gateway (v1)
//!
//! Fronts a node's internal JSON-RPC endpoint with an admission pipeline.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                     RPC GATEWAY                       │
//!   Client Request       │  ┌──────────┐   ┌──────────┐   ┌──────┐   ┌────────┐  │
//!   ─────────────────────┼─▶│ allow_ip │──▶│  vhost   │──▶│ cors │──▶│  base  │  │
//!                        │  │   gate   │   │   gate   │   │      │   │handler │  │
//!                        │  └──────────┘   └──────────┘   └──────┘   └───┬────┘  │
//!                        │                                              │       │
//!   Client Response      │                                   ┌──────────▼────┐  │
//!   ◀────────────────────┼───────────────────────────────────│  forwarding   │◀─┼── Node
//!                        │                                   │  dispatcher   │  │   JSON-RPC
//!                        │                                   └───────────────┘  │
//!                        └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use rpc_gateway::config::{load_config, paths::expand_path, GatewayConfig};
use rpc_gateway::observability::{logging, metrics};
use rpc_gateway::rpc::ForwardingDispatcher;
use rpc_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "rpc-gateway")]
#[command(about = "Admission gateway for a node's JSON-RPC endpoint", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. `~/` and `$VAR` are expanded.
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(raw) => {
            let path: PathBuf = expand_path(raw);
            load_config(&path)?
        }
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);

    tracing::info!("rpc-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let dispatcher = Arc::new(ForwardingDispatcher::new(&config.upstream)?);
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config, dispatcher)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
