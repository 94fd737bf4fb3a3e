//! Campus ledger server.
//!
//! ```text
//!   client ──▶ http (axum + tower-http layers) ──▶ portal operation
//!                                                   │        │
//!                                    PortalStore ◀──┘        └──▶ NftLedger
//!                              (PostgreSQL / memory)          (alloy → contracts)
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use campus_ledger::config::load_config;
use campus_ledger::lifecycle::{build_portal, signals, Shutdown};
use campus_ledger::observability::{logging, metrics};
use campus_ledger::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "campus-ledger", version, about = "University portal with NFT receipts")]
struct Args {
    /// TOML config file; defaults apply when omitted.
    #[arg(short, long, env = "CAMPUS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "campus-ledger starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        public_url = %config.listener.public_url,
        store = ?config.database.backend,
        blockchain = config.blockchain.enabled,
        admin = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let portal = build_portal(config).await?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(portal);
    match tls {
        Some(tls) => {
            let addr: SocketAddr = bind_address.parse()?;
            server.run_tls(addr, &tls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
