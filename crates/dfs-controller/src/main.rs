// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Distributed file system controller.
//!
//! Tracks live storage nodes via heartbeat, plans fragment placement for
//! new files, and answers PUT/GET/LIST/NODE_STATS requests from clients.
//!
//! # Usage
//!
//! ```bash
//! dfs-controller 9000 9001
//! dfs-controller 9000 9001 --replication-factor 2 --log-level debug
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod index;
mod planner;
mod registry;
mod router;
mod server;
mod sweeper;

pub use config::ServerConfig;
pub use server::Controller;

/// Distributed file system controller: node registry, placement planner,
/// inverted index, and request router.
#[derive(Parser, Debug)]
#[command(name = "dfs-controller")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TCP port storage nodes send heartbeats to.
    storage_port: u16,

    /// TCP port clients send PUT/GET/LIST/NODE_STATS requests to.
    client_port: u16,

    /// Bind address for both listeners.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Number of replicas per fragment.
    #[arg(long)]
    replication_factor: Option<usize>,

    /// Expected storage-node heartbeat cadence, in seconds.
    #[arg(long)]
    heartbeat_interval_secs: Option<u64>,

    /// Seconds of missed heartbeats before a node is considered stale.
    #[arg(long)]
    accepted_delay_secs: Option<u64>,

    /// Configuration file (JSON), overrides the defaults above when given.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = if let Some(path) = &args.config {
        info!("loading config from {:?}", path);
        ServerConfig::from_file(path)?
    } else {
        ServerConfig::default()
    };

    if let Some(n) = args.replication_factor {
        config.replication_factor = n;
    }
    if let Some(s) = args.heartbeat_interval_secs {
        config.heartbeat_interval_secs = s;
    }
    if let Some(s) = args.accepted_delay_secs {
        config.accepted_delay_secs = s;
    }

    let storage_addr: SocketAddr = format!("{}:{}", args.bind, args.storage_port).parse()?;
    let client_addr: SocketAddr = format!("{}:{}", args.bind, args.client_port).parse()?;

    info!("replication factor: {}", config.replication_factor);
    info!(
        "heartbeat interval: {}s, accepted delay: {}s",
        config.heartbeat_interval_secs, config.accepted_delay_secs
    );

    let controller = Controller::new(config)?;

    let shutdown_handle = controller.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown signal received, stopping controller...");
        shutdown_handle.shutdown();
    });

    controller.run(storage_addr, client_addr).await?;

    info!("controller stopped");
    Ok(())
}
