// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Distributed file system storage node: heartbeats its identity and
//! inventory to the controller, and serves fragment PUT/GET to clients.

mod heartbeat;
mod server;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use heartbeat::NodeIdentity;
use store::FragmentStore;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Storage node for the distributed file system.
#[derive(Parser, Debug)]
#[command(name = "dfs-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Controller address to heartbeat to, e.g. 127.0.0.1:9000.
    #[arg(long)]
    controller: String,

    /// Address to listen on for client fragment PUT/GET, e.g. 127.0.0.1:9100.
    #[arg(long)]
    listen: String,

    /// Unique identifier for this node.
    #[arg(long)]
    id: String,

    /// Free space to advertise, in bytes.
    #[arg(long, default_value = "107374182400")]
    free_space: u64,

    /// Heartbeat cadence, in seconds.
    #[arg(long, default_value = "5")]
    heartbeat_interval_secs: u64,

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
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let controller: SocketAddr = args.controller.parse()?;
    let listen: SocketAddr = args.listen.parse()?;

    let store = Arc::new(FragmentStore::new());
    let shutdown = Arc::new(tokio::sync::Notify::new());

    info!(id = %args.id, %listen, %controller, "starting storage node");

    let identity = NodeIdentity {
        node_id: args.id,
        host: listen.ip().to_string(),
        port: listen.port(),
        free_space: args.free_space,
    };

    let heartbeat_shutdown = shutdown.clone();
    let heartbeat_store = store.clone();
    tokio::spawn(heartbeat::run(
        controller,
        identity,
        heartbeat_store,
        std::time::Duration::from_secs(args.heartbeat_interval_secs),
        heartbeat_shutdown,
    ));

    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown signal received, stopping node...");
        ctrl_c_shutdown.notify_waiters();
    });

    server::run(
        listen,
        store,
        dfs_proto::frame::DEFAULT_MAX_MESSAGE_SIZE,
        shutdown,
    )
    .await?;

    info!("storage node stopped");
    Ok(())
}
