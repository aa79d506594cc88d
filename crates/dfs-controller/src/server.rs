// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Controller core: two listeners (storage-node-facing, client-facing),
//! each connection handled on its own task, backed by a shared
//! [`RouterState`].

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dfs_proto::frame::MessageChannel;
use dfs_proto::wire::{ClientMessage, NodeAck, NodeMessage};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::router::{self, RouterState};
use crate::sweeper;

#[derive(Clone)]
pub struct Controller {
    state: Arc<RouterState>,
    shutdown: Arc<tokio::sync::Notify>,
    running: Arc<AtomicBool>,
}

impl Controller {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        Ok(Self {
            state: Arc::new(RouterState::new(config)),
            shutdown: Arc::new(tokio::sync::Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Bind both listeners and run until shutdown.
    pub async fn run(&self, storage_addr: SocketAddr, client_addr: SocketAddr) -> Result<(), ServerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyRunning);
        }

        let storage_listener = TcpListener::bind(storage_addr)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;
        let client_listener = TcpListener::bind(client_addr)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        info!("storage-node listener on {}", storage_addr);
        info!("client listener on {}", client_addr);

        tokio::spawn(sweeper::run_staleness_sweep(
            self.state.clone(),
            self.shutdown.clone(),
        ));
        tokio::spawn(sweeper::run_index_rebuild(
            self.state.clone(),
            self.shutdown.clone(),
        ));

        let storage_state = self.state.clone();
        let storage_shutdown = self.shutdown.clone();
        let storage_task = tokio::spawn(async move {
            accept_loop(storage_listener, storage_shutdown, move |stream, peer| {
                let state = storage_state.clone();
                async move {
                    if let Err(e) = handle_storage_connection(stream, peer, state).await {
                        warn!("storage connection error from {}: {}", peer, e);
                    }
                }
            })
            .await;
        });

        let client_state = self.state.clone();
        let client_shutdown = self.shutdown.clone();
        let client_task = tokio::spawn(async move {
            accept_loop(client_listener, client_shutdown, move |stream, peer| {
                let state = client_state.clone();
                async move {
                    if let Err(e) = handle_client_connection(stream, peer, state).await {
                        warn!("client connection error from {}: {}", peer, e);
                    }
                }
            })
            .await;
        });

        let _ = tokio::join!(storage_task, client_task);
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn node_count(&self) -> usize {
        self.state.registry.read().await.len()
    }
}

async fn accept_loop<F, Fut>(listener: TcpListener, shutdown: Arc<tokio::sync::Notify>, handler: F)
where
    F: Fn(tokio::net::TcpStream, SocketAddr) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer_addr)) => {
                        debug!("accepted connection from {}", peer_addr);
                        tokio::spawn(handler(stream, peer_addr));
                    }
                    Err(e) => warn!("accept error: {}", e),
                }
            }
            _ = shutdown.notified() => {
                info!("listener shutting down");
                break;
            }
        }
    }
}

async fn handle_storage_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<RouterState>,
) -> Result<(), ServerError> {
    let mut channel = MessageChannel::new(stream, state.config.max_message_size);

    while let Some(msg) = channel.recv::<NodeMessage>().await? {
        debug!("heartbeat from node {} ({})", msg.node_id, peer_addr);
        state.registry.write().await.upsert(
            msg.node_id,
            msg.host,
            msg.port,
            msg.free_space,
            msg.inventory,
        );
        channel.send(&NodeAck).await?;
    }

    Ok(())
}

async fn handle_client_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<RouterState>,
) -> Result<(), ServerError> {
    let mut channel = MessageChannel::new(stream, state.config.max_message_size);

    while let Some(msg) = channel.recv::<ClientMessage>().await? {
        let response = router::handle_client_message(&state, msg).await;
        channel.send(&response).await?;
    }

    debug!("client disconnected: {}", peer_addr);
    Ok(())
}

#[derive(Debug)]
pub enum ServerError {
    Config(String),
    Bind(String),
    AlreadyRunning,
    Frame(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(s) => write!(f, "configuration error: {s}"),
            Self::Bind(s) => write!(f, "bind error: {s}"),
            Self::AlreadyRunning => write!(f, "server already running"),
            Self::Frame(s) => write!(f, "framing error: {s}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<dfs_proto::frame::FrameError> for ServerError {
    fn from(e: dfs_proto::frame::FrameError) -> Self {
        Self::Frame(e.to_string())
    }
}
