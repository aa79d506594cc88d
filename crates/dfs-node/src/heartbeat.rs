// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Periodic heartbeat to the controller.

use std::net::SocketAddr;
use std::sync::Arc;

use dfs_proto::wire::{NodeAck, NodeMessage};
use dfs_proto::frame::DEFAULT_MAX_MESSAGE_SIZE;
use dfs_proto::MessageChannel;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::store::FragmentStore;

pub struct NodeIdentity {
    pub node_id: String,
    pub host: String,
    pub port: u16,
    pub free_space: u64,
}

/// Send a `NodeMessage` every `interval` until `shutdown` fires.
pub async fn run(
    controller: SocketAddr,
    identity: NodeIdentity,
    store: Arc<FragmentStore>,
    interval: std::time::Duration,
    shutdown: Arc<tokio::sync::Notify>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                if let Err(e) = send_heartbeat(controller, &identity, &store).await {
                    warn!(error = %e, "heartbeat failed");
                }
            }
            _ = shutdown.notified() => {
                debug!("heartbeat task shutting down");
                break;
            }
        }
    }
}

async fn send_heartbeat(
    controller: SocketAddr,
    identity: &NodeIdentity,
    store: &FragmentStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let stream = TcpStream::connect(controller).await?;
    let mut channel = MessageChannel::new(stream, DEFAULT_MAX_MESSAGE_SIZE);

    channel
        .send(&NodeMessage {
            node_id: identity.node_id.clone(),
            host: identity.host.clone(),
            port: identity.port,
            free_space: identity.free_space,
            inventory: store.inventory(),
        })
        .await?;

    let _ack: Option<NodeAck> = channel.recv().await?;
    debug!(node_id = %identity.node_id, "heartbeat sent");
    Ok(())
}
