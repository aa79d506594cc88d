// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Accepts client fragment PUT/GET over a framed TCP channel.

use std::net::SocketAddr;
use std::sync::Arc;

use dfs_proto::wire::{StorageMessage, StorageResponse};
use dfs_proto::MessageChannel;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::store::{FragmentStore, StoreError};

pub async fn run(
    listen_addr: SocketAddr,
    store: Arc<FragmentStore>,
    max_message_size: usize,
    shutdown: Arc<tokio::sync::Notify>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen_addr).await?;
    info!("storage node listening on {}", listen_addr);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer_addr)) => {
                        let store = store.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, peer_addr, store, max_message_size).await {
                                warn!("connection error from {}: {}", peer_addr, e);
                            }
                        });
                    }
                    Err(e) => warn!("accept error: {}", e),
                }
            }
            _ = shutdown.notified() => {
                info!("storage node listener shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    store: Arc<FragmentStore>,
    max_message_size: usize,
) -> Result<(), dfs_proto::frame::FrameError> {
    let mut channel = MessageChannel::new(stream, max_message_size);

    while let Some(msg) = channel.recv::<StorageMessage>().await? {
        let response = match msg {
            StorageMessage::PutFragment {
                fragment_id,
                bytes,
                md5,
            } => match store.put(fragment_id, bytes, md5) {
                Ok(()) => StorageResponse::PutAck,
                Err(StoreError::ChecksumMismatch) => StorageResponse::ChecksumMismatch,
            },
            StorageMessage::GetFragment { fragment_id } => match store.get(&fragment_id) {
                Some((bytes, md5)) => StorageResponse::FragmentData { bytes, md5 },
                None => StorageResponse::NotFound,
            },
        };

        channel.send(&response).await?;
    }

    debug!("client disconnected: {}", peer_addr);
    Ok(())
}
