// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sends PUT/GET/LS/NODE_STATS to the controller and, for PUT/GET,
//! dispatches each fragment to storage nodes.
//!
//! Each fragment tries its replica list in primary-then-fallback order.
//! Fragments are dispatched with bounded concurrency rather than strictly
//! sequentially.

use std::net::SocketAddr;
use std::sync::Arc;

use dfs_proto::wire::{
    ClientMessage, ControllerMessage, FragmentInfo, StorageMessage, StorageNodeInfo,
    StorageResponse,
};
use dfs_proto::{Digest, MessageChannel};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::file::{FileAssembler, SourceFile};

#[derive(Debug)]
pub enum DispatchError {
    Controller(String),
    AllReplicasFailed { fragment_id: String },
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Controller(s) => write!(f, "controller error: {s}"),
            Self::AllReplicasFailed { fragment_id } => {
                write!(f, "all replicas failed for fragment {fragment_id}")
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Maximum number of fragments dispatched to storage nodes concurrently.
const MAX_CONCURRENT_FRAGMENTS: usize = 8;

async fn controller_channel(controller: SocketAddr) -> std::io::Result<MessageChannel> {
    let stream = TcpStream::connect(controller).await?;
    Ok(MessageChannel::new(stream, dfs_proto::frame::DEFAULT_MAX_MESSAGE_SIZE))
}

/// Request a placement plan and upload every fragment of `source`.
pub async fn put_file(
    controller: SocketAddr,
    source: &SourceFile,
    chunk_size: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut channel = controller_channel(controller).await?;
    channel
        .send(&ClientMessage::Put {
            filename: source.file_name(),
            filesize: source.size(),
            chunk_size,
        })
        .await?;

    let response = channel
        .recv::<ControllerMessage>()
        .await?
        .ok_or_else(|| DispatchError::Controller("connection closed before plan".into()))?;

    let (status, fragments) = match response {
        ControllerMessage::Plan {
            status_code,
            fragment_layout,
            ..
        } => (status_code, fragment_layout),
        other => {
            return Err(Box::new(DispatchError::Controller(format!(
                "unexpected response to PUT: {other:?}"
            ))))
        }
    };

    if !matches!(status, dfs_proto::wire::StatusCode::Ok) {
        return Err(Box::new(DispatchError::Controller(format!(
            "controller rejected PUT: {status:?}"
        ))));
    }

    info!(fragments = fragments.len(), "dispatching fragments");

    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FRAGMENTS));
    let mut tasks = Vec::with_capacity(fragments.len());
    let mut offset = 0u64;

    for frag in fragments {
        let (bytes, digest) = source.read_fragment(offset, frag.size)?;
        offset += frag.size;

        let permit = semaphore.clone();
        let fragment_id = frag.fragment_id.clone();
        let storage_nodes = frag.storage_nodes.clone();

        tasks.push(tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore not closed");
            dispatch_fragment_put(&fragment_id, bytes, digest, &storage_nodes).await
        }));
    }

    let mut failed = Vec::new();
    for task in tasks {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => failed.push(e.to_string()),
            Err(e) => failed.push(e.to_string()),
        }
    }

    if !failed.is_empty() {
        warn!(failures = ?failed, "some fragments were not dispatched");
    } else {
        info!("all fragments dispatched");
    }

    Ok(())
}

/// Try each replica in order until one accepts the fragment. On total
/// failure the fragment is logged and dispatch continues with the rest
/// rather than requesting a new plan from the controller.
async fn dispatch_fragment_put(
    fragment_id: &str,
    bytes: Vec<u8>,
    digest: Digest,
    nodes: &[StorageNodeInfo],
) -> Result<(), DispatchError> {
    for node in nodes {
        match try_put_to_node(node, fragment_id, &bytes, digest).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                error!(node = %node.storage_node_id, fragment = fragment_id, error = %e, "dispatch to node failed");
                continue;
            }
        }
    }

    Err(DispatchError::AllReplicasFailed {
        fragment_id: fragment_id.to_string(),
    })
}

async fn try_put_to_node(
    node: &StorageNodeInfo,
    fragment_id: &str,
    bytes: &[u8],
    digest: Digest,
) -> std::io::Result<()> {
    let addr = format!("{}:{}", node.host, node.port);
    let stream = TcpStream::connect(addr).await?;
    let mut channel = MessageChannel::new(stream, dfs_proto::frame::DEFAULT_MAX_MESSAGE_SIZE);

    channel
        .send(&StorageMessage::PutFragment {
            fragment_id: fragment_id.to_string(),
            bytes: bytes.to_vec(),
            md5: digest,
        })
        .await
        .map_err(to_io_error)?;

    let response = channel
        .recv::<StorageResponse>()
        .await
        .map_err(to_io_error)?;

    match response {
        Some(StorageResponse::PutAck) => Ok(()),
        Some(other) => Err(std::io::Error::other(format!("unexpected reply: {other:?}"))),
        None => Err(std::io::Error::other("connection closed before ack")),
    }
}

/// Request the fragment layout of an existing file and download every
/// fragment, trying replicas in order.
pub async fn get_file(
    controller: SocketAddr,
    filename: &str,
    out_dir: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut channel = controller_channel(controller).await?;
    channel
        .send(&ClientMessage::Get {
            filename: filename.to_string(),
        })
        .await?;

    let response = channel
        .recv::<ControllerMessage>()
        .await?
        .ok_or_else(|| DispatchError::Controller("connection closed before layout".into()))?;

    let (status, fragments) = match response {
        ControllerMessage::FragLayout {
            status_code,
            fragment_layout,
            ..
        } => (status_code, fragment_layout),
        other => {
            return Err(Box::new(DispatchError::Controller(format!(
                "unexpected response to GET: {other:?}"
            ))))
        }
    };

    if !matches!(status, dfs_proto::wire::StatusCode::Ok) {
        return Err(Box::new(DispatchError::Controller(format!(
            "controller rejected GET: {status:?}"
        ))));
    }

    let mut ordered: Vec<FragmentInfo> = fragments;
    ordered.sort_by_key(|f| {
        dfs_proto::parse_fragment_id(&f.fragment_id)
            .map(|(_, index)| index)
            .unwrap_or(u32::MAX)
    });

    let mut assembler = FileAssembler::new(out_dir, filename, ordered.len());

    for (i, frag) in ordered.iter().enumerate() {
        let bytes = fetch_fragment(&frag.fragment_id, &frag.storage_nodes).await?;
        assembler.place(i, bytes);
    }

    let digest = assembler.write()?;
    info!(%filename, digest = %digest, "file reassembled");
    Ok(())
}

async fn fetch_fragment(
    fragment_id: &str,
    nodes: &[StorageNodeInfo],
) -> Result<Vec<u8>, DispatchError> {
    for node in nodes {
        match try_get_from_node(node, fragment_id).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) => {
                error!(node = %node.storage_node_id, fragment = fragment_id, error = %e, "fetch from node failed");
                continue;
            }
        }
    }

    Err(DispatchError::AllReplicasFailed {
        fragment_id: fragment_id.to_string(),
    })
}

async fn try_get_from_node(
    node: &StorageNodeInfo,
    fragment_id: &str,
) -> std::io::Result<Vec<u8>> {
    let addr = format!("{}:{}", node.host, node.port);
    let stream = TcpStream::connect(addr).await?;
    let mut channel = MessageChannel::new(stream, dfs_proto::frame::DEFAULT_MAX_MESSAGE_SIZE);

    channel
        .send(&StorageMessage::GetFragment {
            fragment_id: fragment_id.to_string(),
        })
        .await
        .map_err(to_io_error)?;

    let response = channel
        .recv::<StorageResponse>()
        .await
        .map_err(to_io_error)?;

    match response {
        Some(StorageResponse::FragmentData { bytes, md5 }) => {
            if Digest::of(&bytes) != md5 {
                return Err(std::io::Error::other("checksum mismatch on fragment fetch"));
            }
            Ok(bytes)
        }
        Some(StorageResponse::NotFound) => Err(std::io::Error::other("fragment not found")),
        Some(other) => Err(std::io::Error::other(format!("unexpected reply: {other:?}"))),
        None => Err(std::io::Error::other("connection closed before data")),
    }
}

fn to_io_error(e: dfs_proto::frame::FrameError) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

/// List files known to the controller.
pub async fn list_files(controller: SocketAddr) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut channel = controller_channel(controller).await?;
    channel.send(&ClientMessage::Ls).await?;

    let response = channel
        .recv::<ControllerMessage>()
        .await?
        .ok_or_else(|| DispatchError::Controller("connection closed before Ls reply".into()))?;

    match response {
        ControllerMessage::Ls { file_names, .. } => Ok(file_names),
        other => Err(Box::new(DispatchError::Controller(format!(
            "unexpected response to LS: {other:?}"
        )))),
    }
}

/// Request live node statistics.
pub async fn node_stats(
    controller: SocketAddr,
) -> Result<Vec<dfs_proto::wire::NodeStatsEntry>, Box<dyn std::error::Error>> {
    let mut channel = controller_channel(controller).await?;
    channel.send(&ClientMessage::NodeStats).await?;

    let response = channel
        .recv::<ControllerMessage>()
        .await?
        .ok_or_else(|| DispatchError::Controller("connection closed before NodeStats reply".into()))?;

    match response {
        ControllerMessage::NodeStats { active_nodes, .. } => Ok(active_nodes),
        other => Err(Box::new(DispatchError::Controller(format!(
            "unexpected response to NODE_STATS: {other:?}"
        )))),
    }
}
