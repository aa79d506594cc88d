// SPDX-License-Identifier: Apache-2.0 OR MIT

//! PUT/GET/LIST/NODE_STATS request handling.

use std::time::Duration;

use dfs_proto::wire::{
    ClientMessage, ControllerMessage, FragmentInfo, NodeStatsEntry, StatusCode, StorageNodeInfo,
};
use tokio::sync::RwLock;

use crate::config::ServerConfig;
use crate::index::IndexHandle;
use crate::planner::{self, PlannerError};
use crate::registry::NodeRegistry;

/// Shared state the router needs on every request. `server.rs` constructs
/// one of these and clones the `Arc` into each connection task.
pub struct RouterState {
    pub registry: RwLock<NodeRegistry>,
    pub index: IndexHandle,
    pub config: ServerConfig,
}

impl RouterState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            registry: RwLock::new(NodeRegistry::new()),
            index: IndexHandle::new(),
            config,
        }
    }

    fn accepted_delay(&self) -> Duration {
        Duration::from_secs(self.config.accepted_delay_secs)
    }
}

/// Handle one client request and produce the response to send back.
pub async fn handle_client_message(state: &RouterState, msg: ClientMessage) -> ControllerMessage {
    match msg {
        ClientMessage::Put {
            filename,
            filesize,
            chunk_size,
        } => handle_put(state, filename, filesize, chunk_size).await,
        ClientMessage::Get { filename } => handle_get(state, &filename).await,
        ClientMessage::Ls => handle_ls(state).await,
        ClientMessage::NodeStats => handle_node_stats(state).await,
        ClientMessage::Delete { .. } => ControllerMessage::Delete {
            status_code: StatusCode::Error,
        },
    }
}

async fn to_fragment_layout(
    state: &RouterState,
    fragments: &[planner::FragmentPlacement],
) -> Vec<FragmentInfo> {
    let registry = state.registry.read().await;

    fragments
        .iter()
        .map(|f| FragmentInfo {
            fragment_id: f.fragment_id.clone(),
            size: f.size,
            storage_nodes: f
                .replicas
                .iter()
                .filter_map(|id| registry.node_by_id(id))
                .map(|n| StorageNodeInfo {
                    storage_node_id: n.node_id.clone(),
                    host: n.host.clone(),
                    port: n.port,
                })
                .collect(),
        })
        .collect()
}

async fn handle_put(
    state: &RouterState,
    filename: String,
    filesize: u64,
    chunk_size: Option<u64>,
) -> ControllerMessage {
    let on_demand = build_on_demand_index(state).await;
    if on_demand.file_exists(&filename) {
        return ControllerMessage::Plan {
            status_code: StatusCode::FileAlreadyExists,
            total_num_fragments: 0,
            fragment_layout: vec![],
        };
    }

    let chunk_size = chunk_size.unwrap_or(state.config.default_chunk_size);
    let live = state
        .registry
        .read()
        .await
        .live_nodes(state.accepted_delay());

    match planner::plan_placement(
        &filename,
        filesize,
        chunk_size,
        &live,
        state.config.replication_factor,
    ) {
        Ok(plan) => {
            let layout = to_fragment_layout(state, &plan.fragments).await;
            ControllerMessage::Plan {
                status_code: StatusCode::Ok,
                total_num_fragments: layout.len() as u32,
                fragment_layout: layout,
            }
        }
        Err(PlannerError::NoNodesAvailable) => ControllerMessage::Plan {
            status_code: StatusCode::NoNodesAvailable,
            total_num_fragments: 0,
            fragment_layout: vec![],
        },
    }
}

async fn handle_get(state: &RouterState, filename: &str) -> ControllerMessage {
    let on_demand = build_on_demand_index(state).await;

    let Some(fragments) = on_demand.fragments_of(filename) else {
        return ControllerMessage::FragLayout {
            status_code: StatusCode::FileNotFound,
            total_num_fragments: 0,
            fragment_layout: vec![],
        };
    };

    let registry = state.registry.read().await;
    let mut ids: Vec<&String> = fragments.keys().collect();
    ids.sort();

    let layout: Vec<FragmentInfo> = ids
        .into_iter()
        .map(|fragment_id| {
            let holders = &fragments[fragment_id];
            FragmentInfo {
                fragment_id: fragment_id.clone(),
                size: 0,
                storage_nodes: holders
                    .iter()
                    .filter_map(|id| registry.node_by_id(id))
                    .map(|n| StorageNodeInfo {
                        storage_node_id: n.node_id.clone(),
                        host: n.host.clone(),
                        port: n.port,
                    })
                    .collect(),
            }
        })
        .collect();

    ControllerMessage::FragLayout {
        status_code: StatusCode::Ok,
        total_num_fragments: layout.len() as u32,
        fragment_layout: layout,
    }
}

async fn handle_ls(state: &RouterState) -> ControllerMessage {
    let on_demand = build_on_demand_index(state).await;
    ControllerMessage::Ls {
        status_code: StatusCode::Ok,
        file_names: on_demand.file_names(),
    }
}

async fn handle_node_stats(state: &RouterState) -> ControllerMessage {
    let live = state
        .registry
        .read()
        .await
        .live_nodes(state.accepted_delay());

    if live.is_empty() {
        return ControllerMessage::NodeStats {
            status_code: StatusCode::Error,
            active_nodes: vec![],
        };
    }

    let mut active: Vec<NodeStatsEntry> = live
        .iter()
        .map(|n| NodeStatsEntry {
            node_id: n.node_id.clone(),
            free_space: n.free_space,
        })
        .collect();
    active.sort_by(|a, b| a.node_id.cmp(&b.node_id));

    ControllerMessage::NodeStats {
        status_code: StatusCode::Ok,
        active_nodes: active,
    }
}

/// Build a fresh snapshot from the live registry rather than waiting for
/// the periodic rebuild: a file PUT a moment ago must be visible.
async fn build_on_demand_index(state: &RouterState) -> crate::index::FileIndex {
    let registry = state.registry.read().await;
    let live = registry.live_nodes(state.accepted_delay());
    crate::index::FileIndex::build(&live)
}
