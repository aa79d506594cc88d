// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Background maintenance tasks: staleness sweep and periodic index
//! rebuild, run on two independent cadences.

use std::sync::Arc;

use tracing::{info, warn};

use crate::router::RouterState;

/// Every `heartbeat_interval`, drop nodes that have missed
/// `accepted_delay` worth of heartbeats.
pub async fn run_staleness_sweep(state: Arc<RouterState>, shutdown: Arc<tokio::sync::Notify>) {
    let tick = state.config.heartbeat_interval();
    let accepted_delay = state.config.accepted_delay();

    loop {
        tokio::select! {
            _ = tokio::time::sleep(tick) => {
                let removed = state.registry.write().await.remove_stale(accepted_delay);
                if !removed.is_empty() {
                    warn!(nodes = ?removed, "pruned stale storage nodes");
                }
            }
            _ = shutdown.notified() => {
                info!("staleness sweep task shutting down");
                break;
            }
        }
    }
}

/// Every `heartbeat_interval * accepted_delay`, rebuild the
/// inverted index from a fresh registry snapshot and swap it in. PUT/GET/
/// LIST do not wait on this task: they build their own on-demand snapshot
/// (`router::build_on_demand_index`), so this task only keeps a warm
/// baseline for callers that read the index directly.
pub async fn run_index_rebuild(state: Arc<RouterState>, shutdown: Arc<tokio::sync::Notify>) {
    let tick = state.config.index_rebuild_interval();
    let accepted_delay = state.config.accepted_delay();

    loop {
        tokio::select! {
            _ = tokio::time::sleep(tick) => {
                let live = state.registry.read().await.live_nodes(accepted_delay);
                state.index.rebuild(&live);
                info!(files = state.index.load().file_names().len(), "rebuilt inverted index");
            }
            _ = shutdown.notified() => {
                info!("index rebuild task shutting down");
                break;
            }
        }
    }
}
