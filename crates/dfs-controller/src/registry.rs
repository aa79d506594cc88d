// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Live node registry for the controller.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Information about a registered storage node.
#[derive(Debug, Clone)]
pub struct Node {
    pub node_id: String,
    pub host: String,
    pub port: u16,
    pub free_space: u64,
    pub inventory: Vec<String>,
    pub last_heartbeat: Instant,
}

impl Node {
    /// Is this node still live against `accepted_delay`?
    pub fn is_live(&self, accepted_delay: Duration) -> bool {
        self.last_heartbeat.elapsed() <= accepted_delay
    }
}

/// Registry of all known storage nodes, updated by heartbeats and pruned
/// by the staleness sweeper. A single `RwLock` guards the table: updates
/// are cheap in-memory map operations, so coarse locking suffices.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, Node>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Insert or update a node on heartbeat. Always sets `last_heartbeat`
    /// to now before returning.
    pub fn upsert(
        &mut self,
        node_id: String,
        host: String,
        port: u16,
        free_space: u64,
        inventory: Vec<String>,
    ) {
        self.nodes.insert(
            node_id.clone(),
            Node {
                node_id,
                host,
                port,
                free_space,
                inventory,
                last_heartbeat: Instant::now(),
            },
        );
    }

    /// Remove every node whose last heartbeat is older than `max_age`.
    /// Returns the removed node IDs for logging.
    pub fn remove_stale(&mut self, max_age: Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .nodes
            .values()
            .filter(|n| !n.is_live(max_age))
            .map(|n| n.node_id.clone())
            .collect();

        for id in &stale {
            self.nodes.remove(id);
        }

        stale
    }

    /// Snapshot of every live node. Each returned `Node` is a full clone
    /// so its fields are mutually consistent with the moment of the call.
    pub fn live_nodes(&self, accepted_delay: Duration) -> Vec<Node> {
        self.nodes
            .values()
            .filter(|n| n.is_live(accepted_delay))
            .cloned()
            .collect()
    }

    /// Point lookup by node ID, regardless of liveness.
    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Total node count, live or not. Used for NODE_INFO error detection.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> (String, String, u16, u64, Vec<String>) {
        (id.into(), "127.0.0.1".into(), 9100, 1_000_000, vec![])
    }

    #[test]
    fn upsert_then_lookup() {
        let mut reg = NodeRegistry::new();
        let (id, host, port, free, inv) = node("n1");
        reg.upsert(id.clone(), host, port, free, inv);

        assert_eq!(reg.len(), 1);
        assert!(reg.node_by_id(&id).is_some());
    }

    #[test]
    fn upsert_updates_existing() {
        let mut reg = NodeRegistry::new();
        let (id, host, port, _, inv) = node("n1");
        reg.upsert(id.clone(), host.clone(), port, 100, inv.clone());
        reg.upsert(id.clone(), host, port, 200, inv);

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.node_by_id(&id).unwrap().free_space, 200);
    }

    #[test]
    fn live_nodes_excludes_stale() {
        let mut reg = NodeRegistry::new();
        let (id, host, port, free, inv) = node("n1");
        reg.upsert(id, host, port, free, inv);

        // Backdate the heartbeat past the accepted delay.
        let n = reg.nodes.get_mut("n1").unwrap();
        n.last_heartbeat = Instant::now() - Duration::from_secs(100);

        assert!(reg.live_nodes(Duration::from_secs(15)).is_empty());
        assert_eq!(reg.live_nodes(Duration::from_secs(200)).len(), 1);
    }

    #[test]
    fn remove_stale_prunes_and_reports() {
        let mut reg = NodeRegistry::new();
        let (id, host, port, free, inv) = node("n1");
        reg.upsert(id.clone(), host, port, free, inv);
        reg.nodes.get_mut("n1").unwrap().last_heartbeat =
            Instant::now() - Duration::from_secs(100);

        let removed = reg.remove_stale(Duration::from_secs(15));
        assert_eq!(removed, vec![id]);
        assert!(reg.is_empty());
    }

    #[test]
    fn remove_stale_keeps_fresh_nodes() {
        let mut reg = NodeRegistry::new();
        let (id, host, port, free, inv) = node("n1");
        reg.upsert(id, host, port, free, inv);

        let removed = reg.remove_stale(Duration::from_secs(15));
        assert!(removed.is_empty());
        assert_eq!(reg.len(), 1);
    }
}
