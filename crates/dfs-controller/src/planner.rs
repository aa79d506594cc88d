// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Placement planner: assigns each fragment of a new file to a replica
//! set of distinct live nodes.
//!
//! Policy: round-robin over live nodes sorted by node ID, starting at a
//! per-fragment offset, so fragments spread evenly across the fleet and
//! replicas within a fragment are always distinct. Weighting node choice
//! by `free_space` would be a stronger policy; not implemented here.

use crate::registry::Node;
use dfs_proto::{fragment_count, fragment_id, fragment_size};

/// One fragment's placement: its id, size, and ordered replica set
/// (primary first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentPlacement {
    pub fragment_id: String,
    pub size: u64,
    pub replicas: Vec<String>,
}

/// A full placement plan for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub fragments: Vec<FragmentPlacement>,
}

/// Planner failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerError {
    NoNodesAvailable,
}

/// Produce a deterministic placement plan for a new file.
///
/// `live_nodes` need not be pre-sorted; the planner sorts its own copy by
/// node ID so that repeated calls against an unchanged snapshot are
/// idempotent regardless of map iteration order.
pub fn plan_placement(
    file_name: &str,
    file_size: u64,
    chunk_size: u64,
    live_nodes: &[Node],
    replication_factor: usize,
) -> Result<Plan, PlannerError> {
    if live_nodes.is_empty() {
        return Err(PlannerError::NoNodesAvailable);
    }

    let mut sorted: Vec<&Node> = live_nodes.iter().collect();
    sorted.sort_by(|a, b| a.node_id.cmp(&b.node_id));

    let count = fragment_count(file_size, chunk_size);
    let replicas_per_fragment = replication_factor.min(sorted.len());

    let mut fragments = Vec::with_capacity(count as usize);
    for index in 0..count {
        let size = fragment_size(index, file_size, chunk_size, count);
        let offset = index as usize % sorted.len();
        let replicas: Vec<String> = (0..replicas_per_fragment)
            .map(|j| sorted[(offset + j) % sorted.len()].node_id.clone())
            .collect();

        fragments.push(FragmentPlacement {
            fragment_id: fragment_id(file_name, index),
            size,
            replicas,
        });
    }

    Ok(Plan { fragments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn node(id: &str) -> Node {
        Node {
            node_id: id.into(),
            host: "127.0.0.1".into(),
            port: 9100,
            free_space: 10_000_000_000,
            inventory: vec![],
            last_heartbeat: Instant::now(),
        }
    }

    #[test]
    fn single_node_single_fragment_e1() {
        let nodes = vec![node("n1")];
        let plan = plan_placement("a.bin", 300_000_000, 128_000_000, &nodes, 3).unwrap();

        assert_eq!(plan.fragments.len(), 3);
        assert_eq!(plan.fragments[0].fragment_id, "a.bin_0");
        assert_eq!(plan.fragments[0].size, 128_000_000);
        assert_eq!(plan.fragments[1].size, 128_000_000);
        assert_eq!(plan.fragments[2].size, 44_000_000);
        for f in &plan.fragments {
            assert_eq!(f.replicas, vec!["n1".to_string()]);
        }
    }

    #[test]
    fn replication_with_four_nodes_e2() {
        let nodes = vec![node("n1"), node("n2"), node("n3"), node("n4")];
        let plan = plan_placement("b.bin", 256_000_000, 128_000_000, &nodes, 3).unwrap();

        assert_eq!(plan.fragments.len(), 2);
        for f in &plan.fragments {
            assert_eq!(f.replicas.len(), 3);
            let unique: std::collections::HashSet<_> = f.replicas.iter().collect();
            assert_eq!(unique.len(), 3);
            for r in &f.replicas {
                assert!(["n1", "n2", "n3", "n4"].contains(&r.as_str()));
            }
        }
    }

    #[test]
    fn fewer_live_nodes_than_replication_factor() {
        let nodes = vec![node("n1"), node("n2")];
        let plan = plan_placement("c.bin", 10, 10, &nodes, 3).unwrap();

        assert_eq!(plan.fragments[0].replicas.len(), 2);
    }

    #[test]
    fn no_nodes_fails() {
        let result = plan_placement("x", 10, 10, &[], 3);
        assert_eq!(result, Err(PlannerError::NoNodesAvailable));
    }

    #[test]
    fn is_idempotent_for_same_snapshot() {
        let nodes = vec![node("n3"), node("n1"), node("n2")];
        let plan1 = plan_placement("d.bin", 300, 100, &nodes, 3).unwrap();
        let plan2 = plan_placement("d.bin", 300, 100, &nodes, 3).unwrap();
        assert_eq!(plan1, plan2);
    }

    #[test]
    fn fragments_are_contiguous_and_gapless() {
        let nodes = vec![node("n1"), node("n2")];
        let plan = plan_placement("e.bin", 1000, 300, &nodes, 2).unwrap();
        let total: u64 = plan.fragments.iter().map(|f| f.size).sum();
        assert_eq!(total, 1000);
        for (i, f) in plan.fragments.iter().enumerate() {
            assert_eq!(f.fragment_id, format!("e.bin_{i}"));
        }
    }
}
