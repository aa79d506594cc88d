// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Inverted index: `fileName -> fragmentId -> {node}`.
//!
//! Rebuilt periodically from a registry snapshot and
//! atomically swapped so readers never observe a partially-rebuilt index.
//! PUT/GET/LIST also query a freshly-built snapshot on demand rather than
//! waiting for the next scheduled rebuild, so a file written a moment ago
//! is immediately visible.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dfs_proto::parse_fragment_id;

use crate::registry::Node;

/// `fragment id -> node ids holding a replica`.
pub type FragmentHolders = HashMap<String, Vec<String>>;

/// `file name -> fragment id -> holders`.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    files: HashMap<String, FragmentHolders>,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a registry snapshot's declared inventories.
    pub fn build(nodes: &[Node]) -> Self {
        let mut files: HashMap<String, FragmentHolders> = HashMap::new();

        for node in nodes {
            for fragment_id in &node.inventory {
                let Some((file_name, _index)) = parse_fragment_id(fragment_id) else {
                    continue;
                };

                files
                    .entry(file_name.to_string())
                    .or_default()
                    .entry(fragment_id.clone())
                    .or_default()
                    .push(node.node_id.clone());
            }
        }

        Self { files }
    }

    pub fn file_exists(&self, file_name: &str) -> bool {
        self.files.contains_key(file_name)
    }

    pub fn fragments_of(&self, file_name: &str) -> Option<&FragmentHolders> {
        self.files.get(file_name)
    }

    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn holders_of(&self, file_name: &str, fragment_id: &str) -> Option<&[String]> {
        self.files
            .get(file_name)
            .and_then(|fragments| fragments.get(fragment_id))
            .map(|v| v.as_slice())
    }
}

/// Hot-swappable handle shared by the sweeper's rebuild task and the
/// router's on-demand queries.
#[derive(Debug)]
pub struct IndexHandle {
    current: ArcSwap<FileIndex>,
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self {
            current: ArcSwap::from_pointee(FileIndex::new()),
        }
    }
}

impl IndexHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Arc<FileIndex> {
        self.current.load_full()
    }

    /// Rebuild from a registry snapshot and swap it in atomically.
    pub fn rebuild(&self, nodes: &[Node]) {
        self.current.store(Arc::new(FileIndex::build(nodes)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn node(id: &str, inventory: &[&str]) -> Node {
        Node {
            node_id: id.into(),
            host: "127.0.0.1".into(),
            port: 9100,
            free_space: 1_000,
            inventory: inventory.iter().map(|s| s.to_string()).collect(),
            last_heartbeat: Instant::now(),
        }
    }

    #[test]
    fn build_groups_fragments_by_file() {
        let nodes = vec![
            node("n1", &["a.bin_0", "a.bin_1"]),
            node("n2", &["a.bin_0"]),
        ];
        let index = FileIndex::build(&nodes);

        assert!(index.file_exists("a.bin"));
        let fragments = index.fragments_of("a.bin").unwrap();
        assert_eq!(fragments.len(), 2);

        let mut holders_0 = fragments["a.bin_0"].clone();
        holders_0.sort();
        assert_eq!(holders_0, vec!["n1".to_string(), "n2".to_string()]);
        assert_eq!(fragments["a.bin_1"], vec!["n1".to_string()]);
    }

    #[test]
    fn build_ignores_malformed_fragment_ids() {
        let nodes = vec![node("n1", &["not-a-fragment-id"])];
        let index = FileIndex::build(&nodes);
        assert!(index.file_names().is_empty());
    }

    #[test]
    fn handle_swap_is_visible_to_subsequent_loads() {
        let handle = IndexHandle::new();
        assert!(!handle.load().file_exists("a.bin"));

        handle.rebuild(&[node("n1", &["a.bin_0"])]);
        assert!(handle.load().file_exists("a.bin"));
    }

    #[test]
    fn file_names_sorted() {
        let nodes = vec![node("n1", &["b.bin_0", "a.bin_0"])];
        let index = FileIndex::build(&nodes);
        assert_eq!(index.file_names(), vec!["a.bin".to_string(), "b.bin".to_string()]);
    }

    #[test]
    fn holders_of_missing_fragment_is_none() {
        let index = FileIndex::build(&[node("n1", &["a.bin_0"])]);
        assert!(index.holders_of("a.bin", "a.bin_9").is_none());
        assert!(index.holders_of("missing.bin", "x_0").is_none());
    }
}
