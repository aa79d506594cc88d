// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory fragment storage.
//!
//! Deliberately minimal: no on-disk layout, no persistence across
//! restarts, no peer-to-peer replication gossip.

use std::collections::HashMap;
use std::sync::RwLock;

use dfs_proto::Digest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    ChecksumMismatch,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
        }
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug, Default)]
pub struct FragmentStore {
    fragments: RwLock<HashMap<String, (Vec<u8>, Digest)>>,
}

impl FragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fragment after verifying its digest against the bytes
    /// received.
    pub fn put(&self, fragment_id: String, bytes: Vec<u8>, claimed: Digest) -> Result<(), StoreError> {
        let actual = Digest::of(&bytes);
        if actual != claimed {
            return Err(StoreError::ChecksumMismatch);
        }

        self.fragments
            .write()
            .expect("store lock poisoned")
            .insert(fragment_id, (bytes, actual));
        Ok(())
    }

    pub fn get(&self, fragment_id: &str) -> Option<(Vec<u8>, Digest)> {
        self.fragments
            .read()
            .expect("store lock poisoned")
            .get(fragment_id)
            .cloned()
    }

    /// Fragment ids currently held, for the next heartbeat's inventory.
    pub fn inventory(&self) -> Vec<String> {
        self.fragments
            .read()
            .expect("store lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let store = FragmentStore::new();
        let digest = Digest::of(b"payload");
        store.put("a.bin_0".into(), b"payload".to_vec(), digest).unwrap();

        let (bytes, stored_digest) = store.get("a.bin_0").unwrap();
        assert_eq!(bytes, b"payload");
        assert_eq!(stored_digest, digest);
    }

    #[test]
    fn put_rejects_checksum_mismatch() {
        let store = FragmentStore::new();
        let wrong_digest = Digest::of(b"other");
        let result = store.put("a.bin_0".into(), b"payload".to_vec(), wrong_digest);
        assert_eq!(result, Err(StoreError::ChecksumMismatch));
    }

    #[test]
    fn get_missing_fragment_is_none() {
        let store = FragmentStore::new();
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn inventory_reflects_stored_fragments() {
        let store = FragmentStore::new();
        store
            .put("a.bin_0".into(), b"x".to_vec(), Digest::of(b"x"))
            .unwrap();
        store
            .put("a.bin_1".into(), b"y".to_vec(), Digest::of(b"y"))
            .unwrap();

        let mut inventory = store.inventory();
        inventory.sort();
        assert_eq!(inventory, vec!["a.bin_0".to_string(), "a.bin_1".to_string()]);
    }
}
