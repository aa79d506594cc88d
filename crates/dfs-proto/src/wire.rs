// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed request/response envelopes carried over [`crate::frame::MessageChannel`].
//!
//! Three link types share this crate's framing but carry distinct envelope
//! types: client<->controller (`ClientMessage`/`ControllerMessage`),
//! node->controller (`NodeMessage`), and client<->node (`StorageMessage`).

use crate::checksum::Digest;
use serde::{Deserialize, Serialize};

/// Status codes returned in controller responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Ok,
    FileAlreadyExists,
    FileNotFound,
    NoNodesAvailable,
    Error,
}

/// One storage node holding a replica, as advertised to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageNodeInfo {
    pub storage_node_id: String,
    pub host: String,
    pub port: u16,
}

/// Placement/layout of one fragment: its id, size, and replica set in
/// client-try order (primary first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentInfo {
    pub fragment_id: String,
    pub size: u64,
    pub storage_nodes: Vec<StorageNodeInfo>,
}

/// One entry of a `NodeStats` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatsEntry {
    pub node_id: String,
    pub free_space: u64,
}

/// Client -> controller requests. One per connection; the controller
/// closes (or lets the peer close) the connection after responding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum ClientMessage {
    /// Request a placement plan for a new file.
    Put {
        filename: String,
        filesize: u64,
        /// `None` means "use the controller's configured default chunk size".
        chunk_size: Option<u64>,
    },
    /// Request the fragment layout of an existing file.
    Get { filename: String },
    /// Reserved: declared in the wire schema, not implemented.
    Delete { filename: String },
    /// List all file names present in the index.
    Ls,
    /// Request a snapshot of live node statistics.
    NodeStats,
}

/// Controller -> client responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum ControllerMessage {
    Plan {
        status_code: StatusCode,
        total_num_fragments: u32,
        fragment_layout: Vec<FragmentInfo>,
    },
    FragLayout {
        status_code: StatusCode,
        total_num_fragments: u32,
        fragment_layout: Vec<FragmentInfo>,
    },
    Ls {
        status_code: StatusCode,
        file_names: Vec<String>,
    },
    NodeStats {
        status_code: StatusCode,
        active_nodes: Vec<NodeStatsEntry>,
    },
    /// Reserved: declared in the wire schema, not implemented.
    Delete { status_code: StatusCode },
}

/// Storage node -> controller heartbeat. Sent on a cadence of at most
/// `HEARTBEAT_INTERVAL` seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMessage {
    pub node_id: String,
    pub host: String,
    pub port: u16,
    pub free_space: u64,
    pub inventory: Vec<String>,
}

/// Controller's acknowledgement of a heartbeat. Carries nothing today but
/// keeps the node<->controller link request/response-shaped like the
/// others rather than fire-and-forget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAck;

/// Client <-> storage node messages: fragment PUT/GET.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum StorageMessage {
    PutFragment {
        fragment_id: String,
        bytes: Vec<u8>,
        md5: Digest,
    },
    GetFragment {
        fragment_id: String,
    },
}

/// Storage node's reply to a [`StorageMessage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum StorageResponse {
    PutAck,
    FragmentData { bytes: Vec<u8>, md5: Digest },
    NotFound,
    ChecksumMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_roundtrips_through_json() {
        let msg = ClientMessage::Put {
            filename: "a.bin".into(),
            filesize: 300_000_000,
            chunk_size: Some(128_000_000),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        match back {
            ClientMessage::Put {
                filename, filesize, ..
            } => {
                assert_eq!(filename, "a.bin");
                assert_eq!(filesize, 300_000_000);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn controller_message_tags_are_stable() {
        let msg = ControllerMessage::Ls {
            status_code: StatusCode::Ok,
            file_names: vec!["a.bin".into()],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"op\":\"Ls\""));
    }

    #[test]
    fn storage_message_carries_digest() {
        let digest = Digest::of(b"payload");
        let msg = StorageMessage::PutFragment {
            fragment_id: "a.bin_0".into(),
            bytes: b"payload".to_vec(),
            md5: digest,
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: StorageMessage = serde_json::from_str(&json).unwrap();
        match back {
            StorageMessage::PutFragment { md5, .. } => assert_eq!(md5, digest),
            _ => panic!("wrong variant"),
        }
    }
}
