// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared wire protocol, fragment addressing, and checksum types for the
//! distributed file system: the controller, the client, and storage nodes
//! all depend on this crate rather than on each other.

pub mod checksum;
pub mod fragment;
pub mod frame;
pub mod wire;

pub use checksum::Digest;
pub use fragment::{fragment_count, fragment_id, fragment_size, parse_fragment_id};
pub use frame::{FrameError, MessageChannel};
