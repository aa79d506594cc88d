// SPDX-License-Identifier: Apache-2.0 OR MIT

//! MD5 checksums for whole files and fragments.
//!
//! The controller never sees raw bytes or digests; this type exists purely
//! to pin wire compatibility between clients and storage nodes.

use md5::{Digest as _, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 16-byte MD5 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest(pub [u8; 16]);

impl Digest {
    /// Compute the MD5 digest of a byte slice.
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Md5::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        let digest = Digest::of(b"");
        assert_eq!(digest.to_string(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn differs_by_content() {
        assert_ne!(Digest::of(b"a"), Digest::of(b"b"));
    }

    #[test]
    fn same_bytes_same_digest() {
        assert_eq!(Digest::of(b"hello world"), Digest::of(b"hello world"));
    }
}
