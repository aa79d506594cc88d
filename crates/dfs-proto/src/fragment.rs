// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fragment addressing: naming, fixed-stride slicing, and ordering.
//!
//! A file of `fileSize` bytes sliced with `chunkSize` is split into
//! `ceil(fileSize/chunkSize)` fragments named `<fileName>_<index>`. Every
//! fragment but the last is exactly `chunkSize` bytes; the last is sized to
//! the remainder.

/// Number of fragments `ceil(file_size / chunk_size)` produces for a file.
///
/// `chunk_size` of zero or `file_size` of zero both yield zero fragments.
pub fn fragment_count(file_size: u64, chunk_size: u64) -> u32 {
    if chunk_size == 0 || file_size == 0 {
        return 0;
    }
    file_size.div_ceil(chunk_size) as u32
}

/// Byte length of fragment `index` out of `count` fragments for a file of
/// `file_size` bytes sliced at `chunk_size`.
///
/// Panics if `index >= count`; callers only ever call this in a loop bounded
/// by [`fragment_count`].
pub fn fragment_size(index: u32, file_size: u64, chunk_size: u64, count: u32) -> u64 {
    assert!(index < count, "fragment index {index} out of range {count}");
    if index + 1 == count {
        file_size - (u64::from(count) - 1) * chunk_size
    } else {
        chunk_size
    }
}

/// Byte offset of fragment `index` within the file.
pub fn fragment_offset(index: u32, chunk_size: u64) -> u64 {
    u64::from(index) * chunk_size
}

/// Build the deterministic name `<file_name>_<index>` for a fragment.
pub fn fragment_id(file_name: &str, index: u32) -> String {
    format!("{file_name}_{index}")
}

/// Split a fragment id on its last underscore into `(file_name, index)`.
///
/// Returns `None` if there is no underscore or the trailing token does not
/// parse as a non-negative integer.
pub fn parse_fragment_id(id: &str) -> Option<(&str, u32)> {
    let pos = id.rfind('_')?;
    let (name, rest) = (&id[..pos], &id[pos + 1..]);
    let index: u32 = rest.parse().ok()?;
    Some((name, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_exact_multiple() {
        assert_eq!(fragment_count(256, 128), 2);
    }

    #[test]
    fn count_with_remainder() {
        assert_eq!(fragment_count(300, 128), 3);
    }

    #[test]
    fn count_zero_chunk_is_zero() {
        assert_eq!(fragment_count(100, 0), 0);
    }

    #[test]
    fn sizes_partition_file() {
        let file_size = 300;
        let chunk_size = 128;
        let count = fragment_count(file_size, chunk_size);
        let total: u64 = (0..count)
            .map(|i| fragment_size(i, file_size, chunk_size, count))
            .sum();
        assert_eq!(total, file_size);
        assert_eq!(fragment_size(2, file_size, chunk_size, count), 44);
    }

    #[test]
    fn offsets_are_contiguous() {
        assert_eq!(fragment_offset(0, 128), 0);
        assert_eq!(fragment_offset(1, 128), 128);
        assert_eq!(fragment_offset(2, 128), 256);
    }

    #[test]
    fn id_roundtrip() {
        let id = fragment_id("a.bin", 7);
        assert_eq!(id, "a.bin_7");
        assert_eq!(parse_fragment_id(&id), Some(("a.bin", 7)));
    }

    #[test]
    fn id_with_underscore_in_filename() {
        let id = fragment_id("my_file.bin", 3);
        assert_eq!(parse_fragment_id(&id), Some(("my_file.bin", 3)));
    }

    #[test]
    fn parse_rejects_non_numeric_suffix() {
        assert_eq!(parse_fragment_id("a.bin_x"), None);
        assert_eq!(parse_fragment_id("noindex"), None);
    }
}
