// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Client-side file handling: reading fragment byte ranges out of a
//! source file, computing checksums, and reassembling a downloaded file.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use dfs_proto::Digest;

#[derive(Debug)]
pub enum FileError {
    Io(String),
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(s) => write!(f, "I/O error: {s}"),
        }
    }
}

impl std::error::Error for FileError {}

impl From<std::io::Error> for FileError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// A local file the client is about to PUT.
pub struct SourceFile {
    path: PathBuf,
    size: u64,
}

impl SourceFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FileError> {
        let path = path.into();
        let size = std::fs::metadata(&path)?.len();
        Ok(Self { path, size })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Read the byte range for one fragment and checksum it. The last
    /// fragment's range is measured from the end of the file so that any
    /// rounding in the planner's size split still reads exactly to EOF.
    pub fn read_fragment(&self, offset: u64, size: u64) -> Result<(Vec<u8>, Digest), FileError> {
        let mut file = std::fs::File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; size as usize];
        file.read_exact(&mut buffer)?;

        let digest = Digest::of(&buffer);
        Ok((buffer, digest))
    }
}

/// Reassembles downloaded fragments into a file on disk, in fragment-index
/// order.
pub struct FileAssembler {
    out_path: PathBuf,
    fragments: Vec<Option<Vec<u8>>>,
}

impl FileAssembler {
    pub fn new(out_dir: impl AsRef<Path>, file_name: &str, total_fragments: usize) -> Self {
        Self {
            out_path: out_dir.as_ref().join(file_name),
            fragments: vec![None; total_fragments],
        }
    }

    pub fn place(&mut self, index: usize, bytes: Vec<u8>) {
        if index < self.fragments.len() {
            self.fragments[index] = Some(bytes);
        }
    }

    pub fn missing_count(&self) -> usize {
        self.fragments.iter().filter(|f| f.is_none()).count()
    }

    /// Write the file to disk. Fails if any fragment was never placed.
    pub fn write(&self) -> Result<Digest, FileError> {
        if self.missing_count() > 0 {
            return Err(FileError::Io(format!(
                "{} fragment(s) missing, cannot reassemble",
                self.missing_count()
            )));
        }

        let mut file = std::fs::File::create(&self.out_path)?;
        let mut whole = Vec::new();
        for frag in &self.fragments {
            let bytes = frag.as_ref().expect("checked above");
            whole.extend_from_slice(bytes);
        }
        file.write_all(&whole)?;
        file.flush()?;

        Ok(Digest::of(&whole))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn read_fragment_returns_expected_slice_and_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello world")
            .unwrap();

        let source = SourceFile::open(&path).unwrap();
        assert_eq!(source.size(), 11);

        let (bytes, digest) = source.read_fragment(0, 5).unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(digest, Digest::of(b"hello"));
    }

    #[test]
    fn file_name_strips_directory() {
        let source = SourceFile {
            path: PathBuf::from("/a/b/c.bin"),
            size: 0,
        };
        assert_eq!(source.file_name(), "c.bin");
    }

    #[test]
    fn assembler_rejects_write_with_missing_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = FileAssembler::new(dir.path(), "out.bin", 2);
        assert!(assembler.write().is_err());
    }

    #[test]
    fn assembler_writes_fragments_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut assembler = FileAssembler::new(dir.path(), "out.bin", 2);
        assembler.place(1, b"world".to_vec());
        assembler.place(0, b"hello".to_vec());

        let digest = assembler.write().unwrap();
        let written = std::fs::read(dir.path().join("out.bin")).unwrap();
        assert_eq!(written, b"helloworld");
        assert_eq!(digest, Digest::of(b"helloworld"));
    }
}
