// src/kernel/fs/ramdisk.rs
//! In-memory `Node` fixture for tests
//!
//! Stands in for the real ext2-over-IDE-over-MRU-cache stack named in
//! the external interfaces, so the loader, path resolution, and syscall
//! dispatcher can be exercised without a disk image.

#![cfg(test)]

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use super::node::Node;
use super::{FileError, FileResult};

/// An in-memory file backed by an owned byte buffer.
pub struct RamFile {
    data: Vec<u8>,
}

impl Node for RamFile {
    fn is_file(&self) -> bool {
        true
    }

    fn is_dir(&self) -> bool {
        false
    }

    fn size_in_bytes(&self) -> usize {
        self.data.len()
    }

    fn read_all(&self, offset: usize, buf: &mut [u8]) -> FileResult<usize> {
        if offset > self.data.len() {
            return Ok(0);
        }
        let available = &self.data[offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }

    fn find(&self, _name: &str) -> FileResult<Arc<dyn Node>> {
        Err(FileError::InvalidInput)
    }
}

/// An in-memory directory backed by a name/child association list.
pub struct RamDir {
    entries: Vec<(String, Arc<dyn Node>)>,
}

impl Node for RamDir {
    fn is_file(&self) -> bool {
        false
    }

    fn is_dir(&self) -> bool {
        true
    }

    fn size_in_bytes(&self) -> usize {
        0
    }

    fn read_all(&self, _offset: usize, _buf: &mut [u8]) -> FileResult<usize> {
        Err(FileError::InvalidInput)
    }

    fn find(&self, name: &str) -> FileResult<Arc<dyn Node>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node.clone())
            .ok_or(FileError::InvalidInput)
    }
}

/// Builds a ram-backed file from its contents.
pub fn file(contents: &[u8]) -> RamFile {
    RamFile { data: contents.to_vec() }
}

/// Builds a ram-backed directory from its entries.
pub fn dir(entries: Vec<(String, Arc<dyn Node>)>) -> RamDir {
    RamDir { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_reads_with_offset() {
        let f = file(b"hello world");
        let mut buf = [0u8; 5];
        assert_eq!(f.read_all(6, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn file_read_past_end_is_short() {
        let f = file(b"hi");
        let mut buf = [0u8; 8];
        assert_eq!(f.read_all(0, &mut buf).unwrap(), 2);
        assert_eq!(f.read_all(5, &mut buf).unwrap(), 0);
    }
}
