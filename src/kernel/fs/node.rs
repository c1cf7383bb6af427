// src/kernel/fs/node.rs
//! Read-only filesystem node interface
//!
//! The real backing store — an ext2 reader over an ATA/IDE block device,
//! fronted by an MRU block cache — is an external collaborator out of
//! scope here. `Node` is the seam: anything that can answer these four
//! questions can stand in for a file or directory.

use alloc::string::String;
use alloc::sync::Arc;

use super::{FileError, FileResult};

/// A read-only file or directory entry.
pub trait Node: Send + Sync {
    /// Whether this node is a regular file.
    fn is_file(&self) -> bool;

    /// Whether this node is a directory.
    fn is_dir(&self) -> bool;

    /// Total size in bytes. Meaningless for directories.
    fn size_in_bytes(&self) -> usize;

    /// Reads up to `buf.len()` bytes starting at `offset`, returning the
    /// number of bytes actually copied (short at end of file).
    fn read_all(&self, offset: usize, buf: &mut [u8]) -> FileResult<usize>;

    /// Looks up a child entry by name. Only meaningful on directories.
    fn find(&self, name: &str) -> FileResult<Arc<dyn Node>>;
}

/// Reads a single little-endian `u32` at `offset`.
///
/// Convenience built on [`Node::read_all`], mirroring the original's
/// generic `read<T>(off, T&)` helper without needing unsized generics
/// over a trait object.
pub fn read_u32(node: &dyn Node, offset: usize) -> FileResult<u32> {
    let mut buf = [0u8; 4];
    let n = node.read_all(offset, &mut buf)?;
    if n != 4 {
        return Err(FileError::InvalidInput);
    }
    Ok(u32::from_le_bytes(buf))
}

/// An owned path name, split on `/`.
#[must_use]
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Node name paired with its resolved entry, used by directory listings
/// in the ramdisk test fixture.
pub struct NamedNode {
    pub name: String,
    pub node: Arc<dyn Node>,
}
