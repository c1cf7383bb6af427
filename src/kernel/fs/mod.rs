// src/kernel/fs/mod.rs
//! Filesystem views and IPC file descriptors
//!
//! A file descriptor is one of three kinds — see [`FdHandle`] — shared
//! by reference count so `dup` and `fork` alias the same backing offset
//! or pipe. There is deliberately no single `FileDescriptor` trait here:
//! the filesystem/terminal kinds are synchronous, while a pipe's
//! read/write are suspension points that hand a continuation to a
//! [`crate::kernel::sync::BoundedBuffer`] instead of returning a value
//! directly, so a uniform synchronous trait method would not fit all
//! three.

pub mod blockio;
pub mod node;
pub mod path;
pub mod pipe;
#[cfg(test)]
pub mod ramdisk;

use alloc::sync::Arc;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use node::Node;
use pipe::PipeEnd;

/// Result type for file operations.
pub type FileResult<T> = Result<T, FileError>;

/// File operation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileError {
    /// Operation not supported on this kind of descriptor.
    NotImplemented,
    /// The pipe's write end has closed.
    BrokenPipe,
    /// Would block; only relevant to non-suspending callers.
    WouldBlock,
    /// Bad arguments (path, offset, fd kind, etc).
    InvalidInput,
    /// Anything else.
    Other,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NotImplemented => "operation not implemented for this descriptor",
            Self::BrokenPipe => "broken pipe",
            Self::WouldBlock => "operation would block",
            Self::InvalidInput => "invalid argument",
            Self::Other => "I/O error",
        };
        f.write_str(msg)
    }
}

/// A filesystem read view: a node plus a shared, atomically-advanced
/// byte offset.
///
/// The offset is `Arc`-shared (not owned) so that `dup` and `fork`
/// produce a second handle advancing the *same* cursor rather than an
/// independent one.
#[derive(Clone)]
pub struct FsView {
    pub node: Arc<dyn Node>,
    offset: Arc<AtomicUsize>,
}

impl FsView {
    /// Opens a fresh view of `node` at offset 0.
    #[must_use]
    pub fn new(node: Arc<dyn Node>) -> Self {
        Self { node, offset: Arc::new(AtomicUsize::new(0)) }
    }

    /// Reads up to `buf.len()` bytes, advancing the shared offset by the
    /// number of bytes actually read.
    pub fn read(&self, buf: &mut [u8]) -> FileResult<usize> {
        let offset = self.offset.load(Ordering::Relaxed);
        let n = self.node.read_all(offset, buf)?;
        self.offset.fetch_add(n, Ordering::Relaxed);
        Ok(n)
    }

    /// File size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.node.size_in_bytes()
    }
}

/// A file descriptor, tagged by which of the three kinds it is.
///
/// Cloning an `FdHandle` is exactly what `dup`/`fork` do: it aliases the
/// same shared offset or pipe end rather than duplicating state.
#[derive(Clone)]
pub enum FdHandle {
    /// A read-only view into the filesystem.
    File(FsView),
    /// A writable sink with no backing node (stdout/stderr-equivalent).
    Terminal,
    /// One end of a pipe.
    Pipe(PipeEnd),
}

impl FdHandle {
    /// Whether this handle may be the target of a `write` syscall.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        match self {
            Self::File(_) => false,
            Self::Terminal => true,
            Self::Pipe(end) => end.is_writer(),
        }
    }

    /// File size, for the `len` syscall. Invalid on pipe ends.
    pub fn len(&self) -> FileResult<usize> {
        match self {
            Self::File(view) => Ok(view.len()),
            Self::Terminal | Self::Pipe(_) => Err(FileError::InvalidInput),
        }
    }
}
