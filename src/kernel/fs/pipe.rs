// src/kernel/fs/pipe.rs
//! Pipes
//!
//! A pipe is just a [`BoundedBuffer<u8>`] shared between two
//! [`PipeEnd`] handles. `write`/`read` are suspension points, not
//! synchronous calls: the syscall dispatcher hands the buffer's
//! `put`/`get` a continuation that resumes the caller once a byte has
//! actually moved. Per the historical one-byte-per-call behavior user
//! programs depend on, a single `write`/`read` syscall always moves
//! exactly one byte regardless of the requested count.

use alloc::boxed::Box;
use alloc::sync::Arc;

use crate::constants::PIPE_CAPACITY;
use crate::kernel::sync::BoundedBuffer;

/// One end of a pipe: readable xor writable, sharing the same
/// [`BoundedBuffer`] as its sibling.
#[derive(Clone)]
pub enum PipeEnd {
    /// The read end.
    Reader(Arc<BoundedBuffer<u8>>),
    /// The write end.
    Writer(Arc<BoundedBuffer<u8>>),
}

impl PipeEnd {
    /// Whether this end accepts `write`.
    #[must_use]
    pub fn is_writer(&self) -> bool {
        matches!(self, Self::Writer(_))
    }

    /// The shared buffer backing this end, for use with `put`/`get`.
    #[must_use]
    pub fn buffer(&self) -> &Arc<BoundedBuffer<u8>> {
        match self {
            Self::Reader(b) | Self::Writer(b) => b,
        }
    }

    /// Writes exactly one byte from `buf[0]`, resuming `k` with `1` once
    /// the byte has been enqueued. `buf` must be non-empty; callers with
    /// `count == 0` must short-circuit before reaching here.
    ///
    /// # Panics
    /// Panics if called on a [`PipeEnd::Reader`].
    pub fn write_one(&self, byte: u8, k: Box<dyn FnOnce(i64) + Send>) {
        let Self::Writer(buf) = self else {
            panic!("write_one called on a pipe reader");
        };
        buf.put(byte, Box::new(move || k(1)));
    }

    /// Reads exactly one byte, resuming `k` with `(byte, 1)` once it has
    /// been dequeued.
    ///
    /// # Panics
    /// Panics if called on a [`PipeEnd::Writer`].
    pub fn read_one(&self, k: Box<dyn FnOnce(u8, i64) + Send>) {
        let Self::Reader(buf) = self else {
            panic!("read_one called on a pipe writer");
        };
        buf.get(Box::new(move |byte| k(byte, 1)));
    }
}

/// Creates a fresh pipe, returning `(reader, writer)`.
#[must_use]
pub fn new_pipe() -> (PipeEnd, PipeEnd) {
    let buffer = Arc::new(BoundedBuffer::new(PIPE_CAPACITY));
    (PipeEnd::Reader(buffer.clone()), PipeEnd::Writer(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::scheduler;
    use alloc::sync::Arc as StdArc;
    use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

    #[test]
    fn one_byte_per_call_round_trips_in_order() {
        let (reader, writer) = new_pipe();
        for b in [b'h', b'i'] {
            writer.write_one(b, Box::new(|n| assert_eq!(n, 1)));
        }
        scheduler::run_ready();

        let seen = StdArc::new(AtomicU8::new(0));
        let s = seen.clone();
        reader.read_one(Box::new(move |byte, n| {
            assert_eq!(n, 1);
            s.store(byte, Ordering::SeqCst);
        }));
        scheduler::run_ready();
        assert_eq!(seen.load(Ordering::SeqCst), b'h');
    }

    #[test]
    fn reader_blocks_until_a_byte_arrives() {
        let (reader, writer) = new_pipe();
        let got = StdArc::new(AtomicUsize::new(usize::MAX));
        let g = got.clone();
        reader.read_one(Box::new(move |byte, _| g.store(byte as usize, Ordering::SeqCst)));
        scheduler::run_ready();
        assert_eq!(got.load(Ordering::SeqCst), usize::MAX, "no data yet: read must still be parked");

        writer.write_one(42, Box::new(|_| {}));
        scheduler::run_ready();
        assert_eq!(got.load(Ordering::SeqCst), 42);
    }
}
