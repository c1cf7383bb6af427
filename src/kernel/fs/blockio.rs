// src/kernel/fs/blockio.rs
//! Block device contract and MRU front cache
//!
//! The real block device — an ATA/IDE driver — is an external
//! collaborator out of scope here; [`BlockIo`] is the seam a `Node`
//! implementation reads through. [`Cache`] is the 16-entry MRU front
//! end named in the external interfaces section: `contains` moves a hit
//! to the head and returns true; a miss evicts the tail and rewrites it
//! in place.

use crate::constants::FRAME_SIZE as BLOCK_SIZE;
use super::FileResult;

/// A block device: read `n` bytes starting at byte offset `off`.
pub trait BlockIo: Send + Sync {
    /// Reads `buf.len()` bytes starting at byte offset `offset`.
    fn read_all(&self, offset: usize, buf: &mut [u8]) -> FileResult<usize>;
}

const CAPACITY: usize = crate::constants::MRU_QUEUE_CAPACITY;
const SENTINEL: u32 = u32::MAX;

struct Slot {
    id: u32,
    buf: [u8; BLOCK_SIZE],
}

/// Fixed-capacity most-recently-used cache of whole blocks.
///
/// Exactly [`CAPACITY`] slots always exist; unused slots carry the
/// sentinel id `u32::MAX`, which can never name a real block.
pub struct Cache<B: BlockIo> {
    device: B,
    slots: [Slot; CAPACITY],
}

impl<B: BlockIo> Cache<B> {
    /// Wraps `device` with an empty MRU cache.
    pub fn new(device: B) -> Self {
        Self {
            device,
            slots: core::array::from_fn(|_| Slot { id: SENTINEL, buf: [0u8; BLOCK_SIZE] }),
        }
    }

    /// Returns `true` and moves the block to the head if `id` is cached.
    fn contains(&mut self, id: u32) -> bool {
        if let Some(pos) = self.slots.iter().position(|s| s.id == id) {
            self.slots[..=pos].rotate_right(1);
            true
        } else {
            false
        }
    }

    fn add(&mut self, id: u32, buf: [u8; BLOCK_SIZE]) {
        self.slots.rotate_right(1);
        self.slots[0] = Slot { id, buf };
    }

    /// Reads the block containing byte offset `byte_off`, going to the
    /// backing device on a cache miss.
    ///
    /// Held for the whole call under a single spinlock by callers that
    /// share a `Cache` across CPUs; this type itself assumes exclusive
    /// access (wrap in `spin::Mutex<Cache<B>>` to share).
    pub fn read_block(&mut self, block_id: u32) -> FileResult<[u8; BLOCK_SIZE]> {
        if !self.contains(block_id) {
            let mut buf = [0u8; BLOCK_SIZE];
            self.device.read_all(block_id as usize * BLOCK_SIZE, &mut buf)?;
            self.add(block_id, buf);
        }
        Ok(self.slots[0].buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDevice {
        reads: AtomicUsize,
    }

    impl BlockIo for CountingDevice {
        fn read_all(&self, offset: usize, buf: &mut [u8]) -> FileResult<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            buf.fill((offset / BLOCK_SIZE) as u8);
            Ok(buf.len())
        }
    }

    #[test]
    fn hit_avoids_device_read() {
        let mut cache = Cache::new(CountingDevice { reads: AtomicUsize::new(0) });
        cache.read_block(3).unwrap();
        cache.read_block(3).unwrap();
        assert_eq!(cache.device.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn eviction_at_capacity() {
        let mut cache = Cache::new(CountingDevice { reads: AtomicUsize::new(0) });
        for id in 0..CAPACITY as u32 + 1 {
            cache.read_block(id).unwrap();
        }
        // block 0 was evicted by the (CAPACITY+1)th distinct block
        cache.read_block(0).unwrap();
        assert_eq!(cache.device.reads.load(Ordering::SeqCst), CAPACITY + 2);
    }
}
