// src/kernel/mm/frame.rs
//! Physical frame allocation
//!
//! Hands out individual 4 KiB physical frames. Frames are tracked with a
//! simple intrusive free list: each free frame's first word stores the
//! index of the next free frame, so freeing never has to allocate.

use super::types::PhysAddr;
use crate::constants::FRAME_SIZE;
use spin::Mutex;

/// A single physical frame number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame(usize);

impl Frame {
    /// Physical address of the start of this frame.
    #[must_use]
    pub const fn addr(self) -> PhysAddr {
        // Safety: frame-aligned by construction (index * FRAME_SIZE).
        unsafe { PhysAddr::new_unchecked(self.0 * FRAME_SIZE) }
    }

    /// Reinterprets a frame-aligned physical address as a `Frame`.
    ///
    /// Used to rebuild a `Frame` handle from a raw page-table entry; does
    /// not check that the frame is actually owned by any allocator.
    #[must_use]
    pub const fn from_addr(addr: PhysAddr) -> Self {
        Self(addr.as_usize() / FRAME_SIZE)
    }
}

/// Errors returned by the frame allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// No free frames remain.
    OutOfMemory,
    /// The address passed to `free` does not belong to the managed region.
    NotManaged,
}

struct FreeList {
    /// Base physical address of the managed region.
    base: usize,
    /// Total number of frames under management.
    total: usize,
    /// Index of the first free frame, or `None` if the list is exhausted.
    head: Option<usize>,
    free_count: usize,
}

impl FreeList {
    const fn empty() -> Self {
        Self { base: 0, total: 0, head: None, free_count: 0 }
    }

    /// # Safety
    /// `base..base + total * FRAME_SIZE` must be unused, writable physical
    /// memory for the lifetime of the allocator.
    unsafe fn init(&mut self, base: usize, total: usize) {
        self.base = base;
        self.total = total;
        self.free_count = total;
        self.head = if total == 0 { None } else { Some(0) };
        for i in 0..total {
            let next = if i + 1 < total { i + 1 } else { usize::MAX };
            // Safety: each frame is distinct, unused memory handed to us by
            // the caller's contract above.
            unsafe {
                let slot = (base + i * FRAME_SIZE) as *mut usize;
                slot.write_volatile(next);
            }
        }
    }

    fn allocate(&mut self) -> Result<Frame, FrameError> {
        let idx = self.head.ok_or(FrameError::OutOfMemory)?;
        // Safety: `idx` was pushed by `init` or `free`, both of which only
        // ever record indices inside the managed, allocator-owned region.
        let next = unsafe { ((self.base + idx * FRAME_SIZE) as *const usize).read_volatile() };
        self.head = if next == usize::MAX { None } else { Some(next) };
        self.free_count -= 1;
        Ok(Frame(idx))
    }

    fn free(&mut self, frame: Frame) -> Result<(), FrameError> {
        if frame.0 >= self.total {
            return Err(FrameError::NotManaged);
        }
        let next = self.head.map_or(usize::MAX, |h| h);
        // Safety: `frame.0` was handed out by `allocate` and is within the
        // managed region; the caller promises the frame is no longer in use.
        unsafe {
            let slot = (self.base + frame.0 * FRAME_SIZE) as *mut usize;
            slot.write_volatile(next);
        }
        self.head = Some(frame.0);
        self.free_count += 1;
        Ok(())
    }
}

/// Global physical frame allocator.
pub struct FrameAllocator {
    inner: Mutex<FreeList>,
}

impl FrameAllocator {
    /// Creates an allocator with no managed frames. Call [`Self::init`]
    /// before use.
    #[must_use]
    pub const fn new() -> Self {
        Self { inner: Mutex::new(FreeList::empty()) }
    }

    /// Registers the physical region `[base, base + total * FRAME_SIZE)`
    /// as available for allocation.
    ///
    /// # Safety
    /// The region must not overlap memory already in use by the kernel,
    /// bootloader structures, or any previously-initialized allocator.
    pub unsafe fn init(&self, base: PhysAddr, total: usize) {
        let mut list = self.inner.lock();
        // Safety: forwarded from the caller's contract.
        unsafe { list.init(base.as_usize(), total) };
    }

    /// Allocates a single physical frame.
    ///
    /// # Errors
    /// Returns [`FrameError::OutOfMemory`] if no frames remain.
    pub fn allocate(&self) -> Result<Frame, FrameError> {
        self.inner.lock().allocate()
    }

    /// Returns a previously allocated frame to the free list.
    ///
    /// # Errors
    /// Returns [`FrameError::NotManaged`] if the frame does not belong to
    /// this allocator's managed region.
    pub fn free(&self, frame: Frame) -> Result<(), FrameError> {
        self.inner.lock().free(frame)
    }

    /// Number of frames currently free.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.inner.lock().free_count
    }
}

impl Default for FrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_then_free_is_reusable() {
        let region = alloc::vec![0u8; FRAME_SIZE * 4];
        let alloc = FrameAllocator::new();
        unsafe { alloc.init(PhysAddr::new_unchecked(region.as_ptr() as usize), 4) };

        let f0 = alloc.allocate().unwrap();
        let f1 = alloc.allocate().unwrap();
        assert_ne!(f0, f1);
        assert_eq!(alloc.free_count(), 2);

        alloc.free(f0).unwrap();
        assert_eq!(alloc.free_count(), 3);

        let f2 = alloc.allocate().unwrap();
        assert_eq!(f2, f0);
    }

    #[test]
    fn exhausted_allocator_errors() {
        let region = alloc::vec![0u8; FRAME_SIZE];
        let alloc = FrameAllocator::new();
        unsafe { alloc.init(PhysAddr::new_unchecked(region.as_ptr() as usize), 1) };

        alloc.allocate().unwrap();
        assert_eq!(alloc.allocate(), Err(FrameError::OutOfMemory));
    }
}
