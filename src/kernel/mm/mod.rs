// src/kernel/mm/mod.rs
//! Memory management
//!
//! Physical frame allocation ([`frame`]), type-safe address newtypes
//! ([`types`]), the intrusive queue primitives shared by the scheduler
//! and block cache ([`queue`]), per-process virtual memory area tracking
//! ([`vma`]), page directory/table management ([`vmm`]), and the kernel
//! heap allocator ([`allocator`]).

pub mod types;
pub mod frame;
pub mod queue;
pub mod vma;
pub mod vmm;
pub mod allocator;

pub use allocator::{LockedHeap, LinkedListAllocator};
pub use frame::{Frame, FrameAllocator, FrameError};
pub use types::{MemoryError, PageFrameNumber, PhysAddr, VirtAddr, LayoutSize};
