// src/kernel/sync/mod.rs
//! Blocking synchronization primitives for kernel and user code
//!
//! Not to be confused with the top-level [`crate::sync`] module, which
//! is a lock-*ordering* diagnostic layer for the VGA/serial console.
//! These are the process-synchronization primitives named in the
//! concurrency model: a continuation-accepting counting semaphore, a
//! single-writer future, and a bounded buffer built from the two —
//! backing both user `sem`/`up`/`down` calls and pipes.

pub mod bounded_buffer;
pub mod future;
pub mod semaphore;

pub use bounded_buffer::BoundedBuffer;
pub use future::Future;
pub use semaphore::Semaphore;
