// src/kernel/sync/bounded_buffer.rs
//! Producer/consumer queue built from two semaphores
//!
//! `n_empty` counts free slots, `n_full` counts filled ones; the pair
//! keeps `put`/`get` from ever over- or under-running `capacity`. This
//! is the primitive behind both user semaphored pipes and the kernel's
//! own byte pipes.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use spin::Mutex;

use super::semaphore::Semaphore;

/// A fixed-capacity FIFO where producers block on a full buffer and
/// consumers block on an empty one.
pub struct BoundedBuffer<T: Send + 'static> {
    capacity: usize,
    n_full: Semaphore,
    n_empty: Semaphore,
    queue: Mutex<VecDeque<T>>,
}

impl<T: Send + 'static> BoundedBuffer<T> {
    /// Creates a buffer that holds at most `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            n_full: Semaphore::new(0),
            n_empty: Semaphore::new(capacity as i64),
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Maximum number of items this buffer can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Send + 'static> BoundedBuffer<T> {
    /// Enqueues `value`, blocking (via continuation) until a slot is
    /// free, then runs `k`.
    pub fn put(self: &Arc<Self>, value: T, k: Box<dyn FnOnce() + Send>) {
        let this = self.clone();
        self.n_empty.down(Box::new(move || {
            this.queue.lock().push_back(value);
            this.n_full.up();
            k();
        }));
    }

    /// Dequeues one item, blocking (via continuation) until one is
    /// available, then runs `k` with it.
    pub fn get(self: &Arc<Self>, k: Box<dyn FnOnce(T) + Send>) {
        let this = self.clone();
        self.n_full.down(Box::new(move || {
            let value = this
                .queue
                .lock()
                .pop_front()
                .expect("n_full permit implies a queued item");
            this.n_empty.up();
            k(value);
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::scheduler;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn put_then_get_round_trips() {
        let bb: Arc<BoundedBuffer<u8>> = Arc::new(BoundedBuffer::new(2));
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        bb.put(7u8, Box::new(|| {}));
        scheduler::run_ready();
        bb.get(Box::new(move |v| s.store(v as usize, Ordering::SeqCst)));
        scheduler::run_ready();
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn producer_blocks_at_capacity() {
        let bb: Arc<BoundedBuffer<u8>> = Arc::new(BoundedBuffer::new(1));
        bb.put(1u8, Box::new(|| {}));
        scheduler::run_ready();
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        bb.put(2u8, Box::new(move || {
            r.store(1, Ordering::SeqCst);
        }));
        scheduler::run_ready();
        assert_eq!(ran.load(Ordering::SeqCst), 0, "second put must not proceed until a slot frees");

        bb.get(Box::new(|_| {}));
        scheduler::run_ready();
        assert_eq!(ran.load(Ordering::SeqCst), 1, "freeing a slot should have released the blocked put");
    }
}
