// src/kernel/sync/semaphore.rs
//! Counting semaphore with continuation-accepting `down`
//!
//! `down` never spins: if the count is already positive it decrements
//! and schedules the continuation on the event loop; otherwise it parks
//! the continuation in a FIFO until a matching `up` arrives. `count` is
//! never negative — a blocked waiter is represented by its continuation
//! sitting in `waiters`, not by a negative count.

use alloc::collections::VecDeque;
use spin::Mutex;

use crate::kernel::scheduler::{self, Work};

struct State {
    count: i64,
    waiters: VecDeque<Work>,
}

/// A counting semaphore usable from trap context.
pub struct Semaphore {
    state: Mutex<State>,
}

impl Semaphore {
    /// Creates a semaphore with the given initial count.
    #[must_use]
    pub fn new(initial: i64) -> Self {
        Self { state: Mutex::new(State { count: initial, waiters: VecDeque::new() }) }
    }

    /// Acquires one unit, running `k` once it is available.
    ///
    /// If the count is already positive, decrements it and schedules `k`
    /// on the event loop immediately; otherwise `k` is parked until a
    /// matching `up`.
    pub fn down(&self, k: Work) {
        let mut state = self.state.lock();
        if state.count > 0 {
            state.count -= 1;
            drop(state);
            scheduler::go(k);
        } else {
            state.waiters.push_back(k);
        }
    }

    /// Releases one unit. Wakes the longest-waiting blocked `down` if
    /// one is queued, otherwise increments the count.
    pub fn up(&self) {
        let mut state = self.state.lock();
        if let Some(waiter) = state.waiters.pop_front() {
            drop(state);
            scheduler::go(waiter);
        } else {
            state.count += 1;
        }
    }

    /// Current count, for diagnostics and tests. Does not reflect the
    /// number of parked waiters.
    #[must_use]
    pub fn count(&self) -> i64 {
        self.state.lock().count
    }

    /// Number of continuations currently parked.
    #[must_use]
    pub fn waiters_len(&self) -> usize {
        self.state.lock().waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn down_runs_immediately_when_count_positive() {
        let sem = Semaphore::new(1);
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        sem.down(Box::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        scheduler::run_ready();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn down_parks_then_up_wakes_fifo() {
        let sem = Semaphore::new(0);
        let order = Arc::new(Mutex::new(alloc::vec::Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            sem.down(Box::new(move || order.lock().push(i)));
        }
        assert_eq!(sem.waiters_len(), 3);
        sem.up();
        sem.up();
        sem.up();
        scheduler::run_ready();
        assert_eq!(*order.lock(), alloc::vec![0, 1, 2]);
    }

    #[test]
    fn count_and_waiters_balance() {
        let sem = Semaphore::new(0);
        sem.up();
        sem.up();
        assert_eq!(sem.count(), 2);
        sem.down(Box::new(|| {}));
        scheduler::run_ready();
        assert_eq!(sem.count(), 1);
    }
}
