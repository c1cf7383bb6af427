// src/kernel/sync/future.rs
//! Single-writer, many-reader future
//!
//! Used for a process's exit value: `exit` sets it once, and any number
//! of `join` calls (here, really just the one active parent at a time)
//! can register a continuation that fires the moment the value becomes
//! available — or immediately, if it already is.

use alloc::boxed::Box;
use alloc::vec::Vec;
use spin::Mutex;

type Reader<T> = Box<dyn FnOnce(T) + Send>;

enum State<T> {
    Unset(Vec<Reader<T>>),
    Set(T),
}

/// A value that is written at most once and read any number of times.
pub struct Future<T: Clone + Send + 'static> {
    state: Mutex<State<T>>,
}

impl<T: Clone + Send + 'static> Future<T> {
    /// Creates an unset future.
    #[must_use]
    pub const fn new() -> Self {
        Self { state: Mutex::new(State::Unset(Vec::new())) }
    }

    /// Sets the value, if not already set, and runs every pending
    /// reader with it.
    ///
    /// A second call is a no-op: the first write wins, mirroring a
    /// process's exit value, which is set exactly once.
    pub fn set(&self, value: T) {
        let readers = {
            let mut state = self.state.lock();
            match &*state {
                State::Set(_) => return,
                State::Unset(_) => {
                    let readers = match core::mem::replace(&mut *state, State::Set(value.clone())) {
                        State::Unset(readers) => readers,
                        State::Set(_) => unreachable!(),
                    };
                    readers
                }
            }
        };
        for reader in readers {
            reader(value.clone());
        }
    }

    /// Runs `k` with the value immediately if already set, otherwise
    /// parks it until [`Self::set`] is called.
    pub fn get(&self, k: Reader<T>) {
        let mut state = self.state.lock();
        match &mut *state {
            State::Set(v) => {
                let v = v.clone();
                drop(state);
                k(v);
            }
            State::Unset(readers) => readers.push(k),
        }
    }

    /// Returns the value without registering a continuation, if set.
    #[must_use]
    pub fn try_get(&self) -> Option<T> {
        match &*self.state.lock() {
            State::Set(v) => Some(v.clone()),
            State::Unset(_) => None,
        }
    }
}

impl<T: Clone + Send + 'static> Default for Future<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn get_before_set_parks_then_fires() {
        let fut: Future<i32> = Future::new();
        let seen = Arc::new(AtomicI32::new(-1));
        let s = seen.clone();
        fut.get(Box::new(move |v| s.store(v, Ordering::SeqCst)));
        assert_eq!(seen.load(Ordering::SeqCst), -1);
        fut.set(42);
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn get_after_set_runs_immediately() {
        let fut: Future<i32> = Future::new();
        fut.set(7);
        let seen = Arc::new(AtomicI32::new(-1));
        let s = seen.clone();
        fut.get(Box::new(move |v| s.store(v, Ordering::SeqCst)));
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn second_set_is_ignored() {
        let fut: Future<i32> = Future::new();
        fut.set(1);
        fut.set(2);
        assert_eq!(fut.try_get(), Some(1));
    }
}
