// src/kernel/scheduler/mod.rs
//! Cooperative event loop
//!
//! The kernel has no per-PCB kernel thread. Kernel-side work — resuming a
//! syscall whose semaphore finally became available, running a freshly
//! forked child for the first time, reacting to a timer preemption — is
//! represented as a boxed closure and dropped onto a FIFO queue. The
//! event loop just drains that queue forever, halting the CPU when it is
//! empty until the next interrupt refills it.
//!
//! The original kernel pins one such queue per CPU. Multi-core bring-up
//! is out of scope here (the IDT/APIC layer is an external collaborator),
//! so this is a single global queue; per-CPU affinity can be reintroduced
//! by wrapping the queue in a `PerCpu<T>` without touching callers.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use spin::Mutex;

use crate::arch::{ArchCpu, Cpu};

/// A unit of deferred kernel work.
pub type Work = Box<dyn FnOnce() + Send>;

struct Queue {
    items: VecDeque<Work>,
}

static QUEUE: Mutex<Queue> = Mutex::new(Queue { items: VecDeque::new() });

/// Enqueues `work` to run the next time the event loop drains the queue.
///
/// Safe to call from trap context with interrupts disabled: this only
/// takes a short spinlock, never blocks.
pub fn go(work: Work) {
    QUEUE.lock().items.push_back(work);
}

/// Number of work items currently queued. Exposed for tests.
#[must_use]
pub fn pending() -> usize {
    QUEUE.lock().items.len()
}

/// Runs every currently-queued item once, in FIFO order, including any
/// further work items those items enqueue.
///
/// Used by tests, and by callers that want to pump the queue without
/// halting the CPU.
pub fn run_ready() {
    loop {
        let next = QUEUE.lock().items.pop_front();
        match next {
            Some(work) => work(),
            None => break,
        }
    }
}

/// The per-CPU "never returns" driver.
///
/// Dequeues and invokes work items one at a time. When the queue runs
/// dry, halts the CPU until the next interrupt (timer or device) wakes
/// it and, typically, some ISR has called [`go`] in the meantime.
pub fn event_loop() -> ! {
    loop {
        let next = QUEUE.lock().items.pop_front();
        match next {
            Some(work) => work(),
            None => ArchCpu::halt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn run_ready_drains_fifo_order() {
        let order: Arc<Mutex<alloc::vec::Vec<i32>>> = Arc::new(Mutex::new(alloc::vec::Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            go(Box::new(move || order.lock().push(i)));
        }
        run_ready();
        assert_eq!(*order.lock(), alloc::vec![0, 1, 2]);
        assert_eq!(pending(), 0);
    }

    #[test]
    fn work_can_enqueue_more_work() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        go(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
            let c2 = c.clone();
            go(Box::new(move || {
                c2.fetch_add(1, Ordering::SeqCst);
            }));
        }));
        run_ready();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
