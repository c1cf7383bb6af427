// src/kernel/process/table.rs
//! The process table
//!
//! A flat arena of `Option<Pcb>` slots indexed by a stable `usize`,
//! rather than the pointer graph the original links processes with.
//! `None` marks a free slot so table indices stay stable across
//! `exit`/`remove` without shifting every later process.

use alloc::vec::Vec;
use lazy_static::lazy_static;
use spin::Mutex;

use super::pcb::Pcb;
use crate::kernel::core::PerCpu;

/// The process table.
pub struct ProcessTable {
    slots: Vec<Option<Pcb>>,
}

impl ProcessTable {
    const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Inserts `pcb` into the first free slot, growing the table if
    /// none exists, and returns its index.
    pub fn insert(&mut self, pcb: Pcb) -> usize {
        if let Some(slot) = self.slots.iter().position(Option::is_none) {
            self.slots[slot] = Some(pcb);
            slot
        } else {
            self.slots.push(Some(pcb));
            self.slots.len() - 1
        }
    }

    /// Borrows the process at `index`, if one is live there.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Pcb> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Mutably borrows the process at `index`, if one is live there.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Pcb> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Removes and returns the process at `index`, freeing the slot for
    /// reuse.
    pub fn remove(&mut self, index: usize) -> Option<Pcb> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Number of slots in use.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

lazy_static! {
    /// The global process table, guarded the same way
    /// [`crate::kernel::mm::allocator::FRAMES`] guards the frame
    /// allocator.
    pub static ref PROCESS_TABLE: Mutex<ProcessTable> = Mutex::new(ProcessTable::new());
}

/// Table index of the process currently running on this CPU, if any.
///
/// Single-core today (see [`crate::kernel::core::PerCpu`]); kept as a
/// `PerCpu` cell so a real per-core index is a non-invasive upgrade.
pub static CURRENT: PerCpu<Option<usize>> = PerCpu::new(None);

/// Table index of the process currently running, if any.
#[must_use]
pub fn current_index() -> Option<usize> {
    CURRENT.get()
}

/// Records `index` as the process now running on this CPU.
pub fn set_current(index: Option<usize>) {
    CURRENT.set(index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::fs::ramdisk::dir;
    use crate::kernel::mm::frame::FrameAllocator;
    use crate::kernel::mm::types::PhysAddr;
    use crate::kernel::mm::vmm;
    use alloc::sync::Arc;

    fn test_pcb(allocator: &FrameAllocator) -> Pcb {
        let template = vmm::global_init(allocator, 1).unwrap();
        let pd = vmm::per_core_init(allocator, &template).unwrap();
        let root: Arc<dyn crate::kernel::fs::node::Node> = Arc::new(dir(alloc::vec![]));
        Pcb::new(pd, root)
    }

    #[test]
    fn insert_reuses_freed_slots() {
        let region = alloc::vec![0u8; 4096 * 32];
        let allocator = FrameAllocator::new();
        unsafe { allocator.init(PhysAddr::new(region.as_ptr() as usize), 32) };

        let mut table = ProcessTable::new();
        let a = table.insert(test_pcb(&allocator));
        let b = table.insert(test_pcb(&allocator));
        assert_ne!(a, b);
        table.remove(a);
        let c = table.insert(test_pcb(&allocator));
        assert_eq!(c, a);
    }

    #[test]
    fn get_mut_on_missing_slot_is_none() {
        let mut table = ProcessTable::new();
        assert!(table.get(0).is_none());
        assert!(table.get_mut(0).is_none());
    }
}
