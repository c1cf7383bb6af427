// src/kernel/process/lifecycle.rs
//! Process lifecycle: `fork`, `execl`, `exit`, `join`.
//!
//! All four operate on a process's table index rather than a pointer or
//! an allocated PID — see [`super::table::ProcessTable`].

use alloc::sync::Arc;

use crate::errors::unified::ProcessError;
use crate::kernel::fs::node::Node;
use crate::kernel::mm::allocator::FRAMES;
use crate::kernel::mm::vmm::{self, KernelTables};
use crate::kernel::{loader, scheduler};

use super::pcb::{Pcb, UserContext};
use super::table::PROCESS_TABLE;

/// Forks `parent_index`, eagerly copying its address space and FD/
/// semaphore tables.
///
/// Returns `(child_index, parent_return_value)`. The parent's return
/// value is always the constant `1`, not the child's table index — a
/// long-standing quirk of this fork implementation that userland has
/// come to depend on, so it is kept rather than "fixed".
///
/// # Errors
/// [`ProcessError::NoSuchProcess`] if `parent_index` isn't live;
/// [`ProcessError::ForkFailed`] if copying the address space runs out
/// of physical frames.
pub fn fork(parent_index: usize, template: &KernelTables) -> Result<(usize, i32), ProcessError> {
    let mut table = PROCESS_TABLE.lock();
    let parent = table.get(parent_index).ok_or(ProcessError::NoSuchProcess)?;

    let child_directory = parent
        .page_directory
        .as_ref()
        .ok_or(ProcessError::NoSuchProcess)?
        .fork_into(&FRAMES, template)
        .map_err(|_| ProcessError::ForkFailed)?;
    let child_vmas = parent.vmas.deep_copy();
    let fds = parent.fds.clone();
    let semaphores = parent.semaphores.clone();
    let root_node = parent.root_node.clone();
    let cwd_node = parent.cwd_node.clone();
    let mut context = parent.context;
    context.set_return_value(0);

    let mut child = Pcb::new(child_directory, root_node);
    child.cwd_node = cwd_node;
    child.vmas = child_vmas;
    child.fds = fds;
    child.semaphores = semaphores;
    child.context = context;
    child.handler_eip = parent.handler_eip;

    let child_index = table.insert(child);
    table
        .get_mut(parent_index)
        .ok_or(ProcessError::NoSuchProcess)?
        .push_child(child_index);

    Ok((child_index, 1))
}

/// Replaces `index`'s address space with a freshly loaded `node`,
/// keeping its FD table, semaphore table, children and working
/// directory intact.
///
/// # Errors
/// Propagates [`crate::errors::unified::LoadError`] (via
/// [`ProcessError::NoSuchProcess`] if the process itself vanished) and
/// [`ProcessError::ForkFailed`] if a fresh page directory can't be
/// built.
pub fn execl(index: usize, node: &Arc<dyn Node>, template: &KernelTables) -> Result<(), ProcessError> {
    let image = loader::load(node).map_err(|_| ProcessError::ForkFailed)?;
    let new_directory = vmm::per_core_init(&FRAMES, template).map_err(|_| ProcessError::ForkFailed)?;

    let mut table = PROCESS_TABLE.lock();
    let pcb = table.get_mut(index).ok_or(ProcessError::NoSuchProcess)?;
    if let Some(old) = pcb.page_directory.take() {
        old.free(&FRAMES);
    }
    pcb.page_directory = Some(new_directory);
    pcb.vmas = image.vmas;
    pcb.context = UserContext::at_entry(image.entry, image.stack_top);
    pcb.handler_eip = 0;
    pcb.in_handler = false;
    pcb.handler_user_context = None;
    Ok(())
}

/// Marks `index` exited with `code`, releasing its address space and
/// waking anyone blocked in [`join`] on it.
///
/// The process control block itself is left in the table (its exit
/// value, FD table and children are still inspectable) until
/// [`join`] reaps it.
///
/// # Errors
/// [`ProcessError::NoSuchProcess`] if `index` isn't live.
pub fn exit(index: usize, code: i32) -> Result<(), ProcessError> {
    let mut table = PROCESS_TABLE.lock();
    let pcb = table.get_mut(index).ok_or(ProcessError::NoSuchProcess)?;
    if let Some(pd) = pcb.page_directory.take() {
        pd.free(&FRAMES);
    }
    pcb.exit_value.set(code);
    Ok(())
}

/// Waits for `parent_index`'s most recently forked child to exit, then
/// removes it from the table and runs `k` with its exit code.
///
/// Fires `k` immediately (on the caller's stack) if the child has
/// already exited by the time `join` is called; otherwise parks `k` on
/// the child's exit [`crate::kernel::sync::Future`] via
/// [`scheduler::go`], matching how every other blocking syscall in this
/// kernel suspends without blocking the single kernel thread.
///
/// Runs `k` with `-1` immediately if `parent_index` has no children
/// left to join.
///
/// # Errors
/// [`ProcessError::NoSuchProcess`] if `parent_index` isn't live.
pub fn join(parent_index: usize, k: alloc::boxed::Box<dyn FnOnce(i32) + Send>) -> Result<(), ProcessError> {
    let child_index = {
        let mut table = PROCESS_TABLE.lock();
        let parent = table.get_mut(parent_index).ok_or(ProcessError::NoSuchProcess)?;
        match parent.pop_child() {
            Some(child) => child,
            None => {
                k(-1);
                return Ok(());
            }
        }
    };

    let exit_value = {
        let mut table = PROCESS_TABLE.lock();
        let child = table.remove(child_index).ok_or(ProcessError::NoSuchProcess)?;
        child.exit_value
    };

    exit_value.get(alloc::boxed::Box::new(move |code| {
        scheduler::go(alloc::boxed::Box::new(move || k(code)));
    }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::fs::ramdisk::dir;
    use crate::kernel::mm::frame::FrameAllocator;
    use crate::kernel::mm::types::PhysAddr;

    fn setup() -> (FrameAllocator, KernelTables, alloc::vec::Vec<u8>) {
        let region = alloc::vec![0u8; 4096 * 64];
        let allocator = FrameAllocator::new();
        unsafe { allocator.init(PhysAddr::new(region.as_ptr() as usize), 64) };
        let template = vmm::global_init(&allocator, 1).unwrap();
        (allocator, template, region)
    }

    fn root_node() -> Arc<dyn Node> {
        Arc::new(dir(alloc::vec![]))
    }

    #[test]
    fn fork_returns_one_to_parent_and_links_child() {
        let (allocator, template, _region) = setup();
        let pd = vmm::per_core_init(&allocator, &template).unwrap();
        let parent_index = PROCESS_TABLE.lock().insert(Pcb::new(pd, root_node()));

        let (child_index, parent_rv) = fork(parent_index, &template).unwrap();
        assert_eq!(parent_rv, 1);
        assert_ne!(child_index, parent_index);

        let table = PROCESS_TABLE.lock();
        assert_eq!(table.get(parent_index).unwrap().last_child(), Some(child_index));
        assert_eq!(table.get(child_index).unwrap().context.eax, 0);
    }

    #[test]
    fn exit_then_join_runs_continuation_with_code() {
        let (allocator, template, _region) = setup();
        let pd = vmm::per_core_init(&allocator, &template).unwrap();
        let parent_index = PROCESS_TABLE.lock().insert(Pcb::new(pd, root_node()));
        let (child_index, _) = fork(parent_index, &template).unwrap();

        exit(child_index, 42).unwrap();

        let observed = Arc::new(spin::Mutex::new(None));
        let observed2 = observed.clone();
        join(parent_index, alloc::boxed::Box::new(move |code| {
            *observed2.lock() = Some(code);
        }))
        .unwrap();

        assert_eq!(*observed.lock(), Some(42));
        assert!(PROCESS_TABLE.lock().get(child_index).is_none());
    }

    #[test]
    fn join_with_no_children_reports_minus_one() {
        let (allocator, template, _region) = setup();
        let pd = vmm::per_core_init(&allocator, &template).unwrap();
        let parent_index = PROCESS_TABLE.lock().insert(Pcb::new(pd, root_node()));

        let observed = Arc::new(spin::Mutex::new(None));
        let observed2 = observed.clone();
        join(parent_index, alloc::boxed::Box::new(move |code| {
            *observed2.lock() = Some(code);
        }))
        .unwrap();

        assert_eq!(*observed.lock(), Some(-1));
    }
}
