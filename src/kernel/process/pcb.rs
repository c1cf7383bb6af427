// src/kernel/process/pcb.rs
//! The process control block
//!
//! Everything needed to describe a process that is not currently on the
//! CPU lives here as plain owned data: its page directory, its VMA
//! list, fixed-size file-descriptor and semaphore tables, its children
//! (stack-ordered so `join`/`kill` can find "the most recently forked
//! one" in O(1)), its signal state, and the [`Future`] its exit code is
//! written into.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::array;

use crate::constants::{FD_TABLE_SIZE, SEMAPHORE_TABLE_SIZE};
use crate::errors::unified::ProcessError;
use crate::kernel::fs::node::Node;
use crate::kernel::fs::FdHandle;
use crate::kernel::mm::vma::VmaList;
use crate::kernel::mm::vmm::PageDirectory;
use crate::kernel::sync::{Future, Semaphore};

/// Saved register/segment/flags state for a process that is off the
/// CPU: what `resume` restores and `switchToUser`/a trap gate save.
///
/// This is a protected-mode trap frame, not a SysV calling-convention
/// frame — there is no callee-saved/caller-saved split, every
/// general-purpose register is always saved.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct UserContext {
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    pub esp: u32,
    pub ss: u32,
}

/// User code selector, CPL 3. The GDT that defines it is an external
/// collaborator out of scope here (see `SPEC_FULL.md` §4.7).
const USER_CODE_SELECTOR: u32 = 0x1B;
/// User data/stack selector, CPL 3.
const USER_DATA_SELECTOR: u32 = 0x23;
/// Interrupt-enable bit of EFLAGS.
const EFLAGS_IF: u32 = 1 << 9;

impl UserContext {
    /// Builds the context a freshly loaded (or just-`execl`'d) program
    /// starts in: every general-purpose register zero, `eip`/`esp` from
    /// the loader, interrupts enabled.
    #[must_use]
    pub fn at_entry(entry: u32, stack_top: u32) -> Self {
        Self {
            eip: entry,
            esp: stack_top,
            cs: USER_CODE_SELECTOR,
            ss: USER_DATA_SELECTOR,
            eflags: EFLAGS_IF,
            ..Default::default()
        }
    }

    /// Overwrites `eax`, the register a syscall's return value comes
    /// back in.
    pub fn set_return_value(&mut self, value: i32) {
        self.eax = value as u32;
    }
}

/// A process control block.
pub struct Pcb {
    /// `None` only transiently, between freeing the old address space in
    /// [`crate::kernel::process::lifecycle::execl`] and installing the
    /// new one.
    pub page_directory: Option<PageDirectory>,
    pub vmas: VmaList,
    pub fds: [Option<FdHandle>; FD_TABLE_SIZE],
    pub semaphores: [Option<Arc<Semaphore>>; SEMAPHORE_TABLE_SIZE],
    /// Table indices of children, in fork order: `join`/`kill` act on
    /// `children.last()`, the most recently forked one.
    pub children: Vec<usize>,
    /// Saved trap-time registers, valid whenever this process is not
    /// the one currently running.
    pub context: UserContext,
    /// Entry point of the installed `simple_signal` handler, or 0 if
    /// none is installed.
    pub handler_eip: u32,
    /// Whether a signal handler is currently executing.
    pub in_handler: bool,
    /// The context to resume once the running handler calls (or
    /// implicitly triggers) `sigreturn`.
    pub handler_user_context: Option<UserContext>,
    /// Set by `kill` against this process; consulted the next time it
    /// would otherwise resume, forcing it to exit instead.
    pub kill_pending: bool,
    /// The filesystem root absolute paths resolve from. Fixed for the
    /// lifetime of the process (inherited as-is across `fork`/`execl`);
    /// distinct from `cwd_node`, which `chdir` changes.
    pub root_node: Arc<dyn Node>,
    pub cwd_node: Arc<dyn Node>,
    pub exit_value: Arc<Future<i32>>,
}

impl Pcb {
    /// Builds a fresh PCB with an empty FD/semaphore table and no
    /// children, rooted at `root_node` with its working directory also
    /// starting there.
    #[must_use]
    pub fn new(page_directory: PageDirectory, root_node: Arc<dyn Node>) -> Self {
        Self {
            page_directory: Some(page_directory),
            vmas: VmaList::new(),
            fds: array::from_fn(|_| None),
            semaphores: array::from_fn(|_| None),
            children: Vec::new(),
            context: UserContext::default(),
            handler_eip: 0,
            in_handler: false,
            handler_user_context: None,
            kill_pending: false,
            cwd_node: root_node.clone(),
            root_node,
            exit_value: Arc::new(Future::new()),
        }
    }

    /// Installs `handle` in the lowest free FD slot, returning it.
    ///
    /// # Errors
    /// Returns [`ProcessError::FdTableFull`] if all `FD_TABLE_SIZE`
    /// slots are occupied.
    pub fn alloc_fd(&mut self, handle: FdHandle) -> Result<usize, ProcessError> {
        let slot = self.fds.iter().position(Option::is_none).ok_or(ProcessError::FdTableFull)?;
        self.fds[slot] = Some(handle);
        Ok(slot)
    }

    /// Duplicates `fd` into the lowest free slot, aliasing the same
    /// underlying offset/pipe.
    pub fn dup_fd(&mut self, fd: usize) -> Result<usize, ProcessError> {
        let handle = self.fds.get(fd).and_then(Option::clone).ok_or(ProcessError::NoSuchProcess)?;
        self.alloc_fd(handle)
    }

    /// Releases `fd`, if open.
    pub fn close_fd(&mut self, fd: usize) -> bool {
        match self.fds.get_mut(fd) {
            Some(slot @ Some(_)) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Allocates a semaphore with `initial` count in the lowest free
    /// slot, returning its index.
    pub fn alloc_sem(&mut self, initial: i64) -> Option<usize> {
        let slot = self.semaphores.iter().position(Option::is_none)?;
        self.semaphores[slot] = Some(Arc::new(Semaphore::new(initial)));
        Some(slot)
    }

    /// Releases semaphore slot `s`, if allocated.
    pub fn close_sem(&mut self, s: usize) -> bool {
        match self.semaphores.get_mut(s) {
            Some(slot @ Some(_)) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Records `child` as the most recently forked child.
    pub fn push_child(&mut self, child: usize) {
        self.children.push(child);
    }

    /// Table index of the most recently forked child still tracked by
    /// this process, without removing it.
    #[must_use]
    pub fn last_child(&self) -> Option<usize> {
        self.children.last().copied()
    }

    /// Removes and returns the most recently forked child, as `join`
    /// does once it has read that child's exit value.
    pub fn pop_child(&mut self) -> Option<usize> {
        self.children.pop()
    }
}
