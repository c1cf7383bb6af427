// src/constants.rs

//! Kernel constants and configuration values
//!
//! This module centralizes the address-space layout, table sizes, and
//! boot-banner text used throughout the kernel.

/// List of major kernel features and improvements
///
/// These features are displayed during boot to inform the user
/// about the kernel's capabilities.
pub const FEATURES: &[&str] = &[
    "Preemptible round-robin process scheduling",
    "Demand-paged user virtual memory with lazy allocation",
    "Eager copy-on-fork address space duplication",
    "ELF32 user program loader",
    "Counting semaphores, futures and bounded buffers",
    "Pipe-backed inter-process communication",
    "Interrupt-safe locking (no deadlock!)",
    "CPU hlt instruction",
    "Detailed panic handler",
];

/// System component information
///
/// Each tuple contains a (label, value) pair describing
/// a kernel component or configuration.
pub const SYSTEM_INFO: &[(&str, &str)] = &[
    ("Arch", "x86, 32-bit protected mode"),
    ("Serial", "COM1 (0x3F8) with FIFO check"),
];

/// Usage hints displayed to serial output
///
/// These messages provide guidance on interacting with
/// the kernel when running under QEMU or similar emulators.
pub const SERIAL_HINTS: &[&str] = &[
    "Kernel running. System in low-power hlt loop.",
    "Press Ctrl+A, X to exit QEMU.",
];

/// Size of a single page frame, in bytes.
pub const FRAME_SIZE: usize = 4096;

/// Number of entries in a page directory or page table.
pub const PAGE_TABLE_ENTRIES: usize = 1024;

/// Start of the region identity-mapped for kernel use.
pub const KERNEL_BASE: usize = 0x0000_0000;

/// End of the kernel's identity-mapped region and start of user space.
///
/// VMAs handed out to user processes always fall in
/// `[USER_SPACE_START, USER_SPACE_END)`.
pub const USER_SPACE_START: usize = 0x8000_0000;

/// End of ordinary user space and start of the shared page region.
pub const USER_SPACE_END: usize = 0xF000_0000;

/// Base address of the page shared identically by every process.
///
/// Exactly one frame (`[SHARED_PAGE_BASE, SHARED_PAGE_BASE + FRAME_SIZE)`)
/// is mapped read-only and alike into every address space.
pub const SHARED_PAGE_BASE: usize = 0xF000_0000;

/// Address of the sentinel fault page inside the shared page.
///
/// A fault at this exact address is never a real bug: it is how signal
/// delivery fakes a return address for handlers that never call
/// `sigreturn` themselves.
pub const SENTINEL_FAULT_ADDR: usize = 0xF000_0800;

/// Value pushed as a synthetic return address requesting implicit
/// `sigreturn` once a signal handler returns normally.
pub const IMPLICIT_SIGRETURN_ADDR: usize = 0x2000;

/// Highest address an ELF entry point or segment may occupy.
///
/// One frame above [`USER_SPACE_END`], matching the loader's historical
/// bound rather than the tidier `USER_SPACE_END` the rest of the address
/// map would suggest.
pub const ELF_LOAD_UPPER_BOUND: usize = 0xF000_1000;

/// Number of file-descriptor slots per process.
pub const FD_TABLE_SIZE: usize = 10;

/// Number of semaphore slots per process.
pub const SEMAPHORE_TABLE_SIZE: usize = 100;

/// Maximum number of direct children tracked per process.
pub const MAX_CHILDREN: usize = 32;

/// Capacity of the most-recently-used frame-reclaim queue.
pub const MRU_QUEUE_CAPACITY: usize = 16;

/// Capacity, in bytes, of a pipe's bounded buffer.
pub const PIPE_CAPACITY: usize = 100;

/// Trap vector used for the `int` instruction that enters the syscall
/// dispatcher from user mode.
pub const SYSCALL_TRAP_VECTOR: u8 = 0x30;

/// Signal number used for user-visible signal delivery.
pub const SIGNAL_NUMBER: i32 = 1;
