// tests/syscall_alignment_test.rs
//! Syscall dispatcher address-validation tests
//!
//! Exercises [`tiny_os::kernel::syscall::dispatch`] from outside the
//! crate the same way the trap-gate stub would: a process table
//! index, a syscall number, and raw `u32` args pulled off the user
//! stack.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(tiny_os::test_runner)]
#![reexport_test_harness_main = "test_main"]

extern crate alloc;

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::panic::PanicInfo;
use core::sync::atomic::{AtomicI32, Ordering};

use tiny_os::constants::USER_SPACE_START;
use tiny_os::kernel::fs::ramdisk::dir;
use tiny_os::kernel::mm::frame::FrameAllocator;
use tiny_os::kernel::mm::types::PhysAddr;
use tiny_os::kernel::mm::vmm::{self, KernelTables};
use tiny_os::kernel::process::pcb::Pcb;
use tiny_os::kernel::process::table::PROCESS_TABLE;
use tiny_os::kernel::syscall::dispatch;
use tiny_os::{serial_print, serial_println};

#[no_mangle]
pub extern "C" fn _start() -> ! {
    test_main();
    tiny_os::hlt_loop()
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    tiny_os::test_panic_handler(info)
}

/// Backing region, template and process index for one test. The caller
/// must keep `region`/`allocator`/`template` alive for as long as
/// `index` is used — leaking them (this is a single-shot test binary
/// that exits via QEMU, not a long-lived process) keeps the setup
/// one-liner at each call site.
fn spawn_process() -> (usize, KernelTables) {
    let region = alloc::vec![0u8; 4096 * 64];
    let allocator = Box::leak(Box::new(FrameAllocator::new()));
    unsafe { allocator.init(PhysAddr::new(region.as_ptr() as usize), 64) };
    core::mem::forget(region);
    let template = vmm::global_init(allocator, 1).unwrap();
    let pd = vmm::per_core_init(allocator, &template).unwrap();
    let root: Arc<dyn tiny_os::kernel::fs::node::Node> = Arc::new(dir(alloc::vec![]));
    let index = PROCESS_TABLE.lock().insert(Pcb::new(pd, root));
    (index, template)
}

fn capture() -> (Arc<AtomicI32>, Box<dyn FnOnce(i32) + Send>) {
    let result = Arc::new(AtomicI32::new(i32::MIN));
    let r = result.clone();
    (result, Box::new(move |v| r.store(v, Ordering::SeqCst)))
}

#[test_case]
fn unknown_syscall_number_returns_err() {
    serial_print!("unknown_syscall_number_returns_err... ");
    let (index, template) = spawn_process();
    let (result, k) = capture();
    dispatch(index, 0xDEAD, [0; 4], &template, k);
    assert_eq!(result.load(Ordering::SeqCst), -1);
    serial_println!("[ok]");
}

#[test_case]
fn write_to_unmapped_buffer_is_rejected() {
    serial_print!("write_to_unmapped_buffer_is_rejected... ");
    let (index, template) = spawn_process();
    let (result, k) = capture();
    // Terminal fd 1, a well-formed but never-mapped user address.
    dispatch(index, 1, [1, USER_SPACE_START as u32, 4, 0], &template, k);
    assert_eq!(result.load(Ordering::SeqCst), -1);
    serial_println!("[ok]");
}

#[test_case]
fn write_below_user_space_is_rejected() {
    serial_print!("write_below_user_space_is_rejected... ");
    let (index, template) = spawn_process();
    let (result, k) = capture();
    // Address 0 is below USER_SPACE_START; must be rejected, not faulted on.
    dispatch(index, 1, [1, 0, 4, 0], &template, k);
    assert_eq!(result.load(Ordering::SeqCst), -1);
    serial_println!("[ok]");
}
