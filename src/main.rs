// src/main.rs
//! Kernel entry point
//!
//! Bring-up — switching to protected mode, installing the GDT/IDT,
//! enabling paging — is an external collaborator (`SPEC_FULL.md` §1,
//! "the boot and per-core init"). This file only has to get a
//! Multiboot2-compliant loader (GRUB, QEMU `-kernel`) to jump to
//! `_start` with the CPU already in 32-bit protected mode; everything
//! after that is the `tiny_os` library crate.

#![no_std]
#![no_main]

use core::panic::PanicInfo;

/// Multiboot2 magic a compliant loader scans for in the image.
const MULTIBOOT2_MAGIC: u32 = 0xE852_50D6;
/// i386 protected mode, no paging enabled yet.
const ARCHITECTURE_I386: u32 = 0;

#[repr(C, align(8))]
struct MultibootHeader {
    magic: u32,
    architecture: u32,
    header_length: u32,
    checksum: u32,
    end_tag_type: u16,
    end_tag_flags: u16,
    end_tag_size: u32,
}

const HEADER_LENGTH: u32 = core::mem::size_of::<MultibootHeader>() as u32;

/// Placed in its own section so the loader finds it within the first
/// 32 KiB of the image, per the Multiboot2 spec.
#[link_section = ".multiboot_header"]
#[used]
static MULTIBOOT_HEADER: MultibootHeader = MultibootHeader {
    magic: MULTIBOOT2_MAGIC,
    architecture: ARCHITECTURE_I386,
    header_length: HEADER_LENGTH,
    checksum: 0u32
        .wrapping_sub(MULTIBOOT2_MAGIC)
        .wrapping_sub(ARCHITECTURE_I386)
        .wrapping_sub(HEADER_LENGTH),
    end_tag_type: 0,
    end_tag_flags: 0,
    end_tag_size: 8,
};

#[no_mangle]
pub extern "C" fn _start() -> ! {
    tiny_os::console_println!("=== tiny_os kernel ===");
    tiny_os::hlt_loop()
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    tiny_os::debug_println!("[PANIC] {info}");
    tiny_os::hlt_loop()
}
