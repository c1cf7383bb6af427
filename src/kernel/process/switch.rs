// src/kernel/process/switch.rs
//! Kernel/user transfer points
//!
//! `resume` returns to a process's saved [`super::pcb::UserContext`]
//! (the far end of a `down`/`join`/pipe continuation firing) and
//! `switchToUser` performs the very first CPL0→CPL3 transfer for a
//! freshly loaded or `execl`'d program. Both are one `iret`-based asm
//! trampoline apiece, living in the IDT/GDT bring-up that is an external
//! collaborator out of scope here (`SPEC_FULL.md` §4.7 Ambient): this
//! crate only declares the calling convention and calls through it.
//!
//! Under `#[cfg(test)]`, `#[no_mangle]` stub bodies are provided so unit
//! tests exercising the process/syscall layer link without a real
//! bootloader-provided GDT/IDT.

use super::pcb::UserContext;

extern "C" {
    /// Loads `cr3`, restores every register in `ctx`, and `iret`s back
    /// into user mode at `ctx.eip`. Never returns.
    pub fn resume(ctx: *const UserContext, cr3: u32) -> !;

    /// Loads `cr3`, zeroes every general-purpose register, and `iret`s
    /// into user mode at `entry` with the stack pointer set to
    /// `stack_top`. Never returns.
    pub fn switchToUser(entry: u32, stack_top: u32, cr3: u32) -> !;
}

#[cfg(test)]
mod test_stubs {
    use super::UserContext;
    use core::sync::atomic::{AtomicU32, Ordering};

    /// Records the last context `resume`/`switchToUser` were asked to
    /// transfer to, so unit tests can assert a trampoline was reached
    /// without actually dropping to ring 3.
    pub static LAST_EIP: AtomicU32 = AtomicU32::new(0);
    pub static LAST_CR3: AtomicU32 = AtomicU32::new(0);

    #[no_mangle]
    extern "C" fn resume(ctx: *const UserContext, cr3: u32) -> ! {
        // Safety: test-only stub; callers in this crate's test suite
        // always pass a live `UserContext`.
        let eip = unsafe { (*ctx).eip };
        LAST_EIP.store(eip, Ordering::SeqCst);
        LAST_CR3.store(cr3, Ordering::SeqCst);
        panic!("test stub `resume` reached (eip={:#x}, cr3={:#x})", eip, cr3);
    }

    #[no_mangle]
    extern "C" fn switchToUser(entry: u32, _stack_top: u32, cr3: u32) -> ! {
        LAST_EIP.store(entry, Ordering::SeqCst);
        LAST_CR3.store(cr3, Ordering::SeqCst);
        panic!("test stub `switchToUser` reached (entry={:#x}, cr3={:#x})", entry, cr3);
    }
}
