// src/arch/x86/cpu.rs
//! 32-bit CPU control primitives
//!
//! `hlt`/`cli`/`sti` plus `pushfd`/`popfd`-based interrupt flag
//! save/restore, replacing the 64-bit `x86_64` crate's equivalents with
//! hand-rolled protected-mode asm.

use crate::arch::Cpu;

/// Saved EFLAGS state, as captured by [`X86Cpu::save_and_disable_interrupts`].
#[derive(Clone, Copy, Debug)]
pub struct InterruptFlags(u32);

const INTERRUPT_FLAG_BIT: u32 = 1 << 9;

pub struct X86Cpu;

impl Cpu for X86Cpu {
    fn halt() {
        unsafe {
            core::arch::asm!("hlt", options(nomem, nostack, preserves_flags));
        }
    }

    fn disable_interrupts() {
        unsafe {
            core::arch::asm!("cli", options(nomem, nostack, preserves_flags));
        }
    }

    fn enable_interrupts() {
        unsafe {
            core::arch::asm!("sti", options(nomem, nostack, preserves_flags));
        }
    }

    fn are_interrupts_enabled() -> bool {
        let eflags: u32;
        unsafe {
            core::arch::asm!(
                "pushfd",
                "pop {}",
                out(reg) eflags,
                options(nomem, nostack, preserves_flags)
            );
        }
        eflags & INTERRUPT_FLAG_BIT != 0
    }
}

impl X86Cpu {
    /// Saves EFLAGS and disables interrupts in one step.
    #[inline]
    pub fn save_and_disable_interrupts() -> InterruptFlags {
        let eflags: u32;
        unsafe {
            core::arch::asm!(
                "pushfd",
                "pop {}",
                "cli",
                out(reg) eflags,
                options(nomem, nostack, preserves_flags)
            );
        }
        InterruptFlags(eflags)
    }

    /// Restores a previously saved EFLAGS value.
    ///
    /// # Safety
    /// `flags` must have come from [`Self::save_and_disable_interrupts`].
    #[inline]
    pub unsafe fn restore_interrupts(flags: InterruptFlags) {
        unsafe {
            core::arch::asm!(
                "push {}",
                "popfd",
                in(reg) flags.0,
                options(nomem, nostack)
            );
        }
    }
}

/// Runs `f` with interrupts disabled, restoring the prior flag state
/// afterward even if `f` panics.
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let saved_flags = X86Cpu::save_and_disable_interrupts();

    struct InterruptGuard(InterruptFlags);

    impl Drop for InterruptGuard {
        fn drop(&mut self) {
            unsafe {
                // Safety: this guard only ever wraps flags captured by
                // `save_and_disable_interrupts` just above.
                X86Cpu::restore_interrupts(self.0);
            }
        }
    }

    let _guard = InterruptGuard(saved_flags);
    f()
}

/// Reads the Time Stamp Counter (TSC): EDX:EAX, combined into a `u64`.
#[must_use]
pub fn read_timestamp() -> u64 {
    let (hi, lo): (u32, u32);
    unsafe {
        core::arch::asm!(
            "rdtsc",
            out("edx") hi,
            out("eax") lo,
            options(nomem, nostack, preserves_flags)
        );
    }
    ((hi as u64) << 32) | lo as u64
}
