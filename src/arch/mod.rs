// src/arch/mod.rs

//! Architecture-specific abstractions.

#[cfg(target_arch = "x86")]
pub mod x86;

// Kept on disk as reference for the 64-bit `x86_64`-crate-based
// implementation this kernel was ported from; no longer declared as a
// compiled module (see DESIGN.md).
#[cfg(any())]
pub mod x86_64;

#[cfg(target_arch = "x86")]
pub use self::x86::*;

#[cfg(target_arch = "x86")]
pub use self::x86::serial::PortIoBackend as SerialBackend;

#[cfg(target_arch = "x86")]
pub use self::x86::vga::TextModeBuffer as VgaBackend;

#[cfg(not(target_arch = "x86"))]
pub use crate::serial::backend::StubSerialBackend as SerialBackend;

#[cfg(not(target_arch = "x86"))]
pub use crate::vga_buffer::backend::StubBuffer as VgaBackend;

#[cfg(target_arch = "x86")]
/// Architecture-specific CPU implementation.
pub type ArchCpu = self::x86::X86Cpu;

#[cfg(not(target_arch = "x86"))]
/// Architecture-specific CPU implementation (host fallback for unit tests).
pub type ArchCpu = HostCpu;

#[cfg(not(target_arch = "x86"))]
/// No-op `Cpu` impl used when building/testing on a non-x86 host.
pub struct HostCpu;

#[cfg(not(target_arch = "x86"))]
impl Cpu for HostCpu {
    fn halt() {}
    fn disable_interrupts() {}
    fn enable_interrupts() {}
    fn are_interrupts_enabled() -> bool {
        true
    }
}

/// Trait for CPU-specific operations.
pub trait Cpu {
    /// Halt the CPU until the next interrupt.
    fn halt();
    
    /// Disable interrupts.
    fn disable_interrupts();
    
    /// Enable interrupts.
    fn enable_interrupts();
    
    /// Check if interrupts are enabled.
    fn are_interrupts_enabled() -> bool;
}

/// Read the hardware timestamp counter.
///
/// Returns a monotonically increasing tick count. The frequency is
/// architecture-dependent.
pub fn read_timestamp() -> u64 {
    #[cfg(target_arch = "x86")]
    return x86::read_timestamp();

    #[cfg(not(target_arch = "x86"))]
    return 0;
}

/// Write a byte to the platform debug output.
///
/// This is typically a serial port or a debug console used for
/// emergency logging (e.g. during panic).
pub fn write_debug_byte(byte: u8) {
    #[cfg(target_arch = "x86")]
    x86::write_debug_byte(byte);
}
