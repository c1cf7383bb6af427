// src/error.rs

//! Unified error types for the kernel
//!
//! This module provides a consistent error handling approach across
//! all kernel subsystems.

use core::fmt;

use crate::kernel::fs::FileError;
use crate::kernel::mm::types::MemoryError;

/// Top-level kernel error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// VGA subsystem error
    Vga(VgaError),
    /// Serial subsystem error
    Serial(SerialError),
    /// Initialization error
    Init(InitError),
    /// Display subsystem error
    Display(DisplayError),
    /// Process/PCB lifecycle error
    Process(ProcessError),
    /// Syscall dispatch error
    Syscall(SyscallError),
    /// ELF loader error
    Load(LoadError),
    /// Virtual/physical memory management error
    Memory(MemoryError),
    /// Filesystem or file-descriptor error
    Fs(FileError),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Vga(e) => write!(f, "VGA error: {}", e),
            KernelError::Serial(e) => write!(f, "Serial error: {}", e),
            KernelError::Init(e) => write!(f, "Init error: {}", e),
            KernelError::Display(e) => write!(f, "Display error: {}", e),
            KernelError::Process(e) => write!(f, "Process error: {}", e),
            KernelError::Syscall(e) => write!(f, "Syscall error: {}", e),
            KernelError::Load(e) => write!(f, "Loader error: {}", e),
            KernelError::Memory(e) => write!(f, "Memory error: {}", e),
            KernelError::Fs(e) => write!(f, "Filesystem error: {}", e),
        }
    }
}

/// VGA subsystem errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VgaError {
    /// Buffer not accessible
    BufferNotAccessible,
    /// Invalid position
    InvalidPosition,
    /// Write operation failed
    WriteFailure,
    /// Not initialized
    NotInitialized,
    /// Writer not locked
    NotLocked,
    /// Buffer overflow
    BufferOverflow,
}

impl VgaError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            VgaError::BufferNotAccessible => "buffer not accessible",
            VgaError::InvalidPosition => "invalid position",
            VgaError::WriteFailure => "write failure",
            VgaError::NotInitialized => "not initialized",
            VgaError::NotLocked => "writer not locked",
            VgaError::BufferOverflow => "buffer overflow",
        }
    }
}

impl fmt::Display for VgaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<VgaError> for KernelError {
    fn from(err: VgaError) -> Self {
        KernelError::Vga(err)
    }
}

/// Serial subsystem errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// Port already initialized
    AlreadyInitialized,
    /// Hardware not present
    PortNotPresent,
    /// Timeout during operation
    Timeout,
    /// Configuration failed
    ConfigurationFailed,
    /// Hardware access failed
    HardwareAccessFailed,
    /// Too many initialization attempts
    TooManyAttempts,
    /// Invalid baud rate
    InvalidBaudRate,
    /// FIFO error
    FifoError,
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerialError::AlreadyInitialized => write!(f, "already initialized"),
            SerialError::PortNotPresent => write!(f, "hardware not present"),
            SerialError::Timeout => write!(f, "operation timeout"),
            SerialError::ConfigurationFailed => write!(f, "configuration failed"),
            SerialError::HardwareAccessFailed => write!(f, "hardware access failed"),
            SerialError::TooManyAttempts => write!(f, "too many attempts"),
            SerialError::InvalidBaudRate => write!(f, "invalid baud rate"),
            SerialError::FifoError => write!(f, "FIFO error"),
        }
    }
}

impl From<SerialError> for KernelError {
    fn from(err: SerialError) -> Self {
        KernelError::Serial(err)
    }
}

/// Initialization errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// VGA initialization failed
    VgaFailed(VgaError),
    /// Serial initialization failed
    SerialFailed(SerialError),
    /// Already initialized
    AlreadyInitialized,
    /// Prerequisites not met
    PrerequisitesNotMet,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::VgaFailed(e) => write!(f, "VGA init failed: {}", e),
            InitError::SerialFailed(e) => write!(f, "Serial init failed: {}", e),
            InitError::AlreadyInitialized => write!(f, "already initialized"),
            InitError::PrerequisitesNotMet => write!(f, "prerequisites not met"),
        }
    }
}

impl From<InitError> for KernelError {
    fn from(err: InitError) -> Self {
        KernelError::Init(err)
    }
}

/// Display subsystem errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    /// No output available
    NoOutputAvailable,
    /// Format error
    FormatError,
    /// Underlying subsystem error
    SubsystemError,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::NoOutputAvailable => write!(f, "no output available"),
            DisplayError::FormatError => write!(f, "format error"),
            DisplayError::SubsystemError => write!(f, "subsystem error"),
        }
    }
}

impl From<DisplayError> for KernelError {
    fn from(err: DisplayError) -> Self {
        KernelError::Display(err)
    }
}

/// Process control block / lifecycle errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// The process table has no free slots.
    TableFull,
    /// No process exists at the given table index.
    NoSuchProcess,
    /// `fork` could not allocate a page directory or copy a frame for
    /// the child.
    ForkFailed,
    /// The file-descriptor table has no free slot.
    FdTableFull,
    /// The semaphore table has no free slot.
    SemTableFull,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ProcessError::TableFull => "process table is full",
            ProcessError::NoSuchProcess => "no such process",
            ProcessError::ForkFailed => "fork could not duplicate the address space",
            ProcessError::FdTableFull => "file descriptor table is full",
            ProcessError::SemTableFull => "semaphore table is full",
        };
        f.write_str(msg)
    }
}

impl From<ProcessError> for KernelError {
    fn from(err: ProcessError) -> Self {
        KernelError::Process(err)
    }
}

/// Syscall dispatch errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// The syscall number has no registered handler.
    NoSuchSyscall,
    /// A pointer/length argument fell outside `[0x80000000, 0xF0000000)`
    /// or overflowed.
    BadAddress,
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SyscallError::NoSuchSyscall => "unknown syscall number",
            SyscallError::BadAddress => "argument address outside user range",
        };
        f.write_str(msg)
    }
}

impl From<SyscallError> for KernelError {
    fn from(err: SyscallError) -> Self {
        KernelError::Syscall(err)
    }
}

/// ELF32 loader errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// The file does not start with the ELF magic bytes.
    BadMagic,
    /// Not a 32-bit, little-endian executable for this machine.
    UnsupportedClass,
    /// A `PT_LOAD` segment falls outside `[0x80000000, ELF_LOAD_UPPER_BOUND)`.
    SegmentOutOfRange,
    /// Reading the file failed.
    ReadFailed,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            LoadError::BadMagic => "not an ELF file",
            LoadError::UnsupportedClass => "unsupported ELF class/machine/version",
            LoadError::SegmentOutOfRange => "load segment outside the user address window",
            LoadError::ReadFailed => "failed to read program image",
        };
        f.write_str(msg)
    }
}

impl From<LoadError> for KernelError {
    fn from(err: LoadError) -> Self {
        KernelError::Load(err)
    }
}

impl From<MemoryError> for KernelError {
    fn from(err: MemoryError) -> Self {
        KernelError::Memory(err)
    }
}

impl From<FileError> for KernelError {
    fn from(err: FileError) -> Self {
        KernelError::Fs(err)
    }
}

/// Result type alias for kernel operations
pub type Result<T> = core::result::Result<T, KernelError>;

/// Additional conversions for VgaError
impl From<VgaError> for InitError {
    fn from(err: VgaError) -> Self {
        InitError::VgaFailed(err)
    }
}

/// Additional conversions for SerialError
impl From<SerialError> for InitError {
    fn from(err: SerialError) -> Self {
        InitError::SerialFailed(err)
    }
}

/// Helper trait for error context
pub trait ErrorContext {
    /// Get a detailed description of the error
    fn context(&self) -> &'static str;
}

impl ErrorContext for KernelError {
    fn context(&self) -> &'static str {
        match self {
            KernelError::Vga(_) => "Error occurred in VGA buffer subsystem",
            KernelError::Serial(_) => "Error occurred in serial port subsystem",
            KernelError::Init(_) => "Error occurred during kernel initialization",
            KernelError::Display(_) => "Error occurred in display subsystem",
            KernelError::Process(_) => "Error occurred in process lifecycle management",
            KernelError::Syscall(_) => "Error occurred dispatching a syscall",
            KernelError::Load(_) => "Error occurred loading an ELF program image",
            KernelError::Memory(_) => "Error occurred in virtual/physical memory management",
            KernelError::Fs(_) => "Error occurred in the filesystem or a file descriptor",
        }
    }
}

impl ErrorContext for ProcessError {
    fn context(&self) -> &'static str {
        match self {
            ProcessError::TableFull => "Every process table slot is occupied",
            ProcessError::NoSuchProcess => "Referenced a process table index with no live process",
            ProcessError::ForkFailed => "fork ran out of frames while copying the parent's address space",
            ProcessError::FdTableFull => "Process already has 10 open file descriptors",
            ProcessError::SemTableFull => "Process already has 100 allocated semaphores",
        }
    }
}

impl ErrorContext for SyscallError {
    fn context(&self) -> &'static str {
        match self {
            SyscallError::NoSuchSyscall => "Dispatch table has no handler for this syscall number",
            SyscallError::BadAddress => "User-supplied pointer failed the address-range check",
        }
    }
}

impl ErrorContext for LoadError {
    fn context(&self) -> &'static str {
        match self {
            LoadError::BadMagic => "First four bytes are not 0x7F 'E' 'L' 'F'",
            LoadError::UnsupportedClass => "Expected 32-bit, version 1, machine type 3",
            LoadError::SegmentOutOfRange => "PT_LOAD segment would map outside valid user memory",
            LoadError::ReadFailed => "Node::read_all returned fewer bytes than the segment needs",
        }
    }
}

impl ErrorContext for VgaError {
    fn context(&self) -> &'static str {
        match self {
            VgaError::BufferNotAccessible => "VGA buffer memory could not be accessed",
            VgaError::InvalidPosition => "Attempted to write to invalid screen position",
            VgaError::WriteFailure => "Failed to write to VGA buffer",
            VgaError::NotInitialized => "VGA writer must be initialized before use",
            VgaError::NotLocked => "VGA writer lock must be acquired before writing",
            VgaError::BufferOverflow => "VGA buffer capacity exceeded",
        }
    }
}

impl ErrorContext for SerialError {
    fn context(&self) -> &'static str {
        match self {
            SerialError::AlreadyInitialized => "Serial port cannot be initialized twice",
            SerialError::PortNotPresent => "Serial port hardware is not available",
            SerialError::Timeout => "Serial operation timed out waiting for hardware",
            SerialError::ConfigurationFailed => "Failed to configure serial port registers",
            SerialError::HardwareAccessFailed => "Could not access serial port I/O registers",
            SerialError::TooManyAttempts => "Exceeded maximum retry attempts for serial operation",
            SerialError::InvalidBaudRate => "Specified baud rate is not supported",
            SerialError::FifoError => "Serial FIFO buffer encountered an error",
        }
    }
}

impl ErrorContext for InitError {
    fn context(&self) -> &'static str {
        match self {
            InitError::VgaFailed(_) => "VGA subsystem initialization failed",
            InitError::SerialFailed(_) => "Serial subsystem initialization failed",
            InitError::AlreadyInitialized => "Kernel subsystems are already initialized",
            InitError::PrerequisitesNotMet => {
                "Required conditions for initialization not satisfied"
            }
        }
    }
}

impl ErrorContext for DisplayError {
    fn context(&self) -> &'static str {
        match self {
            DisplayError::NoOutputAvailable => "No display output methods are available",
            DisplayError::FormatError => "Failed to format output string",
            DisplayError::SubsystemError => "Underlying display subsystem error",
        }
    }
}
