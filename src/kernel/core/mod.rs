// src/kernel/core/mod.rs
//! Kernel-wide core abstractions
//!
//! Device/task traits and small ID newtypes ([`traits`], [`types`]), the
//! pre-existing contextual error type ([`result`]), and a single-core
//! stand-in for per-CPU storage ([`percpu`]) used by the scheduler and
//! process table until real multi-core bring-up lands.

pub mod percpu;
pub mod prelude;
pub mod result;
pub mod traits;
pub mod types;

pub use percpu::PerCpu;
pub use result::{DeviceError, ErrorKind, KernelError, KernelResult, MemoryError, TaskError};
pub use traits::{BlockDevice, CharDevice, Device, Scheduler, Task, TaskState};
pub use types::{DeviceId, Priority, ProcessId, TaskId};
