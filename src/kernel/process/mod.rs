// src/kernel/process/mod.rs
//! Process control blocks, the process table, and process lifecycle
//! operations (`fork`/`execl`/`exit`/`join`).
//!
//! A process is identified purely by its index into [`table::PROCESS_TABLE`]
//! — there is no separate allocated PID space; the table index *is* the
//! identifier the syscall dispatcher and userland see.

pub mod lifecycle;
pub mod pcb;
pub mod switch;
pub mod table;

pub use pcb::{Pcb, UserContext};
pub use table::{current_index, set_current, ProcessTable, PROCESS_TABLE};
