// src/kernel/driver/serial.rs
//! COM1 シリアルポートドライバ
//!
//! 実際のハードウェアアクセスは [`crate::serial`] に委譲し、ここでは
//! `kernel::driver` の統一インターフェース（`Device`/`fmt::Write`）を
//! 提供するだけの薄いラッパーとする。

use core::fmt;
use spin::Mutex;

/// COM1 シリアルポート
pub struct SerialPort;

impl SerialPort {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for SerialPort {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        crate::serial::write_str(s);
        Ok(())
    }
}

/// グローバル COM1 インスタンス
pub static SERIAL1: Mutex<SerialPort> = Mutex::new(SerialPort::new());
