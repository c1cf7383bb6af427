// src/vga_buffer/color.rs

//! VGA 4-bit color palette and packed foreground/background color codes.

/// VGA standard 16-color palette.
#[allow(dead_code)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

/// Packed foreground/background color byte: `bg << 4 | fg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct ColorCode(u8);

impl ColorCode {
    /// Builds a color code from a foreground and background color.
    #[must_use]
    pub const fn new(foreground: Color, background: Color) -> Self {
        Self((background as u8) << 4 | (foreground as u8))
    }

    /// Default color: light gray on black.
    pub const DEFAULT: Self = Self::new(Color::LightGray, Color::Black);

    /// Default color: light gray on black.
    #[must_use]
    pub const fn normal() -> Self {
        Self::DEFAULT
    }

    /// Returns the packed byte as used in a VGA character cell's high byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

/// Alias kept for call sites that spell out "VGA color" explicitly.
pub type VgaColor = Color;

impl Default for ColorCode {
    fn default() -> Self {
        Self::DEFAULT
    }
}
