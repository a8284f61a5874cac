// SPDX-License-Identifier: MIT
//
// Terminal colors.
//
// A style color is one of three things: the terminal's own default, an
// index into the 256-color palette, or a 24-bit RGB triple. That is all an
// ANSI/xterm terminal can be told, so that is all we store. Four bytes,
// `Copy`, hashable, cheap to compare in the diff loop and cheap to hash in
// the style interning table.
//
// Parsing accepts the usual hex notations (`#RGB`, `#RRGGBB`, with or
// without the leading `#`) and packed `0xRRGGBB` integers.

use std::fmt;

// ─── Color ───────────────────────────────────────────────────────────────────

/// A terminal color as stored in a [`Style`](crate::style::Style).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default color (inherits from the user's terminal theme).
    #[default]
    Default,

    /// ANSI 256-color palette index. 0–15 are the classic 16 colors.
    Palette(u8),

    /// 24-bit `TrueColor`.
    Rgb(u8, u8, u8),
}

impl Color {
    pub const BLACK: Self = Self::Palette(0);
    pub const RED: Self = Self::Palette(1);
    pub const GREEN: Self = Self::Palette(2);
    pub const YELLOW: Self = Self::Palette(3);
    pub const BLUE: Self = Self::Palette(4);
    pub const MAGENTA: Self = Self::Palette(5);
    pub const CYAN: Self = Self::Palette(6);
    pub const WHITE: Self = Self::Palette(7);

    /// Create an RGB color.
    #[inline]
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::Rgb(r, g, b)
    }

    /// Create a color from a packed `0xRRGGBB` integer. The top byte is ignored.
    #[inline]
    #[must_use]
    pub const fn from_u32(packed: u32) -> Self {
        let [_, r, g, b] = packed.to_be_bytes();
        Self::Rgb(r, g, b)
    }

    /// Parse a hex color string.
    ///
    /// Accepts `#RGB`, `#RRGGBB`, `RGB`, and `RRGGBB` (case-insensitive).
    /// Returns `None` for anything else.
    ///
    /// ```
    /// use n_tui::color::Color;
    ///
    /// assert_eq!(Color::hex("#ff8000"), Some(Color::Rgb(255, 128, 0)));
    /// assert_eq!(Color::hex("f80"), Some(Color::Rgb(255, 136, 0)));
    /// assert_eq!(Color::hex("nope"), None);
    /// ```
    #[must_use]
    pub fn hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        let bytes = s.as_bytes();

        match bytes.len() {
            3 => {
                let r = parse_hex_digit(bytes[0])?;
                let g = parse_hex_digit(bytes[1])?;
                let b = parse_hex_digit(bytes[2])?;
                Some(Self::Rgb(r << 4 | r, g << 4 | g, b << 4 | b))
            }
            6 => {
                let r = parse_hex_byte(&bytes[0..2])?;
                let g = parse_hex_byte(&bytes[2..4])?;
                let b = parse_hex_byte(&bytes[4..6])?;
                Some(Self::Rgb(r, g, b))
            }
            _ => None,
        }
    }

    /// Whether this is the terminal default color.
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::Rgb(r, g, b)
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Self::Palette(idx) => write!(f, "palette({idx})"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ─── Hex Parsing ─────────────────────────────────────────────────────────────

const fn parse_hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn parse_hex_byte(pair: &[u8]) -> Option<u8> {
    let hi = parse_hex_digit(pair[0])?;
    let lo = parse_hex_digit(pair[1])?;
    Some(hi << 4 | lo)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_is_4_bytes() {
        assert_eq!(std::mem::size_of::<Color>(), 4);
    }

    #[test]
    fn default_is_default() {
        assert_eq!(Color::default(), Color::Default);
        assert!(Color::Default.is_default());
        assert!(!Color::RED.is_default());
    }

    // ── Hex ──────────────────────────────────────────────────────────────

    #[test]
    fn hex_six_digits() {
        assert_eq!(Color::hex("#1e1e2e"), Some(Color::Rgb(0x1e, 0x1e, 0x2e)));
        assert_eq!(Color::hex("FFFFFF"), Some(Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn hex_three_digits_expand() {
        assert_eq!(Color::hex("#abc"), Some(Color::Rgb(0xaa, 0xbb, 0xcc)));
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert_eq!(Color::hex(""), None);
        assert_eq!(Color::hex("#12"), None);
        assert_eq!(Color::hex("#gggggg"), None);
        assert_eq!(Color::hex("#1234567"), None);
    }

    #[test]
    fn from_u32_unpacks() {
        assert_eq!(Color::from_u32(0x00ff_8000), Color::Rgb(255, 128, 0));
        assert_eq!(Color::from_u32(0xaa00_0001), Color::Rgb(0, 0, 1));
    }

    #[test]
    fn from_tuple() {
        assert_eq!(Color::from((1, 2, 3)), Color::rgb(1, 2, 3));
    }

    // ── Debug ────────────────────────────────────────────────────────────

    #[test]
    fn debug_format() {
        assert_eq!(format!("{:?}", Color::Rgb(255, 0, 16)), "#ff0010");
        assert_eq!(format!("{:?}", Color::Palette(42)), "palette(42)");
        assert_eq!(format!("{}", Color::Default), "default");
    }
}
