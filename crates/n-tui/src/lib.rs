// SPDX-License-Identifier: MIT
//
// n-tui: terminal UI engine.
//
// Three parts that share no state:
//
//   Screen  ── a grid of styled cells with interned styles and hyperlinks,
//              a clip stack, and Unicode-width aware drawing primitives.
//   Writer  ── reproduces a Screen on a real terminal. Diffs against the
//              last frame it flushed and emits only the cells that changed,
//              in one synchronized write per frame, to any `Write` sink or
//              into a caller-owned byte buffer, full screen or inline.
//   Decoder ── turns the raw byte stream from the terminal into key, mouse,
//              paste and focus events, without ever reordering or losing
//              input on partial or malformed sequences.
//
// Everything talks ANSI/xterm directly: raw termios for input mode, escape
// sequences for output. No TUI frameworks underneath. Every byte sent to
// the terminal is accounted for.

pub mod ansi;
pub mod buffer_writer;
pub mod cell;
pub mod color;
pub mod decoder;
pub mod error;
pub mod event_loop;
pub mod input;
pub mod output;
pub mod reader;
pub mod screen;
pub mod style;
pub mod subscription;
pub mod terminal;
pub mod writer;

pub use error::{Error, Result};
