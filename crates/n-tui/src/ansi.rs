// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit; that is the `CellWriter`'s and the
// `Writer`'s job. This module only knows the byte-level encoding of every
// terminal command the engine uses.
//
// All cursor positions are 0-indexed in our API and converted to 1-indexed
// for the terminal (ANSI CUP is 1-based).
//
// All functions return `io::Result` propagated from the underlying writer.
// In practice they never fail when writing to `OutputBuffer` (a Vec).

use std::io::{self, Write};

use crate::color::Color;
use crate::style::{Attr, Style, UnderlineStyle};

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` (CUP).
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// Move the cursor up `n` rows (CUU). Stops at the top edge.
#[inline]
pub fn cursor_up(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}A")
}

/// Move the cursor to column `x` of the current row (CHA).
#[inline]
pub fn cursor_column(w: &mut impl Write, x: u16) -> io::Result<()> {
    write!(w, "\x1b[{}G", u32::from(x) + 1)
}

/// Carriage return plus `n` line feeds. Unlike CUD, a line feed on the
/// bottom row scrolls the terminal, so inline output can grow past it.
pub fn next_lines(w: &mut impl Write, n: u16) -> io::Result<()> {
    w.write_all(b"\r")?;
    for _ in 0..n {
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Erase the whole display (ED 2). The cursor does not move.
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Erase from the cursor to the end of the display (ED 0).
#[inline]
pub fn clear_below(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[J")
}

/// Reset all SGR attributes to terminal defaults (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

// ─── SGR ─────────────────────────────────────────────────────────────────────

/// Emit a complete style as one SGR sequence that starts from a reset.
///
/// The leading `0` makes the result independent of whatever the terminal
/// had before, so the caller only needs to remember the last style *id*:
/// `\x1b[0;1;38;2;255;0;0m` is bold red no matter what came before.
/// The default style is a plain `\x1b[0m`.
pub fn sgr(w: &mut impl Write, style: &Style) -> io::Result<()> {
    w.write_all(b"\x1b[0")?;

    macro_rules! emit {
        ($flag:expr, $code:expr) => {
            if style.attrs.contains($flag) {
                w.write_all($code)?;
            }
        };
    }

    emit!(Attr::BOLD, b";1");
    emit!(Attr::FAINT, b";2");
    emit!(Attr::ITALIC, b";3");
    emit!(Attr::BLINK, b";5");
    emit!(Attr::INVERSE, b";7");
    emit!(Attr::INVISIBLE, b";8");
    emit!(Attr::STRIKETHROUGH, b";9");
    emit!(Attr::OVERLINE, b";53");

    match style.underline {
        UnderlineStyle::None => {}
        UnderlineStyle::Single => w.write_all(b";4")?,
        UnderlineStyle::Double => w.write_all(b";4:2")?,
        UnderlineStyle::Curly => w.write_all(b";4:3")?,
        UnderlineStyle::Dotted => w.write_all(b";4:4")?,
        UnderlineStyle::Dashed => w.write_all(b";4:5")?,
    }

    color_params(w, style.fg, ColorSlot::Foreground)?;
    color_params(w, style.bg, ColorSlot::Background)?;
    color_params(w, style.underline_color, ColorSlot::Underline)?;

    w.write_all(b"m")
}

#[derive(Clone, Copy)]
enum ColorSlot {
    Foreground,
    Background,
    Underline,
}

/// Append `;<params>` for one color. Nothing for `Color::Default`, since the
/// sequence already starts from a reset.
///
/// Palette 0–7 and 8–15 use the compact 30–37/90–97 (40–47/100–107) codes.
/// Underline color has no compact form and always uses 58;5 or 58;2.
fn color_params(w: &mut impl Write, color: Color, slot: ColorSlot) -> io::Result<()> {
    let (base, bright, extended) = match slot {
        ColorSlot::Foreground => (30u16, 90u16, 38u16),
        ColorSlot::Background => (40, 100, 48),
        ColorSlot::Underline => (0, 0, 58),
    };
    match color {
        Color::Default => Ok(()),
        Color::Palette(idx) if idx < 8 && base != 0 => write!(w, ";{}", base + u16::from(idx)),
        Color::Palette(idx) if idx < 16 && bright != 0 => {
            write!(w, ";{}", bright + u16::from(idx) - 8)
        }
        Color::Palette(idx) => write!(w, ";{extended};5;{idx}"),
        Color::Rgb(r, g, b) => write!(w, ";{extended};2;{r};{g};{b}"),
    }
}

// ─── Hyperlinks ──────────────────────────────────────────────────────────────

/// Open an OSC 8 hyperlink. Text written until [`hyperlink_close`] is linked.
#[inline]
pub fn hyperlink_open(w: &mut impl Write, url: &str) -> io::Result<()> {
    write!(w, "\x1b]8;;{url}\x1b\\")
}

/// Close the current OSC 8 hyperlink.
#[inline]
pub fn hyperlink_close(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b]8;;\x1b\\")
}

// ─── Synchronized Output ─────────────────────────────────────────────────────

/// Begin synchronized output (DEC private mode 2026).
///
/// The terminal holds everything until [`end_sync`] and then paints the
/// frame at once, so a half-written frame is never visible.
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

/// End synchronized output; the terminal paints the buffered frame.
#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Alternate Screen ────────────────────────────────────────────────────────

/// Enter the alternate screen buffer (DEC private mode 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Leave the alternate screen and restore the original content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Mouse ───────────────────────────────────────────────────────────────────

/// Enable SGR mouse reporting for clicks, drags and plain motion.
///
/// 1000 reports presses and releases, 1002 adds drag motion, 1003 adds
/// motion with no button held, and 1006 switches the encoding to SGR, which
/// has no column limit and distinguishes release from press.
pub fn enable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1000h\x1b[?1002h\x1b[?1003h\x1b[?1006h")
}

/// Disable all mouse reporting (reverse order of [`enable_mouse`]).
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l")
}

// ─── Bracketed Paste ─────────────────────────────────────────────────────────

/// Enable bracketed paste (DEC 2004). Pastes arrive wrapped in
/// `\x1b[200~` … `\x1b[201~`.
#[inline]
pub fn enable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004h")
}

#[inline]
pub fn disable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004l")
}

// ─── Focus Reporting ─────────────────────────────────────────────────────────

/// Enable focus reporting (DEC 1004). The terminal sends `\x1b[I` on focus
/// gain and `\x1b[O` on focus loss.
#[inline]
pub fn enable_focus_reporting(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1004h")
}

#[inline]
pub fn disable_focus_reporting(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1004l")
}

// ─── Cursor Shape ────────────────────────────────────────────────────────────

/// Terminal cursor shape (DECSCUSR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorShape {
    /// Terminal default (usually a blinking block).
    #[default]
    Default,
    BlinkBlock,
    SteadyBlock,
    BlinkUnderline,
    SteadyUnderline,
    /// Blinking bar (I-beam).
    BlinkBar,
    /// Steady bar (I-beam).
    SteadyBar,
}

/// Set the cursor shape (DECSCUSR).
#[inline]
pub fn set_cursor_shape(w: &mut impl Write, shape: CursorShape) -> io::Result<()> {
    let n: u8 = match shape {
        CursorShape::Default => 0,
        CursorShape::BlinkBlock => 1,
        CursorShape::SteadyBlock => 2,
        CursorShape::BlinkUnderline => 3,
        CursorShape::SteadyUnderline => 4,
        CursorShape::BlinkBar => 5,
        CursorShape::SteadyBar => 6,
    };
    write!(w, "\x1b[{n} q")
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: run an ANSI function and return its output as a string.
    fn emit<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn sgr_of(style: Style) -> String {
        emit(|w| sgr(w, &style))
    }

    // ── Cursor ───────────────────────────────────────────────────────────

    #[test]
    fn cursor_to_origin() {
        assert_eq!(emit(|w| cursor_to(w, 0, 0)), "\x1b[1;1H");
    }

    #[test]
    fn cursor_to_position() {
        assert_eq!(emit(|w| cursor_to(w, 10, 20)), "\x1b[21;11H");
    }

    #[test]
    fn cursor_to_does_not_overflow() {
        assert_eq!(emit(|w| cursor_to(w, u16::MAX, 0)), "\x1b[1;65536H");
    }

    #[test]
    fn relative_moves() {
        assert_eq!(emit(|w| cursor_up(w, 3)), "\x1b[3A");
        assert_eq!(emit(|w| cursor_column(w, 0)), "\x1b[1G");
        assert_eq!(emit(|w| cursor_column(w, 9)), "\x1b[10G");
        assert_eq!(emit(|w| next_lines(w, 2)), "\r\n\n");
        assert_eq!(emit(|w| next_lines(w, 0)), "\r");
    }

    #[test]
    fn cursor_visibility() {
        assert_eq!(emit(|w| cursor_hide(w)), "\x1b[?25l");
        assert_eq!(emit(|w| cursor_show(w)), "\x1b[?25h");
    }

    // ── Screen ───────────────────────────────────────────────────────────

    #[test]
    fn clear_and_reset() {
        assert_eq!(emit(|w| clear_screen(w)), "\x1b[2J");
        assert_eq!(emit(|w| clear_below(w)), "\x1b[J");
        assert_eq!(emit(|w| reset(w)), "\x1b[0m");
    }

    // ── SGR ──────────────────────────────────────────────────────────────

    #[test]
    fn sgr_default_is_plain_reset() {
        assert_eq!(sgr_of(Style::new()), "\x1b[0m");
    }

    #[test]
    fn sgr_attributes() {
        assert_eq!(sgr_of(Style::new().bold()), "\x1b[0;1m");
        assert_eq!(sgr_of(Style::new().faint()), "\x1b[0;2m");
        assert_eq!(sgr_of(Style::new().italic()), "\x1b[0;3m");
        assert_eq!(sgr_of(Style::new().with(Attr::BLINK)), "\x1b[0;5m");
        assert_eq!(sgr_of(Style::new().inverse()), "\x1b[0;7m");
        assert_eq!(sgr_of(Style::new().with(Attr::INVISIBLE)), "\x1b[0;8m");
        assert_eq!(sgr_of(Style::new().strikethrough()), "\x1b[0;9m");
        assert_eq!(sgr_of(Style::new().overline()), "\x1b[0;53m");
    }

    #[test]
    fn sgr_combined_attributes_in_one_sequence() {
        assert_eq!(
            sgr_of(Style::new().bold().italic().strikethrough()),
            "\x1b[0;1;3;9m"
        );
    }

    #[test]
    fn sgr_underline_variants() {
        let u = |s| sgr_of(Style::new().underline(s));
        assert_eq!(u(UnderlineStyle::Single), "\x1b[0;4m");
        assert_eq!(u(UnderlineStyle::Double), "\x1b[0;4:2m");
        assert_eq!(u(UnderlineStyle::Curly), "\x1b[0;4:3m");
        assert_eq!(u(UnderlineStyle::Dotted), "\x1b[0;4:4m");
        assert_eq!(u(UnderlineStyle::Dashed), "\x1b[0;4:5m");
    }

    #[test]
    fn sgr_rgb_colors() {
        assert_eq!(
            sgr_of(Style::new().fg(Color::rgb(255, 0, 0))),
            "\x1b[0;38;2;255;0;0m"
        );
        assert_eq!(
            sgr_of(Style::new().bg(Color::rgb(0, 0, 255))),
            "\x1b[0;48;2;0;0;255m"
        );
    }

    #[test]
    fn sgr_palette_colors() {
        assert_eq!(sgr_of(Style::new().fg(Color::Palette(1))), "\x1b[0;31m");
        assert_eq!(sgr_of(Style::new().fg(Color::Palette(9))), "\x1b[0;91m");
        assert_eq!(sgr_of(Style::new().fg(Color::Palette(196))), "\x1b[0;38;5;196m");
        assert_eq!(sgr_of(Style::new().bg(Color::Palette(0))), "\x1b[0;40m");
        assert_eq!(sgr_of(Style::new().bg(Color::Palette(15))), "\x1b[0;107m");
        assert_eq!(sgr_of(Style::new().bg(Color::Palette(42))), "\x1b[0;48;5;42m");
    }

    #[test]
    fn sgr_underline_color() {
        assert_eq!(
            sgr_of(
                Style::new()
                    .underline(UnderlineStyle::Curly)
                    .underline_color(Color::rgb(1, 2, 3))
            ),
            "\x1b[0;4:3;58;2;1;2;3m"
        );
        assert_eq!(
            sgr_of(Style::new().underline_color(Color::Palette(3))),
            "\x1b[0;58;5;3m"
        );
    }

    #[test]
    fn sgr_everything() {
        let style = Style::new()
            .bold()
            .underline(UnderlineStyle::Single)
            .fg(Color::rgb(10, 20, 30))
            .bg(Color::Palette(4));
        assert_eq!(sgr_of(style), "\x1b[0;1;4;38;2;10;20;30;44m");
    }

    // ── Hyperlinks ───────────────────────────────────────────────────────

    #[test]
    fn hyperlink_sequences() {
        assert_eq!(
            emit(|w| hyperlink_open(w, "https://example.com")),
            "\x1b]8;;https://example.com\x1b\\"
        );
        assert_eq!(emit(|w| hyperlink_close(w)), "\x1b]8;;\x1b\\");
    }

    // ── Modes ────────────────────────────────────────────────────────────

    #[test]
    fn sync_sequences() {
        assert_eq!(emit(|w| begin_sync(w)), "\x1b[?2026h");
        assert_eq!(emit(|w| end_sync(w)), "\x1b[?2026l");
    }

    #[test]
    fn alt_screen_sequences() {
        assert_eq!(emit(|w| enter_alt_screen(w)), "\x1b[?1049h");
        assert_eq!(emit(|w| exit_alt_screen(w)), "\x1b[?1049l");
    }

    #[test]
    fn mouse_sequences() {
        assert_eq!(
            emit(|w| enable_mouse(w)),
            "\x1b[?1000h\x1b[?1002h\x1b[?1003h\x1b[?1006h"
        );
        assert_eq!(
            emit(|w| disable_mouse(w)),
            "\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l"
        );
    }

    #[test]
    fn paste_and_focus_sequences() {
        assert_eq!(emit(|w| enable_bracketed_paste(w)), "\x1b[?2004h");
        assert_eq!(emit(|w| disable_bracketed_paste(w)), "\x1b[?2004l");
        assert_eq!(emit(|w| enable_focus_reporting(w)), "\x1b[?1004h");
        assert_eq!(emit(|w| disable_focus_reporting(w)), "\x1b[?1004l");
    }

    // ── Cursor Shape ─────────────────────────────────────────────────────

    #[test]
    fn cursor_shapes() {
        assert_eq!(emit(|w| set_cursor_shape(w, CursorShape::Default)), "\x1b[0 q");
        assert_eq!(emit(|w| set_cursor_shape(w, CursorShape::BlinkBlock)), "\x1b[1 q");
        assert_eq!(emit(|w| set_cursor_shape(w, CursorShape::SteadyBlock)), "\x1b[2 q");
        assert_eq!(emit(|w| set_cursor_shape(w, CursorShape::SteadyUnderline)), "\x1b[4 q");
        assert_eq!(emit(|w| set_cursor_shape(w, CursorShape::SteadyBar)), "\x1b[6 q");
    }
}
