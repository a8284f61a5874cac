// SPDX-License-Identifier: MIT
//
// Output buffering and stateful cell emission.
//
// Two components work together to minimize terminal I/O:
//
//   OutputBuffer accumulates every byte of a frame in memory so the whole
//   frame reaches the sink in a single `write_all`. The terminal never sees
//   half a frame, and there is one syscall per render instead of hundreds.
//
//   CellWriter tracks what the terminal currently has (cursor position, the
//   style id last emitted, the hyperlink currently open) and emits only what
//   changes. A run of cells in one style costs one SGR sequence followed by
//   plain text; sequential cells cost no cursor moves at all.
//
// Styles are emitted as a single self-contained SGR that begins with a reset
// (see `ansi::sgr`), so the only state worth tracking is the style *id*.
//
// Inline mode draws the grid below the shell prompt instead of on a cleared
// screen, so absolute positions mean nothing. Rows are counted from the top
// of the drawn region and every move is relative: CR plus line feeds going
// down (a line feed scrolls at the bottom edge, CUD would not), CUU going
// up, CHA or CR within a row.

use std::io::{self, Write};

use crate::ansi;
use crate::cell::Cell;
use crate::screen::Screen;
use crate::style::{LinkId, Style, StyleId};

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that accumulates one frame of output.
///
/// Default capacity: 16 KB, enough for most frames without reallocation.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Clear the buffer for reuse (keeps allocated capacity).
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write everything to `w` in one `write_all`, flush, and clear.
    ///
    /// The buffer is cleared even when the write fails, so a failed frame is
    /// never replayed in front of the next one.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to or flushing `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = w.write_all(&self.buf).and_then(|()| w.flush());
        self.buf.clear();
        result
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Real flushing happens in flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// Stateful cell emitter that skips redundant escape sequences.
///
/// # What is tracked
///
/// - **Cursor**: where the terminal cursor is after the last glyph, or
///   `None` when unknown. Writing into the last column leaves the terminal
///   in its pending-wrap state, so the position becomes unknown there.
/// - **Style**: the last emitted style id, or `None` when unknown.
/// - **Link**: the OSC 8 hyperlink currently open, if any.
///
/// In inline mode the row is never given up: writing into the last column
/// leaves the cursor at `x == columns`, which any relative move resolves.
#[allow(clippy::struct_field_names)]
pub struct CellWriter {
    cursor: Option<(u16, u16)>,
    style: Option<StyleId>,
    link: Option<LinkId>,
    inline: bool,
}

impl CellWriter {
    /// A writer that assumes nothing about the terminal.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cursor: None,
            style: None,
            link: None,
            inline: false,
        }
    }

    /// Switch between absolute (CUP) and relative positioning. Switching
    /// forgets the cursor.
    pub const fn set_inline(&mut self, inline: bool) {
        if self.inline != inline {
            self.inline = inline;
            self.cursor = None;
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        self.inline
    }

    /// Forget cursor and style. Call after anything else wrote to the
    /// terminal.
    pub const fn invalidate(&mut self) {
        self.cursor = None;
        self.style = None;
    }

    /// Record that the terminal pen was just reset to the default style.
    pub const fn assume_default_style(&mut self) {
        self.style = Some(StyleId::DEFAULT);
    }

    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }

    /// Emit one cell at `(x, y)`. Continuations are ignored: their wide owner
    /// already covered them.
    pub fn render_cell(&mut self, out: &mut OutputBuffer, screen: &Screen, x: u16, y: u16, cell: &Cell) {
        if cell.is_continuation() {
            return;
        }

        self.move_to(out, x, y);

        if self.style != Some(cell.style) {
            let style = screen.resolve_style(cell.style).copied().unwrap_or(Style::new());
            ansi::sgr(out, &style).ok();
            self.style = Some(cell.style);
        }

        if self.link != cell.link {
            if self.link.is_some() {
                ansi::hyperlink_close(out).ok();
                self.link = None;
            }
            if let Some(id) = cell.link {
                if let Some(url) = screen.resolve_link(id) {
                    ansi::hyperlink_open(out, url).ok();
                    self.link = Some(id);
                }
            }
        }

        out.push_str(cell.symbol());

        let next = u32::from(x) + u32::from(cell.width());
        self.cursor = if next < u32::from(screen.columns()) {
            u16::try_from(next).ok().map(|nx| (nx, y))
        } else if self.inline {
            Some((screen.columns(), y))
        } else {
            None
        };
    }

    /// Move the cursor to `(x, y)` unless it is already there.
    pub fn move_to(&mut self, out: &mut OutputBuffer, x: u16, y: u16) {
        if self.cursor == Some((x, y)) {
            return;
        }
        if self.inline {
            self.move_relative(out, x, y);
        } else {
            ansi::cursor_to(out, x, y).ok();
        }
        self.cursor = Some((x, y));
    }

    /// An unknown position is taken to be on the target row, column unknown.
    fn move_relative(&self, out: &mut OutputBuffer, x: u16, y: u16) {
        let (mut cx, cy) = self.cursor.unwrap_or((u16::MAX, y));
        if y > cy {
            ansi::next_lines(out, y - cy).ok();
            cx = 0;
        } else if y < cy {
            ansi::cursor_up(out, cy - y).ok();
        }
        if cx != x {
            if x == 0 {
                out.push_str("\r");
            } else {
                ansi::cursor_column(out, x).ok();
            }
        }
    }

    /// Inline mode: return to column 0 of the region's first row.
    pub fn home(&mut self, out: &mut OutputBuffer) {
        if let Some((_, cy)) = self.cursor {
            if cy > 0 {
                ansi::cursor_up(out, cy).ok();
            }
        }
        out.push_str("\r");
        self.cursor = Some((0, 0));
    }

    /// End of frame: close any open hyperlink and return the pen to the
    /// default style.
    pub fn finish(&mut self, out: &mut OutputBuffer) {
        if self.link.take().is_some() {
            ansi::hyperlink_close(out).ok();
        }
        if self.style != Some(StyleId::DEFAULT) {
            ansi::reset(out).ok();
            self.style = Some(StyleId::DEFAULT);
        }
    }
}

impl Default for CellWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    fn out_str(out: &OutputBuffer) -> String {
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    fn screen() -> Screen {
        Screen::new(10, 3).unwrap()
    }

    // ── OutputBuffer ─────────────────────────────────────────────────────

    #[test]
    fn output_buffer_new_is_empty() {
        let buf = OutputBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn output_buffer_write_trait() {
        let mut buf = OutputBuffer::new();
        write!(buf, "hello {}", 42).unwrap();
        assert_eq!(buf.as_bytes(), b"hello 42");
    }

    #[test]
    fn flush_to_writes_and_clears() {
        let mut buf = OutputBuffer::new();
        buf.push_str("frame");
        let mut sink = Vec::new();
        buf.flush_to(&mut sink).unwrap();
        assert_eq!(sink, b"frame");
        assert!(buf.is_empty());
    }

    #[test]
    fn flush_empty_writes_nothing() {
        let mut buf = OutputBuffer::new();
        let mut sink = Vec::new();
        buf.flush_to(&mut sink).unwrap();
        assert!(sink.is_empty());
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_flush_still_clears() {
        let mut buf = OutputBuffer::new();
        buf.push_str("x");
        assert!(buf.flush_to(&mut Broken).is_err());
        assert!(buf.is_empty());
    }

    // ── CellWriter: cursor ───────────────────────────────────────────────

    #[test]
    fn first_cell_positions_cursor() {
        let s = screen();
        let mut out = OutputBuffer::new();
        let mut cw = CellWriter::new();
        cw.assume_default_style();
        cw.render_cell(&mut out, &s, 3, 1, &Cell::new('a', StyleId::DEFAULT));
        assert_eq!(out_str(&out), "\x1b[2;4Ha");
        assert_eq!(cw.cursor(), Some((4, 1)));
    }

    #[test]
    fn sequential_cells_skip_cursor_moves() {
        let s = screen();
        let mut out = OutputBuffer::new();
        let mut cw = CellWriter::new();
        cw.assume_default_style();
        cw.render_cell(&mut out, &s, 0, 0, &Cell::new('a', StyleId::DEFAULT));
        cw.render_cell(&mut out, &s, 1, 0, &Cell::new('b', StyleId::DEFAULT));
        cw.render_cell(&mut out, &s, 5, 0, &Cell::new('c', StyleId::DEFAULT));
        assert_eq!(out_str(&out), "\x1b[1;1Hab\x1b[1;6Hc");
    }

    #[test]
    fn wide_glyph_advances_two_columns() {
        let mut s = screen();
        s.set_text(0, 0, "世x", StyleId::DEFAULT);
        let mut out = OutputBuffer::new();
        let mut cw = CellWriter::new();
        cw.assume_default_style();
        for x in 0..3 {
            cw.render_cell(&mut out, &s, x, 0, &s.cell(x, 0));
        }
        assert_eq!(out_str(&out), "\x1b[1;1H世x");
    }

    #[test]
    fn last_column_makes_cursor_unknown() {
        let s = screen();
        let mut out = OutputBuffer::new();
        let mut cw = CellWriter::new();
        cw.assume_default_style();
        cw.render_cell(&mut out, &s, 9, 0, &Cell::new('z', StyleId::DEFAULT));
        assert_eq!(cw.cursor(), None);
    }

    // ── CellWriter: inline ───────────────────────────────────────────────

    fn inline_writer() -> CellWriter {
        let mut cw = CellWriter::new();
        cw.set_inline(true);
        cw.assume_default_style();
        cw
    }

    #[test]
    fn inline_moves_are_relative() {
        let s = screen();
        let mut out = OutputBuffer::new();
        let mut cw = inline_writer();
        cw.home(&mut out);
        cw.render_cell(&mut out, &s, 0, 0, &Cell::new('a', StyleId::DEFAULT));
        cw.render_cell(&mut out, &s, 4, 0, &Cell::new('b', StyleId::DEFAULT));
        cw.render_cell(&mut out, &s, 2, 2, &Cell::new('c', StyleId::DEFAULT));
        cw.render_cell(&mut out, &s, 0, 1, &Cell::new('d', StyleId::DEFAULT));
        assert_eq!(out_str(&out), "\ra\x1b[5Gb\r\n\n\x1b[3Gc\x1b[1A\rd");
        assert_eq!(cw.cursor(), Some((1, 1)));
    }

    #[test]
    fn inline_last_column_keeps_row() {
        let s = screen();
        let mut out = OutputBuffer::new();
        let mut cw = inline_writer();
        cw.home(&mut out);
        cw.render_cell(&mut out, &s, 9, 0, &Cell::new('z', StyleId::DEFAULT));
        assert_eq!(cw.cursor(), Some((10, 0)));

        out.clear();
        cw.move_to(&mut out, 0, 1);
        assert_eq!(out_str(&out), "\r\n");
    }

    #[test]
    fn home_climbs_back_to_first_row() {
        let mut out = OutputBuffer::new();
        let mut cw = inline_writer();
        cw.home(&mut out);
        cw.move_to(&mut out, 3, 2);
        out.clear();

        cw.home(&mut out);
        assert_eq!(out_str(&out), "\x1b[2A\r");
        assert_eq!(cw.cursor(), Some((0, 0)));
    }

    #[test]
    fn switching_mode_forgets_cursor() {
        let mut out = OutputBuffer::new();
        let mut cw = CellWriter::new();
        cw.move_to(&mut out, 1, 1);
        cw.set_inline(true);
        assert!(cw.is_inline());
        assert_eq!(cw.cursor(), None);
    }

    // ── CellWriter: style ────────────────────────────────────────────────

    #[test]
    fn style_emitted_once_per_run() {
        let mut s = screen();
        let red = s.style(&Style::new().fg(Color::rgb(255, 0, 0))).unwrap();
        let mut out = OutputBuffer::new();
        let mut cw = CellWriter::new();
        cw.assume_default_style();
        cw.render_cell(&mut out, &s, 0, 0, &Cell::new('a', red));
        cw.render_cell(&mut out, &s, 1, 0, &Cell::new('b', red));
        cw.render_cell(&mut out, &s, 2, 0, &Cell::new('c', StyleId::DEFAULT));
        assert_eq!(out_str(&out), "\x1b[1;1H\x1b[0;38;2;255;0;0mab\x1b[0mc");
    }

    #[test]
    fn unknown_style_emits_reset() {
        let s = screen();
        let mut out = OutputBuffer::new();
        let mut cw = CellWriter::new();
        cw.render_cell(&mut out, &s, 0, 0, &Cell::new('a', StyleId::DEFAULT));
        assert_eq!(out_str(&out), "\x1b[1;1H\x1b[0ma");
    }

    #[test]
    fn finish_resets_styled_pen() {
        let mut s = screen();
        let bold = s.style(&Style::new().bold()).unwrap();
        let mut out = OutputBuffer::new();
        let mut cw = CellWriter::new();
        cw.assume_default_style();
        cw.render_cell(&mut out, &s, 0, 0, &Cell::new('a', bold));
        out.clear();
        cw.finish(&mut out);
        assert_eq!(out_str(&out), "\x1b[0m");

        out.clear();
        cw.finish(&mut out);
        assert!(out.is_empty());
    }

    // ── CellWriter: links ────────────────────────────────────────────────

    #[test]
    fn linked_run_is_wrapped_once() {
        let mut s = screen();
        let link = s.hyperlink("https://example.com").unwrap();
        let mut out = OutputBuffer::new();
        let mut cw = CellWriter::new();
        cw.assume_default_style();
        let a = Cell::new('a', StyleId::DEFAULT).with_link(Some(link));
        let b = Cell::new('b', StyleId::DEFAULT).with_link(Some(link));
        cw.render_cell(&mut out, &s, 0, 0, &a);
        cw.render_cell(&mut out, &s, 1, 0, &b);
        cw.render_cell(&mut out, &s, 2, 0, &Cell::new('c', StyleId::DEFAULT));
        cw.finish(&mut out);
        assert_eq!(
            out_str(&out),
            "\x1b[1;1H\x1b]8;;https://example.com\x1b\\ab\x1b]8;;\x1b\\c"
        );
    }

    #[test]
    fn finish_closes_open_link() {
        let mut s = screen();
        let link = s.hyperlink("https://example.com").unwrap();
        let mut out = OutputBuffer::new();
        let mut cw = CellWriter::new();
        cw.assume_default_style();
        cw.render_cell(&mut out, &s, 0, 0, &Cell::new('a', StyleId::DEFAULT).with_link(Some(link)));
        out.clear();
        cw.finish(&mut out);
        assert_eq!(out_str(&out), "\x1b]8;;\x1b\\");
    }
}
