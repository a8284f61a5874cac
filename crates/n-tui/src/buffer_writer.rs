// SPDX-License-Identifier: MIT
//
// Rendering into a caller-owned byte buffer.
//
// Some hosts do not hand the engine a file descriptor at all: they own a
// fixed region of memory, let the engine fill it, and ship the bytes
// themselves (a pty multiplexer, a test harness, a remote session). For
// them the sink is a `&mut [u8]`.
//
// `BufferSink` is the `Write` side of that. It never fails: bytes that do
// not fit are counted and dropped, so the diff state stays consistent with
// a full frame and the caller can tell from `byte_length > byte_offset`
// that its buffer was too small.
//
// `BufferWriter` wraps a `Writer<BufferSink>` and starts the buffer over at
// every render and clear, so after `render` the buffer holds exactly that
// frame. Mode toggles made through `writer_mut` append to whatever the
// buffer currently holds.

use tracing::debug;

use crate::error::Result;
use crate::screen::Screen;
use crate::writer::{RenderOptions, RenderStats, Writer, WriterConfig};

// ─── BufferSink ──────────────────────────────────────────────────────────────

/// A bounded [`Write`](std::io::Write) target over a borrowed byte slice.
pub struct BufferSink<'a> {
    buf: &'a mut [u8],
    /// Bytes stored, at most `buf.len()`.
    offset: usize,
    /// Bytes offered since the last reset, stored or not.
    length: usize,
}

impl<'a> BufferSink<'a> {
    #[must_use]
    pub const fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            length: 0,
        }
    }

    /// Bytes actually stored in the buffer.
    #[inline]
    #[must_use]
    pub const fn byte_offset(&self) -> usize {
        self.offset
    }

    /// Bytes written since the last reset, including any that did not fit.
    #[inline]
    #[must_use]
    pub const fn byte_length(&self) -> usize {
        self.length
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.length > self.offset
    }

    /// The stored bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.offset]
    }

    /// Start over at the beginning of the buffer.
    pub const fn reset(&mut self) {
        self.offset = 0;
        self.length = 0;
    }
}

impl std::io::Write for BufferSink<'_> {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        let room = self.buf.len() - self.offset;
        let n = bytes.len().min(room);
        self.buf[self.offset..self.offset + n].copy_from_slice(&bytes[..n]);
        self.offset += n;
        self.length += bytes.len();
        Ok(bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for BufferSink<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferSink")
            .field("capacity", &self.buf.len())
            .field("offset", &self.offset)
            .field("length", &self.length)
            .finish()
    }
}

// ─── BufferWriter ────────────────────────────────────────────────────────────

/// Differential writer whose output lands in a fixed byte buffer.
///
/// # Example
///
/// ```
/// use n_tui::buffer_writer::BufferWriter;
/// use n_tui::screen::Screen;
/// use n_tui::style::StyleId;
/// use n_tui::writer::RenderOptions;
///
/// let mut buf = [0u8; 4096];
/// let mut screen = Screen::new(10, 2)?;
/// let mut writer = BufferWriter::new(&mut buf, 10, 2);
///
/// screen.set_text(0, 0, "hi", StyleId::DEFAULT);
/// writer.render(&screen, &RenderOptions::default())?;
/// assert!(writer.output().ends_with(b"hi\x1b[?2026l"));
/// # Ok::<(), n_tui::Error>(())
/// ```
pub struct BufferWriter<'a> {
    inner: Writer<BufferSink<'a>>,
}

impl<'a> BufferWriter<'a> {
    pub fn new(buf: &'a mut [u8], columns: u16, rows: u16) -> Self {
        Self::with_config(buf, columns, rows, WriterConfig::default())
    }

    pub fn with_config(buf: &'a mut [u8], columns: u16, rows: u16, config: WriterConfig) -> Self {
        Self {
            inner: Writer::with_config(BufferSink::new(buf), columns, rows, config),
        }
    }

    /// Replace the buffer contents with the next frame.
    ///
    /// `stats.bytes_written` is the full frame size. When it exceeds the
    /// buffer, only the first [`byte_offset`](Self::byte_offset) bytes are
    /// kept; the writer still considers the frame delivered.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`](crate::Error::Closed) after [`close`](Self::close).
    pub fn render(&mut self, screen: &Screen, opts: &RenderOptions) -> Result<RenderStats> {
        self.reset_sink();
        let stats = self.inner.render(screen, opts)?;
        if let Some(sink) = self.inner.sink() {
            if sink.is_truncated() {
                debug!(
                    target: "n_tui::writer",
                    stored = sink.byte_offset(),
                    total = sink.byte_length(),
                    "buffer_truncated"
                );
            }
        }
        Ok(stats)
    }

    /// Empty the buffer and forget the shadow; the next render is full.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`](crate::Error::Closed) after [`close`](Self::close).
    pub fn clear(&mut self) -> Result<()> {
        self.inner.clear()?;
        self.reset_sink();
        Ok(())
    }

    /// Release the buffer. Idempotent; offsets read zero afterwards.
    ///
    /// # Errors
    ///
    /// Never fails in practice: the sink cannot report an error.
    pub fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    /// Alias for [`close`](Self::close).
    ///
    /// # Errors
    ///
    /// See [`close`](Self::close).
    pub fn end(&mut self) -> Result<()> {
        self.close()
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Bytes of the current frame stored in the buffer.
    #[must_use]
    pub fn byte_offset(&self) -> usize {
        self.inner.sink().map_or(0, BufferSink::byte_offset)
    }

    /// Bytes the current frame needed, stored or not.
    #[must_use]
    pub fn byte_length(&self) -> usize {
        self.inner.sink().map_or(0, BufferSink::byte_length)
    }

    /// The stored bytes of the current frame. Empty after close.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        self.inner.sink().map_or(&[][..], BufferSink::as_bytes)
    }

    /// The underlying writer, for mode toggles and resize handling.
    pub const fn writer_mut(&mut self) -> &mut Writer<BufferSink<'a>> {
        &mut self.inner
    }

    fn reset_sink(&mut self) {
        if let Some(sink) = self.inner.sink_mut() {
            sink.reset();
        }
    }
}

impl std::fmt::Debug for BufferWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferWriter")
            .field("sink", &self.inner.sink())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::style::{Style, StyleId};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn hello_world(screen: &mut Screen) {
        screen.set_text(0, 0, "Hello", StyleId::DEFAULT);
        screen.set_text(0, 1, "World", StyleId::DEFAULT);
    }

    /// Same frame through a plain `Vec` sink, for comparison.
    fn render_to_vec(screen: &Screen, opts: &RenderOptions) -> Vec<u8> {
        let mut writer = Writer::new(Vec::new(), screen.columns(), screen.rows());
        writer.render(screen, opts).unwrap();
        writer.sink().unwrap().clone()
    }

    // ── BufferSink ───────────────────────────────────────────────────────

    #[test]
    fn sink_stores_what_fits_and_counts_the_rest() {
        let mut buf = [0u8; 4];
        let mut sink = BufferSink::new(&mut buf);
        sink.write_all(b"abc").unwrap();
        sink.write_all(b"def").unwrap();

        assert_eq!(sink.as_bytes(), b"abcd");
        assert_eq!(sink.byte_offset(), 4);
        assert_eq!(sink.byte_length(), 6);
        assert!(sink.is_truncated());

        sink.reset();
        assert_eq!(sink.as_bytes(), b"");
        assert_eq!((sink.byte_offset(), sink.byte_length()), (0, 0));
        assert_eq!(sink.capacity(), 4);
    }

    // ── Render ───────────────────────────────────────────────────────────

    #[test]
    fn output_matches_stream_writer() {
        let mut screen = Screen::new(10, 3).unwrap();
        hello_world(&mut screen);
        let bold = screen.style(&Style::new().bold()).unwrap();
        screen.set_text(0, 2, "Bold", bold);

        let mut buf = vec![0u8; 65_536];
        let mut writer = BufferWriter::new(&mut buf, 10, 3);
        let stats = writer.render(&screen, &RenderOptions::default()).unwrap();

        assert_eq!(writer.output(), render_to_vec(&screen, &RenderOptions::default()));
        assert_eq!(writer.byte_offset(), stats.bytes_written);
        assert_eq!(writer.byte_length(), stats.bytes_written);
        assert!(writer.byte_offset() > 0);
    }

    #[test]
    fn cursor_options_reach_the_buffer() {
        let mut screen = Screen::new(10, 3).unwrap();
        screen.set_text(0, 0, "X", StyleId::DEFAULT);
        let mut buf = [0u8; 1024];
        let mut writer = BufferWriter::new(&mut buf, 10, 3);

        writer
            .render(&screen, &RenderOptions::new().cursor(5, 1).visible(false))
            .unwrap();
        let output = String::from_utf8(writer.output().to_vec()).unwrap();
        assert!(output.contains("\x1b[2;6H\x1b[?25l"));
    }

    #[test]
    fn small_buffer_truncates() {
        let mut screen = Screen::new(80, 24).unwrap();
        let row = "X".repeat(80);
        for y in 0..24 {
            screen.set_text(0, y, &row, StyleId::DEFAULT);
        }
        let mut buf = [0u8; 32];
        let mut writer = BufferWriter::new(&mut buf, 80, 24);

        let stats = writer.render(&screen, &RenderOptions::default()).unwrap();

        assert_eq!(writer.byte_offset(), 32);
        assert!(writer.byte_length() > 32);
        assert_eq!(writer.byte_length(), stats.bytes_written);
        assert_eq!(writer.output().len(), 32);
    }

    #[test]
    fn each_render_replaces_the_previous_frame() {
        let mut screen = Screen::new(10, 3).unwrap();
        screen.set_text(0, 0, "Hello", StyleId::DEFAULT);
        let mut buf = vec![0u8; 65_536];
        let mut writer = BufferWriter::new(&mut buf, 10, 3);

        let first = writer.render(&screen, &RenderOptions::default()).unwrap();

        screen.set_text(0, 0, "ABCDE", StyleId::DEFAULT);
        let second = writer.render(&screen, &RenderOptions::default()).unwrap();
        assert_eq!(writer.output(), b"\x1b[?2026h\x1b[1;1HABCDE\x1b[?2026l");
        assert!(second.bytes_written < first.bytes_written);

        // Nothing changed: the buffer is empty, not a stale copy.
        writer.render(&screen, &RenderOptions::default()).unwrap();
        assert_eq!(writer.byte_offset(), 0);
        assert_eq!(writer.byte_length(), 0);
    }

    #[test]
    fn clear_resets_buffer_and_diff_state() {
        let mut screen = Screen::new(10, 3).unwrap();
        screen.set_text(0, 0, "Hello", StyleId::DEFAULT);
        let mut buf = vec![0u8; 65_536];
        let mut writer = BufferWriter::new(&mut buf, 10, 3);

        let first = writer.render(&screen, &RenderOptions::default()).unwrap();
        writer.clear().unwrap();
        assert_eq!((writer.byte_offset(), writer.byte_length()), (0, 0));

        let again = writer.render(&screen, &RenderOptions::default()).unwrap();
        assert_eq!(again.bytes_written, first.bytes_written);
    }

    #[test]
    fn inline_render_into_buffer() {
        let mut screen = Screen::new(10, 2).unwrap();
        screen.set_text(0, 0, "A", StyleId::DEFAULT);
        screen.set_text(0, 1, "B", StyleId::DEFAULT);
        let mut buf = vec![0u8; 65_536];
        let mut writer = BufferWriter::new(&mut buf, 10, 2);

        writer.render(&screen, &RenderOptions::new().inline(true)).unwrap();
        let output = String::from_utf8(writer.output().to_vec()).unwrap();
        assert!(output.starts_with("\x1b[?2026h"));
        assert!(output.ends_with("\x1b[?2026l"));
        assert!(output.contains("A\r\nB"));
        assert!(!output.contains("\x1b[B"));
    }

    #[test]
    fn mode_toggles_append_to_the_frame() {
        let screen = Screen::new(4, 1).unwrap();
        let mut buf = [0u8; 256];
        let mut writer = BufferWriter::new(&mut buf, 4, 1);

        writer.render(&screen, &RenderOptions::default()).unwrap();
        let frame = writer.byte_offset();
        writer.writer_mut().enable_bracketed_paste().unwrap();
        assert!(writer.output().ends_with(b"\x1b[?2004h"));
        assert_eq!(writer.byte_offset(), frame + 8);
    }

    // ── Close ────────────────────────────────────────────────────────────

    #[test]
    fn close_is_idempotent_and_final() {
        let mut screen = Screen::new(10, 3).unwrap();
        screen.set_text(0, 0, "Hello", StyleId::DEFAULT);
        let mut buf = vec![0u8; 65_536];
        let mut writer = BufferWriter::new(&mut buf, 10, 3);
        writer.render(&screen, &RenderOptions::default()).unwrap();

        writer.close().unwrap();
        writer.close().unwrap();
        assert!(writer.is_closed());
        assert_eq!((writer.byte_offset(), writer.byte_length()), (0, 0));
        assert!(writer.output().is_empty());
        assert!(matches!(
            writer.render(&screen, &RenderOptions::default()),
            Err(Error::Closed)
        ));
        assert!(matches!(writer.clear(), Err(Error::Closed)));
    }

    #[test]
    fn end_is_close() {
        let screen = Screen::new(10, 3).unwrap();
        let mut buf = [0u8; 1024];
        let mut writer = BufferWriter::new(&mut buf, 10, 3);
        writer.end().unwrap();
        assert!(matches!(
            writer.render(&screen, &RenderOptions::default()),
            Err(Error::Closed)
        ));
    }
}
