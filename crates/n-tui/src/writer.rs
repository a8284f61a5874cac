// SPDX-License-Identifier: MIT
//
// Differential writer: reproduces a Screen on a real terminal.
//
// Instead of redrawing the whole screen every frame, the writer keeps a
// shadow copy of the last grid it successfully flushed and emits escape
// sequences only for cells that differ. A keystroke in a typical UI changes
// one or two rows; the frame costs a few dozen bytes instead of a repaint.
//
// The pipeline per frame:
//
//   1. The application paints a Screen.
//   2. Writer::render() compares it row by row against the shadow.
//   3. Changed cells go through CellWriter, which skips redundant cursor
//      moves, style changes and hyperlink markers.
//   4. Everything accumulates in one OutputBuffer, wrapped in synchronized
//      output markers, and reaches the sink in a single write.
//   5. Only after the write succeeds does the shadow become the new grid.
//
// A fresh writer (or one that was cleared or resized) starts from a blank
// shadow after erasing the display, so untouched default cells cost
// nothing even on the first frame. A frame with no differences writes zero
// bytes: no sync markers, no reset, nothing.
//
// The writer also owns the idempotent terminal modes (alternate screen,
// mouse, focus, bracketed paste) and the cursor visibility and shape, so
// close() can put back exactly what was changed and nothing else. Like the
// shadow, the recorded cursor state only changes once its bytes are out.
//
// Inline rendering (`RenderOptions::inline`) draws the grid where the cursor
// is instead of on an erased screen, leaving scrollback alone. A full
// repaint climbs back to the region's first row, erases below, and lays the
// rows out with CR LF so the region scrolls into existence at the bottom of
// the terminal. Diff frames move relatively from there.
//
// Style and link ids are only meaningful next to the tables of the screen
// that issued them, so the shadow remembers the screen's id and any other
// screen gets a full repaint.

use std::io::Write;

use tracing::{debug, trace, warn};

use crate::ansi::{self, CursorShape};
use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::output::{CellWriter, OutputBuffer};
use crate::screen::Screen;
use crate::subscription::{SubscriptionId, Subscribers};

// ─── RenderStats ─────────────────────────────────────────────────────────────

/// Statistics from a render pass, for profiling and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Cells that differed from the shadow and were emitted.
    pub cells_rendered: usize,
    /// Cells that matched the shadow (or were covered by a wide glyph).
    pub cells_skipped: usize,
    /// Bytes handed to the sink.
    pub bytes_written: usize,
}

impl RenderStats {
    /// Total cells processed (rendered + skipped).
    #[inline]
    #[must_use]
    pub const fn total_cells(&self) -> usize {
        self.cells_rendered + self.cells_skipped
    }
}

// ─── Options ─────────────────────────────────────────────────────────────────

/// Per-frame requests. `None` leaves the current cursor state alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    /// Where to leave the cursor after the frame.
    pub cursor: Option<(u16, u16)>,
    pub cursor_visible: Option<bool>,
    pub cursor_shape: Option<CursorShape>,
    /// Draw below the current line with relative moves instead of on an
    /// erased screen. Changing it between frames forces a full repaint.
    pub inline: bool,
}

impl RenderOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cursor: None,
            cursor_visible: None,
            cursor_shape: None,
            inline: false,
        }
    }

    #[must_use]
    pub const fn inline(self, inline: bool) -> Self {
        Self { inline, ..self }
    }

    #[must_use]
    pub const fn cursor(self, x: u16, y: u16) -> Self {
        Self {
            cursor: Some((x, y)),
            ..self
        }
    }

    #[must_use]
    pub const fn visible(self, visible: bool) -> Self {
        Self {
            cursor_visible: Some(visible),
            ..self
        }
    }

    #[must_use]
    pub const fn shape(self, shape: CursorShape) -> Self {
        Self {
            cursor_shape: Some(shape),
            ..self
        }
    }
}

/// Writer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Wrap every frame in DEC 2026 begin/end markers.
    pub synchronized_output: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            synchronized_output: true,
        }
    }
}

/// Which terminal modes the writer has switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Modes {
    pub alt_screen: bool,
    pub mouse_tracking: bool,
    pub focus_tracking: bool,
    pub bracketed_paste: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    AltScreen,
    Mouse,
    Focus,
    Paste,
}

impl Mode {
    const fn name(self) -> &'static str {
        match self {
            Self::AltScreen => "alt_screen",
            Self::Mouse => "mouse_tracking",
            Self::Focus => "focus_tracking",
            Self::Paste => "bracketed_paste",
        }
    }
}

impl Modes {
    const fn flag_mut(&mut self, mode: Mode) -> &mut bool {
        match mode {
            Mode::AltScreen => &mut self.alt_screen,
            Mode::Mouse => &mut self.mouse_tracking,
            Mode::Focus => &mut self.focus_tracking,
            Mode::Paste => &mut self.bracketed_paste,
        }
    }
}

// ─── Shadow ──────────────────────────────────────────────────────────────────

/// The grid the terminal is known to display.
struct Shadow {
    /// [`Screen::id`] whose tables the cells' ids refer to.
    screen: u64,
    columns: u16,
    rows: u16,
    cells: Vec<Cell>,
}

impl Shadow {
    fn blank(screen: u64, columns: u16, rows: u16) -> Self {
        Self {
            screen,
            columns,
            rows,
            cells: vec![Cell::EMPTY; usize::from(columns) * usize::from(rows)],
        }
    }

    fn row(&self, y: u16) -> Option<&[Cell]> {
        let width = usize::from(self.columns);
        let start = usize::from(y) * width;
        self.cells.get(start..start + width)
    }

    fn matches(&self, screen: &Screen) -> bool {
        self.screen == screen.id() && self.columns == screen.columns() && self.rows == screen.rows()
    }
}

/// Cursor visibility and shape sent in a frame, recorded once it is out.
type CursorChange = (Option<bool>, Option<CursorShape>);

type ResizeHandler = Box<dyn FnMut(u16, u16)>;

// ─── Writer ──────────────────────────────────────────────────────────────────

/// Differential renderer bound to an output sink.
///
/// The shadow follows one [`Screen`] at a time. Rendering a different screen
/// (or a clone) repaints in full, because its style and link ids come from
/// other tables.
///
/// # Usage
///
/// ```no_run
/// use n_tui::screen::Screen;
/// use n_tui::style::StyleId;
/// use n_tui::writer::{RenderOptions, Writer};
///
/// let mut screen = Screen::new(80, 24)?;
/// let mut writer = Writer::new(std::io::stdout(), 80, 24);
///
/// screen.set_text(0, 0, "hello", StyleId::DEFAULT);
/// let stats = writer.render(&screen, &RenderOptions::default())?;
/// // stats.cells_rendered tells you how much work was done.
/// writer.close()?;
/// # Ok::<(), n_tui::Error>(())
/// ```
pub struct Writer<W: Write> {
    sink: Option<W>,
    output: OutputBuffer,
    cells: CellWriter,
    shadow: Option<Shadow>,
    config: WriterConfig,
    modes: Modes,
    cursor_visible: Option<bool>,
    cursor_shape: Option<CursorShape>,
    columns: u16,
    rows: u16,
    resize_handlers: Subscribers<ResizeHandler>,
}

impl<W: Write> Writer<W> {
    /// A writer for a `columns × rows` terminal. Nothing is written until
    /// the first render or mode change.
    pub fn new(sink: W, columns: u16, rows: u16) -> Self {
        Self::with_config(sink, columns, rows, WriterConfig::default())
    }

    pub fn with_config(sink: W, columns: u16, rows: u16, config: WriterConfig) -> Self {
        Self {
            sink: Some(sink),
            output: OutputBuffer::new(),
            cells: CellWriter::new(),
            shadow: None,
            config,
            modes: Modes::default(),
            cursor_visible: None,
            cursor_shape: None,
            columns,
            rows,
            resize_handlers: Subscribers::new(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn columns(&self) -> u16 {
        self.columns
    }

    #[inline]
    #[must_use]
    pub const fn rows(&self) -> u16 {
        self.rows
    }

    #[inline]
    #[must_use]
    pub const fn modes(&self) -> Modes {
        self.modes
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> WriterConfig {
        self.config
    }

    #[inline]
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    /// The sink, for inspection. `None` after [`close`](Self::close).
    #[must_use]
    pub const fn sink(&self) -> Option<&W> {
        self.sink.as_ref()
    }

    pub(crate) const fn sink_mut(&mut self) -> Option<&mut W> {
        self.sink.as_mut()
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Bring the terminal in line with `screen`.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`] after [`close`](Self::close). [`Error::Io`] when the
    /// sink fails; the shadow is then discarded, so the next render repaints
    /// everything.
    pub fn render(&mut self, screen: &Screen, opts: &RenderOptions) -> Result<RenderStats> {
        if self.sink.is_none() {
            return Err(Error::Closed);
        }
        self.output.clear();

        if opts.inline != self.cells.is_inline() {
            debug!(target: "n_tui::writer", inline = opts.inline, "positioning_changed");
            self.cells.set_inline(opts.inline);
            self.shadow = None;
        }

        let columns = screen.columns();
        let rows = screen.rows();
        let mut stats = RenderStats::default();

        let sync_mark = if self.config.synchronized_output {
            ansi::begin_sync(&mut self.output).ok();
            self.output.len()
        } else {
            0
        };

        let full = !self.shadow.as_ref().is_some_and(|s| s.matches(screen));
        if full {
            debug!(target: "n_tui::writer", columns, rows, inline = opts.inline, "full_repaint");
            if opts.inline {
                self.cells.home(&mut self.output);
                ansi::reset(&mut self.output).ok();
                ansi::clear_below(&mut self.output).ok();
            } else {
                ansi::reset(&mut self.output).ok();
                ansi::clear_screen(&mut self.output).ok();
                self.cells.invalidate();
            }
            self.cells.assume_default_style();
            self.shadow = Some(Shadow::blank(screen.id(), columns, rows));
        }
        // Inline repaints visit every row so the region exists below the
        // prompt even where it is blank.
        let lay_out_rows = full && opts.inline;

        // ── Diff loop ──
        if let Some(shadow) = &self.shadow {
            for y in 0..rows {
                if lay_out_rows && y > 0 {
                    self.cells.move_to(&mut self.output, 0, y);
                }
                let (Some(current), Some(previous)) = (screen.row(y), shadow.row(y)) else {
                    continue;
                };
                if current == previous {
                    stats.cells_skipped += current.len();
                    continue;
                }
                for ((x, cell), old) in (0..columns).zip(current).zip(previous) {
                    if cell == old || cell.is_continuation() {
                        stats.cells_skipped += 1;
                        continue;
                    }
                    self.cells.render_cell(&mut self.output, screen, x, y, cell);
                    stats.cells_rendered += 1;
                }
            }
        }
        if stats.cells_rendered > 0 {
            self.cells.finish(&mut self.output);
        }

        let cursor = self.apply_cursor(opts);

        if self.output.len() == sync_mark {
            // Nothing to say: not even the sync markers go out.
            self.output.clear();
        } else if self.config.synchronized_output {
            ansi::end_sync(&mut self.output).ok();
        }
        stats.bytes_written = self.output.len();

        self.flush()?;

        if let Some(shadow) = &mut self.shadow {
            shadow.cells.copy_from_slice(screen.cells());
        }
        let (visible, shape) = cursor;
        if visible.is_some() {
            self.cursor_visible = visible;
        }
        if shape.is_some() {
            self.cursor_shape = shape;
        }
        trace!(
            target: "n_tui::writer",
            rendered = stats.cells_rendered,
            skipped = stats.cells_skipped,
            bytes = stats.bytes_written,
            "render"
        );
        Ok(stats)
    }

    /// Cursor position, then visibility, then shape; each only on change.
    /// Returns what was emitted, for the caller to record after the flush.
    fn apply_cursor(&mut self, opts: &RenderOptions) -> CursorChange {
        if let Some((x, y)) = opts.cursor {
            self.cells.move_to(&mut self.output, x, y);
        }
        let visible = opts
            .cursor_visible
            .filter(|&visible| self.cursor_visible != Some(visible));
        if let Some(visible) = visible {
            if visible {
                ansi::cursor_show(&mut self.output).ok();
            } else {
                ansi::cursor_hide(&mut self.output).ok();
            }
        }
        let shape = opts
            .cursor_shape
            .filter(|&shape| self.cursor_shape != Some(shape));
        if let Some(shape) = shape {
            ansi::set_cursor_shape(&mut self.output, shape).ok();
        }
        (visible, shape)
    }

    /// Forget the shadow; the next render erases the display and repaints.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`] after [`close`](Self::close).
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.shadow = None;
        Ok(())
    }

    /// Pass `text` straight to the sink. The writer no longer trusts its idea
    /// of the cursor and pen afterwards.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`] after close, [`Error::Io`] if the sink fails.
    pub fn write_raw(&mut self, text: &str) -> Result<()> {
        self.ensure_open()?;
        if text.is_empty() {
            return Ok(());
        }
        self.output.clear();
        self.output.push_str(text);
        self.cells.invalidate();
        self.flush()
    }

    // ─── Modes ───────────────────────────────────────────────────────────

    /// Switch to the alternate screen buffer.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`] after close, [`Error::Io`] if the sink fails.
    pub fn enter_alt_screen(&mut self) -> Result<()> {
        self.set_mode(Mode::AltScreen, true)
    }

    /// Return to the main screen buffer.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`] after close, [`Error::Io`] if the sink fails.
    pub fn exit_alt_screen(&mut self) -> Result<()> {
        self.set_mode(Mode::AltScreen, false)
    }

    /// Report presses, releases, drags and motion in SGR encoding.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`] after close, [`Error::Io`] if the sink fails.
    pub fn enable_mouse_tracking(&mut self) -> Result<()> {
        self.set_mode(Mode::Mouse, true)
    }

    /// # Errors
    ///
    /// [`Error::Closed`] after close, [`Error::Io`] if the sink fails.
    pub fn disable_mouse_tracking(&mut self) -> Result<()> {
        self.set_mode(Mode::Mouse, false)
    }

    /// # Errors
    ///
    /// [`Error::Closed`] after close, [`Error::Io`] if the sink fails.
    pub fn enable_focus_tracking(&mut self) -> Result<()> {
        self.set_mode(Mode::Focus, true)
    }

    /// # Errors
    ///
    /// [`Error::Closed`] after close, [`Error::Io`] if the sink fails.
    pub fn disable_focus_tracking(&mut self) -> Result<()> {
        self.set_mode(Mode::Focus, false)
    }

    /// # Errors
    ///
    /// [`Error::Closed`] after close, [`Error::Io`] if the sink fails.
    pub fn enable_bracketed_paste(&mut self) -> Result<()> {
        self.set_mode(Mode::Paste, true)
    }

    /// # Errors
    ///
    /// [`Error::Closed`] after close, [`Error::Io`] if the sink fails.
    pub fn disable_bracketed_paste(&mut self) -> Result<()> {
        self.set_mode(Mode::Paste, false)
    }

    fn set_mode(&mut self, mode: Mode, on: bool) -> Result<()> {
        self.ensure_open()?;
        if *self.modes.flag_mut(mode) == on {
            return Ok(());
        }
        self.output.clear();
        emit_mode(&mut self.output, mode, on);
        if mode == Mode::AltScreen {
            // Different buffer, different contents.
            self.shadow = None;
            self.cells.invalidate();
        }
        self.flush()?;
        *self.modes.flag_mut(mode) = on;
        debug!(target: "n_tui::writer", mode = mode.name(), on, "mode");
        Ok(())
    }

    // ─── Resize ──────────────────────────────────────────────────────────

    /// Tell the writer the terminal is now `columns × rows`. On an actual
    /// change the shadow is dropped and every resize handler runs, in
    /// registration order.
    ///
    /// # Errors
    ///
    /// [`Error::Closed`] after [`close`](Self::close).
    pub fn notify_resize(&mut self, columns: u16, rows: u16) -> Result<()> {
        self.ensure_open()?;
        if (columns, rows) == (self.columns, self.rows) {
            return Ok(());
        }
        debug!(target: "n_tui::writer", columns, rows, "resize");
        self.columns = columns;
        self.rows = rows;
        self.shadow = None;
        for handler in self.resize_handlers.iter_mut() {
            handler(columns, rows);
        }
        Ok(())
    }

    /// Register a resize handler.
    pub fn on_resize(&mut self, handler: impl FnMut(u16, u16) + 'static) -> SubscriptionId {
        self.resize_handlers.add(Box::new(handler))
    }

    /// Remove a resize handler. Returns `false` if it was not registered.
    pub fn unsubscribe_resize(&mut self, id: SubscriptionId) -> bool {
        self.resize_handlers.remove(id)
    }

    // ─── Shutdown ────────────────────────────────────────────────────────

    /// Undo every mode this writer switched on, restore the cursor, flush,
    /// and release the sink. Calling it again does nothing.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the final flush fails. The sink is released anyway.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };

        self.output.clear();
        // Inline: leave the cursor on a fresh line below the region.
        if self.cells.is_inline() {
            if let Some(rows) = self.shadow.as_ref().map(|s| s.rows) {
                self.cells.move_to(&mut self.output, 0, rows);
            }
        }
        for mode in [Mode::Mouse, Mode::Focus, Mode::Paste] {
            if *self.modes.flag_mut(mode) {
                emit_mode(&mut self.output, mode, false);
            }
        }
        if self.cursor_visible == Some(false) {
            ansi::cursor_show(&mut self.output).ok();
        }
        if self.cursor_shape.is_some_and(|s| s != CursorShape::Default) {
            ansi::set_cursor_shape(&mut self.output, CursorShape::Default).ok();
        }
        if self.modes.alt_screen {
            emit_mode(&mut self.output, Mode::AltScreen, false);
        }

        self.modes = Modes::default();
        self.cursor_visible = None;
        self.cursor_shape = None;
        self.shadow = None;
        self.resize_handlers.clear();

        let result = self.output.flush_to(&mut sink);
        debug!(target: "n_tui::writer", ok = result.is_ok(), "close");
        result.map_err(Error::from)
    }

    /// Alias for [`close`](Self::close).
    ///
    /// # Errors
    ///
    /// See [`close`](Self::close).
    pub fn end(&mut self) -> Result<()> {
        self.close()
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn ensure_open(&self) -> Result<()> {
        if self.sink.is_none() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Send the output buffer. A failed write leaves the terminal in an
    /// unknown state, so the shadow and the pen tracking go with it.
    fn flush(&mut self) -> Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Err(Error::Closed);
        };
        if let Err(err) = self.output.flush_to(sink) {
            warn!(target: "n_tui::writer", error = %err, "write_failed");
            self.shadow = None;
            self.cells.invalidate();
            return Err(err.into());
        }
        Ok(())
    }
}

impl<W: Write> Drop for Writer<W> {
    fn drop(&mut self) {
        self.close().ok();
    }
}

fn emit_mode(out: &mut OutputBuffer, mode: Mode, on: bool) {
    let result = match (mode, on) {
        (Mode::AltScreen, true) => ansi::enter_alt_screen(out),
        (Mode::AltScreen, false) => ansi::exit_alt_screen(out),
        (Mode::Mouse, true) => ansi::enable_mouse(out),
        (Mode::Mouse, false) => ansi::disable_mouse(out),
        (Mode::Focus, true) => ansi::enable_focus_reporting(out),
        (Mode::Focus, false) => ansi::disable_focus_reporting(out),
        (Mode::Paste, true) => ansi::enable_bracketed_paste(out),
        (Mode::Paste, false) => ansi::disable_bracketed_paste(out),
    };
    result.ok();
}

// ─── Tests ───────────────────────────────────────────────────────────────────
