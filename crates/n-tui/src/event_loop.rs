// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Event loop: the host that wires the three engine parts to a real terminal.
//
// Input side: the background reader ships stdin chunks over a channel, the
// decoder turns them into events, and a decoder handler queues them for the
// application. Output side: the application paints a `Screen`, and the
// writer diffs it against the last flushed frame. The two sides only meet
// here, in one loop on one thread.
//
// # Timing
//
// The loop blocks in `recv_timeout`. The timeout is the tick interval
// (120 Hz by default) unless the decoder holds a partial escape sequence,
// in which case it is however long remains until that sequence goes stale.
// So typing wakes the loop immediately, an idle screen costs no CPU beyond
// the tick, and a lone ESC resolves to the Escape key within the decoder's
// escape timeout rather than within a tick.
//
// Frames are only rendered when something made them dirty: input, a
// resize, or `App::on_tick` reporting a change.
//
// # SIGWINCH
//
// The signal handler only sets an atomic flag. The loop checks it every
// iteration, queries the new size, and calls `Writer::notify_resize`. The
// writer's resize hook records the size, and the loop then resizes the
// screen and tells the application.

use std::cell::{Cell, RefCell};
use std::io::{self, Stdout};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::Result;
use crate::decoder::{Decoder, DecoderConfig};
use crate::input::Event;
use crate::reader::StdinReader;
use crate::screen::Screen;
use crate::terminal::{self, Size};
use crate::writer::{RenderOptions, Writer, WriterConfig};

// ─── SIGWINCH ────────────────────────────────────────────────────────────────

/// Set by the SIGWINCH handler, cleared by the loop.
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Install the SIGWINCH handler. Storing to an atomic is async-signal-safe.
#[cfg(unix)]
fn install_sigwinch_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
fn install_sigwinch_handler() {}

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application wants after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// Application interface for the event loop.
///
/// Each iteration the loop calls, in order:
///
/// 1. [`on_event`](App::on_event) for each decoded input event
/// 2. [`on_resize`](App::on_resize) when the terminal size changed
/// 3. [`on_tick`](App::on_tick)
/// 4. [`paint`](App::paint) and [`render_options`](App::render_options)
///    when the frame is dirty
///
/// Only `paint` is required.
pub trait App {
    /// Return [`Action::Quit`] to leave the loop.
    fn on_event(&mut self, _event: &Event) -> Action {
        Action::Continue
    }

    /// The screen has already been resized when this runs.
    fn on_resize(&mut self, _size: Size) {}

    /// Called every iteration, even without input. Return `true` if state
    /// changed and the frame needs repainting.
    fn on_tick(&mut self) -> bool {
        false
    }

    /// Paint the whole frame. The screen is cleared before each call.
    fn paint(&mut self, screen: &mut Screen);

    /// Cursor placement for the frame just painted. Hidden by default.
    fn render_options(&self) -> RenderOptions {
        RenderOptions::new().visible(false)
    }
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// Loop timing and the terminal modes switched on for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct LoopConfig {
    /// Longest wait for input before a tick.
    pub tick_interval: Duration,
    pub alt_screen: bool,
    pub mouse_tracking: bool,
    pub bracketed_paste: bool,
    pub focus_tracking: bool,
    pub decoder: DecoderConfig,
    pub writer: WriterConfig,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_micros(8333), // 120 Hz
            alt_screen: true,
            mouse_tracking: true,
            bracketed_paste: true,
            focus_tracking: true,
            decoder: DecoderConfig::default(),
            writer: WriterConfig::default(),
        }
    }
}

/// Size assumed when stdout is not a terminal.
const FALLBACK_SIZE: Size = Size {
    columns: 80,
    rows: 24,
};

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The terminal event loop.
///
/// # Example
///
/// ```no_run
/// use n_tui::event_loop::{Action, App, EventLoop};
/// use n_tui::input::{Event, KeyCode, KeyEvent};
/// use n_tui::screen::Screen;
/// use n_tui::style::StyleId;
///
/// struct Hello;
///
/// impl App for Hello {
///     fn on_event(&mut self, event: &Event) -> Action {
///         match event {
///             Event::Key(KeyEvent { code: KeyCode::Char('q'), .. }) => Action::Quit,
///             _ => Action::Continue,
///         }
///     }
///
///     fn paint(&mut self, screen: &mut Screen) {
///         screen.set_text(0, 0, "hello, press q", StyleId::DEFAULT);
///     }
/// }
///
/// EventLoop::new().run(&mut Hello)?;
/// # Ok::<(), n_tui::Error>(())
/// ```
#[derive(Debug)]
pub struct EventLoop {
    config: LoopConfig,
}

impl EventLoop {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LoopConfig::default())
    }

    #[must_use]
    pub const fn with_config(config: LoopConfig) -> Self {
        Self { config }
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Current terminal size, or 80×24 when it cannot be queried.
    #[must_use]
    pub fn size() -> Size {
        terminal::size().unwrap_or(FALLBACK_SIZE)
    }

    /// Run until the application returns [`Action::Quit`] or stdin closes.
    ///
    /// Raw mode, the configured modes and the reader thread are all undone
    /// before this returns, whether the loop ended cleanly or with an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns the first I/O failure from raw mode setup, the reader
    /// thread, or the writer. A failure to restore the terminal is only
    /// returned if the loop itself succeeded.
    pub fn run(&mut self, app: &mut impl App) -> Result<()> {
        let size = Self::size();
        let mut decoder = Decoder::with_raw_mode(self.config.decoder)?;
        let mut writer = Writer::with_config(io::stdout(), size.columns, size.rows, self.config.writer);
        let mut screen = Screen::new(size.columns, size.rows)?;

        let queue: Rc<RefCell<Vec<Event>>> = Rc::default();
        let sink = Rc::clone(&queue);
        decoder.on_event(move |event| sink.borrow_mut().push(event.clone()));

        let resized: Rc<Cell<Option<Size>>> = Rc::default();
        let hook = Rc::clone(&resized);
        writer.on_resize(move |columns, rows| hook.set(Some(Size { columns, rows })));

        debug!(
            target: "n_tui::terminal",
            columns = size.columns,
            rows = size.rows,
            raw = decoder.has_raw_mode(),
            "event_loop_start"
        );

        let result = self.enter(&mut writer).and_then(|()| {
            install_sigwinch_handler();
            let (mut reader, rx) = StdinReader::spawn()?;
            let mut session = Session {
                decoder: &mut decoder,
                writer: &mut writer,
                screen: &mut screen,
                queue: &queue,
                resized: &resized,
                tick: self.config.tick_interval,
            };
            let result = session.run(app, &rx);
            reader.stop();
            result
        });

        let closed = writer.close();
        decoder.close();
        debug!(target: "n_tui::terminal", ok = result.is_ok(), "event_loop_end");
        result.and(closed)
    }

    fn enter(&self, writer: &mut Writer<Stdout>) -> Result<()> {
        if self.config.alt_screen {
            writer.enter_alt_screen()?;
        }
        if self.config.mouse_tracking {
            writer.enable_mouse_tracking()?;
        }
        if self.config.bracketed_paste {
            writer.enable_bracketed_paste()?;
        }
        if self.config.focus_tracking {
            writer.enable_focus_tracking()?;
        }
        Ok(())
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed state for one run of the loop.
struct Session<'a> {
    decoder: &'a mut Decoder,
    writer: &'a mut Writer<Stdout>,
    screen: &'a mut Screen,
    queue: &'a RefCell<Vec<Event>>,
    resized: &'a Cell<Option<Size>>,
    tick: Duration,
}

impl Session<'_> {
    fn run(&mut self, app: &mut impl App, rx: &Receiver<Vec<u8>>) -> Result<()> {
        let mut dirty = true; // First frame always renders.

        loop {
            // ── Receive stdin bytes ──────────────────────────────
            match rx.recv_timeout(self.timeout(Instant::now())) {
                Ok(bytes) => self.decoder.feed(&bytes),
                Err(RecvTimeoutError::Timeout) => {
                    self.decoder.expire(Instant::now());
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            }

            let events = std::mem::take(&mut *self.queue.borrow_mut());
            for event in &events {
                if app.on_event(event) == Action::Quit {
                    return Ok(());
                }
            }
            dirty |= !events.is_empty();

            // ── Terminal resize ──────────────────────────────────
            if SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed) {
                if let Some(size) = terminal::size() {
                    self.writer.notify_resize(size.columns, size.rows)?;
                }
            }
            if let Some(size) = self.resized.take() {
                self.screen.resize(size.columns, size.rows)?;
                app.on_resize(size);
                dirty = true;
            }

            // ── Tick ─────────────────────────────────────────────
            dirty |= app.on_tick();

            // ── Render ───────────────────────────────────────────
            if dirty {
                self.screen.clear();
                app.paint(self.screen);
                let stats = self.writer.render(self.screen, &app.render_options())?;
                trace!(
                    target: "n_tui::terminal",
                    rendered = stats.cells_rendered,
                    bytes = stats.bytes_written,
                    "frame"
                );
                dirty = false;
            }
        }
    }

    /// How long to wait for input: the tick, or less if a partial escape
    /// sequence goes stale sooner.
    fn timeout(&self, now: Instant) -> Duration {
        loop_timeout(self.decoder.pending_deadline(), now, self.tick)
    }
}

fn loop_timeout(deadline: Option<Instant>, now: Instant, tick: Duration) -> Duration {
    deadline.map_or(tick, |deadline| {
        deadline.saturating_duration_since(now).min(tick)
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleId;

    // ── LoopConfig ──────────────────────────────────────────────

    #[test]
    fn default_config_is_120fps_with_all_modes() {
        let config = LoopConfig::default();
        assert_eq!(config.tick_interval, Duration::from_micros(8333));
        assert!(config.alt_screen);
        assert!(config.mouse_tracking);
        assert!(config.bracketed_paste);
        assert!(config.focus_tracking);
        assert_eq!(config.decoder, DecoderConfig::default());
    }

    #[test]
    fn custom_config_is_kept() {
        let config = LoopConfig {
            tick_interval: Duration::from_micros(16_667),
            alt_screen: false,
            ..LoopConfig::default()
        };
        let event_loop = EventLoop::with_config(config);
        assert_eq!(*event_loop.config(), config);
    }

    #[test]
    fn size_falls_back_when_unknown() {
        let size = EventLoop::size();
        assert!(size.columns > 0);
        assert!(size.rows > 0);
    }

    // ── Timeout ─────────────────────────────────────────────────

    #[test]
    fn timeout_is_tick_without_pending_input() {
        let tick = Duration::from_millis(8);
        assert_eq!(loop_timeout(None, Instant::now(), tick), tick);
    }

    #[test]
    fn timeout_shrinks_to_escape_deadline() {
        let now = Instant::now();
        let tick = Duration::from_millis(100);
        let deadline = now + Duration::from_millis(25);
        assert_eq!(loop_timeout(Some(deadline), now, tick), Duration::from_millis(25));
    }

    #[test]
    fn timeout_never_exceeds_tick() {
        let now = Instant::now();
        let tick = Duration::from_millis(8);
        let deadline = now + Duration::from_millis(25);
        assert_eq!(loop_timeout(Some(deadline), now, tick), tick);
    }

    #[test]
    fn past_deadline_means_no_wait() {
        let now = Instant::now();
        let deadline = now;
        let later = now + Duration::from_millis(5);
        assert_eq!(
            loop_timeout(Some(deadline), later, Duration::from_millis(8)),
            Duration::ZERO
        );
    }

    // ── SIGWINCH flag ───────────────────────────────────────────

    #[test]
    fn sigwinch_flag_swap() {
        SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
        assert!(SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed));
        assert!(!SIGWINCH_RECEIVED.load(Ordering::Relaxed));
    }

    // ── App trait defaults ──────────────────────────────────────

    struct MinimalApp;
    impl App for MinimalApp {
        fn paint(&mut self, _screen: &mut Screen) {}
    }

    #[test]
    fn app_defaults() {
        let mut app = MinimalApp;
        assert_eq!(app.on_event(&Event::FocusGained), Action::Continue);
        assert!(!app.on_tick());
        app.on_resize(Size {
            columns: 100,
            rows: 50,
        });
        assert_eq!(app.render_options(), RenderOptions::new().visible(false));
    }

    #[test]
    fn paint_draws_into_screen() {
        struct Greeter;
        impl App for Greeter {
            fn paint(&mut self, screen: &mut Screen) {
                screen.set_text(0, 0, "hi", StyleId::DEFAULT);
            }
        }
        let mut screen = Screen::new(10, 2).unwrap();
        Greeter.paint(&mut screen);
        assert!(screen.text_row(0).starts_with("hi"));
    }
}
