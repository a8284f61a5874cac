// SPDX-License-Identifier: MIT
//
// n-tui-demo: a live event viewer that exercises the whole engine.
//
// Every input event the decoder produces is logged on screen with its key
// name and raw bytes. The frame around it shows off the drawing side:
// interned styles, a rounded box, clipped text, a wide-glyph sample and an
// OSC 8 hyperlink. Type, click, scroll, paste, resize. Ctrl-Q to quit.
//
//   stdin → StdinReader → Decoder → on_event → Demo
//   Demo::paint → Screen → Writer (diff) → one write per frame → stdout
//
// Logging goes to a file because stdout belongs to the TUI:
//
//   N_TUI_LOG=n_tui=trace N_TUI_LOG_FILE=/tmp/n-tui.log cargo run

use std::collections::VecDeque;
use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, anyhow};
use tracing_subscriber::EnvFilter;

use n_tui::ansi::CursorShape;
use n_tui::color::Color;
use n_tui::event_loop::{Action, App, EventLoop};
use n_tui::input::{Event, KeyCode};
use n_tui::screen::{BoxOptions, LineStyle, Screen};
use n_tui::style::{Style, StyleId, UnderlineStyle};
use n_tui::terminal::Size;
use n_tui::writer::RenderOptions;

/// Entries kept in the scrolling log.
const MAX_LOG_ENTRIES: usize = 200;

/// Ticks between cursor blinks (about 500 ms at 120 Hz).
const BLINK_TICKS: u32 = 60;

const CTLSEQS_URL: &str = "https://invisible-island.net/xterm/ctlseqs/ctlseqs.html";

const HEADER: Style = Style::new()
    .fg(Color::rgb(0, 0, 0))
    .bg(Color::rgb(100, 200, 255))
    .bold();
const HINT: Style = Style::new().fg(Color::rgb(0, 0, 0)).bg(Color::rgb(100, 200, 255));
const LINK: Style = Style::new()
    .fg(Color::rgb(0, 0, 0))
    .bg(Color::rgb(100, 200, 255))
    .underline(UnderlineStyle::Single);
const FRAME: Style = Style::new().fg(Color::rgb(90, 90, 120));
const LINE_NUMBER: Style = Style::new().fg(Color::rgb(80, 80, 80));
const STATUS: Style = Style::new().fg(Color::rgb(0, 0, 0)).bg(Color::rgb(80, 80, 100));

// ─── Demo ───────────────────────────────────────────────────────────────────

struct Demo {
    size: Size,
    log: VecDeque<String>,
    event_count: u64,
    start: Instant,
    cursor_on: bool,
    blink_ticks: u32,
}

impl Demo {
    fn new(size: Size) -> Self {
        Self {
            size,
            log: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            event_count: 0,
            start: Instant::now(),
            cursor_on: true,
            blink_ticks: 0,
        }
    }

    fn push_log(&mut self, msg: String) {
        if self.log.len() >= MAX_LOG_ENTRIES {
            self.log.pop_front();
        }
        self.log.push_back(msg);
    }

    fn paint_header(&self, screen: &mut Screen) {
        let width = screen.columns();
        let header = screen.style(&HEADER).unwrap_or_default();
        let hint_style = screen.style(&HINT).unwrap_or_default();
        let link_style = screen.style(&LINK).unwrap_or_default();

        screen.fill(0, 0, width, 1, ' ', header);
        let title = format!(
            " n-tui demo │ {}×{} │ {} events │ {:.1}s │ ",
            self.size.columns,
            self.size.rows,
            self.event_count,
            self.start.elapsed().as_secs_f64()
        );
        let used = screen.set_text(0, 0, &title, header);

        // OSC 8 hyperlink to the xterm control sequence reference.
        let label = "ctlseqs";
        let written = screen.set_text(used, 0, label, link_style);
        if let Ok(link) = screen.hyperlink(CTLSEQS_URL) {
            for x in used..used + written {
                screen.set_hyperlink(x, 0, Some(link));
            }
        }

        let hint = "Ctrl-Q to quit ";
        #[allow(clippy::cast_possible_truncation)] // short literal
        let hint_x = width.saturating_sub(hint.len() as u16);
        if hint_x > used + written {
            screen.set_text(hint_x, 0, hint, hint_style);
        }
    }

    fn paint_log(&self, screen: &mut Screen) {
        let width = screen.columns();
        let height = screen.rows();
        let frame = screen.style(&FRAME).unwrap_or_default();
        let number_style = screen.style(&LINE_NUMBER).unwrap_or_default();

        let box_height = height.saturating_sub(2);
        screen.draw_box(
            0,
            1,
            width,
            box_height,
            &BoxOptions {
                line: LineStyle::Rounded,
                style: frame,
                ..BoxOptions::default()
            },
        );
        screen.set_text(2, 1, " events · 世界 ", frame);

        // Interior only: long entries are cut at the border.
        let (x1, y1) = (1, 2);
        let (x2, y2) = (width.saturating_sub(1), 1 + box_height.saturating_sub(1));
        screen.clip(x1, y1, x2, y2);

        let visible = usize::from(y2.saturating_sub(y1));
        let skip = self.log.len().saturating_sub(visible);
        for (row, entry) in (y1..y2).zip(self.log.iter().skip(skip)) {
            let number = format!("{:>4} ", skip + usize::from(row - y1) + 1);
            let used = screen.set_text(x1, row, &number, number_style);
            let style = screen.style(&entry_style(entry)).unwrap_or_default();
            screen.set_text(x1 + used, row, entry, style);
        }
        screen.unclip();
    }
}

fn paint_status(screen: &mut Screen) {
    let y = screen.rows().saturating_sub(1);
    let style = screen.style(&STATUS).unwrap_or_default();
    screen.fill(0, y, screen.columns(), 1, ' ', style);
    let status = format!(
        " {} styles · {} links interned │ type, click, scroll, paste, resize",
        screen.styles().len(),
        screen.links().len()
    );
    screen.set_text(2, y, &status, style);
}

/// One log line per event: key name plus raw bytes, mouse position, etc.
fn format_event(event: &Event) -> String {
    match event {
        Event::Key(key) => {
            let mut mods = Vec::new();
            if key.ctrl() {
                mods.push("ctrl");
            }
            if key.alt() {
                mods.push("alt");
            }
            if key.shift() {
                mods.push("shift");
            }
            let name = if mods.is_empty() {
                key.name()
            } else {
                format!("{}+{}", mods.join("+"), key.name())
            };
            format!("Key: {name} {:?} raw={}", key.kind, key.raw.escape_ascii())
        }
        Event::Mouse(mouse) => format!(
            "Mouse: {:?} {:?} at ({}, {})",
            mouse.kind, mouse.button, mouse.x, mouse.y
        ),
        Event::Paste(text) => {
            let preview: String = text.chars().take(40).collect();
            let suffix = if text.chars().nth(40).is_some() { "…" } else { "" };
            format!("Paste: {preview:?}{suffix} ({} bytes)", text.len())
        }
        Event::FocusGained => "Focus: gained".into(),
        Event::FocusLost => "Focus: lost".into(),
    }
}

/// Colour by event kind.
fn entry_style(entry: &str) -> Style {
    let fg = if entry.starts_with("Key:") {
        Color::rgb(130, 220, 130)
    } else if entry.starts_with("Mouse:") {
        Color::rgb(180, 180, 255)
    } else if entry.starts_with("Paste:") {
        Color::rgb(255, 200, 100)
    } else if entry.starts_with("Focus:") {
        Color::rgb(200, 150, 255)
    } else if entry.starts_with("Resize:") {
        Color::rgb(255, 255, 100)
    } else {
        Color::rgb(200, 200, 200)
    };
    Style::new().fg(fg)
}

fn is_quit(event: &Event) -> bool {
    matches!(
        event,
        Event::Key(key) if key.ctrl() && matches!(key.code, KeyCode::Char('q' | 'c'))
    )
}

impl App for Demo {
    fn on_event(&mut self, event: &Event) -> Action {
        self.event_count += 1;
        if is_quit(event) {
            return Action::Quit;
        }
        self.push_log(format_event(event));
        Action::Continue
    }

    fn on_resize(&mut self, size: Size) {
        self.size = size;
        self.push_log(format!(
            "Resize: {}×{} ({} cells)",
            size.columns,
            size.rows,
            size.area()
        ));
    }

    fn on_tick(&mut self) -> bool {
        self.blink_ticks += 1;
        if self.blink_ticks >= BLINK_TICKS {
            self.blink_ticks = 0;
            self.cursor_on = !self.cursor_on;
            return true;
        }
        false
    }

    fn paint(&mut self, screen: &mut Screen) {
        if screen.columns() < 20 || screen.rows() < 5 {
            screen.set_text(0, 0, "too small", StyleId::DEFAULT);
            return;
        }
        self.paint_header(screen);
        self.paint_log(screen);
        paint_status(screen);
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions::new()
            .cursor(0, self.size.rows.saturating_sub(1))
            .visible(self.cursor_on)
            .shape(CursorShape::SteadyBlock)
    }
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Install a file subscriber when `N_TUI_LOG` holds a filter. Without it
/// the engine's events go nowhere.
fn init_logging() -> anyhow::Result<()> {
    let Ok(filter) = EnvFilter::try_from_env("N_TUI_LOG") else {
        return Ok(());
    };
    let path = env::var_os("N_TUI_LOG_FILE").map_or_else(|| PathBuf::from("n-tui.log"), PathBuf::from);
    let file = File::create(&path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("failed to install log subscriber")
}

fn main() -> anyhow::Result<()> {
    init_logging()?;

    let size = EventLoop::size();
    let mut app = Demo::new(size);
    app.push_log("Welcome to n-tui. Everything below came through the decoder.".into());
    app.push_log(format!(
        "Terminal: {}×{} ({} cells)",
        size.columns,
        size.rows,
        size.area()
    ));
    app.push_log("Modes: alt screen, SGR mouse, bracketed paste, focus, sync output".into());
    app.push_log(String::new());

    tracing::info!(columns = size.columns, rows = size.rows, "demo_start");
    EventLoop::new()
        .run(&mut app)
        .context("terminal session failed")?;
    tracing::info!(events = app.event_count, "demo_end");
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use n_tui::input::{KeyEvent, Modifiers, MouseButton, MouseEvent, MouseEventKind};

    fn key(code: KeyCode, modifiers: Modifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    fn demo() -> Demo {
        Demo::new(Size {
            columns: 60,
            rows: 12,
        })
    }

    // ── Quit ──────────────────────────────────────────────────────────────

    #[test]
    fn ctrl_q_and_ctrl_c_quit() {
        let mut app = demo();
        assert_eq!(app.on_event(&key(KeyCode::Char('q'), Modifiers::CTRL)), Action::Quit);
        assert_eq!(app.on_event(&key(KeyCode::Char('c'), Modifiers::CTRL)), Action::Quit);
    }

    #[test]
    fn plain_q_is_logged() {
        let mut app = demo();
        assert_eq!(app.on_event(&key(KeyCode::Char('q'), Modifiers::empty())), Action::Continue);
        assert_eq!(app.log.back().map(String::as_str), Some("Key: q Press raw="));
    }

    // ── Formatting ────────────────────────────────────────────────────────

    #[test]
    fn key_lines_carry_modifiers_and_raw_bytes() {
        let event = Event::Key(KeyEvent {
            raw: b"\x1b[1;5A".to_vec(),
            ..KeyEvent::new(KeyCode::Up, Modifiers::CTRL)
        });
        assert_eq!(format_event(&event), "Key: ctrl+up Press raw=\\x1b[1;5A");
    }

    #[test]
    fn mouse_and_paste_lines() {
        let mouse = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down,
            button: MouseButton::Left,
            x: 3,
            y: 7,
            modifiers: Modifiers::empty(),
        });
        assert_eq!(format_event(&mouse), "Mouse: Down Left at (3, 7)");
        assert_eq!(
            format_event(&Event::Paste("hi".into())),
            "Paste: \"hi\" (2 bytes)"
        );
    }

    #[test]
    fn log_is_bounded() {
        let mut app = demo();
        for i in 0..MAX_LOG_ENTRIES + 5 {
            app.push_log(i.to_string());
        }
        assert_eq!(app.log.len(), MAX_LOG_ENTRIES);
        assert_eq!(app.log.front().map(String::as_str), Some("5"));
    }

    // ── Painting ──────────────────────────────────────────────────────────

    #[test]
    fn paint_frames_the_log() {
        let mut app = demo();
        app.push_log("Key: a Press raw=a".into());
        let mut screen = Screen::new(60, 12).unwrap();
        app.paint(&mut screen);

        assert!(screen.text_row(0).starts_with(" n-tui demo"));
        assert!(screen.text_row(1).starts_with('╭'));
        assert!(screen.text_row(2).contains("Key: a"));
        assert!(screen.text_row(10).starts_with('╰'));
        assert_eq!(screen.clip_depth(), 0);
    }

    #[test]
    fn paint_is_stable_across_frames() {
        let mut app = demo();
        let mut screen = Screen::new(60, 12).unwrap();
        app.paint(&mut screen);
        let styles = screen.styles().len();
        screen.clear();
        app.paint(&mut screen);
        assert_eq!(screen.styles().len(), styles);
    }

    #[test]
    fn tiny_screen_does_not_panic() {
        let mut app = demo();
        let mut screen = Screen::new(10, 3).unwrap();
        app.paint(&mut screen);
        assert!(screen.text_row(0).starts_with("too small"));
    }

    #[test]
    fn cursor_blinks_on_tick() {
        let mut app = demo();
        assert!(app.render_options().cursor_visible == Some(true));
        for _ in 1..BLINK_TICKS {
            assert!(!app.on_tick());
        }
        assert!(app.on_tick());
        assert_eq!(app.render_options().cursor_visible, Some(false));
    }
}
