// SPDX-License-Identifier: MIT
//
// Terminal input parser.
//
// Turns raw terminal bytes into structured events: keys, mouse actions,
// paste content, and focus changes. Understands:
//
// - Legacy CSI sequences (arrows, function keys, editing keys), with the
//   xterm `1;m` / `n;m~` modifier suffixes
// - SS3 sequences (F1-F4 and arrows from some terminals)
// - SGR mouse protocol (press / release / drag / move / scroll)
// - Kitty keyboard protocol (unambiguous codepoints + modifiers)
// - Bracketed paste (accumulates pasted text between delimiters)
// - Focus reporting (terminal gained / lost focus)
// - Alt+key (ESC followed by a key, UTF-8 and control keys included)
// - UTF-8 multi-byte characters
//
// # Design
//
// The parser keeps a small byte buffer because escape sequences can span
// several `read()` calls. Feed bytes with [`Parser::advance`] and take the
// events from the returned `Vec`. After a timeout with no new bytes, call
// [`Parser::flush`] to turn a pending lone ESC into a real Escape keypress.
//
// Input is never dropped. A sequence that is well formed but unknown, or
// one broken by an illegal byte, comes out as a `KeyCode::Unknown` key that
// carries the raw bytes; parsing then resumes at the next byte. Every key
// event records the exact bytes it was decoded from.
//
// Number parsing works directly on `&[u8]`, with no intermediate `String`
// for CSI parameters.

use bitflags::bitflags;
use tracing::trace;

// ─── Event Types ────────────────────────────────────────────────────────────

/// A parsed terminal input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A keyboard event (press, repeat, or release).
    Key(KeyEvent),
    /// A mouse event (button action or movement with position).
    Mouse(MouseEvent),
    /// Bracketed paste content, always delivered whole.
    ///
    /// The terminal wraps clipboard paste with `CSI 200~` / `CSI 201~`
    /// delimiters. The bytes between them are accumulated verbatim and
    /// delivered as a single event, so pasted text is never mistaken for
    /// typed keys.
    Paste(String),
    /// Terminal window gained focus (`CSI I`).
    FocusGained,
    /// Terminal window lost focus (`CSI O`).
    FocusLost,
}

/// A keyboard event with key identity, modifiers, and press state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Which key was pressed.
    pub code: KeyCode,
    /// Active modifier keys (Shift, Alt, Ctrl, etc.).
    pub modifiers: Modifiers,
    /// Press, repeat, or release (Kitty keyboard protocol).
    pub kind: KeyEventKind,
    /// The exact input bytes this event was decoded from.
    pub raw: Vec<u8>,
}

impl KeyEvent {
    /// A key press with no raw bytes attached.
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            raw: Vec::new(),
        }
    }

    /// Lower-case key name: `"a"`, `"世"`, `"enter"`, `"pageup"`, `"f5"`.
    ///
    /// Unknown sequences are named by their escaped raw bytes, for example
    /// `"\\x1b[99x"`.
    #[must_use]
    pub fn name(&self) -> String {
        match self.code {
            KeyCode::Char(' ') => "space".to_owned(),
            KeyCode::Char(ch) => ch.to_string(),
            KeyCode::F(n) => format!("f{n}"),
            KeyCode::Unknown => self.raw.escape_ascii().to_string(),
            code => code.static_name().to_owned(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    #[inline]
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }
}

/// Key press / repeat / release distinction.
///
/// Only the Kitty keyboard protocol reports repeats and releases; every
/// legacy sequence is a [`Press`](KeyEventKind::Press).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyEventKind {
    /// Initial key press (or legacy mode where state is unknown).
    #[default]
    Press,
    /// Key held down long enough to trigger auto-repeat.
    Repeat,
    /// Key released.
    Release,
}

/// Identity of a key.
///
/// Named keys have dedicated variants; printable characters use
/// [`Char`](KeyCode::Char). Function keys F1–F35 use [`F`](KeyCode::F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A Unicode character (printable).
    Char(char),
    // ── Named keys ──────────────────────────────────────────────
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    Insert,
    // ── Navigation ──────────────────────────────────────────────
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    // ── Function keys ───────────────────────────────────────────
    /// F1 through F35.
    F(u8),
    // ── Lock / modifier keys (Kitty protocol) ───────────────────
    CapsLock,
    ScrollLock,
    NumLock,
    PrintScreen,
    Pause,
    Menu,
    /// A well-formed or broken sequence with no known meaning. The event's
    /// `raw` field holds the bytes.
    Unknown,
}

impl KeyCode {
    /// Name for keys whose name does not depend on data.
    const fn static_name(self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Tab => "tab",
            Self::Backspace => "backspace",
            Self::Escape => "escape",
            Self::Delete => "delete",
            Self::Insert => "insert",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Home => "home",
            Self::End => "end",
            Self::PageUp => "pageup",
            Self::PageDown => "pagedown",
            Self::CapsLock => "capslock",
            Self::ScrollLock => "scrolllock",
            Self::NumLock => "numlock",
            Self::PrintScreen => "printscreen",
            Self::Pause => "pause",
            Self::Menu => "menu",
            Self::Char(_) | Self::F(_) | Self::Unknown => "",
        }
    }
}

bitflags! {
    /// Keyboard modifier flags.
    ///
    /// Matches the Kitty keyboard protocol bitmask (also compatible
    /// with xterm CSI modifier encoding where `param = 1 + bitmask`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
        const SUPER = 0b0000_1000;
        const HYPER = 0b0001_0000;
        const META  = 0b0010_0000;
    }
}

/// A mouse event with action, button, 0-based position, and modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// What happened.
    pub kind: MouseEventKind,
    /// Which button (or wheel direction) was involved.
    pub button: MouseButton,
    /// 0-indexed column.
    pub x: u16,
    /// 0-indexed row.
    pub y: u16,
    /// Active modifier keys during the mouse event.
    pub modifiers: Modifiers,
}

impl MouseEvent {
    #[inline]
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    #[inline]
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }
}

/// Mouse event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    /// Button pressed.
    Down,
    /// Button released.
    Up,
    /// Mouse moved while a button is held.
    Drag,
    /// Mouse moved without any button held.
    Move,
    ScrollUp,
    ScrollDown,
    /// Horizontal scroll, e.g. Shift+wheel on some terminals.
    ScrollLeft,
    ScrollRight,
}

/// Mouse button identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    /// No button: plain motion, or a legacy release.
    None,
    WheelUp,
    WheelDown,
    WheelLeft,
    WheelRight,
}

impl MouseButton {
    /// Numeric button code: 0 left, 1 middle, 2 right, 3 none, 4..=7 wheel
    /// up, down, left, right.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Left => 0,
            Self::Middle => 1,
            Self::Right => 2,
            Self::None => 3,
            Self::WheelUp => 4,
            Self::WheelDown => 5,
            Self::WheelLeft => 6,
            Self::WheelRight => 7,
        }
    }
}

// ─── Parser ─────────────────────────────────────────────────────────────────

/// Bracketed paste opening delimiter: `ESC [ 200 ~`
const PASTE_START: &[u8] = b"\x1b[200~";
/// Bracketed paste closing delimiter: `ESC [ 201 ~`
const PASTE_END: &[u8] = b"\x1b[201~";

/// Default limit on buffered bytes of an unfinished (non-paste) sequence.
pub const DEFAULT_MAX_PENDING: usize = 256;

/// Terminal input parser.
///
/// Feed raw bytes via [`advance`](Parser::advance) and collect structured
/// [`Event`]s. The parser buffers incomplete sequences internally and
/// resumes parsing when more bytes arrive.
///
/// # Escape vs escape-sequence ambiguity
///
/// A bare `ESC` byte (0x1B) could be either a standalone Escape keypress
/// or the start of a multi-byte escape sequence. The parser keeps a lone
/// ESC pending. The caller should wait a short timeout and then call
/// [`flush`](Parser::flush) to emit it as a real Escape key event.
///
/// # Byte budget
///
/// An unfinished sequence may hold at most `max_pending` bytes. Beyond
/// that the parser gives up on it: the leading byte is emitted as a key of
/// its own (ESC becomes Escape) and the rest is parsed again. Paste content
/// is exempt; a paste is buffered until its end marker, however long.
pub struct Parser {
    /// Accumulated raw bytes waiting to be parsed.
    buf: Vec<u8>,
    /// When `true`, `buf` holds paste content waiting for the closing
    /// delimiter.
    in_paste: bool,
    /// Paste bytes already searched for the delimiter without a match.
    paste_scanned: usize,
    max_pending: usize,
}

impl Parser {
    /// Create a new parser with the default byte budget.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING)
    }

    #[must_use]
    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            buf: Vec::with_capacity(64),
            in_paste: false,
            paste_scanned: 0,
            max_pending: max_pending.max(1),
        }
    }

    /// Feed raw bytes and return all events that can be parsed.
    ///
    /// Bytes that form an incomplete sequence are kept in the internal
    /// buffer and combined with future [`advance`](Parser::advance) calls.
    pub fn advance(&mut self, data: &[u8]) -> Vec<Event> {
        self.buf.extend_from_slice(data);
        self.drain(false)
    }

    /// Are there unconsumed bytes that might complete with more data?
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty() || self.in_paste
    }

    /// Inside a bracketed paste, waiting for the end marker.
    #[must_use]
    pub const fn in_paste(&self) -> bool {
        self.in_paste
    }

    /// Resolve pending bytes as if no more input is coming.
    ///
    /// A lone ESC becomes an Escape key; whatever followed it is parsed on
    /// its own. An unfinished paste is left alone.
    pub fn flush(&mut self) -> Vec<Event> {
        if self.in_paste {
            return Vec::new();
        }
        self.drain(true)
    }

    /// Drop everything buffered, paste included.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.in_paste = false;
        self.paste_scanned = 0;
    }

    fn drain(&mut self, force: bool) -> Vec<Event> {
        let mut events = Vec::new();
        let mut pos = 0;

        while pos < self.buf.len() {
            // ── Paste mode: scan for closing delimiter ──────────────
            if self.in_paste {
                let content = &self.buf[pos..];
                // Resume where the last scan stopped, minus a possible
                // partial delimiter at its tail.
                let from = self.paste_scanned.saturating_sub(PASTE_END.len() - 1);
                if let Some(offset) = find_subsequence(&content[from..], PASTE_END) {
                    let end = from + offset;
                    let text = String::from_utf8_lossy(&content[..end]).into_owned();
                    events.push(Event::Paste(text));
                    pos += end + PASTE_END.len();
                    self.in_paste = false;
                    self.paste_scanned = 0;
                    continue;
                }
                self.paste_scanned = content.len();
                break;
            }

            let remaining = &self.buf[pos..];

            // ── Paste start: checked before general parsing ─────────
            if remaining.starts_with(PASTE_START) {
                self.in_paste = true;
                self.paste_scanned = 0;
                pos += PASTE_START.len();
                continue;
            }

            // ── Normal parsing ──────────────────────────────────────
            match try_parse(remaining) {
                Parsed::Event(event, consumed) => {
                    events.push(attach_raw(event, &remaining[..consumed]));
                    pos += consumed;
                }
                Parsed::Incomplete if !force && remaining.len() <= self.max_pending => break,
                Parsed::Incomplete => {
                    if !force {
                        trace!(
                            target: "n_tui::decoder",
                            pending = remaining.len(),
                            "pending_budget_exceeded"
                        );
                    }
                    let (event, consumed) = abandon(remaining);
                    events.push(event);
                    pos += consumed;
                }
            }
        }

        // Compact: remove consumed bytes, keep unconsumed remainder.
        if pos > 0 {
            self.buf.drain(..pos);
        }

        events
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Stateless Parsing Functions ────────────────────────────────────────────
//
// All parse functions are pure: they read from the start of `buf` and
// return what they found plus how many bytes it spans.

/// Result of trying to parse one event from the buffer.
enum Parsed {
    /// Parsed an event spanning `usize` bytes.
    Event(Event, usize),
    /// Sequence is incomplete; need more bytes.
    Incomplete,
}

/// Try to parse a single event from the start of a non-empty `buf`.
fn try_parse(buf: &[u8]) -> Parsed {
    let Some(&first) = buf.first() else {
        return Parsed::Incomplete;
    };

    match first {
        // ESC: escape sequence or standalone Escape key.
        0x1B => parse_escape(buf),
        0x00 => Parsed::Event(ctrl_key(KeyCode::Char('@')), 1),
        0x08 | 0x7F => Parsed::Event(press(KeyCode::Backspace), 1),
        0x09 => Parsed::Event(press(KeyCode::Tab), 1),
        0x0A | 0x0D => Parsed::Event(press(KeyCode::Enter), 1),
        // Ctrl+letter.
        b @ 0x01..=0x1A => Parsed::Event(ctrl_key(KeyCode::Char(char::from(b + b'a' - 1))), 1),
        // Ctrl+\ ] ^ _
        b @ 0x1C..=0x1F => Parsed::Event(ctrl_key(KeyCode::Char(char::from(b + 0x40))), 1),
        // ASCII printable.
        b @ 0x20..=0x7E => Parsed::Event(press(KeyCode::Char(char::from(b))), 1),
        // UTF-8 multi-byte (or garbage).
        0x80..=0xFF => parse_utf8(buf),
    }
}

// ── Escape sequences ────────────────────────────────────────────────────────

fn parse_escape(buf: &[u8]) -> Parsed {
    debug_assert_eq!(buf[0], 0x1B);

    if buf.len() < 2 {
        return Parsed::Incomplete;
    }

    match buf[1] {
        // CSI: ESC [
        b'[' => parse_csi(buf),
        // SS3: ESC O
        b'O' => parse_ss3(buf),
        // ESC ESC: Alt+Escape, or Alt plus a CSI/SS3 key (`ESC ESC [ A`
        // is Alt+Up on terminals without modifier parameters).
        0x1B => match buf.get(2) {
            None => Parsed::Incomplete,
            Some(b'[' | b'O') => match parse_escape(&buf[1..]) {
                Parsed::Event(Event::Key(key), n) if key.code != KeyCode::Unknown => {
                    Parsed::Event(
                        Event::Key(KeyEvent {
                            modifiers: key.modifiers | Modifiers::ALT,
                            ..key
                        }),
                        n + 1,
                    )
                }
                Parsed::Incomplete => Parsed::Incomplete,
                // Mouse, focus or junk: plain Escape, then the sequence.
                Parsed::Event(..) => Parsed::Event(press(KeyCode::Escape), 1),
            },
            Some(_) => Parsed::Event(key_with(KeyCode::Escape, Modifiers::ALT), 2),
        },
        // Alt+anything else that decodes to a key: printable, control,
        // or a UTF-8 character.
        _ => match try_parse(&buf[1..]) {
            Parsed::Event(Event::Key(key), n) if key.code != KeyCode::Unknown => Parsed::Event(
                Event::Key(KeyEvent {
                    modifiers: key.modifiers | Modifiers::ALT,
                    ..key
                }),
                n + 1,
            ),
            Parsed::Incomplete => Parsed::Incomplete,
            // Nothing sensible follows: standalone Escape.
            Parsed::Event(..) => Parsed::Event(press(KeyCode::Escape), 1),
        },
    }
}

// ── CSI (Control Sequence Introducer) ───────────────────────────────────────

fn parse_csi(buf: &[u8]) -> Parsed {
    debug_assert!(buf.len() >= 2 && buf[0] == 0x1B && buf[1] == b'[');

    if buf.len() < 3 {
        return Parsed::Incomplete;
    }

    // SGR mouse: ESC [ <
    if buf[2] == b'<' {
        return parse_sgr_mouse(buf);
    }

    // Scan for the final byte (0x40..=0x7E).
    // CSI parameter bytes are in 0x30..=0x3F, intermediate in 0x20..=0x2F.
    // Anything else ends the sequence early and is parsed again.
    let mut end = 2;
    loop {
        let Some(&b) = buf.get(end) else {
            return Parsed::Incomplete;
        };
        match b {
            0x40..=0x7E => break,
            0x20..=0x3F => end += 1,
            _ => return Parsed::Event(unknown(), end),
        }
    }

    let final_byte = buf[end];
    let params_raw = &buf[2..end];
    let consumed = end + 1;

    // Private-marker sequences (`?`, `>`, `=`) are replies, not keys.
    if params_raw
        .first()
        .is_some_and(|b| matches!(b, b'?' | b'>' | b'='))
    {
        return Parsed::Event(unknown(), consumed);
    }

    // ── Tilde-terminated sequences (editing keys, function keys) ─────
    if final_byte == b'~' {
        let params = parse_csi_params(params_raw);
        let first = params.first().map_or(0, |p| p.0);
        let modifiers = params
            .get(1)
            .map_or(Modifiers::empty(), |p| decode_modifiers(p.0));

        let code = match first {
            1 | 7 => KeyCode::Home,
            2 => KeyCode::Insert,
            3 => KeyCode::Delete,
            4 | 8 => KeyCode::End,
            5 => KeyCode::PageUp,
            6 => KeyCode::PageDown,
            11 => KeyCode::F(1),
            12 => KeyCode::F(2),
            13 => KeyCode::F(3),
            14 => KeyCode::F(4),
            15 => KeyCode::F(5),
            17 => KeyCode::F(6),
            18 => KeyCode::F(7),
            19 => KeyCode::F(8),
            20 => KeyCode::F(9),
            21 => KeyCode::F(10),
            23 => KeyCode::F(11),
            24 => KeyCode::F(12),
            25 => KeyCode::F(13),
            26 => KeyCode::F(14),
            28 => KeyCode::F(15),
            29 => KeyCode::F(16),
            31 => KeyCode::F(17),
            32 => KeyCode::F(18),
            33 => KeyCode::F(19),
            34 => KeyCode::F(20),
            _ => return Parsed::Event(unknown(), consumed),
        };
        return Parsed::Event(key_with(code, modifiers), consumed);
    }

    // ── Kitty keyboard: CSI codepoint [; modifiers[:event_type]] u ───
    if final_byte == b'u' {
        return parse_kitty_key(params_raw, consumed);
    }

    // ── Focus reporting ─────────────────────────────────────────────
    if params_raw.is_empty() {
        match final_byte {
            b'I' => return Parsed::Event(Event::FocusGained, consumed),
            b'O' => return Parsed::Event(Event::FocusLost, consumed),
            _ => {}
        }
    }

    // ── Standard CSI sequences with letter final bytes ──────────────
    let params = parse_csi_params(params_raw);
    let modifiers = params
        .get(1)
        .map_or(Modifiers::empty(), |p| decode_modifiers(p.0));

    let event = match final_byte {
        b'A' => key_with(KeyCode::Up, modifiers),
        b'B' => key_with(KeyCode::Down, modifiers),
        b'C' => key_with(KeyCode::Right, modifiers),
        b'D' => key_with(KeyCode::Left, modifiers),
        b'H' => key_with(KeyCode::Home, modifiers),
        b'F' => key_with(KeyCode::End, modifiers),
        b'P' => key_with(KeyCode::F(1), modifiers),
        b'Q' => key_with(KeyCode::F(2), modifiers),
        b'R' => key_with(KeyCode::F(3), modifiers),
        b'S' => key_with(KeyCode::F(4), modifiers),
        b'Z' => key_with(KeyCode::Tab, modifiers | Modifiers::SHIFT),
        _ => unknown(),
    };

    Parsed::Event(event, consumed)
}

// ── SS3 (Single Shift 3) ───────────────────────────────────────────────────

fn parse_ss3(buf: &[u8]) -> Parsed {
    debug_assert!(buf.len() >= 2 && buf[0] == 0x1B && buf[1] == b'O');

    if buf.len() < 3 {
        return Parsed::Incomplete;
    }

    let event = match buf[2] {
        b'A' => press(KeyCode::Up),
        b'B' => press(KeyCode::Down),
        b'C' => press(KeyCode::Right),
        b'D' => press(KeyCode::Left),
        b'H' => press(KeyCode::Home),
        b'F' => press(KeyCode::End),
        b'P' => press(KeyCode::F(1)),
        b'Q' => press(KeyCode::F(2)),
        b'R' => press(KeyCode::F(3)),
        b'S' => press(KeyCode::F(4)),
        0x40..=0x7E => unknown(),
        // Not an SS3 final: this was Alt+O.
        _ => return Parsed::Event(key_with(KeyCode::Char('O'), Modifiers::ALT), 2),
    };

    Parsed::Event(event, 3)
}

// ── SGR Mouse Protocol ─────────────────────────────────────────────────────

fn parse_sgr_mouse(buf: &[u8]) -> Parsed {
    // Format: ESC [ < Pb ; Px ; Py M    (press/motion)
    //         ESC [ < Pb ; Px ; Py m    (release)
    debug_assert!(buf.len() >= 3 && buf[2] == b'<');

    let start = 3;
    let mut end = start;
    loop {
        let Some(&b) = buf.get(end) else {
            return Parsed::Incomplete;
        };
        match b {
            b'M' | b'm' => break,
            b'0'..=b'9' | b';' => end += 1,
            _ => return Parsed::Event(unknown(), end),
        }
    }

    let is_release = buf[end] == b'm';
    let consumed = end + 1;

    // Three semicolon-separated numbers: button_flags ; x ; y
    let params = &buf[start..end];
    let (cb, rest) = parse_u32_from(params);
    let rest = skip_byte(rest, b';');
    let (raw_x, rest) = parse_u32_from(rest);
    let rest = skip_byte(rest, b';');
    let (raw_y, _) = parse_u32_from(rest);

    // SGR coordinates are 1-indexed; events are 0-indexed.
    let x = u16::try_from(raw_x.saturating_sub(1)).unwrap_or(u16::MAX);
    let y = u16::try_from(raw_y.saturating_sub(1)).unwrap_or(u16::MAX);

    let mut modifiers = Modifiers::empty();
    if cb & 4 != 0 {
        modifiers |= Modifiers::SHIFT;
    }
    if cb & 8 != 0 {
        modifiers |= Modifiers::ALT;
    }
    if cb & 16 != 0 {
        modifiers |= Modifiers::CTRL;
    }

    let is_wheel = cb & 64 != 0;
    let is_motion = cb & 32 != 0;
    let base = cb & 3;

    let (kind, button) = if is_wheel {
        match base {
            0 => (MouseEventKind::ScrollUp, MouseButton::WheelUp),
            1 => (MouseEventKind::ScrollDown, MouseButton::WheelDown),
            2 => (MouseEventKind::ScrollLeft, MouseButton::WheelLeft),
            _ => (MouseEventKind::ScrollRight, MouseButton::WheelRight),
        }
    } else if is_motion {
        // Motion with a button held is a drag; base 3 means none held.
        match base {
            3 => (MouseEventKind::Move, MouseButton::None),
            b => (MouseEventKind::Drag, decode_mouse_button(b)),
        }
    } else if is_release {
        (MouseEventKind::Up, decode_mouse_button(base))
    } else {
        (MouseEventKind::Down, decode_mouse_button(base))
    };

    Parsed::Event(
        Event::Mouse(MouseEvent {
            kind,
            button,
            x,
            y,
            modifiers,
        }),
        consumed,
    )
}

// ── Kitty Keyboard Protocol ────────────────────────────────────────────────

fn parse_kitty_key(params_raw: &[u8], consumed: usize) -> Parsed {
    // Format: CSI codepoint [; modifiers[:event_type]] u
    let params = parse_csi_params(params_raw);

    let codepoint = params.first().map_or(0, |p| p.0);
    let (modifier_val, event_type) = params.get(1).map_or((0, 0), |p| (p.0, p.1));

    let kind = match event_type {
        2 => KeyEventKind::Repeat,
        3 => KeyEventKind::Release,
        _ => KeyEventKind::Press,
    };

    let event = match kitty_codepoint_to_keycode(codepoint) {
        Some(code) => Event::Key(KeyEvent {
            code,
            modifiers: decode_modifiers(modifier_val),
            kind,
            raw: Vec::new(),
        }),
        None => unknown(),
    };
    Parsed::Event(event, consumed)
}

// ── UTF-8 ──────────────────────────────────────────────────────────────────

fn parse_utf8(buf: &[u8]) -> Parsed {
    let expected = utf8_char_len(buf[0]);
    if expected == 0 {
        return Parsed::Event(unknown(), 1);
    }

    // Continuation bytes must look like 0b10xxxxxx, even before the whole
    // character has arrived.
    let available = buf.len().min(expected);
    if buf[1..available].iter().any(|&b| b & 0xC0 != 0x80) {
        return Parsed::Event(unknown(), 1);
    }
    if buf.len() < expected {
        return Parsed::Incomplete;
    }

    match std::str::from_utf8(&buf[..expected]).ok().and_then(|s| s.chars().next()) {
        Some(ch) => Parsed::Event(press(KeyCode::Char(ch)), expected),
        None => Parsed::Event(unknown(), 1),
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Create a simple key press event with no modifiers.
const fn press(code: KeyCode) -> Event {
    Event::Key(KeyEvent::new(code, Modifiers::empty()))
}

/// Create a Ctrl+key press event.
const fn ctrl_key(code: KeyCode) -> Event {
    Event::Key(KeyEvent::new(code, Modifiers::CTRL))
}

/// Create a key press event with specific modifiers.
const fn key_with(code: KeyCode, modifiers: Modifiers) -> Event {
    Event::Key(KeyEvent::new(code, modifiers))
}

const fn unknown() -> Event {
    press(KeyCode::Unknown)
}

/// Record the source bytes on a key event.
fn attach_raw(event: Event, bytes: &[u8]) -> Event {
    match event {
        Event::Key(mut key) => {
            if key.code == KeyCode::Unknown {
                trace!(target: "n_tui::decoder", raw = %bytes.escape_ascii(), "unknown_sequence");
            }
            key.raw = bytes.to_vec();
            Event::Key(key)
        }
        other => other,
    }
}

/// Resolve the head of an unfinished sequence. A doubled ESC stays
/// Alt+Escape; anything else gives up one byte.
fn abandon(buf: &[u8]) -> (Event, usize) {
    if buf.starts_with(b"\x1b\x1b") {
        let event = key_with(KeyCode::Escape, Modifiers::ALT);
        return (attach_raw(event, &buf[..2]), 2);
    }
    (lone_byte(buf[0]), 1)
}

/// A single byte taken on its own, for when a sequence is abandoned.
fn lone_byte(byte: u8) -> Event {
    let event = if byte == 0x1B {
        press(KeyCode::Escape)
    } else {
        match try_parse(&[byte]) {
            Parsed::Event(event, _) => event,
            Parsed::Incomplete => unknown(),
        }
    };
    attach_raw(event, &[byte])
}

/// CSI parameter: `(main_value, colon_sub_parameter)`.
///
/// The colon sub-parameter is used by the Kitty keyboard protocol
/// to encode event type within the modifier parameter: `modifier:event_type`.
struct CsiParam(u32, u32);

/// Parse semicolon-separated CSI parameters with optional colon sub-params.
///
/// Examples:
/// - `1;2` → `[(1,0), (2,0)]`
/// - `97;5:2` → `[(97,0), (5,2)]`
/// - (empty) → `[]`
fn parse_csi_params(raw: &[u8]) -> Vec<CsiParam> {
    if raw.is_empty() {
        return Vec::new();
    }

    let mut params = Vec::with_capacity(4);
    let mut pos = 0;

    loop {
        let (main_val, next) = parse_u32_at(raw, pos);
        pos = next;

        let sub_val = if raw.get(pos) == Some(&b':') {
            let (v, n) = parse_u32_at(raw, pos + 1);
            pos = n;
            v
        } else {
            0
        };

        params.push(CsiParam(main_val, sub_val));

        if raw.get(pos) == Some(&b';') {
            pos += 1;
        } else {
            break;
        }
    }

    params
}

/// Parse a u32 from bytes starting at `start`, stopping at non-digit.
/// Returns `(value, next_position)`.
fn parse_u32_at(buf: &[u8], start: usize) -> (u32, usize) {
    let mut val: u32 = 0;
    let mut pos = start;
    while let Some(&b) = buf.get(pos).filter(|b| b.is_ascii_digit()) {
        val = val.saturating_mul(10).saturating_add(u32::from(b - b'0'));
        pos += 1;
    }
    (val, pos)
}

/// Parse a u32 from the start of a byte slice.
/// Returns `(value, remaining_bytes)`.
fn parse_u32_from(buf: &[u8]) -> (u32, &[u8]) {
    let (val, pos) = parse_u32_at(buf, 0);
    (val, &buf[pos..])
}

/// Skip a leading byte if it matches `expected`.
fn skip_byte(buf: &[u8], expected: u8) -> &[u8] {
    buf.strip_prefix(&[expected]).unwrap_or(buf)
}

/// Decode CSI modifier parameter into `Modifiers` bitflags.
///
/// The encoding is `1 + bitmask`, matching both xterm and Kitty protocols.
/// A parameter of 0 or 1 means no modifiers. Only the low 6 bits carry
/// flags.
#[allow(clippy::cast_possible_truncation)]
const fn decode_modifiers(param: u32) -> Modifiers {
    let val = param.saturating_sub(1) & 0x3F;
    Modifiers::from_bits_truncate(val as u8)
}

/// Map SGR mouse base button value to `MouseButton`.
const fn decode_mouse_button(base: u32) -> MouseButton {
    match base {
        0 => MouseButton::Left,
        1 => MouseButton::Middle,
        2 => MouseButton::Right,
        _ => MouseButton::None,
    }
}

/// Map a Kitty keyboard protocol codepoint to `KeyCode`.
///
/// Standard Unicode codepoints map to `Char`. Functional keys use
/// the Kitty-specific range starting at 57344 (Unicode Private Use Area).
#[allow(clippy::cast_possible_truncation)]
fn kitty_codepoint_to_keycode(cp: u32) -> Option<KeyCode> {
    let code = match cp {
        27 | 57344 => KeyCode::Escape,
        13 | 57345 => KeyCode::Enter,
        9 | 57346 => KeyCode::Tab,
        127 | 57347 => KeyCode::Backspace,
        57348 => KeyCode::Insert,
        57349 => KeyCode::Delete,
        57350 => KeyCode::Left,
        57351 => KeyCode::Right,
        57352 => KeyCode::Up,
        57353 => KeyCode::Down,
        57354 => KeyCode::PageUp,
        57355 => KeyCode::PageDown,
        57356 => KeyCode::Home,
        57357 => KeyCode::End,
        57358 => KeyCode::CapsLock,
        57359 => KeyCode::ScrollLock,
        57360 => KeyCode::NumLock,
        57361 => KeyCode::PrintScreen,
        57362 => KeyCode::Pause,
        57363 => KeyCode::Menu,
        // F1–F35; the range keeps the result within u8.
        57364..=57398 => KeyCode::F((cp - 57363) as u8),
        0 => return None,
        cp => KeyCode::Char(char::from_u32(cp)?),
    };
    Some(code)
}

/// Expected byte length of a UTF-8 character from its lead byte.
/// Returns 0 for invalid lead bytes (continuation bytes, 0xF8..).
const fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}

/// Find the first occurrence of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
