// SPDX-License-Identifier: MIT
//
// Input decoder: parser, handlers, escape budget, raw mode, close.
//
// The `Parser` in `input` is a pure byte-to-event state machine. The
// decoder is what a host actually holds: it owns a parser, a registry of
// typed handlers, the time budget for unfinished escape sequences, and
// optionally the raw-mode guard for stdin.
//
// # Delivery
//
// `feed` parses and dispatches synchronously on the caller's thread. Events
// reach handlers in arrival order; for one event, handlers run in the order
// they were registered. With no handlers, events are simply dropped.
//
// # Escape budget
//
// A lone ESC could be the Escape key or the first byte of a sequence whose
// tail is still in flight. When a feed starts a new unfinished sequence,
// the decoder records the time; later bytes of that same sequence do not
// move it. `pending_deadline` reports when the bytes go stale and `expire`
// resolves them (ESC becomes Escape). The host's
// loop uses the deadline as its receive timeout. Bracketed paste content
// is exempt: a paste waits for its end marker however long it takes.
//
// # Close
//
// `close` is idempotent. It drops the raw-mode guard (restoring termios),
// discards buffered bytes and stops delivery. A handler cannot borrow the
// decoder it is running inside, so it asks through a `CloseHandle` instead.
// The request is checked before every handler call, so nothing runs after
// it, not even for events decoded in the same batch.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::input::{DEFAULT_MAX_PENDING, Event, KeyEvent, MouseEvent, Parser};
use crate::subscription::{SubscriptionId, Subscribers};
use crate::terminal::RawModeGuard;

// ─── Config ─────────────────────────────────────────────────────────────────

/// How long a partial escape sequence may wait for the rest of its bytes.
pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(25);

/// Timing and size limits for unfinished input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Age at which pending bytes are flushed as literal keys.
    pub escape_timeout: Duration,
    /// Buffered bytes of one unfinished (non-paste) sequence before the
    /// parser gives up on it.
    pub max_pending_bytes: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            escape_timeout: DEFAULT_ESCAPE_TIMEOUT,
            max_pending_bytes: DEFAULT_MAX_PENDING,
        }
    }
}

// ─── Handlers ───────────────────────────────────────────────────────────────

enum Handler {
    Key(Box<dyn FnMut(&KeyEvent)>),
    Mouse(Box<dyn FnMut(&MouseEvent)>),
    Paste(Box<dyn FnMut(&str)>),
    Focus(Box<dyn FnMut()>),
    Blur(Box<dyn FnMut()>),
    Any(Box<dyn FnMut(&Event)>),
}

impl Handler {
    fn call(&mut self, event: &Event) {
        match (self, event) {
            (Self::Key(f), Event::Key(key)) => f(key),
            (Self::Mouse(f), Event::Mouse(mouse)) => f(mouse),
            (Self::Paste(f), Event::Paste(text)) => f(text.as_str()),
            (Self::Focus(f), Event::FocusGained) | (Self::Blur(f), Event::FocusLost) => f(),
            (Self::Any(f), event) => f(event),
            _ => {}
        }
    }
}

// ─── CloseHandle ────────────────────────────────────────────────────────────

/// Cloneable request to close a [`Decoder`], usable from inside handlers.
#[derive(Debug, Clone, Default)]
pub struct CloseHandle(Arc<AtomicBool>);

impl CloseHandle {
    /// Ask the decoder to close. No handler runs after this returns.
    pub fn request_close(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ─── Decoder ────────────────────────────────────────────────────────────────

/// Terminal input decoder with typed subscriptions.
///
/// # Example
///
/// ```
/// use n_tui::decoder::Decoder;
///
/// let mut decoder = Decoder::new();
/// let quit = decoder.close_handle();
/// decoder.on_key(move |key| {
///     if key.ctrl() && key.name() == "c" {
///         quit.request_close();
///     }
/// });
/// decoder.feed(b"\x03");
/// assert!(decoder.is_closed());
/// ```
pub struct Decoder {
    parser: Parser,
    handlers: Subscribers<Handler>,
    config: DecoderConfig,
    /// When the first byte of the current unfinished sequence arrived.
    /// `None` if nothing is pending or the parser is inside a paste.
    pending_since: Option<Instant>,
    guard: Option<RawModeGuard>,
    close: CloseHandle,
    /// `close` has run to completion.
    closed: bool,
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    #[must_use]
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            parser: Parser::with_max_pending(config.max_pending_bytes),
            handlers: Subscribers::new(),
            config,
            pending_since: None,
            guard: None,
            close: CloseHandle::default(),
            closed: false,
        }
    }

    /// Decoder that also puts stdin into raw mode for its lifetime.
    ///
    /// On a non-TTY stdin the guard is inert and decoding works the same.
    ///
    /// # Errors
    ///
    /// Returns the OS error if termios cannot be read or applied.
    pub fn with_raw_mode(config: DecoderConfig) -> io::Result<Self> {
        let guard = RawModeGuard::stdin()?;
        debug!(
            target: "n_tui::decoder",
            raw = guard.is_active(),
            "decoder_opened"
        );
        let mut decoder = Self::with_config(config);
        decoder.guard = Some(guard);
        Ok(decoder)
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Whether this decoder currently holds stdin in raw mode.
    #[must_use]
    pub fn has_raw_mode(&self) -> bool {
        self.guard.as_ref().is_some_and(RawModeGuard::is_active)
    }

    /// Closed, or asked to close through a [`CloseHandle`].
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed || self.close.is_closed()
    }

    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        self.close.clone()
    }

    // ── Subscriptions ──────────────────────────────────────────

    pub fn on_key(&mut self, handler: impl FnMut(&KeyEvent) + 'static) -> SubscriptionId {
        self.handlers.add(Handler::Key(Box::new(handler)))
    }

    pub fn on_mouse(&mut self, handler: impl FnMut(&MouseEvent) + 'static) -> SubscriptionId {
        self.handlers.add(Handler::Mouse(Box::new(handler)))
    }

    pub fn on_paste(&mut self, handler: impl FnMut(&str) + 'static) -> SubscriptionId {
        self.handlers.add(Handler::Paste(Box::new(handler)))
    }

    pub fn on_focus(&mut self, handler: impl FnMut() + 'static) -> SubscriptionId {
        self.handlers.add(Handler::Focus(Box::new(handler)))
    }

    pub fn on_blur(&mut self, handler: impl FnMut() + 'static) -> SubscriptionId {
        self.handlers.add(Handler::Blur(Box::new(handler)))
    }

    /// Every event, whatever its kind.
    pub fn on_event(&mut self, handler: impl FnMut(&Event) + 'static) -> SubscriptionId {
        self.handlers.add(Handler::Any(Box::new(handler)))
    }

    /// Remove a handler. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.handlers.remove(id)
    }

    // ── Input ──────────────────────────────────────────────────

    /// Decode `bytes` and dispatch every complete event.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.feed_at(bytes, Instant::now());
    }

    /// [`feed`](Self::feed) with an explicit arrival time.
    pub fn feed_at(&mut self, bytes: &[u8], now: Instant) {
        if self.finish_requested_close() {
            return;
        }
        let was_waiting = self.waiting_on_sequence();
        let events = self.parser.advance(bytes);
        // The clock starts with the first byte of an unfinished sequence.
        // More bytes of the same sequence do not restart it; an event means
        // the old prefix was consumed and whatever is left is new.
        self.pending_since = if !self.waiting_on_sequence() {
            None
        } else if was_waiting && events.is_empty() {
            self.pending_since.or(Some(now))
        } else {
            Some(now)
        };
        self.dispatch(events);
    }

    /// When the pending bytes should be flushed, if any are pending.
    #[must_use]
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending_since
            .map(|since| since + self.config.escape_timeout)
    }

    /// Flush pending bytes whose deadline is at or before `now`.
    ///
    /// Returns `true` if a flush happened.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.finish_requested_close() {
            return false;
        }
        match self.pending_deadline() {
            Some(deadline) if deadline <= now => {
                trace!(target: "n_tui::decoder", "escape_timeout_flush");
                self.flush();
                true
            }
            _ => false,
        }
    }

    /// Resolve pending bytes right away, as if the budget had run out.
    /// An unfinished paste stays buffered.
    pub fn flush(&mut self) {
        if self.finish_requested_close() {
            return;
        }
        let events = self.parser.flush();
        self.pending_since = None;
        self.dispatch(events);
    }

    // ── Close ──────────────────────────────────────────────────

    /// Restore the input mode, discard buffered bytes, stop delivery.
    /// Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.close.request_close();
        self.closed = true;

        if let Some(mut guard) = self.guard.take() {
            if let Err(err) = guard.restore() {
                warn!(target: "n_tui::decoder", %err, "raw_mode_restore_failed");
            }
        }
        self.parser.reset();
        self.pending_since = None;
        self.handlers.clear();
        debug!(target: "n_tui::decoder", "decoder_closed");
    }

    // ── Internals ──────────────────────────────────────────────

    /// Bytes of a partial sequence are buffered and the parser is not
    /// collecting a paste.
    fn waiting_on_sequence(&self) -> bool {
        self.parser.has_pending() && !self.parser.in_paste()
    }

    /// Complete a close requested through a handle. Returns whether the
    /// decoder is closed.
    fn finish_requested_close(&mut self) -> bool {
        if self.close.is_closed() && !self.closed {
            trace!(target: "n_tui::decoder", "close_requested_by_handle");
            self.close();
        }
        self.closed
    }

    fn dispatch(&mut self, events: Vec<Event>) {
        for event in &events {
            for handler in self.handlers.iter_mut() {
                if self.close.is_closed() {
                    break;
                }
                handler.call(event);
            }
            if self.close.is_closed() {
                break;
            }
        }
        self.finish_requested_close();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("handlers", &self.handlers)
            .field("config", &self.config)
            .field("pending_since", &self.pending_since)
            .field("raw_mode", &self.has_raw_mode())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{KeyCode, Modifiers, MouseButton, MouseEventKind};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log<T> = Rc<RefCell<Vec<T>>>;

    fn key_names(decoder: &mut Decoder) -> Log<String> {
        let log: Log<String> = Rc::default();
        let sink = Rc::clone(&log);
        decoder.on_key(move |key| sink.borrow_mut().push(key.name()));
        log
    }

    fn all_events(decoder: &mut Decoder) -> Log<Event> {
        let log: Log<Event> = Rc::default();
        let sink = Rc::clone(&log);
        decoder.on_event(move |event| sink.borrow_mut().push(event.clone()));
        log
    }

    // ── Delivery ────────────────────────────────────────────────

    #[test]
    fn ctrl_c_is_one_key_event() {
        let mut decoder = Decoder::new();
        let keys: Log<(String, bool)> = Rc::default();
        let sink = Rc::clone(&keys);
        decoder.on_key(move |key| sink.borrow_mut().push((key.name(), key.ctrl())));

        decoder.feed(b"\x03");
        assert_eq!(*keys.borrow(), vec![("c".to_string(), true)]);
    }

    #[test]
    fn paste_is_one_event_and_no_keys() {
        let mut decoder = Decoder::new();
        let keys = key_names(&mut decoder);
        let mice: Log<MouseEvent> = Rc::default();
        let mouse_sink = Rc::clone(&mice);
        decoder.on_mouse(move |m| mouse_sink.borrow_mut().push(*m));
        let pastes: Log<String> = Rc::default();
        let paste_sink = Rc::clone(&pastes);
        decoder.on_paste(move |text| paste_sink.borrow_mut().push(text.to_string()));

        decoder.feed(b"\x1b[200~a;<b>\x1b[201~");
        assert_eq!(*pastes.borrow(), vec!["a;<b>".to_string()]);
        assert!(keys.borrow().is_empty());
        assert!(mice.borrow().is_empty());
    }

    #[test]
    fn paste_split_across_feeds() {
        let mut decoder = Decoder::new();
        let events = all_events(&mut decoder);
        decoder.feed(b"\x1b[200~hel");
        decoder.feed(b"lo\x1b[20");
        assert!(events.borrow().is_empty());
        decoder.feed(b"1~x");
        assert_eq!(
            *events.borrow(),
            vec![
                Event::Paste("hello".into()),
                Event::Key(KeyEvent {
                    raw: b"x".to_vec(),
                    ..KeyEvent::new(KeyCode::Char('x'), Modifiers::empty())
                }),
            ]
        );
    }

    #[test]
    fn events_arrive_in_order() {
        let mut decoder = Decoder::new();
        let keys = key_names(&mut decoder);
        decoder.feed(b"ab\x1b[Ac\r");
        assert_eq!(*keys.borrow(), vec!["a", "b", "up", "c", "enter"]);
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let mut decoder = Decoder::new();
        let order: Log<&str> = Rc::default();
        let first = Rc::clone(&order);
        decoder.on_event(move |_| first.borrow_mut().push("any"));
        let second = Rc::clone(&order);
        decoder.on_key(move |_| second.borrow_mut().push("key"));

        decoder.feed(b"x");
        assert_eq!(*order.borrow(), vec!["any", "key"]);
    }

    #[test]
    fn typed_handlers_only_see_their_kind() {
        let mut decoder = Decoder::new();
        let keys = key_names(&mut decoder);
        let focus = Rc::new(RefCell::new(0));
        let blur = Rc::new(RefCell::new(0));
        let f = Rc::clone(&focus);
        decoder.on_focus(move || *f.borrow_mut() += 1);
        let b = Rc::clone(&blur);
        decoder.on_blur(move || *b.borrow_mut() += 1);
        let mice: Log<MouseEvent> = Rc::default();
        let m = Rc::clone(&mice);
        decoder.on_mouse(move |event| m.borrow_mut().push(*event));

        decoder.feed(b"\x1b[I\x1b[<0;5;3M\x1b[Oq");

        assert_eq!(*keys.borrow(), vec!["q"]);
        assert_eq!(*focus.borrow(), 1);
        assert_eq!(*blur.borrow(), 1);
        let mice = mice.borrow();
        assert_eq!(mice.len(), 1);
        assert_eq!(mice[0].kind, MouseEventKind::Down);
        assert_eq!(mice[0].button, MouseButton::Left);
        assert_eq!((mice[0].x, mice[0].y), (4, 2));
    }

    #[test]
    fn no_handlers_drops_events() {
        let mut decoder = Decoder::new();
        decoder.feed(b"hello\x1b[A");
        assert_eq!(decoder.pending_deadline(), None);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut decoder = Decoder::new();
        let log: Log<String> = Rc::default();
        let sink = Rc::clone(&log);
        let id = decoder.on_key(move |key| sink.borrow_mut().push(key.name()));

        decoder.feed(b"a");
        assert!(decoder.unsubscribe(id));
        assert!(!decoder.unsubscribe(id));
        decoder.feed(b"b");
        assert_eq!(*log.borrow(), vec!["a"]);
    }

    // ── Escape budget ───────────────────────────────────────────

    #[test]
    fn lone_escape_waits_for_deadline() {
        let mut decoder = Decoder::new();
        let keys = key_names(&mut decoder);
        let t0 = Instant::now();

        decoder.feed_at(b"\x1b", t0);
        assert!(keys.borrow().is_empty());
        assert_eq!(decoder.pending_deadline(), Some(t0 + DEFAULT_ESCAPE_TIMEOUT));

        assert!(!decoder.expire(t0 + Duration::from_millis(10)));
        assert!(keys.borrow().is_empty());

        assert!(decoder.expire(t0 + DEFAULT_ESCAPE_TIMEOUT));
        assert_eq!(*keys.borrow(), vec!["escape"]);
        assert_eq!(decoder.pending_deadline(), None);
    }

    #[test]
    fn split_sequence_completes_before_deadline() {
        let mut decoder = Decoder::new();
        let keys = key_names(&mut decoder);
        let t0 = Instant::now();

        decoder.feed_at(b"\x1b[", t0);
        decoder.feed_at(b"B", t0 + Duration::from_millis(5));
        assert_eq!(*keys.borrow(), vec!["down"]);
        assert_eq!(decoder.pending_deadline(), None);
    }

    #[test]
    fn deadline_counts_from_first_pending_byte() {
        let mut decoder = Decoder::new();
        let keys = key_names(&mut decoder);
        let t0 = Instant::now();

        // A slow trickle of one sequence does not push the deadline out.
        decoder.feed_at(b"\x1b", t0);
        decoder.feed_at(b"[1", t0 + Duration::from_millis(10));
        decoder.feed_at(b";", t0 + Duration::from_millis(20));
        assert_eq!(decoder.pending_deadline(), Some(t0 + DEFAULT_ESCAPE_TIMEOUT));

        assert!(decoder.expire(t0 + DEFAULT_ESCAPE_TIMEOUT));
        assert_eq!(*keys.borrow(), vec!["escape", "[", "1", ";"]);
    }

    #[test]
    fn new_sequence_after_an_event_gets_a_fresh_deadline() {
        let mut decoder = Decoder::new();
        let keys = key_names(&mut decoder);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(20);

        decoder.feed_at(b"\x1b[", t0);
        decoder.feed_at(b"A\x1b", t1);
        assert_eq!(*keys.borrow(), vec!["up"]);
        assert_eq!(decoder.pending_deadline(), Some(t1 + DEFAULT_ESCAPE_TIMEOUT));
    }

    #[test]
    fn expired_partial_sequence_is_not_lost() {
        let mut decoder = Decoder::new();
        let keys = key_names(&mut decoder);
        let t0 = Instant::now();

        decoder.feed_at(b"\x1b[1", t0);
        assert!(decoder.expire(t0 + DEFAULT_ESCAPE_TIMEOUT));
        assert_eq!(*keys.borrow(), vec!["escape", "[", "1"]);
    }

    #[test]
    fn paste_has_no_deadline() {
        let mut decoder = Decoder::new();
        let events = all_events(&mut decoder);
        let t0 = Instant::now();

        decoder.feed_at(b"\x1b[200~still typing", t0);
        assert_eq!(decoder.pending_deadline(), None);
        assert!(!decoder.expire(t0 + Duration::from_secs(60)));
        decoder.flush();
        assert!(events.borrow().is_empty());

        decoder.feed(b"\x1b[201~");
        assert_eq!(*events.borrow(), vec![Event::Paste("still typing".into())]);
    }

    #[test]
    fn byte_budget_degrades_to_escape_key() {
        let mut decoder = Decoder::with_config(DecoderConfig {
            max_pending_bytes: 4,
            ..DecoderConfig::default()
        });
        let keys = key_names(&mut decoder);

        decoder.feed(b"\x1b[1;2;3");
        let keys = keys.borrow();
        assert_eq!(keys.first().map(String::as_str), Some("escape"));
        assert_eq!(keys[1..], ["[", "1", ";", "2", ";", "3"]);
    }

    // ── Close ───────────────────────────────────────────────────

    #[test]
    fn close_stops_delivery_and_discards_pending() {
        let mut decoder = Decoder::new();
        let keys = key_names(&mut decoder);
        let t0 = Instant::now();

        decoder.feed_at(b"a\x1b", t0);
        decoder.close();
        assert!(decoder.is_closed());
        assert_eq!(decoder.pending_deadline(), None);
        assert!(!decoder.expire(t0 + Duration::from_secs(1)));
        decoder.feed(b"b");
        assert_eq!(*keys.borrow(), vec!["a"]);
    }

    #[test]
    fn close_is_idempotent() {
        let mut decoder = Decoder::new();
        decoder.close();
        decoder.close();
        assert!(decoder.is_closed());
        assert!(!decoder.has_raw_mode());
    }

    #[test]
    fn handle_close_skips_rest_of_batch() {
        let mut decoder = Decoder::new();
        let handle = decoder.close_handle();
        let seen: Log<String> = Rc::default();
        let sink = Rc::clone(&seen);
        decoder.on_key(move |key| {
            sink.borrow_mut().push(key.name());
            if key.name() == "q" {
                handle.request_close();
            }
        });
        let later: Log<String> = Rc::default();
        let later_sink = Rc::clone(&later);
        decoder.on_key(move |key| later_sink.borrow_mut().push(key.name()));

        decoder.feed(b"aqz");

        assert_eq!(*seen.borrow(), vec!["a", "q"]);
        assert_eq!(*later.borrow(), vec!["a"]);
        assert!(decoder.is_closed());
    }

    #[test]
    fn close_requested_outside_dispatch_applies_on_next_feed() {
        let mut decoder = Decoder::new();
        let keys = key_names(&mut decoder);
        let handle = decoder.close_handle();

        handle.request_close();
        assert!(decoder.is_closed());
        decoder.feed(b"x");
        assert!(keys.borrow().is_empty());
        assert!(handle.is_closed());
    }

    #[test]
    fn close_handle_clones_share_state() {
        let decoder = Decoder::new();
        let a = decoder.close_handle();
        let b = a.clone();
        b.request_close();
        assert!(a.is_closed());
        assert!(decoder.is_closed());
    }

    // ── Config ──────────────────────────────────────────────────

    #[test]
    fn default_config() {
        let config = DecoderConfig::default();
        assert_eq!(config.escape_timeout, Duration::from_millis(25));
        assert_eq!(config.max_pending_bytes, 256);
        assert_eq!(*Decoder::new().config(), config);
    }
}
