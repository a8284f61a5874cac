// SPDX-License-Identifier: MIT
//
// Terminal plumbing: raw input mode, size query, panic-safe restore.
//
// Safety: termios (tcgetattr, tcsetattr), ioctl (TIOCGWINSZ), isatty and
// the raw fd write in the panic hook are plain POSIX calls with no safe
// wrapper in std. Each unsafe block is kept to the single call it needs.
#![allow(unsafe_code)]
//
// Raw mode is entered in exactly one place, `RawModeGuard::acquire`. The
// guard holds the termios it replaced and puts it back on drop, so every
// exit path (early return, `?`, close, panic unwinding) restores the line
// discipline. On a descriptor that is not a terminal the guard is inert:
// nothing is changed and nothing is restored.
//
// Output modes (alternate screen, mouse, paste, focus) are owned by the
// writer and undone by `Writer::close`. The panic hook is the backstop for
// both halves: it writes one pre-built reset sequence straight to fd 1,
// bypassing the stdout lock that a panicking frame may still be holding,
// then restores termios from a process-wide backup.

#[cfg(not(unix))]
use std::io::{self, Write};
use std::sync::Once;
#[cfg(unix)]
use std::sync::Mutex;

#[cfg(unix)]
use std::io;

use tracing::debug;

#[cfg(unix)]
pub use std::os::unix::io::RawFd;

/// Descriptor type on platforms without POSIX file descriptors.
#[cfg(not(unix))]
pub type RawFd = i32;

#[cfg(unix)]
const STDIN_FD: RawFd = libc::STDIN_FILENO;
#[cfg(not(unix))]
const STDIN_FD: RawFd = 0;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub columns: u16,
    pub rows: u16,
}

impl Size {
    /// Total number of cells (`columns × rows`).
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.columns as u32 * self.rows as u32
    }
}

// ─── Queries ────────────────────────────────────────────────────────────────

/// Query the terminal size of stdout via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if stdout is not a terminal or reports a zero dimension.
#[cfg(unix)]
#[must_use]
pub fn size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) };

    (result == 0 && ws.ws_col > 0 && ws.ws_row > 0).then_some(Size {
        columns: ws.ws_col,
        rows: ws.ws_row,
    })
}

#[cfg(not(unix))]
#[must_use]
pub fn size() -> Option<Size> {
    None
}

/// Whether stdin is connected to a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    is_tty_fd(libc::STDIN_FILENO)
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

#[cfg(unix)]
fn is_tty_fd(fd: RawFd) -> bool {
    unsafe { libc::isatty(fd) != 0 }
}

// ─── Panic-Safe Restore ─────────────────────────────────────────────────────

/// Termios to put back if the process panics while raw mode is active.
///
/// A guard owns its own copy; the hook cannot reach it, so the descriptor
/// and its original settings are mirrored here behind a [`Mutex`].
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<(RawFd, libc::termios)>> = Mutex::new(None);

#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some((fd, ref original)) = *guard {
            unsafe {
                let _ = libc::tcsetattr(fd, libc::TCSANOW, original);
            }
        }
    }
}

/// Every mode the engine can turn on, turned off.
///
/// End synchronized output, disable mouse (SGR + any-motion + drag +
/// click), disable bracketed paste and focus reporting, reset SGR, reset
/// the cursor shape, show the cursor, leave the alternate screen. The
/// alternate screen exit is last so the shell comes back clean.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l\
    \x1b[?2004l\
    \x1b[?1004l\
    \x1b[0m\
    \x1b[0 q\
    \x1b[?25h\
    \x1b[?1049l";

static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install the process-wide restore hook. Runs at most once.
///
/// The hook writes [`EMERGENCY_RESTORE`], restores termios from the backup,
/// then hands over to the previously installed hook so the panic message
/// lands on a working terminal.
pub fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();

            #[cfg(unix)]
            restore_termios_from_backup();

            original(info);
        }));
    });
}

fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── RawModeGuard ───────────────────────────────────────────────────────────

/// Raw input mode on one descriptor, restored when dropped.
///
/// # Example
///
/// ```no_run
/// use n_tui::terminal::RawModeGuard;
///
/// let guard = RawModeGuard::stdin()?;
/// // ... read keys byte by byte ...
/// drop(guard); // cooked mode again
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct RawModeGuard {
    fd: RawFd,
    #[cfg(unix)]
    original: Option<libc::termios>,
}

impl RawModeGuard {
    /// Put `fd` into raw mode (the `cfmakeraw` settings, `VMIN=1`,
    /// `VTIME=0`) and return a guard that undoes it.
    ///
    /// A descriptor that is not a terminal yields an inert guard. Also
    /// installs the panic hook.
    ///
    /// # Errors
    ///
    /// Returns the OS error if reading or applying termios fails.
    #[cfg(unix)]
    pub fn acquire(fd: RawFd) -> io::Result<Self> {
        if !is_tty_fd(fd) {
            debug!(target: "n_tui::terminal", fd, "raw_mode_skipped_not_a_tty");
            return Ok(Self { fd, original: None });
        }

        install_panic_hook();

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }
            let original = termios;

            termios.c_iflag &= !(libc::IGNBRK
                | libc::BRKINT
                | libc::PARMRK
                | libc::ISTRIP
                | libc::INLCR
                | libc::IGNCR
                | libc::ICRNL
                | libc::IXON);
            termios.c_oflag &= !libc::OPOST;
            termios.c_lflag &=
                !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
            termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
            termios.c_cflag |= libc::CS8;

            // read() blocks until at least one byte is available.
            termios.c_cc[libc::VMIN] = 1;
            termios.c_cc[libc::VTIME] = 0;

            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }

            if let Ok(mut backup) = TERMIOS_BACKUP.lock() {
                *backup = Some((fd, original));
            }

            debug!(target: "n_tui::terminal", fd, "raw_mode_acquired");
            Ok(Self {
                fd,
                original: Some(original),
            })
        }
    }

    /// No raw mode without termios: always an inert guard.
    ///
    /// # Errors
    ///
    /// Never fails on this platform.
    #[cfg(not(unix))]
    pub fn acquire(fd: RawFd) -> std::io::Result<Self> {
        debug!(target: "n_tui::terminal", fd, "raw_mode_unsupported");
        Ok(Self { fd })
    }

    /// [`acquire`](Self::acquire) on standard input.
    ///
    /// # Errors
    ///
    /// See [`acquire`](Self::acquire).
    pub fn stdin() -> std::io::Result<Self> {
        Self::acquire(STDIN_FD)
    }

    /// The descriptor this guard was acquired on.
    #[inline]
    #[must_use]
    pub const fn fd(&self) -> RawFd {
        self.fd
    }

    /// Whether raw mode is actually applied (false for inert guards and
    /// after [`restore`](Self::restore)).
    #[inline]
    #[must_use]
    #[cfg(unix)]
    pub const fn is_active(&self) -> bool {
        self.original.is_some()
    }

    #[inline]
    #[must_use]
    #[cfg(not(unix))]
    pub const fn is_active(&self) -> bool {
        false
    }

    /// Put the saved termios back. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the OS error if `tcsetattr` fails; the guard stays active
    /// so a later call (or drop) can retry.
    pub fn restore(&mut self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            let Some(ref original) = self.original else {
                return Ok(());
            };
            unsafe {
                if libc::tcsetattr(self.fd, libc::TCSAFLUSH, original) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }

            if let Ok(mut backup) = TERMIOS_BACKUP.lock() {
                if matches!(*backup, Some((fd, _)) if fd == self.fd) {
                    *backup = None;
                }
            }

            self.original = None;
            debug!(target: "n_tui::terminal", fd = self.fd, "raw_mode_restored");
        }

        Ok(())
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

impl std::fmt::Debug for RawModeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawModeGuard")
            .field("fd", &self.fd)
            .field("active", &self.is_active())
            .finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
