// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background stdin reader.
//
// `read()` on stdin blocks, and the host loop has to stay responsive for
// rendering, resize handling and the decoder's escape deadline. So one
// thread does nothing but read: it ships each chunk of raw bytes over a
// channel, and the loop waits on that channel with `recv_timeout`.
//
// Decoding never happens on this thread. The reader does not know what a
// key is; it only moves bytes, in order, to whoever holds the receiver.
//
// Shutdown: the thread polls stdin with a short timeout and checks a stop
// flag between polls, so it never sits in a blocking `read()` that nothing
// can interrupt.

#[cfg(unix)]
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use tracing::debug;

/// Bytes read per `read()` call. A keypress is 1-6 bytes, a paste can be
/// kilobytes; larger pastes simply arrive in several chunks.
const READ_BUF_SIZE: usize = 4096;

/// How often the thread wakes to check the stop flag (milliseconds).
const POLL_TIMEOUT_MS: i32 = 50;

/// Background stdin reader thread.
///
/// Runs until [`stop`](Self::stop) is called, the `StdinReader` is dropped,
/// stdin reaches EOF, or the receiver is dropped.
///
/// # Example
///
/// ```no_run
/// use n_tui::decoder::Decoder;
/// use n_tui::reader::StdinReader;
///
/// let mut decoder = Decoder::new();
/// let (_reader, rx) = StdinReader::spawn()?;
/// while let Ok(bytes) = rx.recv() {
///     decoder.feed(&bytes);
/// }
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct StdinReader {
    /// `None` after `stop()` joined the thread.
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl StdinReader {
    /// Spawn the reader thread.
    ///
    /// Each received `Vec<u8>` is a non-empty chunk of raw stdin data. The
    /// channel closes when the reader stops or stdin hits EOF.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn() -> std::io::Result<(Self, Receiver<Vec<u8>>)> {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || Self::reader_loop(&tx, &stop_flag))?;

        debug!(target: "n_tui::terminal", "stdin_reader_started");
        Ok((
            Self {
                handle: Some(handle),
                stop,
            },
            rx,
        ))
    }

    /// Whether the thread has been asked to stop.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Signal the thread to stop and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!(target: "n_tui::terminal", "stdin_reader_stopped");
        }
    }

    #[cfg(unix)]
    fn reader_loop(tx: &mpsc::Sender<Vec<u8>>, stop: &AtomicBool) {
        use std::os::unix::io::AsRawFd;

        let stdin_fd = io::stdin().as_raw_fd();
        let mut buf = [0u8; READ_BUF_SIZE];

        while !stop.load(Ordering::Relaxed) {
            let ready = unsafe {
                let mut pfd = libc::pollfd {
                    fd: stdin_fd,
                    events: libc::POLLIN,
                    revents: 0,
                };
                libc::poll(&raw mut pfd, 1, POLL_TIMEOUT_MS)
            };

            // Timeout or EINTR: go round and check the flag.
            if ready <= 0 {
                continue;
            }

            let n = unsafe { libc::read(stdin_fd, buf.as_mut_ptr().cast(), buf.len()) };
            if n <= 0 {
                break;
            }

            #[allow(clippy::cast_sign_loss)] // n > 0 checked above.
            let chunk = buf[..n as usize].to_vec();
            if tx.send(chunk).is_err() {
                break;
            }
        }
    }

    /// Blocking reads without poll: stop takes effect after the next chunk.
    #[cfg(not(unix))]
    fn reader_loop(tx: &mpsc::Sender<Vec<u8>>, stop: &AtomicBool) {
        use std::io::Read;

        let stdin = std::io::stdin();
        let mut buf = [0u8; READ_BUF_SIZE];

        while !stop.load(Ordering::Relaxed) {
            match stdin.lock().read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for StdinReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdinReader")
            .field("running", &self.handle.is_some())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn buffer_and_poll_bounds() {
        assert!((1024..=65536).contains(&READ_BUF_SIZE));
        assert!((10..=500).contains(&POLL_TIMEOUT_MS));
    }

    #[test]
    fn spawn_and_stop() {
        // stdin is not a terminal under the test harness; the thread must
        // still start and shut down without hanging.
        let (mut reader, _rx) = StdinReader::spawn().unwrap();
        assert!(!reader.is_stopped());
        reader.stop();
        assert!(reader.is_stopped());
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut reader, _rx) = StdinReader::spawn().unwrap();
        reader.stop();
        reader.stop();
        assert!(format!("{reader:?}").contains("running: false"));
    }

    #[test]
    fn drop_stops_reader() {
        let (reader, _rx) = StdinReader::spawn().unwrap();
        drop(reader);
    }

    #[test]
    fn channel_closes_after_stop() {
        let (mut reader, rx) = StdinReader::spawn().unwrap();
        reader.stop();

        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
