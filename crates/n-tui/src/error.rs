// SPDX-License-Identifier: MIT
//
// Error types for the engine.
//
// One enum for the whole crate. Capacity and dimension errors come from the
// Screen, `Closed` from the Writer, and `Io` from whatever sink or source
// the host plugged in. Malformed terminal input is never an error: the
// decoder turns it into best-effort key events instead.

use thiserror::Error;

/// Errors raised by [`Screen`](crate::screen::Screen) and
/// [`Writer`](crate::writer::Writer).
#[derive(Debug, Error)]
pub enum Error {
    /// The style table already holds its maximum number of distinct styles.
    #[error("style table full ({capacity} distinct styles)")]
    StyleCapacityExceeded { capacity: usize },

    /// The hyperlink table already holds its maximum number of targets.
    #[error("hyperlink table full ({capacity} distinct targets)")]
    HyperlinkCapacityExceeded { capacity: usize },

    /// Requested grid dimensions are zero or larger than the supported maximum.
    #[error("invalid screen dimensions {columns}x{rows}")]
    InvalidDimensions { columns: u32, rows: u32 },

    /// The writer was closed; no further output is possible.
    #[error("writer is closed")]
    Closed,

    /// The output sink or input source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_capacity_display() {
        let err = Error::StyleCapacityExceeded { capacity: 4096 };
        assert_eq!(err.to_string(), "style table full (4096 distinct styles)");
    }

    #[test]
    fn hyperlink_capacity_display() {
        let err = Error::HyperlinkCapacityExceeded { capacity: 16 };
        assert_eq!(err.to_string(), "hyperlink table full (16 distinct targets)");
    }

    #[test]
    fn invalid_dimensions_display() {
        let err = Error::InvalidDimensions { columns: 0, rows: 24 };
        assert_eq!(err.to_string(), "invalid screen dimensions 0x24");
    }

    #[test]
    fn closed_display() {
        assert_eq!(Error::Closed.to_string(), "writer is closed");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("gone"));
    }
}
