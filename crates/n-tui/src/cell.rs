// SPDX-License-Identifier: MIT
//
// Cell: the atomic unit of the screen.
//
// Every grid position is one Cell: what to draw there, a style id, and an
// optional hyperlink id. The whole pipeline exists to produce, diff, and
// output these.
//
// Content is a closed three-way variant:
//
//   Empty         nothing written; renders as a blank in the cell's style
//   Glyph         one grapheme cluster, one or two columns wide
//   Continuation  right half of a two-column glyph; never drawn on its own
//
// Grapheme clusters (a base character plus combining marks, variation
// selectors, ZWJ sequences) are stored inline in a fixed 12-byte buffer so
// a Cell stays `Copy` and equality stays a flat memcmp. Clusters that do
// not fit keep their base scalar only. In practice that is a handful of
// long emoji ZWJ sequences.
//
// Size: 20 bytes per cell. A 200×50 terminal is 10,000 cells, about 200 KB.

use std::fmt;

use crate::style::{LinkId, StyleId};

/// Inline capacity of a [`Glyph`] in UTF-8 bytes.
pub const GLYPH_CAPACITY: usize = 12;

// ─── Glyph ───────────────────────────────────────────────────────────────────

/// One grapheme cluster and its display width (1 or 2).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Glyph {
    bytes: [u8; GLYPH_CAPACITY],
    len: u8,
    width: u8,
}

impl Glyph {
    /// A single-scalar glyph. `width` is clamped to 1..=2.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // a char is at most 4 bytes
    pub fn new(ch: char, width: u8) -> Self {
        let mut bytes = [0; GLYPH_CAPACITY];
        let len = ch.encode_utf8(&mut bytes).len();
        Self {
            bytes,
            len: len as u8,
            width: width.clamp(1, 2),
        }
    }

    /// A glyph from a whole grapheme cluster. Clusters longer than
    /// [`GLYPH_CAPACITY`] bytes keep only their first scalar. Returns `None`
    /// for an empty string.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // bounded by GLYPH_CAPACITY
    pub fn from_cluster(cluster: &str, width: u8) -> Option<Self> {
        let first = cluster.chars().next()?;
        if cluster.len() > GLYPH_CAPACITY {
            return Some(Self::new(first, width));
        }
        let mut bytes = [0; GLYPH_CAPACITY];
        bytes[..cluster.len()].copy_from_slice(cluster.as_bytes());
        Some(Self {
            bytes,
            len: cluster.len() as u8,
            width: width.clamp(1, 2),
        })
    }

    /// The cluster text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Built only from whole `str`/`char` values, so always valid UTF-8.
        std::str::from_utf8(&self.bytes[..usize::from(self.len)]).unwrap_or("\u{FFFD}")
    }

    /// The base (first) scalar of the cluster.
    #[must_use]
    pub fn base(&self) -> char {
        self.as_str().chars().next().unwrap_or(' ')
    }

    /// Display width in columns: 1 or 2.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u8 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn is_wide(&self) -> bool {
        self.width == 2
    }
}

impl fmt::Debug for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())?;
        if self.is_wide() {
            write!(f, "×2")?;
        }
        Ok(())
    }
}

// ─── CellContent ─────────────────────────────────────────────────────────────

/// What occupies a grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellContent {
    /// Nothing written.
    #[default]
    Empty,
    /// A grapheme cluster.
    Glyph(Glyph),
    /// Second column of the wide glyph to the left.
    Continuation,
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single grid cell.
///
/// Two cells are equal when content, style id and link id are all equal;
/// that is exactly the condition under which the writer skips them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    pub content: CellContent,
    pub style: StyleId,
    pub link: Option<LinkId>,
}

impl Cell {
    /// Blank cell in the default style, no link.
    pub const EMPTY: Self = Self {
        content: CellContent::Empty,
        style: StyleId::DEFAULT,
        link: None,
    };

    /// A narrow glyph cell.
    #[must_use]
    pub fn new(ch: char, style: StyleId) -> Self {
        Self {
            content: CellContent::Glyph(Glyph::new(ch, 1)),
            style,
            link: None,
        }
    }

    /// A cell holding `glyph`.
    #[inline]
    #[must_use]
    pub const fn glyph(glyph: Glyph, style: StyleId) -> Self {
        Self {
            content: CellContent::Glyph(glyph),
            style,
            link: None,
        }
    }

    /// A blank cell in `style`.
    #[inline]
    #[must_use]
    pub const fn blank(style: StyleId) -> Self {
        Self {
            content: CellContent::Empty,
            style,
            link: None,
        }
    }

    /// The continuation half of a wide glyph. Shares the owner's style so the
    /// background covers both columns.
    #[inline]
    #[must_use]
    pub const fn continuation(style: StyleId) -> Self {
        Self {
            content: CellContent::Continuation,
            style,
            link: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_link(self, link: Option<LinkId>) -> Self {
        Self { link, ..self }
    }

    // ─── Queries ──────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn is_continuation(&self) -> bool {
        matches!(self.content, CellContent::Continuation)
    }

    /// Whether this is the default blank cell.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty) && self.style.is_default() && self.link.is_none()
    }

    /// Whether this cell starts a two-column glyph.
    #[inline]
    #[must_use]
    pub const fn is_wide(&self) -> bool {
        matches!(self.content, CellContent::Glyph(g) if g.is_wide())
    }

    /// Columns this cell covers when drawn: 2 for a wide glyph, 0 for a
    /// continuation, 1 otherwise.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u8 {
        match self.content {
            CellContent::Empty => 1,
            CellContent::Glyph(g) => g.width(),
            CellContent::Continuation => 0,
        }
    }

    /// The base character, if this cell holds a glyph.
    #[must_use]
    pub fn character(&self) -> Option<char> {
        match self.content {
            CellContent::Glyph(g) => Some(g.base()),
            _ => None,
        }
    }

    /// Text to put on the terminal for this cell. Empty cells draw a space;
    /// continuations draw nothing.
    #[must_use]
    pub fn symbol(&self) -> &str {
        match &self.content {
            CellContent::Empty => " ",
            CellContent::Glyph(g) => g.as_str(),
            CellContent::Continuation => "",
        }
    }

    /// Reset to [`Cell::EMPTY`].
    #[inline]
    pub const fn reset(&mut self) {
        *self = Self::EMPTY;
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.content {
            CellContent::Continuation => write!(f, "Cell(continuation")?,
            CellContent::Empty => write!(f, "Cell(empty")?,
            CellContent::Glyph(g) => write!(f, "Cell({g:?}")?,
        }
        if !self.style.is_default() {
            write!(f, ", style={}", self.style.0)?;
        }
        if let Some(link) = self.link {
            write!(f, ", link={}", link.get())?;
        }
        write!(f, ")")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
