// SPDX-License-Identifier: MIT
//
// Styles and hyperlinks, interned.
//
// A cell never carries its colors and attributes inline. It carries a
// `StyleId`, a two-byte handle into the owning Screen's `StyleTable`, plus
// an optional `LinkId` into its `LinkTable`. Structurally equal descriptors
// always map to the same id, so:
//
//   - cell equality is two integer compares, which keeps the diff loop tight
//   - the writer emits SGR only when the *id* changes between cells
//   - a 200×50 screen costs the same memory whether it uses one style or 400
//
// Both tables are bounded. Id 0 of the style table is the default style and
// never consumes a slot; the link table has no id 0 at all (`LinkId` is
// non-zero, so `Option<LinkId>` is still two bytes). Once a table is full,
// interning a new descriptor fails. Ids are never recycled: anything a live
// cell points at stays resolvable for the table's lifetime.

use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroU16;

use crate::color::Color;
use crate::error::{Error, Result};

/// Default maximum number of distinct non-default styles per table.
pub const DEFAULT_STYLE_CAPACITY: usize = 4096;

/// Default maximum number of distinct hyperlink targets per table.
pub const DEFAULT_LINK_CAPACITY: usize = 4096;

static DEFAULT_STYLE: Style = Style::new();

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes stored as a compact bitfield.
    ///
    /// Each flag maps to one SGR parameter. Combine with bitwise OR:
    ///
    /// ```
    /// use n_tui::style::Attr;
    ///
    /// let attrs = Attr::BOLD | Attr::ITALIC;
    /// assert!(attrs.contains(Attr::BOLD));
    /// assert!(!attrs.contains(Attr::FAINT));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1: increased intensity.
        const BOLD          = 1 << 0;
        /// SGR 2: decreased intensity.
        const FAINT         = 1 << 1;
        /// SGR 3: italic.
        const ITALIC        = 1 << 2;
        /// SGR 5: blink.
        const BLINK         = 1 << 3;
        /// SGR 7: swap foreground and background.
        const INVERSE       = 1 << 4;
        /// SGR 8: invisible text.
        const INVISIBLE     = 1 << 5;
        /// SGR 9: crossed-out text.
        const STRIKETHROUGH = 1 << 6;
        /// SGR 53: line above the text.
        const OVERLINE      = 1 << 7;
    }
}

// ─── Underline Style ─────────────────────────────────────────────────────────

/// Underline variant.
///
/// Kept separate from [`Attr`] so there is no "underlined but which kind"
/// ambiguity: anything other than `None` is underlined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum UnderlineStyle {
    #[default]
    None = 0,
    /// SGR 4.
    Single = 1,
    /// SGR 4:2.
    Double = 2,
    /// SGR 4:3.
    Curly = 3,
    /// SGR 4:4.
    Dotted = 4,
    /// SGR 4:5.
    Dashed = 5,
}

impl UnderlineStyle {
    /// Whether any underline is active.
    #[inline]
    #[must_use]
    pub const fn is_underlined(self) -> bool {
        !matches!(self, Self::None)
    }
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// A complete style descriptor: colors, attributes, underline.
///
/// `Style::default()` is the no-op style, always interned as
/// [`StyleId::DEFAULT`].
///
/// ```
/// use n_tui::color::Color;
/// use n_tui::style::{Style, UnderlineStyle};
///
/// let error = Style::new()
///     .fg(Color::rgb(255, 85, 85))
///     .bold()
///     .underline(UnderlineStyle::Curly);
/// assert!(!error.is_default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attr,
    pub underline: UnderlineStyle,
    /// Underline color. `Color::Default` follows the foreground.
    pub underline_color: Color,
}

impl Style {
    /// The default style (equal to `Style::default()`).
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fg: Color::Default,
            bg: Color::Default,
            attrs: Attr::empty(),
            underline: UnderlineStyle::None,
            underline_color: Color::Default,
        }
    }

    #[inline]
    #[must_use]
    pub const fn fg(self, fg: Color) -> Self {
        Self { fg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn bg(self, bg: Color) -> Self {
        Self { bg, ..self }
    }

    /// Replace the attribute set.
    #[inline]
    #[must_use]
    pub const fn attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn underline(self, underline: UnderlineStyle) -> Self {
        Self { underline, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn underline_color(self, underline_color: Color) -> Self {
        Self {
            underline_color,
            ..self
        }
    }

    #[inline]
    #[must_use]
    pub const fn bold(self) -> Self {
        self.with(Attr::BOLD)
    }

    #[inline]
    #[must_use]
    pub const fn faint(self) -> Self {
        self.with(Attr::FAINT)
    }

    #[inline]
    #[must_use]
    pub const fn italic(self) -> Self {
        self.with(Attr::ITALIC)
    }

    #[inline]
    #[must_use]
    pub const fn inverse(self) -> Self {
        self.with(Attr::INVERSE)
    }

    #[inline]
    #[must_use]
    pub const fn strikethrough(self) -> Self {
        self.with(Attr::STRIKETHROUGH)
    }

    #[inline]
    #[must_use]
    pub const fn overline(self) -> Self {
        self.with(Attr::OVERLINE)
    }

    /// Add attribute flags to the current set.
    #[inline]
    #[must_use]
    pub const fn with(self, attrs: Attr) -> Self {
        Self {
            attrs: self.attrs.union(attrs),
            ..self
        }
    }

    /// Whether this is the no-op style.
    #[inline]
    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.fg.is_default()
            && self.bg.is_default()
            && self.attrs.is_empty()
            && !self.underline.is_underlined()
            && self.underline_color.is_default()
    }
}

// ─── Ids ─────────────────────────────────────────────────────────────────────

/// Handle to an interned [`Style`]. Only meaningful for the table that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct StyleId(pub u16);

impl StyleId {
    /// The default style. Valid in every table.
    pub const DEFAULT: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        self.0 == 0
    }
}

/// Handle to an interned hyperlink target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(NonZeroU16);

impl LinkId {
    /// The raw id, starting at 1.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0.get()
    }
}

// ─── Interner ────────────────────────────────────────────────────────────────

/// Bounded, append-only interner. Slot `i` holds the value for id `i + 1`.
#[derive(Debug, Clone)]
struct Interner<T> {
    values: Vec<T>,
    index: HashMap<T, u16>,
    capacity: usize,
}

impl<T: Clone + Eq + Hash> Interner<T> {
    fn new(capacity: usize) -> Self {
        // Ids are u16 and start at 1.
        let capacity = capacity.min(usize::from(u16::MAX));
        Self {
            values: Vec::new(),
            index: HashMap::new(),
            capacity,
        }
    }

    /// The existing id for `value`, or a freshly allocated one.
    /// `None` when the table is full.
    fn intern<Q>(&mut self, value: &Q) -> Option<u16>
    where
        T: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = T> + ?Sized,
    {
        if let Some(&id) = self.index.get(value) {
            return Some(id);
        }
        if self.values.len() >= self.capacity {
            return None;
        }
        self.values.push(value.to_owned());
        // capacity <= u16::MAX, so len fits.
        let id = u16::try_from(self.values.len()).ok()?;
        self.index.insert(value.to_owned(), id);
        Some(id)
    }

    fn get(&self, id: u16) -> Option<&T> {
        self.values.get(usize::from(id).checked_sub(1)?)
    }

    const fn len(&self) -> usize {
        self.values.len()
    }
}

// ─── StyleTable ──────────────────────────────────────────────────────────────

/// Bounded style interning table.
#[derive(Debug, Clone)]
pub struct StyleTable {
    inner: Interner<Style>,
}

impl StyleTable {
    /// Create a table holding at most `capacity` non-default styles.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Interner::new(capacity),
        }
    }

    /// Intern a style.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StyleCapacityExceeded`] when `style` is new and the
    /// table is full.
    pub fn intern(&mut self, style: &Style) -> Result<StyleId> {
        if style.is_default() {
            return Ok(StyleId::DEFAULT);
        }
        self.inner
            .intern(style)
            .map(StyleId)
            .ok_or(Error::StyleCapacityExceeded {
                capacity: self.inner.capacity,
            })
    }

    /// Resolve an id. `StyleId::DEFAULT` always resolves.
    #[must_use]
    pub fn get(&self, id: StyleId) -> Option<&Style> {
        if id.is_default() {
            return Some(&DEFAULT_STYLE);
        }
        self.inner.get(id.0)
    }

    /// Number of interned non-default styles.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_STYLE_CAPACITY)
    }
}

// ─── LinkTable ───────────────────────────────────────────────────────────────

/// Bounded hyperlink interning table.
#[derive(Debug, Clone)]
pub struct LinkTable {
    inner: Interner<String>,
}

impl LinkTable {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Interner::new(capacity),
        }
    }

    /// Intern a URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HyperlinkCapacityExceeded`] when `url` is new and the
    /// table is full.
    pub fn intern(&mut self, url: &str) -> Result<LinkId> {
        self.inner
            .intern(url)
            .and_then(NonZeroU16::new)
            .map(LinkId)
            .ok_or(Error::HyperlinkCapacityExceeded {
                capacity: self.inner.capacity,
            })
    }

    #[must_use]
    pub fn get(&self, id: LinkId) -> Option<&str> {
        self.inner.get(id.get()).map(String::as_str)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl Default for LinkTable {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LINK_CAPACITY)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
