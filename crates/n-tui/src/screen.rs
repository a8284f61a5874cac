// SPDX-License-Identifier: MIT
//
// Screen: the logical grid of styled cells that everything draws to.
//
// The Screen knows nothing about terminals. It owns:
//
//   - a flat row-major `Vec<Cell>` (`index = y * columns + x`), so a row is
//     one contiguous slice and the writer can skip unchanged rows with a
//     single slice compare
//   - the style and hyperlink interning tables its cells point into
//   - a clip stack; the effective write region is the intersection of every
//     pushed rectangle and the grid bounds
//   - a process-unique id. Style and link ids only mean something next to
//     the tables that issued them, so a writer that sees a different screen
//     id cannot trust its shadow. Clones get a fresh id for the same reason.
//
// Drawing rules:
//
//   - Text is laid out by grapheme cluster with Unicode display widths. A
//     two-column cluster writes a glyph cell plus a continuation cell.
//   - Text never wraps. It is truncated at the right edge of the effective
//     region, and a wide cluster that does not fit entirely stops the write.
//   - Overwriting either half of a wide glyph blanks the other half, even if
//     that half sits just outside the clip. A half-glyph is never left in
//     the grid, because the terminal cannot display one.
//   - A space always lands as a blank cell (`CellContent::Empty`) in the
//     requested style, so "blank" has exactly one representation.
//
// Memory:
//
//   200×50 = 10,000 cells × 20 bytes = 200 KB. The writer keeps one more
//   copy as its shadow frame.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::cell::{Cell, CellContent, Glyph};
use crate::error::{Error, Result};
use crate::style::{
    DEFAULT_LINK_CAPACITY, DEFAULT_STYLE_CAPACITY, LinkId, LinkTable, Style, StyleId, StyleTable,
};

/// Largest accepted column or row count.
pub const MAX_DIMENSION: u16 = 4096;

// ─── ClipRect ────────────────────────────────────────────────────────────────

/// A half-open rectangle: columns `x1..x2`, rows `y1..y2`.
///
/// ```
/// use n_tui::screen::ClipRect;
///
/// let clip = ClipRect::new(2, 1, 8, 3);
/// assert!(clip.contains(2, 1));
/// assert!(clip.contains(7, 2));
/// assert!(!clip.contains(8, 2));
/// assert!(!clip.contains(7, 3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    pub x1: u16,
    pub y1: u16,
    pub x2: u16,
    pub y2: u16,
}

impl ClipRect {
    /// Create from corners. `x2`/`y2` are exclusive.
    #[inline]
    #[must_use]
    pub const fn new(x1: u16, y1: u16, x2: u16, y2: u16) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create from origin and size, saturating at `u16::MAX`.
    #[inline]
    #[must_use]
    pub const fn from_size(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x.saturating_add(width),
            y2: y.saturating_add(height),
        }
    }

    #[inline]
    #[must_use]
    pub const fn width(self) -> u16 {
        self.x2.saturating_sub(self.x1)
    }

    #[inline]
    #[must_use]
    pub const fn height(self) -> u16 {
        self.y2.saturating_sub(self.y1)
    }

    /// Whether this rectangle has zero area.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, x: u16, y: u16) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// Overlap of two rectangles, or `None` if they do not overlap.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let r = Self {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };
        if r.is_empty() { None } else { Some(r) }
    }
}

// ─── Box Drawing ─────────────────────────────────────────────────────────────

/// Border glyph set for [`Screen::draw_box`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStyle {
    #[default]
    Single,
    Double,
    Rounded,
    Heavy,
    Ascii,
}

/// The six glyphs a box border is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxGlyphs {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
}

impl LineStyle {
    /// Look up a style by name. Unknown names fall back to `Single`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "double" => Self::Double,
            "rounded" => Self::Rounded,
            "heavy" | "bold" => Self::Heavy,
            "ascii" => Self::Ascii,
            _ => Self::Single,
        }
    }

    #[must_use]
    pub const fn glyphs(self) -> BoxGlyphs {
        let (top_left, top_right, bottom_left, bottom_right, horizontal, vertical) = match self {
            Self::Single => ('┌', '┐', '└', '┘', '─', '│'),
            Self::Double => ('╔', '╗', '╚', '╝', '═', '║'),
            Self::Rounded => ('╭', '╮', '╰', '╯', '─', '│'),
            Self::Heavy => ('┏', '┓', '┗', '┛', '━', '┃'),
            Self::Ascii => ('+', '+', '+', '+', '-', '|'),
        };
        BoxGlyphs {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
            horizontal,
            vertical,
        }
    }
}

/// Options for [`Screen::draw_box`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxOptions {
    pub line: LineStyle,
    /// Style for the border (and the interior when `fill` is set).
    pub style: StyleId,
    /// Clear the interior to `fill_char`.
    pub fill: bool,
    pub fill_char: char,
}

impl Default for BoxOptions {
    fn default() -> Self {
        Self {
            line: LineStyle::Single,
            style: StyleId::DEFAULT,
            fill: false,
            fill_char: ' ',
        }
    }
}

// ─── Limits ──────────────────────────────────────────────────────────────────

/// Interning table capacities for a [`Screen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_styles: usize,
    pub max_links: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_styles: DEFAULT_STYLE_CAPACITY,
            max_links: DEFAULT_LINK_CAPACITY,
        }
    }
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// A `columns × rows` grid of cells with its own style and link tables.
///
/// ```
/// use n_tui::screen::Screen;
/// use n_tui::style::Style;
///
/// let mut screen = Screen::new(20, 3).unwrap();
/// let bold = screen.style(&Style::new().bold()).unwrap();
/// assert_eq!(screen.set_text(1, 1, "hello", bold), 5);
/// assert_eq!(screen.cell(1, 1).character(), Some('h'));
/// assert_eq!(screen.cell(1, 1).style, bold);
/// ```
static NEXT_SCREEN_ID: AtomicU64 = AtomicU64::new(1);

pub struct Screen {
    id: u64,
    columns: u16,
    rows: u16,
    cells: Vec<Cell>,
    styles: StyleTable,
    links: LinkTable,
    clips: Vec<ClipRect>,
}

impl Screen {
    // ─── Construction ────────────────────────────────────────────────────

    /// Create a blank screen with default table capacities.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimensions`] if either dimension is zero or larger
    /// than [`MAX_DIMENSION`].
    pub fn new(columns: u16, rows: u16) -> Result<Self> {
        Self::with_limits(columns, rows, Limits::default())
    }

    /// Create a blank screen with explicit table capacities.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimensions`] as for [`Screen::new`].
    pub fn with_limits(columns: u16, rows: u16, limits: Limits) -> Result<Self> {
        check_dimensions(columns, rows)?;
        Ok(Self {
            id: NEXT_SCREEN_ID.fetch_add(1, Ordering::Relaxed),
            columns,
            rows,
            cells: vec![Cell::EMPTY; usize::from(columns) * usize::from(rows)],
            styles: StyleTable::with_capacity(limits.max_styles),
            links: LinkTable::with_capacity(limits.max_links),
            clips: Vec::new(),
        })
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    /// Identity of this screen and its interning tables.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
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

    /// The whole grid as a rectangle.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> ClipRect {
        ClipRect::new(0, 0, self.columns, self.rows)
    }

    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.columns && y < self.rows
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.columns as usize + x as usize
    }

    /// Checked cell access.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// The cell at `(x, y)`, or [`Cell::EMPTY`] out of range.
    #[inline]
    #[must_use]
    pub fn cell(&self, x: u16, y: u16) -> Cell {
        self.get(x, y).copied().unwrap_or(Cell::EMPTY)
    }

    /// All cells, row-major.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// One row as a slice.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y < self.rows {
            let start = self.index(0, y);
            Some(&self.cells[start..start + usize::from(self.columns)])
        } else {
            None
        }
    }

    /// A row rendered as plain text: blanks become spaces, continuations
    /// contribute nothing.
    #[must_use]
    pub fn text_row(&self, y: u16) -> String {
        self.row(y)
            .map(|row| row.iter().map(Cell::symbol).collect())
            .unwrap_or_default()
    }

    // ─── Interning ───────────────────────────────────────────────────────

    /// Intern a style descriptor.
    ///
    /// # Errors
    ///
    /// [`Error::StyleCapacityExceeded`] when the table is full.
    pub fn style(&mut self, style: &Style) -> Result<StyleId> {
        self.styles.intern(style)
    }

    /// Intern a hyperlink target.
    ///
    /// # Errors
    ///
    /// [`Error::HyperlinkCapacityExceeded`] when the table is full.
    pub fn hyperlink(&mut self, url: &str) -> Result<LinkId> {
        self.links.intern(url)
    }

    #[must_use]
    pub fn resolve_style(&self, id: StyleId) -> Option<&Style> {
        self.styles.get(id)
    }

    #[must_use]
    pub fn resolve_link(&self, id: LinkId) -> Option<&str> {
        self.links.get(id)
    }

    #[must_use]
    pub const fn styles(&self) -> &StyleTable {
        &self.styles
    }

    #[must_use]
    pub const fn links(&self) -> &LinkTable {
        &self.links
    }

    // ─── Clipping ────────────────────────────────────────────────────────

    /// Push a clip rectangle with exclusive `x2`/`y2`. Writes are limited to
    /// the intersection of every pushed rectangle.
    pub fn clip(&mut self, x1: u16, y1: u16, x2: u16, y2: u16) {
        self.clips.push(ClipRect::new(x1, y1, x2, y2));
    }

    /// Pop the most recent clip rectangle. Returns `false` if none was pushed.
    pub fn unclip(&mut self) -> bool {
        self.clips.pop().is_some()
    }

    /// Number of pushed clip rectangles.
    #[must_use]
    pub fn clip_depth(&self) -> usize {
        self.clips.len()
    }

    /// The region writes currently land in, or `None` if the clips leave
    /// nothing writable.
    #[must_use]
    pub fn write_region(&self) -> Option<ClipRect> {
        self.clips
            .iter()
            .try_fold(self.bounds(), |acc, clip| acc.intersect(*clip))
    }

    /// `rect ∩ write_region`.
    fn region(&self, x: u16, y: u16, width: u16, height: u16) -> Option<ClipRect> {
        ClipRect::from_size(x, y, width, height).intersect(self.write_region()?)
    }

    // ─── Text ────────────────────────────────────────────────────────────

    /// Write `text` starting at `(x, y)`. Returns the number of columns written.
    ///
    /// Clusters are placed left to right with their display width. Control
    /// characters and zero-width clusters are skipped. Writing stops at the
    /// right edge of the write region; a wide cluster that would straddle the
    /// edge is not written.
    pub fn set_text(&mut self, x: u16, y: u16, text: &str, style: StyleId) -> u16 {
        let Some(region) = self.write_region() else {
            return 0;
        };
        if y < region.y1 || y >= region.y2 {
            return 0;
        }

        let mut col = u32::from(x);
        let right = u32::from(region.x2);
        let left = u32::from(region.x1);
        let mut written = 0u16;

        for cluster in text.graphemes(true) {
            let Some(width) = cluster_width(cluster) else {
                continue;
            };
            let w = u32::from(width);
            if col + w > right {
                break;
            }
            if col < left {
                col += w;
                continue;
            }
            let Some(glyph) = Glyph::from_cluster(cluster, width) else {
                continue;
            };
            // col + w <= right <= u16::MAX
            #[allow(clippy::cast_possible_truncation)]
            let cx = col as u16;
            self.put_glyph(cx, y, glyph, style);
            written += u16::from(width);
            col += w;
        }

        written
    }

    // ─── Fill & Clear ────────────────────────────────────────────────────

    /// Fill a rectangle with one character and style.
    ///
    /// A wide `ch` is laid down in glyph/continuation pairs; a trailing
    /// column too narrow for a pair is left alone. Control and zero-width
    /// characters fill with blanks.
    pub fn fill(&mut self, x: u16, y: u16, width: u16, height: u16, ch: char, style: StyleId) {
        let Some(r) = self.region(x, y, width, height) else {
            return;
        };

        let glyph = match ch.width() {
            Some(w @ 1..=2) if ch != ' ' => u8::try_from(w).ok().map(|w| Glyph::new(ch, w)),
            _ => None,
        };

        for row in r.y1..r.y2 {
            match glyph {
                Some(g) if g.is_wide() => {
                    let mut col = r.x1;
                    while u32::from(col) + 1 < u32::from(r.x2) {
                        self.put_glyph(col, row, g, style);
                        col += 2;
                    }
                }
                Some(g) => {
                    for col in r.x1..r.x2 {
                        self.put(col, row, Cell::glyph(g, style));
                    }
                }
                None => {
                    for col in r.x1..r.x2 {
                        self.put(col, row, Cell::blank(style));
                    }
                }
            }
        }
    }

    /// Reset the write region (the whole grid when unclipped) to blank
    /// default cells.
    pub fn clear(&mut self) {
        if self.clips.is_empty() {
            self.cells.fill(Cell::EMPTY);
            return;
        }
        if let Some(r) = self.write_region() {
            self.clear_region(r);
        }
    }

    /// Reset a rectangle (within the write region) to blank default cells.
    pub fn clear_rect(&mut self, x: u16, y: u16, width: u16, height: u16) {
        if let Some(r) = self.region(x, y, width, height) {
            self.clear_region(r);
        }
    }

    fn clear_region(&mut self, r: ClipRect) {
        for row in r.y1..r.y2 {
            for col in r.x1..r.x2 {
                self.put(col, row, Cell::EMPTY);
            }
        }
    }

    // ─── Hyperlinks ──────────────────────────────────────────────────────

    /// Attach (or with `None`, detach) a hyperlink to the cell at `(x, y)`.
    ///
    /// Both halves of a wide glyph always carry the same link. No-op outside
    /// the write region.
    pub fn set_hyperlink(&mut self, x: u16, y: u16, link: Option<LinkId>) {
        if !self.write_region().is_some_and(|r| r.contains(x, y)) {
            return;
        }
        let idx = self.index(x, y);
        self.cells[idx].link = link;
        if self.cells[idx].is_wide() && x + 1 < self.columns {
            self.cells[idx + 1].link = link;
        } else if self.cells[idx].is_continuation() && x > 0 {
            self.cells[idx - 1].link = link;
        }
    }

    // ─── Copy ────────────────────────────────────────────────────────────

    /// Copy a `width × height` block from `src` at `(sx, sy)` to `(dx, dy)`.
    ///
    /// Styles and links are re-interned into this screen's tables, so every
    /// copied id resolves here even if `src` numbered them differently.
    ///
    /// # Errors
    ///
    /// [`Error::StyleCapacityExceeded`] or [`Error::HyperlinkCapacityExceeded`]
    /// if re-interning overflows a table. Nothing is written in that case.
    #[allow(clippy::too_many_arguments)]
    pub fn copy(
        &mut self,
        src: &Self,
        sx: u16,
        sy: u16,
        dx: u16,
        dy: u16,
        width: u16,
        height: u16,
    ) -> Result<()> {
        let mut block = src.snapshot(sx, sy, width, height);

        let mut style_map: HashMap<StyleId, StyleId> = HashMap::new();
        let mut link_map: HashMap<LinkId, LinkId> = HashMap::new();
        for cell in &mut block.cells {
            if !cell.style.is_default() {
                let mapped = match style_map.get(&cell.style) {
                    Some(&id) => id,
                    None => {
                        let style = src.resolve_style(cell.style).copied().unwrap_or_default();
                        let id = self.styles.intern(&style)?;
                        style_map.insert(cell.style, id);
                        id
                    }
                };
                cell.style = mapped;
            }
            if let Some(link) = cell.link {
                let mapped = match link_map.get(&link) {
                    Some(&id) => Some(id),
                    None => match src.resolve_link(link) {
                        Some(url) => {
                            let id = self.links.intern(url)?;
                            link_map.insert(link, id);
                            Some(id)
                        }
                        None => None,
                    },
                };
                cell.link = mapped;
            }
        }

        self.blit(&block, dx, dy);
        Ok(())
    }

    /// Copy a block within this screen. Overlapping source and destination
    /// behave as if the source were read in full before writing.
    pub fn copy_within(&mut self, sx: u16, sy: u16, dx: u16, dy: u16, width: u16, height: u16) {
        let block = self.snapshot(sx, sy, width, height);
        self.blit(&block, dx, dy);
    }

    /// Read a block clipped to the grid bounds (not the clip stack).
    fn snapshot(&self, sx: u16, sy: u16, width: u16, height: u16) -> Block {
        let Some(r) = ClipRect::from_size(sx, sy, width, height).intersect(self.bounds()) else {
            return Block::default();
        };
        let mut cells = Vec::with_capacity(usize::from(r.width()) * usize::from(r.height()));
        for row in r.y1..r.y2 {
            let start = self.index(r.x1, row);
            cells.extend_from_slice(&self.cells[start..start + usize::from(r.width())]);
        }
        Block {
            width: r.width(),
            height: r.height(),
            cells,
        }
    }

    /// Write a block with its top-left at `(dx, dy)`, honoring the write
    /// region. Wide glyphs cut by the block or region edge become blanks.
    fn blit(&mut self, block: &Block, dx: u16, dy: u16) {
        let Some(region) = self.region(dx, dy, block.width, block.height) else {
            return;
        };

        for by in 0..block.height {
            let ty = dy + by;
            if ty < region.y1 || ty >= region.y2 {
                continue;
            }
            let row = &block.cells[usize::from(by) * usize::from(block.width)..][..usize::from(block.width)];
            let mut bx = 0u16;
            while bx < block.width {
                let cell = row[usize::from(bx)];
                let tx = dx + bx;
                if !region.contains(tx, ty) {
                    bx += 1;
                    continue;
                }
                if cell.is_wide() {
                    let pair_fits = bx + 1 < block.width
                        && row[usize::from(bx) + 1].is_continuation()
                        && region.contains(tx + 1, ty);
                    if pair_fits {
                        self.put_pair(tx, ty, cell);
                        bx += 2;
                        continue;
                    }
                    self.put(tx, ty, Cell::blank(cell.style));
                } else if cell.is_continuation() {
                    // Owner was outside the block or the region.
                    self.put(tx, ty, Cell::blank(cell.style));
                } else {
                    self.put(tx, ty, cell);
                }
                bx += 1;
            }
        }
    }

    // ─── Resize ──────────────────────────────────────────────────────────

    /// Change the grid size, keeping the overlapping top-left block.
    ///
    /// A wide glyph whose continuation falls off the new right edge becomes a
    /// blank. The interning tables and clip stack are untouched.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimensions`] as for [`Screen::new`].
    pub fn resize(&mut self, columns: u16, rows: u16) -> Result<()> {
        check_dimensions(columns, rows)?;
        if columns == self.columns && rows == self.rows {
            return Ok(());
        }

        let mut cells = vec![Cell::EMPTY; usize::from(columns) * usize::from(rows)];
        let keep_cols = usize::from(columns.min(self.columns));
        for y in 0..rows.min(self.rows) {
            let src = self.index(0, y);
            let dst = usize::from(y) * usize::from(columns);
            cells[dst..dst + keep_cols].copy_from_slice(&self.cells[src..src + keep_cols]);
            if columns < self.columns {
                let last = dst + keep_cols - 1;
                if cells[last].is_wide() {
                    cells[last] = Cell::blank(cells[last].style);
                }
            }
        }

        self.columns = columns;
        self.rows = rows;
        self.cells = cells;
        Ok(())
    }

    // ─── Boxes ───────────────────────────────────────────────────────────

    /// Draw a rectangular border, optionally filling the interior.
    ///
    /// Boxes smaller than 2×2 are not drawn. A box overhanging the grid is
    /// shrunk so its right and bottom borders land on the grid edge.
    pub fn draw_box(&mut self, x: u16, y: u16, width: u16, height: u16, opts: &BoxOptions) {
        if x >= self.columns || y >= self.rows {
            return;
        }
        let w = width.min(self.columns - x);
        let h = height.min(self.rows - y);
        if w < 2 || h < 2 {
            return;
        }
        let Some(region) = self.write_region() else {
            return;
        };

        if opts.fill && w > 2 && h > 2 {
            self.fill(x + 1, y + 1, w - 2, h - 2, opts.fill_char, opts.style);
        }

        let g = opts.line.glyphs();
        let (right, bottom) = (x + w - 1, y + h - 1);
        let plot = |screen: &mut Self, cx: u16, cy: u16, ch: char| {
            if region.contains(cx, cy) {
                screen.put(cx, cy, Cell::new(ch, opts.style));
            }
        };

        for cx in x + 1..right {
            plot(self, cx, y, g.horizontal);
            plot(self, cx, bottom, g.horizontal);
        }
        for cy in y + 1..bottom {
            plot(self, x, cy, g.vertical);
            plot(self, right, cy, g.vertical);
        }
        plot(self, x, y, g.top_left);
        plot(self, right, y, g.top_right);
        plot(self, x, bottom, g.bottom_left);
        plot(self, right, bottom, g.bottom_right);
    }

    // ─── Cell Writes ─────────────────────────────────────────────────────

    /// Write a glyph in `style`; spaces become blank cells.
    fn put_glyph(&mut self, x: u16, y: u16, glyph: Glyph, style: StyleId) {
        if glyph.is_wide() {
            self.put_pair(x, y, Cell::glyph(glyph, style));
        } else if glyph.as_str() == " " {
            self.put(x, y, Cell::blank(style));
        } else {
            self.put(x, y, Cell::glyph(glyph, style));
        }
    }

    /// Write one single-column cell. Caller guarantees `(x, y)` is in bounds.
    fn put(&mut self, x: u16, y: u16, cell: Cell) {
        self.break_wide_char_at(x, y);
        let idx = self.index(x, y);
        self.cells[idx] = cell;
    }

    /// Write a wide glyph and its continuation. Caller guarantees both
    /// columns are in bounds.
    fn put_pair(&mut self, x: u16, y: u16, cell: Cell) {
        self.break_wide_char_at(x, y);
        self.break_wide_char_at(x + 1, y);
        let idx = self.index(x, y);
        self.cells[idx] = cell;
        self.cells[idx + 1] = Cell::continuation(cell.style).with_link(cell.link);
    }

    /// Blank the other half of any wide glyph occupying `(x, y)`.
    fn break_wide_char_at(&mut self, x: u16, y: u16) {
        let idx = self.index(x, y);
        match self.cells[idx].content {
            CellContent::Continuation if x > 0 => {
                let owner = &mut self.cells[idx - 1];
                if owner.is_wide() {
                    *owner = Cell::blank(owner.style);
                }
            }
            CellContent::Glyph(g) if g.is_wide() && x + 1 < self.columns => {
                let next = &mut self.cells[idx + 1];
                if next.is_continuation() {
                    *next = Cell::blank(next.style);
                }
            }
            _ => {}
        }
    }
}

impl Clone for Screen {
    fn clone(&self) -> Self {
        Self {
            id: NEXT_SCREEN_ID.fetch_add(1, Ordering::Relaxed),
            columns: self.columns,
            rows: self.rows,
            cells: self.cells.clone(),
            styles: self.styles.clone(),
            links: self.links.clone(),
            clips: self.clips.clone(),
        }
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Screen({}x{})", self.columns, self.rows)
    }
}

/// A rectangular block of cells lifted out of a screen.
#[derive(Default)]
struct Block {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

fn check_dimensions(columns: u16, rows: u16) -> Result<()> {
    if columns == 0 || rows == 0 || columns > MAX_DIMENSION || rows > MAX_DIMENSION {
        return Err(Error::InvalidDimensions {
            columns: u32::from(columns),
            rows: u32::from(rows),
        });
    }
    Ok(())
}

// ─── Text Width Utilities ────────────────────────────────────────────────────

/// Columns a grapheme cluster occupies on screen: `Some(1)` or `Some(2)`, or
/// `None` for clusters that are not drawn (controls, lone zero-width marks).
#[must_use]
pub fn cluster_width(cluster: &str) -> Option<u8> {
    if cluster.chars().any(char::is_control) {
        return None;
    }
    match cluster.width() {
        0 => None,
        1 => Some(1),
        _ => Some(2),
    }
}

/// Display width of a string in terminal columns, as [`Screen::set_text`]
/// would lay it out.
///
/// ```
/// use n_tui::screen::display_width;
///
/// assert_eq!(display_width("hello"), 5);
/// assert_eq!(display_width("a世b"), 4);
/// assert_eq!(display_width("e\u{301}"), 1);
/// ```
#[must_use]
pub fn display_width(text: &str) -> usize {
    text.graphemes(true)
        .filter_map(cluster_width)
        .map(usize::from)
        .sum()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
