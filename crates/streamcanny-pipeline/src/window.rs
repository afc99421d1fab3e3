//! Rolling line buffer and sliding K×K window.
//!
//! This is the primitive every neighborhood stage is built on. A
//! [`SlidingWindow`] keeps the last `K` rows of a scalar field (one
//! [`LineBuffer`]) plus a K×K [`Window`] that slides one column per
//! pixel. Neither structure ever shifts rows or columns in memory: the
//! line buffer maps frame row `y` to storage row `y % K`, and the window
//! overwrites its oldest column in place.
//!
//! # Delay and bounds
//!
//! When the pixel at slot `(x, y)` is ingested, the newest complete K×K
//! neighborhood is centred on `(x - r, y - r)` with `r = (K - 1) / 2`, so
//! a stage built on this window emits its input raster delayed by `r`
//! rows and `r` columns.
//!
//! Slots below the window's *origin* (the cumulative delay of the stages
//! upstream) carry no data yet. They are out of bounds exactly like cells
//! beyond the frame edge, and [`Neighborhood::get`] never returns them.
//! Because the window slides continuously across row boundaries, the
//! leftmost columns at the start of a row still hold the tail of the
//! previous row; the column bound excludes them.

use crate::types::{Coordinate, FrameDimensions};

/// Rolling store of the last `K` rows of a scalar field.
#[derive(Debug, Clone)]
pub struct LineBuffer<T, const K: usize> {
    width: usize,
    cells: Vec<T>,
}

impl<T: Copy + Default, const K: usize> LineBuffer<T, K> {
    /// Create a zeroed buffer for rows of `width` values.
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            width,
            cells: vec![T::default(); K * width],
        }
    }

    const fn index(&self, column: usize, row: usize) -> usize {
        (row % K) * self.width + column
    }

    /// Store `value` at (`column`, `row`) and return that column's last
    /// `K` rows, oldest first.
    ///
    /// Entry `r` of the result holds frame row `row - (K - 1) + r`. Entries
    /// for rows before the first are stale and must be bounds-checked by
    /// the caller.
    pub fn push(&mut self, column: usize, row: usize, value: T) -> [T; K] {
        let at = self.index(column, row);
        self.cells[at] = value;
        std::array::from_fn(|r| self.cells[self.index(column, row + 1 + r)])
    }

    /// Overwrite a value that is still held by the buffer.
    pub fn set(&mut self, column: usize, row: usize, value: T) {
        let at = self.index(column, row);
        self.cells[at] = value;
    }

    /// Zero every stored value.
    pub fn clear(&mut self) {
        self.cells.fill(T::default());
    }
}

/// A K×K neighborhood stored as a ring of columns.
#[derive(Debug, Clone)]
pub struct Window<T, const K: usize> {
    columns: [[T; K]; K],
    /// Storage index of the leftmost (oldest) column.
    oldest: usize,
}

impl<T: Copy + Default, const K: usize> Window<T, K> {
    /// Create a zeroed window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: [[T::default(); K]; K],
            oldest: 0,
        }
    }

    /// Drop the leftmost column and append `column` on the right.
    pub fn slide(&mut self, column: [T; K]) {
        self.columns[self.oldest] = column;
        self.oldest = (self.oldest + 1) % K;
    }

    /// Value at window row `row` (0 = top) and column `col` (0 = left).
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.columns[(self.oldest + col) % K][row]
    }

    /// Overwrite the value at window row `row`, column `col`.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.columns[(self.oldest + col) % K][row] = value;
    }

    /// Zero every cell.
    pub fn clear(&mut self) {
        self.columns = [[T::default(); K]; K];
        self.oldest = 0;
    }
}

impl<T: Copy + Default, const K: usize> Default for Window<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Line buffer plus window: the window stage shared by all
/// neighborhood operators.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T, const K: usize> {
    dims: FrameDimensions,
    origin: u32,
    lines: LineBuffer<T, K>,
    window: Window<T, K>,
    /// Slot of the pixel most recently ingested.
    last: Coordinate,
}

impl<T: Copy + Default, const K: usize> SlidingWindow<T, K> {
    /// Rows (and columns) between the newest ingested slot and the
    /// window centre.
    pub const RADIUS: u32 = ((K - 1) / 2) as u32;

    /// Create a window over frames of `dims` whose input is valid from
    /// slot `(origin, origin)` onward.
    #[must_use]
    pub fn new(dims: FrameDimensions, origin: u32) -> Self {
        Self {
            dims,
            origin,
            lines: LineBuffer::new(dims.width as usize),
            window: Window::new(),
            last: Coordinate::new(0, 0),
        }
    }

    /// First slot (on both axes) holding valid upstream data.
    #[must_use]
    pub const fn origin(&self) -> u32 {
        self.origin
    }

    /// Append `value` at slot `at` and return the neighborhood centred
    /// `RADIUS` rows and columns behind it.
    pub fn ingest(&mut self, value: T, at: Coordinate) -> Neighborhood<'_, T, K> {
        let column = self.lines.push(at.x as usize, at.y as usize, value);
        self.window.slide(column);
        self.last = at;
        self.neighborhood()
    }

    /// The neighborhood produced by the most recent [`ingest`](Self::ingest).
    #[must_use]
    pub fn neighborhood(&self) -> Neighborhood<'_, T, K> {
        Neighborhood {
            window: &self.window,
            center_x: i64::from(self.last.x) - i64::from(Self::RADIUS),
            center_y: i64::from(self.last.y) - i64::from(Self::RADIUS),
            origin: i64::from(self.origin),
            width: i64::from(self.dims.width),
            height: i64::from(self.dims.height),
        }
    }

    /// Replace the value at the current centre in both the window and
    /// the line buffer, so later neighborhoods observe the new value.
    ///
    /// Does nothing while the centre lies outside the frame.
    pub fn overwrite_center(&mut self, value: T) {
        let r = Self::RADIUS;
        if self.last.x < r || self.last.y < r {
            return;
        }
        let centre = r as usize;
        self.window.set(centre, centre, value);
        self.lines.set(
            (self.last.x - r) as usize,
            (self.last.y - r) as usize,
            value,
        );
    }

    /// Zero all buffered state.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.window.clear();
        self.last = Coordinate::new(0, 0);
    }
}

/// Read-only view of the K×K cells around one centre slot.
///
/// Offsets are `(d_row, d_col)` relative to the centre; negative rows
/// are above it, negative columns to its left.
#[derive(Debug, Clone, Copy)]
pub struct Neighborhood<'a, T, const K: usize> {
    window: &'a Window<T, K>,
    center_x: i64,
    center_y: i64,
    origin: i64,
    width: i64,
    height: i64,
}

impl<T: Copy + Default, const K: usize> Neighborhood<'_, T, K> {
    const R: i64 = ((K - 1) / 2) as i64;

    fn in_bounds(&self, d_row: i64, d_col: i64) -> bool {
        let row = self.center_y + d_row;
        let col = self.center_x + d_col;
        (self.origin..self.height).contains(&row) && (self.origin..self.width).contains(&col)
    }

    /// Whether the centre itself holds valid data.
    ///
    /// Until this is true a stage has nothing to compute and emits its
    /// startup placeholder.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.in_bounds(0, 0)
    }

    /// Centre slot, once [`is_ready`](Self::is_ready).
    #[must_use]
    pub fn center_coordinate(&self) -> Option<Coordinate> {
        if !self.is_ready() {
            return None;
        }
        let x = u32::try_from(self.center_x).ok()?;
        let y = u32::try_from(self.center_y).ok()?;
        Some(Coordinate::new(x, y))
    }

    /// The centre value, if in bounds.
    #[must_use]
    pub fn center(&self) -> Option<T> {
        self.get(0, 0)
    }

    /// The cell at `(d_row, d_col)` from the centre, or `None` when that
    /// cell is outside the frame or precedes the origin.
    #[must_use]
    pub fn get(&self, d_row: i32, d_col: i32) -> Option<T> {
        let (d_row, d_col) = (i64::from(d_row), i64::from(d_col));
        if d_row.abs() > Self::R || d_col.abs() > Self::R || !self.in_bounds(d_row, d_col) {
            return None;
        }
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let (row, col) = ((d_row + Self::R) as usize, (d_col + Self::R) as usize);
        Some(self.window.get(row, col))
    }

    /// Every in-bounds cell as `(d_row, d_col, value)`, top-left first.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32, T)> + '_ {
        #[allow(clippy::cast_possible_truncation)]
        let r = Self::R as i32;
        (-r..=r).flat_map(move |d_row| {
            (-r..=r).filter_map(move |d_col| self.get(d_row, d_col).map(|v| (d_row, d_col, v)))
        })
    }

    /// Correlate the in-bounds cells with a K×K integer kernel.
    ///
    /// Out-of-bounds cells contribute nothing and the kernel is not
    /// renormalised.
    #[must_use]
    pub fn correlate(&self, kernel: &[[i32; K]; K]) -> i32
    where
        T: Into<i32>,
    {
        #[allow(clippy::cast_possible_truncation)]
        let r = Self::R as i32;
        self.cells()
            .map(|(d_row, d_col, v)| {
                #[allow(clippy::cast_sign_loss)]
                let (i, j) = ((d_row + r) as usize, (d_col + r) as usize);
                kernel[i][j] * v.into()
            })
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_returns_column_oldest_first() {
        let mut lines: LineBuffer<u8, 3> = LineBuffer::new(2);
        lines.push(0, 0, 1);
        lines.push(0, 1, 2);
        let column = lines.push(0, 2, 3);
        assert_eq!(column, [1, 2, 3]);
        // Row 3 evicts row 0.
        let column = lines.push(0, 3, 4);
        assert_eq!(column, [2, 3, 4]);
    }

    #[test]
    fn line_buffer_columns_are_independent() {
        let mut lines: LineBuffer<u8, 3> = LineBuffer::new(2);
        lines.push(0, 0, 10);
        lines.push(1, 0, 20);
        assert_eq!(lines.push(1, 1, 21), [0, 20, 21]);
        assert_eq!(lines.push(0, 1, 11), [0, 10, 11]);
    }

    #[test]
    fn window_slides_left() {
        let mut window: Window<u8, 3> = Window::new();
        window.slide([1, 1, 1]);
        window.slide([2, 2, 2]);
        window.slide([3, 3, 3]);
        assert_eq!(window.get(0, 0), 1);
        assert_eq!(window.get(1, 2), 3);
        window.slide([4, 4, 4]);
        assert_eq!(window.get(2, 0), 2);
        assert_eq!(window.get(2, 2), 4);
    }

    /// Ingest a whole frame where each value encodes its coordinate and
    /// return, for every slot, the centre value seen (if ready).
    fn centres(width: u32, height: u32, origin: u32) -> Vec<Option<u16>> {
        let mut win: SlidingWindow<u16, 3> =
            SlidingWindow::new(FrameDimensions::new(width, height), origin);
        let mut out = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let value = u16::try_from(y * 100 + x).unwrap();
                let hood = win.ingest(value, Coordinate::new(x, y));
                out.push(hood.center());
            }
        }
        out
    }

    #[test]
    fn centre_lags_by_radius() {
        let width = 5;
        let seen = centres(width, 4, 0);
        // Slot (3, 2) sees centre (2, 1).
        assert_eq!(seen[(2 * width + 3) as usize], Some(102));
        // Slot (0, 2) would centre on column -1: not ready.
        assert_eq!(seen[(2 * width) as usize], None);
        // Row 0 never has a ready centre.
        assert!(seen[..width as usize].iter().all(Option::is_none));
    }

    #[test]
    fn origin_delays_readiness() {
        let width = 6;
        let seen = centres(width, 6, 2);
        // Slot (2, 2) centres on (1, 1) which precedes the origin.
        assert_eq!(seen[(2 * width + 2) as usize], None);
        // Slot (3, 3) centres on (2, 2), the first valid slot.
        assert_eq!(seen[(3 * width + 3) as usize], Some(202));
    }

    #[test]
    fn wrapped_columns_are_out_of_bounds() {
        let mut win: SlidingWindow<u16, 3> = SlidingWindow::new(FrameDimensions::new(4, 3), 0);
        let mut last = None;
        for y in 0..3 {
            for x in 0..4 {
                let value = u16::try_from(y * 100 + x + 1).unwrap();
                let hood = win.ingest(value, Coordinate::new(x, y));
                if (x, y) == (1, 2) {
                    // Centre (0, 1): its left column holds the previous
                    // row's tail and must be excluded.
                    assert_eq!(hood.center(), Some(101));
                    assert_eq!(hood.get(0, -1), None);
                    assert_eq!(hood.get(0, 1), Some(102));
                    assert_eq!(hood.get(-1, 0), Some(1));
                    assert_eq!(hood.get(1, 1), Some(202));
                    last = Some(hood.cells().count());
                }
            }
        }
        // 3x3 minus the excluded left column.
        assert_eq!(last, Some(6));
    }

    #[test]
    fn correlate_skips_out_of_bounds_cells() {
        let mut win: SlidingWindow<u8, 3> = SlidingWindow::new(FrameDimensions::new(3, 3), 0);
        let ones = [[1; 3]; 3];
        let mut sums = Vec::new();
        for y in 0..3 {
            for x in 0..3 {
                let hood = win.ingest(1, Coordinate::new(x, y));
                if hood.is_ready() {
                    sums.push(hood.correlate(&ones));
                }
            }
        }
        // Centres (0,0), (1,0), (0,1), (1,1): corner sees 4 cells,
        // edges 6, the interior 9.
        assert_eq!(sums, vec![4, 6, 6, 9]);
    }

    #[test]
    fn overwrite_center_is_visible_to_the_next_row() {
        let mut win: SlidingWindow<u8, 3> = SlidingWindow::new(FrameDimensions::new(4, 4), 0);
        for y in 0..4 {
            for x in 0..4 {
                let hood = win.ingest(7, Coordinate::new(x, y));
                if (x, y) == (3, 2) {
                    // Centre (2, 1); (1, 1) is to its left.
                    assert_eq!(hood.get(0, -1), Some(9));
                }
                if (x, y) == (2, 3) {
                    // Centre (1, 2); (1, 1) is directly above.
                    assert_eq!(hood.get(-1, 0), Some(9));
                }
                if (x, y) == (2, 2) {
                    assert_eq!(hood.center(), Some(7));
                    win.overwrite_center(9);
                    assert_eq!(win.neighborhood().center(), Some(9));
                }
            }
        }
    }

    #[test]
    fn five_by_five_radius_is_two() {
        assert_eq!(SlidingWindow::<u8, 5>::RADIUS, 2);
        assert_eq!(SlidingWindow::<u8, 3>::RADIUS, 1);
    }
}
