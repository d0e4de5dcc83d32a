//! Occupancy grid: cell states, row clears, and the whole-grid invert / scroll transforms.

use crate::tile::Tile;
use rand::Rng;
use std::collections::VecDeque;
use std::ops::{Add, AddAssign, Sub};

/// Grid coordinate. Row 0 is the top visible row; negative rows are the spawn buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridPos {
    pub col: i32,
    pub row: i32,
}

impl GridPos {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

impl Add for GridPos {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.col + rhs.col, self.row + rhs.row)
    }
}

impl AddAssign for GridPos {
    fn add_assign(&mut self, rhs: Self) {
        self.col += rhs.col;
        self.row += rhs.row;
    }
}

impl Sub for GridPos {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.col - rhs.col, self.row - rhs.row)
    }
}

/// Single cell of the occupancy map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellState {
    #[default]
    Empty,
    /// Claimed by a tile that has locked into the stack.
    Settled,
    /// Claimed by a tile of the block currently in play.
    Active,
}

impl CellState {
    #[inline]
    pub fn is_occupied(self) -> bool {
        self != Self::Empty
    }
}

/// Playfield occupancy. rows[0] is the top row.
#[derive(Debug, Clone)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    rows: VecDeque<Vec<CellState>>,
    /// Cells written during the current move pass; see `begin_move`.
    claimed: Vec<GridPos>,
}

impl Grid {
    pub fn new(width: u16, height: u16) -> Self {
        let (w, h) = (width.max(1) as usize, height.max(1) as usize);
        Self {
            width: w,
            height: h,
            rows: (0..h).map(|_| vec![CellState::Empty; w]).collect(),
            claimed: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        for row in &mut self.rows {
            row.fill(CellState::Empty);
        }
        self.claimed.clear();
    }

    /// `(col, row)` as storage indices, or `None` outside the visible grid.
    #[inline]
    fn index(&self, pos: GridPos) -> Option<(usize, usize)> {
        if pos.col < 0 || pos.row < 0 {
            return None;
        }
        let (c, r) = (pos.col as usize, pos.row as usize);
        (c < self.width && r < self.height).then_some((c, r))
    }

    #[inline]
    pub fn get(&self, pos: GridPos) -> Option<CellState> {
        self.index(pos).map(|(c, r)| self.rows[r][c])
    }

    #[inline]
    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.get(pos).is_some_and(CellState::is_occupied)
    }

    #[inline]
    pub fn is_settled(&self, pos: GridPos) -> bool {
        self.get(pos) == Some(CellState::Settled)
    }

    #[inline]
    pub fn column_in_range(&self, col: i32) -> bool {
        col >= 0 && (col as usize) < self.width
    }

    /// Whether a tile may not enter `pos`. The spawn buffer above row 0 is open;
    /// anything left, right, or below the grid is blocked.
    pub fn is_blocked(&self, pos: GridPos) -> bool {
        if !self.column_in_range(pos.col) || pos.row >= self.height as i32 {
            return true;
        }
        pos.row >= 0 && self.is_occupied(pos)
    }

    /// Writes are ignored outside the visible grid (including the spawn buffer).
    pub fn set_cell(&mut self, pos: GridPos, value: CellState) {
        if let Some((c, r)) = self.index(pos) {
            self.rows[r][c] = value;
        }
    }

    pub fn clear_cell(&mut self, pos: GridPos) {
        self.set_cell(pos, CellState::Empty);
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellState]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn row_is_full(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .is_some_and(|cells| cells.iter().all(|c| c.is_occupied()))
    }

    fn row_is_empty(cells: &[CellState]) -> bool {
        cells.iter().all(|c| !c.is_occupied())
    }

    pub fn occupied_count(&self) -> usize {
        self.rows()
            .map(|r| r.iter().filter(|c| c.is_occupied()).count())
            .sum()
    }

    /// Start a move pass. Tiles of one block are reconciled one at a time, so a
    /// cell vacated by one tile may already have been claimed by another.
    pub fn begin_move(&mut self) {
        self.claimed.clear();
    }

    pub fn end_move(&mut self) {
        self.claimed.clear();
    }

    /// Incremental occupancy update for one tile moving from `previous` to `new`.
    /// `previous` is left alone when another tile claimed it earlier in this pass.
    /// Settled cells are never overwritten or cleared by an active tile.
    pub fn update_tile_cell(&mut self, previous: GridPos, new: GridPos) {
        if new.row >= 0 {
            if !self.is_settled(new) {
                self.set_cell(new, CellState::Active);
            }
            self.claimed.push(new);
        }
        if previous.row >= 0
            && previous != new
            && !self.claimed.contains(&previous)
            && self.get(previous) == Some(CellState::Active)
        {
            self.clear_cell(previous);
        }
    }

    /// Clears every full row among `count` rows starting at `start`.
    ///
    /// Each full row (ascending) is removed and an empty row inserted on top;
    /// settled tiles on it are dropped and those above move down one row.
    /// Returns the cleared row indices.
    pub fn clear_full_rows(&mut self, settled: &mut Vec<Tile>, start: i32, count: usize) -> Vec<usize> {
        let first = start.max(0) as usize;
        let last = (start + count as i32).clamp(0, self.height as i32) as usize;
        let cleared: Vec<usize> = (first..last).filter(|&r| self.row_is_full(r)).collect();

        for &row in &cleared {
            self.rows.remove(row);
            self.rows.push_front(vec![CellState::Empty; self.width]);

            let row = row as i32;
            settled.retain(|t| t.position.row != row);
            for tile in settled.iter_mut().filter(|t| t.position.row < row) {
                tile.place(tile.position + GridPos::new(0, 1));
            }
        }
        if !cleared.is_empty() {
            log::debug!("cleared rows {:?}", cleared);
        }
        cleared
    }

    /// Flips the grid upside down, then moves every fully empty row to the top
    /// so the stack keeps resting on the floor. Interior gaps close up too.
    ///
    /// Tiles are remapped wholesale with the same row permutation. Returns the
    /// number of empty rows relocated.
    pub fn invert(&mut self, tiles: &mut [Tile]) -> usize {
        let h = self.height;
        // order[new_row] = old_row
        let mut order: Vec<usize> = (0..h).rev().collect();
        let mut start = 0;
        let mut scan = 0;
        while scan < h {
            if Self::row_is_empty(&self.rows[order[scan]]) {
                let old = order.remove(scan);
                order.insert(0, old);
                start += 1;
            }
            scan += 1;
        }

        let mut new_index = vec![0usize; h];
        for (new, &old) in order.iter().enumerate() {
            new_index[old] = new;
        }
        self.rows = order.iter().map(|&old| self.rows[old].clone()).collect();

        for tile in tiles.iter_mut() {
            let row = tile.position.row;
            let new_row = if (0..h as i32).contains(&row) {
                new_index[row as usize] as i32
            } else {
                start as i32 + h as i32 - row - 1
            };
            tile.place(GridPos::new(tile.position.col, new_row));
        }
        log::debug!("grid inverted ({} empty rows lifted)", start);
        start
    }

    /// Rotates every row by `direction` columns with wrap-around; `None` picks
    /// left or right at random. Returns the direction used.
    pub fn scroll<R: Rng + ?Sized>(&mut self, tiles: &mut [Tile], direction: Option<i32>, rng: &mut R) -> i32 {
        let direction = direction.unwrap_or_else(|| if rng.gen_bool(0.5) { 1 } else { -1 });
        let w = self.width as i32;
        let shift = direction.rem_euclid(w) as usize;
        for row in &mut self.rows {
            row.rotate_right(shift);
        }
        for tile in tiles.iter_mut() {
            let col = (tile.position.col + direction).rem_euclid(w);
            tile.place(GridPos::new(col, tile.position.row));
        }
        log::debug!("grid scrolled by {}", direction);
        direction
    }

    /// Render offset of a cell relative to the board origin, for cells of
    /// `cell_w` x `cell_h` terminal cells. `extra_rows` are drawn above row 0.
    pub fn to_screen(&self, pos: GridPos, cell_w: u16, cell_h: u16, extra_rows: u16) -> Option<(u16, u16)> {
        if !self.column_in_range(pos.col) || pos.row >= self.height as i32 {
            return None;
        }
        let y = pos.row + extra_rows as i32;
        (y >= 0).then(|| (pos.col as u16 * cell_w, y as u16 * cell_h))
    }
}
