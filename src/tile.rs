//! A single occupied cell, owned by a block while in play and by the stack after locking.

use crate::grid::{Grid, GridPos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub position: GridPos,
    /// Last position committed to the occupancy grid.
    pub previous: GridPos,
    /// Could still move down when last evaluated.
    pub falling: bool,
    /// Palette index (see `Theme::block_color`).
    pub colour: u8,
}

impl Tile {
    pub fn new(position: GridPos, colour: u8) -> Self {
        Self {
            position,
            previous: position,
            falling: true,
            colour,
        }
    }

    /// Moves by `delta` and reconciles the grid through the incremental path.
    pub fn shift(&mut self, delta: GridPos, grid: &mut Grid) {
        self.position += delta;
        self.commit(grid);
    }

    /// Pushes a changed position into the grid. Returns whether anything moved.
    pub fn commit(&mut self, grid: &mut Grid) -> bool {
        if self.position == self.previous {
            return false;
        }
        grid.update_tile_cell(self.previous, self.position);
        self.previous = self.position;
        true
    }

    /// Wholesale relocation for grid-wide transforms that rewrite occupancy themselves.
    pub fn place(&mut self, position: GridPos) {
        self.position = position;
        self.previous = position;
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.position.row >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellState;

    #[test]
    fn test_shift_moves_cell() {
        let mut grid = Grid::new(4, 4);
        let mut tile = Tile::new(GridPos::new(1, 0), 2);
        grid.set_cell(tile.position, CellState::Active);
        grid.begin_move();
        tile.shift(GridPos::new(1, 1), &mut grid);
        grid.end_move();
        assert_eq!(tile.position, GridPos::new(2, 1));
        assert_eq!(tile.previous, tile.position);
        assert!(!grid.is_occupied(GridPos::new(1, 0)));
        assert_eq!(grid.get(GridPos::new(2, 1)), Some(CellState::Active));
    }

    #[test]
    fn test_commit_without_motion_is_noop() {
        let mut grid = Grid::new(4, 4);
        let mut tile = Tile::new(GridPos::new(0, 0), 0);
        assert!(!tile.commit(&mut grid));
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_place_skips_grid() {
        let mut tile = Tile::new(GridPos::new(0, 0), 0);
        tile.place(GridPos::new(3, -1));
        assert_eq!(tile.previous, GridPos::new(3, -1));
        assert!(!tile.is_visible());
    }
}
