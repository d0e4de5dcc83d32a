//! Rigid multi-tile block and its movement resolver.
//!
//! A move request is split into its horizontal and vertical components, each
//! checked independently against the grid, and only the feasible part is
//! applied. Vertical failure drives the lock-delay state machine:
//!
//! ```text
//! Falling --(down blocked)--> Locking --(timer expires)--> Locked
//!    ^                           |
//!    +-------(any motion)--------+
//! ```

use crate::grid::{Grid, GridPos};
use crate::shapes::Shape;
use crate::tile::Tile;
use crate::timers::LockSignal;

/// Result of one resolved move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOutcome {
    pub horizontal: bool,
    pub vertical: bool,
    pub lock: LockSignal,
}

impl MoveOutcome {
    pub fn moved(&self) -> bool {
        self.horizontal || self.vertical
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    shape: Shape,
    anchor: GridPos,
    /// tiles[shape_row][shape_col], `None` where the shape is empty.
    tiles: Vec<Vec<Option<Tile>>>,
    falling: bool,
    /// Staged anchor, applied by `apply_pending_move`.
    pending: Option<GridPos>,
    colour: u8,
}

impl Block {
    pub fn new(shape: Shape, colour: u8, anchor: GridPos) -> Self {
        let tiles = shape
            .rows()
            .iter()
            .enumerate()
            .map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .map(|(c, &filled)| {
                        filled.then(|| Tile::new(anchor + GridPos::new(c as i32, r as i32), colour))
                    })
                    .collect()
            })
            .collect();
        Self {
            shape,
            anchor,
            tiles,
            falling: true,
            pending: None,
            colour,
        }
    }

    /// New block centred on the drop column with its bottom row just above the grid.
    pub fn spawn(shape: Shape, colour: u8, grid_width: usize) -> Self {
        let drop_col = (grid_width / 2) as i32;
        let anchor = GridPos::new(
            drop_col - (shape.width() / 2) as i32,
            -1 - (shape.height() as i32 - 1),
        );
        Self::new(shape, colour, anchor)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn anchor(&self) -> GridPos {
        self.anchor
    }

    pub fn colour(&self) -> u8 {
        self.colour
    }

    pub fn height(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_falling(&self) -> bool {
        self.falling
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().flatten().flatten()
    }

    pub fn into_tiles(self) -> Vec<Tile> {
        self.tiles.into_iter().flatten().flatten().collect()
    }

    /// Stage an absolute anchor target.
    pub fn stage_move(&mut self, target: GridPos) {
        self.pending = Some(target);
    }

    /// Stage a relative step on top of whatever is already staged.
    pub fn nudge(&mut self, dx: i32, dy: i32) {
        let base = self.pending.unwrap_or(self.anchor);
        self.stage_move(base + GridPos::new(dx, dy));
    }

    /// Whether staging `(dx, dy)` would stack onto an axis that already has a staged step.
    pub fn pending_overlaps(&self, dx: i32, dy: i32) -> bool {
        self.pending.is_some_and(|p| {
            let staged = p - self.anchor;
            (dx != 0 && staged.col != 0) || (dy != 0 && staged.row != 0)
        })
    }

    pub fn apply_pending_move(&mut self, grid: &mut Grid) -> MoveOutcome {
        match self.pending.take() {
            Some(target) => self.move_to(target, grid),
            None => MoveOutcome::default(),
        }
    }

    pub fn move_by(&mut self, dx: i32, dy: i32, grid: &mut Grid) -> MoveOutcome {
        self.move_to(self.anchor + GridPos::new(dx, dy), grid)
    }

    /// Resolve a move of the anchor to `target`, applying only the feasible axes.
    pub fn move_to(&mut self, target: GridPos, grid: &mut Grid) -> MoveOutcome {
        let GridPos { col: dx, row: dy } = target - self.anchor;
        let mut horizontal = dx != 0;
        let mut vertical = dy != 0;
        let mut lock = LockSignal::None;
        if !(horizontal || vertical) {
            return MoveOutcome::default();
        }

        let height = grid.height as i32;
        let shape_rows = self.tiles.len() as i32;

        for r in 0..self.tiles.len() {
            let occupied: Vec<usize> = (0..self.tiles[r].len())
                .filter(|&c| self.tiles[r][c].is_some())
                .collect();
            let (Some(&first), Some(&last)) = (occupied.first(), occupied.last()) else {
                continue;
            };

            // Only the leading tile of each row can hit something sideways.
            if horizontal {
                let lead = if dx < 0 { first } else { last };
                if let Some(tile) = &self.tiles[r][lead] {
                    let dest = GridPos::new(tile.position.col + dx, tile.position.row);
                    if !grid.column_in_range(dest.col) || (tile.position.row >= 0 && grid.is_settled(dest)) {
                        horizontal = false;
                    }
                }
            }

            if dy != 0 {
                for &c in &occupied {
                    let Some(tile) = self.tiles[r][c] else { continue };
                    let dest = GridPos::new(tile.position.col, tile.position.row + dy);
                    let blocked = dest.row > height - 1 || (dest.row >= 0 && grid.is_blocked(dest));
                    // A tile of this same block in the destination shape row will move out of the way.
                    let own_below = blocked && {
                        let below = r as i32 + dy;
                        (0..shape_rows).contains(&below)
                            && self.tiles[below as usize].get(c).is_some_and(Option::is_some)
                    };
                    if let Some(t) = self.tiles[r][c].as_mut() {
                        t.falling = !blocked || own_below;
                    }
                    if blocked && !own_below {
                        vertical = false;
                        if self.falling {
                            self.falling = false;
                            lock = LockSignal::Arm;
                        }
                    }
                }
            }
        }

        if !(horizontal || vertical) {
            return MoveOutcome {
                horizontal,
                vertical,
                lock,
            };
        }

        if dy != 0 && !vertical {
            // Blocked below but sliding: stays landed, and the slide restarts the delay.
            lock = LockSignal::Arm;
        } else {
            self.falling = true;
            lock = LockSignal::Cancel;
        }

        let delta = GridPos::new(if horizontal { dx } else { 0 }, if vertical { dy } else { 0 });
        self.anchor += delta;
        grid.begin_move();
        for tile in self.tiles.iter_mut().flatten().flatten() {
            tile.shift(delta, grid);
            if vertical {
                tile.falling = true;
            }
        }
        grid.end_move();

        MoveOutcome {
            horizontal,
            vertical,
            lock,
        }
    }
}

#[cfg(test)]
impl Block {
    /// Marks the visible cells active without going through a move.
    pub(crate) fn stamp(&self, grid: &mut Grid) {
        for tile in self.tiles().filter(|t| t.is_visible()) {
            grid.set_cell(tile.position, crate::grid::CellState::Active);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellState;

    fn block_at(layout: &str, col: i32, row: i32, grid: &mut Grid) -> Block {
        let block = Block::new(Shape::parse("test", layout), 0, GridPos::new(col, row));
        block.stamp(grid);
        block
    }

    fn positions(block: &Block) -> Vec<GridPos> {
        block.tiles().map(|t| t.position).collect()
    }

    fn assert_tiles_follow_anchor(block: &Block) {
        for (tile, (r, c)) in block.tiles().zip(block.shape().offsets()) {
            assert_eq!(tile.position, block.anchor() + GridPos::new(c as i32, r as i32));
        }
    }

    #[test]
    fn test_spawn_sits_above_grid() {
        let block = Block::spawn(Shape::parse("L", "10/10/11"), 1, 10);
        assert_eq!(block.anchor(), GridPos::new(4, -3));
        assert!(block.tiles().all(|t| t.position.row < 0));
        let wide = Block::spawn(Shape::parse("I", "1111"), 1, 10);
        assert_eq!(wide.anchor(), GridPos::new(3, -1));
    }

    #[test]
    fn test_enters_grid_from_spawn_buffer() {
        let mut grid = Grid::new(10, 20);
        let mut block = Block::spawn(Shape::parse("O", "11/11"), 0, 10);
        let out = block.move_by(0, 1, &mut grid);
        assert!(out.vertical);
        assert_eq!(grid.occupied_count(), 2);
        block.move_by(0, 1, &mut grid);
        assert_eq!(grid.occupied_count(), 4);
        assert_tiles_follow_anchor(&block);
    }

    #[test]
    fn test_walls_stop_horizontal_motion() {
        let mut grid = Grid::new(5, 5);
        let mut block = block_at("11/11", 0, 0, &mut grid);
        let out = block.move_by(-1, 0, &mut grid);
        assert_eq!(out, MoveOutcome::default());
        assert_eq!(block.anchor(), GridPos::new(0, 0));

        let mut block = block_at("11/11", 3, 2, &mut grid);
        assert!(!block.move_by(1, 0, &mut grid).moved());
    }

    #[test]
    fn test_settled_cell_blocks_horizontal_motion() {
        let mut grid = Grid::new(6, 6);
        grid.set_cell(GridPos::new(3, 3), CellState::Settled);
        let mut block = block_at("11/11", 1, 2, &mut grid);
        assert!(!block.move_by(1, 0, &mut grid).moved());
        assert!(block.move_by(-1, 0, &mut grid).horizontal);
        assert_eq!(block.anchor(), GridPos::new(0, 2));
    }

    #[test]
    fn test_spawn_buffer_rows_skip_settled_check() {
        let mut grid = Grid::new(6, 6);
        grid.set_cell(GridPos::new(3, 0), CellState::Settled);
        // leading tile of the top row is at row -1: only the wall check applies there
        let mut block = block_at("1/1", 2, -1, &mut grid);
        assert!(!block.move_by(1, 0, &mut grid).moved(), "bottom row still collides");
        let mut block = block_at("1", 2, -1, &mut grid);
        assert!(block.move_by(1, 0, &mut grid).horizontal);
    }

    #[test]
    fn test_floor_blocks_and_arms_lock() {
        let mut grid = Grid::new(4, 4);
        let mut block = block_at("11", 0, 3, &mut grid);
        let out = block.move_by(0, 1, &mut grid);
        assert!(!out.moved());
        assert_eq!(out.lock, LockSignal::Arm);
        assert!(!block.is_falling());
        assert!(block.tiles().all(|t| !t.falling));

        // Already landed: a second failure does not re-arm.
        let out = block.move_by(0, 1, &mut grid);
        assert_eq!(out.lock, LockSignal::None);
    }

    #[test]
    fn test_motion_cancels_lock_and_restores_falling() {
        let mut grid = Grid::new(4, 4);
        let mut block = block_at("1", 0, 3, &mut grid);
        block.move_by(0, 1, &mut grid);
        assert!(!block.is_falling());
        let out = block.move_by(1, 0, &mut grid);
        assert!(out.horizontal);
        assert_eq!(out.lock, LockSignal::Cancel);
        assert!(block.is_falling());
    }

    #[test]
    fn test_axis_independence_on_diagonal_request() {
        let mut grid = Grid::new(6, 6);
        let mut block = block_at("11", 1, 5, &mut grid);
        block.move_by(0, 1, &mut grid);
        assert!(!block.is_falling());

        let out = block.move_to(GridPos::new(2, 6), &mut grid);
        assert!(out.horizontal);
        assert!(!out.vertical);
        assert_eq!(block.anchor(), GridPos::new(2, 5));
        assert!(!block.is_falling());
        assert_eq!(out.lock, LockSignal::Arm);
        assert_eq!(grid.occupied_count(), 2);
        assert!(grid.is_occupied(GridPos::new(3, 5)));
    }

    #[test]
    fn test_diagonal_when_falling_applies_both_axes() {
        let mut grid = Grid::new(6, 6);
        let mut block = block_at("11/01", 1, 1, &mut grid);
        let out = block.move_to(GridPos::new(0, 2), &mut grid);
        assert!(out.horizontal && out.vertical);
        assert_eq!(out.lock, LockSignal::Cancel);
        assert_eq!(positions(&block), vec![GridPos::new(0, 2), GridPos::new(1, 2), GridPos::new(1, 3)]);
        assert_eq!(grid.occupied_count(), 3);
    }

    #[test]
    fn test_own_lower_tile_does_not_block() {
        let mut grid = Grid::new(4, 6);
        let mut block = block_at("1/1/1", 1, 0, &mut grid);
        let out = block.move_by(0, 1, &mut grid);
        assert!(out.vertical);
        assert_eq!(positions(&block), vec![GridPos::new(1, 1), GridPos::new(1, 2), GridPos::new(1, 3)]);
        assert_eq!(grid.occupied_count(), 3);
        assert!(!grid.is_occupied(GridPos::new(1, 0)));
    }

    #[test]
    fn test_gapped_column_is_checked_per_tile() {
        // "1/0/1": the top tile's destination is the shape's hole, which
        // may hold a settled tile.
        let mut grid = Grid::new(3, 6);
        grid.set_cell(GridPos::new(0, 1), CellState::Settled);
        let mut block = block_at("1/0/1", 0, 0, &mut grid);
        assert!(!block.move_by(0, 1, &mut grid).vertical);

        let mut grid = Grid::new(3, 6);
        let mut block = block_at("1/0/1", 0, 0, &mut grid);
        assert!(block.move_by(0, 1, &mut grid).vertical);
        assert_eq!(grid.occupied_count(), 2);
    }

    #[test]
    fn test_overhang_uses_leading_tile_only() {
        // Row "1001" moving right: only the rightmost tile is checked, so the
        // left tile may enter the settled cell inside the gap.
        let mut grid = Grid::new(6, 4);
        grid.set_cell(GridPos::new(1, 3), CellState::Settled);
        let mut block = block_at("1001", 0, 3, &mut grid);
        assert!(block.move_by(1, 0, &mut grid).horizontal);
        assert_eq!(block.anchor(), GridPos::new(1, 3));
        assert!(grid.is_settled(GridPos::new(1, 3)));
        assert!(block.move_by(1, 0, &mut grid).horizontal);
        assert!(grid.is_settled(GridPos::new(1, 3)), "settled cell survives the pass");
        assert_eq!(grid.occupied_count(), 3);
    }

    #[test]
    fn test_two_phase_apply() {
        let mut grid = Grid::new(6, 6);
        let mut block = block_at("1", 2, 2, &mut grid);
        block.nudge(-1, 0);
        block.nudge(0, 1);
        assert!(block.pending_overlaps(0, 1));
        assert!(!block.pending_overlaps(0, 0));
        assert_eq!(block.anchor(), GridPos::new(2, 2));
        let out = block.apply_pending_move(&mut grid);
        assert!(out.horizontal && out.vertical);
        assert_eq!(block.anchor(), GridPos::new(1, 3));
        assert!(!block.pending_overlaps(1, 1));
        assert_eq!(block.apply_pending_move(&mut grid), MoveOutcome::default());

        block.stage_move(GridPos::new(4, 3));
        block.apply_pending_move(&mut grid);
        assert_eq!(block.anchor(), GridPos::new(4, 3));
        assert_eq!(grid.occupied_count(), 1);
    }

    #[test]
    fn test_arbitrary_delta() {
        let mut grid = Grid::new(10, 10);
        let mut block = block_at("11/11", 0, 0, &mut grid);
        let out = block.move_by(3, 4, &mut grid);
        assert!(out.horizontal && out.vertical);
        assert_eq!(block.anchor(), GridPos::new(3, 4));
        assert_eq!(grid.occupied_count(), 4);
        assert_tiles_follow_anchor(&block);
    }
}
