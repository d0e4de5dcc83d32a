//! Block layouts and their spawn weights.

use crate::loot::LootTable;

/// Rectangular occupancy layout. `cells[row][col]`; no blank rows top or bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    name: &'static str,
    cells: Vec<Vec<bool>>,
}

impl Shape {
    /// Parses rows separated by `/` or newlines; `1` or `#` marks an occupied cell.
    /// Short rows are padded, and blank rows at the top or bottom are dropped.
    pub fn parse(name: &'static str, layout: &str) -> Self {
        let mut cells: Vec<Vec<bool>> = layout
            .split(['/', '\n'])
            .map(|row| row.trim().chars().map(|c| c == '1' || c == '#').collect())
            .collect();
        while cells.first().is_some_and(|r: &Vec<bool>| !r.contains(&true)) {
            cells.remove(0);
        }
        while cells.last().is_some_and(|r| !r.contains(&true)) {
            cells.pop();
        }
        let width = cells.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut cells {
            row.resize(width, false);
        }
        if cells.is_empty() {
            return Self::dot();
        }
        Self { name, cells }
    }

    /// Single cell.
    pub fn dot() -> Self {
        Self {
            name: "dot",
            cells: vec![vec![true]],
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn height(&self) -> usize {
        self.cells.len()
    }

    pub fn width(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    pub fn rows(&self) -> &[Vec<bool>] {
        &self.cells
    }

    /// (row, col) offsets of the occupied cells, top to bottom.
    pub fn offsets(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, filled)| **filled)
                .map(move |(c, _)| (r, c))
        })
    }

    pub fn rotated_cw(&self) -> Self {
        let (h, w) = (self.height(), self.width());
        let cells = (0..w)
            .map(|c| (0..h).map(|r| self.cells[h - 1 - r][c]).collect())
            .collect();
        Self { name: self.name, cells }
    }
}

/// Base layouts, the number of quarter-turn variants in play, and the weight of each variant.
const LAYOUTS: &[(&str, &str, usize, f64)] = &[
    ("O", "11/11", 1, 7.0),
    ("T", "111/010", 4, 5.0 / 3.0),
    ("L", "10/10/11", 4, 5.0 / 2.0),
    ("I", "1111", 2, 5.0),
    ("Z", "110/011", 2, 5.0 / 3.0),
    ("S", "011/110", 2, 5.0 / 3.0),
    ("slash", "001/010/100", 2, 5.0),
    ("donut", "111/101/111", 1, 1.0),
    ("fish", "1011/0111/1011", 4, 0.25),
    ("bow", "1001/1111/1001", 1, 1.0),
];

/// Every shape variant with its spawn weight.
pub fn catalogue() -> LootTable<Shape> {
    let mut table = LootTable::new();
    for &(name, layout, variants, weight) in LAYOUTS {
        let mut shape = Shape::parse(name, layout);
        for _ in 0..variants {
            let next = shape.rotated_cw();
            table.push(shape, weight);
            shape = next;
        }
    }
    log::debug!("{} shape variants", table.len());
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_parse_trims_blank_rows_and_pads() {
        let s = Shape::parse("t", "000/111/01/000");
        assert_eq!(s.height(), 2);
        assert_eq!(s.width(), 3);
        assert_eq!(s.rows(), &[vec![true, true, true], vec![false, true, false]]);
    }

    #[test]
    fn test_parse_blank_layout_falls_back_to_dot() {
        assert_eq!(Shape::parse("blank", "000/000"), Shape::dot());
    }

    #[test]
    fn test_rotation_cycles() {
        let l = Shape::parse("L", "10/10/11");
        let r = l.rotated_cw();
        assert_eq!((r.height(), r.width()), (2, 3));
        assert_eq!(r.rows(), &[vec![true, true, true], vec![true, false, false]]);
        assert_eq!(r.rotated_cw().rotated_cw().rotated_cw(), l);
    }

    #[test]
    fn test_offsets_top_to_bottom() {
        let s = Shape::parse("S", "011/110");
        let offsets: Vec<_> = s.offsets().collect();
        assert_eq!(offsets, vec![(0, 1), (0, 2), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_catalogue_has_all_variants() {
        let table = catalogue();
        assert_eq!(table.len(), 23);
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let s = table.pick(&mut rng).unwrap();
            assert!(s.height() > 0 && s.offsets().count() > 0);
        }
    }
}
