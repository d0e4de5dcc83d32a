//! Weighted random picker (cumulative weights + binary search).

use rand::Rng;

#[derive(Debug, Clone)]
pub struct LootTable<T> {
    items: Vec<T>,
    /// Running weight total up to and including each item.
    cumulative: Vec<f64>,
}

impl<T> Default for LootTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LootTable<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cumulative: Vec::new(),
        }
    }

    /// Adds an item. Non-positive or non-finite weights can never be picked and are skipped.
    pub fn push(&mut self, item: T, weight: f64) {
        if !(weight.is_finite() && weight > 0.0) {
            log::warn!("loot table: ignoring item with weight {}", weight);
            return;
        }
        let total = self.total() + weight;
        self.items.push(item);
        self.cumulative.push(total);
    }

    pub fn total(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        let roll = rng.gen_range(0.0..self.total());
        let idx = self.cumulative.partition_point(|&c| c <= roll);
        self.items.get(idx.min(self.items.len() - 1))
    }
}

impl<T> FromIterator<(T, f64)> for LootTable<T> {
    fn from_iter<I: IntoIterator<Item = (T, f64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (item, weight) in iter {
            table.push(item, weight);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_empty_table_picks_nothing() {
        let table: LootTable<u8> = LootTable::new();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(table.pick(&mut rng).is_none());
    }

    #[test]
    fn test_zero_weight_is_never_picked() {
        let table: LootTable<char> = [('a', 0.0), ('b', 1.0), ('c', f64::NAN)].into_iter().collect();
        assert_eq!(table.len(), 1);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(table.pick(&mut rng), Some(&'b'));
        }
    }

    #[test]
    fn test_weights_shape_distribution() {
        let table: LootTable<usize> = [(0, 1.0), (1, 9.0)].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(42);
        let mut hits = [0usize; 2];
        for _ in 0..10_000 {
            hits[*table.pick(&mut rng).unwrap()] += 1;
        }
        assert!(hits[1] > hits[0] * 5, "unexpected distribution {:?}", hits);
        assert!(hits[0] > 500);
    }
}
