use crate::selection::SelectionKey;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PartialEntry {
    pub sum: u128,
    pub cells: SelectionKey,
}

/// Open addressing hash table from power sums to partial selections.
///
/// Sums collide, so every slot keeps its exact cells and a lookup yields all
/// entries with the probed sum. Linear probing, no deletion: the entries for
/// one sum all sit in the probe run that starts at its home slot.
#[derive(Clone, Debug)]
pub struct PartialSumTable {
    slots: Vec<Option<PartialEntry>>,
    len: usize,
    load_factor: f64,
}

impl PartialSumTable {
    pub fn new(capacity: usize, load_factor: f64) -> Self {
        let load_factor = load_factor.clamp(0.1, 0.95);
        let capacity = capacity.max(2).next_power_of_two();

        PartialSumTable {
            slots: vec![None; capacity],
            len: 0,
            load_factor,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn home(&self, sum: u128) -> usize {
        let folded = (sum as u64) ^ ((sum >> 64) as u64);
        // fibonacci hashing, capacity is a power of two
        let hash = folded.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        (hash >> (64 - self.slots.len().trailing_zeros())) as usize
    }

    /// Inserts unless an entry with the same cells is already stored.
    ///
    /// Returns whether a new entry was stored.
    pub fn insert(&mut self, sum: u128, cells: SelectionKey) -> bool {
        if self.contains(sum, &cells) {
            return false;
        }

        if (self.len + 1) as f64 > self.capacity() as f64 * self.load_factor {
            self.grow();
        }

        self.place(PartialEntry { sum, cells });
        self.len += 1;
        true
    }

    pub fn contains(&self, sum: u128, cells: &SelectionKey) -> bool {
        self.matches(sum).any(|entry| entry.cells == *cells)
    }

    /// Every stored entry whose sum is exactly `sum`
    pub fn matches(&self, sum: u128) -> impl Iterator<Item = &PartialEntry> + '_ {
        let mask = self.capacity() - 1;
        let home = self.home(sum);

        (0..self.capacity())
            .map(move |k| &self.slots[(home + k) & mask])
            .map_while(Option::as_ref)
            .filter(move |entry| entry.sum == sum)
    }

    /// Empties the table and keeps its allocation
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.len = 0;
    }

    fn place(&mut self, entry: PartialEntry) {
        let mask = self.capacity() - 1;
        let mut index = self.home(entry.sum);
        while self.slots[index].is_some() {
            index = (index + 1) & mask;
        }
        self.slots[index] = Some(entry);
    }

    fn grow(&mut self) {
        let new_capacity = self.capacity() * 2;
        let old = std::mem::replace(&mut self.slots, vec![None; new_capacity]);
        for entry in old.into_iter().flatten() {
            self.place(entry);
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    fn key(cells: &[(usize, usize)]) -> SelectionKey {
        SelectionKey::from_cells(cells.to_vec())
    }

    #[test]
    fn duplicate_cells_stored_once() {
        let mut table = PartialSumTable::new(8, 0.7);

        assert!(table.insert(50, key(&[(0, 1), (1, 3)])));
        // same cells, picked in the other order
        assert!(!table.insert(50, key(&[(1, 3), (0, 1)])));

        assert_eq!(table.len(), 1);
        assert_eq!(table.matches(50).count(), 1);
    }

    #[test]
    fn colliding_sums_stored_twice() {
        let mut table = PartialSumTable::new(8, 0.7);

        assert!(table.insert(50, key(&[(0, 1), (1, 3)])));
        assert!(table.insert(50, key(&[(0, 2), (1, 0)])));
        assert!(table.insert(51, key(&[(0, 2), (1, 1)])));

        assert_eq!(table.len(), 3);
        assert_eq!(table.matches(50).count(), 2);
        assert_eq!(table.matches(51).count(), 1);
        assert_eq!(table.matches(49).count(), 0);
    }

    #[test]
    fn grows_under_load() {
        let mut table = PartialSumTable::new(4, 0.7);

        for sum in 0..100u128 {
            table.insert(sum % 37, key(&[(sum as usize, 0)]));
        }

        assert_eq!(table.len(), 100);
        assert!(table.len() as f64 <= table.capacity() as f64 * 0.7);
        for sum in 0..37u128 {
            let expected = (0..100u128).filter(|s| *s % 37 == sum).count();
            assert_eq!(table.matches(sum).count(), expected);
        }

        let capacity = table.capacity();
        table.reset();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.matches(3).count(), 0);
    }
}
