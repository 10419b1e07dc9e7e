use std::fmt::Debug;

/// Small fixed-width marker set, used for "value already placed" markers of
/// Latin square rows and columns.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BitSet {
    bits: BitType,
}

type BitType = u128;

impl BitSet {
    pub const CAPACITY: usize = BitType::BITS as usize;

    #[inline]
    pub const fn empty() -> Self {
        BitSet { bits: 0 }
    }

    #[inline]
    pub const fn all_less_than(n: usize) -> Self {
        if n >= Self::CAPACITY {
            return BitSet { bits: BitType::MAX };
        }
        BitSet {
            bits: ((1 as BitType) << n) - 1,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    #[inline]
    pub fn insert(&mut self, index: usize) {
        debug_assert!(index < Self::CAPACITY);
        self.bits |= 1 << index;
    }

    #[inline]
    pub fn remove(&mut self, index: usize) {
        debug_assert!(index < Self::CAPACITY);
        self.bits &= !(1 << index);
    }

    #[inline]
    pub const fn contains(&self, index: usize) -> bool {
        debug_assert!(index < Self::CAPACITY);
        (self.bits & (1 << index)) != 0
    }

    #[inline]
    pub const fn union(&self, other: Self) -> Self {
        BitSet {
            bits: self.bits | other.bits,
        }
    }

    #[inline]
    pub const fn intersect(&self, other: Self) -> Self {
        BitSet {
            bits: self.bits & other.bits,
        }
    }

    #[inline]
    pub const fn complement(&self) -> Self {
        BitSet { bits: !self.bits }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Smallest element that is at least `start`
    #[inline]
    pub fn first_at_least(&self, start: usize) -> Option<usize> {
        if start >= Self::CAPACITY {
            return None;
        }
        self.intersect(Self::all_less_than(start).complement())
            .into_iter()
            .next()
    }
}

impl IntoIterator for BitSet {
    type IntoIter = BitSetIter;
    type Item = usize;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        BitSetIter { bitset: self }
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut bitset = BitSet::empty();
        for item in iter {
            bitset.insert(item);
        }
        bitset
    }
}

pub struct BitSetIter {
    bitset: BitSet,
}

impl Iterator for BitSetIter {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let next = self.bitset.bits.trailing_zeros() as usize;

        if next < BitSet::CAPACITY {
            // remove first set bit
            self.bitset.bits = (self.bitset.bits - 1) & self.bitset.bits;
            Some(next)
        } else {
            None
        }
    }
}

impl Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitSet")
            .field("set_bits", &self.into_iter().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn first_at_least() {
        let set: BitSet = [1, 4, 7].into_iter().collect();

        assert_eq!(set.first_at_least(0), Some(1));
        assert_eq!(set.first_at_least(2), Some(4));
        assert_eq!(set.first_at_least(7), Some(7));
        assert_eq!(set.first_at_least(8), None);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn full_width() {
        let all = BitSet::all_less_than(128);
        assert_eq!(all.len(), 128);
        assert!(all.contains(127));
        assert!(BitSet::all_less_than(0).is_empty());
    }
}
