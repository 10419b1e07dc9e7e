/// Growable marker set, used where the universe is larger than a [`BitSet`]
/// can hold: used base values `1..=X`, selected grid cells, taken lines.
///
/// [`BitSet`]: crate::bitset::BitSet
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BitVec {
    words: Vec<usize>,
}

const BITS: usize = usize::BITS as usize;

impl BitVec {
    #[inline]
    pub fn empty() -> Self {
        BitVec { words: Vec::new() }
    }

    /// Empty set with room for `0..len` preallocated
    #[inline]
    pub fn with_len(len: usize) -> Self {
        BitVec {
            words: vec![0; len.div_ceil(BITS)],
        }
    }

    #[inline]
    pub fn insert(&mut self, index: usize) {
        let word = index / BITS;
        let bit_mask = 1 << (index % BITS);

        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }

        self.words[word] |= bit_mask;
    }

    #[inline]
    pub fn remove(&mut self, index: usize) {
        if let Some(word) = self.words.get_mut(index / BITS) {
            *word &= !(1 << (index % BITS));
        }
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        match self.words.get(index / BITS) {
            Some(word) => word & (1 << (index % BITS)) != 0,
            None => false,
        }
    }

    /// Empties the set but keeps its allocation
    #[inline]
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }
}

impl FromIterator<usize> for BitVec {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut new = Self::empty();
        for item in iter {
            new.insert(item);
        }
        new
    }
}

#[derive(Debug)]
pub struct BitVecIter<'a> {
    bitvec: &'a BitVec,
    index: usize,
}

impl Iterator for BitVecIter<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let word_index = self.index / BITS;
            let word = *self.bitvec.words.get(word_index)?;

            let bit_index = self.index % BITS;
            let word = word & !((1usize << bit_index) - 1);

            if word == 0 {
                self.index = (word_index + 1) * BITS;
                continue;
            }

            let index = word_index * BITS + word.trailing_zeros() as usize;
            self.index = index + 1;
            return Some(index);
        }
    }
}

impl<'a> IntoIterator for &'a BitVec {
    type Item = usize;
    type IntoIter = BitVecIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        BitVecIter {
            bitvec: self,
            index: 0,
        }
    }
}
