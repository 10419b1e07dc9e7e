/// A permutation of `0..n`, `p[i]` is the image of `i`
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Permutation((0..n).collect())
    }

    /// `i -> n - 1 - i`, the permutation exchanging the two diagonals
    pub fn reversal(n: usize) -> Self {
        Permutation((0..n).rev().collect())
    }

    /// Returns `None` unless every element of `0..len` occurs exactly once
    pub fn from_vec(elements: Vec<usize>) -> Option<Self> {
        let n = elements.len();
        let mut seen = vec![false; n];

        for &e in &elements {
            if e >= n || seen[e] {
                return None;
            }
            seen[e] = true;
        }

        Some(Permutation(elements))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.0
    }

    #[inline]
    pub fn apply(&self, num: usize) -> usize {
        self.0[num]
    }

    pub fn inverse(&self) -> Self {
        let mut inverse = vec![0; self.len()];
        for (i, &p) in self.0.iter().enumerate() {
            inverse[p] = i;
        }
        Permutation(inverse)
    }

    /// `self ∘ other`: applies `other` first
    pub fn compose(&self, other: &Self) -> Self {
        debug_assert_eq!(self.len(), other.len());
        Permutation(other.0.iter().map(|&i| self.apply(i)).collect())
    }

    pub fn is_involution(&self) -> bool {
        (0..self.len()).all(|i| self.apply(self.apply(i)) == i)
    }

    pub fn fixed_points(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.apply(i) == i).collect()
    }

    /// The 2-cycles of an involution, each as `(smaller, larger)`, ordered by
    /// their smaller element.
    pub fn transpositions(&self) -> Vec<(usize, usize)> {
        debug_assert!(self.is_involution());

        (0..self.len())
            .filter(|&i| self.apply(i) > i)
            .map(|i| (i, self.apply(i)))
            .collect()
    }
}
