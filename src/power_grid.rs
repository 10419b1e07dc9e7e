use std::{collections::HashSet, fmt::Display};

use rand::{seq::SliceRandom, Rng};

use crate::{arithmetic::pow, permutation::Permutation};

/// An n×n grid of bases, read as their d-th powers.
///
/// Logical cell `(i, j)` lives at physical cell `(rows[i], cols[j])`, so row
/// and column permutations only touch the two indirection arrays.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PowerGrid {
    n: usize,
    d: u32,
    values: Box<[u64]>,
    rows: Vec<usize>,
    cols: Vec<usize>,
}

impl PowerGrid {
    /// Zero filled grid with identity indirection
    pub fn new(n: usize, d: u32) -> Self {
        PowerGrid {
            n,
            d,
            values: vec![0; n * n].into_boxed_slice(),
            rows: (0..n).collect(),
            cols: (0..n).collect(),
        }
    }

    pub fn from_rows(rows: &[&[u64]], d: u32) -> Self {
        let n = rows.len();
        let mut grid = PowerGrid::new(n, d);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), n, "row {i} has the wrong length");
            for (j, value) in row.iter().enumerate() {
                grid.set(i, j, *value);
            }
        }
        grid
    }

    /// The classical siamese magic square of odd order, filled with `1..=n²`
    pub fn siamese(n: usize) -> Self {
        assert!(n % 2 == 1, "the siamese method needs an odd side");

        let mut grid = PowerGrid::new(n, 1);
        let (mut i, mut j) = (0, (n - 1) / 2);

        for value in 1..=(n * n) as u64 {
            grid.set(i, j, value);

            let (up, right) = ((i + n - 1) % n, (j + 1) % n);
            if grid.get(up, right) != 0 {
                // spot is full: go down
                i = (i + 1) % n;
            } else {
                i = up;
                j = right;
            }
        }

        grid
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn d(&self) -> u32 {
        self.d
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> u64 {
        self.values[self.rows[i] * self.n + self.cols[j]]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: u64) {
        self.values[self.rows[i] * self.n + self.cols[j]] = value;
    }

    #[inline]
    pub fn power(&self, i: usize, j: usize) -> u128 {
        pow(self.get(i, j), self.d)
    }

    pub fn sum_row(&self, i: usize) -> u128 {
        (0..self.n).map(|j| self.power(i, j)).sum()
    }

    pub fn sum_col(&self, j: usize) -> u128 {
        (0..self.n).map(|i| self.power(i, j)).sum()
    }

    pub fn sum_diag(&self) -> u128 {
        (0..self.n).map(|k| self.power(k, k)).sum()
    }

    pub fn sum_anti_diag(&self) -> u128 {
        (0..self.n).map(|k| self.power(k, self.n - k - 1)).sum()
    }

    /// μ, read off the first row
    pub fn magic_constant(&self) -> u128 {
        if self.n == 0 {
            return 0;
        }
        self.sum_row(0)
    }

    /// No base occurs twice, so no power does either
    pub fn is_distinct(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.values.len());
        self.values.iter().all(|value| seen.insert(*value))
    }

    fn lines_sum_to(&self, mu: u128) -> bool {
        (0..self.n).all(|i| self.sum_row(i) == mu) && (0..self.n).all(|j| self.sum_col(j) == mu)
    }

    pub fn is_semi_magic(&self) -> bool {
        self.n > 0 && self.lines_sum_to(self.magic_constant()) && self.is_distinct()
    }

    /// Rows, columns and both diagonals share μ, distinctness is not checked
    pub fn has_magic_sums(&self) -> bool {
        let mu = self.magic_constant();
        self.n > 0
            && self.lines_sum_to(mu)
            && self.sum_diag() == mu
            && self.sum_anti_diag() == mu
    }

    pub fn is_magic(&self) -> bool {
        self.has_magic_sums() && self.is_distinct()
    }

    /// Logical row `i` becomes what logical row `p[i]` was
    pub fn reindex_rows(&mut self, p: &Permutation) {
        self.rows = p.as_slice().iter().map(|&k| self.rows[k]).collect();
    }

    /// Logical column `j` becomes what logical column `p[j]` was
    pub fn reindex_cols(&mut self, p: &Permutation) {
        self.cols = p.as_slice().iter().map(|&k| self.cols[k]).collect();
    }

    /// Fisher-Yates shuffle of the rows
    pub fn shuffle_rows<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.rows.shuffle(rng);
    }

    /// Applies one random permutation to both rows and columns, which keeps
    /// the set of main diagonal cells.
    pub fn shuffle_rows_and_cols<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut p = (0..self.n).collect::<Vec<_>>();
        p.shuffle(rng);
        let p = Permutation::from_vec(p).unwrap_or_else(|| Permutation::identity(self.n));
        self.reindex_rows(&p);
        self.reindex_cols(&p);
    }

    pub fn logical_rows(&self) -> Vec<Vec<u64>> {
        (0..self.n)
            .map(|i| (0..self.n).map(|j| self.get(i, j)).collect())
            .collect()
    }
}

impl Display for PowerGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self
            .values
            .iter()
            .map(|v| v.to_string().len())
            .max()
            .unwrap_or(1);

        for row in self.logical_rows() {
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{value:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
