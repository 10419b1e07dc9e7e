use crate::{bitvec::BitVec, permutation::Permutation, power_grid::PowerGrid};

/// One cell per logical row: row `i` selects column `cols[i]`.
///
/// A generalized diagonal. The collision search only produces selections
/// that are also permutations (one cell per column).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Selection {
    cols: Vec<usize>,
}

/// Sorted cell list, equal iff two selections pick the same cells
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct SelectionKey(Vec<(usize, usize)>);

impl SelectionKey {
    pub fn from_cells(mut cells: Vec<(usize, usize)>) -> Self {
        cells.sort_unstable();
        SelectionKey(cells)
    }

    pub fn cells(&self) -> &[(usize, usize)] {
        &self.0
    }
}

impl Selection {
    pub fn new(cols: Vec<usize>) -> Self {
        Selection { cols }
    }

    /// Builds a selection from `n` cells covering every row exactly once
    pub fn from_cells(n: usize, cells: &[(usize, usize)]) -> Option<Self> {
        if cells.len() != n {
            return None;
        }

        let mut cols = vec![usize::MAX; n];
        for &(row, col) in cells {
            if row >= n || col >= n || cols[row] != usize::MAX {
                return None;
            }
            cols[row] = col;
        }

        Some(Selection { cols })
    }

    pub fn n(&self) -> usize {
        self.cols.len()
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cols.iter().copied().enumerate()
    }

    pub fn is_permutation(&self) -> bool {
        let n = self.n();
        let mut seen = BitVec::with_len(n);
        self.cols.iter().all(|&col| {
            let fresh = col < n && !seen.contains(col);
            seen.insert(col);
            fresh
        })
    }

    pub fn as_permutation(&self) -> Option<Permutation> {
        Permutation::from_vec(self.cols.clone())
    }

    pub fn power_sum(&self, grid: &PowerGrid) -> u128 {
        self.cells().map(|(i, j)| grid.power(i, j)).sum()
    }

    pub fn key(&self) -> SelectionKey {
        SelectionKey::from_cells(self.cells().collect())
    }
}

/// `(i, i)` for every row
pub fn main_diagonal(n: usize) -> Selection {
    Selection::new((0..n).collect())
}

/// `(i, n - 1 - i)` for every row
pub fn anti_diagonal(n: usize) -> Selection {
    Selection::new(Permutation::reversal(n).into_vec())
}

/// Whether one row and one column permutation can move `a` onto the main
/// diagonal and `b` onto the anti-diagonal simultaneously.
///
/// That holds iff `a⁻¹ ∘ b` is an involution with `n % 2` fixed points: for
/// odd n the two selections share exactly one cell, the future centre.
pub fn are_diagonalizable(a: &Selection, b: &Selection) -> bool {
    if a.n() != b.n() {
        return false;
    }
    let (Some(pa), Some(pb)) = (a.as_permutation(), b.as_permutation()) else {
        return false;
    };

    let sigma = pa.inverse().compose(&pb);
    sigma.is_involution() && sigma.fixed_points().len() == a.n() % 2
}

/// Block structure of a grid built from an (r, s) taxicab pair.
///
/// The n = r·s rows form s row-blocks of height r and the columns form r
/// column-blocks of width s. A balanced selection puts exactly r cells into
/// every row-block and exactly s into every column-block.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BlockLayout {
    pub r: usize,
    pub s: usize,
}

impl BlockLayout {
    pub fn new(r: usize, s: usize) -> Self {
        BlockLayout { r, s }
    }

    pub fn n(&self) -> usize {
        self.r * self.s
    }

    pub fn row_blocks(&self) -> usize {
        self.s
    }

    pub fn col_blocks(&self) -> usize {
        self.r
    }

    #[inline]
    pub fn row_block(&self, row: usize) -> usize {
        row / self.r
    }

    #[inline]
    pub fn col_block(&self, col: usize) -> usize {
        col / self.s
    }

    pub fn tiles(&self) -> usize {
        self.r * self.s
    }

    /// First row and first column of a tile
    pub fn tile_origin(&self, tile: usize) -> (usize, usize) {
        (
            (tile / self.col_blocks()) * self.r,
            (tile % self.col_blocks()) * self.s,
        )
    }

    fn block_counts<I>(&self, cells: I) -> (Vec<usize>, Vec<usize>)
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut row_counts = vec![0; self.row_blocks()];
        let mut col_counts = vec![0; self.col_blocks()];
        for (row, col) in cells {
            row_counts[self.row_block(row)] += 1;
            col_counts[self.col_block(col)] += 1;
        }
        (row_counts, col_counts)
    }

    /// No row-block holds more than r cells and no column-block more than s
    pub fn respects_block_bounds<I>(&self, cells: I) -> bool
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let (row_counts, col_counts) = self.block_counts(cells);
        row_counts.iter().all(|c| *c <= self.r) && col_counts.iter().all(|c| *c <= self.s)
    }

    pub fn is_block_balanced<I>(&self, cells: I) -> bool
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let (row_counts, col_counts) = self.block_counts(cells);
        row_counts.iter().all(|c| *c == self.r) && col_counts.iter().all(|c| *c == self.s)
    }
}
