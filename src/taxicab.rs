use std::{collections::HashSet, fmt::Display};

use crate::{
    arithmetic::checked_pow,
    bitvec::BitVec,
    error::Error,
    latin_square::LatinSquare,
    power_grid::PowerGrid,
    selection::{BlockLayout, Selection},
};

/// An (r, s, d) taxicab tuple: r ways of writing one integer as a sum of s
/// d-th powers.
///
/// ```text
/// a[0][0]^d + ... + a[0][s-1]^d
///   = ...
///   = a[r-1][0]^d + ... + a[r-1][s-1]^d
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Taxicab {
    r: usize,
    s: usize,
    d: u32,
    terms: Vec<u64>,
}

impl Taxicab {
    pub fn new(r: usize, s: usize, d: u32, terms: Vec<u64>) -> Result<Self, Error> {
        if terms.len() != r * s {
            return Err(Error::DimensionMismatch {
                expected: r * s,
                found: terms.len(),
            });
        }
        Ok(Taxicab { r, s, d, terms })
    }

    pub fn from_rows(rows: &[&[u64]], d: u32) -> Result<Self, Error> {
        let s = rows.first().map_or(0, |row| row.len());
        if let Some(row) = rows.iter().find(|row| row.len() != s) {
            return Err(Error::DimensionMismatch {
                expected: s,
                found: row.len(),
            });
        }

        Self::new(rows.len(), s, d, rows.concat())
    }

    /// Height: number of representations
    pub fn r(&self) -> usize {
        self.r
    }

    /// Width: terms per representation
    pub fn s(&self) -> usize {
        self.s
    }

    pub fn d(&self) -> u32 {
        self.d
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> u64 {
        self.terms[i * self.s + j]
    }

    pub fn row_sum(&self, i: usize) -> Result<u128, Error> {
        (0..self.s).try_fold(0u128, |acc, j| {
            checked_pow(self.get(i, j), self.d)
                .and_then(|p| acc.checked_add(p))
                .ok_or(Error::Overflow)
        })
    }

    /// Every representation has the same power sum
    pub fn is_taxicab(&self) -> bool {
        let Ok(first) = self.row_sum(0) else {
            return false;
        };
        (1..self.r).all(|i| self.row_sum(i) == Ok(first))
    }

    pub fn has_distinct_terms(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.terms.len());
        self.terms.iter().all(|t| seen.insert(*t))
    }
}

impl Display for Taxicab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in 0..self.r {
            if i > 0 {
                write!(f, " = ")?;
            }
            for j in 0..self.s {
                if j > 0 {
                    write!(f, " + ")?;
                }
                write!(f, "{}^{}", self.get(i, j), self.d)?;
            }
        }
        Ok(())
    }
}

/// Whether the r·s·s·r products `a[i][j] * b[u][v]` are pairwise different,
/// which makes the grid built from `a` and `b` distinct.
pub fn cross_products_are_distinct(a: &Taxicab, b: &Taxicab) -> bool {
    let mut seen = HashSet::with_capacity(a.terms.len() * b.terms.len());
    a.terms.iter().all(|x| {
        b.terms
            .iter()
            .all(|y| (*x as u128).checked_mul(*y as u128).is_some_and(|p| seen.insert(p)))
    })
}

fn check_family(family: &[LatinSquare], len: usize, side: usize) -> Result<(), Error> {
    if family.len() != len {
        return Err(Error::DimensionMismatch {
            expected: len,
            found: family.len(),
        });
    }
    if let Some(sq) = family.iter().find(|sq| sq.n() != side) {
        return Err(Error::DimensionMismatch {
            expected: side,
            found: sq.n(),
        });
    }
    Ok(())
}

/// Builds the n = r·s semi-magic grid of an (r, s, d) tuple `a` and an
/// (s, r, d) tuple `b`.
///
/// The grid splits into s×r tiles of r rows and s columns. Tile (i, j)
/// holds
///
/// ```text
/// M[i·r + u][j·s + v] = a[j][P_j(i, v)] · b[i][Q_i(j, u)]
/// ```
///
/// with `p` a family of r Latin squares of side s and `q` a family of s
/// Latin squares of side r. Missing families default to the cyclic square.
/// Every row and column sums to `A · B`, where A and B are the two
/// taxicab sums. Fails with `Overflow` unless `n · A · B` fits in 128 bits.
pub fn semi_magic_from_taxicabs(
    a: &Taxicab,
    b: &Taxicab,
    p: Option<&[LatinSquare]>,
    q: Option<&[LatinSquare]>,
) -> Result<PowerGrid, Error> {
    let (r, s) = (a.r, a.s);
    if b.r != s {
        return Err(Error::DimensionMismatch {
            expected: s,
            found: b.r,
        });
    }
    if b.s != r {
        return Err(Error::DimensionMismatch {
            expected: r,
            found: b.s,
        });
    }
    if a.d != b.d {
        return Err(Error::DimensionMismatch {
            expected: a.d as usize,
            found: b.d as usize,
        });
    }
    if !a.is_taxicab() || !b.is_taxicab() {
        return Err(Error::NotATaxicab);
    }

    // the whole grid sums to n·μ, every line or selection sum stays below it
    a.row_sum(0)?
        .checked_mul(b.row_sum(0)?)
        .and_then(|mu| mu.checked_mul((r * s) as u128))
        .ok_or(Error::Overflow)?;

    let standard_p = LatinSquare::standard(s);
    let standard_q = LatinSquare::standard(r);
    if let Some(p) = p {
        check_family(p, r, s)?;
    }
    if let Some(q) = q {
        check_family(q, s, r)?;
    }

    let mut grid = PowerGrid::new(r * s, a.d);

    for i in 0..s {
        for j in 0..r {
            let p_j = p.map_or(&standard_p, |p| &p[j]);
            let q_i = q.map_or(&standard_q, |q| &q[i]);

            for u in 0..r {
                for v in 0..s {
                    let x = a.get(j, p_j.get(i, v));
                    let y = b.get(i, q_i.get(j, u));
                    let value = x.checked_mul(y).ok_or(Error::Overflow)?;
                    checked_pow(value, a.d).ok_or(Error::Overflow)?;

                    grid.set(i * r + u, j * s + v, value);
                }
            }
        }
    }

    Ok(grid)
}

/// Where the product that the cyclic construction puts at `(row, col)` sits
/// in the grid built from the families `p` and `q`.
///
/// Needs distinct taxicab terms to be meaningful: the tile stays the same and
/// only the offsets inside it move.
pub fn position_after_permutation(
    row: usize,
    col: usize,
    p: &[LatinSquare],
    q: &[LatinSquare],
    layout: BlockLayout,
) -> Result<(usize, usize), Error> {
    let BlockLayout { r, s } = layout;
    let (i, j) = (row / r, col / s);
    let (u, v) = (row % r, col % s);

    let target_p = (i + v) % s;
    let v_new = p[j]
        .position_in_row(i, target_p)
        .ok_or(Error::MissingValue {
            side: 'P',
            row: i,
            value: target_p,
        })?;

    let target_q = (j + u) % r;
    let u_new = q[i]
        .position_in_row(j, target_q)
        .ok_or(Error::MissingValue {
            side: 'Q',
            row: j,
            value: target_q,
        })?;

    Ok((i * r + u_new, j * s + v_new))
}

/// Maps `selection` from the cyclic grid into the grid built from `p` and
/// `q`. Returns `None` if two mapped cells share a row or a column.
pub fn falls_on_distinct_lines(
    selection: &Selection,
    p: &[LatinSquare],
    q: &[LatinSquare],
    layout: BlockLayout,
) -> Result<Option<Selection>, Error> {
    let n = layout.n();
    if selection.n() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            found: selection.n(),
        });
    }

    let mut rows = BitVec::with_len(n);
    let mut cols = BitVec::with_len(n);
    let mut cells = Vec::with_capacity(n);

    for (row, col) in selection.cells() {
        let (new_row, new_col) = position_after_permutation(row, col, p, q, layout)?;
        if rows.contains(new_row) || cols.contains(new_col) {
            return Ok(None);
        }
        rows.insert(new_row);
        cols.insert(new_col);
        cells.push((new_row, new_col));
    }

    Ok(Selection::from_cells(n, &cells))
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::selection::main_diagonal;

    fn a() -> Taxicab {
        Taxicab::from_rows(&[&[6, 7, 10], &[2, 8, 13]], 1).unwrap()
    }

    fn b() -> Taxicab {
        Taxicab::from_rows(&[&[23, 27], &[22, 28], &[19, 31]], 1).unwrap()
    }

    fn p_family() -> Vec<LatinSquare> {
        vec![
            LatinSquare::standard(3),
            LatinSquare::try_from("021210102").unwrap(),
        ]
    }

    fn q_family() -> Vec<LatinSquare> {
        let swapped = LatinSquare::try_from("1001").unwrap();
        vec![swapped.clone(), LatinSquare::standard(2), swapped]
    }

    #[test]
    fn taxicab_sums() {
        let sq = Taxicab::from_rows(&[&[1, 12], &[9, 10]], 3).unwrap();
        assert!(sq.is_taxicab());
        assert_eq!(sq.row_sum(1), Ok(1729));
        assert_eq!(sq.to_string(), "1^3 + 12^3 = 9^3 + 10^3");

        let not = Taxicab::from_rows(&[&[1, 12], &[9, 11]], 3).unwrap();
        assert!(!not.is_taxicab());

        assert!(Taxicab::from_rows(&[&[1, 12], &[9]], 3).is_err());
    }

    #[test]
    fn cyclic_construction() {
        let grid = semi_magic_from_taxicabs(&a(), &b(), None, None).unwrap();

        assert!(cross_products_are_distinct(&a(), &b()));
        assert!(grid.is_semi_magic());
        assert_eq!(grid.magic_constant(), 23 * 50);
        assert_eq!(grid.logical_rows()[0], vec![138, 161, 230, 54, 216, 351]);
        assert_eq!(grid.logical_rows()[5], vec![310, 186, 217, 247, 38, 152]);
    }

    #[test]
    fn squares_of_squares() {
        let a = Taxicab::from_rows(&[&[1, 8], &[4, 7]], 2).unwrap();
        let b = Taxicab::from_rows(&[&[2, 9], &[6, 7]], 2).unwrap();
        let grid = semi_magic_from_taxicabs(&a, &b, None, None).unwrap();

        assert!(grid.is_semi_magic());
        assert_eq!(grid.magic_constant(), 65 * 85);
    }

    #[test]
    fn magic_constant_must_fit() {
        // every cell power fits in 128 bits, n·μ does not
        let a = Taxicab::from_rows(&[&[1 << 62, (1 << 62) + 1]], 2).unwrap();
        let b = Taxicab::from_rows(&[&[3], &[3]], 2).unwrap();
        assert_eq!(
            semi_magic_from_taxicabs(&a, &b, None, None),
            Err(Error::Overflow)
        );

        let a = Taxicab::from_rows(&[&[1 << 30, (1 << 30) + 1]], 2).unwrap();
        let grid = semi_magic_from_taxicabs(&a, &b, None, None).unwrap();
        assert_eq!(grid.magic_constant(), 9 * a.row_sum(0).unwrap());
    }

    #[test]
    fn mismatched_tuples() {
        assert_eq!(
            semi_magic_from_taxicabs(&a(), &a(), None, None),
            Err(Error::DimensionMismatch {
                expected: 3,
                found: 2
            })
        );

        let bad = Taxicab::from_rows(&[&[23, 27], &[22, 28], &[19, 30]], 1).unwrap();
        assert_eq!(
            semi_magic_from_taxicabs(&a(), &bad, None, None),
            Err(Error::NotATaxicab)
        );
    }

    #[test]
    fn families_move_values_inside_tiles() {
        let layout = BlockLayout::new(2, 3);
        let (p, q) = (p_family(), q_family());

        let cyclic = semi_magic_from_taxicabs(&a(), &b(), None, None).unwrap();
        let permuted =
            semi_magic_from_taxicabs(&a(), &b(), Some(p.as_slice()), Some(q.as_slice())).unwrap();
        assert!(permuted.is_semi_magic());
        assert_ne!(cyclic, permuted);

        for row in 0..6 {
            for col in 0..6 {
                let (new_row, new_col) =
                    position_after_permutation(row, col, &p, &q, layout).unwrap();
                assert_eq!(layout.row_block(row), layout.row_block(new_row));
                assert_eq!(layout.col_block(col), layout.col_block(new_col));
                assert_eq!(cyclic.get(row, col), permuted.get(new_row, new_col));
            }
        }
    }

    #[test]
    fn mapped_selections() {
        let layout = BlockLayout::new(2, 3);
        let standard_p = vec![LatinSquare::standard(3); 2];
        let standard_q = vec![LatinSquare::standard(2); 3];

        let diagonal = main_diagonal(6);
        assert_eq!(
            falls_on_distinct_lines(&diagonal, &standard_p, &standard_q, layout),
            Ok(Some(diagonal.clone()))
        );

        // two cells land in column 4
        assert_eq!(
            falls_on_distinct_lines(&diagonal, &p_family(), &q_family(), layout),
            Ok(None)
        );

        let selection = Selection::new(vec![0, 3, 1, 5, 2, 4]);
        let mapped = falls_on_distinct_lines(&selection, &p_family(), &q_family(), layout)
            .unwrap()
            .unwrap();
        assert_eq!(mapped.cols(), &[3, 0, 1, 5, 4, 2]);
    }
}
