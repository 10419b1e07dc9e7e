use std::fmt::{Debug, Display, Write};

use crate::{bitset::BitSet, error::Error};

/// An n×n grid over `0..n` whose rows and columns are permutations.
///
/// Besides being a search target, each row is read as a permutation that
/// relocates taxicab terms inside one block of a [`PowerGrid`].
///
/// [`PowerGrid`]: crate::power_grid::PowerGrid
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LatinSquare {
    n: usize,
    values: Box<[u8]>,
}

impl LatinSquare {
    /// The cyclic square `(i + j) % n`
    ///
    /// ```text
    /// 0 | 1 | 2 | 3
    /// 1 | 2 | 3 | 0
    /// 2 | 3 | 0 | 1
    /// 3 | 0 | 1 | 2
    /// ```
    pub fn standard(n: usize) -> Self {
        let mut values = vec![0; n * n].into_boxed_slice();
        for i in 0..n {
            for j in 0..n {
                values[i * n + j] = ((i + j) % n) as u8;
            }
        }
        LatinSquare { n, values }
    }

    pub fn from_boxed_slice(values: Box<[u8]>) -> Option<LatinSquare> {
        if !Self::is_valid(&values) {
            return None;
        }

        let n = isqrt(values.len())?;

        Some(LatinSquare { n, values })
    }

    /// Unchecked constructor for values produced by the enumerator
    pub(crate) fn from_values_unchecked(n: usize, values: Box<[u8]>) -> Self {
        debug_assert!(Self::is_valid(&values));
        LatinSquare { n, values }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> usize {
        self.values[row * self.n + col].into()
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.values[row * self.n..(row + 1) * self.n]
    }

    /// Column of `value` in `row`
    pub fn position_in_row(&self, row: usize, value: usize) -> Option<usize> {
        self.row(row).iter().position(|v| *v as usize == value)
    }

    fn is_valid(values: &[u8]) -> bool {
        let Some(n) = isqrt(values.len()) else {
            return false;
        };
        if n > BitSet::CAPACITY || values.iter().any(|v| *v as usize >= n) {
            return false;
        }

        (0..n).all(|i| {
            (0..n)
                .map(|j| values[i * n + j] as usize)
                .collect::<BitSet>()
                == BitSet::all_less_than(n)
                && (0..n)
                    .map(|j| values[j * n + i] as usize)
                    .collect::<BitSet>()
                    == BitSet::all_less_than(n)
        })
    }
}

impl Display for LatinSquare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.n();
        for i in 0..n {
            for j in 0..n {
                match char::from_digit(self.get(i, j) as u32, 36) {
                    Some(c) => f.write_char(c)?,
                    None => write!(f, "[{}]", self.get(i, j))?,
                }
            }
        }
        Ok(())
    }
}

impl Debug for LatinSquare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        for i in 0..self.n() {
            for j in 0..self.n() {
                write!(f, "{:2} ", self.get(i, j))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl TryFrom<&str> for LatinSquare {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let Some(n) = isqrt(value.len()) else {
            return Err(Error::InvalidLength { len: value.len() });
        };

        let mut values = vec![0; value.len()].into_boxed_slice();
        for (i, c) in value.chars().enumerate() {
            let entry = c
                .to_digit(36)
                .ok_or(Error::InvalidChar { index: i, char: c })?;
            if entry >= n as u32 {
                return Err(Error::InvalidChar { index: i, char: c });
            }
            values[i] = entry as u8;
        }

        LatinSquare::from_boxed_slice(values).ok_or(Error::InvalidLatinSquare)
    }
}

pub fn isqrt(n: usize) -> Option<usize> {
    let root = (n as f64).sqrt() as usize;
    (root.saturating_sub(1)..=root + 1).find(|i| i * i == n)
}
