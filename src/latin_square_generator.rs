use crate::{bitset::BitSet, latin_square::LatinSquare, outcome::SearchOutcome};

/// Enumerates every n×n Latin square whose first row is `0, 1, ..., n - 1`.
///
/// Row-major backtracking with per-row and per-column "value used" markers.
/// The stack holds the value placed in every cell after the first row.
pub struct LatinSquareGenerator {
    n: usize,
    values: Vec<u8>,
    rows: Vec<BitSet>,
    cols: Vec<BitSet>,
    stack: Vec<u8>,
    started: bool,
    done: bool,
}

impl LatinSquareGenerator {
    pub fn new(n: usize) -> Self {
        assert!(n <= BitSet::CAPACITY, "n must be at most {}", BitSet::CAPACITY);

        let mut rows = vec![BitSet::empty(); n];
        let mut cols = vec![BitSet::empty(); n];
        let mut values = vec![0; n * n];

        // fix first row: {0, 1, 2, ..., n - 1}
        for col in 0..n {
            values[col] = col as u8;
            if let Some(row) = rows.first_mut() {
                row.insert(col);
            }
            cols[col].insert(col);
        }

        LatinSquareGenerator {
            n,
            values,
            rows,
            cols,
            stack: Vec::with_capacity(n * n),
            started: false,
            done: n == 0,
        }
    }

    fn place(&mut self, cell: usize, value: usize) {
        let (i, j) = (cell / self.n, cell % self.n);
        self.values[cell] = value as u8;
        self.rows[i].insert(value);
        self.cols[j].insert(value);
        self.stack.push(value as u8);
    }

    /// Undoes the last placement and returns its cell and value
    fn unplace(&mut self) -> Option<(usize, usize)> {
        let value = self.stack.pop()? as usize;
        let cell = self.n + self.stack.len();
        let (i, j) = (cell / self.n, cell % self.n);
        self.rows[i].remove(value);
        self.cols[j].remove(value);
        Some((cell, value))
    }

    fn current(&self) -> LatinSquare {
        LatinSquare::from_values_unchecked(self.n, self.values.clone().into_boxed_slice())
    }
}

impl Iterator for LatinSquareGenerator {
    type Item = LatinSquare;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let n = self.n;

        let (mut cell, mut start_value) = if self.started {
            // resume right after the square we returned last
            match self.unplace() {
                Some((cell, value)) => (cell, value + 1),
                None => {
                    self.done = true;
                    return None;
                }
            }
        } else {
            self.started = true;
            if n == 1 {
                self.done = true;
                return Some(self.current());
            }
            (n, 0)
        };

        loop {
            let (i, j) = (cell / n, cell % n);
            let free = self.rows[i]
                .union(self.cols[j])
                .complement()
                .intersect(BitSet::all_less_than(n));

            match free.first_at_least(start_value) {
                Some(value) => {
                    self.place(cell, value);

                    if cell + 1 == n * n {
                        return Some(self.current());
                    }

                    cell += 1;
                    start_value = 0;
                }
                None => match self.unplace() {
                    Some((prev_cell, prev_value)) => {
                        cell = prev_cell;
                        start_value = prev_value + 1;
                    }
                    None => {
                        self.done = true;
                        return None;
                    }
                },
            }
        }
    }
}

/// Calls `f` on every Latin square of side `n` with the identity first row.
///
/// Returns `Stop` as soon as `f` does, `Exhausted` once every square was seen.
pub fn for_each_latin_square<F>(n: usize, mut f: F) -> SearchOutcome
where
    F: FnMut(&LatinSquare) -> SearchOutcome,
{
    for sq in LatinSquareGenerator::new(n) {
        if f(&sq).is_stop() {
            return SearchOutcome::Stop;
        }
    }

    SearchOutcome::Exhausted
}

/// Calls `f` on every tuple of `len` Latin squares of side `n`.
///
/// The first square is the outermost loop, every deeper slot runs a fresh
/// enumerator per square of the slot above it.
pub fn for_each_latin_square_array<F>(n: usize, len: usize, mut f: F) -> SearchOutcome
where
    F: FnMut(&[LatinSquare]) -> SearchOutcome,
{
    let mut squares = Vec::with_capacity(len);
    match for_each_array_inside(n, len, &mut squares, &mut f) {
        SearchOutcome::Stop => SearchOutcome::Stop,
        _ => SearchOutcome::Exhausted,
    }
}

fn for_each_array_inside<F>(
    n: usize,
    len: usize,
    squares: &mut Vec<LatinSquare>,
    f: &mut F,
) -> SearchOutcome
where
    F: FnMut(&[LatinSquare]) -> SearchOutcome,
{
    if squares.len() == len {
        return match f(squares) {
            SearchOutcome::Stop => SearchOutcome::Stop,
            _ => SearchOutcome::Continue,
        };
    }

    for sq in LatinSquareGenerator::new(n) {
        squares.push(sq);
        let outcome = for_each_array_inside(n, len, squares, f);
        squares.pop();

        if outcome.is_stop() {
            return SearchOutcome::Stop;
        }
    }

    SearchOutcome::Exhausted
}

#[cfg(test)]
mod test {

    use super::*;

    fn is_latin(sq: &LatinSquare) -> bool {
        let n = sq.n();
        (0..n).all(|i| {
            (0..n).map(|j| sq.get(i, j)).collect::<BitSet>() == BitSet::all_less_than(n)
                && (0..n).map(|j| sq.get(j, i)).collect::<BitSet>() == BitSet::all_less_than(n)
        })
    }

    #[test]
    fn only_one_of_size_2() {
        let squares = LatinSquareGenerator::new(2).collect::<Vec<_>>();
        assert_eq!(
            squares,
            vec![LatinSquare::try_from("0110").unwrap()]
        );
    }

    #[test]
    fn counts_with_fixed_first_row() {
        // A000479 scaled: L(n) / n!
        let expected = [0, 1, 1, 2, 24, 1344];
        for (n, count) in expected.into_iter().enumerate() {
            assert_eq!(LatinSquareGenerator::new(n).count(), count, "n = {n}");
        }
    }

    #[test]
    fn all_valid_and_distinct() {
        let squares = LatinSquareGenerator::new(4).collect::<Vec<_>>();

        for (k, sq) in squares.iter().enumerate() {
            assert!(is_latin(sq));
            assert_eq!(sq.row(0), &[0, 1, 2, 3]);
            assert!(!squares[k + 1..].contains(sq));
        }
    }

    #[test]
    fn callback_stop() {
        let mut seen = 0;
        let outcome = for_each_latin_square(4, |_| {
            seen += 1;
            SearchOutcome::from_continue(seen < 5)
        });

        assert_eq!(outcome, SearchOutcome::Stop);
        assert_eq!(seen, 5);

        let mut seen = 0;
        let outcome = for_each_latin_square(3, |_| {
            seen += 1;
            SearchOutcome::Continue
        });

        assert_eq!(outcome, SearchOutcome::Exhausted);
        assert_eq!(seen, 2);
    }

    #[test]
    fn array_variant() {
        let mut tuples = vec![];
        let outcome = for_each_latin_square_array(3, 2, |squares| {
            tuples.push(squares.to_vec());
            SearchOutcome::Continue
        });

        assert_eq!(outcome, SearchOutcome::Exhausted);
        assert_eq!(tuples.len(), 4);
        assert!(tuples.iter().all(|tuple| tuple.len() == 2));
        assert_ne!(tuples[0], tuples[1]);

        let mut calls = 0;
        let outcome = for_each_latin_square_array(3, 3, |_| {
            calls += 1;
            SearchOutcome::from_continue(calls < 3)
        });
        assert_eq!(outcome, SearchOutcome::Stop);
        assert_eq!(calls, 3);
    }

    #[test]
    fn empty_array_is_seen_once() {
        let mut calls = 0;
        let outcome = for_each_latin_square_array(3, 0, |squares| {
            assert!(squares.is_empty());
            calls += 1;
            SearchOutcome::Continue
        });

        assert_eq!(outcome, SearchOutcome::Exhausted);
        assert_eq!(calls, 1);

        let outcome = for_each_latin_square_array(3, 0, |_| SearchOutcome::Stop);
        assert_eq!(outcome, SearchOutcome::Stop);
    }
}
