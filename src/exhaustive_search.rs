use tracing::{debug, info};

use crate::{
    arithmetic::{boards_below, checked_pow, exact_root},
    bitvec::BitVec,
    error::Error,
    outcome::SearchOutcome,
    perf_counter::PerfCounter,
    power_grid::PowerGrid,
};

/// Depth first search for magic squares of d-th powers with bases in
/// `1..=max_base`.
///
/// Cells are filled in row-major logical order. The used-value markers and
/// the board counter live in the search and survive between calls, so a
/// caller can resume from different prefixes while keeping one tally.
pub struct ExhaustiveSearch {
    n: usize,
    d: u32,
    max_base: u64,
    used: BitVec,
    perf: PerfCounter,
}

impl ExhaustiveSearch {
    pub fn new(n: usize, d: u32, max_base: u64) -> Self {
        ExhaustiveSearch {
            n,
            d,
            max_base,
            used: BitVec::with_len((max_base as usize).saturating_add(1).min(1 << 16)),
            perf: PerfCounter::new(),
        }
    }

    pub fn perf(&self) -> &PerfCounter {
        &self.perf
    }

    /// Searches every completion of the first `progress` logical cells of
    /// `grid` and hands each magic square found to `f`.
    ///
    /// Returns `Stop` if `f` asked for it, otherwise `Exhausted`. The grid is
    /// left holding the last square found when stopped.
    pub fn search_from<F>(
        &mut self,
        grid: &mut PowerGrid,
        progress: usize,
        mut f: F,
    ) -> Result<SearchOutcome, Error>
    where
        F: FnMut(&PowerGrid) -> SearchOutcome,
    {
        if self.d == 0 {
            return Err(Error::ZeroExponent);
        }
        if grid.n() != self.n {
            return Err(Error::DimensionMismatch {
                expected: self.n,
                found: grid.n(),
            });
        }
        if grid.d() != self.d {
            return Err(Error::DimensionMismatch {
                expected: self.d as usize,
                found: grid.d() as usize,
            });
        }
        let cells = self.n * self.n;
        if progress > cells {
            return Err(Error::DimensionMismatch {
                expected: cells,
                found: progress,
            });
        }

        self.used.clear();
        for cell in 0..progress {
            let value = grid.get(cell / self.n, cell % self.n);
            if value == 0 || value > self.max_base || self.used.contains(value as usize) {
                debug!(cell, value, "prefix can never be completed");
                return Ok(SearchOutcome::Exhausted);
            }
            self.used.insert(value as usize);
        }

        let outcome = self.search_inside(grid, progress, &mut f);

        info!(
            boards = %self.perf.boards(),
            elapsed = ?self.perf.elapsed(),
            rate = %self.perf.format_rate("boards"),
            "exhaustive search finished"
        );

        Ok(match outcome {
            SearchOutcome::Stop => SearchOutcome::Stop,
            _ => SearchOutcome::Exhausted,
        })
    }

    fn search_inside<F>(&mut self, grid: &mut PowerGrid, cell: usize, f: &mut F) -> SearchOutcome
    where
        F: FnMut(&PowerGrid) -> SearchOutcome,
    {
        let n = self.n;
        let cells = n * n;

        if cell == cells {
            self.perf.add(1);
            if grid.is_magic() {
                return match f(grid) {
                    SearchOutcome::Stop => SearchOutcome::Stop,
                    _ => SearchOutcome::Continue,
                };
            }
            return SearchOutcome::Continue;
        }

        if self.perf.crossed_report_mark() {
            debug!(
                boards = %self.perf.boards(),
                rate = %self.perf.format_rate("boards"),
                "\n{grid}"
            );
        }

        let (i, j) = (cell / n, cell % n);

        let forced_by_col = n > 1 && i == n - 1;
        let forced_by_row = i >= 1 && j == n - 1;

        if forced_by_col || forced_by_row {
            return self.place_forced(grid, cell, forced_by_col, f);
        }

        // row 0 defines μ, nothing to compare against yet
        let bound = if i >= 1 {
            Some((
                grid.magic_constant(),
                (0..j).map(|k| grid.power(i, k)).sum::<u128>(),
                (0..i).map(|k| grid.power(k, j)).sum::<u128>(),
            ))
        } else {
            None
        };

        let rejected = boards_below(cells, cell + 1, self.max_base);
        // the prefix holds `cell` distinct bases, all of them in range
        let choices = self.max_base.saturating_sub(cell as u64);
        let mut tried = 0u64;

        for value in 1..=self.max_base {
            if self.used.contains(value as usize) {
                continue;
            }

            let Some(power) = checked_pow(value, self.d) else {
                self.perf
                    .add(rejected.saturating_mul((choices - tried) as u128));
                break;
            };

            if let Some((mu, row_sum, col_sum)) = bound {
                // every later cell of the row and the column adds at least 1
                let row_rest = (n - 1 - j) as u128;
                let col_rest = (n - 1 - i) as u128;
                if row_sum + power + row_rest > mu || col_sum + power + col_rest > mu {
                    self.perf
                        .add(rejected.saturating_mul((choices - tried) as u128));
                    break;
                }
            }

            tried += 1;
            grid.set(i, j, value);
            self.used.insert(value as usize);

            let outcome = self.search_inside(grid, cell + 1, f);

            self.used.remove(value as usize);

            if outcome.is_stop() {
                return SearchOutcome::Stop;
            }
        }

        SearchOutcome::Continue
    }

    /// Places the only base that completes the row (or the column in the
    /// last row) to μ.
    fn place_forced<F>(
        &mut self,
        grid: &mut PowerGrid,
        cell: usize,
        by_col: bool,
        f: &mut F,
    ) -> SearchOutcome
    where
        F: FnMut(&PowerGrid) -> SearchOutcome,
    {
        let n = self.n;
        let (i, j) = (cell / n, cell % n);
        let rejected = boards_below(n * n, cell, self.max_base);
        let below = boards_below(n * n, cell + 1, self.max_base);

        let mu = grid.magic_constant();
        let partial: u128 = if by_col {
            (0..i).map(|k| grid.power(k, j)).sum()
        } else {
            (0..j).map(|k| grid.power(i, k)).sum()
        };

        let value = mu
            .checked_sub(partial)
            .and_then(|rest| exact_root(rest, self.d))
            .filter(|v| *v >= 1 && *v <= self.max_base && !self.used.contains(*v as usize));

        let Some(value) = value else {
            self.perf.add(rejected);
            return SearchOutcome::Continue;
        };

        // every other base for this cell is skipped
        self.perf.add(rejected.saturating_sub(below));
        grid.set(i, j, value);

        if by_col && j == n - 1 && grid.sum_row(i) != mu {
            self.perf.add(below);
            return SearchOutcome::Continue;
        }
        if i == n - 1 && j == 0 && grid.sum_anti_diag() != mu {
            self.perf.add(below);
            return SearchOutcome::Continue;
        }

        self.used.insert(value as usize);
        let outcome = self.search_inside(grid, cell + 1, f);
        self.used.remove(value as usize);

        outcome
    }
}

/// Runs a fresh search and returns the first magic square it meets, or
/// `None` once every board up to `max_base` has been ruled out.
pub fn first_magic_square(n: usize, d: u32, max_base: u64) -> Result<Option<PowerGrid>, Error> {
    let mut search = ExhaustiveSearch::new(n, d, max_base);
    let mut grid = PowerGrid::new(n, d);
    let mut found = None;

    search.search_from(&mut grid, 0, |square| {
        found = Some(square.clone());
        SearchOutcome::Stop
    })?;

    Ok(found)
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn single_cell() {
        let grid = first_magic_square(1, 1, 1).unwrap().unwrap();
        assert_eq!(grid.logical_rows(), vec![vec![1]]);
        assert_eq!(grid.magic_constant(), 1);
    }

    #[test]
    fn lo_shu_first() {
        let grid = first_magic_square(3, 1, 9).unwrap().unwrap();
        assert!(grid.is_magic());
        assert_eq!(
            grid.logical_rows(),
            vec![vec![2, 7, 6], vec![9, 5, 1], vec![4, 3, 8]]
        );
    }

    #[test]
    fn all_order_3() {
        let mut search = ExhaustiveSearch::new(3, 1, 9);
        let mut grid = PowerGrid::new(3, 1);
        let mut count = 0;

        let outcome = search
            .search_from(&mut grid, 0, |square| {
                assert!(square.is_magic());
                count += 1;
                SearchOutcome::Continue
            })
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Exhausted);
        assert_eq!(count, 8);
        // every arrangement of 9 distinct bases is either visited or skipped once
        assert_eq!(search.perf().boards(), 362_880);

        // a larger range keeps the same squares and adds shifted ones
        let mut search = ExhaustiveSearch::new(3, 1, 10);
        let mut count = 0;
        search
            .search_from(&mut grid, 0, |_| {
                count += 1;
                SearchOutcome::Continue
            })
            .unwrap();
        assert_eq!(count, 16);
        assert_eq!(search.perf().boards(), boards_below(9, 0, 10));
    }

    #[test]
    fn counts_every_board_of_order_2() {
        let mut search = ExhaustiveSearch::new(2, 1, 4);
        let mut grid = PowerGrid::new(2, 1);
        let outcome = search.search_from(&mut grid, 0, |_| SearchOutcome::Stop);

        assert_eq!(outcome, Ok(SearchOutcome::Exhausted));
        assert_eq!(search.perf().boards(), 24);

        // squares pruned by the bounds still count
        let mut search = ExhaustiveSearch::new(3, 2, 12);
        let mut grid = PowerGrid::new(3, 2);
        let outcome = search.search_from(&mut grid, 0, |_| SearchOutcome::Stop);

        assert_eq!(outcome, Ok(SearchOutcome::Exhausted));
        assert_eq!(search.perf().boards(), boards_below(9, 0, 12));
    }

    #[test]
    fn first_square_reports_errors() {
        assert_eq!(first_magic_square(2, 1, 8), Ok(None));
        assert_eq!(first_magic_square(3, 0, 9), Err(Error::ZeroExponent));
    }

    #[test]
    fn resumes_from_prefix() {
        let mut search = ExhaustiveSearch::new(3, 1, 9);
        let mut grid = PowerGrid::new(3, 1);
        grid.set(0, 0, 2);
        grid.set(0, 1, 9);
        grid.set(0, 2, 4);

        let mut found = vec![];
        let outcome = search
            .search_from(&mut grid, 3, |square| {
                found.push(square.logical_rows());
                SearchOutcome::Continue
            })
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Exhausted);
        assert_eq!(found, vec![vec![vec![2, 9, 4], vec![7, 5, 3], vec![6, 1, 8]]]);
        assert_eq!(search.perf().boards(), 720);

        // repeated prefix value
        grid.set(0, 1, 2);
        let outcome = search.search_from(&mut grid, 3, |_| SearchOutcome::Stop);
        assert_eq!(outcome, Ok(SearchOutcome::Exhausted));
    }

    #[test]
    fn no_order_2() {
        let mut search = ExhaustiveSearch::new(2, 1, 8);
        let mut grid = PowerGrid::new(2, 1);
        let outcome = search.search_from(&mut grid, 0, |_| SearchOutcome::Stop);
        assert_eq!(outcome, Ok(SearchOutcome::Exhausted));
    }

    #[test]
    fn wrong_grid() {
        let mut search = ExhaustiveSearch::new(3, 2, 9);
        let mut grid = PowerGrid::new(4, 2);
        assert_eq!(
            search.search_from(&mut grid, 0, |_| SearchOutcome::Stop),
            Err(Error::DimensionMismatch {
                expected: 3,
                found: 4
            })
        );
    }
}
