use tracing::debug;

use crate::{
    bitvec::BitVec,
    error::Error,
    outcome::SearchOutcome,
    power_grid::PowerGrid,
    selection::{BlockLayout, Selection},
};

/// Exhaustive counterpart of the collision search: walks every block-balanced
/// selection of `grid` row by row and hands those whose power sum is the
/// magic constant to `f`.
///
/// Column-blocks are capped at s cells and partial sums above μ are cut, so
/// only a small part of the n! permutations is visited on real grids.
/// Returns `Stop` if `f` asked for it, `Exhausted` otherwise.
pub fn for_each_balanced_selection<F>(
    grid: &PowerGrid,
    layout: BlockLayout,
    mut f: F,
) -> Result<SearchOutcome, Error>
where
    F: FnMut(&Selection) -> SearchOutcome,
{
    let n = grid.n();
    if layout.n() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            found: layout.n(),
        });
    }

    let mut search = SelectionSearch {
        grid,
        layout,
        mu: grid.magic_constant(),
        cols: Vec::with_capacity(n),
        used_cols: BitVec::with_len(n),
        col_block_counts: vec![0; layout.col_blocks()],
        visited: 0,
    };

    let outcome = search.search_inside(0, 0, &mut f);
    debug!(visited = search.visited, ?outcome, "balanced selection walk");

    Ok(match outcome {
        SearchOutcome::Stop => SearchOutcome::Stop,
        _ => SearchOutcome::Exhausted,
    })
}

struct SelectionSearch<'a> {
    grid: &'a PowerGrid,
    layout: BlockLayout,
    mu: u128,
    cols: Vec<usize>,
    used_cols: BitVec,
    col_block_counts: Vec<usize>,
    visited: u64,
}

impl SelectionSearch<'_> {
    fn search_inside<F>(&mut self, row: usize, sum: u128, f: &mut F) -> SearchOutcome
    where
        F: FnMut(&Selection) -> SearchOutcome,
    {
        let n = self.grid.n();
        self.visited += 1;

        if row == n {
            if sum != self.mu {
                return SearchOutcome::Continue;
            }
            return match f(&Selection::new(self.cols.clone())) {
                SearchOutcome::Stop => SearchOutcome::Stop,
                _ => SearchOutcome::Continue,
            };
        }

        for col in 0..n {
            if self.used_cols.contains(col) {
                continue;
            }
            let block = self.layout.col_block(col);
            if self.col_block_counts[block] >= self.layout.s {
                continue;
            }
            let Some(next) = sum
                .checked_add(self.grid.power(row, col))
                .filter(|next| *next <= self.mu)
            else {
                continue;
            };

            self.cols.push(col);
            self.used_cols.insert(col);
            self.col_block_counts[block] += 1;

            let outcome = self.search_inside(row + 1, next, f);

            self.col_block_counts[block] -= 1;
            self.used_cols.remove(col);
            self.cols.pop();

            if outcome.is_stop() {
                return SearchOutcome::Stop;
            }
        }

        SearchOutcome::Continue
    }
}

#[cfg(test)]
mod test {

    use super::*;

    fn six_by_six() -> PowerGrid {
        PowerGrid::from_rows(
            &[
                &[138, 161, 230, 54, 216, 351],
                &[162, 189, 270, 46, 184, 299],
                &[154, 220, 132, 224, 364, 56],
                &[196, 280, 168, 176, 286, 44],
                &[190, 114, 133, 403, 62, 248],
                &[310, 186, 217, 247, 38, 152],
            ],
            1,
        )
    }

    #[test]
    fn every_magic_transversal_of_six_by_six() {
        let grid = six_by_six();
        let layout = BlockLayout::new(2, 3);

        let mut found = vec![];
        let outcome = for_each_balanced_selection(&grid, layout, |selection| {
            found.push(selection.clone());
            SearchOutcome::Continue
        });

        assert_eq!(outcome, Ok(SearchOutcome::Exhausted));
        assert_eq!(
            found,
            vec![
                Selection::new(vec![0, 3, 4, 2, 5, 1]),
                Selection::new(vec![2, 3, 0, 4, 5, 1]),
                Selection::new(vec![3, 2, 4, 0, 1, 5]),
            ]
        );
        for selection in &found {
            assert!(layout.is_block_balanced(selection.cells()));
            assert_eq!(selection.power_sum(&grid), 1150);
        }
    }

    #[test]
    fn constant_grid_yields_every_permutation() {
        let grid = PowerGrid::from_rows(&[&[2; 4], &[2; 4], &[2; 4], &[2; 4]], 3);

        let mut count = 0;
        let outcome = for_each_balanced_selection(&grid, BlockLayout::new(2, 2), |selection| {
            assert!(selection.is_permutation());
            count += 1;
            SearchOutcome::Continue
        });

        assert_eq!(outcome, Ok(SearchOutcome::Exhausted));
        assert_eq!(count, 24);
    }

    #[test]
    fn stops_and_rejects_layouts() {
        let grid = PowerGrid::from_rows(&[&[2; 4], &[2; 4], &[2; 4], &[2; 4]], 3);

        let mut count = 0;
        let outcome = for_each_balanced_selection(&grid, BlockLayout::new(2, 2), |_| {
            count += 1;
            SearchOutcome::from_continue(count < 3)
        });
        assert_eq!(outcome, Ok(SearchOutcome::Stop));
        assert_eq!(count, 3);

        assert_eq!(
            for_each_balanced_selection(&grid, BlockLayout::new(3, 2), |_| {
                SearchOutcome::Continue
            }),
            Err(Error::DimensionMismatch {
                expected: 4,
                found: 6
            })
        );
    }

    #[test]
    fn nothing_on_grid_without_magic_transversals() {
        let grid = PowerGrid::from_rows(
            &[
                &[2, 16, 36, 63],
                &[9, 72, 8, 14],
                &[48, 6, 49, 28],
                &[56, 7, 42, 24],
            ],
            2,
        );

        let outcome = for_each_balanced_selection(&grid, BlockLayout::new(2, 2), |_| {
            SearchOutcome::Stop
        });
        assert_eq!(outcome, Ok(SearchOutcome::Exhausted));
    }
}
