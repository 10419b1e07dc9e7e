use std::collections::HashSet;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::{
    bitvec::BitVec,
    error::Error,
    outcome::SearchOutcome,
    partial_sum_table::PartialSumTable,
    power_grid::PowerGrid,
    selection::{BlockLayout, Selection, SelectionKey},
};

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionConfig {
    /// Distinct selections to find before returning
    pub required: usize,
    /// Consecutive attempts without a new selection or a new table entry
    pub max_stale_attempts: u64,
    /// Partial selections shorter than this are never stored
    pub min_stored_len: usize,
    pub load_factor: f64,
    pub initial_capacity: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        CollisionConfig {
            required: 2,
            max_stale_attempts: 1 << 20,
            min_stored_len: 1,
            load_factor: 0.7,
            initial_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionStatus {
    /// The required number of selections was found
    Satisfied,
    /// The callback asked to stop
    Stopped,
    /// The no-progress budget ran out first
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct CollisionReport {
    pub found: Vec<Selection>,
    pub attempts: u64,
    pub status: CollisionStatus,
}

/// Randomized meet-in-the-middle search for block-balanced selections whose
/// power sum is the magic constant of a semi-magic grid.
///
/// Every attempt walks a random partial permutation. Each prefix of length k
/// is stored in table k and immediately joined against table n - k for the
/// complementary sum. Tables outlive attempts, so later walks profit from
/// everything earlier walks have seen.
pub struct CollisionSearchSession<'a> {
    grid: &'a PowerGrid,
    layout: BlockLayout,
    config: CollisionConfig,
    mu: u128,
    tables: Vec<PartialSumTable>,
    emitted: HashSet<SelectionKey>,

    // per attempt
    cells: Vec<(usize, usize)>,
    used_rows: BitVec,
    used_cols: BitVec,
    row_block_counts: Vec<usize>,
    col_block_counts: Vec<usize>,
}

impl<'a> CollisionSearchSession<'a> {
    pub fn new(
        grid: &'a PowerGrid,
        layout: BlockLayout,
        config: CollisionConfig,
    ) -> Result<Self, Error> {
        let n = grid.n();
        if layout.n() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: layout.n(),
            });
        }

        let tables = (0..n)
            .map(|k| {
                let capacity = if Self::stores(&config, n, k) {
                    config.initial_capacity
                } else {
                    2
                };
                PartialSumTable::new(capacity, config.load_factor)
            })
            .collect();

        Ok(CollisionSearchSession {
            grid,
            layout,
            mu: grid.magic_constant(),
            tables,
            emitted: HashSet::new(),
            cells: Vec::with_capacity(n),
            used_rows: BitVec::with_len(n),
            used_cols: BitVec::with_len(n),
            row_block_counts: vec![0; layout.row_blocks()],
            col_block_counts: vec![0; layout.col_blocks()],
            config,
        })
    }

    /// Partial selections of length `k` are kept for joining
    fn stores(config: &CollisionConfig, n: usize, k: usize) -> bool {
        k >= config.min_stored_len.max(1) && k + 2 <= n
    }

    pub fn magic_constant(&self) -> u128 {
        self.mu
    }

    /// Entries stored per partial length
    pub fn table_sizes(&self) -> Vec<usize> {
        self.tables.iter().map(PartialSumTable::len).collect()
    }

    /// Empties every table and forgets what was emitted
    pub fn reset(&mut self) {
        self.tables.iter_mut().for_each(PartialSumTable::reset);
        self.emitted.clear();
    }

    /// Launches attempts until `required` new selections were emitted, `f`
    /// stops the search, or `max_stale_attempts` attempts in a row made no
    /// progress.
    pub fn run<R, F>(&mut self, rng: &mut R, mut f: F) -> CollisionReport
    where
        R: Rng + ?Sized,
        F: FnMut(&Selection) -> SearchOutcome,
    {
        let mut found = Vec::with_capacity(self.config.required);
        let mut attempts = 0u64;
        let mut stale = 0u64;

        let status = loop {
            if found.len() >= self.config.required {
                break CollisionStatus::Satisfied;
            }
            if stale >= self.config.max_stale_attempts {
                warn!(
                    attempts,
                    found = found.len(),
                    required = self.config.required,
                    "collision search ran out of attempts without progress"
                );
                break CollisionStatus::Exhausted;
            }

            attempts += 1;
            let (progress, outcome) = self.attempt(rng, &mut found, &mut f);

            if outcome.is_stop() {
                break CollisionStatus::Stopped;
            }

            if progress {
                stale = 0;
            } else {
                stale += 1;
            }

            if attempts % (1 << 16) == 0 {
                debug!(attempts, stale, tables = ?self.table_sizes(), "collision search");
            }
        };

        CollisionReport {
            found,
            attempts,
            status,
        }
    }

    fn reset_attempt(&mut self) {
        self.cells.clear();
        self.used_rows.clear();
        self.used_cols.clear();
        self.row_block_counts.iter_mut().for_each(|c| *c = 0);
        self.col_block_counts.iter_mut().for_each(|c| *c = 0);
    }

    /// A random cell in a random tile that still has room
    fn pick_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(usize, usize)> {
        let layout = self.layout;

        let open_tiles = (0..layout.tiles())
            .filter(|&tile| {
                let (row, col) = layout.tile_origin(tile);
                self.row_block_counts[layout.row_block(row)] < layout.r
                    && self.col_block_counts[layout.col_block(col)] < layout.s
            })
            .collect::<Vec<_>>();

        if open_tiles.is_empty() {
            return None;
        }
        let tile = open_tiles[rng.random_range(0..open_tiles.len())];
        let (row0, col0) = layout.tile_origin(tile);

        let rows = (row0..row0 + layout.r)
            .filter(|row| !self.used_rows.contains(*row))
            .collect::<Vec<_>>();
        let cols = (col0..col0 + layout.s)
            .filter(|col| !self.used_cols.contains(*col))
            .collect::<Vec<_>>();

        if rows.is_empty() || cols.is_empty() {
            return None;
        }

        Some((
            rows[rng.random_range(0..rows.len())],
            cols[rng.random_range(0..cols.len())],
        ))
    }

    fn add_cell(&mut self, (row, col): (usize, usize)) {
        self.cells.push((row, col));
        self.used_rows.insert(row);
        self.used_cols.insert(col);
        self.row_block_counts[self.layout.row_block(row)] += 1;
        self.col_block_counts[self.layout.col_block(col)] += 1;
    }

    /// One random walk. Returns whether it made progress and whether the
    /// callback asked to stop.
    fn attempt<R, F>(
        &mut self,
        rng: &mut R,
        found: &mut Vec<Selection>,
        f: &mut F,
    ) -> (bool, SearchOutcome)
    where
        R: Rng + ?Sized,
        F: FnMut(&Selection) -> SearchOutcome,
    {
        let n = self.grid.n();
        let mut progress = false;
        let mut sum = 0u128;

        self.reset_attempt();

        for k in 1..=n {
            let Some(cell) = self.pick_cell(rng) else {
                break;
            };
            self.add_cell(cell);

            sum += self.grid.power(cell.0, cell.1);
            if sum > self.mu {
                break;
            }

            if k == n {
                if sum == self.mu {
                    if let Some(selection) = Selection::from_cells(n, &self.cells) {
                        let (new, outcome) = self.emit(selection, found, f);
                        progress |= new;
                        if outcome.is_stop() {
                            return (progress, SearchOutcome::Stop);
                        }
                    }
                }
                break;
            }

            if Self::stores(&self.config, n, k) {
                let key = SelectionKey::from_cells(self.cells.clone());
                progress |= self.tables[k].insert(sum, key);
            }

            for selection in self.join(n - k, self.mu - sum) {
                let (new, outcome) = self.emit(selection, found, f);
                progress |= new;
                if outcome.is_stop() {
                    return (progress, SearchOutcome::Stop);
                }
            }
        }

        (progress, SearchOutcome::Continue)
    }

    /// Completions of the current walk found in table `len`
    fn join(&self, len: usize, rest: u128) -> Vec<Selection> {
        let n = self.grid.n();
        if !Self::stores(&self.config, n, len) || self.tables[len].is_empty() {
            return vec![];
        }

        self.tables[len]
            .matches(rest)
            .filter(|entry| {
                entry.cells.cells().iter().all(|&(row, col)| {
                    !self.used_rows.contains(row) && !self.used_cols.contains(col)
                })
            })
            .filter_map(|entry| {
                let cells = self
                    .cells
                    .iter()
                    .chain(entry.cells.cells())
                    .copied()
                    .collect::<Vec<_>>();

                if !self.layout.respects_block_bounds(cells.iter().copied()) {
                    return None;
                }
                Selection::from_cells(n, &cells)
            })
            .collect()
    }

    /// Hands a complete selection to `f` unless it was emitted before
    fn emit<F>(
        &mut self,
        selection: Selection,
        found: &mut Vec<Selection>,
        f: &mut F,
    ) -> (bool, SearchOutcome)
    where
        F: FnMut(&Selection) -> SearchOutcome,
    {
        if !selection.is_permutation()
            || !self.layout.is_block_balanced(selection.cells())
            || selection.power_sum(self.grid) != self.mu
        {
            return (false, SearchOutcome::Continue);
        }

        if !self.emitted.insert(selection.key()) {
            return (false, SearchOutcome::Continue);
        }

        info!(cols = ?selection.cols(), "found selection {}", found.len() + 1);

        let outcome = f(&selection);
        found.push(selection);
        (true, outcome)
    }
}
