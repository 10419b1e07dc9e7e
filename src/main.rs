use anyhow::{bail, ensure, Context, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::{
    args::{Args, Mode, TermRows},
    bitset::BitSet,
    collision_search::{CollisionConfig, CollisionSearchSession},
    compatibility::{find_compatible_families, CompatibleFamilies},
    diagonal_assembly::{permute_onto_diagonals, shuffle_into_magic},
    exhaustive_search::{first_magic_square, ExhaustiveSearch},
    latin_square_generator::for_each_latin_square,
    outcome::SearchOutcome,
    power_grid::PowerGrid,
    selection::{BlockLayout, Selection},
    selection_search::for_each_balanced_selection,
    taxicab::{cross_products_are_distinct, semi_magic_from_taxicabs, Taxicab},
};

mod args;
mod arithmetic;
mod bitset;
mod bitvec;
mod collision_search;
mod compatibility;
mod diagonal_assembly;
mod error;
mod exhaustive_search;
mod latin_square;
mod latin_square_generator;
mod outcome;
mod partial_sum_table;
mod perf_counter;
mod permutation;
mod power_grid;
mod selection;
mod selection_search;
mod taxicab;

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    match args.mode {
        Mode::Latin { n, limit } => {
            ensure!(n <= BitSet::CAPACITY, "n must be at most {}", BitSet::CAPACITY);
            let limit = limit.unwrap_or(usize::MAX);
            let mut printed = 0;
            if limit > 0 {
                for_each_latin_square(n, |sq| {
                    println!("{sq}");
                    printed += 1;
                    SearchOutcome::from_continue(printed < limit)
                });
            }
        }
        Mode::CountLatin { n } => {
            ensure!(n <= BitSet::CAPACITY, "n must be at most {}", BitSet::CAPACITY);
            let mut count = 0u64;
            for_each_latin_square(n, |_| {
                count += 1;
                SearchOutcome::Continue
            });
            println!("{count}");
        }
        Mode::Search {
            n,
            d,
            max_base,
            prefix,
        } => search(n, d, max_base, &prefix)?,
        Mode::Assemble {
            a,
            b,
            d,
            required,
            max_stale,
            min_stored_len,
            rounds,
            exhaustive_selections,
            shuffle_budget,
        } => {
            let config = CollisionConfig {
                required,
                max_stale_attempts: max_stale,
                min_stored_len,
                ..Default::default()
            };
            let plan = SelectionPlan {
                config,
                rounds,
                exhaustive: exhaustive_selections,
            };
            assemble(&a, &b, d, &plan, shuffle_budget, &mut rng)?;
        }
        Mode::Check { rows, d } => check(&rows, d)?,
        Mode::Siamese { n } => {
            ensure!(n % 2 == 1, "the siamese method needs an odd side, got {n}");
            let grid = PowerGrid::siamese(n);
            println!("{grid}");
            info!(mu = %grid.magic_constant(), magic = grid.is_magic(), "siamese square");
        }
    }

    Ok(())
}

fn search(n: usize, d: u32, max_base: u64, prefix: &[u64]) -> Result<()> {
    if prefix.is_empty() {
        match first_magic_square(n, d, max_base).context("invalid search parameters")? {
            Some(square) => {
                println!("{square}");
                info!(mu = %square.magic_constant(), "found a magic square of {d}-th powers");
            }
            None => info!("no magic square of {d}-th powers with bases up to {max_base}"),
        }
        return Ok(());
    }

    let mut grid = PowerGrid::new(n, d);
    for (cell, value) in prefix.iter().enumerate() {
        ensure!(cell < n * n, "the prefix is longer than the grid");
        grid.set(cell / n, cell % n, *value);
    }

    let mut search = ExhaustiveSearch::new(n, d, max_base);
    let outcome = search
        .search_from(&mut grid, prefix.len(), |square| {
            println!("{square}");
            SearchOutcome::Stop
        })
        .context("invalid search parameters")?;

    match outcome {
        SearchOutcome::Stop => info!(mu = %grid.magic_constant(), "found a magic square of {d}-th powers"),
        _ => info!("no magic square of {d}-th powers with bases up to {max_base}"),
    }

    Ok(())
}

/// Prints a square given by its bases and how close it is to magic
fn check(rows: &TermRows, d: u32) -> Result<()> {
    ensure!(d >= 1, "the exponent must be positive");
    let rows = rows.as_rows();
    let n = rows.len();
    ensure!(
        rows.iter().all(|row| row.len() == n),
        "expected {n} rows of {n} bases each"
    );

    let grid = PowerGrid::from_rows(&rows, d);
    println!("{grid}");

    for i in 0..n {
        debug!(line = i, row = %grid.sum_row(i), col = %grid.sum_col(i), "line sums");
    }
    debug!(main = %grid.sum_diag(), anti = %grid.sum_anti_diag(), "diagonal sums");

    info!(
        mu = %grid.magic_constant(),
        distinct = grid.is_distinct(),
        semi_magic = grid.is_semi_magic(),
        magic = grid.is_magic(),
        "checked {n}x{n} square of {d}-th powers"
    );

    Ok(())
}

/// How the balanced selections of the semi-magic grid are gathered
struct SelectionPlan {
    config: CollisionConfig,
    /// Collision searches run on fresh tables
    rounds: usize,
    /// Walk every balanced selection instead of sampling
    exhaustive: bool,
}

fn assemble<R: Rng + ?Sized>(
    a: &TermRows,
    b: &TermRows,
    d: u32,
    plan: &SelectionPlan,
    shuffle_budget: u64,
    rng: &mut R,
) -> Result<()> {
    let a = Taxicab::from_rows(&a.as_rows(), d).context("reading the first tuple")?;
    let b = Taxicab::from_rows(&b.as_rows(), d).context("reading the second tuple")?;
    info!(r = a.r(), s = a.s(), d = a.d(), "a: {a}");
    info!(r = b.r(), s = b.s(), d = b.d(), "b: {b}");

    if !a.has_distinct_terms() || !b.has_distinct_terms() {
        warn!("a tuple repeats a base, the grid will repeat entries");
    } else if !cross_products_are_distinct(&a, &b) {
        warn!("some products a[i][j] * b[u][v] repeat, no square built from them can be magic");
    }

    let grid = semi_magic_from_taxicabs(&a, &b, None, None)
        .context("building the semi-magic grid")?;
    info!(mu = %grid.magic_constant(), "semi-magic grid:\n{grid}");

    let layout = BlockLayout::new(a.r(), a.s());
    let Some(families) = find_diagonal_pair(&grid, layout, plan, rng)? else {
        return shuffle_fallback(grid, shuffle_budget, rng);
    };

    let mut grid = semi_magic_from_taxicabs(
        &a,
        &b,
        Some(families.p.as_slice()),
        Some(families.q.as_slice()),
    )
    .context("rebuilding the grid from the compatible families")?;
    permute_onto_diagonals(&mut grid, &families.main, &families.anti)
        .context("moving the selections onto the diagonals")?;

    println!("{grid}");
    if !grid.is_magic() {
        bail!("the assembled grid is not a magic square");
    }
    info!(mu = %grid.magic_constant(), "magic square of {d}-th powers");

    Ok(())
}

/// Gathers balanced selections with μ as power sum and looks for families
/// that put two of them on the diagonals
fn find_diagonal_pair<R: Rng + ?Sized>(
    grid: &PowerGrid,
    layout: BlockLayout,
    plan: &SelectionPlan,
    rng: &mut R,
) -> Result<Option<CompatibleFamilies>> {
    let required = plan.config.required;
    let mut found: Vec<Selection> = Vec::with_capacity(required);

    if plan.exhaustive {
        let outcome = for_each_balanced_selection(grid, layout, |selection| {
            found.push(selection.clone());
            SearchOutcome::from_continue(found.len() < required)
        })
        .context("walking the balanced selections")?;
        info!(found = found.len(), ?outcome, "balanced selection walk done");
    } else {
        let mut session = CollisionSearchSession::new(grid, layout, plan.config.clone())
            .context("starting the collision search")?;
        debug!(mu = %session.magic_constant(), "collision search target");

        for round in 0..plan.rounds.max(1) {
            if round > 0 {
                session.reset();
            }
            let report = session.run(rng, |_| SearchOutcome::Continue);
            for selection in report.found {
                if !found.contains(&selection) {
                    found.push(selection);
                }
            }

            info!(
                round,
                found = found.len(),
                attempts = report.attempts,
                status = ?report.status,
                tables = ?session.table_sizes(),
                "collision search round done"
            );
            if found.len() >= required {
                break;
            }
        }
    }

    if found.len() < 2 {
        warn!("not enough selections to place on both diagonals");
        return Ok(None);
    }

    let mut hit = None;
    find_compatible_families(layout, &found, |families| {
        hit = Some(families.clone());
        SearchOutcome::Stop
    })
    .context("searching compatible latin square families")?;

    if hit.is_none() {
        warn!("no pair of latin square families separates two of the selections");
    }

    Ok(hit)
}

fn shuffle_fallback<R: Rng + ?Sized>(mut grid: PowerGrid, budget: u64, rng: &mut R) -> Result<()> {
    if budget == 0 {
        return Ok(());
    }

    if shuffle_into_magic(&mut grid, rng, budget) {
        println!("{grid}");
        info!(magic = grid.is_magic(), "shuffling put μ on both diagonals");
    } else {
        info!("shuffling did not find diagonal sums within {budget} tries");
    }

    Ok(())
}
