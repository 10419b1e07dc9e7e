use tracing::{debug, info};

use crate::{
    error::Error,
    latin_square::LatinSquare,
    latin_square_generator::for_each_latin_square_array,
    outcome::SearchOutcome,
    perf_counter::PerfCounter,
    selection::{are_diagonalizable, BlockLayout, Selection},
    taxicab::falls_on_distinct_lines,
};

/// Two Latin square families and the two selections that become
/// diagonalizable in the grid they build
#[derive(Clone, Debug)]
pub struct CompatibleFamilies {
    /// r squares of side s
    pub p: Vec<LatinSquare>,
    /// s squares of side r
    pub q: Vec<LatinSquare>,
    /// Both in the coordinates of the grid built from `p` and `q`
    pub main: Selection,
    pub anti: Selection,
}

/// Enumerates every pair of families (P, Q) and reports each pair of
/// selections that can be moved onto the two diagonals once the grid is
/// rebuilt from P and Q.
///
/// `selections` are given in the coordinates of the cyclic construction.
/// Returns `Stop` if `f` asked for it, `Exhausted` once every pair of
/// families was tried.
pub fn find_compatible_families<F>(
    layout: BlockLayout,
    selections: &[Selection],
    mut f: F,
) -> Result<SearchOutcome, Error>
where
    F: FnMut(&CompatibleFamilies) -> SearchOutcome,
{
    let BlockLayout { r, s } = layout;
    let mut perf = PerfCounter::new();
    let mut error = None;

    let outcome = for_each_latin_square_array(s, r, |p| {
        let inner = for_each_latin_square_array(r, s, |q| {
            perf.add(1);
            if perf.crossed_report_mark() {
                debug!(
                    families = %perf.boards(),
                    rate = %perf.format_rate("families"),
                    "compatibility search"
                );
            }

            match check_families(layout, selections, p, q, &mut f) {
                Ok(outcome) => outcome,
                Err(e) => {
                    error = Some(e);
                    SearchOutcome::Stop
                }
            }
        });

        match inner {
            SearchOutcome::Stop => SearchOutcome::Stop,
            _ => SearchOutcome::Continue,
        }
    });

    if let Some(e) = error {
        return Err(e);
    }

    info!(
        families = %perf.boards(),
        elapsed = ?perf.elapsed(),
        "compatibility search finished"
    );

    Ok(outcome)
}

fn check_families<F>(
    layout: BlockLayout,
    selections: &[Selection],
    p: &[LatinSquare],
    q: &[LatinSquare],
    f: &mut F,
) -> Result<SearchOutcome, Error>
where
    F: FnMut(&CompatibleFamilies) -> SearchOutcome,
{
    let mut mapped: Vec<Selection> = Vec::with_capacity(selections.len());

    for selection in selections {
        let Some(selection) = falls_on_distinct_lines(selection, p, q, layout)? else {
            continue;
        };

        for previous in &mapped {
            if !are_diagonalizable(previous, &selection) {
                continue;
            }

            let families = CompatibleFamilies {
                p: p.to_vec(),
                q: q.to_vec(),
                main: previous.clone(),
                anti: selection.clone(),
            };
            if f(&families).is_stop() {
                return Ok(SearchOutcome::Stop);
            }
        }

        mapped.push(selection);
    }

    Ok(SearchOutcome::Continue)
}
