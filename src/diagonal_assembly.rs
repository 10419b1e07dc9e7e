use rand::Rng;
use tracing::debug;

use crate::{
    error::Error,
    permutation::Permutation,
    power_grid::PowerGrid,
    selection::{anti_diagonal, are_diagonalizable, main_diagonal, Selection},
};

/// The row permutation ρ that lays the 2-cycles of `sigma` out from both
/// ends inward, so that `σ(ρ(i)) = ρ(n - 1 - i)` for every i.
fn mirrored_order(sigma: &Permutation) -> Permutation {
    let n = sigma.len();
    let mut rho = vec![0; n];

    for (k, (p, q)) in sigma.transpositions().into_iter().enumerate() {
        rho[k] = p;
        rho[n - 1 - k] = q;
    }
    if let Some(&centre) = sigma.fixed_points().first() {
        rho[n / 2] = centre;
    }

    Permutation::from_vec(rho).unwrap_or_else(|| Permutation::identity(n))
}

/// Reindexes the rows and columns of `grid` so that `main` lands on the main
/// diagonal and `anti` on the anti-diagonal.
///
/// Only the indirection arrays move. Both selections are in the grid's
/// current logical coordinates and must be diagonalizable, see
/// [`are_diagonalizable`].
pub fn permute_onto_diagonals(
    grid: &mut PowerGrid,
    main: &Selection,
    anti: &Selection,
) -> Result<(), Error> {
    let n = grid.n();
    for selection in [main, anti] {
        if selection.n() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: selection.n(),
            });
        }
    }

    if !are_diagonalizable(main, anti) {
        return Err(Error::NotDiagonalizable);
    }
    let (Some(a), Some(b)) = (main.as_permutation(), anti.as_permutation()) else {
        return Err(Error::NotDiagonalizable);
    };

    // σ pairs every row of `main` with the row whose `anti` cell shares its column
    let sigma = a.inverse().compose(&b);
    let rho = mirrored_order(&sigma);
    let gamma = a.compose(&rho);

    let sums = (main.power_sum(grid), anti.power_sum(grid));

    grid.reindex_rows(&rho);
    grid.reindex_cols(&gamma);

    debug!(rows = ?grid.rows(), cols = ?grid.cols(), "moved selections onto the diagonals");
    debug_assert_eq!(
        (main_diagonal(n).power_sum(grid), anti_diagonal(n).power_sum(grid)),
        sums
    );

    Ok(())
}

/// Random search for diagonal sums: shuffles rows until the main diagonal sums
/// to μ, then shuffles rows and columns together until the anti-diagonal does.
///
/// Each phase gives up after `budget` shuffles. Returns whether all lines now
/// sum to μ.
pub fn shuffle_into_magic<R: Rng + ?Sized>(grid: &mut PowerGrid, rng: &mut R, budget: u64) -> bool {
    let mu = grid.magic_constant();

    for _ in 0..budget {
        if grid.sum_diag() == mu {
            break;
        }
        grid.shuffle_rows(rng);
    }
    if grid.sum_diag() != mu {
        return false;
    }

    for _ in 0..budget {
        if grid.sum_anti_diag() == mu {
            break;
        }
        grid.shuffle_rows_and_cols(rng);
    }

    grid.has_magic_sums()
}

#[cfg(test)]
mod test {

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

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
    fn diagonals_stay_put() {
        let euler = PowerGrid::from_rows(
            &[
                &[68, 29, 41, 37],
                &[17, 31, 79, 32],
                &[59, 28, 23, 61],
                &[11, 77, 8, 49],
            ],
            2,
        );

        for mut grid in [euler, PowerGrid::siamese(5)] {
            let n = grid.n();
            let before = grid.logical_rows();

            permute_onto_diagonals(&mut grid, &main_diagonal(n), &anti_diagonal(n)).unwrap();

            assert_eq!(grid.logical_rows(), before);
            assert!(grid.is_magic());
        }
    }

    #[test]
    fn assembles_magic_square() {
        let mut grid = six_by_six();
        assert!(grid.is_semi_magic());
        assert!(!grid.is_magic());

        let main = Selection::new(vec![2, 3, 0, 4, 5, 1]);
        let anti = Selection::new(vec![3, 2, 4, 0, 1, 5]);
        assert_eq!(main.power_sum(&grid), 1150);
        assert_eq!(anti.power_sum(&grid), 1150);

        permute_onto_diagonals(&mut grid, &main, &anti).unwrap();

        assert!(grid.is_magic());
        assert_eq!(
            grid.logical_rows()[0],
            vec![230, 138, 351, 161, 216, 54]
        );
    }

    #[test]
    fn rejects_crossing_selections() {
        let mut grid = six_by_six();
        let main = main_diagonal(6);
        let shifted = Selection::new(vec![1, 2, 3, 4, 5, 0]);

        assert_eq!(
            permute_onto_diagonals(&mut grid, &main, &shifted),
            Err(Error::NotDiagonalizable)
        );
        assert_eq!(
            permute_onto_diagonals(&mut grid, &main_diagonal(4), &anti_diagonal(4)),
            Err(Error::DimensionMismatch {
                expected: 6,
                found: 4
            })
        );
        assert_eq!(grid, six_by_six());
    }

    #[test]
    fn shuffle_finds_lo_shu() {
        let mut rng = ChaCha8Rng::seed_from_u64(69);
        let mut grid = PowerGrid::from_rows(&[&[9, 5, 1], &[4, 3, 8], &[2, 7, 6]], 1);
        assert!(!grid.has_magic_sums());

        assert!(shuffle_into_magic(&mut grid, &mut rng, 1000));
        assert!(grid.is_magic());
    }

    #[test]
    fn shuffle_gives_up() {
        let mut rng = ChaCha8Rng::seed_from_u64(69);
        // no transversal sums to μ
        let mut grid = PowerGrid::from_rows(
            &[
                &[2, 16, 36, 63],
                &[9, 72, 8, 14],
                &[48, 6, 49, 28],
                &[56, 7, 42, 24],
            ],
            2,
        );

        assert!(!shuffle_into_magic(&mut grid, &mut rng, 50));
        assert!(grid.is_semi_magic());
    }
}
