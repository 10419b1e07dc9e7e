/// Returns `base^d`, or `None` if it does not fit in 128 bits
#[inline]
pub fn checked_pow(base: u64, d: u32) -> Option<u128> {
    (base as u128).checked_pow(d)
}

/// Returns `base^d`. Panics on overflow, callers keep entries small enough
#[inline]
pub fn pow(base: u64, d: u32) -> u128 {
    (base as u128).pow(d)
}

/// Returns the integer `x` with `x^d == value` if there is one.
///
/// The float root only seeds the bracket, the answer comes from an integer
/// binary search so roots beyond 2^53 are exact.
pub fn exact_root(value: u128, d: u32) -> Option<u64> {
    debug_assert!(d > 0);

    if value == 0 {
        return Some(0);
    }
    if d == 1 {
        return u64::try_from(value).ok();
    }

    let at_most = |x: u64| checked_pow(x, d).is_some_and(|p| p <= value);

    let estimate = (value as f64).powf(1.0 / d as f64) as u64;
    let slack = (estimate >> 32) + 2;

    // at_most(lo) holds, at_most(hi) fails unless hi is u64::MAX
    let mut lo = estimate.saturating_sub(slack);
    let mut hi = estimate.saturating_add(slack);
    if !at_most(lo) {
        lo = 0;
    }
    if at_most(hi) {
        if hi == u64::MAX || at_most(u64::MAX) {
            return (checked_pow(u64::MAX, d) == Some(value)).then_some(u64::MAX);
        }
        lo = hi;
        hi = u64::MAX;
    }

    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if at_most(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    (checked_pow(lo, d) == Some(value)).then_some(lo)
}

/// Number of boards that can still be built once `filled` of the `cells` cells
/// hold pairwise distinct values from `1..=max_base`.
///
/// Every later cell has to avoid all earlier values, so the count is the
/// falling product `(X - filled) * (X - filled - 1) * ...` over the free cells.
/// Saturates instead of overflowing.
pub fn boards_below(cells: usize, filled: usize, max_base: u64) -> u128 {
    let mut acc: u128 = 1;

    for i in 0..cells.saturating_sub(filled) {
        let Some(choices) = max_base.checked_sub((filled + i) as u64) else {
            return 0;
        };
        if choices == 0 {
            return 0;
        }
        acc = acc.saturating_mul(choices as u128);
    }

    acc
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn roots() {
        assert_eq!(exact_root(1, 3), Some(1));
        assert_eq!(exact_root(4913, 3), Some(17));
        assert_eq!(exact_root(4914, 3), None);
        assert_eq!(exact_root(65, 2), None);
        assert_eq!(exact_root(pow(123456, 4), 4), Some(123456));
        assert_eq!(exact_root(pow(u32::MAX as u64, 2), 2), Some(u32::MAX as u64));
    }

    #[test]
    fn roots_past_float_precision() {
        for k in 0..64 {
            let base = (1u64 << 56) + k;
            assert_eq!(exact_root(pow(base, 2), 2), Some(base), "base = {base}");
            assert_eq!(exact_root(pow(base, 2) + 1, 2), None);
            assert_eq!(exact_root(pow(base, 2) - 1, 2), None);
        }

        let base = (1u64 << 42) + 5;
        assert_eq!(exact_root(pow(base, 3), 3), Some(base));
        assert_eq!(exact_root(pow(base, 3) - 1, 3), None);
    }

    #[test]
    fn roots_near_the_top() {
        for base in [u64::MAX - 5, u64::MAX - 1, u64::MAX] {
            assert_eq!(exact_root(pow(base, 2), 2), Some(base));
        }
        assert_eq!(exact_root(pow(u64::MAX - 5, 2) + 1, 2), None);
        assert_eq!(exact_root(u128::MAX, 2), None);
        assert_eq!(exact_root(u128::MAX, 3), None);
    }

    #[test]
    fn board_counts() {
        // 3 free cells, values 1..=5, 1 already used
        assert_eq!(boards_below(4, 1, 5), 4 * 3 * 2);
        assert_eq!(boards_below(4, 4, 5), 1);
        assert_eq!(boards_below(9, 0, 4), 0);
        assert_eq!(boards_below(64, 0, u64::MAX), u128::MAX);
    }
}
