//! Dimension detection and the fixed permutation ("swap") operators that
//! realize the different bipartition variants of the multipartite modes.

use ndarray::Array2;

use crate::error::{CssfError, Result};
use crate::kernels::{self, permutation_operator};
use crate::precision::{Cplx, Scalar};

/// System shape recovered from a flat matrix dimension: `depth` (qudit size)
/// and `quantity` (number of qudits), with `depth^quantity == total`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub depth: usize,
    pub quantity: usize,
}

/// Smallest prime `p >= from`, found by trial division. Sizes involved here
/// never exceed a few hundred, so no sieve/caching is warranted.
fn next_prime(from: usize) -> usize {
    fn is_prime(n: usize) -> bool {
        if n < 2 {
            return false;
        }
        if n % 2 == 0 {
            return n == 2;
        }
        let mut d = 3;
        while d * d <= n {
            if n % d == 0 {
                return false;
            }
            d += 2;
        }
        true
    }
    let mut candidate = from.max(2);
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

fn primes_up_to(limit: usize) -> impl Iterator<Item = usize> {
    let mut next = 2usize;
    std::iter::from_fn(move || {
        if next > limit {
            return None;
        }
        let p = next_prime(next);
        if p > limit {
            return None;
        }
        next = p + 1;
        Some(p)
    })
}

/// FSnQd dimension detection: smallest prime depth `d` such that `total` is
/// an exact integer power of `d`.
pub fn detect_fsnqd(total: usize) -> Result<Dimensions> {
    for depth in primes_up_to(total) {
        let mut acc = depth;
        let mut quantity = 1usize;
        while acc < total {
            acc *= depth;
            quantity += 1;
        }
        if acc == total {
            return Ok(Dimensions { depth, quantity });
        }
    }
    Err(CssfError::Dimension(format!(
        "couldn't determine FSnQd system size for total={total}: prime range exceeded"
    )))
}

/// SBiPa dimension detection: a perfect square splits evenly in half;
/// otherwise fall back to the smallest prime factor of `total`. This tie
/// break (perfect square checked first, then ascending prime factors) mirrors
/// the reference implementation.
pub fn detect_sbipa(total: usize) -> Result<(usize, usize)> {
    let sqrt = (total as f64).sqrt().round() as usize;
    if sqrt * sqrt == total {
        return Ok((sqrt, sqrt));
    }
    for depth in primes_up_to(total) {
        if total % depth == 0 {
            return Ok((depth, total / depth));
        }
    }
    Err(CssfError::Dimension(format!(
        "couldn't determine SBiPa system size for total={total}: prime range exceeded"
    )))
}

/// Multipartite dimension detection: integer `parties`-th root of `total`.
pub fn detect_multipartite(total: usize, parties: u32) -> Result<usize> {
    let approx = (total as f64).powf(1.0 / parties as f64).round() as usize;
    for depth in approx.saturating_sub(1)..=approx + 1 {
        if depth > 0 && depth.pow(parties) == total {
            return Ok(depth);
        }
    }
    Err(CssfError::Dimension(format!(
        "couldn't determine {parties}-partite system size for total={total}: not a perfect {parties}-th power"
    )))
}

/// Swap (permutation) operators for the genuine 3-partite mode.
///
/// The reference names a single `swap_123` matrix and cycles the bipartition
/// index across epochs. We realize that with one 3-cycle generator: variant
/// `v` is obtained by conjugating the base (party 0 | parties {1,2}) sample
/// with `cycle^v`, covering all three single-vs-pair bipartitions.
pub struct SwapMatrices3<T: Scalar> {
    pub cycle: Array2<Cplx<T>>,
}

impl<T: Scalar> SwapMatrices3<T> {
    pub fn build(depth: usize) -> Self {
        Self {
            cycle: permutation_operator(depth, &[1, 2, 0]),
        }
    }

    /// The single permutation operator `random_3p` applies to reach
    /// `variant`'s bipartition from the base (party 0 | parties {1,2})
    /// sample: `cycle^(variant % 3)`. Callers that need to rotate the
    /// subsystem that is actually separable in that variant's candidate
    /// (rather than always party 0) conjugate their local unitary by this.
    pub fn for_variant(&self, variant: usize) -> Array2<Cplx<T>> {
        let v = variant % 3;
        let d = self.cycle.nrows();
        let mut result = kernels::identity::<T>(d);
        for _ in 0..v {
            result = kernels::matmul(&self.cycle, &result);
        }
        result
    }
}

/// Swap (permutation) operators for the genuine 4-partite mode.
///
/// Two generators cover all 7 bipartitions: a 4-cycle over the single-party
/// positions (4 single-vs-triple bipartitions) and a pair of transpositions
/// applied to a pair-vs-pair base sample (the remaining 3 bipartitions).
pub struct SwapMatrices4<T: Scalar> {
    pub cycle4: Array2<Cplx<T>>,
    pub swap_12: Array2<Cplx<T>>,
    pub swap_13: Array2<Cplx<T>>,
}

impl<T: Scalar> SwapMatrices4<T> {
    pub fn build(depth: usize) -> Self {
        Self {
            cycle4: permutation_operator(depth, &[1, 2, 3, 0]),
            swap_12: permutation_operator(depth, &[0, 2, 1, 3]),
            swap_13: permutation_operator(depth, &[0, 3, 2, 1]),
        }
    }

    /// The composed permutation operator `random_4p` applies to reach
    /// `variant`'s bipartition from the base (party 0 | parties {1,2,3})
    /// sample: `cycle4^min(v,3)`, then `swap_12` if `v >= 4`, then `swap_13`
    /// if `v == 6` — applied in that order, matching the sequence of
    /// `rotate` calls in `random_4p`. Conjugating a local unitary by this
    /// moves it onto the subsystem that is actually separable for `variant`.
    pub fn for_variant(&self, variant: usize) -> Array2<Cplx<T>> {
        let v = variant % 7;
        let cycles = v.min(3);
        let d = self.cycle4.nrows();
        let mut result = kernels::identity::<T>(d);
        for _ in 0..cycles {
            result = kernels::matmul(&self.cycle4, &result);
        }
        if v >= 4 {
            result = kernels::matmul(&self.swap_12, &result);
        }
        if v == 6 {
            result = kernels::matmul(&self.swap_13, &result);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fsnqd_detects_five_qubits() {
        let dims = detect_fsnqd(32).unwrap();
        assert_eq!(dims, Dimensions { depth: 2, quantity: 5 });
    }

    #[test]
    fn fsnqd_detects_four_qutrits() {
        let dims = detect_fsnqd(81).unwrap();
        assert_eq!(dims, Dimensions { depth: 3, quantity: 4 });
    }

    #[test]
    fn sbipa_prefers_perfect_square() {
        assert_eq!(detect_sbipa(9).unwrap(), (3, 3));
    }

    #[test]
    fn sbipa_falls_back_to_smallest_prime_factor() {
        // 12 is not a perfect square; smallest prime factor is 2.
        assert_eq!(detect_sbipa(12).unwrap(), (2, 6));
    }

    #[test]
    fn multipartite_detects_cube_and_fourth_power() {
        assert_eq!(detect_multipartite(8, 3).unwrap(), 2);
        assert_eq!(detect_multipartite(81, 4).unwrap(), 3);
    }

    #[test]
    fn multipartite_rejects_non_power() {
        assert!(detect_multipartite(10, 3).is_err());
    }

    #[test]
    fn swap_matrices3_for_variant_moves_a_local_operator_to_the_right_slot() {
        // Pauli X, acting alone in a 2-dim subsystem.
        let local = Array2::from_shape_vec(
            (2, 2),
            vec![
                Cplx::new(0.0_f64, 0.0),
                Cplx::new(1.0, 0.0),
                Cplx::new(1.0, 0.0),
                Cplx::new(0.0, 0.0),
            ],
        )
        .unwrap();
        let swaps = SwapMatrices3::<f64>::build(2);

        // variant 0: local at slot 0, i.e. local (x) I (x) I.
        let at_slot0 = crate::kernels::kronecker(
            &local,
            &crate::kernels::kronecker(&crate::kernels::identity::<f64>(2), &crate::kernels::identity::<f64>(2)),
        );
        let embedded_slot0 = crate::kernels::kronecker(&local, &crate::kernels::identity::<f64>(4));
        for i in 0..8 {
            for j in 0..8 {
                assert_abs_diff_eq!(embedded_slot0[(i, j)].re, at_slot0[(i, j)].re, epsilon = 1e-12);
            }
        }

        // variant 1's swap conjugates a slot-0 operator onto slot 1: I (x) local (x) I.
        let expected_slot1 = crate::kernels::kronecker(
            &crate::kernels::identity::<f64>(2),
            &crate::kernels::kronecker(&local, &crate::kernels::identity::<f64>(2)),
        );
        let swap1 = swaps.for_variant(1);
        let rotated = crate::kernels::rotate(&embedded_slot0, &swap1);
        for i in 0..8 {
            for j in 0..8 {
                assert_abs_diff_eq!(rotated[(i, j)].re, expected_slot1[(i, j)].re, epsilon = 1e-10);
                assert_abs_diff_eq!(rotated[(i, j)].im, expected_slot1[(i, j)].im, epsilon = 1e-10);
            }
        }
    }
}
