//! Per-mode random candidate-state generators.
//!
//! Every sampler returns a rank-1, Hermitian, trace-1 projector that
//! factorizes according to its mode's partition structure.

use ndarray::Array2;
use rand::Rng;

use crate::geometry::{SwapMatrices3, SwapMatrices4};
use crate::kernels;
use crate::precision::{Cplx, Scalar};

/// FSnQd: tensor product of `n` independent Haar-uniform unit vectors in
/// `C^d`, projected.
pub fn random_d_fs<T: Scalar>(d: usize, n: usize, rng: &mut impl Rng) -> Array2<Cplx<T>> {
    let mut vector = kernels::haar_vector::<T>(d, rng);
    for _ in 1..n {
        let next = kernels::haar_vector::<T>(d, rng);
        vector = kernels::kronecker_vec(&vector, &next);
    }
    kernels::project(&kernels::normalize(&vector))
}

/// SBiPa: tensor product of two independent Haar-uniform unit vectors of
/// dimensions `d1` and `d2`, projected.
pub fn random_bs<T: Scalar>(d1: usize, d2: usize, rng: &mut impl Rng) -> Array2<Cplx<T>> {
    let a = kernels::haar_vector::<T>(d1, rng);
    let b = kernels::haar_vector::<T>(d2, rng);
    let joint = kernels::kronecker_vec(&a, &b);
    kernels::project(&kernels::normalize(&joint))
}

/// G3PaE3qD: biseparable state for the bipartition indicated by `variant`
/// (0 = a|BC, 1 = A|bC, 2 = AB|c), realized by sampling the base a|BC state
/// and rotating it with the cyclic swap generator `variant` times.
pub fn random_3p<T: Scalar>(
    d: usize,
    variant: usize,
    swaps: &SwapMatrices3<T>,
    rng: &mut impl Rng,
) -> Array2<Cplx<T>> {
    let single = kernels::haar_vector::<T>(d, rng);
    let pair = kernels::haar_vector::<T>(d * d, rng);
    let joint = kernels::kronecker_vec(&single, &pair);
    let base = kernels::project(&kernels::normalize(&joint));

    kernels::rotate(&base, &swaps.for_variant(variant))
}

/// G4PaE3qD: biseparable state for one of 7 bipartitions of 4 parties,
/// realized by sampling a base state and applying a sequence of swap
/// generators selected by `variant` (0..=6).
pub fn random_4p<T: Scalar>(
    d: usize,
    variant: usize,
    swaps: &SwapMatrices4<T>,
    rng: &mut impl Rng,
) -> Array2<Cplx<T>> {
    let single = kernels::haar_vector::<T>(d, rng);
    let triple = kernels::haar_vector::<T>(d * d * d, rng);
    let joint = kernels::kronecker_vec(&single, &triple);
    let base = kernels::project(&kernels::normalize(&joint));

    // variant in 0..=3: the 4 single-vs-triple bipartitions, reached by
    // cycling the single-party slot. variant in 4..=6: the 3 pair-vs-pair
    // bipartitions, reached by applying one or both transpositions on top of
    // the cycled base. `for_variant` composes exactly this sequence.
    kernels::rotate(&base, &swaps.for_variant(variant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn random_d_fs_is_trace_one_and_hermitian() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let rho = random_d_fs::<f64>(2, 3, &mut rng);
        let d = rho.nrows();
        let mut trace = 0.0;
        for i in 0..d {
            trace += rho[(i, i)].re;
        }
        assert_abs_diff_eq!(trace, 1.0, epsilon = 1e-9);
        for i in 0..d {
            for j in 0..d {
                assert_abs_diff_eq!(rho[(i, j)].re, rho[(j, i)].re, epsilon = 1e-9);
                assert_abs_diff_eq!(rho[(i, j)].im, -rho[(j, i)].im, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn random_bs_has_expected_dimension() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let rho = random_bs::<f64>(2, 3, &mut rng);
        assert_eq!(rho.nrows(), 6);
        assert_eq!(rho.ncols(), 6);
    }

    #[test]
    fn random_3p_preserves_trace_across_variants() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let swaps = SwapMatrices3::<f64>::build(2);
        for variant in 0..3 {
            let rho = random_3p::<f64>(2, variant, &swaps, &mut rng);
            let mut trace = 0.0;
            for i in 0..rho.nrows() {
                trace += rho[(i, i)].re;
            }
            assert_abs_diff_eq!(trace, 1.0, epsilon = 1e-9);
        }
    }
}
