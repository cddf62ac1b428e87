//! Generic greedy local optimizer: given a candidate and a residual, hill-
//! climb by repeatedly trying small admissible rotations.

use ndarray::Array2;
use rand::Rng;

use crate::kernels;
use crate::mode::Mode;
use crate::precision::{Cplx, Scalar};

/// Rotate `candidate` through up to `mode.epoch_budget()` admissible
/// near-identity unitaries, accepting any rotation that increases the
/// overlap with `residual`. Never fails; if nothing improves, returns
/// `candidate` unchanged. `variant` must be the same bipartition variant
/// `candidate` was sampled for, so multipartite modes rotate the subsystem
/// that is actually separable in this candidate.
pub fn optimize<T: Scalar>(
    candidate: Array2<Cplx<T>>,
    residual: &Array2<Cplx<T>>,
    mode: &Mode<T>,
    variant: usize,
    rng: &mut impl Rng,
) -> Array2<Cplx<T>> {
    let mut best = kernels::product(&candidate, residual);
    let mut cur = candidate;

    for k in 0..mode.epoch_budget() {
        let mut unitary = mode.admissible_unitary(k, variant, rng);
        let mut trial = kernels::rotate(&cur, &unitary);
        let mut score = kernels::product(&trial, residual);

        if score <= best {
            unitary = conj_transpose(&unitary);
            trial = kernels::rotate(&cur, &unitary);
            score = kernels::product(&trial, residual);
        }

        while score > best {
            cur = trial;
            best = score;
            trial = kernels::rotate(&cur, &unitary);
            score = kernels::product(&trial, residual);
        }
    }

    cur
}

fn conj_transpose<T: Scalar>(a: &Array2<Cplx<T>>) -> Array2<Cplx<T>> {
    let (m, n) = (a.nrows(), a.ncols());
    Array2::from_shape_fn((n, m), |(i, j)| a[(j, i)].conj())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{Mode, ModeKind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn optimizer_never_decreases_overlap_with_residual() {
        let mode = Mode::<f64>::detect(ModeKind::FSnQd, 4).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let candidate = mode.sample(0, &mut rng);

        // A residual equal to the candidate itself: overlap is already
        // maximal (trace of a projector squared = 1), so the optimizer
        // should leave the score no worse than it started.
        let residual = candidate.clone();
        let before = kernels::product(&candidate, &residual);
        let optimized = optimize(candidate, &residual, &mode, 0, &mut rng);
        let after = kernels::product(&optimized, &residual);
        assert!(after >= before - 1e-9);
    }
}
