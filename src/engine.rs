//! The Gilbert convex-combination engine: owns the noisy target, the current
//! approximant, the residual, cached inner products, and the correction log.

use ndarray::Array2;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::kernels;
use crate::mode::Mode;
use crate::optimizer;
use crate::precision::{Cplx, Scalar};
use crate::state::{Correction, CorrectionLog, DensityMatrix, Projection, SymmetryGroup};

/// How often (in accepted corrections) the configured symmetry group is
/// re-applied to the running approximant. The reference disagrees with
/// itself between copies (every-50 vs always-on-accept); every-50 is the
/// main-text default here, exposed so a caller can pick 1 for the other
/// behavior.
pub const DEFAULT_SYMMETRY_PERIOD: u64 = 50;

pub struct GilbertEngine<T: Scalar> {
    mode: Mode<T>,
    target_visible: Array2<Cplx<T>>,
    state: DensityMatrix<T>,
    residual: Array2<Cplx<T>>,
    aa4: T,
    aa6: T,
    dd1: T,
    symmetries: SymmetryGroup<T>,
    symmetry_period: u64,
    projection: Option<Projection<T>>,
    corrections: CorrectionLog,
    /// Base seed combined with the epoch index to derive each epoch's RNG
    /// (see [`epoch_rng`]). Keeping randomness a pure function of
    /// `(seed, epoch_index)`, rather than carrying RNG state across calls,
    /// is what makes resuming a flushed run bit-reproducible: a fresh
    /// engine re-entering at epoch N+1 draws exactly the candidates a
    /// contiguous run would have drawn for that epoch.
    seed: u64,
}

impl<T: Scalar> GilbertEngine<T> {
    /// Build `rho_v = v*rho + (1-v)/D * I`, seed `rho_1` as the diagonal of
    /// `rho_v` (or a persisted approximant if `initial_state` is given),
    /// cache the scalar products, and apply the initial symmetry/projection.
    pub fn initialize(
        target: Array2<Cplx<T>>,
        visibility: T,
        mode: Mode<T>,
        symmetries: SymmetryGroup<T>,
        symmetry_period: u64,
        projection: Option<Projection<T>>,
        initial_state: Option<Array2<Cplx<T>>>,
        seed: Option<u64>,
    ) -> Self {
        let d = target.nrows();
        let inv_d = T::one() / T::from_usize(d).unwrap();
        let identity = kernels::identity::<T>(d);
        let one_minus_v = T::one() - visibility;

        let target_visible = Array2::from_shape_fn((d, d), |(i, j)| {
            target[(i, j)] * Cplx::new(visibility, T::zero())
                + identity[(i, j)] * Cplx::new(one_minus_v * inv_d, T::zero())
        });

        let initial = initial_state.unwrap_or_else(|| {
            Array2::from_shape_fn((d, d), |(i, j)| {
                if i == j {
                    target_visible[(i, j)]
                } else {
                    Cplx::new(T::zero(), T::zero())
                }
            })
        });

        let mut state = DensityMatrix::from_matrix(initial).expect("square by construction");

        if !symmetries.is_trivial() {
            let symmetrized = symmetries.symmetrize(state.as_array());
            state = DensityMatrix::from_matrix(symmetrized).expect("square by construction");
        }
        if let Some(p) = &projection {
            let rotated = kernels::rotate(state.as_array(), p.as_matrix());
            let mut rotated = DensityMatrix::from_matrix(rotated).expect("square by construction");
            renormalize(&mut rotated);
            state = rotated;
        }

        let residual = target_visible.clone() - state.as_array();
        let aa4 = T::from_f64(2.0).unwrap() * kernels::product(&target_visible, state.as_array());
        let aa6 = kernels::product(state.as_array(), state.as_array());
        let dd1 = kernels::product(state.as_array(), &residual);

        let seed = seed.unwrap_or_else(|| ChaCha8Rng::from_os_rng().next_u64());

        Self {
            mode,
            target_visible,
            state,
            residual,
            aa4,
            aa6,
            dd1,
            symmetries,
            symmetry_period,
            projection,
            corrections: CorrectionLog::new(),
            seed,
        }
    }

    /// Run `iterations` candidate-draw/accept-or-reject cycles without
    /// checking any stopping condition.
    pub fn run_epoch(&mut self, iterations: u64, epoch_index: u64) {
        let mut rng = epoch_rng(self.seed, epoch_index);
        let variant_count = self.mode.variant_count() as u64;
        for k in 0..iterations {
            let variant = if variant_count > 1 {
                ((epoch_index * iterations + k) % variant_count) as usize
            } else {
                0
            };

            let candidate = self.mode.sample(variant, &mut rng);
            let overlap = kernels::product(&candidate, &self.residual);
            if overlap <= self.dd1 {
                continue;
            }

            let candidate =
                optimizer::optimize(candidate, &self.residual, &self.mode, variant, &mut rng);

            let aa3 = kernels::product(&candidate, &candidate);
            let aa2 = T::from_f64(2.0).unwrap() * kernels::product(&self.target_visible, &candidate);
            let aa5 = T::from_f64(2.0).unwrap() * kernels::product(self.state.as_array(), &candidate);
            let bb2 = -self.aa4 + aa2 + aa5 - T::from_f64(2.0).unwrap() * aa3;
            let bb3 = self.aa6 - aa5 + aa3;
            let c = -bb2 / (T::from_f64(2.0).unwrap() * bb3);

            if c < T::zero() || c > T::one() {
                continue;
            }

            self.state.combine_with(&candidate, T::one() - c);
            self.maybe_resymmetrize();
            self.maybe_reproject();
            self.refresh_caches();

            let correction_ordinal = self.corrections.len() as u64 + 1;
            let residual_squared_norm = kernels::product(&self.residual, &self.residual);
            self.corrections.push(Correction {
                iteration_index: epoch_index * iterations + k + 1,
                correction_ordinal,
                residual_squared_norm: residual_squared_norm.to_f64().unwrap(),
            });
        }
    }

    fn maybe_resymmetrize(&mut self) {
        if self.symmetries.is_trivial() {
            return;
        }
        // `corrections.len()` is the count *before* this correction is
        // pushed (the push happens further down, after this call), so this
        // matches spec's "correction_count mod period == 0" checked ahead of
        // the ordinal increment — including reapplying on the very first
        // accepted correction.
        let accepted = self.corrections.len() as u64;
        if accepted % self.symmetry_period == 0 {
            let symmetrized = self.symmetries.symmetrize(self.state.as_array());
            self.state = DensityMatrix::from_matrix(symmetrized).expect("square by construction");
        }
    }

    fn maybe_reproject(&mut self) {
        if let Some(p) = &self.projection {
            let rotated = kernels::rotate(self.state.as_array(), p.as_matrix());
            let mut rotated = DensityMatrix::from_matrix(rotated).expect("square by construction");
            renormalize(&mut rotated);
            self.state = rotated;
        }
    }

    fn refresh_caches(&mut self) {
        self.residual = &self.target_visible - self.state.as_array();
        self.aa4 = T::from_f64(2.0).unwrap() * kernels::product(&self.target_visible, self.state.as_array());
        self.aa6 = kernels::product(self.state.as_array(), self.state.as_array());
        self.dd1 = self.aa4 / T::from_f64(2.0).unwrap() - self.aa6;
    }

    /// Run up to `max_epochs` epochs of `iterations_per_epoch` iterations
    /// each, invoking `on_epoch_end` after every epoch so the caller can
    /// persist state/corrections and inspect termination. Stops early once
    /// `max_corrections` is reached (a negative value disables the cap) or
    /// once the residual norm drops below `1e-7`.
    pub fn run(
        &mut self,
        max_epochs: u64,
        iterations_per_epoch: u64,
        max_corrections: i64,
        mut on_epoch_end: impl FnMut(&Self, u64),
    ) {
        let residual_floor = T::from_f64(1e-7).unwrap();
        for epoch in 0..max_epochs {
            self.run_epoch(iterations_per_epoch, epoch);
            on_epoch_end(self, epoch);

            if max_corrections >= 0 && self.corrections.len() as i64 >= max_corrections {
                break;
            }
            let residual_norm = kernels::product(&self.residual, &self.residual);
            if residual_norm < residual_floor {
                break;
            }
        }
    }

    pub fn get_state(&self) -> Array2<Cplx<T>> {
        self.state.as_array().clone()
    }

    pub fn get_corrections(&self) -> &CorrectionLog {
        &self.corrections
    }

    pub fn get_corrections_count(&self) -> usize {
        self.corrections.len()
    }

    pub fn residual_squared_norm(&self) -> T {
        kernels::product(&self.residual, &self.residual)
    }
}

/// Derives one epoch's RNG from the engine's base seed via a fixed-point
/// multiplicative hash (the 64-bit golden-ratio constant), so distinct
/// epochs get decorrelated streams without needing to persist RNG state.
fn epoch_rng(seed: u64, epoch_index: u64) -> ChaCha8Rng {
    const GOLDEN_RATIO_64: u64 = 0x9E3779B97F4A7C15;
    ChaCha8Rng::seed_from_u64(seed ^ epoch_index.wrapping_mul(GOLDEN_RATIO_64))
}

fn renormalize<T: Scalar>(state: &mut DensityMatrix<T>) {
    let trace: T = (0..state.dim()).map(|i| state.as_array()[(i, i)].re).sum();
    if trace == T::zero() {
        return;
    }
    let rescaled = state.as_array().mapv(|c| c / Cplx::new(trace, T::zero()));
    *state = DensityMatrix::from_matrix(rescaled).expect("square by construction");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ModeKind;
    use approx::assert_abs_diff_eq;

    fn haar_random_density(d: usize, seed: u64) -> Array2<Cplx<f64>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let v = kernels::normalize(&kernels::haar_vector::<f64>(d, &mut rng));
        kernels::project(&v)
    }

    #[test]
    fn gilbert_coefficient_near_one_when_residual_is_near_zero() {
        let target = haar_random_density(4, 1);
        let mode = Mode::<f64>::detect(ModeKind::FSnQd, 4).unwrap();
        let mut engine = GilbertEngine::initialize(
            target.clone(),
            1.0,
            mode,
            SymmetryGroup::trivial(),
            DEFAULT_SYMMETRY_PERIOD,
            None,
            Some(target),
            Some(99),
        );
        let before = engine.residual_squared_norm();
        engine.run_epoch(50, 0);
        let after = engine.residual_squared_norm();
        assert!(after <= before + 1e-9);
    }

    #[test]
    fn residual_is_monotone_non_increasing_across_epochs() {
        let target = haar_random_density(4, 2);
        let mode = Mode::<f64>::detect(ModeKind::FSnQd, 4).unwrap();
        let mut engine = GilbertEngine::initialize(
            target,
            0.5,
            mode,
            SymmetryGroup::trivial(),
            DEFAULT_SYMMETRY_PERIOD,
            None,
            None,
            Some(7),
        );

        let mut last = engine.residual_squared_norm();
        for epoch in 0..5u64 {
            engine.run_epoch(30, epoch);
            let current = engine.residual_squared_norm();
            assert!(current <= last + 1e-9);
            last = current;
        }
        // Trace stays 1 within tolerance after every epoch.
        let state = engine.get_state();
        let trace: f64 = (0..4).map(|i| state[(i, i)].re).sum();
        assert_abs_diff_eq!(trace, 1.0, epsilon = 1e-8);
    }
}
