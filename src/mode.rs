//! Unifies dimension detection, sampling and the optimizer's admissible-
//! unitary construction behind one `Mode` enum, so the engine and the task
//! driver don't need to match on mode everywhere.

use ndarray::Array2;
use rand::Rng;

use crate::error::Result;
use crate::geometry::{self, SwapMatrices3, SwapMatrices4};
use crate::kernels;
use crate::precision::{Cplx, Scalar};
use crate::sampler;

const NEAR_IDENTITY_THETA_FRACTION: f64 = 0.01;

/// Which non-entangled set the engine is searching within.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeKind {
    FSnQd,
    SBiPa,
    G3PaE3qD,
    G4PaE3qD,
}

pub struct Mode<T: Scalar> {
    kind: ModeKind,
    dim: usize,
    fsnqd: Option<(usize, usize)>,
    sbipa: Option<(usize, usize)>,
    multipartite_depth: Option<usize>,
    swaps3: Option<SwapMatrices3<T>>,
    swaps4: Option<SwapMatrices4<T>>,
}

impl<T: Scalar> Mode<T> {
    pub fn detect(kind: ModeKind, dim: usize) -> Result<Self> {
        match kind {
            ModeKind::FSnQd => {
                let dims = geometry::detect_fsnqd(dim)?;
                Ok(Self {
                    kind,
                    dim,
                    fsnqd: Some((dims.depth, dims.quantity)),
                    sbipa: None,
                    multipartite_depth: None,
                    swaps3: None,
                    swaps4: None,
                })
            }
            ModeKind::SBiPa => {
                let (d1, d2) = geometry::detect_sbipa(dim)?;
                Ok(Self {
                    kind,
                    dim,
                    fsnqd: None,
                    sbipa: Some((d1, d2)),
                    multipartite_depth: None,
                    swaps3: None,
                    swaps4: None,
                })
            }
            ModeKind::G3PaE3qD => {
                let d = geometry::detect_multipartite(dim, 3)?;
                Ok(Self {
                    kind,
                    dim,
                    fsnqd: None,
                    sbipa: None,
                    multipartite_depth: Some(d),
                    swaps3: Some(SwapMatrices3::build(d)),
                    swaps4: None,
                })
            }
            ModeKind::G4PaE3qD => {
                let d = geometry::detect_multipartite(dim, 4)?;
                Ok(Self {
                    kind,
                    dim,
                    fsnqd: None,
                    sbipa: None,
                    multipartite_depth: Some(d),
                    swaps3: None,
                    swaps4: Some(SwapMatrices4::build(d)),
                })
            }
        }
    }

    pub fn kind(&self) -> ModeKind {
        self.kind
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of bipartition variants the engine should cycle over (1 for
    /// the two non-multipartite modes, which have no variant concept).
    pub fn variant_count(&self) -> usize {
        match self.kind {
            ModeKind::FSnQd | ModeKind::SBiPa => 1,
            ModeKind::G3PaE3qD => 3,
            ModeKind::G4PaE3qD => 7,
        }
    }

    /// Default optimizer epoch budget for this mode, per the contracts
    /// inherited from the reference implementation.
    pub fn epoch_budget(&self) -> usize {
        match self.kind {
            ModeKind::FSnQd => {
                let (d, n) = self.fsnqd.unwrap();
                20 * d * d * n
            }
            ModeKind::SBiPa => {
                let (d1, d2) = self.sbipa.unwrap();
                5 * d1 * d2
            }
            ModeKind::G3PaE3qD => {
                let d = self.multipartite_depth.unwrap();
                5 * d.pow(6)
            }
            ModeKind::G4PaE3qD => {
                let d = self.multipartite_depth.unwrap();
                5 * d.pow(8)
            }
        }
    }

    pub fn sample(&self, variant: usize, rng: &mut impl Rng) -> Array2<Cplx<T>> {
        match self.kind {
            ModeKind::FSnQd => {
                let (d, n) = self.fsnqd.unwrap();
                sampler::random_d_fs(d, n, rng)
            }
            ModeKind::SBiPa => {
                let (d1, d2) = self.sbipa.unwrap();
                sampler::random_bs(d1, d2, rng)
            }
            ModeKind::G3PaE3qD => {
                let d = self.multipartite_depth.unwrap();
                sampler::random_3p(d, variant, self.swaps3.as_ref().unwrap(), rng)
            }
            ModeKind::G4PaE3qD => {
                let d = self.multipartite_depth.unwrap();
                sampler::random_4p(d, variant, self.swaps4.as_ref().unwrap(), rng)
            }
        }
    }

    /// Build the admissible near-identity unitary for hill-climb iteration
    /// `k`, embedding a small local rotation into the full `D x D` space.
    ///
    /// For the multipartite modes, `variant` selects which bipartition the
    /// current candidate was sampled for (see `sampler::random_3p`/
    /// `random_4p`): the party that is actually separable moves to a
    /// different tensor slot per variant, so the local rotation built at
    /// slot 0 is conjugated by the matching swap generator to land on that
    /// slot before being applied.
    pub fn admissible_unitary(&self, k: usize, variant: usize, rng: &mut impl Rng) -> Array2<Cplx<T>> {
        let theta = T::from_f64(NEAR_IDENTITY_THETA_FRACTION * std::f64::consts::PI).unwrap();
        match self.kind {
            ModeKind::FSnQd => {
                let (d, n) = self.fsnqd.unwrap();
                let slot = k % n;
                let local = near_identity(d, theta, rng);
                let before = d.pow(slot as u32);
                let after = d.pow((n - slot - 1) as u32);
                embed_between(&local, before, after)
            }
            ModeKind::SBiPa => {
                let (d1, d2) = self.sbipa.unwrap();
                if k % 2 == 0 {
                    let local = near_identity(d1, theta, rng);
                    embed_between(&local, 1, d2)
                } else {
                    let local = near_identity(d2, theta, rng);
                    embed_between(&local, d1, 1)
                }
            }
            ModeKind::G3PaE3qD => {
                let d = self.multipartite_depth.unwrap();
                let local = near_identity(d, theta, rng);
                let at_slot0 = embed_between(&local, 1, d * d);
                let swap = self.swaps3.as_ref().unwrap().for_variant(variant);
                kernels::rotate(&at_slot0, &swap)
            }
            ModeKind::G4PaE3qD => {
                let d = self.multipartite_depth.unwrap();
                let local = near_identity(d, theta, rng);
                let at_slot0 = embed_between(&local, 1, d * d * d);
                let swap = self.swaps4.as_ref().unwrap().for_variant(variant);
                kernels::rotate(&at_slot0, &swap)
            }
        }
    }
}

/// `I + (e^{i*theta} - 1) * |phi><phi|` for a freshly Haar-sampled `phi`.
fn near_identity<T: Scalar>(d: usize, theta: T, rng: &mut impl Rng) -> Array2<Cplx<T>> {
    let phi = kernels::normalize(&kernels::haar_vector::<T>(d, rng));
    let projector = kernels::project(&phi);
    let phase = Cplx::new(theta.cos(), theta.sin()) - Cplx::new(T::one(), T::zero());
    let mut unitary = kernels::identity::<T>(d);
    unitary
        .iter_mut()
        .zip(projector.iter())
        .for_each(|(u, p)| *u += phase * *p);
    unitary
}

fn embed_between<T: Scalar>(
    local: &Array2<Cplx<T>>,
    before_dim: usize,
    after_dim: usize,
) -> Array2<Cplx<T>> {
    let before = kernels::identity::<T>(before_dim);
    let after = kernels::identity::<T>(after_dim);
    kernels::kronecker(&kernels::kronecker(&before, local), &after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn fsnqd_mode_detects_five_qubits_and_matching_budget() {
        let mode = Mode::<f64>::detect(ModeKind::FSnQd, 32).unwrap();
        assert_eq!(mode.fsnqd, Some((2, 5)));
        assert_eq!(mode.epoch_budget(), 20 * 2 * 2 * 5);
    }

    #[test]
    fn admissible_unitary_is_unitary() {
        let mode = Mode::<f64>::detect(ModeKind::FSnQd, 8).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let u = mode.admissible_unitary(0, 0, &mut rng);
        let u_dagger = Array2::from_shape_fn((8, 8), |(i, j)| u[(j, i)].conj());
        let product = kernels::matmul(&u, &u_dagger);
        let id = kernels::identity::<f64>(8);
        for i in 0..8 {
            for j in 0..8 {
                assert_abs_diff_eq!(product[(i, j)].re, id[(i, j)].re, epsilon = 1e-9);
                assert_abs_diff_eq!(product[(i, j)].im, id[(i, j)].im, epsilon = 1e-9);
            }
        }
    }
}
