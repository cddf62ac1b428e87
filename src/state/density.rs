//! The working state carried between epochs: the current density matrix plus
//! the optional symmetrization/projection that gets re-applied to it.

use ndarray::Array2;

use crate::error::{CssfError, Result};
use crate::kernels;
use crate::precision::{Cplx, Scalar};

/// A trace-1 Hermitian positive-semidefinite matrix. The struct itself does
/// not enforce positivity (too expensive to check every epoch); callers are
/// expected to seed it from [`kernels::project`] or from a validated file.
#[derive(Clone, Debug)]
pub struct DensityMatrix<T: Scalar> {
    matrix: Array2<Cplx<T>>,
}

impl<T: Scalar> DensityMatrix<T> {
    pub fn from_matrix(matrix: Array2<Cplx<T>>) -> Result<Self> {
        let d = matrix.nrows();
        if matrix.ncols() != d {
            return Err(CssfError::Dimension(format!(
                "density matrix must be square, got {}x{}",
                d,
                matrix.ncols()
            )));
        }
        Ok(Self { matrix })
    }

    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn as_array(&self) -> &Array2<Cplx<T>> {
        &self.matrix
    }

    pub fn into_array(self) -> Array2<Cplx<T>> {
        self.matrix
    }

    /// tr(self . other), i.e. [`kernels::product`] on the underlying arrays.
    pub fn product(&self, other: &DensityMatrix<T>) -> T {
        kernels::product(&self.matrix, &other.matrix)
    }

    /// In-place convex update `self = (1-c)*self + c*other`, the Gilbert
    /// convex-combination step shared by every mode.
    pub fn combine_with(&mut self, other: &Array2<Cplx<T>>, c: T) {
        let one_minus_c = T::one() - c;
        self.matrix
            .iter_mut()
            .zip(other.iter())
            .for_each(|(self_entry, other_entry)| {
                *self_entry = *self_entry * Cplx::new(one_minus_c, T::zero())
                    + *other_entry * Cplx::new(c, T::zero());
            });
    }

    pub fn max_abs_imbalance(&self) -> T {
        let mut worst = T::zero();
        let d = self.matrix.nrows();
        for i in 0..d {
            for j in 0..d {
                let diff = self.matrix[(i, j)] - self.matrix[(j, i)].conj();
                let mag = (diff.re * diff.re + diff.im * diff.im).sqrt();
                if mag > worst {
                    worst = mag;
                }
            }
        }
        worst
    }
}

/// A collection of symmetry orbits the state gets symmetrized against, one
/// orbit at a time: for each orbit, `rho <- rho + sum_{U in orbit}
/// rotate(rho, U)`, then renormalized to trace 1, with the next orbit's
/// update applied to that result in turn. Used by modes where the target is
/// known to be invariant under one or more finite symmetry groups (e.g.
/// particle exchange within a bipartition).
pub struct SymmetryGroup<T: Scalar> {
    orbits: Vec<Vec<Array2<Cplx<T>>>>,
}

impl<T: Scalar> SymmetryGroup<T> {
    pub fn new(orbits: Vec<Vec<Array2<Cplx<T>>>>) -> Self {
        Self { orbits }
    }

    pub fn trivial() -> Self {
        Self { orbits: Vec::new() }
    }

    pub fn is_trivial(&self) -> bool {
        self.orbits.iter().all(|orbit| orbit.is_empty())
    }

    pub fn symmetrize(&self, rho: &Array2<Cplx<T>>) -> Array2<Cplx<T>> {
        let mut current = rho.clone();
        for orbit in &self.orbits {
            if orbit.is_empty() {
                continue;
            }
            let mut acc = current.clone();
            for generator in orbit {
                acc = acc + kernels::rotate(&current, generator);
            }
            current = normalize_by_trace(acc);
        }
        current
    }
}

fn normalize_by_trace<T: Scalar>(m: Array2<Cplx<T>>) -> Array2<Cplx<T>> {
    let d = m.nrows();
    let trace: T = (0..d).map(|i| m[(i, i)].re).sum();
    if trace == T::zero() {
        return m;
    }
    m.mapv(|c| c / Cplx::new(trace, T::zero()))
}

/// A rank-1 projector built from a Haar-sampled vector, used to produce the
/// `G_n` candidate matrix at each correction attempt.
pub struct Projection<T: Scalar> {
    projector: Array2<Cplx<T>>,
}

impl<T: Scalar> Projection<T> {
    pub fn from_vector(v: &ndarray::Array1<Cplx<T>>) -> Self {
        Self {
            projector: kernels::project(&kernels::normalize(v)),
        }
    }

    /// Wrap an already-built projection/unitary matrix loaded from a file.
    pub fn from_matrix(projector: Array2<Cplx<T>>) -> Self {
        Self { projector }
    }

    pub fn as_matrix(&self) -> &Array2<Cplx<T>> {
        &self.projector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn diag(values: &[f64]) -> Array2<Cplx<f64>> {
        let d = values.len();
        Array2::from_shape_fn((d, d), |(i, j)| {
            if i == j {
                Cplx::new(values[i], 0.0)
            } else {
                Cplx::new(0.0, 0.0)
            }
        })
    }

    #[test]
    fn combine_with_is_a_convex_interpolation() {
        let mut state = DensityMatrix::from_matrix(diag(&[1.0, 0.0])).unwrap();
        let other = diag(&[0.0, 1.0]);
        state.combine_with(&other, 0.25);
        assert_abs_diff_eq!(state.as_array()[(0, 0)].re, 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(state.as_array()[(1, 1)].re, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn trivial_symmetry_group_is_identity() {
        let rho = diag(&[0.3, 0.7]);
        let group: SymmetryGroup<f64> = SymmetryGroup::trivial();
        let symmetrized = group.symmetrize(&rho);
        assert_abs_diff_eq!(symmetrized[(0, 0)].re, 0.3, epsilon = 1e-12);
    }
}
