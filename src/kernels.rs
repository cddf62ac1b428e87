//! Primitive, stateless matrix operations shared by every mode.
//!
//! Everything here is pure and precision-generic over [`Scalar`]. Matrices
//! are stored densely as `Array2<Complex<T>>`; dimensions involved in this
//! solver (single to low hundreds) do not justify a BLAS dependency, so
//! products are hand-rolled loops in the style of a scratch-buffer numeric
//! kernel rather than calls into an external linear algebra backend.

use ndarray::{Array1, Array2};
use rand::Rng;

use crate::precision::{Cplx, Scalar};

/// trace(A . B), returned as its real part. For Hermitian A, B the imaginary
/// part is zero up to floating error, so discarding it is safe and matches
/// the reference's contract.
pub fn product<T: Scalar>(a: &Array2<Cplx<T>>, b: &Array2<Cplx<T>>) -> T {
    let d = a.nrows();
    debug_assert_eq!(a.ncols(), d);
    debug_assert_eq!(b.nrows(), d);
    debug_assert_eq!(b.ncols(), d);

    let mut acc = Cplx::new(T::zero(), T::zero());
    for i in 0..d {
        for j in 0..d {
            acc += a[(i, j)] * b[(j, i)];
        }
    }
    acc.re
}

/// Dense matrix product, used internally by [`rotate`] and tests. Not part of
/// the public kernel contract (the spec only names product/kronecker/rotate/
/// project as primitives), but factored out to avoid repeating the loop.
pub fn matmul<T: Scalar>(a: &Array2<Cplx<T>>, b: &Array2<Cplx<T>>) -> Array2<Cplx<T>> {
    let (m, k) = (a.nrows(), a.ncols());
    let n = b.ncols();
    debug_assert_eq!(b.nrows(), k);

    let mut out = Array2::from_elem((m, n), Cplx::new(T::zero(), T::zero()));
    for i in 0..m {
        for p in 0..k {
            let aip = a[(i, p)];
            if aip == Cplx::new(T::zero(), T::zero()) {
                continue;
            }
            for j in 0..n {
                out[(i, j)] += aip * b[(p, j)];
            }
        }
    }
    out
}

fn conj_transpose<T: Scalar>(a: &Array2<Cplx<T>>) -> Array2<Cplx<T>> {
    let (m, n) = (a.nrows(), a.ncols());
    Array2::from_shape_fn((n, m), |(i, j)| a[(j, i)].conj())
}

/// U . rho . U-dagger, in exactly that order.
pub fn rotate<T: Scalar>(rho: &Array2<Cplx<T>>, unitary: &Array2<Cplx<T>>) -> Array2<Cplx<T>> {
    let u_dagger = conj_transpose(unitary);
    matmul(&matmul(unitary, rho), &u_dagger)
}

/// Kronecker (tensor) product. Output has shape (rows(a)*rows(b), cols(a)*cols(b)).
pub fn kronecker<T: Scalar>(a: &Array2<Cplx<T>>, b: &Array2<Cplx<T>>) -> Array2<Cplx<T>> {
    let (ar, ac) = (a.nrows(), a.ncols());
    let (br, bc) = (b.nrows(), b.ncols());
    Array2::from_shape_fn((ar * br, ac * bc), |(i, j)| {
        let (ai, bi) = (i / br, i % br);
        let (aj, bj) = (j / bc, j % bc);
        a[(ai, aj)] * b[(bi, bj)]
    })
}

/// Kronecker (tensor) product of two column vectors, returned flattened.
pub fn kronecker_vec<T: Scalar>(a: &Array1<Cplx<T>>, b: &Array1<Cplx<T>>) -> Array1<Cplx<T>> {
    let (na, nb) = (a.len(), b.len());
    Array1::from_shape_fn(na * nb, |i| {
        let (ai, bi) = (i / nb, i % nb);
        a[ai] * b[bi]
    })
}

/// Outer product v . v-dagger: builds a rank-1 projector from a vector.
pub fn project<T: Scalar>(v: &Array1<Cplx<T>>) -> Array2<Cplx<T>> {
    let d = v.len();
    Array2::from_shape_fn((d, d), |(i, j)| v[i] * v[j].conj())
}

/// v / sqrt(<v, v>).
pub fn normalize<T: Scalar>(v: &Array1<Cplx<T>>) -> Array1<Cplx<T>> {
    let norm_sq: T = v.iter().map(|c| c.re * c.re + c.im * c.im).sum();
    let norm = norm_sq.sqrt();
    v.mapv(|c| c / Cplx::new(norm, T::zero()))
}

pub fn identity<T: Scalar>(d: usize) -> Array2<Cplx<T>> {
    Array2::from_shape_fn((d, d), |(i, j)| {
        if i == j {
            Cplx::new(T::one(), T::zero())
        } else {
            Cplx::new(T::zero(), T::zero())
        }
    })
}

/// Draw a uniform real number on the open interval (0, 1), resampling on the
/// (measure-zero, but floating-point-reachable) boundary so `ln` never sees 0.
fn open_unit<T: Scalar>(rng: &mut impl Rng) -> T {
    loop {
        let u: f64 = rng.random();
        if u > 0.0 {
            return T::from_f64(u).unwrap();
        }
    }
}

/// Sample a single complex vector component whose direction is Haar-uniform:
/// draw (u1, u2) uniformly on (0,1)^2 and set
/// `component = exp(2*pi*i*u1) * sqrt(-ln(u2))`. This is the Box-Muller-style
/// transform producing a standard complex normal; normalizing the result
/// gives a Haar-uniform unit vector.
pub fn haar_vector<T: Scalar>(d: usize, rng: &mut impl Rng) -> Array1<Cplx<T>> {
    let two_pi = T::from_f64(std::f64::consts::TAU).unwrap();
    Array1::from_shape_fn(d, |_| {
        let u1 = open_unit::<T>(rng);
        let u2 = open_unit::<T>(rng);
        let angle = two_pi * u1;
        let radius = (-u2.ln()).sqrt();
        Cplx::new(angle.cos() * radius, angle.sin() * radius)
    })
}

/// Build the D x D permutation operator over `n_parties` subsystems of equal
/// depth `d` (D = d^n_parties) that sends basis state `|i_0 ... i_{n-1}>` to
/// `|i_{perm[0]} ... i_{perm[n-1]}>`. This realizes the "swap matrices" used
/// to rotate one bipartition/variant of a multipartite mode into another.
pub fn permutation_operator<T: Scalar>(d: usize, perm: &[usize]) -> Array2<Cplx<T>> {
    let n = perm.len();
    let total: usize = d.pow(n as u32);

    let to_digits = |mut idx: usize| -> Vec<usize> {
        let mut digits = vec![0usize; n];
        for slot in digits.iter_mut().rev() {
            *slot = idx % d;
            idx /= d;
        }
        digits
    };
    let from_digits = |digits: &[usize]| -> usize {
        digits.iter().fold(0usize, |acc, &dig| acc * d + dig)
    };

    let mut out = Array2::from_elem((total, total), Cplx::new(T::zero(), T::zero()));
    for row in 0..total {
        let digits = to_digits(row);
        let permuted: Vec<usize> = (0..n).map(|p| digits[perm[p]]).collect();
        let col = from_digits(&permuted);
        out[(row, col)] = Cplx::new(T::one(), T::zero());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn herm2(a: f64, b: Cplx<f64>, d: f64) -> Array2<Cplx<f64>> {
        Array2::from_shape_vec((2, 2), vec![Cplx::new(a, 0.0), b, b.conj(), Cplx::new(d, 0.0)])
            .unwrap()
    }

    #[test]
    fn product_is_symmetric_for_hermitian_matrices() {
        let a = herm2(1.0, Cplx::new(0.3, 0.2), 2.0);
        let b = herm2(0.5, Cplx::new(-0.1, 0.4), 1.5);
        assert_abs_diff_eq!(product(&a, &b), product(&b, &a), epsilon = 1e-12);
    }

    #[test]
    fn rotate_preserves_trace_and_hermiticity() {
        let rho = herm2(0.6, Cplx::new(0.1, -0.2), 0.4);
        // A concrete unitary: a real rotation by angle theta.
        let theta = 0.37_f64;
        let u = Array2::from_shape_vec(
            (2, 2),
            vec![
                Cplx::new(theta.cos(), 0.0),
                Cplx::new(-theta.sin(), 0.0),
                Cplx::new(theta.sin(), 0.0),
                Cplx::new(theta.cos(), 0.0),
            ],
        )
        .unwrap();

        let rotated = rotate(&rho, &u);
        let trace = rotated[(0, 0)].re + rotated[(1, 1)].re;
        assert_abs_diff_eq!(trace, 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(rotated[(0, 1)].re, rotated[(1, 0)].re, epsilon = 1e-10);
        assert_abs_diff_eq!(rotated[(0, 1)].im, -rotated[(1, 0)].im, epsilon = 1e-10);
    }

    #[test]
    fn kronecker_of_identities_is_identity() {
        let i2 = identity::<f64>(2);
        let i3 = identity::<f64>(3);
        let product = kronecker(&i2, &i3);
        let expected = identity::<f64>(6);
        for i in 0..6 {
            for j in 0..6 {
                assert_abs_diff_eq!(product[(i, j)].re, expected[(i, j)].re, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn project_trace_equals_norm_squared() {
        let v = Array1::from_vec(vec![Cplx::new(1.0, 1.0), Cplx::new(0.0, 2.0)]);
        let norm_sq: f64 = v.iter().map(|c| c.re * c.re + c.im * c.im).sum();
        let p = project(&v);
        let trace = p[(0, 0)].re + p[(1, 1)].re;
        assert_abs_diff_eq!(trace, norm_sq, epsilon = 1e-12);
    }

    #[test]
    fn permutation_operator_on_three_parties_cycles() {
        let d = 2usize;
        let perm = [1, 2, 0];
        let p = permutation_operator::<f64>(d, &perm);
        // Applying the cycle three times returns the identity.
        let p2 = matmul(&p, &p);
        let p3 = matmul(&p2, &p);
        let id = identity::<f64>(8);
        for i in 0..8 {
            for j in 0..8 {
                assert_abs_diff_eq!(p3[(i, j)].re, id[(i, j)].re, epsilon = 1e-12);
            }
        }
    }
}
