//! Numeric precision plumbing.
//!
//! The solver is monomorphized over [`Scalar`] instead of carrying two
//! hand-duplicated kernel modules (one per float width). A task still picks
//! exactly one concrete width at construction time via [`Precision`]; nothing
//! downstream mixes `f32` and `f64` data.

use num_complex::Complex;
use num_traits::{Float, FloatConst, FromPrimitive, NumAssign, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::iter::Sum;

/// Bound satisfied by exactly `f32` and `f64`. Pulled together once so every
/// generic kernel/engine signature reads `T: Scalar` instead of repeating the
/// trait soup.
pub trait Scalar:
    Float
    + FloatConst
    + NumAssign
    + FromPrimitive
    + ToPrimitive
    + Sum
    + Send
    + Sync
    + std::fmt::Debug
    + 'static
{
    /// Tolerance used by invariant checks (Hermiticity, trace) at this width.
    const INVARIANT_EPSILON: Self;
}

impl Scalar for f32 {
    const INVARIANT_EPSILON: Self = 1e-5;
}

impl Scalar for f64 {
    const INVARIANT_EPSILON: Self = 1e-10;
}

pub type Cplx<T> = Complex<T>;

/// Precision selector from task configuration. Chooses which monomorphized
/// engine instantiation (`f32` or `f64`) services a task; selected once, never
/// changed mid-run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Single,
    Double,
}

impl Default for Precision {
    fn default() -> Self {
        Precision::Double
    }
}
