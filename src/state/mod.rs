//! Density-matrix state and the bookkeeping (corrections log) kept around it
//! while an epoch loop runs.

mod correction;
mod density;

pub use correction::{Correction, CorrectionLog};
pub use density::{DensityMatrix, Projection, SymmetryGroup};
