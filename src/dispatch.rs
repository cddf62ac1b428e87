//! Precision dispatch: picks the `f32` or `f64` monomorphization of the
//! engine once, at task construction, and hides the generic parameter from
//! everything above it (the task driver, the CLI).

use std::path::Path;

use crate::engine::GilbertEngine;
use crate::error::Result;
use crate::io;
use crate::mode::{Mode, ModeKind};
use crate::precision::Precision;
use crate::state::{Projection, SymmetryGroup};

pub enum EngineDispatch {
    Single(GilbertEngine<f32>),
    Double(GilbertEngine<f64>),
}

impl EngineDispatch {
    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        precision: Precision,
        target_path: &Path,
        visibility: f64,
        mode_kind: ModeKind,
        dim_hint: Option<usize>,
        symmetry_paths: &[Vec<std::path::PathBuf>],
        symmetry_period: u64,
        projection_path: Option<&Path>,
        initial_state_path: Option<&Path>,
        seed: Option<u64>,
    ) -> Result<Self> {
        match precision {
            Precision::Single => {
                let target = io::read_matrix::<f32>(target_path)?;
                let dim = dim_hint.unwrap_or_else(|| target.nrows());
                let mode = Mode::<f32>::detect(mode_kind, dim)?;
                let symmetries = load_symmetries::<f32>(symmetry_paths)?;
                let projection = projection_path
                    .map(|p| io::read_matrix::<f32>(p))
                    .transpose()?
                    .map(|m| Projection::from_matrix(m));
                let initial = initial_state_path
                    .map(|p| io::read_matrix::<f32>(p))
                    .transpose()?;
                Ok(EngineDispatch::Single(GilbertEngine::initialize(
                    target,
                    visibility as f32,
                    mode,
                    symmetries,
                    symmetry_period,
                    projection,
                    initial,
                    seed,
                )))
            }
            Precision::Double => {
                let target = io::read_matrix::<f64>(target_path)?;
                let dim = dim_hint.unwrap_or_else(|| target.nrows());
                let mode = Mode::<f64>::detect(mode_kind, dim)?;
                let symmetries = load_symmetries::<f64>(symmetry_paths)?;
                let projection = projection_path
                    .map(|p| io::read_matrix::<f64>(p))
                    .transpose()?
                    .map(|m| Projection::from_matrix(m));
                let initial = initial_state_path
                    .map(|p| io::read_matrix::<f64>(p))
                    .transpose()?;
                Ok(EngineDispatch::Double(GilbertEngine::initialize(
                    target,
                    visibility,
                    mode,
                    symmetries,
                    symmetry_period,
                    projection,
                    initial,
                    seed,
                )))
            }
        }
    }

    pub fn run_epoch(&mut self, iterations: u64, epoch_index: u64) {
        match self {
            EngineDispatch::Single(e) => e.run_epoch(iterations, epoch_index),
            EngineDispatch::Double(e) => e.run_epoch(iterations, epoch_index),
        }
    }

    pub fn corrections_count(&self) -> usize {
        match self {
            EngineDispatch::Single(e) => e.get_corrections_count(),
            EngineDispatch::Double(e) => e.get_corrections_count(),
        }
    }

    pub fn residual_squared_norm(&self) -> f64 {
        match self {
            EngineDispatch::Single(e) => e.residual_squared_norm() as f64,
            EngineDispatch::Double(e) => e.residual_squared_norm(),
        }
    }

    pub fn save_state(&self, path: &Path) -> Result<()> {
        match self {
            EngineDispatch::Single(e) => io::write_matrix(path, &e.get_state()),
            EngineDispatch::Double(e) => io::write_matrix(path, &e.get_state()),
        }
    }

    pub fn save_corrections(&self, path: &Path) -> Result<()> {
        match self {
            EngineDispatch::Single(e) => e.get_corrections().save(path),
            EngineDispatch::Double(e) => e.get_corrections().save(path),
        }
    }
}

fn load_symmetries<T: crate::precision::Scalar>(
    paths: &[Vec<std::path::PathBuf>],
) -> Result<SymmetryGroup<T>> {
    if paths.is_empty() {
        return Ok(SymmetryGroup::trivial());
    }
    // Each inner list is one orbit, applied to the running state in sequence
    // by `SymmetryGroup::symmetrize` — kept separate, not flattened.
    let mut orbits = Vec::with_capacity(paths.len());
    for orbit in paths {
        let mut generators = Vec::with_capacity(orbit.len());
        for path in orbit {
            generators.push(io::read_matrix::<T>(path)?);
        }
        orbits.push(generators);
    }
    Ok(SymmetryGroup::new(orbits))
}
