//! Drives a single task to completion: builds the dispatcher, runs the
//! epoch loop with a progress bar, and persists state/corrections after
//! every epoch so the run is resumable from disk.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::config::GilbertCfg;
use crate::dispatch::EngineDispatch;
use crate::error::Result;

const RESIDUAL_FLOOR: f64 = 1e-7;

/// Directory layout for one task's persisted output.
pub struct TaskOutput {
    pub dir: PathBuf,
}

impl TaskOutput {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join("state.mtx")
    }

    pub fn corrections_path(&self) -> PathBuf {
        self.dir.join("corrections.json")
    }
}

/// Run `cfg` to completion (or until one of the termination conditions in
/// §5 fires), persisting state and corrections at every epoch boundary.
pub fn run_task(task_name: &str, cfg: &GilbertCfg, output: &TaskOutput) -> Result<()> {
    std::fs::create_dir_all(&output.dir)
        .map_err(|e| crate::error::CssfError::io(output.dir.as_path(), e))?;

    let resume_state = output.state_path();
    let initial_state_path: Option<&Path> = if resume_state.exists() {
        info!("task {task_name}: resuming from {}", resume_state.display());
        Some(resume_state.as_path())
    } else {
        None
    };

    let mut engine = EngineDispatch::initialize(
        cfg.backend.precision,
        &cfg.state.target,
        cfg.state.visibility,
        cfg.mode.into(),
        cfg.state.depth.zip(cfg.state.quantity).map(|(d, n)| {
            // When both are given they must already be consistent with the
            // loaded target; detection re-derives (d, n) independently as a
            // cross-check, so only the flattened dimension is threaded here.
            d.pow(n as u32)
        }),
        cfg.state
            .symmetries
            .as_deref()
            .unwrap_or(&[]),
        cfg.runtime.symmetry_period,
        cfg.state.projection.as_deref(),
        initial_state_path,
        cfg.runtime.seed,
    )?;

    let progress = ProgressBar::new(cfg.runtime.max_epochs);
    progress.set_style(
        ProgressStyle::with_template(
            "{prefix} [{bar:40.cyan/blue}] {pos}/{len} epochs ({msg})",
        )
        .unwrap()
        .progress_chars("##-"),
    );
    progress.set_prefix(task_name.to_string());

    for epoch in 0..cfg.runtime.max_epochs {
        engine.run_epoch(cfg.runtime.iterations_per_epoch, epoch);

        engine.save_state(&output.state_path())?;
        engine.save_corrections(&output.corrections_path())?;

        progress.set_message(format!(
            "{} corrections, residual^2={:.6}",
            engine.corrections_count(),
            engine.residual_squared_norm()
        ));
        progress.inc(1);

        if cfg.runtime.max_corrections >= 0
            && engine.corrections_count() as i64 >= cfg.runtime.max_corrections
        {
            info!("task {task_name}: max_corrections reached, stopping early");
            break;
        }
        if engine.residual_squared_norm() < RESIDUAL_FLOOR {
            info!("task {task_name}: residual below floor, stopping early");
            break;
        }
    }

    progress.finish_with_message("done");
    Ok(())
}
