//! Static, explicit project/task configuration, parsed from JSON with
//! boundary validation instead of a reflection-based validator.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CssfError, Result};
use crate::mode::ModeKind;
use crate::precision::Precision;

/// A project file: a named collection of tasks, persisted at the project
/// root and edited via the CLI's `task add` subcommand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Project-level default worker-pool sizing, used when `run` isn't
    /// given an explicit `--max-parallel`.
    #[serde(default)]
    pub resources: Resources,
}

impl Project {
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CssfError::io(path, e))?;
        let project: Project = serde_json::from_str(&text)
            .map_err(|e| CssfError::Config(format!("malformed project file {}: {e}", path.display())))?;
        for task in &project.tasks {
            task.validate()?;
        }
        Ok(project)
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|e| CssfError::io(path, e))?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| CssfError::Config(format!("failed to write project file: {e}")))
    }

    /// Resolve a `--match` selector to exactly one task, erroring on zero or
    /// more than one match (the CLI's "ambiguous selector" exit code).
    pub fn select(&self, selector: &str) -> Result<&Task> {
        let matches: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.name == selector || t.name.contains(selector))
            .collect();
        match matches.as_slice() {
            [] => Err(CssfError::TaskNotFound {
                task: selector.to_string(),
            }),
            [single] => Ok(single),
            many => Err(CssfError::AmbiguousSelector {
                selector: selector.to_string(),
                matches: many.iter().map(|t| t.name.clone()).collect(),
            }),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub gilbert: GilbertCfg,
}

impl Task {
    pub fn validate(&self) -> Result<()> {
        self.gilbert.validate()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GilbertCfg {
    pub mode: AlgoMode,
    #[serde(default)]
    pub backend: BackendCfg,
    pub state: StateCfg,
    #[serde(default)]
    pub runtime: RuntimeCfg,
}

impl GilbertCfg {
    pub fn validate(&self) -> Result<()> {
        self.state.validate()?;
        self.runtime.validate()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlgoMode {
    #[serde(rename = "FSnQd")]
    FSnQd,
    #[serde(rename = "SBiPa")]
    SBiPa,
    #[serde(rename = "G3PaE3qD")]
    G3PaE3qD,
    #[serde(rename = "G4PaE3qD")]
    G4PaE3qD,
}

impl From<AlgoMode> for ModeKind {
    fn from(mode: AlgoMode) -> Self {
        match mode {
            AlgoMode::FSnQd => ModeKind::FSnQd,
            AlgoMode::SBiPa => ModeKind::SBiPa,
            AlgoMode::G3PaE3qD => ModeKind::G3PaE3qD,
            AlgoMode::G4PaE3qD => ModeKind::G4PaE3qD,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendCfg {
    #[serde(default)]
    pub precision: Precision,
}

impl Default for BackendCfg {
    fn default() -> Self {
        Self {
            precision: Precision::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateCfg {
    pub target: PathBuf,
    #[serde(default)]
    pub depth: Option<usize>,
    #[serde(default)]
    pub quantity: Option<usize>,
    pub visibility: f64,
    #[serde(default)]
    pub symmetries: Option<Vec<Vec<PathBuf>>>,
    #[serde(default)]
    pub projection: Option<PathBuf>,
}

impl StateCfg {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.visibility) {
            return Err(CssfError::Config(format!(
                "visibility must be within [0, 1], got {}",
                self.visibility
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuntimeCfg {
    #[serde(default = "default_max_epochs")]
    pub max_epochs: u64,
    #[serde(default = "default_iterations_per_epoch")]
    pub iterations_per_epoch: u64,
    #[serde(default = "default_max_corrections")]
    pub max_corrections: i64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_symmetry_period")]
    pub symmetry_period: u64,
}

fn default_max_epochs() -> u64 {
    100
}

fn default_iterations_per_epoch() -> u64 {
    100
}

fn default_max_corrections() -> i64 {
    -1
}

fn default_symmetry_period() -> u64 {
    crate::engine::DEFAULT_SYMMETRY_PERIOD
}

impl Default for RuntimeCfg {
    fn default() -> Self {
        Self {
            max_epochs: default_max_epochs(),
            iterations_per_epoch: default_iterations_per_epoch(),
            max_corrections: default_max_corrections(),
            seed: None,
            symmetry_period: default_symmetry_period(),
        }
    }
}

impl RuntimeCfg {
    fn validate(&self) -> Result<()> {
        if self.max_epochs < 1 {
            return Err(CssfError::Config("max_epochs must be >= 1".to_string()));
        }
        if self.iterations_per_epoch < 1 {
            return Err(CssfError::Config(
                "iterations_per_epoch must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Worker-pool sizing for running multiple tasks concurrently.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Resources {
    pub max_parallel: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_visibility() {
        let cfg = StateCfg {
            target: PathBuf::from("rho.mtx"),
            depth: None,
            quantity: None,
            visibility: 1.5,
            symmetries: None,
            projection: None,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_epoch_budget() {
        let cfg = RuntimeCfg {
            max_epochs: 0,
            ..RuntimeCfg::default()
        };
        assert!(cfg.validate().is_err());
    }
}
