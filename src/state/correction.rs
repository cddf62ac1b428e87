//! The correction log: the append-only record of every accepted convex-
//! combination step, persisted alongside the state matrix so a run can be
//! resumed or audited after the fact.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CssfError, Result};

/// One accepted correction: which epoch it happened in, its ordinal among
/// all accepted corrections, and the residual squared Hilbert-Schmidt norm
/// of the state right after it was applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correction {
    pub iteration_index: u64,
    pub correction_ordinal: u64,
    pub residual_squared_norm: f64,
}

impl Correction {
    pub fn as_tuple(&self) -> (u64, u64, f64) {
        (
            self.iteration_index,
            self.correction_ordinal,
            self.residual_squared_norm,
        )
    }
}

/// Serialized as a 3-element JSON array, not an object — matches the
/// reference's `corrections.json` (a list of positional `[iteration,
/// ordinal, residual^2]` triples, loaded by column index downstream).
impl Serialize for Correction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.as_tuple().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Correction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (iteration_index, correction_ordinal, residual_squared_norm) =
            <(u64, u64, f64)>::deserialize(deserializer)?;
        Ok(Correction {
            iteration_index,
            correction_ordinal,
            residual_squared_norm,
        })
    }
}

/// Append-only accumulator of [`Correction`] records, serialized as a plain
/// JSON array (mirrors the reference's corrections.json).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CorrectionLog {
    corrections: Vec<Correction>,
}

impl CorrectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, correction: Correction) {
        debug_assert!(self
            .corrections
            .last()
            .map(|last| correction.correction_ordinal > last.correction_ordinal)
            .unwrap_or(true));
        debug_assert!(self
            .corrections
            .last()
            .map(|last| correction.iteration_index >= last.iteration_index)
            .unwrap_or(true));
        self.corrections.push(correction);
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    pub fn last(&self) -> Option<&Correction> {
        self.corrections.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Correction> {
        self.corrections.iter()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|e| CssfError::io(path, e))?;
        serde_json::to_writer_pretty(file, &self.corrections).map_err(|e| CssfError::MatrixFormat {
            path: path.to_path_buf(),
            reason: format!("failed to write corrections: {e}"),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| CssfError::io(path, e))?;
        let corrections: Vec<Correction> =
            serde_json::from_reader(file).map_err(|e| CssfError::MatrixFormat {
                path: path.to_path_buf(),
                reason: format!("failed to parse corrections: {e}"),
            })?;
        Ok(Self { corrections })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let dir = std::env::temp_dir().join(format!(
            "cssfinder-correction-log-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("corrections.json");

        let mut log = CorrectionLog::new();
        log.push(Correction {
            iteration_index: 0,
            correction_ordinal: 1,
            residual_squared_norm: 0.9,
        });
        log.push(Correction {
            iteration_index: 2,
            correction_ordinal: 2,
            residual_squared_norm: 0.8,
        });
        log.save(&path).unwrap();

        let loaded = CorrectionLog::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.last().unwrap().correction_ordinal, 2);

        std::fs::remove_dir_all(&dir).ok();
    }
}
