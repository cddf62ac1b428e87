//! Error taxonomy for the solver, the config loader and the I/O layer.
//!
//! Each family maps to a distinct process exit code so a calling shell script
//! can distinguish "bad project" from "bad matrix file" from "unsupported
//! backend" without parsing log text.

use std::path::PathBuf;

use thiserror::Error;

/// Top level error type returned by every fallible public entry point.
#[derive(Debug, Error)]
pub enum CssfError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("dimension error: {0}")]
    Dimension(String),

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed matrix file {path}: {reason}")]
    MatrixFormat { path: PathBuf, reason: String },

    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    #[error("task {task} not found in project")]
    TaskNotFound { task: String },

    #[error("ambiguous task selector {selector:?}: matches {matches:?}")]
    AmbiguousSelector {
        selector: String,
        matches: Vec<String>,
    },
}

impl CssfError {
    /// Process exit code family, per the error taxonomy in the design doc.
    ///
    /// 0 is reserved for success and is never returned here.
    pub fn exit_code(&self) -> i32 {
        match self {
            CssfError::Config(_) => 10,
            CssfError::Dimension(_) => 11,
            CssfError::Io { .. } => 12,
            CssfError::MatrixFormat { .. } => 13,
            CssfError::Unsupported(_) => 14,
            CssfError::TaskNotFound { .. } => 15,
            CssfError::AmbiguousSelector { .. } => 16,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CssfError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CssfError>;
