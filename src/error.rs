//! Error taxonomy for the generator.
//!
//! Exhaustion is never an error here: selectors report shortfalls in their meta records.
//! Only configuration, persistence and input-shape problems end a run.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::ProblemId;

#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse TOML config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{label} not found: {path}")]
    NotFound { label: &'static str, path: PathBuf },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Row {index} failed: {reason}")]
    Row { index: usize, reason: String },

    #[error("No usable problems found after normalization")]
    EmptyCatalog,

    #[error("Missing field '{field}' in output for problemId={problem_id}")]
    InvalidRecord {
        problem_id: ProblemId,
        field: &'static str,
    },

    #[error("{0}")]
    Usage(String),
}

impl ForgeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ForgeError::Io { path: path.into(), source }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ForgeError::Json { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;
