//! Error types for the simulation core.
//!
//! Every fallible core operation returns `SimError`. Nothing in the core
//! aborts the process or substitutes a default for a failed computation.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    /// Bad initial parameters; the simulation is not started
    #[error("invalid configuration: `{field}` {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// A step produced a non-finite component; the pre-step state is kept
    #[error("simulation diverged at step {step} (t = {time}): body {body} became non-finite")]
    SimulationDiverged { step: u64, time: f64, body: usize },

    /// Snapshot written by an unknown format version
    #[error("snapshot format version {found} is not supported (expected {supported})")]
    FormatVersionUnsupported { found: u64, supported: u64 },

    /// Truncated or structurally invalid snapshot
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Save or load could not touch storage
    #[error("storage I/O failure on {}: {source}", path.display())]
    StorageIOFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Controller command not accepted in the current run mode
    #[error("command `{command}` is not valid while {mode}")]
    InvalidCommand { command: &'static str, mode: String },
}

impl SimError {
    /// Creates a configuration error naming the offending field.
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a corrupt-snapshot error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        SimError::CorruptSnapshot(message.into())
    }

    /// Creates a storage error for `path`.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SimError::StorageIOFailure {
            path: path.into(),
            source,
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
