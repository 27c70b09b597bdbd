//! Error types for Trueno-Track
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trueno-Track error types
#[derive(Error, Debug)]
pub enum Error {
    /// Key cannot be used as a file or directory name (rejected before any I/O)
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey {
        /// The rejected key
        key: String,
        /// Why the key was rejected
        reason: &'static str,
    },

    /// Operation not allowed in the run's current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Argument outside the accepted domain (e.g. a non-terminal end status)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Run directory does not exist
    #[error("Run '{run_id}' not found in experiment {experiment_id}")]
    NotFound {
        /// Requested run ID
        run_id: String,
        /// Experiment searched
        experiment_id: u64,
    },

    /// The current thread already has an active run
    #[error("There is already an active run ({0})\nEnd it with end_run() before starting a new one")]
    AlreadyActive(String),

    /// The current thread has no active run
    #[error("No active run\nStart one with start_run() first")]
    NoActiveRun,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error (params/metrics records)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML encoding or decoding error (run metadata)
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
