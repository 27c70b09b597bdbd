//! Free-function API over one shared tracker
//!
//! Mirrors the familiar `start_run` / `log_param` / `end_run` style. The
//! shared tracker is configured from the environment on first use (see
//! [`TrackerConfig::from_env_lenient`]) and uses the process-wide active-run
//! registry, so each thread has its own active run.
//!
//! ```rust,no_run
//! use trueno_track::fluent;
//! use trueno_track::RunOptions;
//!
//! fluent::start_run(RunOptions::new().name("my_experiment"))?;
//! fluent::log_param("learning_rate", 0.01)?;
//! fluent::log_metric("accuracy", 0.95)?;
//! fluent::end_run()?;
//! # Ok::<(), trueno_track::Error>(())
//! ```

use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::experiment::{ExperimentTracker, Run, RunOptions, TrackerConfig};
use crate::Result;

/// The shared tracker behind the free functions.
pub fn tracker() -> &'static ExperimentTracker {
    static TRACKER: OnceLock<ExperimentTracker> = OnceLock::new();
    TRACKER.get_or_init(|| ExperimentTracker::new(TrackerConfig::from_env_lenient()))
}

/// Start a run on the shared tracker.
///
/// # Errors
///
/// See [`ExperimentTracker::start_run`].
pub fn start_run(options: RunOptions) -> Result<Arc<Run>> {
    tracker().start_run(options)
}

/// This thread's active run, if any.
#[must_use]
pub fn active_run() -> Option<Arc<Run>> {
    tracker().active_run()
}

/// End this thread's active run as `FINISHED`.
///
/// # Errors
///
/// See [`ExperimentTracker::end_run`].
pub fn end_run() -> Result<()> {
    tracker().end_run()
}

/// Log a parameter on this thread's active run.
///
/// # Errors
///
/// Returns [`crate::Error::NoActiveRun`] if no run is active.
pub fn log_param(key: &str, value: impl Serialize) -> Result<()> {
    tracker().log_param(key, value)
}

/// Log a metric on this thread's active run.
///
/// # Errors
///
/// Returns [`crate::Error::NoActiveRun`] if no run is active.
pub fn log_metric(key: &str, value: impl Serialize) -> Result<()> {
    tracker().log_metric(key, value)
}
