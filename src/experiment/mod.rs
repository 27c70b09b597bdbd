//! Experiment Tracking (file-backed runs)
//!
//! Runs are recorded as plain files so they can be inspected without any
//! server. Every mutation is written through immediately.
//!
//! ## Schema Overview
//!
//! ```text
//! {runs_dir}/{experiment_id}/{run_id}/
//!     meta.yaml            run_id, experiment_id, name, status,
//!                          start_time, end_time, version
//!     params/{key}.json    {"value": ..., "timestamp": "...Z"}
//!     metrics/{key}.json   {"value": ..., "timestamp": "...Z"}
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trueno_track::experiment::{ExperimentTracker, RunOptions, TrackerConfig};
//!
//! let tracker = ExperimentTracker::new(TrackerConfig::default());
//!
//! // Start a run
//! let run = tracker.start_run(RunOptions::new().name("my_experiment"))?;
//!
//! // Log params and metrics
//! run.log_param("learning_rate", 0.01)?;
//! run.log_metric("accuracy", 0.95)?;
//!
//! // Complete the run
//! tracker.end_run()?;
//!
//! // Or let a scope end it
//! tracker.scope(|run| run.log_metric("loss", 0.05))?;
//! # Ok::<(), trueno_track::Error>(())
//! ```

mod atomic;
mod config;
mod key;
mod record;
mod registry;
mod run;
mod store;
mod tracker;

pub use atomic::{atomic_write, TEMP_SUFFIX};
pub use config::{
    TrackerConfig, TrackerConfigBuilder, DEFAULT_RUNS_DIR, EXPERIMENT_ID_ENV, RUNS_DIR_ENV,
};
pub use key::validate_key;
pub use record::{format_timestamp, ValueRecord, ValueRecordBuilder};
pub use registry::ActiveRuns;
pub use run::{generate_run_id, Run, RunOptions, RunStatus};
pub use store::{Metadata, RunData, RunStore, META_FILE, METRICS_DIR, PARAMS_DIR};
pub use tracker::ExperimentTracker;
