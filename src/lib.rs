//! # Trueno-Track: File-Based Experiment Tracking
//!
//! **Version**: 0.1.0
//!
//! Trueno-Track records named runs of a process (e.g. a training job) with
//! their parameters, metrics and lifecycle metadata, persisted as plain
//! YAML/JSON files that any tool can read.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke safety**: Keys are validated before they become file names
//! - **Jidoka**: Invalid lifecycle transitions stop with an error
//! - **Genchi Genbutsu**: One human-readable file per record, no server
//! - **Muda elimination**: Write-through, no flush step or cache
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use trueno_track::experiment::{ExperimentTracker, RunOptions, TrackerConfig};
//!
//! let tracker = ExperimentTracker::new(TrackerConfig::default());
//! let run = tracker.start_run(RunOptions::new().name("baseline"))?;
//! run.log_param("learning_rate", 0.01)?;
//! run.log_metric("accuracy", 0.95)?;
//! tracker.end_run()?;
//!
//! for run_id in tracker.list_runs(None)? {
//!     println!("{run_id}");
//! }
//! # Ok::<(), trueno_track::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod experiment;
pub mod fluent;

pub use error::{Error, Result};
pub use experiment::{ExperimentTracker, Run, RunData, RunOptions, RunStatus, TrackerConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
