//! Experiment Tracker - active-run coordination and run queries
//!
//! The tracker applies configured defaults when starting runs, keeps one
//! active run per thread in an [`ActiveRuns`] registry, and answers
//! retrieval queries by re-reading the [`RunStore`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::config::TrackerConfig;
use super::registry::ActiveRuns;
use super::run::{Run, RunOptions, RunStatus};
use super::store::{RunData, RunStore};
use crate::{Error, Result};

/// Coordinates runs for one runs directory.
///
/// # Example
///
/// ```rust,no_run
/// use trueno_track::experiment::{ExperimentTracker, RunOptions, TrackerConfig};
///
/// let tracker = ExperimentTracker::new(TrackerConfig::default());
/// let run = tracker.start_run(RunOptions::new().name("model").version("v1.0"))?;
/// run.log_param("lr", 0.01)?;
/// tracker.end_run()?;
///
/// let latest = tracker.get_latest_version("model")?;
/// assert!(latest.is_some());
/// # Ok::<(), trueno_track::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ExperimentTracker {
    config: TrackerConfig,
    store: RunStore,
    registry: ActiveRuns,
}

impl ExperimentTracker {
    /// Create a tracker sharing the process-wide active-run registry.
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_registry(config, ActiveRuns::process())
    }

    /// Create a tracker with its own registry.
    #[must_use]
    pub fn with_registry(config: TrackerConfig, registry: ActiveRuns) -> Self {
        let store = RunStore::new(config.runs_dir());
        Self {
            config,
            store,
            registry,
        }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Get the underlying store.
    #[must_use]
    pub const fn store(&self) -> &RunStore {
        &self.store
    }

    /// Get the active-run registry.
    #[must_use]
    pub const fn registry(&self) -> &ActiveRuns {
        &self.registry
    }

    /// Start a run and make it this thread's active run.
    ///
    /// Unset options fall back to the configured run name and experiment ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyActive`] if this thread already has an active
    /// run, or any error from creating the run.
    pub fn start_run(&self, options: RunOptions) -> Result<Arc<Run>> {
        if let Some(active) = self.registry.current() {
            return Err(Error::AlreadyActive(active.run_id().to_string()));
        }

        let options = RunOptions {
            name: options
                .name
                .or_else(|| self.config.run_name().map(str::to_string)),
            experiment_id: options.experiment_id.or(Some(self.config.experiment_id())),
            ..options
        };
        let run = Arc::new(Run::start(self.store.clone(), options)?);
        self.registry.set_current(Arc::clone(&run));
        Ok(run)
    }

    /// Get this thread's active run.
    #[must_use]
    pub fn active_run(&self) -> Option<Arc<Run>> {
        self.registry.current()
    }

    /// End this thread's active run as `FINISHED` and clear the slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveRun`] if there is none, or any error from
    /// ending the run. The slot is cleared either way.
    pub fn end_run(&self) -> Result<()> {
        self.end_run_with(RunStatus::Finished)
    }

    /// End this thread's active run with `status` and clear the slot.
    ///
    /// # Errors
    ///
    /// Same as [`ExperimentTracker::end_run`], plus
    /// [`Error::InvalidArgument`] for a non-terminal status, in which case
    /// the active run and its slot are left as they were.
    pub fn end_run_with(&self, status: RunStatus) -> Result<()> {
        if !status.is_terminal() {
            return Err(Error::InvalidArgument(format!(
                "invalid status '{status}', must be 'FINISHED' or 'FAILED'"
            )));
        }
        let run = self.registry.take_current().ok_or(Error::NoActiveRun)?;
        run.end(status)
    }

    /// Log a parameter on this thread's active run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveRun`] if there is none, otherwise the same as
    /// [`Run::log_param`].
    pub fn log_param(&self, key: &str, value: impl Serialize) -> Result<()> {
        self.require_active()?.log_param(key, value)
    }

    /// Log a metric on this thread's active run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoActiveRun`] if there is none, otherwise the same as
    /// [`Run::log_metric`].
    pub fn log_metric(&self, key: &str, value: impl Serialize) -> Result<()> {
        self.require_active()?.log_metric(key, value)
    }

    /// List run IDs, most recently modified first.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the experiment directory cannot be read.
    pub fn list_runs(&self, experiment_id: Option<u64>) -> Result<Vec<String>> {
        self.store
            .list_runs(experiment_id.unwrap_or(self.config.experiment_id()))
    }

    /// Load a run's metadata, params and metrics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the run does not exist.
    pub fn get_run(&self, run_id: &str, experiment_id: Option<u64>) -> Result<RunData> {
        self.store
            .load_run(run_id, experiment_id.unwrap_or(self.config.experiment_id()))
    }

    /// Find the run with the given name and version in the configured
    /// experiment. The most recently modified match wins.
    ///
    /// # Errors
    ///
    /// Propagates listing or loading errors; no match is `Ok(None)`.
    pub fn get_run_by_version(&self, name: &str, version: &str) -> Result<Option<RunData>> {
        self.find_run(|data| data.name() == Some(name) && data.version() == Some(version))
    }

    /// Find the most recently modified versioned run with the given name.
    ///
    /// # Errors
    ///
    /// Propagates listing or loading errors; no match is `Ok(None)`.
    pub fn get_latest_version(&self, name: &str) -> Result<Option<RunData>> {
        self.find_run(|data| data.name() == Some(name) && data.version().is_some())
    }

    /// Start a run with the configured defaults, run `f`, then end the
    /// active run if it is still active.
    ///
    /// `Ok` ends it `FINISHED`, `Err` or a panic ends it `FAILED` (see
    /// [`Run::scope`]). If `f` replaced the scope's run with another one on
    /// this thread, that run is ended with the same status and its slot
    /// cleared.
    ///
    /// # Errors
    ///
    /// Returns an error from starting the run, `f`'s error, or the error
    /// from ending the run.
    pub fn scope<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Run) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let run = self.start_run(RunOptions::new())?;
        let mut release = Release {
            tracker: self,
            run: &run,
            status: RunStatus::Failed,
        };
        let outcome = run.scope(f);
        if outcome.is_ok() {
            release.status = RunStatus::Finished;
        }
        outcome
    }

    /// Clear this thread's slot, ending whatever run replaced `run` in it.
    fn release(&self, run: &Arc<Run>, status: RunStatus) {
        let Some(active) = self.registry.take_current() else {
            return;
        };
        if Arc::ptr_eq(&active, run) {
            return;
        }
        debug!(
            run_id = %run.run_id(),
            active = %active.run_id(),
            %status,
            "ending run left active by scope"
        );
        if let Err(err) = active.end_quietly(status) {
            warn!(run_id = %active.run_id(), error = %err, "failed to end run left active by scope");
        }
    }

    fn require_active(&self) -> Result<Arc<Run>> {
        self.registry.current().ok_or(Error::NoActiveRun)
    }

    fn find_run(&self, matches: impl Fn(&RunData) -> bool) -> Result<Option<RunData>> {
        let experiment_id = self.config.experiment_id();
        for run_id in self.store.list_runs(experiment_id)? {
            let data = self.store.load_run(&run_id, experiment_id)?;
            if matches(&data) {
                debug!(%run_id, "matched run");
                return Ok(Some(data));
            }
        }
        Ok(None)
    }
}

/// Clears the scope's slot on every exit path. `status` stays `Failed`
/// unless the closure returned `Ok`.
struct Release<'a> {
    tracker: &'a ExperimentTracker,
    run: &'a Arc<Run>,
    status: RunStatus,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.tracker.release(self.run, self.status);
    }
}
