//! Run - one tracked execution of an experiment
//!
//! A run persists itself on creation and on every status change. Params and
//! metrics are written through to the [`RunStore`] as they are logged; the
//! run keeps no cached copies.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::record::format_timestamp;
use super::store::{Metadata, RunStore};
use crate::{Error, Result};

/// Status of a run.
///
/// `Running` is the only non-terminal state. A run moves to `Finished` or
/// `Failed` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run is currently executing.
    Running,
    /// Run completed successfully.
    Finished,
    /// Run failed with an error.
    Failed,
}

impl RunStatus {
    /// Upper-case name as stored in `meta.yaml`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RUNNING" => Ok(Self::Running),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            other => Err(Error::InvalidArgument(format!(
                "invalid status '{other}', must be 'FINISHED' or 'FAILED'"
            ))),
        }
    }
}

/// Per-run overrides. Unset fields fall back to defaults (generated run ID,
/// experiment 0, no name, no version) or, via the tracker, to its config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Human-readable label, not unique.
    pub name: Option<String>,
    /// Experiment grouping key.
    pub experiment_id: Option<u64>,
    /// Caller-chosen run ID.
    pub run_id: Option<String>,
    /// Version label for name + version lookups.
    pub version: Option<String>,
}

impl RunOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the run name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the experiment ID.
    #[must_use]
    pub const fn experiment_id(mut self, experiment_id: u64) -> Self {
        self.experiment_id = Some(experiment_id);
        self
    }

    /// Set the run ID.
    #[must_use]
    pub fn run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Set the version label.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Lifecycle {
    status: RunStatus,
    end_time: Option<DateTime<Utc>>,
}

/// A single experiment run.
///
/// Shareable across threads (usually as `Arc<Run>`); the lifecycle state is
/// guarded so `end` persists before it commits.
///
/// # Example
///
/// ```rust,no_run
/// use trueno_track::experiment::{Run, RunOptions, RunStore};
///
/// let store = RunStore::new("mlruns");
/// let run = Run::start(store, RunOptions::new().name("baseline"))?;
/// run.log_param("learning_rate", 0.01)?;
/// run.log_metric("accuracy", 0.95)?;
/// run.finish()?;
/// # Ok::<(), trueno_track::Error>(())
/// ```
#[derive(Debug)]
pub struct Run {
    run_id: String,
    experiment_id: u64,
    name: Option<String>,
    version: Option<String>,
    start_time: DateTime<Utc>,
    lifecycle: Mutex<Lifecycle>,
    store: RunStore,
}

impl Run {
    /// Create a `RUNNING` run and persist its metadata.
    ///
    /// A run ID is generated (32 lower-case hex characters) unless one is
    /// given in `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] for an unsafe run ID, or any error from
    /// writing `meta.yaml`.
    pub fn start(store: RunStore, options: RunOptions) -> Result<Self> {
        let run = Self {
            run_id: options.run_id.unwrap_or_else(generate_run_id),
            experiment_id: options.experiment_id.unwrap_or_default(),
            name: options.name,
            version: options.version,
            start_time: Utc::now(),
            lifecycle: Mutex::new(Lifecycle {
                status: RunStatus::Running,
                end_time: None,
            }),
            store,
        };
        run.persist(&run.lock())?;
        info!(run_id = %run.run_id, experiment_id = run.experiment_id, "started run");
        Ok(run)
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the experiment ID.
    #[must_use]
    pub const fn experiment_id(&self) -> u64 {
        self.experiment_id
    }

    /// Get the run name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the version label, if any.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Get the start timestamp.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Get the current status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.lock().status
    }

    /// Get the end timestamp; set exactly when the status is terminal.
    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.lock().end_time
    }

    /// Get the store this run writes to.
    #[must_use]
    pub const fn store(&self) -> &RunStore {
        &self.store
    }

    /// Log a parameter. Any serializable value is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the run has ended,
    /// [`Error::InvalidKey`] for an unsafe key, [`Error::InvalidArgument`]
    /// if the value holds a NaN or infinite float, or encoding/I/O errors.
    pub fn log_param(&self, key: &str, value: impl Serialize) -> Result<()> {
        let lifecycle = self.lock();
        ensure_running(lifecycle.status, "log parameter to")?;
        let value = encode(key, &value)?;
        self.store.save_param(&self.run_id, self.experiment_id, key, value)
    }

    /// Log a metric. Values are not checked to be numeric.
    ///
    /// # Errors
    ///
    /// Same as [`Run::log_param`].
    pub fn log_metric(&self, key: &str, value: impl Serialize) -> Result<()> {
        let lifecycle = self.lock();
        ensure_running(lifecycle.status, "log metric to")?;
        let value = encode(key, &value)?;
        self.store.save_metric(&self.run_id, self.experiment_id, key, value)
    }

    /// End the run as `FINISHED`.
    ///
    /// # Errors
    ///
    /// Same as [`Run::end`].
    pub fn finish(&self) -> Result<()> {
        self.end(RunStatus::Finished)
    }

    /// End the run with a terminal status and persist the final metadata.
    ///
    /// The in-memory transition only happens once the metadata write has
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the run has already ended,
    /// [`Error::InvalidArgument`] if `status` is `RUNNING`, or any error
    /// from writing `meta.yaml`.
    pub fn end(&self, status: RunStatus) -> Result<()> {
        let mut lifecycle = self.lock();
        if lifecycle.status.is_terminal() {
            return Err(Error::InvalidState(format!(
                "run {} is already ended with status '{}'",
                self.run_id, lifecycle.status
            )));
        }
        if !status.is_terminal() {
            return Err(Error::InvalidArgument(format!(
                "invalid status '{status}', must be 'FINISHED' or 'FAILED'"
            )));
        }

        let ended = Lifecycle {
            status,
            end_time: Some(Utc::now()),
        };
        self.persist(&ended)?;
        *lifecycle = ended;
        info!(run_id = %self.run_id, %status, "ended run");
        Ok(())
    }

    /// End the run with a status given by name (`"FINISHED"` or `"FAILED"`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an unknown status name,
    /// otherwise the same as [`Run::end`].
    pub fn end_with(&self, status: &str) -> Result<()> {
        self.end(status.parse()?)
    }

    /// Run `f` with this run, then end it.
    ///
    /// `Ok` ends the run `FINISHED`; `Err` or a panic ends it `FAILED`. If
    /// `f` already ended the run, the automatic end is skipped silently.
    /// Any other failure to end is returned when `f` succeeded, and logged
    /// when `f`'s own error is being returned.
    ///
    /// # Errors
    ///
    /// Returns `f`'s error, or the error from ending the run.
    pub fn scope<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Self) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let outcome = {
            let guard = PanicGuard(self);
            let outcome = f(self);
            std::mem::forget(guard);
            outcome
        };

        match outcome {
            Ok(value) => {
                self.end_quietly(RunStatus::Finished)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(end_err) = self.end_quietly(RunStatus::Failed) {
                    warn!(run_id = %self.run_id, error = %end_err, "failed to mark run as failed");
                }
                Err(err)
            }
        }
    }

    /// Like `end`, but an already-terminal run is not an error.
    pub(crate) fn end_quietly(&self, status: RunStatus) -> Result<()> {
        match self.end(status) {
            Err(Error::InvalidState(_)) => Ok(()),
            other => other,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, lifecycle: &Lifecycle) -> Result<()> {
        let mut metadata = Metadata::new();
        metadata.insert("name".into(), self.name.clone().map_or(Value::Null, Value::from));
        metadata.insert("status".into(), Value::from(lifecycle.status.as_str()));
        metadata.insert("start_time".into(), Value::from(format_timestamp(self.start_time)));
        metadata.insert(
            "end_time".into(),
            lifecycle.end_time.map_or(Value::Null, |t| Value::from(format_timestamp(t))),
        );
        if let Some(version) = &self.version {
            metadata.insert("version".into(), Value::from(version.as_str()));
        }
        self.store.save_metadata(&self.run_id, self.experiment_id, &metadata)
    }
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run(run_id='{}', experiment_id={}, name='{}', status='{}')",
            self.run_id,
            self.experiment_id,
            self.name.as_deref().unwrap_or("None"),
            self.status()
        )
    }
}

/// Ends the run `FAILED` if dropped during unwinding.
struct PanicGuard<'a>(&'a Run);

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            if let Err(err) = self.0.end_quietly(RunStatus::Failed) {
                warn!(
                    run_id = %self.0.run_id,
                    error = %err,
                    "failed to mark panicking run as failed"
                );
            }
        }
    }
}

fn ensure_running(status: RunStatus, action: &str) -> Result<()> {
    if status.is_terminal() {
        return Err(Error::InvalidState(format!(
            "cannot {action} run with status '{status}'"
        )));
    }
    Ok(())
}

/// Encode a logged value as JSON.
///
/// JSON has no NaN or infinity and `serde_json` would store them as `null`,
/// so non-finite floats anywhere in the value are rejected.
fn encode(key: &str, value: &impl Serialize) -> Result<Value> {
    if has_non_finite(&serde_yaml::to_value(value)?) {
        return Err(Error::InvalidArgument(format!(
            "value for '{key}' contains a NaN or infinite float"
        )));
    }
    Ok(serde_json::to_value(value)?)
}

fn has_non_finite(value: &serde_yaml::Value) -> bool {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Number(n) => n.is_nan() || n.is_infinite(),
        Yaml::Sequence(items) => items.iter().any(has_non_finite),
        Yaml::Mapping(map) => map
            .iter()
            .any(|(k, v)| has_non_finite(k) || has_non_finite(v)),
        Yaml::Tagged(tagged) => has_non_finite(&tagged.value),
        Yaml::Null | Yaml::Bool(_) | Yaml::String(_) => false,
    }
}

/// Random 128-bit run ID rendered as 32 lower-case hex characters.
#[must_use]
pub fn generate_run_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
