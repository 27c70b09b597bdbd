//! Run Store - file-backed storage for experiment tracking data
//!
//! The store is the only component that touches the filesystem for run
//! data. Every record is its own file, written through [`atomic_write`].
//!
//! ## Layout
//!
//! ```text
//! {runs_dir}/{experiment_id}/{run_id}/meta.yaml
//! {runs_dir}/{experiment_id}/{run_id}/params/{key}.json
//! {runs_dir}/{experiment_id}/{run_id}/metrics/{key}.json
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::{Map, Value};
use tracing::debug;

use super::atomic::atomic_write;
use super::key::validate_key;
use super::record::ValueRecord;
use super::run::RunStatus;
use crate::{Error, Result};

/// Metadata file name inside a run directory. Its presence marks a run.
pub const META_FILE: &str = "meta.yaml";
/// Parameter directory name inside a run directory.
pub const PARAMS_DIR: &str = "params";
/// Metric directory name inside a run directory.
pub const METRICS_DIR: &str = "metrics";

const RECORD_EXTENSION: &str = "json";

/// Run metadata as stored in `meta.yaml`.
pub type Metadata = Map<String, Value>;

/// Everything persisted for one run, as returned by [`RunStore::load_run`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunData {
    /// Contents of `meta.yaml` (empty if the file is missing or empty).
    pub metadata: Metadata,
    /// Parameter values keyed by parameter name.
    pub params: BTreeMap<String, Value>,
    /// Metric values keyed by metric name.
    pub metrics: BTreeMap<String, Value>,
}

impl RunData {
    /// Get the `run_id` recorded in metadata.
    #[must_use]
    pub fn run_id(&self) -> Option<&str> {
        self.meta_str("run_id")
    }

    /// Get the run name, if one was given.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.meta_str("name")
    }

    /// Get the version label, if one was given.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.meta_str("version")
    }

    /// Get the recorded status, if it is a known status.
    #[must_use]
    pub fn status(&self) -> Option<RunStatus> {
        self.meta_str("status").and_then(|s| s.parse().ok())
    }

    fn meta_str(&self, field: &str) -> Option<&str> {
        self.metadata.get(field).and_then(Value::as_str)
    }
}

/// File-backed store for runs, rooted at a runs directory.
///
/// Cloning is cheap; clones address the same directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStore {
    runs_dir: PathBuf,
}

impl RunStore {
    /// Create a store rooted at `runs_dir`. Nothing is created on disk until
    /// the first write.
    #[must_use]
    pub fn new(runs_dir: impl Into<PathBuf>) -> Self {
        Self {
            runs_dir: runs_dir.into(),
        }
    }

    /// Get the root directory.
    #[must_use]
    pub fn runs_dir(&self) -> &Path {
        &self.runs_dir
    }

    /// Directory holding all runs of an experiment.
    #[must_use]
    pub fn experiment_dir(&self, experiment_id: u64) -> PathBuf {
        self.runs_dir.join(experiment_id.to_string())
    }

    /// Directory of a single run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if `run_id` is not a safe path component.
    pub fn run_dir(&self, run_id: &str, experiment_id: u64) -> Result<PathBuf> {
        validate_key(run_id)?;
        Ok(self.experiment_dir(experiment_id).join(run_id))
    }

    /// Write `meta.yaml` for a run, fully replacing any previous content.
    ///
    /// `run_id` and `experiment_id` are always injected, overriding any
    /// values of those keys in `metadata`.
    ///
    /// # Errors
    ///
    /// Returns an error if the run ID is unsafe, encoding fails, or the
    /// atomic write fails.
    pub fn save_metadata(
        &self,
        run_id: &str,
        experiment_id: u64,
        metadata: &Metadata,
    ) -> Result<()> {
        let path = self.run_dir(run_id, experiment_id)?.join(META_FILE);

        let mut metadata = metadata.clone();
        metadata.insert("run_id".into(), Value::from(run_id));
        metadata.insert("experiment_id".into(), Value::from(experiment_id));

        let encoded = serde_yaml::to_string(&metadata)?;
        atomic_write(&path, encoded.as_bytes())?;
        debug!(run_id, experiment_id, path = %path.display(), "saved run metadata");
        Ok(())
    }

    /// Persist a parameter, replacing any earlier value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] before touching the filesystem if `key`
    /// is not a safe file name; otherwise encoding or I/O errors.
    pub fn save_param(
        &self,
        run_id: &str,
        experiment_id: u64,
        key: &str,
        value: Value,
    ) -> Result<()> {
        self.save_value(PARAMS_DIR, run_id, experiment_id, key, value)
    }

    /// Persist a metric, replacing any earlier value for `key`.
    ///
    /// # Errors
    ///
    /// Same as [`RunStore::save_param`].
    pub fn save_metric(
        &self,
        run_id: &str,
        experiment_id: u64,
        key: &str,
        value: Value,
    ) -> Result<()> {
        self.save_value(METRICS_DIR, run_id, experiment_id, key, value)
    }

    fn save_value(
        &self,
        kind: &str,
        run_id: &str,
        experiment_id: u64,
        key: &str,
        value: Value,
    ) -> Result<()> {
        validate_key(key)?;
        let path = self
            .run_dir(run_id, experiment_id)?
            .join(kind)
            .join(format!("{key}.{RECORD_EXTENSION}"));

        let encoded = serde_json::to_vec(&ValueRecord::new(value))?;
        atomic_write(&path, &encoded)?;
        debug!(run_id, experiment_id, key, kind, "saved record");
        Ok(())
    }

    /// Load metadata, params and metrics of a run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the run directory does not exist, and
    /// propagates I/O or decoding errors from any individual file.
    pub fn load_run(&self, run_id: &str, experiment_id: u64) -> Result<RunData> {
        let run_dir = self.run_dir(run_id, experiment_id)?;
        if !run_dir.is_dir() {
            return Err(Error::NotFound {
                run_id: run_id.to_string(),
                experiment_id,
            });
        }

        Ok(RunData {
            metadata: read_metadata(&run_dir.join(META_FILE))?,
            params: read_records(&run_dir.join(PARAMS_DIR))?,
            metrics: read_records(&run_dir.join(METRICS_DIR))?,
        })
    }

    /// List run IDs of an experiment, most recently modified metadata first.
    ///
    /// Only subdirectories containing `meta.yaml` count as runs. Ties on
    /// modification time are broken by run ID. A missing experiment
    /// directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the experiment directory cannot be read.
    pub fn list_runs(&self, experiment_id: u64) -> Result<Vec<String>> {
        let experiment_dir = self.experiment_dir(experiment_id);
        if !experiment_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut runs: Vec<(SystemTime, String)> = Vec::new();
        for entry in fs::read_dir(&experiment_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Ok(meta) = fs::metadata(entry.path().join(META_FILE)) else {
                continue;
            };
            let Some(run_id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            runs.push((meta.modified()?, run_id));
        }

        runs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        debug!(experiment_id, count = runs.len(), "listed runs");
        Ok(runs.into_iter().map(|(_, run_id)| run_id).collect())
    }
}

fn read_metadata(path: &Path) -> Result<Metadata> {
    if !path.is_file() {
        return Ok(Metadata::new());
    }
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(Metadata::new());
    }
    match serde_yaml::from_str::<Value>(&raw)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Metadata::new()),
    }
}

fn read_records(dir: &Path) -> Result<BTreeMap<String, Value>> {
    let mut values = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(values);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) || !path.is_file() {
            continue;
        }
        let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let record: ValueRecord = serde_json::from_slice(&fs::read(&path)?)?;
        values.insert(key.to_string(), record.into_value());
    }
    Ok(values)
}
