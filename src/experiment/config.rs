//! Tracker configuration

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{Error, Result};

/// Default runs directory, relative to the working directory.
pub const DEFAULT_RUNS_DIR: &str = "mlruns";

/// Environment variable overriding the runs directory.
pub const RUNS_DIR_ENV: &str = "TRUENO_TRACK_DIR";

/// Environment variable overriding the default experiment ID.
pub const EXPERIMENT_ID_ENV: &str = "TRUENO_TRACK_EXPERIMENT_ID";

/// Defaults applied by an [`ExperimentTracker`](super::ExperimentTracker)
/// when a run is started without explicit options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    runs_dir: PathBuf,
    experiment_id: u64,
    run_name: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            runs_dir: PathBuf::from(DEFAULT_RUNS_DIR),
            experiment_id: 0,
            run_name: None,
        }
    }
}

impl TrackerConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> TrackerConfigBuilder {
        TrackerConfigBuilder::default()
    }

    /// Defaults overlaid with `TRUENO_TRACK_DIR` and
    /// `TRUENO_TRACK_EXPERIMENT_ID` when set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the experiment ID variable is
    /// not a non-negative integer.
    pub fn from_env() -> Result<Self> {
        Self::overlay(
            env::var_os(RUNS_DIR_ENV),
            env::var(EXPERIMENT_ID_ENV).ok().as_deref(),
            false,
        )
    }

    /// Like [`TrackerConfig::from_env`], but an invalid experiment ID is
    /// logged and replaced by the default while the runs directory is still
    /// taken from the environment.
    #[must_use]
    pub fn from_env_lenient() -> Self {
        Self::overlay(
            env::var_os(RUNS_DIR_ENV),
            env::var(EXPERIMENT_ID_ENV).ok().as_deref(),
            true,
        )
        .unwrap_or_default()
    }

    fn overlay(
        runs_dir: Option<OsString>,
        experiment_id: Option<&str>,
        lenient: bool,
    ) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(dir) = runs_dir.filter(|d| !d.is_empty()) {
            builder = builder.runs_dir(dir);
        }
        if let Some(raw) = experiment_id {
            match raw.trim().parse::<u64>() {
                Ok(id) => builder = builder.experiment_id(id),
                Err(_) if lenient => {
                    warn!(
                        value = raw,
                        "ignoring invalid {EXPERIMENT_ID_ENV}, using experiment 0"
                    );
                }
                Err(_) => {
                    return Err(Error::InvalidArgument(format!(
                        "{EXPERIMENT_ID_ENV}='{raw}' is not a valid experiment ID"
                    )));
                }
            }
        }
        Ok(builder.build())
    }

    /// Get the runs directory.
    #[must_use]
    pub fn runs_dir(&self) -> &Path {
        &self.runs_dir
    }

    /// Get the default experiment ID.
    #[must_use]
    pub const fn experiment_id(&self) -> u64 {
        self.experiment_id
    }

    /// Get the default run name, if any.
    #[must_use]
    pub fn run_name(&self) -> Option<&str> {
        self.run_name.as_deref()
    }
}

/// Builder for `TrackerConfig`.
#[derive(Debug, Default)]
pub struct TrackerConfigBuilder {
    config: TrackerConfig,
}

impl TrackerConfigBuilder {
    /// Set the runs directory.
    #[must_use]
    pub fn runs_dir(mut self, runs_dir: impl Into<PathBuf>) -> Self {
        self.config.runs_dir = runs_dir.into();
        self
    }

    /// Set the default experiment ID.
    #[must_use]
    pub const fn experiment_id(mut self, experiment_id: u64) -> Self {
        self.config.experiment_id = experiment_id;
        self
    }

    /// Set the default run name.
    #[must_use]
    pub fn run_name(mut self, run_name: impl Into<String>) -> Self {
        self.config.run_name = Some(run_name.into());
        self
    }

    /// Build the `TrackerConfig`.
    #[must_use]
    pub fn build(self) -> TrackerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.runs_dir(), Path::new("mlruns"));
        assert_eq!(config.experiment_id(), 0);
        assert!(config.run_name().is_none());
    }

    #[test]
    fn test_builder() {
        let config = TrackerConfig::builder()
            .runs_dir("/tmp/runs")
            .experiment_id(7)
            .run_name("baseline")
            .build();

        assert_eq!(config.runs_dir(), Path::new("/tmp/runs"));
        assert_eq!(config.experiment_id(), 7);
        assert_eq!(config.run_name(), Some("baseline"));
    }

    #[test]
    fn test_overlay_applies_both_variables() {
        let config = TrackerConfig::overlay(Some("/srv/runs".into()), Some(" 12 "), false).unwrap();
        assert_eq!(config.runs_dir(), Path::new("/srv/runs"));
        assert_eq!(config.experiment_id(), 12);

        let config = TrackerConfig::overlay(Some(OsString::new()), None, false).unwrap();
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_invalid_experiment_id_keeps_runs_dir_when_lenient() {
        let strict = TrackerConfig::overlay(Some("/srv/runs".into()), Some("-1"), false);
        assert!(matches!(strict, Err(Error::InvalidArgument(_))));

        let lenient = TrackerConfig::overlay(Some("/srv/runs".into()), Some("-1"), true).unwrap();
        assert_eq!(lenient.runs_dir(), Path::new("/srv/runs"));
        assert_eq!(lenient.experiment_id(), 0);
    }
}
