//! Run Lifecycle Tests
//!
//! RUNNING → FINISHED | FAILED, write-through logging, scoped ending.

use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::TempDir;
use trueno_track::experiment::{Run, RunOptions, RunStatus, RunStore};
use trueno_track::Error;

fn start(dir: &Path, options: RunOptions) -> Run {
    Run::start(RunStore::new(dir), options).expect("run should start")
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_new_run_is_running_and_persisted() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new().name("train"));

    assert_eq!(run.status(), RunStatus::Running);
    assert!(run.end_time().is_none());
    assert!(run.start_time().timestamp() > 0);

    let data = run.store().load_run(run.run_id(), 0).unwrap();
    assert_eq!(data.status(), Some(RunStatus::Running));
    assert_eq!(data.name(), Some("train"));
    assert!(data.metadata["start_time"].as_str().unwrap().ends_with('Z'));
    assert!(data.metadata["end_time"].is_null());
}

#[test]
fn test_custom_identity() {
    let tmp = TempDir::new().unwrap();
    let run = start(
        tmp.path(),
        RunOptions::new().run_id("my_custom_run_id").experiment_id(5),
    );

    assert_eq!(run.run_id(), "my_custom_run_id");
    assert_eq!(run.experiment_id(), 5);
    assert!(tmp.path().join("5/my_custom_run_id/meta.yaml").is_file());
}

#[test]
fn test_generated_ids_are_unique() {
    let tmp = TempDir::new().unwrap();
    let a = start(tmp.path(), RunOptions::new());
    let b = start(tmp.path(), RunOptions::new());
    assert_ne!(a.run_id(), b.run_id());
}

#[test]
fn test_unsafe_run_id_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let result = Run::start(RunStore::new(tmp.path()), RunOptions::new().run_id("../outside"));
    assert!(matches!(result, Err(Error::InvalidKey { .. })));
}

#[test]
fn test_unversioned_run_has_no_version_field() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new().name("model"));

    let data = run.store().load_run(run.run_id(), 0).unwrap();
    assert!(run.version().is_none());
    assert!(data.version().is_none());
}

// =============================================================================
// Logging
// =============================================================================

#[test]
fn test_logging_scenario() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new());

    run.log_param("learning_rate", 0.01).unwrap();
    run.log_metric("accuracy", 0.95).unwrap();
    run.end(RunStatus::Finished).unwrap();

    let data = run.store().load_run(run.run_id(), 0).unwrap();
    assert_eq!(data.params["learning_rate"], json!(0.01));
    assert_eq!(data.metrics["accuracy"], json!(0.95));
    assert_eq!(data.status(), Some(RunStatus::Finished));
    assert!(data.metadata["end_time"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn test_logging_does_not_change_status() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new());
    run.log_param("optimizer", "adam").unwrap();
    run.log_metric("loss", 0.5).unwrap();
    assert_eq!(run.status(), RunStatus::Running);
}

#[test]
fn test_metric_values_are_not_type_checked() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new());
    run.log_metric("label", "not-a-number").unwrap();

    let data = run.store().load_run(run.run_id(), 0).unwrap();
    assert_eq!(data.metrics["label"], json!("not-a-number"));
}

#[test]
fn test_non_finite_floats_are_rejected_without_writing() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new());

    for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        assert!(matches!(run.log_metric("loss", value), Err(Error::InvalidArgument(_))));
    }
    assert!(matches!(
        run.log_param("grid", vec![0.1, f64::NAN]),
        Err(Error::InvalidArgument(_))
    ));

    let run_dir = tmp.path().join("0").join(run.run_id());
    assert!(!run_dir.join("params").exists());
    assert!(!run_dir.join("metrics").exists());

    run.log_metric("loss", f64::MAX).unwrap();
    let data = run.store().load_run(run.run_id(), 0).unwrap();
    assert_eq!(data.metrics["loss"], json!(f64::MAX));
    assert_eq!(run.status(), RunStatus::Running);
}

#[test]
fn test_log_after_end_fails_without_writing() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new());
    run.finish().unwrap();

    assert!(matches!(run.log_param("late", 1), Err(Error::InvalidState(_))));
    assert!(matches!(run.log_metric("late", 1.0), Err(Error::InvalidState(_))));

    let run_dir = tmp.path().join("0").join(run.run_id());
    assert!(!run_dir.join("params").exists());
    assert!(!run_dir.join("metrics").exists());
}

#[test]
fn test_invalid_key_is_rejected_by_run() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new());
    assert!(matches!(run.log_param("../lr", 1), Err(Error::InvalidKey { .. })));
    assert!(matches!(run.log_metric("a*b", 1), Err(Error::InvalidKey { .. })));
}

// =============================================================================
// Ending
// =============================================================================

#[test]
fn test_end_twice_fails_and_keeps_first_result() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new());
    run.end(RunStatus::Failed).unwrap();
    let end_time = run.end_time();

    assert!(matches!(run.end(RunStatus::Finished), Err(Error::InvalidState(_))));
    assert_eq!(run.status(), RunStatus::Failed);
    assert_eq!(run.end_time(), end_time);
}

#[test]
fn test_end_with_unknown_status_string() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new());

    assert!(matches!(run.end_with("INVALID"), Err(Error::InvalidArgument(_))));
    assert!(matches!(run.end_with("RUNNING"), Err(Error::InvalidArgument(_))));
    assert_eq!(run.status(), RunStatus::Running);

    run.end_with("FAILED").unwrap();
    assert_eq!(run.status(), RunStatus::Failed);
}

#[test]
fn test_end_failure_keeps_run_running() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new());

    // Replace the run directory with a plain file so the metadata write fails.
    let run_dir = tmp.path().join("0").join(run.run_id());
    fs::remove_dir_all(&run_dir).unwrap();
    fs::write(&run_dir, "blocker").unwrap();

    assert!(matches!(run.finish(), Err(Error::Io(_))));
    assert_eq!(run.status(), RunStatus::Running);
    assert!(run.end_time().is_none());
}

// =============================================================================
// Scoped use
// =============================================================================

#[test]
fn test_scope_finishes_on_success() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new());

    let value = run
        .scope(|run| -> Result<u32, Error> {
            run.log_param("epochs", 10)?;
            Ok(10)
        })
        .unwrap();

    assert_eq!(value, 10);
    assert_eq!(run.status(), RunStatus::Finished);
}

#[test]
fn test_scope_fails_on_error() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new());

    let result = run.scope(|run| -> Result<(), Error> {
        run.log_param("before", 1)?;
        run.log_param("bad/key", 2)
    });

    assert!(matches!(result, Err(Error::InvalidKey { .. })));
    assert_eq!(run.status(), RunStatus::Failed);
    let data = run.store().load_run(run.run_id(), 0).unwrap();
    assert_eq!(data.status(), Some(RunStatus::Failed));
}

#[test]
fn test_scope_tolerates_manual_end() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new());

    run.scope(|run| run.end(RunStatus::Failed)).unwrap();
    assert_eq!(run.status(), RunStatus::Failed);
}

#[test]
fn test_scope_with_foreign_error_type() {
    let tmp = TempDir::new().unwrap();
    let run = start(tmp.path(), RunOptions::new());

    let result: anyhow::Result<()> = run.scope(|_| Err(anyhow::anyhow!("diverged")));
    assert_eq!(result.unwrap_err().to_string(), "diverged");
    assert_eq!(run.status(), RunStatus::Failed);
}
