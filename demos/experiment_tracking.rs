//! Experiment Tracking Example
//!
//! Simulates a small hyperparameter sweep with versioned runs, then queries
//! the runs directory the way an external tool would.
//!
//! Run with: cargo run --example experiment_tracking

use trueno_track::experiment::{ExperimentTracker, RunOptions, TrackerConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Trueno-Track Experiment Tracking ===\n");

    let runs_dir = std::env::temp_dir().join("trueno-track-demo");
    let config = TrackerConfig::builder()
        .runs_dir(&runs_dir)
        .experiment_id(1)
        .build();
    let tracker = ExperimentTracker::new(config);

    // -------------------------------------------------------------------------
    // 1. Train three versions of a model
    // -------------------------------------------------------------------------
    println!("1. Training model versions...");

    for (version, learning_rate) in [("v1.0", 0.1), ("v1.1", 0.01), ("v1.2", 0.001)] {
        let run = tracker.start_run(RunOptions::new().name("resnet").version(version))?;
        run.log_param("learning_rate", learning_rate)?;
        run.log_param("layers", serde_json::json!([64, 128, 256]))?;

        let mut loss = 2.5;
        for epoch in 0..10 {
            loss = loss * (1.0 - learning_rate * 3.0) + 0.01;
            run.log_metric("loss", loss)?;
            run.log_metric("epoch", epoch)?;
        }

        tracker.end_run()?;
        println!("   {version}: lr={learning_rate}, final loss={loss:.4}");
    }

    // -------------------------------------------------------------------------
    // 2. Query the runs directory
    // -------------------------------------------------------------------------
    println!("\n2. Listing runs (most recent first)...");
    for run_id in tracker.list_runs(None)? {
        let data = tracker.get_run(&run_id, None)?;
        println!(
            "   {run_id}  {:<8} {:?}",
            data.version().unwrap_or("-"),
            data.status()
        );
    }

    // -------------------------------------------------------------------------
    // 3. Version lookups
    // -------------------------------------------------------------------------
    println!("\n3. Version lookups...");

    if let Some(data) = tracker.get_run_by_version("resnet", "v1.1")? {
        println!("   v1.1 learning_rate = {}", data.params["learning_rate"]);
    }
    if let Some(data) = tracker.get_latest_version("resnet")? {
        println!(
            "   latest = {} (loss {})",
            data.version().unwrap_or("-"),
            data.metrics["loss"]
        );
    }

    println!("\nRuns written to {}", runs_dir.display());
    Ok(())
}
