//! Basic Usage Example
//!
//! Demonstrates both ways of driving a run: the free-function API and a
//! tracker scope that ends the run automatically.
//!
//! Run with: cargo run --example basic_usage

use trueno_track::experiment::{ExperimentTracker, RunOptions, TrackerConfig};
use trueno_track::fluent;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Trueno-Track Basic Usage ===\n");

    // -------------------------------------------------------------------------
    // 1. Free-function API
    // -------------------------------------------------------------------------
    println!("1. Free-function API...");

    let run = fluent::start_run(RunOptions::new().name("my_experiment"))?;
    fluent::log_param("learning_rate", 0.01)?;
    fluent::log_param("optimizer", "adam")?;
    fluent::log_metric("accuracy", 0.95)?;
    fluent::end_run()?;

    println!("   {run}");

    // -------------------------------------------------------------------------
    // 2. Scoped API
    // -------------------------------------------------------------------------
    println!("\n2. Scoped API...");

    let config = TrackerConfig::builder().run_name("scoped_experiment").build();
    let tracker = ExperimentTracker::new(config);

    let run_id = tracker.scope(|run| -> anyhow::Result<String> {
        run.log_param("batch_size", 32)?;
        run.log_metric("loss", 0.05)?;
        Ok(run.run_id().to_string())
    })?;

    let data = tracker.get_run(&run_id, None)?;
    println!("   Run ID: {run_id}");
    println!("   Status: {:?}", data.status());
    println!("   Params: {:?}", data.params);
    println!("   Metrics: {:?}", data.metrics);

    println!(
        "\nRuns are stored under {}",
        tracker.config().runs_dir().display()
    );
    Ok(())
}
