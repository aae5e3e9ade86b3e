// tests/monitor_iteration.rs

mod common;
use crate::common::{capture_logs, init_tracing, run, MonitorHarness};

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::Level;

use opgraph::instance::{Instance, RunEventType, Workspace, WorkspaceProcessContext};
use opgraph::monitor::execute_monitoring_iteration;
use opgraph::types::RunStatus;

#[test]
fn mixed_runs_scenario() {
    init_tracing();
    let harness = MonitorHarness::new();
    harness.add_starting("starting_late", 600);
    harness.add_started("started_ok", 60);
    harness.add_run(run("canceling", RunStatus::Canceling), Some(30), Some(20));

    let (results, logs) = capture_logs(|| harness.iterate());

    assert_eq!(results, vec![None, None, None]);

    assert_eq!(harness.status("starting_late"), RunStatus::Failure);
    assert_eq!(harness.status("started_ok"), RunStatus::Started);
    assert_eq!(harness.status("canceling"), RunStatus::Canceling);

    let transitions: usize = ["starting_late", "started_ok", "canceling"]
        .iter()
        .map(|id| {
            harness
                .instance
                .events_for(id)
                .iter()
                .filter(|e| !e.is_engine_event())
                .count()
        })
        .sum();
    assert_eq!(transitions, 1);

    assert_eq!(
        logs.with_prefix("Checking run "),
        vec![
            "Checking run starting_late".to_string(),
            "Checking run started_ok".to_string(),
            "Checking run canceling".to_string(),
        ]
    );
    assert!(logs.contains("Collected 3 runs for monitoring"));
    assert!(logs.at_level(Level::ERROR).is_empty());
}

#[test]
fn no_in_progress_runs_yields_nothing() {
    init_tracing();
    let harness = MonitorHarness::new();
    harness.add_run(run("done", RunStatus::Success), Some(100), Some(90));
    harness.add_run(run("queued", RunStatus::Queued), None, None);

    let (results, logs) = capture_logs(|| harness.iterate());

    assert!(results.is_empty());
    assert!(harness.launcher.calls().is_empty());
    assert!(logs.with_prefix("Checking run").is_empty());
}

#[test]
fn one_bad_run_does_not_stop_the_others() {
    init_tracing();
    let harness = MonitorHarness::new();
    harness.add_run(run("no_launch_time", RunStatus::Starting), None, None);
    harness.add_starting("late", 1_000);

    let (results, logs) = capture_logs(|| harness.iterate());

    assert_eq!(results.len(), 2);
    assert!(results[0].is_some());
    assert!(results[1].is_none());
    assert_eq!(harness.status("late"), RunStatus::Failure);

    let errors = logs.at_level(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Hit error while monitoring run no_launch_time:"));
}

#[test]
fn start_timeout_records_only_a_failure_event() {
    init_tracing();
    let harness = MonitorHarness::new();
    harness.add_starting("r1", 1_000);

    harness.iterate();

    let types: Vec<RunEventType> = harness
        .instance
        .events_for("r1")
        .iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(types, vec![RunEventType::RunFailure]);
}

/// Context whose workspace cannot be loaded.
struct BrokenWorkspaceContext {
    instance: Arc<dyn Instance>,
}

impl WorkspaceProcessContext for BrokenWorkspaceContext {
    fn instance(&self) -> Arc<dyn Instance> {
        Arc::clone(&self.instance)
    }

    fn create_request_context(&self) -> Result<Arc<dyn Workspace>> {
        Err(anyhow!("code location unavailable"))
    }
}

#[test]
fn workspace_failure_yields_a_single_error() {
    init_tracing();
    let harness = MonitorHarness::new();
    harness.add_starting("r1", 1_000);
    harness.add_started("r2", 10);

    let context = BrokenWorkspaceContext {
        instance: harness.instance.clone(),
    };
    let results = execute_monitoring_iteration(&context, &harness.settings, harness.now);

    assert_eq!(results.len(), 1);
    let error = results[0].as_ref().unwrap();
    assert_eq!(error.message, "code location unavailable");
    assert_eq!(harness.status("r1"), RunStatus::Starting);
}
