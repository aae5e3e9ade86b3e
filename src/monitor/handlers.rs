// src/monitor/handlers.rs

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error_info::SerializableErrorInfo;
use crate::errors::MonitorError;
use crate::instance::{
    EngineEventData, Instance, RunEventType, RunRecord, Workspace, RESUME_RUN_LOG_MESSAGE,
};
use crate::monitor::MonitorSettings;
use crate::types::{RunFailureReason, RunStatus};

fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

fn ensure_status(record: &RunRecord, expected: RunStatus) -> Result<()> {
    if record.status() != expected {
        return Err(MonitorError::UnexpectedRunStatus {
            status: record.status().to_string(),
        }
        .into());
    }
    Ok(())
}

/// Fail a run that has been STARTING for at least the start timeout.
///
/// Only applies when the launcher supports health checks. Runs stuck in
/// STARTING are never resumed.
pub fn monitor_starting_run(
    instance: &dyn Instance,
    record: &RunRecord,
    settings: &MonitorSettings,
    now: DateTime<Utc>,
) -> Result<()> {
    ensure_status(record, RunStatus::Starting)?;
    let run = &record.run;

    if !instance.run_launcher().supports_check_run_worker_health() {
        return Ok(());
    }

    let stats = instance.get_run_stats(&run.run_id)?;
    let launch_time = stats.launch_time.ok_or_else(|| MonitorError::MissingLaunchTime {
        run_id: run.run_id.clone(),
    })?;

    let elapsed = seconds_between(launch_time, now);
    if elapsed >= settings.start_timeout_seconds as f64 {
        let msg = format!(
            "Run {} has been running for {:.1} seconds, which is longer than the timeout of {} \
             seconds to start. Marking run failed",
            run.run_id, elapsed, settings.start_timeout_seconds
        );
        info!(run_id = %run.run_id, "{msg}");
        instance.report_run_failed(run, &msg)?;
    }

    Ok(())
}

/// Number of times the run has already been resumed with a new worker.
pub fn count_resume_run_attempts(instance: &dyn Instance, run_id: &str) -> Result<u32> {
    let events = instance.all_logs(run_id, Some(RunEventType::EngineEvent))?;
    let count = events
        .iter()
        .filter(|event| event.message == RESUME_RUN_LOG_MESSAGE)
        .count();
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

/// Resume or fail a STARTED run whose worker is unhealthy, then enforce its
/// maximum runtime. A run marked failed here is not checked for timeout.
pub fn monitor_started_run(
    instance: &dyn Instance,
    workspace: &dyn Workspace,
    record: &RunRecord,
    settings: &MonitorSettings,
    now: DateTime<Utc>,
) -> Result<()> {
    ensure_status(record, RunStatus::Started)?;
    let run = &record.run;
    let launcher = instance.run_launcher();

    if launcher.supports_check_run_worker_health() {
        let health = launcher.check_run_worker_health(run)?;

        if !health.status.is_healthy() {
            let num_prev_attempts = count_resume_run_attempts(instance, &run.run_id)?;

            let recheck = instance
                .get_run_by_id(&run.run_id)?
                .ok_or_else(|| MonitorError::RunNotFound {
                    run_id: run.run_id.clone(),
                })?;
            if recheck.status != run.status {
                info!(
                    run_id = %run.run_id,
                    "Detected run status changed during monitoring loop: {} -> {}, disregarding for now",
                    run.status,
                    recheck.status
                );
                return Ok(());
            }

            if num_prev_attempts < settings.max_resume_run_attempts {
                let msg = format!(
                    "Detected run worker status {health}. Resuming run {} with a new worker.",
                    run.run_id
                );
                info!(run_id = %run.run_id, "{msg}");
                instance.report_engine_event(&msg, run, None)?;
                instance.resume_run(&run.run_id, workspace, num_prev_attempts + 1)?;
            } else {
                let msg = if launcher.supports_resume_run() {
                    format!(
                        "Detected run worker status {health}. Marking run {} as failed, because it \
                         has surpassed the configured maximum attempts to resume the run: {}.",
                        run.run_id, settings.max_resume_run_attempts
                    )
                } else {
                    format!(
                        "Detected run worker status {health}. Marking run {} as failed.",
                        run.run_id
                    )
                };
                info!(run_id = %run.run_id, "{msg}");
                instance.report_run_failed(run, &msg)?;
                return Ok(());
            }
        }
    }

    check_run_timeout(instance, record, settings, now)
}

/// Terminate a run that has been running longer than its maximum runtime.
///
/// The limit comes from the run's max-runtime tag, else the configured
/// default; zero disables the check. If termination fails the run is forced
/// to CANCELED with reason `TIMED_OUT`.
pub fn check_run_timeout(
    instance: &dyn Instance,
    record: &RunRecord,
    settings: &MonitorSettings,
    now: DateTime<Utc>,
) -> Result<()> {
    let run = &record.run;
    let max_runtime = run
        .max_runtime_seconds()?
        .unwrap_or(settings.max_runtime_seconds as f64);

    if max_runtime <= 0.0 {
        return Ok(());
    }
    let Some(start_time) = record.start_time else {
        return Ok(());
    };

    if seconds_between(start_time, now) <= max_runtime {
        return Ok(());
    }

    info!(
        run_id = %run.run_id,
        "Run {} has exceeded maximum runtime of {} seconds: terminating run.",
        run.run_id,
        max_runtime
    );

    let terminated = instance
        .run_launcher()
        .terminate(&run.run_id)
        .and_then(|ok| {
            if ok {
                Ok(())
            } else {
                Err(anyhow!("Failed to terminate run {}", run.run_id))
            }
        });

    if let Err(err) = terminated {
        let error_info = SerializableErrorInfo::from_error(&err);
        warn!(run_id = %run.run_id, error = %err, "failed to terminate timed out run");
        instance.report_engine_event(
            "Exception while attempting to terminate run. Marking run as canceled.",
            run,
            Some(EngineEventData::engine_error(error_info)),
        )?;
        instance.report_run_canceled(
            run,
            &format!(
                "Run {} exceeded its maximum runtime of {} seconds and could not be terminated.",
                run.run_id, max_runtime
            ),
            RunFailureReason::TimedOut,
        )?;
    }

    Ok(())
}
