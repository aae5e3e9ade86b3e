// src/monitor/core.rs

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::error_info::SerializableErrorInfo;
use crate::errors::MonitorError;
use crate::instance::{Instance, RunRecord, RunsFilter, Workspace, WorkspaceProcessContext};
use crate::monitor::handlers::{monitor_started_run, monitor_starting_run};
use crate::monitor::MonitorSettings;
use crate::types::{RunStatus, IN_PROGRESS_RUN_STATUSES};

/// Run one monitoring pass over every in-progress run.
///
/// Returns one entry per monitored run, in storage order: `None` when the
/// run was checked without error, otherwise the error hit while checking it.
/// An error on one run never stops the others from being checked, and a run
/// whose check failed is left untouched until the next iteration.
///
/// Failing to list runs or to create the workspace yields a single error.
pub fn execute_monitoring_iteration(
    context: &dyn WorkspaceProcessContext,
    settings: &MonitorSettings,
    now: DateTime<Utc>,
) -> Vec<Option<SerializableErrorInfo>> {
    let instance = context.instance();

    let filter = RunsFilter::with_statuses(IN_PROGRESS_RUN_STATUSES);
    let records = match instance.get_run_records(&filter) {
        Ok(records) => records,
        Err(err) => {
            let info = SerializableErrorInfo::from_error(&err);
            error!("Hit error while fetching runs for monitoring: {info}");
            return vec![Some(info)];
        }
    };

    if records.is_empty() {
        debug!("no in-progress runs to monitor");
        return Vec::new();
    }

    info!("Collected {} runs for monitoring", records.len());

    let workspace = match context.create_request_context() {
        Ok(workspace) => workspace,
        Err(err) => {
            let info = SerializableErrorInfo::from_error(&err);
            error!("Hit error while creating workspace for monitoring: {info}");
            return vec![Some(info)];
        }
    };

    records
        .iter()
        .map(|record| {
            let run_id = record.run_id();
            info!(run_id = %run_id, "Checking run {run_id}");

            match monitor_run(instance.as_ref(), workspace.as_ref(), record, settings, now) {
                Ok(()) => None,
                Err(err) => {
                    let info = SerializableErrorInfo::from_error(&err);
                    error!(run_id = %run_id, "Hit error while monitoring run {run_id}: {info}");
                    Some(info)
                }
            }
        })
        .collect()
}

fn monitor_run(
    instance: &dyn Instance,
    workspace: &dyn Workspace,
    record: &RunRecord,
    settings: &MonitorSettings,
    now: DateTime<Utc>,
) -> Result<()> {
    match record.status() {
        RunStatus::Starting => monitor_starting_run(instance, record, settings, now),
        RunStatus::Started => monitor_started_run(instance, workspace, record, settings, now),
        // Canceling timeouts are not enforced.
        RunStatus::Canceling => Ok(()),
        other => Err(MonitorError::UnexpectedRunStatus {
            status: other.to_string(),
        }
        .into()),
    }
}
