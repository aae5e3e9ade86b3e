// src/instance/memory.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::events::{EngineEventData, EventLogEntry, RunEventType, RESUME_RUN_LOG_MESSAGE};
use super::run::{Run, RunRecord, RunStats, RunsFilter};
use super::{Instance, RunLauncher, RunStorage, Workspace, WorkspaceProcessContext};
use crate::types::{RunFailureReason, RunStatus};

/// A resume request accepted by [`InMemoryInstance::resume_run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeRequest {
    pub run_id: String,
    pub attempt_number: u32,
    pub code_locations: Vec<String>,
}

#[derive(Debug, Default)]
struct InstanceState {
    records: Vec<RunRecord>,
    launch_times: HashMap<String, DateTime<Utc>>,
    events: Vec<EventLogEntry>,
    resume_requests: Vec<ResumeRequest>,
}

impl InstanceState {
    fn record_mut(&mut self, run_id: &str) -> Result<&mut RunRecord> {
        self.records
            .iter_mut()
            .find(|r| r.run.run_id == run_id)
            .ok_or_else(|| anyhow!("run {run_id} not found"))
    }

    fn push_event(
        &mut self,
        run_id: &str,
        event_type: RunEventType,
        message: &str,
        data: Option<EngineEventData>,
    ) {
        self.events.push(EventLogEntry {
            run_id: run_id.to_string(),
            timestamp: Utc::now(),
            event_type,
            message: message.to_string(),
            data,
        });
    }

    fn transition(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        let record = self.record_mut(run_id)?;
        if record.run.status.is_finished() {
            bail!(
                "run {run_id} is already {} and cannot move to {status}",
                record.run.status
            );
        }
        let now = Utc::now();
        record.run.status = status;
        record.update_timestamp = now;
        if status.is_finished() {
            record.end_time = Some(now);
        }
        Ok(())
    }
}

/// Run storage and transition authority kept entirely in memory.
///
/// Writes are serialized through one mutex, so concurrent reporters observe
/// a consistent event log.
#[derive(Debug)]
pub struct InMemoryInstance {
    state: Mutex<InstanceState>,
    launcher: Arc<dyn RunLauncher>,
}

impl InMemoryInstance {
    pub fn new(launcher: Arc<dyn RunLauncher>) -> Self {
        Self {
            state: Mutex::new(InstanceState::default()),
            launcher,
        }
    }

    fn state(&self) -> MutexGuard<'_, InstanceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a run. Replaces any stored run with the same id.
    pub fn add_run(
        &self,
        run: Run,
        launch_time: Option<DateTime<Utc>>,
        start_time: Option<DateTime<Utc>>,
    ) {
        let created = launch_time.or(start_time).unwrap_or_else(Utc::now);
        let mut record = RunRecord::new(run, created);
        record.start_time = start_time;

        let mut state = self.state();
        let run_id = record.run.run_id.clone();
        state.records.retain(|r| r.run.run_id != run_id);
        match launch_time {
            Some(t) => {
                state.launch_times.insert(run_id.clone(), t);
            }
            None => {
                state.launch_times.remove(&run_id);
            }
        }
        state.records.push(record);
        debug!(run_id = %run_id, "stored run");
    }

    /// Change a run's status outside of the reporting interface, as an
    /// external process would.
    pub fn set_run_status(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.state().transition(run_id, status)
    }

    pub fn run_status(&self, run_id: &str) -> Option<RunStatus> {
        self.state()
            .records
            .iter()
            .find(|r| r.run.run_id == run_id)
            .map(RunRecord::status)
    }

    pub fn events_for(&self, run_id: &str) -> Vec<EventLogEntry> {
        self.state()
            .events
            .iter()
            .filter(|e| e.run_id == run_id)
            .cloned()
            .collect()
    }

    pub fn resume_requests(&self) -> Vec<ResumeRequest> {
        self.state().resume_requests.clone()
    }
}

impl RunStorage for InMemoryInstance {
    fn get_run_records(&self, filter: &RunsFilter) -> Result<Vec<RunRecord>> {
        Ok(self
            .state()
            .records
            .iter()
            .filter(|r| filter.matches(&r.run))
            .cloned()
            .collect())
    }

    fn get_run_by_id(&self, run_id: &str) -> Result<Option<Run>> {
        Ok(self
            .state()
            .records
            .iter()
            .find(|r| r.run.run_id == run_id)
            .map(|r| r.run.clone()))
    }

    fn get_run_stats(&self, run_id: &str) -> Result<RunStats> {
        let state = self.state();
        let record = state
            .records
            .iter()
            .find(|r| r.run.run_id == run_id)
            .ok_or_else(|| anyhow!("run {run_id} not found"))?;
        Ok(RunStats {
            run_id: run_id.to_string(),
            launch_time: state.launch_times.get(run_id).copied(),
            start_time: record.start_time,
            end_time: record.end_time,
        })
    }

    fn all_logs(&self, run_id: &str, of_type: Option<RunEventType>) -> Result<Vec<EventLogEntry>> {
        Ok(self
            .state()
            .events
            .iter()
            .filter(|e| e.run_id == run_id)
            .filter(|e| of_type.is_none_or(|t| e.event_type == t))
            .cloned()
            .collect())
    }
}

impl Instance for InMemoryInstance {
    fn run_launcher(&self) -> Arc<dyn RunLauncher> {
        Arc::clone(&self.launcher)
    }

    fn report_engine_event(
        &self,
        message: &str,
        run: &Run,
        data: Option<EngineEventData>,
    ) -> Result<()> {
        self.state()
            .push_event(&run.run_id, RunEventType::EngineEvent, message, data);
        Ok(())
    }

    fn report_run_failed(&self, run: &Run, message: &str) -> Result<()> {
        let mut state = self.state();
        state.transition(&run.run_id, RunStatus::Failure)?;
        state.push_event(&run.run_id, RunEventType::RunFailure, message, None);
        info!(run_id = %run.run_id, "run marked failed");
        Ok(())
    }

    fn report_run_canceled(
        &self,
        run: &Run,
        message: &str,
        reason: RunFailureReason,
    ) -> Result<()> {
        let mut state = self.state();
        state.transition(&run.run_id, RunStatus::Canceled)?;
        let data = EngineEventData::default().with_metadata("reason", reason.to_string());
        state.push_event(&run.run_id, RunEventType::RunCanceled, message, Some(data));
        info!(run_id = %run.run_id, %reason, "run marked canceled");
        Ok(())
    }

    fn resume_run(
        &self,
        run_id: &str,
        workspace: &dyn Workspace,
        attempt_number: u32,
    ) -> Result<()> {
        if !self.launcher.supports_resume_run() {
            bail!("the configured run launcher does not support resuming runs");
        }

        let run = self
            .get_run_by_id(run_id)?
            .ok_or_else(|| anyhow!("run {run_id} not found"))?;

        {
            let data = EngineEventData::default()
                .with_metadata("attempt_number", attempt_number.to_string());
            self.state().push_event(
                run_id,
                RunEventType::EngineEvent,
                RESUME_RUN_LOG_MESSAGE,
                Some(data),
            );
        }

        self.launcher.resume_run(&run, attempt_number)?;

        self.state().resume_requests.push(ResumeRequest {
            run_id: run_id.to_string(),
            attempt_number,
            code_locations: workspace.code_location_names(),
        });
        Ok(())
    }
}

/// A workspace with a fixed list of code locations.
#[derive(Debug, Clone, Default)]
pub struct StaticWorkspace {
    locations: Vec<String>,
}

impl StaticWorkspace {
    pub fn new(locations: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            locations: locations.into_iter().map(Into::into).collect(),
        }
    }
}

impl Workspace for StaticWorkspace {
    fn code_location_names(&self) -> Vec<String> {
        self.locations.clone()
    }
}

/// Process context handing out one shared [`StaticWorkspace`].
pub struct InMemoryWorkspaceContext {
    instance: Arc<dyn Instance>,
    workspace: Arc<StaticWorkspace>,
}

impl InMemoryWorkspaceContext {
    pub fn new(instance: Arc<dyn Instance>, workspace: StaticWorkspace) -> Self {
        Self {
            instance,
            workspace: Arc::new(workspace),
        }
    }
}

impl WorkspaceProcessContext for InMemoryWorkspaceContext {
    fn instance(&self) -> Arc<dyn Instance> {
        Arc::clone(&self.instance)
    }

    fn create_request_context(&self) -> Result<Arc<dyn Workspace>> {
        let workspace: Arc<dyn Workspace> = self.workspace.clone();
        Ok(workspace)
    }
}
