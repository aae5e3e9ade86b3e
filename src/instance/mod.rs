// src/instance/mod.rs

//! Collaborator interfaces consumed by the run monitor.
//!
//! - [`RunStorage`]: read access to run records, stats and event logs.
//! - [`RunLauncher`]: worker health checks, termination and resumption.
//! - [`Instance`]: the transition authority. Every status change the monitor
//!   makes goes through it so the event log stays append-only.
//! - [`WorkspaceProcessContext`] / [`Workspace`]: deployment state used when
//!   resuming runs.
//!
//! [`memory::InMemoryInstance`] implements storage and transitions in memory.

pub mod events;
pub mod memory;
pub mod run;

use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Result;

use crate::types::{CheckRunHealthResult, RunFailureReason};

pub use events::{EngineEventData, EventLogEntry, RunEventType, RESUME_RUN_LOG_MESSAGE};
pub use memory::{InMemoryInstance, InMemoryWorkspaceContext, ResumeRequest, StaticWorkspace};
pub use run::{Run, RunRecord, RunStats, RunsFilter, MAX_RUNTIME_SECONDS_TAG};

pub trait RunStorage: Send + Sync + Debug {
    /// Records matching `filter`, in storage order.
    fn get_run_records(&self, filter: &RunsFilter) -> Result<Vec<RunRecord>>;
    fn get_run_by_id(&self, run_id: &str) -> Result<Option<Run>>;
    fn get_run_stats(&self, run_id: &str) -> Result<RunStats>;
    /// Event log of a run, optionally restricted to one event type.
    fn all_logs(&self, run_id: &str, of_type: Option<RunEventType>) -> Result<Vec<EventLogEntry>>;
}

pub trait RunLauncher: Send + Sync + Debug {
    fn supports_check_run_worker_health(&self) -> bool;
    fn check_run_worker_health(&self, run: &Run) -> Result<CheckRunHealthResult>;

    fn supports_resume_run(&self) -> bool;
    /// Launch a fresh worker for an existing run.
    fn resume_run(&self, run: &Run, attempt_number: u32) -> Result<()>;

    /// Ask the worker of `run_id` to stop. `Ok(false)` means the launcher
    /// could not terminate it.
    fn terminate(&self, run_id: &str) -> Result<bool>;
}

pub trait Instance: RunStorage {
    fn run_launcher(&self) -> Arc<dyn RunLauncher>;

    fn report_engine_event(
        &self,
        message: &str,
        run: &Run,
        data: Option<EngineEventData>,
    ) -> Result<()>;

    fn report_run_failed(&self, run: &Run, message: &str) -> Result<()>;

    fn report_run_canceled(
        &self,
        run: &Run,
        message: &str,
        reason: RunFailureReason,
    ) -> Result<()>;

    fn resume_run(&self, run_id: &str, workspace: &dyn Workspace, attempt_number: u32)
    -> Result<()>;
}

/// Snapshot of deployment state for one monitoring iteration.
pub trait Workspace: Send + Sync + Debug {
    fn code_location_names(&self) -> Vec<String>;
}

pub trait WorkspaceProcessContext: Send + Sync {
    fn instance(&self) -> Arc<dyn Instance>;
    fn create_request_context(&self) -> Result<Arc<dyn Workspace>>;
}
