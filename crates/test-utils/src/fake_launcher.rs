use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use opgraph::instance::{Run, RunLauncher};
use opgraph::types::{CheckRunHealthResult, WorkerStatus};

/// What `terminate` should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminateBehavior {
    Succeed,
    /// Return `Ok(false)`.
    Refuse,
    /// Return an error with this message.
    Fail(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherCall {
    CheckHealth(String),
    Resume { run_id: String, attempt_number: u32 },
    Terminate(String),
}

#[derive(Debug)]
struct LauncherState {
    health: HashMap<String, CheckRunHealthResult>,
    terminate: TerminateBehavior,
    calls: Vec<LauncherCall>,
}

/// A launcher that:
/// - reports `RUNNING` for every run unless told otherwise
/// - records every call it receives.
#[derive(Debug)]
pub struct FakeRunLauncher {
    supports_health_check: bool,
    supports_resume: bool,
    state: Mutex<LauncherState>,
}

impl FakeRunLauncher {
    pub fn new() -> Self {
        Self {
            supports_health_check: true,
            supports_resume: true,
            state: Mutex::new(LauncherState {
                health: HashMap::new(),
                terminate: TerminateBehavior::Succeed,
                calls: Vec::new(),
            }),
        }
    }

    pub fn without_health_check(mut self) -> Self {
        self.supports_health_check = false;
        self
    }

    pub fn without_resume(mut self) -> Self {
        self.supports_resume = false;
        self
    }

    pub fn set_health(&self, run_id: &str, status: WorkerStatus, msg: Option<&str>) {
        let result = match msg {
            Some(m) => CheckRunHealthResult::with_msg(status, m),
            None => CheckRunHealthResult::new(status),
        };
        self.state
            .lock()
            .unwrap()
            .health
            .insert(run_id.to_string(), result);
    }

    pub fn set_terminate_behavior(&self, behavior: TerminateBehavior) {
        self.state.lock().unwrap().terminate = behavior;
    }

    pub fn calls(&self) -> Vec<LauncherCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn terminate_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LauncherCall::Terminate(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn resume_calls(&self) -> Vec<(String, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                LauncherCall::Resume {
                    run_id,
                    attempt_number,
                } => Some((run_id, attempt_number)),
                _ => None,
            })
            .collect()
    }

    pub fn health_checks(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, LauncherCall::CheckHealth(_)))
            .count()
    }
}

impl Default for FakeRunLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLauncher for FakeRunLauncher {
    fn supports_check_run_worker_health(&self) -> bool {
        self.supports_health_check
    }

    fn check_run_worker_health(&self, run: &Run) -> Result<CheckRunHealthResult> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(LauncherCall::CheckHealth(run.run_id.clone()));
        Ok(state
            .health
            .get(&run.run_id)
            .cloned()
            .unwrap_or_else(|| CheckRunHealthResult::new(WorkerStatus::Running)))
    }

    fn supports_resume_run(&self) -> bool {
        self.supports_resume
    }

    fn resume_run(&self, run: &Run, attempt_number: u32) -> Result<()> {
        self.state.lock().unwrap().calls.push(LauncherCall::Resume {
            run_id: run.run_id.clone(),
            attempt_number,
        });
        Ok(())
    }

    fn terminate(&self, run_id: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(LauncherCall::Terminate(run_id.to_string()));
        match &state.terminate {
            TerminateBehavior::Succeed => Ok(true),
            TerminateBehavior::Refuse => Ok(false),
            TerminateBehavior::Fail(msg) => Err(anyhow!("{msg}")),
        }
    }
}
