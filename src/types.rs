use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    NotStarted,
    Queued,
    Starting,
    Started,
    Canceling,
    Canceled,
    Success,
    Failure,
}

/// Statuses the monitor looks at on every iteration.
pub const IN_PROGRESS_RUN_STATUSES: [RunStatus; 3] =
    [RunStatus::Starting, RunStatus::Started, RunStatus::Canceling];

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::NotStarted => "NOT_STARTED",
            RunStatus::Queued => "QUEUED",
            RunStatus::Starting => "STARTING",
            RunStatus::Started => "STARTED",
            RunStatus::Canceling => "CANCELING",
            RunStatus::Canceled => "CANCELED",
            RunStatus::Success => "SUCCESS",
            RunStatus::Failure => "FAILURE",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            RunStatus::Canceled | RunStatus::Success | RunStatus::Failure
        )
    }

    pub fn is_in_progress(&self) -> bool {
        IN_PROGRESS_RUN_STATUSES.contains(self)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NOT_STARTED" => Ok(RunStatus::NotStarted),
            "QUEUED" => Ok(RunStatus::Queued),
            "STARTING" => Ok(RunStatus::Starting),
            "STARTED" => Ok(RunStatus::Started),
            "CANCELING" => Ok(RunStatus::Canceling),
            "CANCELED" => Ok(RunStatus::Canceled),
            "SUCCESS" => Ok(RunStatus::Success),
            "FAILURE" => Ok(RunStatus::Failure),
            other => Err(format!("invalid run status: {other}")),
        }
    }
}

/// Liveness of the worker process executing a run, as seen by the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    Running,
    NotFound,
    Failed,
    Success,
    Unknown,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Running => "RUNNING",
            WorkerStatus::NotFound => "NOT_FOUND",
            WorkerStatus::Failed => "FAILED",
            WorkerStatus::Success => "SUCCESS",
            WorkerStatus::Unknown => "UNKNOWN",
        }
    }

    /// `Running` and `Success` need no intervention.
    pub fn is_healthy(&self) -> bool {
        matches!(self, WorkerStatus::Running | WorkerStatus::Success)
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time worker health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunHealthResult {
    pub status: WorkerStatus,
    pub msg: Option<String>,
}

impl CheckRunHealthResult {
    pub fn new(status: WorkerStatus) -> Self {
        Self { status, msg: None }
    }

    pub fn with_msg(status: WorkerStatus, msg: impl Into<String>) -> Self {
        Self {
            status,
            msg: Some(msg.into()),
        }
    }
}

impl fmt::Display for CheckRunHealthResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.msg {
            Some(msg) => write!(f, "{}: '{}'", self.status, msg),
            None => write!(f, "{}", self.status),
        }
    }
}

/// Why a run ended up failed or canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunFailureReason {
    UnexpectedTermination,
    RunException,
    StepFailure,
    StartTimeout,
    TimedOut,
    Unknown,
}

impl fmt::Display for RunFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunFailureReason::UnexpectedTermination => "UNEXPECTED_TERMINATION",
            RunFailureReason::RunException => "RUN_EXCEPTION",
            RunFailureReason::StepFailure => "STEP_FAILURE",
            RunFailureReason::StartTimeout => "START_TIMEOUT",
            RunFailureReason::TimedOut => "TIMED_OUT",
            RunFailureReason::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}
