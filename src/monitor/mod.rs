// src/monitor/mod.rs

//! Run monitoring.
//!
//! - `handlers`: per-status policies for a single run.
//! - `core`: one monitoring iteration over every in-progress run.
//! - `daemon`: async loop invoking the iteration on a fixed interval.
//!
//! The monitor keeps no state between iterations. Resume attempts are
//! recounted from each run's event log every time.

pub mod core;
pub mod daemon;
pub mod handlers;

pub use self::core::execute_monitoring_iteration;
pub use daemon::{IterationSummary, MonitoringDaemon};
pub use handlers::{
    check_run_timeout, count_resume_run_attempts, monitor_started_run, monitor_starting_run,
};

pub use crate::instance::RESUME_RUN_LOG_MESSAGE;

pub const DEFAULT_START_TIMEOUT_SECONDS: u64 = 180;
pub const DEFAULT_MAX_RESUME_RUN_ATTEMPTS: u32 = 0;
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 120;
/// Twelve hours.
pub const DEFAULT_MAX_RUNTIME_SECONDS: u64 = 43_200;

/// Knobs consumed by the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub enabled: bool,
    pub start_timeout_seconds: u64,
    pub max_resume_run_attempts: u32,
    pub poll_interval_seconds: u64,
    /// Used when a run has no max-runtime tag.
    pub max_runtime_seconds: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            start_timeout_seconds: DEFAULT_START_TIMEOUT_SECONDS,
            max_resume_run_attempts: DEFAULT_MAX_RESUME_RUN_ATTEMPTS,
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECONDS,
            max_runtime_seconds: DEFAULT_MAX_RUNTIME_SECONDS,
        }
    }
}
