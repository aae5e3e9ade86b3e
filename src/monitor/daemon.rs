// src/monitor/daemon.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error_info::SerializableErrorInfo;
use crate::errors::Result;
use crate::instance::WorkspaceProcessContext;
use crate::monitor::core::execute_monitoring_iteration;
use crate::monitor::MonitorSettings;

/// Outcome of one iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationSummary {
    /// Runs looked at.
    pub runs_checked: usize,
    pub errors: Vec<SerializableErrorInfo>,
}

impl IterationSummary {
    fn from_results(results: Vec<Option<SerializableErrorInfo>>) -> Self {
        let runs_checked = results.len();
        let errors = results.into_iter().flatten().collect();
        Self {
            runs_checked,
            errors,
        }
    }
}

/// Async shell around [`execute_monitoring_iteration`].
///
/// Each tick runs the (blocking) iteration on the blocking pool, so slow
/// collaborators never stall the runtime. Per-run errors are logged and
/// never stop the loop.
pub struct MonitoringDaemon {
    context: Arc<dyn WorkspaceProcessContext>,
    settings: MonitorSettings,
}

impl fmt::Debug for MonitoringDaemon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitoringDaemon")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl MonitoringDaemon {
    pub fn new(context: Arc<dyn WorkspaceProcessContext>, settings: MonitorSettings) -> Self {
        Self { context, settings }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Run a single iteration on the current thread.
    pub fn run_once(&self) -> IterationSummary {
        let results = execute_monitoring_iteration(self.context.as_ref(), &self.settings, Utc::now());
        let summary = IterationSummary::from_results(results);
        log_summary(&summary);
        summary
    }

    /// Iterate every `poll_interval_seconds` until `shutdown` flips to `true`
    /// or its sender is dropped. Returns the number of iterations run.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<usize> {
        if !self.settings.enabled {
            info!("run monitoring is disabled; daemon not started");
            return Ok(0);
        }

        let period = Duration::from_secs(self.settings.poll_interval_seconds.max(1));
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_interval_seconds = self.settings.poll_interval_seconds,
            "run monitoring daemon started"
        );

        let mut iterations = 0usize;
        if *shutdown.borrow() {
            info!("shutdown already requested; run monitoring daemon exiting");
            return Ok(iterations);
        }

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("shutdown requested; stopping run monitoring daemon");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.tick().await;
                    iterations += 1;
                }
            }
        }

        info!(iterations, "run monitoring daemon exiting");
        Ok(iterations)
    }

    async fn tick(&self) {
        let context = Arc::clone(&self.context);
        let settings = self.settings.clone();

        let handle = tokio::task::spawn_blocking(move || {
            execute_monitoring_iteration(context.as_ref(), &settings, Utc::now())
        });

        match handle.await {
            Ok(results) => log_summary(&IterationSummary::from_results(results)),
            Err(e) => error!("monitoring iteration panicked or was cancelled: {e}"),
        }
    }
}

fn log_summary(summary: &IterationSummary) {
    if summary.errors.is_empty() {
        debug!(runs = summary.runs_checked, "monitoring iteration complete");
    } else {
        warn!(
            runs = summary.runs_checked,
            errors = summary.errors.len(),
            "monitoring iteration complete with errors"
        );
    }
}
