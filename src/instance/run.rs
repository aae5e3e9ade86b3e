// src/instance/run.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::MonitorError;
use crate::types::RunStatus;

/// Tag overriding the default maximum runtime of a run, in seconds.
pub const MAX_RUNTIME_SECONDS_TAG: &str = "dagster/max_runtime";

/// One durable execution of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub job_name: String,
    pub status: RunStatus,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Run {
    pub fn new(run_id: impl Into<String>, job_name: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            job_name: job_name.into(),
            status: RunStatus::NotStarted,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Max runtime from the run's tag, if set.
    ///
    /// The tag holds seconds as a numeric string; anything else is an error.
    pub fn max_runtime_seconds(&self) -> Result<Option<f64>, MonitorError> {
        let Some(raw) = self.tags.get(MAX_RUNTIME_SECONDS_TAG) else {
            return Ok(None);
        };
        match raw.trim().parse::<f64>() {
            Ok(secs) if secs.is_finite() => Ok(Some(secs)),
            _ => Err(MonitorError::InvalidTag {
                tag: MAX_RUNTIME_SECONDS_TAG.to_string(),
                run_id: self.run_id.clone(),
                value: raw.clone(),
            }),
        }
    }
}

/// A run plus storage-maintained timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run: Run,
    pub create_timestamp: DateTime<Utc>,
    pub update_timestamp: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl RunRecord {
    pub fn new(run: Run, create_timestamp: DateTime<Utc>) -> Self {
        Self {
            run,
            create_timestamp,
            update_timestamp: create_timestamp,
            start_time: None,
            end_time: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run.run_id
    }

    pub fn status(&self) -> RunStatus {
        self.run.status
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub run_id: String,
    pub launch_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Selects runs from storage. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunsFilter {
    pub statuses: Vec<RunStatus>,
    pub run_ids: Vec<String>,
    pub job_name: Option<String>,
}

impl RunsFilter {
    pub fn with_statuses(statuses: impl IntoIterator<Item = RunStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn matches(&self, run: &Run) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&run.status))
            && (self.run_ids.is_empty() || self.run_ids.contains(&run.run_id))
            && self
                .job_name
                .as_ref()
                .is_none_or(|name| *name == run.job_name)
    }
}
