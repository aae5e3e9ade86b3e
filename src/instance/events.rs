// src/instance/events.rs

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error_info::SerializableErrorInfo;

/// Message of the engine event recorded each time a run is resumed with a
/// new worker. Resume attempts are counted by exact match on this message.
pub const RESUME_RUN_LOG_MESSAGE: &str = "Launching a new run worker to resume run";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunEventType {
    EngineEvent,
    RunStart,
    RunSuccess,
    RunFailure,
    RunCanceled,
}

impl fmt::Display for RunEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunEventType::EngineEvent => "ENGINE_EVENT",
            RunEventType::RunStart => "RUN_START",
            RunEventType::RunSuccess => "RUN_SUCCESS",
            RunEventType::RunFailure => "RUN_FAILURE",
            RunEventType::RunCanceled => "RUN_CANCELED",
        };
        f.write_str(s)
    }
}

/// Extra payload attached to an engine event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEventData {
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub error: Option<SerializableErrorInfo>,
}

impl EngineEventData {
    pub fn engine_error(error: SerializableErrorInfo) -> Self {
        Self {
            metadata: BTreeMap::new(),
            error: Some(error),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// One append-only entry in a run's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: RunEventType,
    pub message: String,
    #[serde(default)]
    pub data: Option<EngineEventData>,
}

impl EventLogEntry {
    pub fn is_engine_event(&self) -> bool {
        self.event_type == RunEventType::EngineEvent
    }
}
