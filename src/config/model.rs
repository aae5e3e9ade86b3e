// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::monitor::{
    MonitorSettings, DEFAULT_MAX_RESUME_RUN_ATTEMPTS, DEFAULT_MAX_RUNTIME_SECONDS,
    DEFAULT_POLL_INTERVAL_SECONDS, DEFAULT_START_TIMEOUT_SECONDS,
};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [run_monitoring]
/// enabled = true
/// start_timeout_seconds = 180
/// max_resume_run_attempts = 0
/// poll_interval_seconds = 120
/// max_runtime_seconds = 43200
///
/// [graph]
/// document = "pipeline.toml"
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub run_monitoring: RunMonitoringSection,

    #[serde(default)]
    pub graph: GraphSection,
}

/// `[run_monitoring]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunMonitoringSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds a run may stay STARTING before it is marked failed.
    #[serde(default = "default_start_timeout_seconds")]
    pub start_timeout_seconds: u64,

    /// How many times a run with an unhealthy worker is resumed before it is
    /// marked failed.
    #[serde(default = "default_max_resume_run_attempts")]
    pub max_resume_run_attempts: u32,

    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Default for runs without a `dagster/max_runtime` tag.
    #[serde(default = "default_max_runtime_seconds")]
    pub max_runtime_seconds: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_start_timeout_seconds() -> u64 {
    DEFAULT_START_TIMEOUT_SECONDS
}

fn default_max_resume_run_attempts() -> u32 {
    DEFAULT_MAX_RESUME_RUN_ATTEMPTS
}

fn default_poll_interval_seconds() -> u64 {
    DEFAULT_POLL_INTERVAL_SECONDS
}

fn default_max_runtime_seconds() -> u64 {
    DEFAULT_MAX_RUNTIME_SECONDS
}

impl Default for RunMonitoringSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            start_timeout_seconds: default_start_timeout_seconds(),
            max_resume_run_attempts: default_max_resume_run_attempts(),
            poll_interval_seconds: default_poll_interval_seconds(),
            max_runtime_seconds: default_max_runtime_seconds(),
        }
    }
}

/// `[graph]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphSection {
    /// Graph document used when the CLI is not given one.
    #[serde(default)]
    pub document: Option<PathBuf>,
}

/// Validated configuration. Only constructed through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub run_monitoring: RunMonitoringSection,
    pub graph: GraphSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(run_monitoring: RunMonitoringSection, graph: GraphSection) -> Self {
        Self {
            run_monitoring,
            graph,
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        let section = &self.run_monitoring;
        MonitorSettings {
            enabled: section.enabled,
            start_timeout_seconds: section.start_timeout_seconds,
            max_resume_run_attempts: section.max_resume_run_attempts,
            poll_interval_seconds: section.poll_interval_seconds,
            max_runtime_seconds: section.max_runtime_seconds,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RunMonitoringSection::default(), GraphSection::default())
    }
}
