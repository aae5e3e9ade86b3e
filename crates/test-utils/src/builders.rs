#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use opgraph::config::{ConfigFile, RawConfigFile};
use opgraph::definitions::{
    InputDefinition, NodeDefinition, OpDefinition, OutputDefinition, PortType,
};
use opgraph::error_info::SerializableErrorInfo;
use opgraph::instance::{
    InMemoryInstance, InMemoryWorkspaceContext, Instance, Run, StaticWorkspace,
};
use opgraph::monitor::{execute_monitoring_iteration, MonitorSettings};
use opgraph::types::RunStatus;

use crate::fake_launcher::FakeRunLauncher;

/// Builder for op definitions.
///
/// ```ignore
/// let sum = OpBuilder::new("sum").input("a").input("b").build();
/// ```
pub struct OpBuilder {
    name: String,
    inputs: Vec<InputDefinition>,
    outputs: Vec<OutputDefinition>,
}

impl OpBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Input of type `Any`.
    pub fn input(self, name: &str) -> Self {
        self.typed_input(name, PortType::Any)
    }

    pub fn typed_input(mut self, name: &str, port_type: PortType) -> Self {
        self.inputs.push(InputDefinition::new(name, port_type));
        self
    }

    /// Fan-in capable input (`[Any]`).
    pub fn list_input(self, name: &str) -> Self {
        self.typed_input(name, PortType::list_of(PortType::Any))
    }

    pub fn output(self, name: &str) -> Self {
        self.typed_output(name, PortType::Any)
    }

    pub fn typed_output(mut self, name: &str, port_type: PortType) -> Self {
        self.outputs.push(OutputDefinition::new(name, port_type));
        self
    }

    pub fn dynamic_output(mut self, name: &str) -> Self {
        self.outputs.push(OutputDefinition::dynamic(name, PortType::Any));
        self
    }

    pub fn build_op(self) -> OpDefinition {
        OpDefinition::new(self.name, self.inputs, self.outputs)
            .expect("Failed to build valid op from builder")
    }

    pub fn build(self) -> Arc<NodeDefinition> {
        Arc::new(NodeDefinition::Op(self.build_op()))
    }
}

/// Op with only the default `result` output and the given `Any` inputs.
pub fn op(name: &str, inputs: &[&str]) -> Arc<NodeDefinition> {
    inputs
        .iter()
        .fold(OpBuilder::new(name), |b, input| b.input(input))
        .build()
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn start_timeout(mut self, secs: u64) -> Self {
        self.config.run_monitoring.start_timeout_seconds = secs;
        self
    }

    pub fn max_resume_attempts(mut self, attempts: u32) -> Self {
        self.config.run_monitoring.max_resume_run_attempts = attempts;
        self
    }

    pub fn poll_interval(mut self, secs: u64) -> Self {
        self.config.run_monitoring.poll_interval_seconds = secs;
        self
    }

    pub fn max_runtime(mut self, secs: u64) -> Self {
        self.config.run_monitoring.max_runtime_seconds = secs;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.config.run_monitoring.enabled = false;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fake launcher + in-memory instance + workspace, wired together, with a
/// fixed "now" so elapsed times are exact.
pub struct MonitorHarness {
    pub launcher: Arc<FakeRunLauncher>,
    pub instance: Arc<InMemoryInstance>,
    pub context: Arc<InMemoryWorkspaceContext>,
    pub settings: MonitorSettings,
    pub now: DateTime<Utc>,
}

impl MonitorHarness {
    pub fn new() -> Self {
        Self::with_launcher(FakeRunLauncher::new())
    }

    pub fn with_launcher(launcher: FakeRunLauncher) -> Self {
        let launcher = Arc::new(launcher);
        let instance = Arc::new(InMemoryInstance::new(launcher.clone()));
        let dyn_instance: Arc<dyn Instance> = instance.clone();
        let context = Arc::new(InMemoryWorkspaceContext::new(
            dyn_instance,
            StaticWorkspace::new(["test_location"]),
        ));
        Self {
            launcher,
            instance,
            context,
            settings: MonitorSettings::default(),
            now: Utc::now(),
        }
    }

    pub fn settings(mut self, settings: MonitorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn seconds_ago(&self, secs: i64) -> DateTime<Utc> {
        self.now - Duration::seconds(secs)
    }

    /// Store a run launched `launched_secs_ago` and started `started_secs_ago`
    /// seconds before `now`.
    pub fn add_run(
        &self,
        run: Run,
        launched_secs_ago: Option<i64>,
        started_secs_ago: Option<i64>,
    ) {
        self.instance.add_run(
            run,
            launched_secs_ago.map(|s| self.seconds_ago(s)),
            started_secs_ago.map(|s| self.seconds_ago(s)),
        );
    }

    pub fn add_starting(&self, run_id: &str, launched_secs_ago: i64) {
        self.add_run(
            run(run_id, RunStatus::Starting),
            Some(launched_secs_ago),
            None,
        );
    }

    pub fn add_started(&self, run_id: &str, started_secs_ago: i64) {
        self.add_run(
            run(run_id, RunStatus::Started),
            Some(started_secs_ago + 1),
            Some(started_secs_ago),
        );
    }

    pub fn iterate(&self) -> Vec<Option<SerializableErrorInfo>> {
        execute_monitoring_iteration(self.context.as_ref(), &self.settings, self.now)
    }

    pub fn status(&self, run_id: &str) -> RunStatus {
        self.instance
            .run_status(run_id)
            .expect("run should exist in the harness instance")
    }
}

impl Default for MonitorHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn run(run_id: &str, status: RunStatus) -> Run {
    Run::new(run_id, "test_job").with_status(status)
}
