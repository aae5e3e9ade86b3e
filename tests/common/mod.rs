#![allow(dead_code)]

pub use opgraph_test_utils::builders::{op, run, ConfigFileBuilder, MonitorHarness, OpBuilder};
pub use opgraph_test_utils::fake_launcher::{FakeRunLauncher, LauncherCall, TerminateBehavior};
pub use opgraph_test_utils::log_capture::capture_logs;
pub use opgraph_test_utils::init_tracing;

use std::sync::Arc;

use opgraph::definitions::{
    DependencyDefinition, DependencyMapping, NodeDefinition, NodeInvocation, PortType,
};

/// `giver` -> (`sleeper_1`, `sleeper_2`) -> `total`.
pub struct SleepyDefs {
    pub giver: Arc<NodeDefinition>,
    pub sleeper: Arc<NodeDefinition>,
    pub total: Arc<NodeDefinition>,
}

impl SleepyDefs {
    pub fn new() -> Self {
        let int = PortType::named("Int");
        Self {
            giver: OpBuilder::new("giver")
                .typed_output("out_1", int.clone())
                .typed_output("out_2", int.clone())
                .build(),
            sleeper: OpBuilder::new("sleeper")
                .typed_input("units", int.clone())
                .typed_output("total", int.clone())
                .build(),
            total: OpBuilder::new("total")
                .typed_input("in_1", int.clone())
                .typed_input("in_2", int)
                .build(),
        }
    }

    pub fn all(&self) -> Vec<Arc<NodeDefinition>> {
        vec![
            Arc::clone(&self.giver),
            Arc::clone(&self.sleeper),
            Arc::clone(&self.total),
        ]
    }

    pub fn mapping(&self) -> DependencyMapping {
        DependencyMapping::new()
            .node("giver")
            .with_inputs(
                NodeInvocation::aliased("sleeper", "sleeper_1"),
                [("units", DependencyDefinition::new("giver", "out_1"))],
            )
            .with_inputs(
                NodeInvocation::aliased("sleeper", "sleeper_2"),
                [("units", DependencyDefinition::new("giver", "out_2"))],
            )
            .with_inputs(
                "total",
                [
                    ("in_1", DependencyDefinition::new("sleeper_1", "total")),
                    ("in_2", DependencyDefinition::new("sleeper_2", "total")),
                ],
            )
    }
}

/// The sleepy graph as a TOML document.
pub const SLEEPY_DOCUMENT: &str = r#"
job = "sleepy"

[op.giver]
outputs = { out_1 = "Int", out_2 = "Int" }

[op.sleeper]
inputs = { units = "Int" }
outputs = { total = "Int" }

[op.total]
inputs = { in_1 = "Int", in_2 = "Int" }

[graph.sleepy]
nodes = ["giver", "sleeper", "total"]

[[graph.sleepy.dependencies]]
node = "giver"

[[graph.sleepy.dependencies]]
node = { name = "sleeper", alias = "sleeper_1" }
inputs = { units = { node = "giver", output = "out_1" } }

[[graph.sleepy.dependencies]]
node = { name = "sleeper", alias = "sleeper_2" }
inputs = { units = { node = "giver", output = "out_2" } }

[[graph.sleepy.dependencies]]
node = "total"
inputs = { in_1 = { node = "sleeper_1", output = "total" }, in_2 = { node = "sleeper_2", output = "total" } }
"#;
