// src/definitions/dependency.rs

//! Dependency declarations: node invocations, dependency definitions and the
//! typed dependency mapping consumed by the resolver.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Name of the output used when a dependency does not name one.
pub const DEFAULT_OUTPUT: &str = "result";

/// Retry behaviour attached to a single invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    #[serde(default, with = "opt_duration_secs")]
    pub delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay: None,
        }
    }
}

/// A request to place one instance of a node definition into a graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeInvocation {
    /// Name of the definition being invoked.
    pub name: String,
    /// Distinguishes several uses of the same definition.
    pub alias: Option<String>,
    pub tags: BTreeMap<String, String>,
    /// Names of hooks attached to this invocation.
    pub hook_defs: BTreeSet<String>,
    pub retry_policy: Option<RetryPolicy>,
}

impl NodeInvocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::new(name).with_alias(alias)
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_hook(mut self, hook: impl Into<String>) -> Self {
        self.hook_defs.insert(hook.into());
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// The name the materialized node will carry.
    pub fn alias_or_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Key of the top-level dependency mapping.
///
/// A bare name is shorthand for an invocation without alias, tags, hooks or
/// retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKey {
    Name(String),
    Invocation(NodeInvocation),
}

impl NodeKey {
    pub fn into_invocation(self) -> NodeInvocation {
        match self {
            NodeKey::Name(name) => NodeInvocation::new(name),
            NodeKey::Invocation(invocation) => invocation,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Name(name) => f.write_str(name),
            NodeKey::Invocation(inv) => match &inv.alias {
                Some(alias) => write!(f, "{} (alias {})", inv.name, alias),
                None => f.write_str(&inv.name),
            },
        }
    }
}

impl From<&str> for NodeKey {
    fn from(name: &str) -> Self {
        NodeKey::Name(name.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(name: String) -> Self {
        NodeKey::Name(name)
    }
}

impl From<NodeInvocation> for NodeKey {
    fn from(invocation: NodeInvocation) -> Self {
        NodeKey::Invocation(invocation)
    }
}

/// Handle to an input of a node within one graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeInput {
    pub node: String,
    pub input: String,
}

impl NodeInput {
    pub fn new(node: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            input: input.into(),
        }
    }
}

impl fmt::Display for NodeInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.input)
    }
}

/// Handle to an output of a node within one graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeOutput {
    pub node: String,
    pub output: String,
}

impl NodeOutput {
    pub fn new(node: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            output: output.into(),
        }
    }
}

impl fmt::Display for NodeOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.output)
    }
}

/// Declares where the value of one input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyDefinition {
    /// Satisfied by a single upstream output.
    Single(NodeOutput),
    /// Satisfied by a list of upstream outputs (fan-in).
    Multi(Vec<NodeOutput>),
}

impl DependencyDefinition {
    pub fn new(node: impl Into<String>, output: impl Into<String>) -> Self {
        DependencyDefinition::Single(NodeOutput::new(node, output))
    }

    /// Dependency on the default `result` output of `node`.
    pub fn on(node: impl Into<String>) -> Self {
        Self::new(node, DEFAULT_OUTPUT)
    }

    pub fn fan_in<I, N, O>(sources: I) -> Self
    where
        I: IntoIterator<Item = (N, O)>,
        N: Into<String>,
        O: Into<String>,
    {
        DependencyDefinition::Multi(
            sources
                .into_iter()
                .map(|(node, output)| NodeOutput::new(node, output))
                .collect(),
        )
    }

    pub fn is_fan_in(&self) -> bool {
        matches!(self, DependencyDefinition::Multi(_))
    }

    /// Every upstream output referenced by this definition.
    pub fn node_dependencies(&self) -> &[NodeOutput] {
        match self {
            DependencyDefinition::Single(output) => std::slice::from_ref(output),
            DependencyDefinition::Multi(outputs) => outputs,
        }
    }
}

/// Inputs of one node, keyed by input name, in declaration order.
pub type InputDependencies = IndexMap<String, DependencyDefinition>;

/// Typed dependency mapping: node key → input name → dependency definition.
///
/// Entries are kept in insertion order and duplicate keys are preserved so
/// the resolver can report them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencyMapping {
    entries: Vec<(NodeKey, InputDependencies)>,
}

impl DependencyMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with no declared input dependencies.
    pub fn node(self, key: impl Into<NodeKey>) -> Self {
        self.with(key, InputDependencies::new())
    }

    pub fn with(mut self, key: impl Into<NodeKey>, inputs: InputDependencies) -> Self {
        self.insert(key.into(), inputs);
        self
    }

    /// Builder helper: `mapping.with_inputs("sum", [("a", dep), ("b", dep)])`.
    pub fn with_inputs<I, S>(self, key: impl Into<NodeKey>, inputs: I) -> Self
    where
        I: IntoIterator<Item = (S, DependencyDefinition)>,
        S: Into<String>,
    {
        let inputs = inputs
            .into_iter()
            .map(|(name, dep)| (name.into(), dep))
            .collect();
        self.with(key, inputs)
    }

    pub fn insert(&mut self, key: NodeKey, inputs: InputDependencies) {
        self.entries.push((key, inputs));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(NodeKey, InputDependencies)> {
        self.entries.iter()
    }
}

impl IntoIterator for DependencyMapping {
    type Item = (NodeKey, InputDependencies);
    type IntoIter = std::vec::IntoIter<(NodeKey, InputDependencies)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

mod opt_duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        secs.map(|s| {
            Duration::try_from_secs_f64(s).map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
