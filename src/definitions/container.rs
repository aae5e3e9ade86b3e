// src/definitions/container.rs

//! Resolution of node definitions plus a dependency mapping into a
//! validated [`DependencyStructure`] and the map of materialized nodes.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::definitions::dependency::{DependencyMapping, InputDependencies, NodeInvocation};
use crate::definitions::node::{Node, NodeHeader};
use crate::definitions::node_def::{check_valid_name, NodeDefinition};
use crate::definitions::structure::DependencyStructure;
use crate::errors::DefinitionError;

/// Materialized nodes keyed by node name (alias).
pub type NodeMap = BTreeMap<String, Node>;

/// Cross-reference tables between aliases and definition names.
///
/// Built once from the normalized mapping and only read afterwards.
#[derive(Debug, Default)]
struct AliasIndex {
    name_to_aliases: BTreeMap<String, BTreeSet<String>>,
    alias_to_invocation: BTreeMap<String, NodeInvocation>,
    alias_to_name: BTreeMap<String, String>,
}

impl AliasIndex {
    fn build(invocations: &[NodeInvocation]) -> Self {
        let mut index = AliasIndex::default();
        for invocation in invocations {
            let alias = invocation.alias_or_name().to_string();
            index
                .name_to_aliases
                .entry(invocation.name.clone())
                .or_default()
                .insert(alias.clone());
            index
                .alias_to_name
                .insert(alias.clone(), invocation.name.clone());
            index.alias_to_invocation.insert(alias, invocation.clone());
        }
        index
    }
}

/// Build the execution structure for one graph.
///
/// For example, with definitions `giver` and `sleeper` and the mapping
///
/// ```text
/// giver                      -> {}
/// sleeper as sleeper_1       -> { units: giver.out_1 }
/// sleeper as sleeper_2       -> { units: giver.out_2 }
/// total                      -> { in_1: sleeper_1.total, in_2: sleeper_2.total }
/// ```
///
/// the node map holds `giver`, `sleeper_1`, `sleeper_2` and `total`, with
/// both sleepers sharing one definition.
///
/// Validation fails fast on the first problem, scanning nodes in mapping
/// order and inputs in declaration order.
pub fn create_execution_structure(
    node_defs: &[Arc<NodeDefinition>],
    dependencies: DependencyMapping,
    graph_name: &str,
) -> Result<(DependencyStructure, NodeMap), DefinitionError> {
    // Normalize keys and re-key the mapping by alias.
    let mut invocations: Vec<NodeInvocation> = Vec::with_capacity(dependencies.len());
    let mut aliased_dependencies: Vec<(String, InputDependencies)> =
        Vec::with_capacity(dependencies.len());
    let mut seen_aliases = BTreeSet::new();

    for (key, inputs) in dependencies {
        let invocation = key.into_invocation();
        let alias = invocation.alias_or_name().to_string();
        check_valid_name(&alias)?;

        if !seen_aliases.insert(alias.clone()) {
            return Err(DefinitionError::DuplicateAlias { alias });
        }

        trace!(graph = %graph_name, node = %invocation.name, alias = %alias, "normalized invocation");
        invocations.push(invocation);
        aliased_dependencies.push((alias, inputs));
    }

    let index = AliasIndex::build(&invocations);
    let node_dict = build_node_dict(node_defs, &index, graph_name)?;

    validate_dependencies(&aliased_dependencies, &node_dict, &index.alias_to_name)?;

    let structure = DependencyStructure::from_definitions(&node_dict, &aliased_dependencies);

    debug!(
        graph = %graph_name,
        nodes = node_dict.len(),
        edges = structure.edge_count(),
        "built execution structure"
    );

    Ok((structure, node_dict))
}

/// One node per (definition, alias). Definitions the mapping never mentions
/// are placed once under their own name.
fn build_node_dict(
    node_defs: &[Arc<NodeDefinition>],
    index: &AliasIndex,
    graph_name: &str,
) -> Result<NodeMap, DefinitionError> {
    let mut nodes = NodeMap::new();

    for node_def in node_defs {
        let default_use = BTreeSet::from([node_def.name().to_string()]);
        let uses = index
            .name_to_aliases
            .get(node_def.name())
            .unwrap_or(&default_use);

        for alias in uses {
            let invocation = index.alias_to_invocation.get(alias);
            let header = NodeHeader {
                name: alias.clone(),
                graph_name: graph_name.to_string(),
                tags: invocation.map(|i| i.tags.clone()).unwrap_or_default(),
                hook_defs: invocation.map(|i| i.hook_defs.clone()).unwrap_or_default(),
                retry_policy: invocation.and_then(|i| i.retry_policy.clone()),
            };

            let node = Node::new(header, Arc::clone(node_def));
            if let Some(existing) = nodes.insert(alias.clone(), node) {
                let existing_name = existing.definition().name().to_string();
                let (definition, other) = if node_def.name() != alias {
                    (node_def.name().to_string(), existing_name)
                } else {
                    (existing_name, node_def.name().to_string())
                };
                return Err(DefinitionError::AliasCollision {
                    alias: alias.clone(),
                    definition,
                    other,
                });
            }
        }
    }

    Ok(nodes)
}

fn validate_dependencies(
    dependencies: &[(String, InputDependencies)],
    node_dict: &NodeMap,
    alias_to_name: &BTreeMap<String, String>,
) -> Result<(), DefinitionError> {
    for (from_node, dep_by_input) in dependencies {
        for (from_input, dep_def) in dep_by_input {
            for dep in dep_def.node_dependencies() {
                if *from_node == dep.node {
                    return Err(DefinitionError::CircularReference {
                        node: from_node.clone(),
                        input: from_input.clone(),
                    });
                }

                let Some(node) = node_dict.get(from_node) else {
                    let aliased = alias_to_name
                        .get(from_node)
                        .map(String::as_str)
                        .unwrap_or(from_node.as_str());
                    if aliased == from_node {
                        return Err(DefinitionError::UnknownNode {
                            node: from_node.clone(),
                        });
                    }
                    return Err(DefinitionError::UnknownAliasedNode {
                        definition: aliased.to_string(),
                        alias: from_node.clone(),
                    });
                };

                let Some(input_def) = node.definition().input_def_named(from_input) else {
                    return Err(DefinitionError::MissingInput {
                        kind: node.definition().kind_label(),
                        node: from_node.clone(),
                        input: from_input.clone(),
                        available: node.definition().input_names(),
                    });
                };

                let Some(upstream) = node_dict.get(&dep.node) else {
                    return Err(DefinitionError::UnknownDependencyNode {
                        node: dep.node.clone(),
                        from_node: from_node.clone(),
                        from_input: from_input.clone(),
                    });
                };

                if !upstream.definition().has_output(&dep.output) {
                    return Err(DefinitionError::MissingOutput {
                        node: dep.node.clone(),
                        output: dep.output.clone(),
                        from_node: from_node.clone(),
                        from_input: from_input.clone(),
                    });
                }

                if dep_def.is_fan_in() && !input_def.port_type.supports_fan_in() {
                    return Err(DefinitionError::FanInNotSupported {
                        node: from_node.clone(),
                        input: input_def.name.clone(),
                        type_name: input_def.port_type.display_name(),
                    });
                }
            }
        }
    }

    Ok(())
}
