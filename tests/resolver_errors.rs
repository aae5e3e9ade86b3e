// tests/resolver_errors.rs

mod common;
use crate::common::{init_tracing, op, OpBuilder, SleepyDefs};

use std::sync::Arc;

use opgraph::definitions::{
    create_execution_structure, DependencyDefinition, DependencyMapping, GraphDefinition,
    InputMapping, NodeDefinition, NodeInvocation, OutputMapping,
};
use opgraph::errors::DefinitionError;

fn resolve_err(defs: &[Arc<NodeDefinition>], mapping: DependencyMapping) -> DefinitionError {
    init_tracing();
    create_execution_structure(defs, mapping, "test_graph")
        .expect_err("resolution should fail")
}

#[test]
fn self_reference_is_a_circular_reference_naming_the_node() {
    let defs = vec![op("x", &["a"])];
    let mapping = DependencyMapping::new().with_inputs("x", [("a", DependencyDefinition::on("x"))]);

    let err = resolve_err(&defs, mapping);

    assert_eq!(
        err,
        DefinitionError::CircularReference {
            node: "x".to_string(),
            input: "a".to_string(),
        }
    );
    assert!(err.to_string().contains("circular reference detected in node \"x\""));
}

#[test]
fn self_reference_is_reported_before_a_missing_input() {
    let defs = vec![op("x", &["a"])];
    let mapping =
        DependencyMapping::new().with_inputs("x", [("not_an_input", DependencyDefinition::on("x"))]);

    let err = resolve_err(&defs, mapping);

    assert!(
        matches!(err, DefinitionError::CircularReference { ref node, .. } if node == "x"),
        "got {err:?}"
    );
}

#[test]
fn unknown_node_in_mapping_is_rejected() {
    let sleepy = SleepyDefs::new();
    let mapping = DependencyMapping::new()
        .with_inputs("ghost", [("units", DependencyDefinition::new("giver", "out_1"))]);

    let err = resolve_err(&sleepy.all(), mapping);

    assert_eq!(
        err,
        DefinitionError::UnknownNode {
            node: "ghost".to_string()
        }
    );
}

#[test]
fn unknown_aliased_node_names_the_alias_relationship() {
    let sleepy = SleepyDefs::new();
    let mapping = DependencyMapping::new().with_inputs(
        NodeInvocation::aliased("napper", "napper_1"),
        [("units", DependencyDefinition::new("giver", "out_1"))],
    );

    let err = resolve_err(&sleepy.all(), mapping);

    assert_eq!(
        err,
        DefinitionError::UnknownAliasedNode {
            definition: "napper".to_string(),
            alias: "napper_1".to_string(),
        }
    );
    let msg = err.to_string();
    assert!(msg.contains("\"napper\""));
    assert!(msg.contains("aliased by \"napper_1\""));
}

#[test]
fn missing_input_lists_the_available_inputs() {
    let sleepy = SleepyDefs::new();
    let mapping = DependencyMapping::new()
        .node("giver")
        .with_inputs("total", [("in_3", DependencyDefinition::new("giver", "out_1"))]);

    let err = resolve_err(&sleepy.all(), mapping);

    assert_eq!(
        err,
        DefinitionError::MissingInput {
            kind: "op",
            node: "total".to_string(),
            input: "in_3".to_string(),
            available: vec!["in_1".to_string(), "in_2".to_string()],
        }
    );
    assert!(err.to_string().contains("Available inputs: [\"in_1\", \"in_2\"]"));
}

#[test]
fn unknown_upstream_node_is_rejected() {
    let sleepy = SleepyDefs::new();
    let mapping = DependencyMapping::new()
        .with_inputs("total", [("in_1", DependencyDefinition::new("nobody", "total"))]);

    let err = resolve_err(&sleepy.all(), mapping);

    assert_eq!(
        err,
        DefinitionError::UnknownDependencyNode {
            node: "nobody".to_string(),
            from_node: "total".to_string(),
            from_input: "in_1".to_string(),
        }
    );
}

#[test]
fn missing_upstream_output_is_rejected() {
    let sleepy = SleepyDefs::new();
    let mapping = DependencyMapping::new()
        .node("giver")
        .with_inputs("total", [("in_1", DependencyDefinition::on("giver"))]);

    let err = resolve_err(&sleepy.all(), mapping);

    assert_eq!(
        err,
        DefinitionError::MissingOutput {
            node: "giver".to_string(),
            output: "result".to_string(),
            from_node: "total".to_string(),
            from_input: "in_1".to_string(),
        }
    );
}

#[test]
fn fan_in_onto_a_scalar_input_is_rejected() {
    let sleepy = SleepyDefs::new();
    let mapping = DependencyMapping::new().node("giver").with_inputs(
        "total",
        [(
            "in_1",
            DependencyDefinition::fan_in([("giver", "out_1"), ("giver", "out_2")]),
        )],
    );

    let err = resolve_err(&sleepy.all(), mapping);

    assert_eq!(
        err,
        DefinitionError::FanInNotSupported {
            node: "total".to_string(),
            input: "in_1".to_string(),
            type_name: "Int".to_string(),
        }
    );
    assert!(err.to_string().contains("Use the List type"));
}

#[test]
fn duplicate_alias_is_rejected() {
    let sleepy = SleepyDefs::new();
    let mapping = DependencyMapping::new()
        .node("giver")
        .with_inputs(
            NodeInvocation::aliased("sleeper", "nap"),
            [("units", DependencyDefinition::new("giver", "out_1"))],
        )
        .with_inputs(
            NodeInvocation::aliased("sleeper", "nap"),
            [("units", DependencyDefinition::new("giver", "out_2"))],
        );

    let err = resolve_err(&sleepy.all(), mapping);

    assert_eq!(
        err,
        DefinitionError::DuplicateAlias {
            alias: "nap".to_string()
        }
    );
}

#[test]
fn alias_colliding_with_another_definition_is_rejected() {
    let sleepy = SleepyDefs::new();
    let mapping = DependencyMapping::new().node(NodeInvocation::aliased("sleeper", "giver"));

    let err = resolve_err(&sleepy.all(), mapping);

    assert_eq!(
        err,
        DefinitionError::AliasCollision {
            alias: "giver".to_string(),
            definition: "sleeper".to_string(),
            other: "giver".to_string(),
        }
    );
}

#[test]
fn invalid_alias_name_is_rejected() {
    let defs = vec![op("x", &[])];
    let mapping = DependencyMapping::new().node(NodeInvocation::aliased("x", "not-valid"));

    let err = resolve_err(&defs, mapping);

    assert_eq!(
        err,
        DefinitionError::InvalidName {
            name: "not-valid".to_string()
        }
    );
}

#[test]
fn first_problem_in_mapping_order_wins() {
    let sleepy = SleepyDefs::new();
    let mapping = DependencyMapping::new()
        .with_inputs("total", [("in_9", DependencyDefinition::new("giver", "out_1"))])
        .with_inputs("ghost", [("units", DependencyDefinition::new("giver", "out_1"))]);

    let err = resolve_err(&sleepy.all(), mapping);

    assert!(
        matches!(err, DefinitionError::MissingInput { ref input, .. } if input == "in_9"),
        "got {err:?}"
    );
}

#[test]
fn two_node_cycle_is_rejected_by_the_graph() {
    init_tracing();
    let defs = vec![op("a", &["x"]), op("b", &["y"])];
    let mapping = DependencyMapping::new()
        .with_inputs("a", [("x", DependencyDefinition::on("b"))])
        .with_inputs("b", [("y", DependencyDefinition::on("a"))]);

    let err = GraphDefinition::new("loop", defs, mapping, vec![], vec![])
        .expect_err("cycle should be rejected");

    match err {
        DefinitionError::DependencyCycle { graph, node } => {
            assert_eq!(graph, "loop");
            assert!(node == "a" || node == "b", "unexpected cycle node {node}");
        }
        other => panic!("expected DependencyCycle, got {other:?}"),
    }
}

#[test]
fn graph_rejects_the_same_definition_twice() {
    init_tracing();
    let x = op("x", &[]);
    let err = GraphDefinition::new(
        "g",
        vec![Arc::clone(&x), x],
        DependencyMapping::new(),
        vec![],
        vec![],
    )
    .unwrap_err();

    assert_eq!(
        err,
        DefinitionError::DuplicateDefinition {
            graph: "g".to_string(),
            name: "x".to_string(),
        }
    );
}

#[test]
fn graph_rejects_mappings_to_unknown_ports() {
    init_tracing();
    let sleepy = SleepyDefs::new();

    let err = GraphDefinition::new(
        "g",
        sleepy.all(),
        sleepy.mapping(),
        vec![InputMapping::new("seed", "giver", "units")],
        vec![],
    )
    .unwrap_err();
    assert!(
        matches!(err, DefinitionError::InvalidMapping { kind: "input", .. }),
        "got {err:?}"
    );

    let err = GraphDefinition::new(
        "g",
        sleepy.all(),
        sleepy.mapping(),
        vec![],
        vec![OutputMapping::new("answer", "nowhere", "result")],
    )
    .unwrap_err();
    assert!(
        matches!(err, DefinitionError::InvalidMapping { kind: "output", .. }),
        "got {err:?}"
    );
}

#[test]
fn op_rejects_duplicate_ports_and_bad_names() {
    let err = opgraph::definitions::OpDefinition::new(
        "dup",
        vec![
            opgraph::definitions::InputDefinition::new("a", Default::default()),
            opgraph::definitions::InputDefinition::new("a", Default::default()),
        ],
        vec![],
    )
    .unwrap_err();
    assert_eq!(
        err,
        DefinitionError::DuplicatePort {
            definition: "dup".to_string(),
            kind: "input",
            name: "a".to_string(),
        }
    );

    let err = opgraph::definitions::OpDefinition::new("has space", vec![], vec![]).unwrap_err();
    assert!(matches!(err, DefinitionError::InvalidName { .. }));

    // The builder goes through the same checks.
    let ok = OpBuilder::new("fine").input("a").build_op();
    assert_eq!(ok.output_defs.len(), 1);
    assert_eq!(ok.output_defs[0].name, "result");
}
