// tests/graph_document.rs

mod common;
use crate::common::{init_tracing, SLEEPY_DOCUMENT};

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use opgraph::definitions::{GraphDocument, NodeInput, NodeOutput, PortType};
use opgraph::errors::{DefinitionError, OpgraphError};

#[test]
fn load_sleepy_document_from_disk() {
    init_tracing();
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{SLEEPY_DOCUMENT}").unwrap();

    let document = GraphDocument::load(file.path()).unwrap();
    let job = document.job();

    assert_eq!(job.name, "sleepy");
    let nodes: Vec<&str> = job.nodes().keys().map(String::as_str).collect();
    assert_eq!(nodes, vec!["giver", "sleeper_1", "sleeper_2", "total"]);
    assert_eq!(
        job.dependency_structure()
            .upstream_outputs(&NodeInput::new("total", "in_2")),
        &[NodeOutput::new("sleeper_2", "total")]
    );

    let sleeper = document.op("sleeper").unwrap();
    assert!(Arc::ptr_eq(
        job.node_named("sleeper_1").unwrap().definition_arc(),
        sleeper
    ));
    assert_eq!(
        sleeper.input_def_named("units").unwrap().port_type,
        PortType::named("Int")
    );
}

#[test]
fn nodes_default_to_the_definitions_named_by_the_mapping() {
    init_tracing();
    let document = GraphDocument::parse(
        r#"
job = "chain"

[op.a]

[op.b]
inputs = { x = "Any" }

[op.unused]

[graph.chain.dependencies]
a = {}
b = { x = { node = "a" } }
"#,
    )
    .unwrap();

    let job = document.job();
    let nodes: Vec<&str> = job.nodes().keys().map(String::as_str).collect();
    assert_eq!(nodes, vec!["a", "b"]);
    assert!(document.op("unused").is_some());
}

#[test]
fn explicit_nodes_include_unmapped_definitions() {
    init_tracing();
    let document = GraphDocument::parse(
        r#"
job = "chain"

[op.a]

[op.b]
inputs = { x = "Any" }

[graph.chain]
nodes = ["a", "b"]
dependencies = { b = { x = { node = "a" } } }
"#,
    )
    .unwrap();

    let job = document.job();
    assert_eq!(job.nodes().len(), 2);
    assert_eq!(
        job.dependency_structure().topological_order().unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );
}

#[test]
fn detailed_ports_and_op_metadata() {
    init_tracing();
    let document = GraphDocument::parse(
        r#"
job = "fanout"

[op.split]
description = "Split the input"
tags = { kind = "io" }
required_resource_keys = ["s3", "db"]
inputs = { data = { type = "[Int]", description = "raw values" } }
outputs = { chunks = { type = "Int", dynamic = true }, skipped = { type = "Int?", required = false } }

[graph.fanout]
nodes = ["split"]
"#,
    )
    .unwrap();

    let split = document.op("split").unwrap();
    assert_eq!(split.description(), Some("Split the input"));
    assert_eq!(split.tags().get("kind").map(String::as_str), Some("io"));

    let data = split.input_def_named("data").unwrap();
    assert_eq!(data.port_type, PortType::list_of(PortType::named("Int")));
    assert_eq!(data.description.as_deref(), Some("raw values"));

    let chunks = split.output_def_named("chunks").unwrap();
    assert!(chunks.is_dynamic);
    assert!(chunks.is_required);

    let skipped = split.output_def_named("skipped").unwrap();
    assert!(!skipped.is_required);
    assert_eq!(
        skipped.port_type,
        PortType::optional_of(PortType::named("Int"))
    );
}

#[test]
fn graphs_can_contain_other_graphs() {
    init_tracing();
    let document = GraphDocument::parse(
        r#"
job = "outer"

[op.giver]
outputs = { out_1 = "Int" }

[op.sleeper]
inputs = { units = "Int" }
outputs = { total = "Int" }

[graph.outer]
nodes = ["giver", "pair"]
dependencies = { pair = { units = { node = "giver", output = "out_1" } } }
output_mappings = [{ graph_output = "total", node = "pair", output = "total" }]

[graph.pair]
nodes = ["sleeper"]
input_mappings = [{ graph_input = "units", node = "sleeper", input = "units" }]
output_mappings = [{ graph_output = "total", node = "sleeper", output = "total" }]
"#,
    )
    .unwrap();

    let outer = document.job();
    let pair = outer.node_named("pair").unwrap();
    assert!(pair.is_graph());
    assert_eq!(outer.output_defs()[0].name, "total");

    let mut graphs: Vec<&str> = document.graph_names().collect();
    graphs.sort_unstable();
    assert_eq!(graphs, vec!["outer", "pair"]);
    assert!(document.graph("pair").is_some());
}

fn document_error(src: &str) -> DefinitionError {
    init_tracing();
    match GraphDocument::parse(src) {
        Err(OpgraphError::Definition(err)) => err,
        Err(other) => panic!("expected a definition error, got {other:?}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[test]
fn job_must_name_a_declared_graph() {
    let err = document_error(
        r#"
job = "missing"

[op.a]

[graph.present]
nodes = ["a"]
"#,
    );
    assert!(matches!(err, DefinitionError::Document(ref msg) if msg.contains("missing")));
}

#[test]
fn names_cannot_be_both_op_and_graph() {
    let err = document_error(
        r#"
job = "a"

[op.a]

[graph.a]
"#,
    );
    assert!(
        matches!(err, DefinitionError::Document(ref msg) if msg.contains("both an op and a graph"))
    );
}

#[test]
fn unknown_node_names_are_rejected() {
    let err = document_error(
        r#"
job = "g"

[graph.g]
nodes = ["nope"]
"#,
    );
    assert!(
        matches!(err, DefinitionError::Document(ref msg) if msg.contains("neither an op nor a graph"))
    );
}

#[test]
fn self_containing_graphs_are_rejected() {
    let err = document_error(
        r#"
job = "g"

[graph.g]
nodes = ["h"]

[graph.h]
nodes = ["g"]
"#,
    );
    assert!(
        matches!(err, DefinitionError::Document(ref msg) if msg.contains("contains itself")),
        "got {err:?}"
    );
}

#[test]
fn resolver_errors_surface_through_documents() {
    let err = document_error(
        r#"
job = "g"

[op.a]
inputs = { x = "Any" }

[graph.g.dependencies.a]
x = { node = "a" }
"#,
    );
    assert_eq!(
        err,
        DefinitionError::CircularReference {
            node: "a".to_string(),
            input: "x".to_string(),
        }
    );
}

#[test]
fn malformed_toml_is_a_toml_error() {
    init_tracing();
    let err = GraphDocument::parse("job = ").unwrap_err();
    assert!(matches!(err, OpgraphError::TomlError(_)), "got {err:?}");
}

#[test]
fn missing_file_is_an_io_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let err = GraphDocument::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, OpgraphError::IoError(_)), "got {err:?}");
}
