// tests/cli_render.rs

mod common;
use crate::common::{init_tracing, OpBuilder, SLEEPY_DOCUMENT};

use std::fs;

use clap::Parser;

use opgraph::cli::{CliArgs, Command};
use opgraph::definitions::{DependencyDefinition, DependencyMapping, GraphDefinition, GraphDocument};
use opgraph::monitor::MonitorSettings;
use opgraph::snap::GraphSnapshot;
use opgraph::{render_settings, render_structure};

#[test]
fn structure_lists_nodes_upstream_first_with_their_sources() {
    init_tracing();
    let document = GraphDocument::parse(SLEEPY_DOCUMENT).unwrap();

    let out = render_structure(document.job()).unwrap();
    let lines: Vec<&str> = out.lines().collect();

    assert_eq!(lines[0], "graph sleepy (4 nodes)");
    assert_eq!(lines[1], "  - giver [op giver]");
    assert!(lines.contains(&"  - sleeper_1 [op sleeper]"));
    assert!(lines.contains(&"      units <- giver.out_1"));
    assert!(lines.contains(&"      in_2 <- sleeper_2.total"));

    let total = lines.iter().position(|l| *l == "  - total [op total]").unwrap();
    let sleeper_2 = lines.iter().position(|l| *l == "  - sleeper_2 [op sleeper]").unwrap();
    assert!(sleeper_2 < total);
}

#[test]
fn fan_in_inputs_are_marked() {
    init_tracing();
    let giver = OpBuilder::new("giver").output("a").output("b").build();
    let collector = OpBuilder::new("collector").list_input("items").build();
    let graph = GraphDefinition::new(
        "collect",
        vec![giver, collector],
        DependencyMapping::new().with_inputs(
            "collector",
            [("items", DependencyDefinition::fan_in([("giver", "a"), ("giver", "b")]))],
        ),
        vec![],
        vec![],
    )
    .unwrap();

    let out = render_structure(&graph).unwrap();

    assert!(out.contains("      items <- fan-in [giver.a, giver.b]"));
}

#[test]
fn settings_render_one_key_per_line() {
    let out = render_settings(&MonitorSettings::default());

    assert_eq!(
        out,
        "run_monitoring.enabled = true\n\
         run_monitoring.start_timeout_seconds = 180\n\
         run_monitoring.max_resume_run_attempts = 0\n\
         run_monitoring.poll_interval_seconds = 120\n\
         run_monitoring.max_runtime_seconds = 43200\n"
    );
}

#[test]
fn cli_parses_global_flags_after_the_subcommand() {
    let args = CliArgs::try_parse_from([
        "opgraph",
        "snapshot",
        "job.toml",
        "--pretty",
        "--config",
        "custom.toml",
        "--log-level",
        "debug",
    ])
    .unwrap();

    assert_eq!(args.config, "custom.toml");
    assert!(args.log_level.is_some());
    match args.command {
        Command::Snapshot { graph, pretty, output } => {
            assert_eq!(graph.as_deref(), Some(std::path::Path::new("job.toml")));
            assert!(pretty);
            assert!(output.is_none());
        }
        other => panic!("expected snapshot, got {other:?}"),
    }
}

#[test]
fn snapshot_command_writes_json_to_the_output_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let graph_path = dir.path().join("sleepy.toml");
    let out_path = dir.path().join("snapshot.json");
    fs::write(&graph_path, SLEEPY_DOCUMENT).unwrap();

    let args = CliArgs::try_parse_from([
        "opgraph".to_string(),
        "--config".to_string(),
        dir.path().join("absent.toml").display().to_string(),
        "snapshot".to_string(),
        graph_path.display().to_string(),
        "--output".to_string(),
        out_path.display().to_string(),
    ])
    .unwrap();

    opgraph::run(args).unwrap();

    let json = fs::read_to_string(&out_path).unwrap();
    let snapshot = GraphSnapshot::from_json(&json).unwrap();
    assert_eq!(snapshot.name, "sleepy");
}

#[test]
fn check_without_a_document_is_an_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let args = CliArgs::try_parse_from([
        "opgraph".to_string(),
        "--config".to_string(),
        dir.path().join("absent.toml").display().to_string(),
        "check".to_string(),
    ])
    .unwrap();

    let err = opgraph::run(args).unwrap_err();

    assert!(err.to_string().contains("no graph document given"));
}
