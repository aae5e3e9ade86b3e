// src/lib.rs

pub mod cli;
pub mod config;
pub mod definitions;
pub mod error_info;
pub mod errors;
pub mod instance;
pub mod logging;
pub mod monitor;
pub mod snap;
pub mod types;

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::{load_or_default, ConfigFile};
use crate::definitions::{DependencyDefinition, GraphDefinition, GraphDocument};
use crate::monitor::MonitorSettings;
use crate::snap::GraphSnapshot;

/// High-level entry point used by `main.rs`.
pub fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)?;

    match args.command {
        Command::Check { graph } => {
            let document = load_document(graph.as_deref(), &cfg)?;
            print!("{}", render_structure(document.job())?);
        }
        Command::Snapshot {
            graph,
            pretty,
            output,
        } => {
            let document = load_document(graph.as_deref(), &cfg)?;
            let snapshot = GraphSnapshot::from_graph(document.job());
            let json = if pretty {
                snapshot.to_json_pretty()?
            } else {
                snapshot.to_json()?
            };
            info!(graph = %snapshot.name, id = %snapshot.snapshot_id()?, "built snapshot");

            match output {
                Some(path) => fs::write(&path, json.as_bytes())
                    .with_context(|| format!("writing snapshot to {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Command::Config => {
            print!("{}", render_settings(&cfg.monitor_settings()));
        }
    }

    Ok(())
}

fn load_document(path: Option<&Path>, cfg: &ConfigFile) -> Result<GraphDocument> {
    let path: PathBuf = match path {
        Some(p) => p.to_path_buf(),
        None => cfg.graph.document.clone().context(
            "no graph document given and no [graph].document configured",
        )?,
    };
    debug!(path = %path.display(), "loading graph document");
    GraphDocument::load(&path).with_context(|| format!("loading graph document {}", path.display()))
}

/// Human-readable execution structure: nodes in dependency order with the
/// outputs feeding each bound input.
pub fn render_structure(graph: &GraphDefinition) -> Result<String> {
    let structure = graph.dependency_structure();
    let order = structure
        .topological_order()
        .map_err(|node| anyhow::anyhow!("graph {} has a cycle through {node}", graph.name))?;

    let mut out = String::new();
    writeln!(out, "graph {} ({} nodes)", graph.name, order.len())?;

    for name in &order {
        let Some(node) = graph.node_named(name) else {
            continue;
        };
        writeln!(
            out,
            "  - {name} [{} {}]",
            node.definition().kind_label(),
            node.definition().name()
        )?;
        for (handle, dep) in structure.inputs_of(name) {
            let sources: Vec<String> = dep
                .node_dependencies()
                .iter()
                .map(ToString::to_string)
                .collect();
            match dep {
                DependencyDefinition::Single(_) => {
                    writeln!(out, "      {} <- {}", handle.input, sources.join(", "))?
                }
                DependencyDefinition::Multi(_) => {
                    writeln!(out, "      {} <- fan-in [{}]", handle.input, sources.join(", "))?
                }
            }
        }
    }

    Ok(out)
}

pub fn render_settings(settings: &MonitorSettings) -> String {
    format!(
        "run_monitoring.enabled = {}\n\
         run_monitoring.start_timeout_seconds = {}\n\
         run_monitoring.max_resume_run_attempts = {}\n\
         run_monitoring.poll_interval_seconds = {}\n\
         run_monitoring.max_runtime_seconds = {}\n",
        settings.enabled,
        settings.start_timeout_seconds,
        settings.max_resume_run_attempts,
        settings.poll_interval_seconds,
        settings.max_runtime_seconds,
    )
}
