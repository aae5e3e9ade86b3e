// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `opgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "opgraph",
    version,
    about = "Resolve and snapshot op graphs; supervise in-flight runs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). Defaults apply when it does not exist.
    #[arg(long, value_name = "PATH", default_value = "Opgraph.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `OPGRAPH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve a graph document and print its execution structure.
    Check {
        /// Graph document; defaults to `[graph].document` from the config.
        #[arg(value_name = "GRAPH")]
        graph: Option<PathBuf>,
    },

    /// Print the JSON snapshot of a graph document's job.
    Snapshot {
        #[arg(value_name = "GRAPH")]
        graph: Option<PathBuf>,

        /// Pretty-print the JSON.
        #[arg(long)]
        pretty: bool,

        /// Write to this file instead of stdout.
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the effective run monitoring settings.
    Config,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
