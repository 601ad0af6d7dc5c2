// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for the `dagschedule` demo.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagschedule",
    version,
    about = "Build and run a demo task schedule with data-flow dependencies.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `Dagschedule.toml` is used when it exists, built-in
    /// defaults otherwise.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGSCHEDULE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build and validate the schedule, print its execution waves, but don't
    /// run any task.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
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
