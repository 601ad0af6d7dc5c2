// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod declaration;
pub mod demo;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod schedule;
pub mod task;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_and_validate};
use crate::config::model::ConfigFile;
use crate::schedule::{RunReport, Schedule};

pub use crate::dag::ScheduleBuilder;
pub use crate::declaration::{DependencyDescriptor, DependencyKind, TaskDeclaration, TaskId, TaskType};
pub use crate::errors::{BuildError, MismatchProblem, ScheduleError};
pub use crate::task::{Outputs, Task, TaskFields, TaskKind, TaskRegistry, Value};

/// High-level entry point used by `main.rs`.
///
/// Loads config, builds the demo schedule, then either prints its plan
/// (`--dry-run`) or runs it and prints the report. Returns whether every
/// task completed.
pub async fn run(args: CliArgs) -> Result<bool> {
    let cfg = resolve_config(args.config.as_deref())?;

    let registry = demo::demo_registry();
    let schedule = demo::demo_schedule(&registry)?;

    if args.dry_run {
        print_dry_run(&cfg, &schedule)?;
        return Ok(true);
    }

    let report = schedule.run_with(cfg.executor_config()).await?;
    print_report(&report);
    Ok(report.is_success())
}

/// An explicit path must load; the default path is optional.
fn resolve_config(explicit: Option<&str>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return Ok(load_and_validate(path)?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        info!(path = %default_path.display(), "using default config file");
        Ok(load_and_validate(&default_path)?)
    } else {
        debug!("no config file; using built-in defaults");
        Ok(ConfigFile::default())
    }
}

/// Simple dry-run output: print executor settings, tasks, deps and waves.
fn print_dry_run(cfg: &ConfigFile, schedule: &Schedule) -> Result<()> {
    let executor = cfg.executor_config();
    println!("dagschedule dry-run");
    match executor.max_concurrency {
        Some(n) => println!("  executor.max_concurrency = {n}"),
        None => println!("  executor.max_concurrency = unbounded"),
    }
    println!("  executor.event_buffer = {}", executor.event_buffer);
    println!();

    println!("tasks ({}):", schedule.len());
    for id in schedule.task_ids() {
        println!("  - {id}");
        for dep in schedule.dependencies_of(id.as_str()) {
            println!("      waits for: {} ({})", dep.descriptor(), dep.producer_type());
        }
    }
    println!();

    println!("waves:");
    for (i, wave) in schedule.plan()?.iter().enumerate() {
        let names: Vec<&str> = wave.iter().map(TaskId::as_str).collect();
        println!("  {i}: {}", names.join(", "));
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("run report:");
    for id in report.task_ids() {
        let state = report
            .state_of(id.as_str())
            .map(|s| format!("{s:?}"))
            .unwrap_or_else(|| "unknown".to_string());
        println!("  - {id}: {state}");
        if let Some(outputs) = report.outputs_of(id.as_str()) {
            for (name, value) in outputs.iter() {
                match (value.downcast_ref::<i64>(), value.downcast_ref::<String>()) {
                    (Some(n), _) => println!("      {name} = {n}"),
                    (None, Some(s)) => println!("      {name} = {s}"),
                    (None, None) => println!("      {name} = <{}>", value.value_type()),
                }
            }
        }
    }

    for failure in report.failures() {
        println!("  {failure}");
    }
    for unsatisfied in report.unsatisfied() {
        println!("  {unsatisfied}");
    }
}
