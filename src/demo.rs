// src/demo.rs

//! Demo task kinds and the pipeline the binary runs.
//!
//! `Start` emits a number, `A` (a `Double`) doubles it, and `B` (a `Report`)
//! renders the result once `Start` has also completed.

use anyhow::{Context, bail};
use tracing::info;

use crate::dag::ScheduleBuilder;
use crate::declaration::{DependencyDescriptor, TaskDeclaration, TaskId};
use crate::errors::BuildError;
use crate::schedule::Schedule;
use crate::task::{Outputs, Task, TaskFields, TaskKind, TaskRegistry, Value};

/// Emits a fixed starting value on `start_out`.
#[derive(Debug)]
pub struct StartTask {
    id: TaskId,
    outputs: Outputs,
}

impl StartTask {
    pub const SEED: i64 = 21;
}

impl Task for StartTask {
    fn id(&self) -> &TaskId {
        &self.id
    }

    fn set_input(&mut self, field: &str, _value: Value) -> anyhow::Result<()> {
        bail!("Start has no input named '{field}'")
    }

    fn run(&mut self) -> anyhow::Result<()> {
        self.outputs.insert("start_out", Self::SEED);
        Ok(())
    }

    fn take_outputs(&mut self) -> Outputs {
        std::mem::take(&mut self.outputs)
    }
}

impl TaskKind for StartTask {
    const TYPE_NAME: &'static str = "Start";

    fn create(id: TaskId) -> anyhow::Result<Self> {
        Ok(Self {
            id,
            outputs: Outputs::new(),
        })
    }

    fn fields() -> TaskFields {
        TaskFields::new().with_output::<i64>("start_out")
    }
}

/// Reads `a_int`, emits twice its value on `a_out`.
#[derive(Debug)]
pub struct DoubleTask {
    id: TaskId,
    input: Option<i64>,
    outputs: Outputs,
}

impl Task for DoubleTask {
    fn id(&self) -> &TaskId {
        &self.id
    }

    fn set_input(&mut self, field: &str, value: Value) -> anyhow::Result<()> {
        match field {
            "a_int" => {
                self.input = Some(value.get::<i64>()?);
                Ok(())
            }
            other => bail!("Double has no input named '{other}'"),
        }
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let input = self.input.context("input 'a_int' was never set")?;
        let doubled = input
            .checked_mul(2)
            .with_context(|| format!("doubling {input} overflows"))?;
        self.outputs.insert("a_out", doubled);
        Ok(())
    }

    fn take_outputs(&mut self) -> Outputs {
        std::mem::take(&mut self.outputs)
    }
}

impl TaskKind for DoubleTask {
    const TYPE_NAME: &'static str = "Double";

    fn create(id: TaskId) -> anyhow::Result<Self> {
        Ok(Self {
            id,
            input: None,
            outputs: Outputs::new(),
        })
    }

    fn fields() -> TaskFields {
        TaskFields::new()
            .with_input::<i64>("a_int")
            .with_output::<i64>("a_out")
    }
}

/// Formats `value` into a `summary` line.
#[derive(Debug)]
pub struct ReportTask {
    id: TaskId,
    value: Option<i64>,
    outputs: Outputs,
}

impl Task for ReportTask {
    fn id(&self) -> &TaskId {
        &self.id
    }

    fn set_input(&mut self, field: &str, value: Value) -> anyhow::Result<()> {
        match field {
            "value" => {
                self.value = Some(value.get::<i64>()?);
                Ok(())
            }
            other => bail!("Report has no input named '{other}'"),
        }
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let value = self.value.context("input 'value' was never set")?;
        let summary = format!("{} received {value}", self.id);
        info!(task = %self.id, value, "report");
        self.outputs.insert("summary", summary);
        Ok(())
    }

    fn take_outputs(&mut self) -> Outputs {
        std::mem::take(&mut self.outputs)
    }
}

impl TaskKind for ReportTask {
    const TYPE_NAME: &'static str = "Report";

    fn create(id: TaskId) -> anyhow::Result<Self> {
        Ok(Self {
            id,
            value: None,
            outputs: Outputs::new(),
        })
    }

    fn fields() -> TaskFields {
        TaskFields::new()
            .with_input::<i64>("value")
            .with_output::<String>("summary")
    }
}

/// Registry with the three demo kinds.
pub fn demo_registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry
        .register::<StartTask>()
        .register::<DoubleTask>()
        .register::<ReportTask>();
    registry
}

/// `Start -> A -> B`, where `B` also waits for `Start` to complete.
pub fn demo_schedule(registry: &TaskRegistry) -> Result<Schedule, BuildError> {
    ScheduleBuilder::start_with([TaskDeclaration::of::<StartTask>("Start")])?
        .add(
            TaskDeclaration::of::<DoubleTask>("A")
                .wait_for(DependencyDescriptor::output("start_out", "Start", "a_int")),
        )?
        .add(
            TaskDeclaration::of::<ReportTask>("B")
                .wait_for(DependencyDescriptor::output("a_out", "A", "value"))
                .wait_for(DependencyDescriptor::completion_of("Start")),
        )?
        .build(registry)
}
