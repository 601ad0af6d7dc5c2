#![allow(dead_code)]

//! Reusable task implementations for tests.
//!
//! Most test kinds are a [`ScriptedTask`]: a task whose `run` is a closure
//! over the inputs it received. [`standard_kinds`] registers the common ones.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail};
use dagschedule::task::{Outputs, Task, TaskFields, TaskRegistry, Value};
use dagschedule::TaskId;

/// Inputs a scripted task received, by field name.
pub type Inputs = BTreeMap<String, Value>;

pub type Script = Arc<dyn Fn(&TaskId, &Inputs) -> anyhow::Result<Outputs> + Send + Sync>;

/// Shared, ordered record of which tasks ran (and sometimes what they saw).
#[derive(Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|e| e == entry)
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.position(entry).is_some()
    }
}

/// Tracks how many tasks are inside a probe section at once.
#[derive(Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Run `f` while counted as active.
    pub fn measure<T>(&self, f: impl FnOnce() -> T) -> T {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        let out = f();
        self.current.fetch_sub(1, Ordering::SeqCst);
        out
    }

    pub fn max_seen(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

/// A task whose `run` is a closure over its received inputs.
pub struct ScriptedTask {
    id: TaskId,
    fields: Arc<TaskFields>,
    inputs: Inputs,
    outputs: Outputs,
    script: Script,
    log: Option<ExecutionLog>,
}

impl ScriptedTask {
    pub fn new(id: TaskId, fields: Arc<TaskFields>, script: Script, log: Option<ExecutionLog>) -> Self {
        Self {
            id,
            fields,
            inputs: Inputs::new(),
            outputs: Outputs::new(),
            script,
            log,
        }
    }
}

impl Task for ScriptedTask {
    fn id(&self) -> &TaskId {
        &self.id
    }

    fn set_input(&mut self, field: &str, value: Value) -> anyhow::Result<()> {
        if self.fields.input(field).is_none() {
            bail!("task '{}' has no input named '{field}'", self.id);
        }
        self.inputs.insert(field.to_string(), value);
        Ok(())
    }

    fn run(&mut self) -> anyhow::Result<()> {
        if let Some(log) = &self.log {
            log.record(self.id.as_str());
        }
        self.outputs = (self.script)(&self.id, &self.inputs)?;
        Ok(())
    }

    fn take_outputs(&mut self) -> Outputs {
        std::mem::take(&mut self.outputs)
    }
}

/// Register a scripted kind on `registry`.
pub fn register_scripted<F>(
    registry: &mut TaskRegistry,
    type_name: &str,
    fields: TaskFields,
    log: Option<ExecutionLog>,
    script: F,
) where
    F: Fn(&TaskId, &Inputs) -> anyhow::Result<Outputs> + Send + Sync + 'static,
{
    let shared_fields = Arc::new(fields.clone());
    let script: Script = Arc::new(script);
    registry.register_factory(type_name, fields, move |id| {
        Ok(Box::new(ScriptedTask::new(
            id,
            Arc::clone(&shared_fields),
            Arc::clone(&script),
            log.clone(),
        )) as Box<dyn Task>)
    });
}

fn input_i64(id: &TaskId, inputs: &Inputs, name: &str) -> anyhow::Result<i64> {
    inputs
        .get(name)
        .ok_or_else(|| anyhow!("task '{id}' never received input '{name}'"))?
        .get::<i64>()
}

/// Registers the standard test kinds:
///
/// | kind | inputs | outputs | behaviour |
/// |------|--------|---------|-----------|
/// | `Emit` | | `out: i64` | emits 1 |
/// | `AddOne` | `in: i64` | `out: i64` | `in + 1` |
/// | `Join` | `left: i64`, `right: i64` | `out: i64` | sum |
/// | `Sink` | `in: i64` | | logs `"<id>=<in>"` |
/// | `Fail` | | `out: i64` | returns an error |
/// | `Panic` | | `out: i64` | panics |
/// | `Omit` | | `out: i64` | completes without emitting `out` |
/// | `Text` | | `out: String` | emits `"text"` |
/// | `Liar` | | `out: i64` | emits a `String` on `out` |
/// | `Sleepy` | | | sleeps 50ms inside `probe` |
pub fn standard_kinds(registry: &mut TaskRegistry, log: &ExecutionLog, probe: &Arc<ConcurrencyProbe>) {
    let log = Some(log.clone());

    register_scripted(
        registry,
        "Emit",
        TaskFields::new().with_output::<i64>("out"),
        log.clone(),
        |_, _| Ok(Outputs::new().with("out", 1_i64)),
    );

    register_scripted(
        registry,
        "AddOne",
        TaskFields::new().with_input::<i64>("in").with_output::<i64>("out"),
        log.clone(),
        |id, inputs| Ok(Outputs::new().with("out", input_i64(id, inputs, "in")? + 1)),
    );

    register_scripted(
        registry,
        "Join",
        TaskFields::new()
            .with_input::<i64>("left")
            .with_input::<i64>("right")
            .with_output::<i64>("out"),
        log.clone(),
        |id, inputs| {
            let sum = input_i64(id, inputs, "left")? + input_i64(id, inputs, "right")?;
            Ok(Outputs::new().with("out", sum))
        },
    );

    let sink_log = log.clone();
    register_scripted(
        registry,
        "Sink",
        TaskFields::new().with_input::<i64>("in"),
        None,
        move |id, inputs| {
            let value = input_i64(id, inputs, "in")?;
            if let Some(log) = &sink_log {
                log.record(format!("{id}={value}"));
            }
            Ok(Outputs::new())
        },
    );

    register_scripted(
        registry,
        "Fail",
        TaskFields::new().with_output::<i64>("out"),
        log.clone(),
        |id, _| Err(anyhow!("task '{id}' failed on purpose")),
    );

    register_scripted(
        registry,
        "Panic",
        TaskFields::new().with_output::<i64>("out"),
        log.clone(),
        |id, _| panic!("task '{id}' panicked on purpose"),
    );

    register_scripted(
        registry,
        "Omit",
        TaskFields::new().with_output::<i64>("out"),
        log.clone(),
        |_, _| Ok(Outputs::new()),
    );

    register_scripted(
        registry,
        "Text",
        TaskFields::new().with_output::<String>("out"),
        log.clone(),
        |_, _| Ok(Outputs::new().with("out", "text".to_string())),
    );

    register_scripted(
        registry,
        "Liar",
        TaskFields::new().with_output::<i64>("out"),
        log.clone(),
        |_, _| Ok(Outputs::new().with("out", "not a number".to_string())),
    );

    let probe = Arc::clone(probe);
    register_scripted(registry, "Sleepy", TaskFields::new(), log, move |_, _| {
        probe.measure(|| thread::sleep(Duration::from_millis(50)));
        Ok(Outputs::new())
    });
}
