// src/dag/validate.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::declaration::{ProcessedDependency, TaskId, TaskType};
use crate::errors::{BuildError, MismatchProblem};
use crate::task::{FieldInspector, TaskFields};

/// Cross-checks a task's declared inputs against its dependencies.
///
/// Rules:
/// - every declared input is fed by exactly one output dependency
/// - every output dependency targets a declared input
/// - the named output is declared by the producer's type
/// - producer output type and consumer input type are the same Rust type
///
/// Completion-only dependencies carry no data and are not checked here.
pub struct DependencyValidator<'a> {
    inspector: &'a dyn FieldInspector,
}

impl<'a> DependencyValidator<'a> {
    pub fn new(inspector: &'a dyn FieldInspector) -> Self {
        Self { inspector }
    }

    /// Validate one task; on success returns the fields of its type.
    ///
    /// All problems of the task are collected into a single
    /// [`BuildError::DependencyMismatch`].
    pub fn validate(
        &self,
        task: &TaskId,
        task_type: &TaskType,
        dependencies: &[ProcessedDependency],
    ) -> Result<Arc<TaskFields>, BuildError> {
        let Some(fields) = self.inspector.inspect(task_type) else {
            return Err(mismatch(
                task,
                vec![MismatchProblem::UnknownTaskType(task_type.clone())],
            ));
        };

        let mut problems = Vec::new();
        let mut fed: HashMap<&str, usize> = HashMap::new();

        for dep in dependencies {
            let Some((output, input)) = dep.descriptor().data_binding() else {
                continue;
            };
            let producer = dep.producer();
            *fed.entry(input).or_default() += 1;

            let Some(input_spec) = fields.input(input) else {
                problems.push(MismatchProblem::UnknownInput {
                    input: input.to_string(),
                    producer: producer.clone(),
                });
                continue;
            };

            let Some(producer_fields) = self.inspector.inspect(dep.producer_type()) else {
                problems.push(MismatchProblem::UnknownTaskType(dep.producer_type().clone()));
                continue;
            };

            let Some(output_spec) = producer_fields.output(output) else {
                problems.push(MismatchProblem::UnknownOutput {
                    producer: producer.clone(),
                    output: output.to_string(),
                });
                continue;
            };

            if output_spec.value_type() != input_spec.value_type() {
                problems.push(MismatchProblem::TypeMismatch {
                    input: input.to_string(),
                    expected: input_spec.value_type().name(),
                    producer: producer.clone(),
                    output: output.to_string(),
                    found: output_spec.value_type().name(),
                });
            }
        }

        for spec in fields.inputs() {
            match fed.get(spec.name()).copied().unwrap_or(0) {
                0 => problems.push(MismatchProblem::MissingInput {
                    input: spec.name().to_string(),
                }),
                1 => {}
                count => problems.push(MismatchProblem::DuplicateInput {
                    input: spec.name().to_string(),
                    count,
                }),
            }
        }

        if problems.is_empty() {
            Ok(fields)
        } else {
            warn!(task = %task, problems = problems.len(), "dependency validation failed");
            Err(mismatch(task, problems))
        }
    }
}

fn mismatch(task: &TaskId, problems: Vec<MismatchProblem>) -> BuildError {
    BuildError::DependencyMismatch {
        task: task.clone(),
        problems,
    }
}
