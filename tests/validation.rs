// tests/validation.rs

use std::error::Error;
use std::sync::Arc;

use dagschedule::dag::{DependencyValidator, ScheduleBuilder};
use dagschedule::errors::{BuildError, MismatchProblem};
use dagschedule::task::{CachingInspector, FieldInspector, TaskFields};
use dagschedule::{DependencyDescriptor, TaskDeclaration, TaskType};
use dagschedule_test_utils::builders::{RegistryBuilder, add_one, emit, join};
use dagschedule_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn problems_of(err: BuildError) -> (String, Vec<MismatchProblem>) {
    match err {
        BuildError::DependencyMismatch { task, problems } => (task.to_string(), problems),
        other => panic!("expected DependencyMismatch, got: {other}"),
    }
}

#[test]
fn missing_input_is_a_mismatch() -> TestResult {
    init_tracing();
    let registry = RegistryBuilder::new().build();

    // AddOne declares `in` but nothing feeds it.
    let err = ScheduleBuilder::start_with([emit("src")])?
        .add(TaskDeclaration::new("lonely", "AddOne").wait_for(DependencyDescriptor::completion_of("src")))?
        .build(&registry)
        .unwrap_err();

    let (task, problems) = problems_of(err);
    assert_eq!(task, "lonely");
    assert_eq!(
        problems,
        vec![MismatchProblem::MissingInput {
            input: "in".to_string()
        }]
    );
    Ok(())
}

#[test]
fn unknown_b_scenario_fails_to_build() -> TestResult {
    // Start -> A is fine; B targets an input A's type never declares.
    let registry = dagschedule::demo::demo_registry();
    let err = ScheduleBuilder::start_with([TaskDeclaration::new("Start", "Start")])?
        .add(
            TaskDeclaration::new("A", "Double")
                .wait_for(DependencyDescriptor::output("start_out", "Start", "a_int")),
        )?
        .add(
            TaskDeclaration::new("B", "Double")
                .wait_for(DependencyDescriptor::output("a_out", "A", "b_int")),
        )?
        .build(&registry)
        .unwrap_err();

    let (task, problems) = problems_of(err);
    assert_eq!(task, "B");
    assert!(problems.contains(&MismatchProblem::UnknownInput {
        input: "b_int".to_string(),
        producer: "A".into(),
    }));
    assert!(problems.contains(&MismatchProblem::MissingInput {
        input: "a_int".to_string()
    }));
    Ok(())
}

#[test]
fn unknown_output_name_is_caught_at_build_time() -> TestResult {
    let registry = RegistryBuilder::new().build();
    let err = ScheduleBuilder::start_with([emit("src")])?
        .add(
            TaskDeclaration::new("next", "AddOne")
                .wait_for(DependencyDescriptor::output("nope", "src", "in")),
        )?
        .build(&registry)
        .unwrap_err();

    let (_, problems) = problems_of(err);
    assert_eq!(
        problems,
        vec![MismatchProblem::UnknownOutput {
            producer: "src".into(),
            output: "nope".to_string()
        }]
    );
    Ok(())
}

#[test]
fn type_mismatch_between_output_and_input() -> TestResult {
    let registry = RegistryBuilder::new().build();
    let err = ScheduleBuilder::start_with([TaskDeclaration::new("words", "Text")])?
        .add(add_one("count", "words"))?
        .build(&registry)
        .unwrap_err();

    let (_, problems) = problems_of(err);
    assert_eq!(problems.len(), 1);
    match &problems[0] {
        MismatchProblem::TypeMismatch {
            input,
            expected,
            output,
            found,
            ..
        } => {
            assert_eq!(input, "in");
            assert_eq!(output, "out");
            assert!(expected.contains("i64"));
            assert!(found.contains("String"));
        }
        other => panic!("unexpected problem: {other}"),
    }
    Ok(())
}

#[test]
fn input_fed_twice_is_a_duplicate() -> TestResult {
    let registry = RegistryBuilder::new().build();
    let err = ScheduleBuilder::start_with([emit("a"), emit("b")])?
        .add(
            TaskDeclaration::new("twice", "AddOne")
                .wait_for(DependencyDescriptor::output("out", "a", "in"))
                .wait_for(DependencyDescriptor::output("out", "b", "in")),
        )?
        .build(&registry)
        .unwrap_err();

    let (_, problems) = problems_of(err);
    assert_eq!(
        problems,
        vec![MismatchProblem::DuplicateInput {
            input: "in".to_string(),
            count: 2
        }]
    );
    Ok(())
}

#[test]
fn all_problems_of_a_task_are_reported_together() -> TestResult {
    let registry = RegistryBuilder::new().build();
    let err = ScheduleBuilder::start_with([emit("a"), TaskDeclaration::new("t", "Text")])?
        .add(
            TaskDeclaration::new("j", "Join")
                .wait_for(DependencyDescriptor::output("out", "t", "left"))
                .wait_for(DependencyDescriptor::output("out", "a", "middle")),
        )?
        .build(&registry)
        .unwrap_err();

    let message = err.to_string();
    let (_, problems) = problems_of(err);
    // left: type mismatch, middle: unknown input, right: missing.
    assert_eq!(problems.len(), 3, "{problems:?}");
    assert!(message.contains("'j'"));
    assert!(message.contains("middle"));
    assert!(message.contains("right"));
    Ok(())
}

#[test]
fn completion_only_dependencies_need_no_fields() -> TestResult {
    let registry = RegistryBuilder::new().build();
    let schedule = ScheduleBuilder::start_with([emit("a"), emit("b")])?
        .add(
            TaskDeclaration::new("c", "Emit")
                .wait_for(DependencyDescriptor::completion_of("a"))
                .wait_for(DependencyDescriptor::completion_of("b")),
        )?
        .add(join("j", "a", "c"))?
        .build(&registry)?;

    assert_eq!(schedule.len(), 4);
    assert_eq!(schedule.fields_of("j").map(|f| f.inputs().len()), Some(2));
    Ok(())
}

#[test]
fn type_unknown_to_injected_inspector_is_a_mismatch() -> TestResult {
    let registry = RegistryBuilder::new().build();
    // An inspector that knows nothing.
    let inspector = CachingInspector::new();

    let err = ScheduleBuilder::start_with([emit("a")])?
        .build_with(&registry, &inspector)
        .unwrap_err();

    let (_, problems) = problems_of(err);
    assert_eq!(
        problems,
        vec![MismatchProblem::UnknownTaskType(TaskType::named("Emit"))]
    );
    Ok(())
}

#[test]
fn injected_inspector_overrides_registry_fields() -> TestResult {
    let registry = RegistryBuilder::new().build();
    // Claim Emit has no outputs: consumers of `out` must now fail.
    let inspector = CachingInspector::new()
        .with_describer("Emit", TaskFields::new)
        .with_describer("AddOne", || {
            TaskFields::new().with_input::<i64>("in").with_output::<i64>("out")
        });

    let err = ScheduleBuilder::start_with([emit("a")])?
        .add(add_one("b", "a"))?
        .build_with(&registry, &inspector)
        .unwrap_err();

    let (task, problems) = problems_of(err);
    assert_eq!(task, "b");
    assert!(matches!(problems[0], MismatchProblem::UnknownOutput { .. }));
    Ok(())
}

#[test]
fn validator_returns_the_consumer_fields() -> TestResult {
    let inspector = CachingInspector::new().with_describer("Solo", || {
        TaskFields::new().with_output::<u8>("byte")
    });
    let validator = DependencyValidator::new(&inspector);

    let fields = validator.validate(&"solo".into(), &TaskType::named("Solo"), &[])?;
    assert_eq!(fields.outputs().len(), 1);
    assert!(Arc::ptr_eq(
        &fields,
        &inspector.inspect(&TaskType::named("Solo")).expect("cached")
    ));
    Ok(())
}
