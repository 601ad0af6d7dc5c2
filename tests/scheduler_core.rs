// tests/scheduler_core.rs

//! Drives the pure scheduler core by hand, without Tokio or threads.

use std::error::Error;

use dagschedule::dag::ScheduleBuilder;
use dagschedule::engine::TaskOutcome;
use dagschedule::exec::execute_task;
use dagschedule::schedule::{Blocker, FailureCause, Scheduler, TaskRunState};
use dagschedule::task::Outputs;
use dagschedule::{TaskDeclaration, TaskId};
use dagschedule_test_utils::builders::{RegistryBuilder, add_one, after, emit, sink};
use dagschedule_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn scheduler_for(decls: Vec<TaskDeclaration>) -> Result<Scheduler, Box<dyn Error>> {
    let registry = RegistryBuilder::new().build();
    let schedule = ScheduleBuilder::start_with(decls)?.build(&registry)?;
    Ok(schedule.into_scheduler())
}

fn success(value: i64) -> TaskOutcome {
    TaskOutcome::Success(Outputs::new().with("out", value))
}

#[test]
fn chain_becomes_ready_one_step_at_a_time() -> TestResult {
    init_tracing();
    let mut sched = scheduler_for(vec![emit("a"), add_one("b", "a"), sink("c", "b")])?;

    assert_eq!(sched.run_state_of("a"), Some(TaskRunState::Pending));
    assert!(!sched.is_quiescent(), "not quiescent before start");

    let step = sched.start();
    assert_eq!(step.scheduled_ids(), ["a"]);
    assert!(!step.quiescent);
    assert_eq!(sched.run_state_of("a"), Some(TaskRunState::Ready));
    assert_eq!(sched.run_state_of("b"), Some(TaskRunState::Pending));
    assert_eq!(sched.deps_satisfied("b"), Some(false));

    sched.handle_started("a");
    assert_eq!(sched.run_state_of("a"), Some(TaskRunState::Running));

    let step = sched.handle_completion("a", success(41));
    assert_eq!(sched.run_state_of("a"), Some(TaskRunState::Completed));
    assert_eq!(step.scheduled_ids(), ["b"]);

    let b = &step.newly_scheduled[0];
    assert_eq!(b.inputs.len(), 1);
    assert_eq!(b.inputs[0].0, "in");
    assert_eq!(b.inputs[0].1.get::<i64>()?, 41);
    assert_eq!(sched.deps_satisfied("c"), Some(false));

    sched.handle_started("b");
    let step = sched.handle_completion("b", success(42));
    assert_eq!(step.scheduled_ids(), ["c"]);

    sched.handle_started("c");
    let step = sched.handle_completion("c", TaskOutcome::Success(Outputs::new()));
    assert!(step.newly_scheduled.is_empty());
    assert!(step.quiescent);

    let report = sched.into_report();
    assert!(report.is_success());
    assert_eq!(report.completed().count(), 3);
    Ok(())
}

#[test]
fn roots_are_all_ready_at_start() -> TestResult {
    let mut sched = scheduler_for(vec![emit("x"), emit("y"), add_one("z", "x")])?;
    let step = sched.start();
    assert_eq!(step.scheduled_ids(), ["x", "y"]);
    assert_eq!(sched.outstanding(), 2);
    Ok(())
}

#[test]
fn start_twice_schedules_nothing_more() -> TestResult {
    let mut sched = scheduler_for(vec![emit("x")])?;
    assert_eq!(sched.start().newly_scheduled.len(), 1);
    assert!(sched.start().newly_scheduled.is_empty());
    Ok(())
}

#[test]
fn empty_schedule_is_quiescent_at_start() -> TestResult {
    let mut sched = scheduler_for(vec![])?;
    let step = sched.start();
    assert!(step.newly_scheduled.is_empty());
    assert!(step.quiescent);
    assert!(sched.into_report().is_success());
    Ok(())
}

#[test]
fn consumer_waits_for_every_producer() -> TestResult {
    let mut sched = scheduler_for(vec![emit("a"), emit("b"), after("c", "Emit", &["a", "b"])])?;
    sched.start();

    sched.handle_started("a");
    let step = sched.handle_completion("a", success(1));
    assert!(step.newly_scheduled.is_empty());
    assert_eq!(sched.deps_satisfied("c"), Some(false));

    sched.handle_started("b");
    let step = sched.handle_completion("b", success(1));
    assert_eq!(step.scheduled_ids(), ["c"]);
    Ok(())
}

#[test]
fn failure_cascades_downstream_only() -> TestResult {
    let mut sched = scheduler_for(vec![
        emit("a"),
        add_one("b", "a"),
        sink("c", "b"),
        emit("d"),
        sink("e", "d"),
    ])?;

    let step = sched.start();
    assert_eq!(step.scheduled_ids(), ["a", "d"]);

    sched.handle_started("a");
    let step = sched.handle_completion(
        "a",
        TaskOutcome::Failed(FailureCause::Execution("boom".into())),
    );
    assert_eq!(step.newly_failed.first().map(TaskId::as_str), Some("a"));
    let mut cascaded: Vec<&str> = step.newly_failed[1..].iter().map(TaskId::as_str).collect();
    cascaded.sort_unstable();
    assert_eq!(cascaded, ["b", "c"]);
    assert!(!step.quiescent, "d is still outstanding");

    assert_eq!(sched.run_state_of("b"), Some(TaskRunState::Failed));
    assert_eq!(sched.run_state_of("c"), Some(TaskRunState::Failed));
    assert_eq!(sched.run_state_of("d"), Some(TaskRunState::Ready));

    sched.handle_started("d");
    let step = sched.handle_completion("d", success(7));
    assert_eq!(step.scheduled_ids(), ["e"]);
    sched.handle_started("e");
    let step = sched.handle_completion("e", TaskOutcome::Success(Outputs::new()));
    assert!(step.quiescent);

    let report = sched.into_report();
    assert!(!report.is_success());
    assert_eq!(report.failure_of("a"), Some(&FailureCause::Execution("boom".into())));
    assert_eq!(report.failure_of("b"), Some(&FailureCause::Upstream("a".into())));
    assert_eq!(report.failure_of("c"), Some(&FailureCause::Upstream("a".into())));
    assert_eq!(report.state_of("e"), Some(TaskRunState::Completed));
    assert!(report.unsatisfied().is_empty());
    Ok(())
}

#[test]
fn omitted_output_leaves_consumer_unsatisfied() -> TestResult {
    let mut sched = scheduler_for(vec![TaskDeclaration::new("o", "Omit"), add_one("x", "o")])?;
    sched.start();
    sched.handle_started("o");

    let step = sched.handle_completion("o", TaskOutcome::Success(Outputs::new()));
    assert!(step.newly_scheduled.is_empty());
    assert!(step.quiescent);
    assert_eq!(sched.run_state_of("o"), Some(TaskRunState::Completed));
    assert_eq!(sched.run_state_of("x"), Some(TaskRunState::Pending));

    let report = sched.into_report();
    assert!(!report.is_success());
    assert!(report.failures().is_empty());
    assert_eq!(report.unsatisfied().len(), 1);
    assert_eq!(report.unsatisfied()[0].task, "x");
    assert_eq!(
        report.unsatisfied()[0].blocked_on,
        vec![Blocker::MissingOutput {
            producer: "o".into(),
            output: "out".to_string()
        }]
    );

    let err = report.into_result().unwrap_err();
    assert!(err.to_string().contains("1 unsatisfied"));
    Ok(())
}

#[test]
fn wrongly_typed_output_fails_the_task() -> TestResult {
    let mut sched = scheduler_for(vec![TaskDeclaration::new("liar", "Liar"), add_one("x", "liar")])?;
    let mut step = sched.start();
    let task = step.newly_scheduled.remove(0);

    sched.handle_started("liar");
    let outcome = execute_task(task);
    assert!(outcome.is_success(), "the task itself did not error");

    let step = sched.handle_completion("liar", outcome);
    assert_eq!(step.newly_failed.len(), 2);
    assert!(step.quiescent);

    let report = sched.into_report();
    assert!(matches!(report.failure_of("liar"), Some(FailureCause::Execution(msg)) if msg.contains("out")));
    assert_eq!(report.failure_of("x"), Some(&FailureCause::Upstream("liar".into())));
    Ok(())
}

#[test]
fn undeclared_outputs_are_dropped() -> TestResult {
    let mut sched = scheduler_for(vec![emit("a")])?;
    sched.start();
    sched.handle_started("a");
    sched.handle_completion(
        "a",
        TaskOutcome::Success(Outputs::new().with("out", 1_i64).with("junk", 2_u8)),
    );

    let report = sched.into_report();
    let outputs = report.outputs_of("a").expect("recorded");
    assert!(outputs.contains("out"));
    assert!(!outputs.contains("junk"));
    Ok(())
}

#[test]
fn completion_without_start_is_accepted_and_duplicates_ignored() -> TestResult {
    let mut sched = scheduler_for(vec![emit("a"), add_one("b", "a")])?;
    sched.start();

    let step = sched.handle_completion("a", success(1));
    assert_eq!(step.scheduled_ids(), ["b"]);

    // Second completion of the same task changes nothing.
    let step = sched.handle_completion("a", success(99));
    assert!(step.newly_scheduled.is_empty());
    assert_eq!(sched.run_state_of("b"), Some(TaskRunState::Ready));

    // Unknown task is ignored too.
    let step = sched.handle_completion("ghost", success(1));
    assert!(step.newly_scheduled.is_empty());

    let transitions: Vec<_> = sched
        .transitions()
        .iter()
        .filter(|t| t.task == "a")
        .map(|t| t.state)
        .collect();
    assert_eq!(
        transitions,
        [TaskRunState::Ready, TaskRunState::Running, TaskRunState::Completed]
    );
    Ok(())
}

#[test]
fn consumer_inputs_are_independent_of_later_producer_changes() -> TestResult {
    let mut sched = scheduler_for(vec![emit("a"), add_one("b", "a"), add_one("c", "a")])?;
    sched.start();
    sched.handle_started("a");
    let step = sched.handle_completion("a", success(10));

    assert_eq!(step.scheduled_ids(), ["b", "c"]);
    for task in &step.newly_scheduled {
        assert_eq!(task.inputs[0].1.get::<i64>()?, 10);
    }

    let mut outcomes = Vec::new();
    for task in step.newly_scheduled {
        let id = task.id.clone();
        sched.handle_started(id.as_str());
        outcomes.push((id, execute_task(task)));
    }
    for (id, outcome) in outcomes {
        sched.handle_completion(id.as_str(), outcome);
    }

    let report = sched.into_report();
    assert_eq!(report.outputs_of("b").and_then(|o| o.get_as::<i64>("out")), Some(&11));
    assert_eq!(report.outputs_of("c").and_then(|o| o.get_as::<i64>("out")), Some(&11));
    assert_eq!(report.outputs_of("a").and_then(|o| o.get_as::<i64>("out")), Some(&10));
    Ok(())
}
