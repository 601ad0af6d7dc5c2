// tests/property_scheduler.rs

use std::collections::{BTreeSet, VecDeque};

use dagschedule::dag::ScheduleBuilder;
use dagschedule::exec::execute_task;
use dagschedule::schedule::{ScheduledTask, TaskRunState};
use dagschedule::TaskDeclaration;
use dagschedule_test_utils::builders::{RegistryBuilder, add_one, after, emit};
use proptest::prelude::*;

/// Node `i` depends on a subset of nodes `0..i`, which keeps the graph
/// acyclic; `failing` marks nodes whose task errors.
#[derive(Debug, Clone)]
struct DagShape {
    deps: Vec<BTreeSet<usize>>,
    failing: BTreeSet<usize>,
}

fn dag_shape_strategy(max_tasks: usize) -> impl Strategy<Value = DagShape> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps_strat = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..4),
            num_tasks,
        );
        let failing_strat = proptest::collection::btree_set(0..num_tasks, 0..3);

        (deps_strat, failing_strat).prop_map(move |(raw_deps, failing)| {
            let deps = raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, candidates)| {
                    if i == 0 {
                        BTreeSet::new()
                    } else {
                        candidates.into_iter().map(|d| d % i).collect()
                    }
                })
                .collect();
            DagShape { deps, failing }
        })
    })
}

fn name(i: usize) -> String {
    format!("task_{i}")
}

fn declarations(shape: &DagShape) -> Vec<TaskDeclaration> {
    shape
        .deps
        .iter()
        .enumerate()
        .map(|(i, deps)| {
            let id = name(i);
            let producers: Vec<String> = deps.iter().map(|&d| name(d)).collect();
            let producer_refs: Vec<&str> = producers.iter().map(String::as_str).collect();

            if shape.failing.contains(&i) {
                after(&id, "Fail", &producer_refs)
            } else if let Some((first, rest)) = producer_refs.split_first() {
                // One data edge from the first producer, completion for the rest.
                let mut decl = add_one(&id, first);
                for p in rest {
                    decl = decl.wait_for(dagschedule::DependencyDescriptor::completion_of(*p));
                }
                decl
            } else {
                emit(&id)
            }
        })
        .collect()
}

/// Whether `i` or any of its ancestors is a failing node.
fn doomed(shape: &DagShape, i: usize) -> bool {
    shape.failing.contains(&i) || shape.deps[i].iter().any(|&d| doomed(shape, d))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_dags_always_build(shape in dag_shape_strategy(12)) {
        let registry = RegistryBuilder::new().build();
        let schedule = ScheduleBuilder::start_with(declarations(&shape))
            .and_then(|b| b.build(&registry));
        match schedule {
            Ok(schedule) => prop_assert_eq!(schedule.len(), shape.deps.len()),
            Err(err) => prop_assert!(false, "build failed: {}", err),
        }
    }

    #[test]
    fn runs_respect_dependency_order(
        shape in dag_shape_strategy(12),
        picks in proptest::collection::vec(any::<bool>(), 64),
    ) {
        let registry = RegistryBuilder::new().build();
        let schedule = ScheduleBuilder::start_with(declarations(&shape))
            .and_then(|b| b.build(&registry))
            .expect("random DAG builds");
        let mut sched = schedule.into_scheduler();

        // Complete ready tasks from either end of the queue to vary the
        // interleaving.
        let mut ready: VecDeque<ScheduledTask> = sched.start().newly_scheduled.into();
        let mut turn = 0;
        while !ready.is_empty() {
            let take_back = picks[turn % picks.len()];
            turn += 1;
            let task = if take_back { ready.pop_back() } else { ready.pop_front() };
            let Some(task) = task else { break };

            let id = task.id.clone();
            sched.handle_started(id.as_str());
            let outcome = execute_task(task);
            let step = sched.handle_completion(id.as_str(), outcome);
            ready.extend(step.newly_scheduled);
        }

        prop_assert!(sched.is_quiescent());
        let report = sched.into_report();

        for (i, deps) in shape.deps.iter().enumerate() {
            let id = name(i);
            let state = report.state_of(&id);
            prop_assert!(state.is_some_and(TaskRunState::is_terminal), "{} ended {:?}", id, state);

            let expected = if doomed(&shape, i) {
                TaskRunState::Failed
            } else {
                TaskRunState::Completed
            };
            prop_assert_eq!(state, Some(expected), "{}", id);

            if let Some(running) = report.transition_index(&id, TaskRunState::Running) {
                for &d in deps {
                    let done = report.transition_index(&name(d), TaskRunState::Completed);
                    prop_assert!(
                        done.is_some_and(|done| done < running),
                        "{} ran before {} completed",
                        id,
                        name(d)
                    );
                }
            }
        }

        prop_assert!(report.unsatisfied().is_empty());
        prop_assert_eq!(report.is_success(), shape.failing.is_empty());
    }
}
