// tests/inspector.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use dagschedule::TaskType;
use dagschedule::demo::{DoubleTask, demo_registry};
use dagschedule::task::{CachingInspector, FieldInspector, FieldSpec, TaskFields, ValueType};

fn counting_inspector(calls: &Arc<AtomicUsize>) -> CachingInspector {
    let calls = Arc::clone(calls);
    CachingInspector::new().with_describer("Counted", move || {
        calls.fetch_add(1, Ordering::SeqCst);
        TaskFields::new()
            .with_input::<i64>("x")
            .with_output::<String>("y")
    })
}

#[test]
fn fields_are_described_once_per_type() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inspector = counting_inspector(&calls);
    let ty = TaskType::named("Counted");

    assert_eq!(inspector.cached_len(), 0);
    let first = inspector.inspect(&ty).expect("known type");
    let second = inspector.inspect(&ty).expect("known type");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(inspector.cached_len(), 1);
}

#[test]
fn unknown_type_is_none_and_not_cached() {
    let inspector = CachingInspector::new();
    assert!(inspector.inspect(&TaskType::named("Nobody")).is_none());
    assert!(inspector.describe_inputs(&TaskType::named("Nobody")).is_none());
    assert_eq!(inspector.cached_len(), 0);
}

#[test]
fn describe_inputs_and_outputs_follow_declaration() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inspector = counting_inspector(&calls);
    let ty = TaskType::named("Counted");

    assert_eq!(
        inspector.describe_inputs(&ty),
        Some(vec![FieldSpec::of::<i64>("x")])
    );
    assert_eq!(
        inspector.describe_outputs(&ty),
        Some(vec![FieldSpec::of::<String>("y")])
    );
    // Both go through the same cache entry.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_inspection_shares_one_entry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let inspector = Arc::new(counting_inspector(&calls));
    let ty = TaskType::named("Counted");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let inspector = Arc::clone(&inspector);
            let ty = ty.clone();
            thread::spawn(move || inspector.inspect(&ty).expect("known type"))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for fields in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], fields));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn registry_inspector_reports_task_kind_fields() {
    let registry = demo_registry();
    let inspector = registry.inspector();

    assert!(inspector.knows(&TaskType::named("Double")));
    let fields = inspector
        .inspect(&TaskType::of::<DoubleTask>())
        .expect("registered");
    assert_eq!(fields.input("a_int").map(|f| f.value_type()), Some(ValueType::of::<i64>()));
    assert_eq!(fields.output("a_out").map(|f| f.name()), Some("a_out"));
    assert!(fields.input("a_out").is_none());
}

#[test]
fn value_types_compare_by_type_not_name() {
    assert_eq!(ValueType::of::<i64>(), ValueType::of::<i64>());
    assert_ne!(ValueType::of::<i64>(), ValueType::of::<i32>());
    assert!(ValueType::of::<String>().name().contains("String"));
}
