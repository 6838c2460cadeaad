use std::time::{Duration, Instant};

use converge_kernel::goal::{Goal, Strategy};
use converge_kernel::executor::Executor;
use converge_kernel::types::{Observation, ProbeResult};
use converge_kernel::waiter::StabilizationWaiter;
use converge_test_utils::{FlakyStore, GrowingObserver, ScriptedObserver};

#[test]
fn test_stable_size_confirms_after_second_reading() {
    let waiter = StabilizationWaiter::new(Duration::ZERO, Duration::from_secs(5));
    let mut observer = ScriptedObserver::new(vec![
        Observation::Measured(5),
        Observation::Measured(5),
        Observation::Measured(5),
    ]);

    assert_eq!(waiter.wait_until_stable(&mut observer), ProbeResult::Confirmed);
    assert_eq!(observer.calls(), 2, "must not take a third reading");
}

#[test]
fn test_growing_file_never_confirms_before_timeout() {
    let timeout = Duration::from_millis(50);
    let waiter = StabilizationWaiter::new(Duration::from_millis(1), timeout);
    let mut observer = GrowingObserver::new();

    let start = Instant::now();
    let result = waiter.wait_until_stable(&mut observer);

    assert_eq!(result, ProbeResult::Unconfirmed);
    assert!(start.elapsed() >= timeout, "timeout must fully elapse before giving up");
}

#[test]
fn test_absent_then_stable_file() {
    let waiter = StabilizationWaiter::new(Duration::ZERO, Duration::from_secs(5));
    let mut observer = ScriptedObserver::new(vec![
        Observation::Absent,
        Observation::Absent,
        Observation::Measured(12),
        Observation::Measured(12),
    ]);

    assert_eq!(waiter.wait_until_stable(&mut observer), ProbeResult::Confirmed);
    assert_eq!(observer.calls(), 4);
}

#[test]
fn test_zero_size_reading_resets_stability() {
    let waiter = StabilizationWaiter::new(Duration::ZERO, Duration::from_secs(5));
    let mut observer = ScriptedObserver::new(vec![
        Observation::Measured(9),
        Observation::Measured(0),
        Observation::Measured(9),
        Observation::Measured(9),
    ]);

    assert_eq!(waiter.wait_until_stable(&mut observer), ProbeResult::Confirmed);
    assert_eq!(observer.calls(), 4, "a truncated reading must restart the count");
}

#[test]
fn test_higher_required_readings() {
    let waiter = StabilizationWaiter::new(Duration::ZERO, Duration::from_secs(5))
        .required_stable_readings(3);
    let mut observer = ScriptedObserver::new(vec![
        Observation::Measured(7),
        Observation::Measured(7),
        Observation::Measured(7),
    ]);

    assert_eq!(waiter.wait_until_stable(&mut observer), ProbeResult::Confirmed);
    assert_eq!(observer.calls(), 3);
}

#[test]
fn test_waiter_as_strategy_postcondition() {
    // The common composition: an export action whose effect lands
    // asynchronously, verified by waiting for the written size to settle.
    let store = FlakyStore::new();
    let observed = store.clone();
    let observer = move || match observed.get("deck-a.dwg") {
        Some(size) => Observation::Measured(size),
        None => Observation::Absent,
    };

    let waiter = StabilizationWaiter::new(Duration::ZERO, Duration::from_millis(100));
    let goal = Goal::builder("export:deck-a")
        .end_state(store.exists_probe("deck-a.dwg"))
        .strategy(Strategy::new(
            "native-api",
            store.writer("deck-a.dwg", 4096),
            waiter.into_probe(observer),
        ))
        .build()
        .unwrap();

    let outcome = Executor::new().run(goal).unwrap();
    assert_eq!(outcome.strategy(), Some("native-api"));
}
