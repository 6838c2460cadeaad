//! Negative tests - failure modes, misconfiguration, and refusal paths

use std::sync::Arc;

use parking_lot::Mutex;

use converge_kernel::error::{ConfigError, JournalError, KernelError, StateError};
use converge_kernel::executor::Executor;
use converge_kernel::goal::{Goal, Strategy};
use converge_kernel::resource::ResourceTracker;
use converge_kernel::types::{GoalState, OutcomeKind, ProbeResult};
use converge_test_utils::{CountingAction, ReleaseLog, ScriptedProbe};

#[test]
fn test_empty_chain_reports_no_strategies_configured() {
    let end_state = ScriptedProbe::always(ProbeResult::Confirmed);
    let goal = Goal::builder("export:deck-a")
        .end_state(end_state.clone())
        .build()
        .unwrap();

    let outcome = Executor::new().run(goal).unwrap();

    assert_eq!(outcome.kind, OutcomeKind::NoStrategiesConfigured);
    assert_eq!(outcome.final_state, GoalState::Failed);
    assert_eq!(end_state.calls(), 0, "a misconfigured goal must not touch the external system");
    assert!(!outcome.succeeded());
}

#[test]
fn test_exhausted_chain_releases_every_resource_exactly_once() {
    let releases = ReleaseLog::new();

    let mut goal = Goal::builder("export:deck-b").end_state(ScriptedProbe::always(ProbeResult::Unconfirmed));
    for (index, name) in ["native-api", "legacy-api"].iter().enumerate() {
        let releases = releases.clone();
        let action = move |tracker: &mut ResourceTracker| {
            tracker.register(releases.resource(&format!("scratch-{index}")));
        };
        goal = goal.strategy(Strategy::new(
            *name,
            action,
            ScriptedProbe::always(ProbeResult::Unconfirmed),
        ));
    }

    let outcome = Executor::new().run(goal.build().unwrap()).unwrap();

    assert_eq!(outcome.kind, OutcomeKind::AllStrategiesExhausted);
    assert_eq!(outcome.final_state, GoalState::Failed);
    // Reverse creation order, each exactly once.
    assert_eq!(releases.order(), vec!["scratch-1", "scratch-0"]);
    assert_eq!(outcome.release.released.len(), 2);
    assert!(outcome.release.is_clean());
}

#[test]
fn test_release_failure_does_not_leak_the_rest() {
    let releases = ReleaseLog::new();

    let releases_action = releases.clone();
    let action = move |tracker: &mut ResourceTracker| {
        tracker.register(releases_action.resource("a"));
        tracker.register(releases_action.failing_resource("b"));
        tracker.register(releases_action.resource("c"));
    };

    let goal = Goal::builder("export:deck-c")
        .end_state(ScriptedProbe::always(ProbeResult::Unconfirmed))
        .strategy(Strategy::new(
            "only",
            action,
            ScriptedProbe::always(ProbeResult::Confirmed),
        ))
        .build()
        .unwrap();

    let outcome = Executor::new().run(goal).unwrap();

    assert!(outcome.succeeded(), "a release failure must not fail the goal");
    assert_eq!(releases.order(), vec!["c", "a"]);
    assert_eq!(outcome.release.failures.len(), 1);
    assert_eq!(outcome.release.failures[0].label, "b");
}

#[test]
fn test_duplicate_in_flight_identity_is_refused() {
    let executor = Arc::new(Executor::new());
    let seen: Arc<Mutex<Option<ConfigError>>> = Arc::new(Mutex::new(None));

    let executor_inner = Arc::clone(&executor);
    let seen_inner = Arc::clone(&seen);
    let action = move |_tracker: &mut ResourceTracker| {
        let inner = Goal::builder("export:deck-d")
            .end_state(ScriptedProbe::always(ProbeResult::Unconfirmed))
            .strategy(Strategy::new(
                "noop",
                CountingAction::new(),
                ScriptedProbe::always(ProbeResult::Unconfirmed),
            ))
            .build()
            .unwrap();
        if let Err(error) = executor_inner.run(inner) {
            *seen_inner.lock() = Some(error);
        }
    };

    let outer = Goal::builder("export:deck-d")
        .end_state(ScriptedProbe::always(ProbeResult::Unconfirmed))
        .strategy(Strategy::new(
            "reentrant",
            action,
            ScriptedProbe::always(ProbeResult::Confirmed),
        ))
        .build()
        .unwrap();

    let outcome = executor.run(outer).unwrap();
    assert!(outcome.succeeded());
    assert_eq!(
        *seen.lock(),
        Some(ConfigError::GoalAlreadyRunning("export:deck-d".to_string()))
    );
}

#[test]
fn test_same_identity_may_run_again_after_completion() {
    let executor = Executor::new();
    for _ in 0..2 {
        let goal = Goal::builder("export:deck-e")
            .end_state(ScriptedProbe::always(ProbeResult::Unconfirmed))
            .strategy(Strategy::new(
                "noop",
                CountingAction::new(),
                ScriptedProbe::always(ProbeResult::Confirmed),
            ))
            .build()
            .unwrap();
        assert!(executor.run(goal).is_ok());
    }
}

#[test]
fn test_builder_rejects_malformed_goals() {
    let result = Goal::builder("  ")
        .end_state(ScriptedProbe::always(ProbeResult::Unconfirmed))
        .build();
    assert!(matches!(result, Err(ConfigError::EmptyGoalName)));

    let result = Goal::builder("export:deck-f").build();
    assert!(matches!(result, Err(ConfigError::MissingEndStateProbe(name)) if name == "export:deck-f"));
}

#[test]
fn test_error_classification() {
    let config: KernelError = ConfigError::EmptyGoalName.into();
    assert!(config.is_config_error());
    assert!(!config.is_recoverable());

    let journal: KernelError = JournalError::ChainBroken(3).into();
    assert!(!journal.is_recoverable(), "a tampered journal is not recoverable");

    let state: KernelError = StateError::IllegalTransition {
        from: GoalState::Failed,
        to: GoalState::Running,
    }
    .into();
    assert!(state.is_recoverable());
    assert!(!state.is_config_error());
}

#[test]
fn test_terminal_probe_keeps_last_error_on_exhaustion() {
    let goal = Goal::builder("export:deck-g")
        .end_state(ScriptedProbe::always(ProbeResult::Unconfirmed))
        .strategy(Strategy::new(
            "unreliable",
            CountingAction::new(),
            ScriptedProbe::always(ProbeResult::Error("plugin not loaded".into())),
        ))
        .build()
        .unwrap();

    let outcome = Executor::new().run(goal).unwrap();

    assert_eq!(outcome.kind, OutcomeKind::AllStrategiesExhausted);
    assert_eq!(
        outcome.terminal_probe,
        ProbeResult::Error("plugin not loaded".to_string())
    );
}
