//! Goal execution.
//!
//! The executor drives one goal at a time to a verified outcome: guard
//! first, then the strategy chain in declared order, then unconditional
//! resource release. It performs no retries of its own beyond the declared
//! chain and never raises for external-system flakiness; every expected
//! failure mode is a typed value in the returned [`ExecutionOutcome`].
//!
//! # Critical Invariant
//!
//! The external system is a single shared, unsynchronized session. The
//! executor's sequencing (one goal at a time, guard before chain, refusal
//! to start a goal whose identity is already in flight) is the only
//! concurrency discipline, standing in for locks the target system does not
//! offer.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::ConfigError;
use crate::goal::Goal;
use crate::logging::{Event, EventLog};
use crate::resource::{ReleaseReport, ResourceTracker};
use crate::state_machine;
use crate::types::{
    AttemptRecord, ExecutionOutcome, GoalId, GoalState, OutcomeKind, ProbeResult,
};

/// What a batch does after a goal fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Log the failure and keep going with the remaining goals.
    ContinueOnFailure,
    /// Halt the batch after the first failed goal.
    StopOnFailure,
}

/// Executor configuration.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub batch_policy: BatchPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            batch_policy: BatchPolicy::ContinueOnFailure,
        }
    }
}

/// Drives goals to verified outcomes against a flaky external system.
pub struct Executor {
    config: ExecutorConfig,
    journal: Arc<EventLog>,
    in_flight: Mutex<HashSet<String>>,
}

impl Executor {
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    pub fn with_config(config: ExecutorConfig) -> Self {
        Self::with_journal(config, Arc::new(EventLog::default()))
    }

    /// Use a caller-supplied journal, e.g. one shared with other tooling.
    pub fn with_journal(config: ExecutorConfig, journal: Arc<EventLog>) -> Self {
        Self {
            config,
            journal,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn journal(&self) -> &EventLog {
        &self.journal
    }

    /// Execute one goal to a terminal outcome.
    ///
    /// Returns `Err` only for executor misuse (a goal with this identity is
    /// already in flight). Flaky strategies, failed probes, and exhausted
    /// chains are all reported through the outcome, never as `Err`.
    pub fn run(&self, goal: Goal) -> Result<ExecutionOutcome, ConfigError> {
        {
            let mut in_flight = self.in_flight.lock();
            if !in_flight.insert(goal.name.clone()) {
                return Err(ConfigError::GoalAlreadyRunning(goal.name.clone()));
            }
        }
        let _guard = InFlightGuard {
            executor: self,
            name: goal.name.clone(),
        };
        Ok(self.run_inner(goal))
    }

    /// Execute goals strictly one at a time, in caller order.
    ///
    /// The configured [`BatchPolicy`] decides whether a failed goal halts
    /// the batch; either way every outcome produced so far is returned.
    pub fn run_batch(&self, goals: Vec<Goal>) -> Result<Vec<ExecutionOutcome>, ConfigError> {
        let mut outcomes = Vec::with_capacity(goals.len());
        for goal in goals {
            let name = goal.name().to_string();
            let outcome = self.run(goal)?;
            let failed = !outcome.succeeded();
            outcomes.push(outcome);
            if failed {
                match self.config.batch_policy {
                    BatchPolicy::ContinueOnFailure => {
                        tracing::warn!(goal = %name, "goal failed; continuing batch");
                    }
                    BatchPolicy::StopOnFailure => {
                        tracing::warn!(goal = %name, "goal failed; halting batch");
                        break;
                    }
                }
            }
        }
        Ok(outcomes)
    }

    fn run_inner(&self, goal: Goal) -> ExecutionOutcome {
        let started = Instant::now();
        let Goal {
            id,
            name,
            end_state,
            strategies,
            overwrite,
        } = goal;

        let mut state = GoalState::Pending;
        self.record_event(
            id,
            &name,
            "goal_start",
            format!("strategies={} overwrite={}", strategies.len(), overwrite),
        );

        // Misconfiguration outranks the guard: an empty chain is reported
        // without touching the external system at all.
        if strategies.is_empty() {
            tracing::error!(goal = %name, "goal declares no strategies");
            self.advance(id, &name, &mut state, GoalState::Running);
            self.advance(id, &name, &mut state, GoalState::Failed);
            self.record_event(id, &name, "outcome", "no strategies configured".to_string());
            return ExecutionOutcome {
                goal_id: id,
                goal_name: name,
                kind: OutcomeKind::NoStrategiesConfigured,
                final_state: state,
                guard_probe: None,
                attempts: Vec::new(),
                terminal_probe: ProbeResult::Unconfirmed,
                release: ReleaseReport::default(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            };
        }

        // Idempotency guard. The decision rests solely on the live probe:
        // other actors may have mutated the external system since any
        // previous run, so nothing is cached across invocations.
        let mut guard_probe = None;
        if overwrite {
            self.record_event(id, &name, "guard_probe", "bypassed (overwrite)".to_string());
        } else {
            let verdict = end_state.check();
            self.record_event(id, &name, "guard_probe", format!("{verdict:?}"));
            if verdict.is_confirmed() {
                tracing::info!(goal = %name, "already satisfied; skipping");
                self.advance(id, &name, &mut state, GoalState::Skipped);
                self.record_event(id, &name, "outcome", "skipped, already satisfied".to_string());
                return ExecutionOutcome {
                    goal_id: id,
                    goal_name: name,
                    kind: OutcomeKind::Skipped,
                    final_state: state,
                    guard_probe: Some(ProbeResult::Confirmed),
                    attempts: Vec::new(),
                    terminal_probe: ProbeResult::Confirmed,
                    release: ReleaseReport::default(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                };
            }
            if let ProbeResult::Error(reason) = &verdict {
                tracing::warn!(goal = %name, %reason, "guard probe errored; running chain anyway");
            }
            guard_probe = Some(verdict);
        }

        self.advance(id, &name, &mut state, GoalState::Running);

        let mut tracker = ResourceTracker::new();
        let mut attempts = Vec::new();
        let mut winner: Option<String> = None;
        let mut terminal_probe = ProbeResult::Unconfirmed;

        for mut strategy in strategies {
            self.record_event(id, &name, "attempt", strategy.name.clone());
            strategy.action.attempt(&mut tracker);
            let verdict = strategy.probe.check();
            self.record_event(
                id,
                &name,
                "attempt_result",
                format!("{} -> {:?}", strategy.name, verdict),
            );
            attempts.push(AttemptRecord {
                strategy: strategy.name.clone(),
                probe: verdict.clone(),
            });
            match verdict {
                ProbeResult::Confirmed => {
                    terminal_probe = ProbeResult::Confirmed;
                    winner = Some(strategy.name);
                    break;
                }
                ProbeResult::Unconfirmed => {
                    terminal_probe = ProbeResult::Unconfirmed;
                }
                ProbeResult::Error(reason) => {
                    // A defective probe is a soft failure: a later strategy
                    // may still satisfy the goal.
                    tracing::warn!(
                        goal = %name,
                        strategy = %strategy.name,
                        %reason,
                        "strategy probe errored; trying next"
                    );
                    terminal_probe = ProbeResult::Error(reason);
                }
            }
        }

        // Unconditional on every exit path, reverse creation order.
        let release = tracker.release_all();
        for failure in &release.failures {
            self.record_event(
                id,
                &name,
                "release_failure",
                format!("{}: {}", failure.label, failure.error),
            );
        }

        let kind = match winner {
            Some(strategy) => {
                tracing::info!(goal = %name, %strategy, "goal satisfied");
                self.advance(id, &name, &mut state, GoalState::Succeeded);
                self.record_event(id, &name, "outcome", format!("succeeded via {strategy}"));
                OutcomeKind::StrategySucceeded { strategy }
            }
            None => {
                tracing::warn!(goal = %name, "all strategies exhausted");
                self.advance(id, &name, &mut state, GoalState::Failed);
                self.record_event(id, &name, "outcome", "all strategies exhausted".to_string());
                OutcomeKind::AllStrategiesExhausted
            }
        };

        ExecutionOutcome {
            goal_id: id,
            goal_name: name,
            kind,
            final_state: state,
            guard_probe,
            attempts,
            terminal_probe,
            release,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn advance(&self, goal_id: GoalId, goal_name: &str, state: &mut GoalState, to: GoalState) {
        match state_machine::validate_transition(*state, to) {
            Ok(()) => {
                self.record_event(goal_id, goal_name, "state", format!("{:?} -> {:?}", *state, to));
                *state = to;
            }
            Err(error) => {
                tracing::error!(goal = %goal_name, %error, "refused illegal state transition");
            }
        }
    }

    fn record_event(&self, goal_id: GoalId, goal_name: &str, action: &str, detail: String) {
        self.journal
            .append(Event::record(goal_id, goal_name, action, detail));
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlightGuard<'a> {
    executor: &'a Executor,
    name: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.executor.in_flight.lock().remove(&self.name);
    }
}
