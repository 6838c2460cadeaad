//! Converge Simulator - randomized rehearsal harness for the executor.
//!
//! Stands an in-memory flaky store in for the real external system: every
//! strategy attempt may silently fail to take effect, probes may suffer
//! outages, and some goals arrive already satisfied or misconfigured. The
//! simulator knows, from the same seeded draws, exactly how each goal should
//! end, and checks the executor's invariants after every run.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::ConfigError;
use crate::executor::{BatchPolicy, Executor, ExecutorConfig};
use crate::goal::{Goal, Strategy};
use crate::logging::Event;
use crate::resource::{scratch, ResourceTracker};
use crate::types::{ExecutionOutcome, GoalState, OutcomeKind, ProbeResult};

/// Simulator configuration
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Total goals to run
    pub total_goals: u64,
    /// Probability an individual strategy attempt fails to take effect
    pub flakiness: f64,
    /// Probability a goal's end-state already holds before it runs
    pub satisfied_ratio: f64,
    /// Probability a goal arrives with an empty strategy chain
    pub misconfigured_ratio: f64,
    /// Probability a strategy's probe suffers an outage
    pub probe_outage_ratio: f64,
    /// Stop conditions
    pub stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_goals: 1_000,
            flakiness: 0.3,
            satisfied_ratio: 0.2,
            misconfigured_ratio: 0.05,
            probe_outage_ratio: 0.1,
            stop_on_first_violation: true,
        }
    }
}

/// How a generated goal is expected to end, derived from the same seeded
/// draws that built its strategies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExpectedOutcome {
    Skipped,
    Succeeds(String),
    Exhausted,
    Misconfigured,
}

/// A violation detected during simulation
#[derive(Debug, Clone, Serialize)]
pub enum Violation {
    /// Goal outcome didn't match expectation
    UnexpectedOutcome {
        goal_index: u64,
        goal_name: String,
        expected: ExpectedOutcome,
        actual: String,
    },
    /// Invariant was violated
    Invariant(InvariantViolation),
}

/// A specific invariant violation
#[derive(Debug, Clone, Serialize)]
pub struct InvariantViolation {
    pub check: InvariantCheck,
    pub details: String,
}

/// Types of invariant checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InvariantCheck {
    AllScratchResourcesReleased,
    SkippedGoalsRunNoStrategies,
    TerminalStateMatchesOutcome,
    JournalChainUnbroken,
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default, Serialize)]
pub struct GoalStats {
    pub total_goals: u64,
    pub skipped: u64,
    pub succeeded: u64,
    pub exhausted: u64,
    pub misconfigured: u64,
    pub wins_by_strategy: HashMap<String, u64>,
}

impl GoalStats {
    fn record(&mut self, kind: &OutcomeKind) {
        self.total_goals += 1;
        match kind {
            OutcomeKind::Skipped => self.skipped += 1,
            OutcomeKind::StrategySucceeded { strategy } => {
                self.succeeded += 1;
                *self.wins_by_strategy.entry(strategy.clone()).or_insert(0) += 1;
            }
            OutcomeKind::AllStrategiesExhausted => self.exhausted += 1,
            OutcomeKind::NoStrategiesConfigured => self.misconfigured += 1,
        }
    }
}

/// Final report from the simulator
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorReport {
    pub config: SimulatorConfig,
    pub stats: GoalStats,
    pub violations: Vec<Violation>,
    /// Full execution journal, for export and offline validation.
    pub journal: Vec<Event>,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Converge Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Total Goals: {}\n", self.stats.total_goals));
        report.push_str(&format!("Skipped: {}\n", self.stats.skipped));
        report.push_str(&format!("Succeeded: {}\n", self.stats.succeeded));
        report.push_str(&format!("Exhausted: {}\n", self.stats.exhausted));
        report.push_str(&format!("Misconfigured: {}\n", self.stats.misconfigured));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));
        report.push_str(&format!("Journal Events: {}\n", self.journal.len()));

        if !self.stats.wins_by_strategy.is_empty() {
            report.push_str("\n=== Wins by Strategy ===\n");
            let mut wins: Vec<_> = self.stats.wins_by_strategy.iter().collect();
            wins.sort();
            for (strategy, count) in wins {
                report.push_str(&format!("{strategy}: {count}\n"));
            }
        }

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }
}

type SharedStore = Arc<Mutex<HashMap<String, u64>>>;
type ScratchCounters = Arc<Mutex<(u64, u64)>>;

/// Run the Converge Simulator
pub fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let executor = Executor::with_config(ExecutorConfig {
        batch_policy: BatchPolicy::ContinueOnFailure,
    });
    let mut rng = StdRng::seed_from_u64(config.seed);
    let store: SharedStore = Arc::new(Mutex::new(HashMap::new()));
    // (created, released) across the whole run
    let scratch_counts: ScratchCounters = Arc::new(Mutex::new((0, 0)));

    let mut stats = GoalStats::default();
    let mut violations: Vec<Violation> = Vec::new();

    for index in 0..config.total_goals {
        let slot = format!("slot-{index}");
        let (goal, expected) = match generate_goal(&mut rng, &config, &store, &scratch_counts, &slot)
        {
            Ok(pair) => pair,
            Err(error) => {
                violations.push(Violation::UnexpectedOutcome {
                    goal_index: index,
                    goal_name: slot,
                    expected: ExpectedOutcome::Misconfigured,
                    actual: format!("builder error: {error}"),
                });
                if config.stop_on_first_violation {
                    break;
                }
                continue;
            }
        };

        let before = violations.len();
        match executor.run(goal) {
            Ok(outcome) => {
                stats.record(&outcome.kind);
                if !outcome_matches(&expected, &outcome.kind) {
                    violations.push(Violation::UnexpectedOutcome {
                        goal_index: index,
                        goal_name: slot,
                        expected,
                        actual: format!("{:?}", outcome.kind),
                    });
                }
                for v in check_invariants(&executor, &outcome, &scratch_counts) {
                    violations.push(Violation::Invariant(v));
                }
            }
            Err(error) => {
                violations.push(Violation::UnexpectedOutcome {
                    goal_index: index,
                    goal_name: slot,
                    expected,
                    actual: format!("config error: {error}"),
                });
            }
        }

        if config.stop_on_first_violation && violations.len() > before {
            break;
        }
    }

    SimulatorReport {
        config,
        stats,
        violations,
        journal: executor.journal().events(),
    }
}

/// Build one goal against the shared store, plus its expected outcome.
fn generate_goal(
    rng: &mut StdRng,
    config: &SimulatorConfig,
    store: &SharedStore,
    scratch_counts: &ScratchCounters,
    slot: &str,
) -> Result<(Goal, ExpectedOutcome), ConfigError> {
    let end_state = exists_probe(store, slot);

    if rng.gen_bool(config.misconfigured_ratio.clamp(0.0, 1.0)) {
        let goal = Goal::builder(slot).end_state(end_state).build()?;
        return Ok((goal, ExpectedOutcome::Misconfigured));
    }

    let pre_satisfied = rng.gen_bool(config.satisfied_ratio.clamp(0.0, 1.0));
    if pre_satisfied {
        store.lock().insert(slot.to_string(), 1);
    }

    let mut builder = Goal::builder(slot).end_state(end_state);
    let mut will_be_satisfied = false;
    let mut winner: Option<String> = None;

    for name in ["native-api", "legacy-api", "command-line"] {
        let action_succeeds = rng.gen_bool((1.0 - config.flakiness).clamp(0.0, 1.0));
        let probe_outage = rng.gen_bool(config.probe_outage_ratio.clamp(0.0, 1.0));

        // Replay the chain's semantics to know the expected winner: the
        // first strategy whose (honest) probe would see a satisfied store.
        if action_succeeds {
            will_be_satisfied = true;
        }
        if winner.is_none() && !probe_outage && will_be_satisfied {
            winner = Some(name.to_string());
        }

        let action = slot_writer(store, scratch_counts, slot, action_succeeds);
        let strategy = if probe_outage {
            Strategy::new(name, action, || {
                ProbeResult::Error("simulated probe outage".to_string())
            })
        } else {
            Strategy::new(name, action, exists_probe(store, slot))
        };
        builder = builder.strategy(strategy);
    }

    let expected = if pre_satisfied {
        ExpectedOutcome::Skipped
    } else {
        match winner {
            Some(name) => ExpectedOutcome::Succeeds(name),
            None => ExpectedOutcome::Exhausted,
        }
    };

    Ok((builder.build()?, expected))
}

/// Probe: does the slot hold a nonzero value?
fn exists_probe(store: &SharedStore, slot: &str) -> impl Fn() -> ProbeResult + 'static {
    let store = Arc::clone(store);
    let slot = slot.to_string();
    move || match store.lock().get(&slot) {
        Some(v) if *v > 0 => ProbeResult::Confirmed,
        _ => ProbeResult::Unconfirmed,
    }
}

/// Action: leave a scratch artifact behind, then maybe take effect.
fn slot_writer(
    store: &SharedStore,
    scratch_counts: &ScratchCounters,
    slot: &str,
    succeeds: bool,
) -> impl FnMut(&mut ResourceTracker) + 'static {
    let store = Arc::clone(store);
    let counts = Arc::clone(scratch_counts);
    let slot = slot.to_string();
    move |tracker: &mut ResourceTracker| {
        counts.lock().0 += 1;
        let counts_release = Arc::clone(&counts);
        tracker.register(scratch(format!("{slot}:scratch"), move || {
            counts_release.lock().1 += 1;
            Ok(())
        }));
        if succeeds {
            store.lock().insert(slot.clone(), 1);
        }
    }
}

fn outcome_matches(expected: &ExpectedOutcome, actual: &OutcomeKind) -> bool {
    match (expected, actual) {
        (ExpectedOutcome::Skipped, OutcomeKind::Skipped) => true,
        (ExpectedOutcome::Succeeds(name), OutcomeKind::StrategySucceeded { strategy }) => {
            name == strategy
        }
        (ExpectedOutcome::Exhausted, OutcomeKind::AllStrategiesExhausted) => true,
        (ExpectedOutcome::Misconfigured, OutcomeKind::NoStrategiesConfigured) => true,
        _ => false,
    }
}

/// Check all invariants after one goal execution.
fn check_invariants(
    executor: &Executor,
    outcome: &ExecutionOutcome,
    scratch_counts: &ScratchCounters,
) -> Vec<InvariantViolation> {
    let mut out = Vec::new();

    let (created, released) = *scratch_counts.lock();
    if created != released {
        out.push(InvariantViolation {
            check: InvariantCheck::AllScratchResourcesReleased,
            details: format!("created={created} released={released}"),
        });
    }

    if matches!(outcome.kind, OutcomeKind::Skipped) && !outcome.attempts.is_empty() {
        out.push(InvariantViolation {
            check: InvariantCheck::SkippedGoalsRunNoStrategies,
            details: format!(
                "goal '{}' skipped after {} attempts",
                outcome.goal_name,
                outcome.attempts.len()
            ),
        });
    }

    let state_ok = match &outcome.kind {
        OutcomeKind::Skipped => outcome.final_state == GoalState::Skipped,
        OutcomeKind::StrategySucceeded { .. } => outcome.final_state == GoalState::Succeeded,
        OutcomeKind::AllStrategiesExhausted | OutcomeKind::NoStrategiesConfigured => {
            outcome.final_state == GoalState::Failed
        }
    };
    if !state_ok {
        out.push(InvariantViolation {
            check: InvariantCheck::TerminalStateMatchesOutcome,
            details: format!("kind={:?} final_state={:?}", outcome.kind, outcome.final_state),
        });
    }

    if let Err(error) = executor.journal().verify_integrity() {
        out.push(InvariantViolation {
            check: InvariantCheck::JournalChainUnbroken,
            details: error.to_string(),
        });
    }

    out
}
