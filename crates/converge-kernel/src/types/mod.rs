use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::resource::ReleaseReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GoalId(pub Uuid);

impl GoalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GoalId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

pub type Timestamp = u64;

/// Milliseconds since the Unix epoch.
pub fn now_timestamp() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Result of a read-only check against the external system.
///
/// Deliberately tri-state: "no evidence yet" (asynchronous effects still in
/// flight) must stay distinguishable from "definitely absent", and a check
/// that could not be performed at all is a value, not a panic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeResult {
    /// The desired end-state is observably in place.
    Confirmed,
    /// No evidence the end-state holds. Not an error.
    Unconfirmed,
    /// The check itself could not be performed reliably.
    Error(String),
}

impl ProbeResult {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ProbeResult::Confirmed)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ProbeResult::Error(_))
    }
}

/// Goal lifecycle states.
///
/// `Pending -> (Skipped | Running -> (Succeeded | Failed))`; a goal never
/// re-enters `Running` after reaching a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalState {
    Pending,
    Skipped,
    Running,
    Succeeded,
    Failed,
}

impl GoalState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GoalState::Skipped | GoalState::Succeeded | GoalState::Failed
        )
    }
}

/// How a goal execution ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    /// End-state already held; no strategy was run.
    Skipped,
    /// A strategy's postcondition confirmed.
    StrategySucceeded { strategy: String },
    /// Every strategy was tried; none confirmed.
    AllStrategiesExhausted,
    /// The goal declared no strategies at all.
    NoStrategiesConfigured,
}

/// One strategy attempt and the probe verdict that followed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub strategy: String,
    pub probe: ProbeResult,
}

/// Full record of one goal execution.
///
/// Returned for every run, success or not; callers decide whether a failed
/// goal aborts their batch. Dropping this unread defeats the point.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub goal_id: GoalId,
    pub goal_name: String,
    pub kind: OutcomeKind,
    pub final_state: GoalState,
    /// What the idempotency guard observed, when it ran.
    pub guard_probe: Option<ProbeResult>,
    pub attempts: Vec<AttemptRecord>,
    /// Last probe verdict observed before the goal terminated.
    pub terminal_probe: ProbeResult,
    pub release: ReleaseReport,
    pub elapsed_ms: u64,
}

impl ExecutionOutcome {
    /// True for `Skipped` and `StrategySucceeded` outcomes.
    pub fn succeeded(&self) -> bool {
        matches!(
            self.kind,
            OutcomeKind::Skipped | OutcomeKind::StrategySucceeded { .. }
        )
    }

    /// Name of the winning strategy, if one confirmed.
    pub fn strategy(&self) -> Option<&str> {
        match &self.kind {
            OutcomeKind::StrategySucceeded { strategy } => Some(strategy),
            _ => None,
        }
    }
}

/// Reading taken by a stabilization observer.
///
/// `Measured` carries a magnitude (a file size, an object count) so two
/// consecutive readings can be compared for stability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Observation {
    /// Nothing observable yet.
    Absent,
    /// A measurable effect was observed.
    Measured(u64),
    /// The observation itself could not be taken.
    Unavailable(String),
}
