//! Goals and strategies.
//!
//! Two-phase design: a [`GoalBuilder`] assembles the intent, `build()`
//! validates it, and the resulting [`Goal`] is immutable. A goal is
//! constructed per unit of work, executed once by the executor, and
//! discarded.

use std::fmt;

use crate::api::{Action, Probe};
use crate::error::ConfigError;
use crate::types::GoalId;

/// One candidate way to achieve a goal's end-state.
///
/// Strategies are tried in declared order; later entries are assumed to be
/// more expensive or less reliable fallbacks.
pub struct Strategy {
    pub(crate) name: String,
    pub(crate) action: Box<dyn Action>,
    pub(crate) probe: Box<dyn Probe>,
}

impl Strategy {
    pub fn new(
        name: impl Into<String>,
        action: impl Action + 'static,
        probe: impl Probe + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            action: Box::new(action),
            probe: Box::new(probe),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// A unit of desired work with a verifiable end-state.
pub struct Goal {
    pub(crate) id: GoalId,
    pub(crate) name: String,
    pub(crate) end_state: Box<dyn Probe>,
    pub(crate) strategies: Vec<Strategy>,
    pub(crate) overwrite: bool,
}

impl Goal {
    pub fn builder(name: impl Into<String>) -> GoalBuilder {
        GoalBuilder {
            name: name.into(),
            end_state: None,
            strategies: Vec::new(),
            overwrite: false,
        }
    }

    pub fn id(&self) -> GoalId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Idempotency guard decision: true when the end-state already holds
    /// and `overwrite` was not requested.
    ///
    /// Always consults the live probe. The external system may be mutated
    /// by other actors between runs, so nothing is ever cached.
    pub fn should_skip(&self) -> bool {
        !self.overwrite && self.end_state.check().is_confirmed()
    }
}

impl fmt::Debug for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Goal")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("strategies", &self.strategies.len())
            .field("overwrite", &self.overwrite)
            .finish()
    }
}

/// Construction phase for [`Goal`].
pub struct GoalBuilder {
    name: String,
    end_state: Option<Box<dyn Probe>>,
    strategies: Vec<Strategy>,
    overwrite: bool,
}

impl GoalBuilder {
    /// Probe deciding whether the goal is already satisfied before any
    /// strategy runs.
    pub fn end_state(mut self, probe: impl Probe + 'static) -> Self {
        self.end_state = Some(Box::new(probe));
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Force the chain to run even when the end-state already holds.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Validate and freeze the goal.
    ///
    /// An empty strategy list is deliberately not rejected here: it surfaces
    /// as a distinct `NoStrategiesConfigured` outcome at run time, so batch
    /// callers can see exactly which goal was misconfigured.
    pub fn build(self) -> Result<Goal, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyGoalName);
        }
        let end_state = self
            .end_state
            .ok_or_else(|| ConfigError::MissingEndStateProbe(self.name.clone()))?;
        Ok(Goal {
            id: GoalId::new(),
            name: self.name,
            end_state,
            strategies: self.strategies,
            overwrite: self.overwrite,
        })
    }
}
