use crate::types::GoalState;

/// Goal construction and executor misuse errors.
///
/// These are the only errors the executor raises as hard failures; external
/// system flakiness is always reported through typed outcomes instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("goal name must not be empty")]
    EmptyGoalName,

    #[error("goal '{0}' declares no end-state probe")]
    MissingEndStateProbe(String),

    #[error("goal '{0}' is already running")]
    GoalAlreadyRunning(String),
}

/// Failure to release one ephemeral resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ReleaseError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("illegal state transition: {from:?} -> {to:?}")]
    IllegalTransition { from: GoalState, to: GoalState },
}

/// Execution journal integrity errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JournalError {
    #[error("hash chain broken at event index {0}")]
    ChainBroken(usize),

    #[error("event hash mismatch at event index {0}")]
    HashMismatch(usize),
}

/// Umbrella error for kernel operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("state machine error: {0}")]
    State(#[from] StateError),

    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("release error: {0}")]
    Release(#[from] ReleaseError),
}

impl KernelError {
    /// Whether the caller may sensibly continue with remaining goals.
    pub fn is_recoverable(&self) -> bool {
        match self {
            KernelError::Config(_) => false,
            KernelError::Journal(JournalError::ChainBroken(_))
            | KernelError::Journal(JournalError::HashMismatch(_)) => false,
            KernelError::State(_) => true,
            KernelError::Release(_) => true,
        }
    }

    /// Programmer or configuration error, as opposed to external flakiness.
    pub fn is_config_error(&self) -> bool {
        matches!(self, KernelError::Config(_))
    }
}
