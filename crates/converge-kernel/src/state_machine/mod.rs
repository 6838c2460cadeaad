use crate::error::StateError;
use crate::types::GoalState;

/// Validates a goal state transition.
///
/// Illegal transitions panic when the `strict-debug` feature is enabled;
/// otherwise they return an error so callers can exercise failure handling.
pub fn validate_transition(from: GoalState, to: GoalState) -> Result<(), StateError> {
    if allowed(from, to) {
        Ok(())
    } else {
        if cfg!(feature = "strict-debug") {
            panic!("Illegal state transition attempted: {:?} -> {:?}", from, to);
        }
        Err(StateError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: GoalState) -> Vec<GoalState> {
    use GoalState::*;
    match from {
        Pending => vec![Skipped, Running],
        Running => vec![Succeeded, Failed],
        Skipped => vec![],
        Succeeded => vec![],
        Failed => vec![],
    }
}

fn allowed(from: GoalState, to: GoalState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
