//! Converge Kernel (converge-kernel)
//!
//! A resilient-operation executor: a small policy engine that drives an
//! unreliable external system to verified end-states. Given a goal ("ensure
//! a named page exists", "write this selection to a file"), it tries a
//! prioritized chain of candidate strategies, accepts the first one whose
//! postcondition probe confirms, and otherwise reports a typed failure
//! without throwing away partial progress.
//!
//! Two-phase design:
//! 1. **Construction Phase**: build and validate goals (`GoalBuilder`)
//! 2. **Execution Phase**: execute validated goals (`Executor`)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use converge_kernel::prelude::*;
//!
//! // Construction phase
//! let goal = Goal::builder("export:deck-a")
//!     .end_state(|| probe_output_file())
//!     .strategy(Strategy::new("native-api", native_export, || probe_output_file()))
//!     .strategy(Strategy::new("command-line", command_export, || probe_output_file()))
//!     .build()?;
//!
//! // Execution phase
//! let executor = Executor::new();
//! let outcome = executor.run(goal)?;
//! assert!(outcome.succeeded());
//! ```

// Core modules
pub mod api;
pub mod error;
pub mod executor;
pub mod goal;
pub mod logging;
pub mod resource;
pub mod state_machine;
pub mod types;
pub mod waiter;

// Test harness
pub mod test_harness;

// Re-exports
pub use api::*;
pub use error::*;
pub use types::*;

/// Re-export the working set for convenience
pub mod prelude {
    pub use crate::api::{Action, Probe, Releasable, StabilityObserver};
    pub use crate::error::{ConfigError, JournalError, KernelError, ReleaseError, StateError};
    pub use crate::executor::{BatchPolicy, Executor, ExecutorConfig};
    pub use crate::goal::{Goal, GoalBuilder, Strategy};
    pub use crate::logging::{Event, EventLog};
    pub use crate::resource::{scratch, ReleaseReport, ResourceTracker};
    pub use crate::types::{
        AttemptRecord, ExecutionOutcome, GoalId, GoalState, Observation, OutcomeKind, ProbeResult,
    };
    pub use crate::waiter::StabilizationWaiter;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Check if running with strict debugging enabled
pub const fn strict_debug() -> bool {
    cfg!(feature = "strict-debug")
}
