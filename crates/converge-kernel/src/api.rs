//! Ports onto the external system.
//!
//! The executor knows nothing about what lives behind these traits; it only
//! sequences attempts and reads verdicts. Implementations must not panic for
//! expected failure modes: an effect that did not take hold is reported by
//! the paired probe, not by the action.

use crate::error::ReleaseError;
use crate::resource::ResourceTracker;
use crate::types::{Observation, ProbeResult};

/// A read-only check of whether a target end-state holds.
///
/// Must be side-effect-free and idempotent: calling it repeatedly must not
/// change the verdict. Return `ProbeResult::Error` when the check itself
/// cannot be performed (transient unavailability), so callers can tell
/// "confirmed absent" from "cannot tell".
pub trait Probe {
    fn check(&self) -> ProbeResult;
}

impl<F> Probe for F
where
    F: Fn() -> ProbeResult,
{
    fn check(&self) -> ProbeResult {
        (self)()
    }
}

/// An opaque side-effecting attempt against the external system.
///
/// Actions register any scratch artifacts they create with the supplied
/// tracker; the executor guarantees those are released on every exit path.
pub trait Action {
    fn attempt(&mut self, scratch: &mut ResourceTracker);
}

impl<F> Action for F
where
    F: FnMut(&mut ResourceTracker),
{
    fn attempt(&mut self, scratch: &mut ResourceTracker) {
        (self)(scratch)
    }
}

/// Repeated measurement of an asynchronously-produced effect.
///
/// Unlike [`Probe`] this yields a magnitude, so the waiter can require the
/// same value on consecutive polls before trusting it (a file still being
/// written grows between reads).
pub trait StabilityObserver {
    fn observe(&mut self) -> Observation;
}

impl<F> StabilityObserver for F
where
    F: FnMut() -> Observation,
{
    fn observe(&mut self) -> Observation {
        (self)()
    }
}

/// A side-effect artifact requiring explicit cleanup.
pub trait Releasable {
    /// Short human-readable identity, used in logs and release reports.
    fn label(&self) -> &str;

    /// Release the resource. Called at most once by the tracker.
    fn release(&mut self) -> Result<(), ReleaseError>;
}
