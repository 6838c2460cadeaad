//! Ephemeral resource bookkeeping.
//!
//! Strategies leave scratch artifacts behind in the external system,
//! temporary layers and half-written files being typical. The tracker
//! guarantees each registered resource is released exactly once, in reverse
//! creation order, on every exit path of a goal execution. One failed release
//! must never leak the rest.

use serde::{Deserialize, Serialize};

use crate::api::Releasable;
use crate::error::ReleaseError;

/// One release that did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFailure {
    pub label: String,
    pub error: String,
}

/// What `release_all` did: which resources were released, which refused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseReport {
    pub released: Vec<String>,
    pub failures: Vec<ReleaseFailure>,
}

impl ReleaseReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Tracks ephemeral resources in creation order.
#[derive(Default)]
pub struct ResourceTracker {
    pending: Vec<Box<dyn Releasable>>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<R: Releasable + 'static>(&mut self, resource: R) {
        tracing::debug!(label = resource.label(), "registered ephemeral resource");
        self.pending.push(Box::new(resource));
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Release everything, most-recently-created first.
    ///
    /// Individual failures are recorded and logged but do not abort the
    /// remaining releases. The tracker drains itself, so a second call is a
    /// no-op returning an empty report.
    pub fn release_all(&mut self) -> ReleaseReport {
        let mut report = ReleaseReport::default();
        while let Some(mut resource) = self.pending.pop() {
            let label = resource.label().to_string();
            match resource.release() {
                Ok(()) => {
                    tracing::debug!(%label, "released ephemeral resource");
                    report.released.push(label);
                }
                Err(ReleaseError(error)) => {
                    tracing::warn!(%label, %error, "failed to release ephemeral resource");
                    report.failures.push(ReleaseFailure { label, error });
                }
            }
        }
        report
    }
}

impl Drop for ResourceTracker {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            let report = self.release_all();
            tracing::warn!(
                released = report.released.len(),
                failures = report.failures.len(),
                "resource tracker dropped with pending resources"
            );
        }
    }
}

/// A [`Releasable`] built from a label and a release closure.
pub struct ScratchResource<F>
where
    F: FnMut() -> Result<(), ReleaseError>,
{
    label: String,
    release: F,
}

impl<F> Releasable for ScratchResource<F>
where
    F: FnMut() -> Result<(), ReleaseError>,
{
    fn label(&self) -> &str {
        &self.label
    }

    fn release(&mut self) -> Result<(), ReleaseError> {
        (self.release)()
    }
}

/// Convenience constructor for closure-backed resources.
pub fn scratch<F>(label: impl Into<String>, release: F) -> ScratchResource<F>
where
    F: FnMut() -> Result<(), ReleaseError>,
{
    ScratchResource {
        label: label.into(),
        release,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_all_is_lifo_and_drains() {
        let mut tracker = ResourceTracker::new();
        tracker.register(scratch("a", || Ok(())));
        tracker.register(scratch("b", || Ok(())));
        tracker.register(scratch("c", || Ok(())));

        let report = tracker.release_all();
        assert_eq!(report.released, vec!["c", "b", "a"]);
        assert!(report.is_clean());

        let second = tracker.release_all();
        assert!(second.released.is_empty());
        assert!(second.failures.is_empty());
    }

    #[test]
    fn test_failed_release_does_not_abort_the_rest() {
        let mut tracker = ResourceTracker::new();
        tracker.register(scratch("a", || Ok(())));
        tracker.register(scratch("b", || Err(ReleaseError("still locked".into()))));
        tracker.register(scratch("c", || Ok(())));

        let report = tracker.release_all();
        assert_eq!(report.released, vec!["c", "a"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].label, "b");
        assert_eq!(report.failures[0].error, "still locked");
    }
}
