//! Testing utilities for the Converge workspace
//!
//! Shared fixtures: scripted probes, counting actions, an in-memory flaky
//! store, and recording resources. All handles are cheaply cloneable so a
//! test can keep one clone for assertions after the goal consumed the other.

#![allow(missing_docs)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use converge_kernel::api::{Action, Probe, Releasable, StabilityObserver};
use converge_kernel::error::ReleaseError;
use converge_kernel::resource::ResourceTracker;
use converge_kernel::types::{Observation, ProbeResult};

/// A probe that plays back a scripted sequence of verdicts, then a fallback.
#[derive(Clone)]
pub struct ScriptedProbe {
    inner: Arc<ScriptedProbeInner>,
}

struct ScriptedProbeInner {
    script: Mutex<VecDeque<ProbeResult>>,
    fallback: ProbeResult,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(script: Vec<ProbeResult>, fallback: ProbeResult) -> Self {
        Self {
            inner: Arc::new(ScriptedProbeInner {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn always(verdict: ProbeResult) -> Self {
        Self::new(Vec::new(), verdict)
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

impl Probe for ScriptedProbe {
    fn check(&self) -> ProbeResult {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.inner.fallback.clone())
    }
}

/// An action that only counts how often it ran.
#[derive(Clone, Default)]
pub struct CountingAction {
    runs: Arc<AtomicUsize>,
}

impl CountingAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Action for CountingAction {
    fn attempt(&mut self, _scratch: &mut ResourceTracker) {
        self.runs.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory stand-in for the flaky external system: named slots holding
/// sizes, with writes that can be made to silently fail.
#[derive(Clone, Default)]
pub struct FlakyStore {
    slots: Arc<Mutex<HashMap<String, u64>>>,
    failing_writes: Arc<Mutex<HashMap<String, u32>>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, size: u64) {
        self.slots.lock().insert(key.to_string(), size);
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.slots.lock().get(key).copied()
    }

    pub fn contains_nonzero(&self, key: &str) -> bool {
        matches!(self.slots.lock().get(key), Some(v) if *v > 0)
    }

    /// Make the next `count` writes to `key` drop silently.
    pub fn fail_next_writes(&self, key: &str, count: u32) {
        self.failing_writes.lock().insert(key.to_string(), count);
    }

    /// Action writing `size` into `key`, honoring injected write failures.
    pub fn writer(&self, key: &str, size: u64) -> impl FnMut(&mut ResourceTracker) + 'static {
        let store = self.clone();
        let key = key.to_string();
        move |_tracker: &mut ResourceTracker| {
            let mut failing = store.failing_writes.lock();
            if let Some(remaining) = failing.get_mut(&key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return;
                }
            }
            drop(failing);
            store.slots.lock().insert(key.clone(), size);
        }
    }

    /// Probe: does `key` hold a nonzero size?
    pub fn exists_probe(&self, key: &str) -> ExistsProbe {
        ExistsProbe {
            store: self.clone(),
            key: key.to_string(),
        }
    }
}

pub struct ExistsProbe {
    store: FlakyStore,
    key: String,
}

impl Probe for ExistsProbe {
    fn check(&self) -> ProbeResult {
        if self.store.contains_nonzero(&self.key) {
            ProbeResult::Confirmed
        } else {
            ProbeResult::Unconfirmed
        }
    }
}

/// Shared record of release order across a goal execution.
#[derive(Clone, Default)]
pub struct ReleaseLog {
    order: Arc<Mutex<Vec<String>>>,
}

impl ReleaseLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(&self, label: &str) -> RecordingResource {
        RecordingResource {
            label: label.to_string(),
            log: Arc::clone(&self.order),
            fail: false,
        }
    }

    pub fn failing_resource(&self, label: &str) -> RecordingResource {
        RecordingResource {
            label: label.to_string(),
            log: Arc::clone(&self.order),
            fail: true,
        }
    }

    pub fn order(&self) -> Vec<String> {
        self.order.lock().clone()
    }
}

pub struct RecordingResource {
    label: String,
    log: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl Releasable for RecordingResource {
    fn label(&self) -> &str {
        &self.label
    }

    fn release(&mut self) -> Result<(), ReleaseError> {
        if self.fail {
            return Err(ReleaseError(format!("{} refused to release", self.label)));
        }
        self.log.lock().push(self.label.clone());
        Ok(())
    }
}

/// Observer playing back a scripted sequence, then `Absent`.
pub struct ScriptedObserver {
    script: VecDeque<Observation>,
    calls: usize,
}

impl ScriptedObserver {
    pub fn new(script: Vec<Observation>) -> Self {
        Self {
            script: script.into(),
            calls: 0,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl StabilityObserver for ScriptedObserver {
    fn observe(&mut self) -> Observation {
        self.calls += 1;
        self.script.pop_front().unwrap_or(Observation::Absent)
    }
}

/// Observer whose reading grows on every poll and never stabilizes.
#[derive(Default)]
pub struct GrowingObserver {
    next: u64,
}

impl GrowingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StabilityObserver for GrowingObserver {
    fn observe(&mut self) -> Observation {
        self.next += 1;
        Observation::Measured(self.next)
    }
}
