//! Diagnostics lifecycle and the execution journal.
//!
//! Two concerns live here. `init_diagnostics` owns the process-wide tracing
//! subscriber, with an explicit configured-once lifecycle; components never
//! read ambient globals (the executor takes its journal as a constructor
//! argument). [`EventLog`] is an append-only, hash-chained
//! journal of executor decisions (guard verdicts, strategy attempts,
//! release failures, terminal outcomes), so a batch run leaves an auditable
//! trail even when every individual failure was swallowed softly.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use crate::error::JournalError;
use crate::types::{EventId, GoalId, Timestamp};

static DIAGNOSTICS: AtomicBool = AtomicBool::new(false);

/// Install the process-wide tracing subscriber. Idempotent.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`.
pub fn init_diagnostics() {
    if DIAGNOSTICS.swap(true, Ordering::SeqCst) {
        return;
    }
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    // try_init: a test harness may already have installed a subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn diagnostics_initialized() -> bool {
    DIAGNOSTICS.load(Ordering::SeqCst)
}

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub timestamp: Timestamp,
    pub goal_id: GoalId,
    pub goal_name: String,
    pub action: String,
    pub detail: String,
    pub prev_hash: [u8; 32],
    pub hash: [u8; 32],
}

impl Event {
    /// Build an entry with hashes zeroed; `EventLog::append` fills them in.
    pub fn record(
        goal_id: GoalId,
        goal_name: impl Into<String>,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            timestamp: crate::types::now_timestamp(),
            goal_id,
            goal_name: goal_name.into(),
            action: action.into(),
            detail: detail.into(),
            prev_hash: [0u8; 32],
            hash: [0u8; 32],
        }
    }
}

/// Append-only, tamper-evident journal of executor events.
#[derive(Debug, Default)]
pub struct EventLog {
    inner: Mutex<Vec<Event>>,
}

impl EventLog {
    /// Rebuild a journal from previously exported events, e.g. for offline
    /// integrity validation. Hashes are kept as-is, not recomputed.
    pub fn from_events(events: Vec<Event>) -> Self {
        Self {
            inner: Mutex::new(events),
        }
    }

    pub fn append(&self, mut event: Event) -> EventId {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map(|e| e.hash).unwrap_or([0u8; 32]);
        event.prev_hash = prev_hash;
        event.hash = compute_hash(&event);
        let id = event.event_id;
        guard.push(event);
        id
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Walk the chain, checking both linkage and per-event hashes.
    pub fn verify_integrity(&self) -> Result<(), JournalError> {
        let guard = self.inner.lock();
        let mut prev = [0u8; 32];
        for (index, event) in guard.iter().enumerate() {
            if event.prev_hash != prev {
                return Err(JournalError::ChainBroken(index));
            }
            if event.hash != compute_hash(event) {
                return Err(JournalError::HashMismatch(index));
            }
            prev = event.hash;
        }
        Ok(())
    }
}

fn compute_hash(event: &Event) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(event.event_id.0.as_bytes());
    hasher.update(event.timestamp.to_le_bytes());
    hasher.update(event.goal_id.0.as_bytes());
    hasher.update(event.goal_name.as_bytes());
    hasher.update([0]);
    hasher.update(event.action.as_bytes());
    hasher.update([0]);
    hasher.update(event.detail.as_bytes());
    hasher.update([0]);
    hasher.update(event.prev_hash);
    hasher.finalize().into()
}
