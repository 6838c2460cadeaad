//! Stabilization waiting for asynchronously-observed effects.
//!
//! Some effects land in the external system long after the action returns,
//! a background exporter still flushing a file being the canonical case.
//! Reading such an effect once is not enough: a file observed mid-write has
//! a size, just not its final one. The waiter polls an observer
//! at a fixed interval and trusts a positive reading only after it repeats
//! identically on consecutive polls.
//!
//! Timeout is a negative result, not an error: the caller decides whether to
//! retry, fall back, or fail.

use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::api::{Probe, StabilityObserver};
use crate::types::{Observation, ProbeResult};

/// Polls an observer until its reading stabilizes or a timeout elapses.
#[derive(Debug, Clone, Copy)]
pub struct StabilizationWaiter {
    poll_interval: Duration,
    timeout: Duration,
    required_stable_readings: u32,
}

impl Default for StabilizationWaiter {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            timeout: Duration::from_secs(20),
            required_stable_readings: 2,
        }
    }
}

impl StabilizationWaiter {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
            ..Self::default()
        }
    }

    /// Override how many consecutive identical positive readings count as
    /// stable. The default of two guards against reading a file mid-write.
    pub fn required_stable_readings(mut self, readings: u32) -> Self {
        self.required_stable_readings = readings.max(1);
        self
    }

    /// Poll until stable, blocking the calling thread between polls.
    ///
    /// Returns `Confirmed` once the observer reports the same positive value
    /// on the required number of consecutive polls, `Unconfirmed` once
    /// elapsed time exceeds the timeout. A zero or absent reading resets the
    /// stability count; an unavailable reading leaves it untouched, matching
    /// the tolerance the underlying systems need for transient probe errors.
    pub fn wait_until_stable<O>(&self, observer: &mut O) -> ProbeResult
    where
        O: StabilityObserver + ?Sized,
    {
        let start = Instant::now();
        let mut last: Option<u64> = None;
        let mut stable: u32 = 0;

        loop {
            if start.elapsed() > self.timeout {
                tracing::debug!(timeout_ms = self.timeout.as_millis() as u64, "stabilization timed out");
                return ProbeResult::Unconfirmed;
            }

            match observer.observe() {
                Observation::Measured(value) if value > 0 => {
                    if last == Some(value) {
                        stable += 1;
                    } else {
                        last = Some(value);
                        stable = 1;
                    }
                    if stable >= self.required_stable_readings {
                        tracing::debug!(value, "observation stabilized");
                        return ProbeResult::Confirmed;
                    }
                }
                Observation::Measured(_) | Observation::Absent => {
                    last = None;
                    stable = 0;
                }
                Observation::Unavailable(reason) => {
                    tracing::debug!(%reason, "observation unavailable; keeping last reading");
                }
            }

            if !self.poll_interval.is_zero() {
                thread::sleep(self.poll_interval);
            }
        }
    }

    /// Package this waiter and an observer as a [`Probe`], for use as a
    /// strategy postcondition over an asynchronous effect.
    pub fn into_probe<O>(self, observer: O) -> impl Probe
    where
        O: StabilityObserver + 'static,
    {
        let cell = Mutex::new(observer);
        move || self.wait_until_stable(&mut *cell.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Script(VecDeque<Observation>, usize);

    impl StabilityObserver for Script {
        fn observe(&mut self) -> Observation {
            self.1 += 1;
            self.0.pop_front().unwrap_or(Observation::Absent)
        }
    }

    #[test]
    fn test_confirms_on_second_identical_reading() {
        let waiter = StabilizationWaiter::new(Duration::ZERO, Duration::from_secs(5));
        let mut script = Script(
            VecDeque::from(vec![
                Observation::Measured(5),
                Observation::Measured(5),
                Observation::Measured(5),
            ]),
            0,
        );
        assert_eq!(waiter.wait_until_stable(&mut script), ProbeResult::Confirmed);
        assert_eq!(script.1, 2, "must not poll a third time");
    }

    #[test]
    fn test_changed_value_resets_stability() {
        let waiter = StabilizationWaiter::new(Duration::ZERO, Duration::from_secs(5));
        let mut script = Script(
            VecDeque::from(vec![
                Observation::Measured(3),
                Observation::Measured(5),
                Observation::Measured(5),
            ]),
            0,
        );
        assert_eq!(waiter.wait_until_stable(&mut script), ProbeResult::Confirmed);
        assert_eq!(script.1, 3);
    }

    #[test]
    fn test_unavailable_reading_does_not_reset() {
        let waiter = StabilizationWaiter::new(Duration::ZERO, Duration::from_secs(5));
        let mut script = Script(
            VecDeque::from(vec![
                Observation::Measured(7),
                Observation::Unavailable("busy".into()),
                Observation::Measured(7),
            ]),
            0,
        );
        assert_eq!(waiter.wait_until_stable(&mut script), ProbeResult::Confirmed);
        assert_eq!(script.1, 3);
    }
}
