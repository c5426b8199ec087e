//! One-shot timers driven by simulated time.
//!
//! The scheduler replaces engine timer callbacks with an explicit table:
//! `schedule_once` hands back a handle, `advance` reports which handles fired
//! during the elapsed slice. Nothing blocks; the authoritative loop calls
//! `advance` and dispatches the fired handles itself.

use serde::{Deserialize, Serialize};

/// Handle to a scheduled one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy)]
struct Timer {
    handle: TimerHandle,
    fire_at: f64,
}

/// Sim-time one-shot timer table.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: f64,
    next_handle: u64,
    pending: Vec<Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Arm a timer that fires `delay` seconds from now. Negative delays
    /// clamp to zero and fire on the next `advance`.
    pub fn schedule_once(&mut self, delay: f64) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.pending.push(Timer {
            handle,
            fire_at: self.now + delay.max(0.0),
        });
        handle
    }

    /// Disarm a timer. Returns false if the handle is unknown or already fired.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.handle != handle);
        self.pending.len() != before
    }

    /// Seconds until the timer fires, if it is still pending.
    pub fn remaining(&self, handle: TimerHandle) -> Option<f64> {
        self.pending
            .iter()
            .find(|t| t.handle == handle)
            .map(|t| (t.fire_at - self.now).max(0.0))
    }

    /// Advance simulated time by `dt` seconds and return the handles that
    /// fired, earliest first.
    pub fn advance(&mut self, dt: f64) -> Vec<TimerHandle> {
        self.now += dt.max(0.0);
        let now = self.now;

        let mut fired: Vec<Timer> = Vec::new();
        self.pending.retain(|t| {
            if t.fire_at <= now {
                fired.push(*t);
                false
            } else {
                true
            }
        });

        fired.sort_by(|a, b| {
            a.fire_at
                .partial_cmp(&b.fire_at)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.handle.0.cmp(&b.handle.0))
        });
        fired.into_iter().map(|t| t.handle).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
