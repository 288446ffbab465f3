//! Shared gesture detector contract.
//!
//! All five game detectors implement the same tick interface: consume the
//! current frame plus the analyzer's physics state, update private
//! cooldown/baseline state, and emit zero or one gesture event. The
//! session owns the detector and only ticks it while playing, so
//! detectors never need to know the session lifecycle.

use crate::types::{Frame, GestureEvent, PhysicsState};

/// Per-tick gesture detection capability.
///
/// Implementations are pure functions of their private state plus the
/// inputs; they must never block and must tolerate frames with any subset
/// of landmarks missing (skip evaluation, never guess).
pub trait GestureDetector {
    /// Processes one frame. `physics` is `None` when the analyzer could
    /// not classify the frame (missing hip/ankle landmarks).
    fn tick(
        &mut self,
        frame: &Frame,
        physics: Option<&PhysicsState>,
        now_ms: u64,
    ) -> Option<GestureEvent>;

    /// Clears all private state for a new session.
    fn reset(&mut self);
}

/// Minimum-interval debounce shared by detectors.
///
/// `try_fire` accepts the first attempt and then rejects attempts until
/// the interval has elapsed.
#[derive(Debug, Clone)]
pub struct Cooldown {
    interval_ms: u64,
    last_fired_ms: Option<u64>,
}

impl Cooldown {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_fired_ms: None,
        }
    }

    /// Attempts to fire at `now_ms`. Returns true and records the time if
    /// the cooldown has elapsed (or never fired), false otherwise.
    pub fn try_fire(&mut self, now_ms: u64) -> bool {
        match self.last_fired_ms {
            Some(last) if now_ms.saturating_sub(last) < self.interval_ms => false,
            _ => {
                self.last_fired_ms = Some(now_ms);
                true
            }
        }
    }

    /// True if a fire attempt at `now_ms` would be accepted.
    pub fn ready(&self, now_ms: u64) -> bool {
        match self.last_fired_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
            None => true,
        }
    }

    pub fn reset(&mut self) {
        self.last_fired_ms = None;
    }
}
