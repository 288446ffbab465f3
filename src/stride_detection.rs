//! Agawan Base: high-knee sprint race against an autonomous opponent.
//!
//! The player runs in place; each accepted knee lift advances them along
//! a 100-unit track, faster for higher lifts. An opponent starts with a
//! 50-unit head start and counts down on a fixed clock. First to the
//! base wins.

use log::debug;

use crate::detector::{Cooldown, GestureDetector};
use crate::scheduler::TickScheduler;
use crate::session::{GameHud, GameMode, Verdict};
use crate::types::{Frame, GameType, GestureEvent, LandmarkKey, PhysicsState};

/// Knee must rise this far above the same-side hip to count as a lift.
const KNEE_LIFT_THRESHOLD: f32 = 0.10;
/// Minimum spacing between accepted lifts.
const LIFT_COOLDOWN_MS: u64 = 300;
/// Multiplier cap; a lift can at most double the base stride.
const MAX_MULTIPLIER: f32 = 2.0;
/// Lift height to multiplier conversion factor.
const MULTIPLIER_GAIN: f32 = 5.0;

/// Track length in progress units.
const TRACK_LENGTH: f32 = 100.0;
/// Base advance per accepted lift, scaled by the stride multiplier.
const BASE_STRIDE: f32 = 0.5;
/// The opponent's head start: it only needs to cover this much.
const OPPONENT_START: f32 = 50.0;
/// Opponent progress per tick.
const OPPONENT_SPEED: f32 = 0.5;
/// Opponent tick interval.
const OPPONENT_TICK_MS: u64 = 100;
/// Bonus for reaching the base first.
const WIN_BONUS: u32 = 100;

/// Debounced high-knee lift detector.
///
/// A lift is accepted when either knee rises past the threshold above
/// its hip, at most once per cooldown window. The emitted multiplier
/// rewards higher lifts.
#[derive(Debug, Clone)]
pub struct StrideDetector {
    cooldown: Cooldown,
}

impl StrideDetector {
    pub fn new() -> Self {
        Self {
            cooldown: Cooldown::new(LIFT_COOLDOWN_MS),
        }
    }

    /// Height of the highest current knee lift above its hip, if any leg
    /// is fully tracked. Positive = knee above hip.
    fn best_lift(frame: &Frame) -> Option<f32> {
        let leg = |hip, knee| {
            let hip = frame.get(hip)?;
            let knee = frame.get(knee)?;
            Some(hip.y - knee.y)
        };

        let left = leg(LandmarkKey::LeftHip, LandmarkKey::LeftKnee);
        let right = leg(LandmarkKey::RightHip, LandmarkKey::RightKnee);
        match (left, right) {
            (Some(l), Some(r)) => Some(l.max(r)),
            (Some(l), None) => Some(l),
            (None, Some(r)) => Some(r),
            (None, None) => None,
        }
    }
}

impl Default for StrideDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureDetector for StrideDetector {
    fn tick(
        &mut self,
        frame: &Frame,
        _physics: Option<&PhysicsState>,
        now_ms: u64,
    ) -> Option<GestureEvent> {
        let lift = Self::best_lift(frame)?;
        if lift < KNEE_LIFT_THRESHOLD || !self.cooldown.try_fire(now_ms) {
            return None;
        }

        let multiplier = (1.0 + lift * MULTIPLIER_GAIN).min(MAX_MULTIPLIER);
        Some(GestureEvent::KneeLifted { multiplier })
    }

    fn reset(&mut self) {
        self.cooldown.reset();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RaceTick {
    Opponent,
}

/// Agawan Base session rules: the race itself.
pub struct AgawanGame {
    detector: StrideDetector,
    player_progress: f32,
    opponent_remaining: f32,
    timers: TickScheduler<RaceTick>,
    won: bool,
}

impl AgawanGame {
    pub fn new() -> Self {
        Self {
            detector: StrideDetector::new(),
            player_progress: 0.0,
            opponent_remaining: OPPONENT_START,
            timers: TickScheduler::new(),
            won: false,
        }
    }

    pub fn player_progress(&self) -> f32 {
        self.player_progress
    }

    pub fn opponent_remaining(&self) -> f32 {
        self.opponent_remaining
    }
}

impl Default for AgawanGame {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMode for AgawanGame {
    fn game_type(&self) -> GameType {
        GameType::AgawanBase
    }

    fn on_play_start(&mut self, now_ms: u64) {
        self.timers.cancel_all();
        self.timers.schedule_repeating(
            RaceTick::Opponent,
            now_ms + OPPONENT_TICK_MS,
            OPPONENT_TICK_MS,
        );
    }

    fn advance_clock(&mut self, now_ms: u64) -> Verdict {
        for _ in self.timers.advance_to(now_ms) {
            self.opponent_remaining -= OPPONENT_SPEED;
            if self.opponent_remaining <= 0.0 {
                self.opponent_remaining = 0.0;
                debug!("opponent reached the base first");
                return Verdict::Loss;
            }
        }
        Verdict::Continue
    }

    fn process_frame(
        &mut self,
        frame: &Frame,
        physics: Option<&PhysicsState>,
        now_ms: u64,
    ) -> Verdict {
        if let Some(GestureEvent::KneeLifted { multiplier }) =
            self.detector.tick(frame, physics, now_ms)
        {
            self.player_progress += BASE_STRIDE * multiplier;
            debug!(
                "knee lift x{:.2}, progress {:.1}",
                multiplier, self.player_progress
            );
            if self.player_progress >= TRACK_LENGTH {
                self.player_progress = TRACK_LENGTH;
                self.won = true;
                return Verdict::Win;
            }
        }
        Verdict::Continue
    }

    fn score(&self) -> u32 {
        let base = self.player_progress.floor() as u32;
        if self.won {
            base + WIN_BONUS
        } else {
            base
        }
    }

    fn hud(&self) -> GameHud {
        GameHud::Stride {
            player_progress: self.player_progress,
            opponent_progress: OPPONENT_START - self.opponent_remaining,
        }
    }

    fn reset(&mut self) {
        self.detector.reset();
        self.player_progress = 0.0;
        self.opponent_remaining = OPPONENT_START;
        self.timers.cancel_all();
        self.won = false;
    }
}
