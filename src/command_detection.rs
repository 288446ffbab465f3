//! Langit-Lupa: sky/ground command reaction game.
//!
//! A caller alternates randomly between LANGIT ("sky") and LUPA
//! ("ground"). The player must perform the matching pose inside a
//! reaction window that shrinks as the score climbs. A wrong pose or a
//! missed window ends the game; there is no partial credit for being
//! almost in time.
//!
//! LANGIT is read from the nose rising sharply or climbing well above
//! its calibrated standing position. LUPA is read from a squat, with a
//! fallback for the common failure where the camera loses the legs as
//! the player drops: low leg visibility plus a large nose drop still
//! counts as being on the ground.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detector::{Cooldown, GestureDetector};
use crate::geometry::angle_between;
use crate::session::{GameHud, GameMode, Verdict};
use crate::physics::PoseAnalyzer;
use crate::types::{
    Command, Frame, GameType, GestureEvent, KinematicState, LandmarkKey, PhysicsState,
};

/// Nose must rise this fraction of the measured body height above its
/// standing baseline for a sustained LANGIT.
const LANGIT_RISE_FRACTION: f32 = 0.30;
/// Per-frame upward nose jump that counts as a LANGIT spike.
const LANGIT_SPIKE_DELTA: f32 = -0.05;
/// Knee angle below which a leg reads as bent.
const SQUAT_KNEE_ANGLE_MAX: f32 = 150.0;
/// Leg visibility below which the LUPA fallback applies.
const LUPA_FALLBACK_VISIBILITY: f32 = 0.5;
/// Nose drop (fraction of body height) required by the LUPA fallback.
const LUPA_DROP_FRACTION: f32 = 0.30;
/// Debounce between recognized poses, so one squat answers one command.
const POSE_COOLDOWN_MS: u64 = 500;

/// Initial reaction window.
const INITIAL_REACTION_MS: u64 = 2000;
/// Window shrink per level-up.
const REACTION_STEP_MS: u64 = 100;
/// Smallest allowed window.
const MIN_REACTION_MS: u64 = 800;
/// Points per level-up.
const POINTS_PER_LEVEL: u32 = 5;

/// Recognizes LANGIT and LUPA poses against a calibrated baseline.
///
/// Command-agnostic: it reports whichever pose the player performed and
/// leaves right/wrong judgement to the session rules.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    baseline_nose_y: Option<f32>,
    body_height: Option<f32>,
    prev_nose_y: Option<f32>,
    cooldown: Cooldown,
}

impl CommandDetector {
    pub fn new() -> Self {
        Self {
            baseline_nose_y: None,
            body_height: None,
            prev_nose_y: None,
            cooldown: Cooldown::new(POSE_COOLDOWN_MS),
        }
    }

    /// Captures the standing nose height and body span at calibration.
    pub fn set_baseline(&mut self, nose_y: f32, body_height: f32) {
        self.baseline_nose_y = Some(nose_y);
        self.body_height = Some(body_height);
    }

    fn is_langit(&self, nose_y: f32, nose_delta: Option<f32>) -> bool {
        if matches!(nose_delta, Some(d) if d < LANGIT_SPIKE_DELTA) {
            return true;
        }
        match (self.baseline_nose_y, self.body_height) {
            (Some(baseline), Some(height)) => {
                baseline - nose_y > height * LANGIT_RISE_FRACTION
            }
            _ => false,
        }
    }

    fn is_lupa(&self, frame: &Frame, nose_y: f32, physics: Option<&PhysicsState>) -> bool {
        if matches!(physics, Some(p) if p.state == KinematicState::Squat) {
            return true;
        }
        if knees_bent(frame) {
            return true;
        }

        // Tracking-loss fallback: the legs vanish as the player drops.
        let (Some(baseline), Some(height)) = (self.baseline_nose_y, self.body_height) else {
            return false;
        };
        leg_visibility(frame) < LUPA_FALLBACK_VISIBILITY
            && nose_y - baseline > height * LUPA_DROP_FRACTION
    }
}

impl Default for CommandDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureDetector for CommandDetector {
    fn tick(
        &mut self,
        frame: &Frame,
        physics: Option<&PhysicsState>,
        now_ms: u64,
    ) -> Option<GestureEvent> {
        let nose = frame.get(LandmarkKey::Nose)?;
        let delta = self.prev_nose_y.map(|prev| nose.y - prev);
        self.prev_nose_y = Some(nose.y);

        // LUPA first: a squatting player's nose can still be moving fast.
        let performed = if self.is_lupa(frame, nose.y, physics) {
            Command::Lupa
        } else if self.is_langit(nose.y, delta) {
            Command::Langit
        } else {
            return None;
        };

        if !self.cooldown.try_fire(now_ms) {
            return None;
        }
        Some(GestureEvent::CommandMatched(performed))
    }

    fn reset(&mut self) {
        self.baseline_nose_y = None;
        self.body_height = None;
        self.prev_nose_y = None;
        self.cooldown.reset();
    }
}

/// True when the visible knee angles (hip-knee-ankle) read as bent.
/// Falls back to a single leg when only one is fully tracked.
fn knees_bent(frame: &Frame) -> bool {
    let leg = |hip, knee, ankle| {
        let (h, k, a) = (frame.get(hip)?, frame.get(knee)?, frame.get(ankle)?);
        Some(angle_between(h, k, a))
    };

    let left = leg(LandmarkKey::LeftHip, LandmarkKey::LeftKnee, LandmarkKey::LeftAnkle);
    let right = leg(
        LandmarkKey::RightHip,
        LandmarkKey::RightKnee,
        LandmarkKey::RightAnkle,
    );
    match (left, right) {
        (Some(l), Some(r)) => l < SQUAT_KNEE_ANGLE_MAX && r < SQUAT_KNEE_ANGLE_MAX,
        (Some(one), None) | (None, Some(one)) => one < SQUAT_KNEE_ANGLE_MAX,
        (None, None) => false,
    }
}

/// Mean visibility of the leg landmarks; undetected ones count as zero.
fn leg_visibility(frame: &Frame) -> f32 {
    let keys = [
        LandmarkKey::LeftKnee,
        LandmarkKey::RightKnee,
        LandmarkKey::LeftAnkle,
        LandmarkKey::RightAnkle,
    ];
    let total: f32 = keys
        .iter()
        .map(|&k| frame.get(k).map_or(0.0, |l| l.visibility_or_max()))
        .sum();
    total / keys.len() as f32
}

/// Langit-Lupa session rules: the caller, the clock, and the scoring.
pub struct LangitLupaGame {
    detector: CommandDetector,
    command: Command,
    deadline_ms: u64,
    last_now_ms: u64,
    score: u32,
    rng: StdRng,
}

impl LangitLupaGame {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic construction for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            detector: CommandDetector::new(),
            command: Command::Langit,
            deadline_ms: 0,
            last_now_ms: 0,
            score: 0,
            rng,
        }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    /// Level: 1 at the start, +1 per five points.
    pub fn level(&self) -> u32 {
        self.score / POINTS_PER_LEVEL + 1
    }

    /// Reaction window for the current level.
    pub fn reaction_window_ms(&self) -> u64 {
        INITIAL_REACTION_MS
            .saturating_sub(REACTION_STEP_MS * (self.level() - 1) as u64)
            .max(MIN_REACTION_MS)
    }

    fn call_next_command(&mut self, now_ms: u64) {
        self.command = if self.rng.gen_bool(0.5) {
            Command::Langit
        } else {
            Command::Lupa
        };
        self.deadline_ms = now_ms + self.reaction_window_ms();
        debug!(
            "command {} called, {} ms to react",
            self.command.display(),
            self.reaction_window_ms()
        );
    }

    fn on_match(&mut self, performed: Command, now_ms: u64) -> Verdict {
        if performed != self.command {
            debug!(
                "wrong pose: performed {}, commanded {}",
                performed.display(),
                self.command.display()
            );
            return Verdict::Loss;
        }

        // Faster reactions score more: 1 point plus up to 5 for speed.
        let remaining = self.deadline_ms.saturating_sub(now_ms);
        let window = self.reaction_window_ms();
        let bonus = ((remaining as f32 / window as f32) * 5.0).floor() as u32;
        self.score += 1 + bonus;
        debug!(
            "matched {} with {} ms left: +{} (score {})",
            performed.display(),
            remaining,
            1 + bonus,
            self.score
        );

        self.call_next_command(now_ms);
        Verdict::Continue
    }
}

impl Default for LangitLupaGame {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMode for LangitLupaGame {
    fn game_type(&self) -> GameType {
        GameType::LangitLupa
    }

    fn on_calibrated(&mut self, frame: &Frame, analyzer: &mut PoseAnalyzer) {
        let Some(nose) = frame.get(LandmarkKey::Nose) else {
            return;
        };
        // Full nose-to-ankle span; a coarse default if depth smoothing
        // has nothing yet.
        let height = analyzer.user_height(frame).unwrap_or(0.7);
        self.detector.set_baseline(nose.y, height);
    }

    fn on_play_start(&mut self, now_ms: u64) {
        self.last_now_ms = now_ms;
        self.call_next_command(now_ms);
    }

    fn advance_clock(&mut self, now_ms: u64) -> Verdict {
        self.last_now_ms = now_ms;
        if now_ms >= self.deadline_ms && self.deadline_ms > 0 {
            debug!("reaction window expired for {}", self.command.display());
            return Verdict::Loss;
        }
        Verdict::Continue
    }

    fn process_frame(
        &mut self,
        frame: &Frame,
        physics: Option<&PhysicsState>,
        now_ms: u64,
    ) -> Verdict {
        self.last_now_ms = now_ms;
        match self.detector.tick(frame, physics, now_ms) {
            Some(GestureEvent::CommandMatched(performed)) => self.on_match(performed, now_ms),
            _ => Verdict::Continue,
        }
    }

    fn score(&self) -> u32 {
        self.score
    }

    fn hud(&self) -> GameHud {
        GameHud::Command {
            command: self.command.display(),
            reaction_remaining_ms: self.deadline_ms.saturating_sub(self.last_now_ms),
            level: self.level(),
        }
    }

    fn reset(&mut self) {
        self.detector.reset();
        self.command = Command::Langit;
        self.deadline_ms = 0;
        self.last_now_ms = 0;
        self.score = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Landmark;

    fn nose_frame(timestamp_ms: u64, nose_y: f32) -> Frame {
        Frame::new(timestamp_ms).with(LandmarkKey::Nose, Landmark::new(0.5, nose_y))
    }

    fn squat_frame(timestamp_ms: u64) -> Frame {
        // Knees sharply bent: hip and ankle nearly level with the knee.
        Frame::new(timestamp_ms)
            .with(LandmarkKey::Nose, Landmark::new(0.5, 0.45))
            .with(LandmarkKey::LeftHip, Landmark::new(0.40, 0.60))
            .with(LandmarkKey::RightHip, Landmark::new(0.60, 0.60))
            .with(LandmarkKey::LeftKnee, Landmark::new(0.35, 0.70))
            .with(LandmarkKey::RightKnee, Landmark::new(0.65, 0.70))
            .with(LandmarkKey::LeftAnkle, Landmark::new(0.42, 0.72))
            .with(LandmarkKey::RightAnkle, Landmark::new(0.58, 0.72))
    }

    fn detector_with_baseline() -> CommandDetector {
        let mut det = CommandDetector::new();
        det.set_baseline(0.20, 0.70);
        det
    }

    #[test]
    fn test_langit_from_velocity_spike() {
        let mut det = detector_with_baseline();
        assert_eq!(det.tick(&nose_frame(0, 0.20), None, 0), None);
        // 0.06 rise in one frame.
        assert_eq!(
            det.tick(&nose_frame(33, 0.14), None, 33),
            Some(GestureEvent::CommandMatched(Command::Langit))
        );
    }

    #[test]
    fn test_langit_from_sustained_rise() {
        let mut det = CommandDetector::new();
        det.set_baseline(0.50, 0.70);

        // Climb in 0.04 steps: each delta is below the spike threshold,
        // so only the cumulative rise past 0.30 × 0.70 = 0.21 can fire.
        let mut event = None;
        for (i, y) in [0.50, 0.46, 0.42, 0.38, 0.34, 0.31, 0.28].iter().enumerate() {
            let t = i as u64 * 33;
            event = det.tick(&nose_frame(t, *y), None, t);
            if *y > 0.29 {
                assert_eq!(event, None, "fired before the rise threshold at y={}", y);
            }
        }
        assert_eq!(event, Some(GestureEvent::CommandMatched(Command::Langit)));
    }

    #[test]
    fn test_lupa_from_knee_angles() {
        let mut det = detector_with_baseline();
        assert_eq!(
            det.tick(&squat_frame(0), None, 0),
            Some(GestureEvent::CommandMatched(Command::Lupa))
        );
    }

    #[test]
    fn test_lupa_fallback_on_tracking_loss() {
        let mut det = detector_with_baseline();
        // Legs gone, nose dropped 0.25 > 0.21: still reads as LUPA.
        assert_eq!(
            det.tick(&nose_frame(0, 0.45), None, 0),
            Some(GestureEvent::CommandMatched(Command::Lupa))
        );
        // Same drop with fully visible straight legs is not LUPA.
        let mut det = detector_with_baseline();
        let frame = nose_frame(0, 0.45)
            .with(LandmarkKey::LeftKnee, Landmark::with_depth(0.45, 0.70, 0.0, 0.9))
            .with(LandmarkKey::RightKnee, Landmark::with_depth(0.55, 0.70, 0.0, 0.9))
            .with(LandmarkKey::LeftAnkle, Landmark::with_depth(0.45, 0.90, 0.0, 0.9))
            .with(LandmarkKey::RightAnkle, Landmark::with_depth(0.55, 0.90, 0.0, 0.9));
        // Straight legs: hip missing, so angle check skips, visibility high.
        assert_eq!(det.tick(&frame, None, 0), None);
    }

    #[test]
    fn test_neutral_pose_matches_nothing() {
        let mut det = detector_with_baseline();
        assert_eq!(det.tick(&nose_frame(0, 0.20), None, 0), None);
        assert_eq!(det.tick(&nose_frame(33, 0.21), None, 33), None);
        assert_eq!(det.tick(&nose_frame(66, 0.19), None, 66), None);
    }

    #[test]
    fn test_pose_cooldown() {
        let mut det = detector_with_baseline();
        assert!(det.tick(&squat_frame(0), None, 0).is_some());
        assert!(det.tick(&squat_frame(100), None, 100).is_none());
        assert!(det.tick(&squat_frame(500), None, 500).is_some());
    }

    #[test]
    fn test_scoring_formula() {
        let mut game = LangitLupaGame::seeded(11);
        game.on_play_start(0);

        // Level 1: 2000 ms window, matched with 1000 ms remaining.
        let performed = game.command();
        assert_eq!(game.on_match(performed, 1000), Verdict::Continue);
        assert_eq!(game.score(), 3); // 1 + floor((1000/2000) × 5)
    }

    #[test]
    fn test_level_up_shrinks_window() {
        let mut game = LangitLupaGame::seeded(2);
        game.on_play_start(0);
        assert_eq!(game.reaction_window_ms(), 2000);

        game.score = 5;
        assert_eq!(game.level(), 2);
        assert_eq!(game.reaction_window_ms(), 1900);

        // The floor holds no matter how high the level climbs.
        game.score = 500;
        assert_eq!(game.reaction_window_ms(), MIN_REACTION_MS);
    }

    #[test]
    fn test_wrong_pose_is_fatal() {
        let mut game = LangitLupaGame::seeded(4);
        game.on_play_start(0);
        let wrong = game.command().other();
        assert_eq!(game.on_match(wrong, 500), Verdict::Loss);
    }

    #[test]
    fn test_timeout_is_fatal() {
        let mut game = LangitLupaGame::seeded(4);
        game.on_play_start(1000);

        assert_eq!(game.advance_clock(2999), Verdict::Continue);
        assert_eq!(game.advance_clock(3000), Verdict::Loss);
    }

    #[test]
    fn test_hud_reports_command_and_window() {
        let mut game = LangitLupaGame::seeded(4);
        game.on_play_start(0);
        game.advance_clock(600);

        match game.hud() {
            GameHud::Command {
                command,
                reaction_remaining_ms,
                level,
            } => {
                assert!(command == "LANGIT" || command == "LUPA");
                assert_eq!(reaction_remaining_ms, 1400);
                assert_eq!(level, 1);
            }
            other => panic!("wrong hud variant: {:?}", other),
        }
    }
}
