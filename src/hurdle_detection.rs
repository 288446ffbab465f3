//! Luksong Tinik: hurdle jumping over a rising line.
//!
//! A virtual hurdle line spans the frame at a normalized height. The
//! player clears it by jumping high enough that both knees and the nose
//! rise above the line; each clear advances one level and raises the
//! line. Sinking far below the line (ducking under instead of jumping
//! over) is fatal.
//!
//! Detection is edge-triggered: the clear fires on the transition into
//! the above-line pose, never repeatedly while the pose is held, so one
//! jump scores exactly once.

use log::debug;

use crate::detector::GestureDetector;
use crate::session::{GameHud, GameMode, Verdict};
use crate::types::{Frame, GameType, GestureEvent, LandmarkKey, PhysicsState};

/// Nose must rise this far above the hurdle line for a clear. Knees can
/// graze the line; the nose margin is what proves a real jump.
const NOSE_CLEARANCE_MARGIN: f32 = 0.05;
/// Nose this far below the line means the player went under, not over.
const MISS_MARGIN: f32 = 0.10;

/// Starting hurdle height (normalized y, measured from frame top). Sits
/// just above a standing player's knees, so any real jump clears it.
const INITIAL_HURDLE_LINE: f32 = 0.65;
/// Level-up raises the line by this much.
const LINE_RAISE_PER_LEVEL: f32 = 0.10;
/// The line never rises above this (smaller y = higher in frame).
const LINE_FLOOR: f32 = 0.25;

/// Levels to clear for a win.
const LEVELS_TO_WIN: u32 = 5;
/// Per-level time limit.
const LEVEL_TIME_MS: u64 = 60_000;
/// Score per cleared hurdle.
const POINTS_PER_CLEAR: u32 = 10;

/// Edge-triggered hurdle clearance detector.
#[derive(Debug, Clone)]
pub struct HurdleDetector {
    hurdle_line: f32,
    /// True while the clear pose is held; blocks repeat fires.
    above: bool,
}

impl HurdleDetector {
    pub fn new(hurdle_line: f32) -> Self {
        Self {
            hurdle_line,
            above: false,
        }
    }

    pub fn hurdle_line(&self) -> f32 {
        self.hurdle_line
    }

    /// Moves the line for a new level and re-arms the edge trigger.
    pub fn set_hurdle_line(&mut self, line: f32) {
        self.hurdle_line = line;
        self.above = false;
    }
}

impl GestureDetector for HurdleDetector {
    fn tick(
        &mut self,
        frame: &Frame,
        _physics: Option<&PhysicsState>,
        _now_ms: u64,
    ) -> Option<GestureEvent> {
        let nose = frame.get(LandmarkKey::Nose)?;

        // Going under the line is fatal and needs no knee tracking.
        if nose.y > self.hurdle_line + MISS_MARGIN {
            return Some(GestureEvent::MissedBelow);
        }

        let left_knee = frame.get(LandmarkKey::LeftKnee)?;
        let right_knee = frame.get(LandmarkKey::RightKnee)?;

        let clearing = left_knee.y < self.hurdle_line
            && right_knee.y < self.hurdle_line
            && nose.y < self.hurdle_line - NOSE_CLEARANCE_MARGIN;

        if clearing && !self.above {
            self.above = true;
            return Some(GestureEvent::HurdleCleared);
        }
        if !clearing {
            self.above = false;
        }
        None
    }

    fn reset(&mut self) {
        self.above = false;
    }
}

/// Luksong Tinik session rules: one hurdle per level, five levels, a
/// 60-second clock per level.
pub struct HurdleGame {
    detector: HurdleDetector,
    level: u32,
    score: u32,
    /// Wall-clock deadline for the current level.
    level_deadline_ms: Option<u64>,
    last_now_ms: u64,
}

impl HurdleGame {
    pub fn new() -> Self {
        Self {
            detector: HurdleDetector::new(INITIAL_HURDLE_LINE),
            level: 1,
            score: 0,
            level_deadline_ms: None,
            last_now_ms: 0,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    fn seconds_remaining(&self) -> u32 {
        match self.level_deadline_ms {
            Some(deadline) => {
                (deadline.saturating_sub(self.last_now_ms)).div_ceil(1000) as u32
            }
            None => (LEVEL_TIME_MS / 1000) as u32,
        }
    }

    fn on_clear(&mut self) -> Verdict {
        self.score += POINTS_PER_CLEAR;
        debug!("hurdle cleared at level {}, score {}", self.level, self.score);

        if self.level >= LEVELS_TO_WIN {
            return Verdict::Win;
        }
        self.level += 1;
        let raised = self.detector.hurdle_line() - LINE_RAISE_PER_LEVEL;
        self.detector.set_hurdle_line(raised.max(LINE_FLOOR));
        Verdict::LevelClear
    }
}

impl Default for HurdleGame {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMode for HurdleGame {
    fn game_type(&self) -> GameType {
        GameType::LuksongTinik
    }

    fn on_play_start(&mut self, now_ms: u64) {
        self.level_deadline_ms = Some(now_ms + LEVEL_TIME_MS);
        self.last_now_ms = now_ms;
        self.detector.reset();
    }

    fn advance_clock(&mut self, now_ms: u64) -> Verdict {
        self.last_now_ms = now_ms;
        match self.level_deadline_ms {
            Some(deadline) if now_ms >= deadline => Verdict::Loss,
            _ => Verdict::Continue,
        }
    }

    fn process_frame(
        &mut self,
        frame: &Frame,
        physics: Option<&PhysicsState>,
        now_ms: u64,
    ) -> Verdict {
        match self.detector.tick(frame, physics, now_ms) {
            Some(GestureEvent::HurdleCleared) => self.on_clear(),
            Some(GestureEvent::MissedBelow) => Verdict::Loss,
            _ => Verdict::Continue,
        }
    }

    fn score(&self) -> u32 {
        self.score
    }

    fn hud(&self) -> GameHud {
        GameHud::Hurdle {
            level: self.level,
            hurdle_line: self.detector.hurdle_line(),
            seconds_remaining: self.seconds_remaining(),
        }
    }

    fn reset(&mut self) {
        self.detector = HurdleDetector::new(INITIAL_HURDLE_LINE);
        self.level = 1;
        self.score = 0;
        self.level_deadline_ms = None;
        self.last_now_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Landmark;

    fn pose(timestamp_ms: u64, nose_y: f32, knee_y: f32) -> Frame {
        Frame::new(timestamp_ms)
            .with(LandmarkKey::Nose, Landmark::new(0.5, nose_y))
            .with(LandmarkKey::LeftKnee, Landmark::new(0.45, knee_y))
            .with(LandmarkKey::RightKnee, Landmark::new(0.55, knee_y))
    }

    #[test]
    fn test_clear_requires_knees_and_nose_margin() {
        let mut det = HurdleDetector::new(0.75);

        // Knees above the line but nose inside the margin: no clear.
        let event = det.tick(&pose(0, 0.72, 0.70), None, 0);
        assert_eq!(event, None);

        // Nose above line − 0.05 and both knees above: clear.
        let event = det.tick(&pose(16, 0.69, 0.70), None, 16);
        assert_eq!(event, Some(GestureEvent::HurdleCleared));
    }

    #[test]
    fn test_clear_is_edge_triggered() {
        let mut det = HurdleDetector::new(0.75);

        assert_eq!(
            det.tick(&pose(0, 0.60, 0.70), None, 0),
            Some(GestureEvent::HurdleCleared)
        );
        // Held above: no repeat.
        assert_eq!(det.tick(&pose(16, 0.60, 0.70), None, 16), None);
        assert_eq!(det.tick(&pose(32, 0.58, 0.69), None, 32), None);

        // Drop back under the line, then jump again: fires again.
        assert_eq!(det.tick(&pose(48, 0.72, 0.80), None, 48), None);
        assert_eq!(
            det.tick(&pose(64, 0.60, 0.70), None, 64),
            Some(GestureEvent::HurdleCleared)
        );
    }

    #[test]
    fn test_missed_below_is_detected() {
        let mut det = HurdleDetector::new(0.75);
        // Nose below line + 0.10: went under.
        assert_eq!(
            det.tick(&pose(0, 0.86, 0.90), None, 0),
            Some(GestureEvent::MissedBelow)
        );
        // Exactly at the margin is still allowed.
        let mut det = HurdleDetector::new(0.75);
        assert_eq!(det.tick(&pose(0, 0.85, 0.90), None, 0), None);
    }

    #[test]
    fn test_missing_knees_skips_evaluation() {
        let mut det = HurdleDetector::new(0.75);
        let frame = Frame::new(0).with(LandmarkKey::Nose, Landmark::new(0.5, 0.60));
        assert_eq!(det.tick(&frame, None, 0), None);
    }

    #[test]
    fn test_level_progression_raises_line() {
        let mut game = HurdleGame::new();
        game.on_play_start(0);

        assert_eq!(game.on_clear(), Verdict::LevelClear);
        assert_eq!(game.level(), 2);
        assert!((game.detector.hurdle_line() - 0.55).abs() < 1e-6);
        assert_eq!(game.score(), 10);

        // Clear through level 4; the fifth clear wins.
        assert_eq!(game.on_clear(), Verdict::LevelClear);
        assert_eq!(game.on_clear(), Verdict::LevelClear);
        assert_eq!(game.on_clear(), Verdict::LevelClear);
        assert_eq!(game.on_clear(), Verdict::Win);
        assert_eq!(game.score(), 50);
    }

    #[test]
    fn test_line_clamps_at_floor() {
        let mut game = HurdleGame::new();
        game.detector.set_hurdle_line(0.30);
        game.on_clear();
        assert!((game.detector.hurdle_line() - 0.25).abs() < 1e-6);
        game.level = 2;
        game.on_clear();
        assert!((game.detector.hurdle_line() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_level_timer_expiry_is_fatal() {
        let mut game = HurdleGame::new();
        game.on_play_start(1000);

        assert_eq!(game.advance_clock(60_999), Verdict::Continue);
        assert_eq!(game.advance_clock(61_000), Verdict::Loss);
    }

    #[test]
    fn test_hud_reports_level_and_clock() {
        let mut game = HurdleGame::new();
        game.on_play_start(0);
        game.advance_clock(12_000);

        match game.hud() {
            GameHud::Hurdle {
                level,
                seconds_remaining,
                ..
            } => {
                assert_eq!(level, 1);
                assert_eq!(seconds_remaining, 48);
            }
            other => panic!("wrong hud variant: {:?}", other),
        }
    }
}
