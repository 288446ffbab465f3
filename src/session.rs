//! Generic game session state machine.
//!
//! All five mini-games share the same lifecycle:
//!
//! ```text
//! idle → lobby(calibration) → ready → countdown → playing → over
//!                                        ↑            |
//!                                        └── paused ←──┘   (level clear)
//! ```
//!
//! The machine owns everything that previously had to be copy-pasted per
//! game: the calibration gate, the pose analyzer, countdown ticking, the
//! active-play clock, outcome computation and the idempotent terminal
//! transition. Game-specific behavior lives behind the [`GameMode`] trait.
//!
//! Ordering guarantees: frames are processed in non-decreasing timestamp
//! order (stale frames are dropped); within one tick the game clock runs
//! before gesture detection, so a fatal timeout always beats a
//! late-arriving success in the same instant. Entering `over` is
//! first-call-wins: the outcome is computed exactly once and every later
//! end request is a no-op.

use log::{debug, info};
use serde::Serialize;

use crate::calibration::CalibrationGate;
use crate::physics::PoseAnalyzer;
use crate::report::{report_outcome, ResultSink};
use crate::scheduler::TickScheduler;
use crate::types::{Frame, GameType, Lane, PhysicsState, SessionOutcome, SourceError};

/// What a game-mode step decided about the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep playing.
    Continue,
    /// Current level cleared; pause, then count back into play.
    LevelClear,
    /// The game was won. Terminal.
    Win,
    /// The game was lost. Terminal.
    Loss,
}

/// Read-only per-game status projection for HUD rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "game", rename_all = "camelCase")]
pub enum GameHud {
    #[serde(rename_all = "camelCase")]
    Hurdle {
        level: u32,
        hurdle_line: f32,
        seconds_remaining: u32,
    },
    #[serde(rename_all = "camelCase")]
    Lanes {
        lane: Lane,
        dodged: u32,
        incoming: u32,
    },
    #[serde(rename_all = "camelCase")]
    Stride {
        player_progress: f32,
        opponent_progress: f32,
    },
    #[serde(rename_all = "camelCase")]
    Hop {
        target_cell: u8,
        completed: u8,
        one_leg: bool,
    },
    #[serde(rename_all = "camelCase")]
    Command {
        command: &'static str,
        reaction_remaining_ms: u64,
        level: u32,
    },
}

/// Game-specific rules plugged into the shared session machine.
///
/// A mode bundles its gesture detector with its world state (hurdle line,
/// obstacle field, opponent, grid, command caller). The session only
/// calls `advance_clock` and `process_frame` while playing, in that
/// order, so modes never see out-of-lifecycle input.
pub trait GameMode {
    fn game_type(&self) -> GameType;

    /// Countdown ticks (one per second) before play begins.
    fn countdown_ticks(&self) -> u32 {
        3
    }

    /// Called once when calibration completes, with the completing frame.
    /// Modes capture pose baselines here.
    fn on_calibrated(&mut self, _frame: &Frame, _analyzer: &mut PoseAnalyzer) {}

    /// Called when play (re)starts after a countdown. Modes arm their
    /// clocks relative to `now_ms` here.
    fn on_play_start(&mut self, now_ms: u64);

    /// Wall-clock driven world updates: obstacle motion, opponent
    /// progress, reaction deadlines, level timers. Runs before gesture
    /// detection each tick.
    fn advance_clock(&mut self, now_ms: u64) -> Verdict;

    /// Gesture detection and event application for one frame.
    fn process_frame(
        &mut self,
        frame: &Frame,
        physics: Option<&PhysicsState>,
        now_ms: u64,
    ) -> Verdict;

    fn score(&self) -> u32;

    fn hud(&self) -> GameHud;

    /// Clears all world and detector state for a new session.
    fn reset(&mut self);
}

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No session activity. Initial and post-result state.
    Idle,
    /// Calibration gate is judging the player's framing.
    Lobby,
    /// Calibrated; waiting for the external start action.
    Ready,
    /// Counting down into play.
    Countdown,
    /// Live gameplay: detection and game clocks active.
    Playing,
    /// Between levels; waiting to resume.
    Paused,
    /// Terminal. Outcome computed; restart required.
    Over,
}

/// Calibration feedback for the UI boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationHud {
    pub message: &'static str,
    pub progress_percent: u32,
    pub seconds_remaining: u32,
}

/// Full read-only session projection for HUD rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHud {
    pub phase: SessionPhase,
    pub score: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationHud>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<GameHud>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionTick {
    Countdown,
}

/// One play-through of a single mini-game.
///
/// Owns its calibration gate, pose analyzer and timers; all are reset by
/// `restart()`. Exactly one session instance is mutated at a time by the
/// owning control flow.
pub struct GameSession<M: GameMode> {
    mode: M,
    phase: SessionPhase,

    gate: CalibrationGate,
    analyzer: PoseAnalyzer,
    timers: TickScheduler<SessionTick>,

    countdown_remaining: u32,
    /// Timestamp of the most recent accepted frame; stale frames dropped.
    last_frame_ms: Option<u64>,
    /// Start of the current playing segment.
    segment_started_ms: Option<u64>,
    /// Accumulated active-play time across segments (pauses excluded).
    play_time_ms: u64,
    /// Error currently suspending detection, for the UI retry affordance.
    source_error: Option<SourceError>,

    outcome: Option<SessionOutcome>,
    reported: bool,
}

impl<M: GameMode> GameSession<M> {
    pub fn new(mode: M) -> Self {
        Self {
            mode,
            phase: SessionPhase::Idle,
            gate: CalibrationGate::default(),
            analyzer: PoseAnalyzer::default(),
            timers: TickScheduler::new(),
            countdown_remaining: 0,
            last_frame_ms: None,
            segment_started_ms: None,
            play_time_ms: 0,
            source_error: None,
            outcome: None,
            reported: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn game_type(&self) -> GameType {
        self.mode.game_type()
    }

    /// Current score, live during play and frozen after `over`.
    pub fn score(&self) -> u32 {
        match &self.outcome {
            Some(outcome) => outcome.score,
            None => self.mode.score(),
        }
    }

    /// Computed outcome, present only after `over`.
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    /// Direct access to the game mode, for HUD-adjacent queries.
    pub fn mode(&self) -> &M {
        &self.mode
    }

    /// Begins calibration. Only meaningful from `idle`.
    pub fn enter_lobby(&mut self) {
        if self.phase == SessionPhase::Idle {
            self.phase = SessionPhase::Lobby;
            debug!("{}: entering lobby", self.mode.game_type().name());
        }
    }

    /// External start action: `ready → countdown`.
    pub fn start(&mut self, now_ms: u64) {
        if self.phase == SessionPhase::Ready {
            self.begin_countdown(now_ms);
        }
    }

    /// Resumes after a level clear: `paused → countdown`.
    pub fn resume(&mut self, now_ms: u64) {
        if self.phase == SessionPhase::Paused {
            self.begin_countdown(now_ms);
        }
    }

    fn begin_countdown(&mut self, now_ms: u64) {
        self.phase = SessionPhase::Countdown;
        self.countdown_remaining = self.mode.countdown_ticks();
        self.timers.cancel_all();
        self.timers
            .schedule_repeating(SessionTick::Countdown, now_ms + 1000, 1000);
        debug!(
            "{}: countdown from {}",
            self.mode.game_type().name(),
            self.countdown_remaining
        );
    }

    /// Advances wall-clock-driven state without a frame.
    ///
    /// Hosts call this from their timer loop; `process_frame` also calls
    /// it so that frame-driven hosts need no extra plumbing.
    pub fn advance_clock(&mut self, now_ms: u64) {
        for tick in self.timers.advance_to(now_ms) {
            match tick {
                SessionTick::Countdown => {
                    if self.phase != SessionPhase::Countdown {
                        continue;
                    }
                    self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
                    if self.countdown_remaining == 0 {
                        self.timers.cancel_all();
                        self.enter_playing(now_ms);
                    }
                }
            }
        }

        if self.phase == SessionPhase::Playing {
            let verdict = self.mode.advance_clock(now_ms);
            self.apply_verdict(verdict, now_ms);
        }
    }

    /// Processes one landmark frame according to the current phase.
    pub fn process_frame(&mut self, frame: &Frame) {
        // Frames must arrive in non-decreasing timestamp order.
        if let Some(last) = self.last_frame_ms {
            if frame.timestamp_ms < last {
                debug!(
                    "dropping stale frame: {} < {}",
                    frame.timestamp_ms, last
                );
                return;
            }
        }
        self.last_frame_ms = Some(frame.timestamp_ms);

        // Track the source-error latch in every active phase.
        self.source_error = frame.source_error.clone();

        match self.phase {
            SessionPhase::Idle | SessionPhase::Ready | SessionPhase::Paused | SessionPhase::Over => {}
            SessionPhase::Lobby => self.process_lobby_frame(frame),
            SessionPhase::Countdown => {
                // Keep the analyzer's velocity trackers warm so play
                // starts with real velocities instead of a cold first
                // sample.
                self.advance_clock(frame.timestamp_ms);
                if frame.source_error.is_none() {
                    let _ = self.analyzer.analyze(frame);
                }
            }
            SessionPhase::Playing => self.process_playing_frame(frame),
        }
    }

    fn process_lobby_frame(&mut self, frame: &Frame) {
        self.gate.update(frame);
        if self.gate.take_completion() {
            // The completing frame doubles as the standing reference.
            self.analyzer.establish_baseline(frame);
            self.mode.on_calibrated(frame, &mut self.analyzer);
            self.phase = SessionPhase::Ready;
            info!("{}: calibrated, ready to start", self.mode.game_type().name());
        }
    }

    fn process_playing_frame(&mut self, frame: &Frame) {
        let now_ms = frame.timestamp_ms;

        // Clock first: a fatal timeout in this instant must preempt any
        // success the detector would report for the same frame.
        self.advance_clock(now_ms);
        if self.phase != SessionPhase::Playing {
            return;
        }

        // A source error suspends detection until it clears; the game
        // clock keeps running.
        if frame.source_error.is_some() {
            return;
        }

        let physics = self.analyzer.analyze(frame);
        let verdict = self.mode.process_frame(frame, physics.as_ref(), now_ms);
        self.apply_verdict(verdict, now_ms);
    }

    fn apply_verdict(&mut self, verdict: Verdict, now_ms: u64) {
        match verdict {
            Verdict::Continue => {}
            Verdict::LevelClear => {
                if self.phase == SessionPhase::Playing {
                    self.accumulate_play_time(now_ms);
                    self.timers.cancel_all();
                    self.phase = SessionPhase::Paused;
                    info!("{}: level clear", self.mode.game_type().name());
                }
            }
            Verdict::Win => self.end(now_ms, true),
            Verdict::Loss => self.end(now_ms, false),
        }
    }

    fn enter_playing(&mut self, now_ms: u64) {
        self.phase = SessionPhase::Playing;
        self.segment_started_ms = Some(now_ms);
        self.mode.on_play_start(now_ms);
        info!("{}: playing", self.mode.game_type().name());
    }

    fn accumulate_play_time(&mut self, now_ms: u64) {
        if let Some(started) = self.segment_started_ms.take() {
            self.play_time_ms += now_ms.saturating_sub(started);
        }
    }

    /// Terminal transition. Idempotent: the first call computes the
    /// outcome and cancels all timers; every subsequent call is a no-op.
    fn end(&mut self, now_ms: u64, won: bool) {
        if self.phase == SessionPhase::Over {
            return;
        }

        self.accumulate_play_time(now_ms);
        self.timers.cancel_all();
        self.phase = SessionPhase::Over;

        let score = self.mode.score();
        let outcome = SessionOutcome {
            game_type: self.mode.game_type().name().to_string(),
            score,
            calories_estimate: self.calories_estimate(score),
            won,
        };
        info!(
            "{}: over ({}), score {}",
            outcome.game_type,
            if won { "win" } else { "loss" },
            score
        );
        self.outcome = Some(outcome);
    }

    /// Whole-kilocalorie estimate: per-game burn rate over active play
    /// time, plus a small per-score increment for work the clock missed.
    fn calories_estimate(&self, score: u32) -> u32 {
        let minutes = self.play_time_ms as f32 / 60_000.0;
        let from_time = (minutes * self.mode.game_type().kcal_per_minute()).round() as u32;
        from_time + score / 10
    }

    /// Reports the outcome once. Failure is absorbed: the session stays
    /// restartable either way. Calling again after a successful or failed
    /// delivery is a no-op.
    pub fn report(&mut self, sink: &mut dyn ResultSink) -> bool {
        if self.reported {
            return false;
        }
        let Some(outcome) = &self.outcome else {
            return false;
        };
        self.reported = true;
        report_outcome(sink, outcome)
    }

    /// Returns the machine to `idle` for a fresh play-through.
    ///
    /// Cancels all timers, discards buffered state and fully resets the
    /// calibration gate, analyzer and game mode. Reusing any of them
    /// stale would silently corrupt the next session's baselines.
    pub fn restart(&mut self) {
        self.timers.cancel_all();
        self.gate.reset();
        self.analyzer.reset();
        self.mode.reset();
        self.phase = SessionPhase::Idle;
        self.countdown_remaining = 0;
        self.last_frame_ms = None;
        self.segment_started_ms = None;
        self.play_time_ms = 0;
        self.source_error = None;
        self.outcome = None;
        self.reported = false;
    }

    /// Read-only projection of everything the HUD needs.
    pub fn hud(&self) -> SessionHud {
        let calibration = (self.phase == SessionPhase::Lobby).then(|| CalibrationHud {
            message: self.gate.last_status().message(),
            progress_percent: self.gate.progress_percent(),
            seconds_remaining: self.gate.seconds_remaining(),
        });
        let countdown =
            (self.phase == SessionPhase::Countdown).then_some(self.countdown_remaining);
        let game = matches!(
            self.phase,
            SessionPhase::Playing | SessionPhase::Paused | SessionPhase::Over
        )
        .then(|| self.mode.hud());

        SessionHud {
            phase: self.phase,
            score: self.score(),
            calibration,
            countdown,
            game,
            source_error: self.source_error.as_ref().map(|e| e.to_string()),
        }
    }
}
