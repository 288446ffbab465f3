//! Core data types for the pose mini-game engine.
//!
//! This module defines the fundamental types used throughout the
//! frame → physics → gesture → session pipeline. All types are designed
//! to make intent obvious: if a concept exists, it gets a type. Raw tuples
//! and untyped collections never cross module boundaries.
//!
//! Design note: We use f32 for all landmark math. Keypoint models emit
//! normalized coordinates with at most three significant digits of real
//! precision, so f64 buys nothing.

use serde::Serialize;
use thiserror::Error;

/// Error reported by the upstream landmark source (keypoint model or camera).
///
/// Carried on the frame that observed it. A frame with a source error
/// short-circuits calibration and gesture detection until the error clears;
/// it never crashes the session machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The keypoint model failed to run on this frame.
    #[error("keypoint model error: {0}")]
    Model(String),
    /// The camera stream stopped delivering frames.
    #[error("camera stream stalled")]
    StreamStalled,
}

/// The nine tracked body keypoints.
///
/// This is the full input contract: consumers must tolerate any subset
/// being absent on any frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkKey {
    Nose,
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl LandmarkKey {
    /// All tracked keys, in canonical order.
    pub const ALL: [LandmarkKey; 9] = [
        LandmarkKey::Nose,
        LandmarkKey::LeftShoulder,
        LandmarkKey::RightShoulder,
        LandmarkKey::LeftHip,
        LandmarkKey::RightHip,
        LandmarkKey::LeftKnee,
        LandmarkKey::RightKnee,
        LandmarkKey::LeftAnkle,
        LandmarkKey::RightAnkle,
    ];

    /// Dense storage index for this key.
    pub fn index(self) -> usize {
        match self {
            LandmarkKey::Nose => 0,
            LandmarkKey::LeftShoulder => 1,
            LandmarkKey::RightShoulder => 2,
            LandmarkKey::LeftHip => 3,
            LandmarkKey::RightHip => 4,
            LandmarkKey::LeftKnee => 5,
            LandmarkKey::RightKnee => 6,
            LandmarkKey::LeftAnkle => 7,
            LandmarkKey::RightAnkle => 8,
        }
    }
}

/// A single detected body keypoint.
///
/// `x` and `y` are normalized to [0, 1] relative to frame width/height,
/// with y increasing downward. `z` is optional model depth. `visibility`
/// is the model's detection confidence in [0, 1]. Absence of the whole
/// landmark means "not detected this frame", not zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: Option<f32>,
    pub visibility: Option<f32>,
}

impl Landmark {
    /// Creates a 2D landmark with no depth or visibility information.
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility: None,
        }
    }

    /// Creates a landmark with full model output.
    pub fn with_depth(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z: Some(z),
            visibility: Some(visibility),
        }
    }

    /// Visibility score, treating an unreported score as fully visible.
    pub fn visibility_or_max(&self) -> f32 {
        self.visibility.unwrap_or(1.0)
    }
}

/// One timestamped snapshot of all tracked landmarks.
///
/// Produced at the landmark source's natural cadence. Timestamps may be
/// irregular and any subset of keys may be missing; downstream consumers
/// must tolerate both.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Capture timestamp in milliseconds. Must be non-decreasing per session.
    pub timestamp_ms: u64,
    /// Sparse landmark storage, indexed by `LandmarkKey::index`.
    landmarks: [Option<Landmark>; 9],
    /// Pixel dimensions of the source video, when the host knows them.
    /// Used for the calibration distance check.
    pub video_size: Option<(u32, u32)>,
    /// Error reported by the landmark source for this frame, if any.
    pub source_error: Option<SourceError>,
}

impl Frame {
    /// Creates an empty frame with no detected landmarks.
    pub fn new(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            landmarks: [None; 9],
            video_size: None,
            source_error: None,
        }
    }

    /// Creates a frame that carries a source error instead of landmarks.
    pub fn with_error(timestamp_ms: u64, error: SourceError) -> Self {
        let mut frame = Self::new(timestamp_ms);
        frame.source_error = Some(error);
        frame
    }

    /// Returns the landmark for `key`, if it was detected this frame.
    pub fn get(&self, key: LandmarkKey) -> Option<&Landmark> {
        self.landmarks[key.index()].as_ref()
    }

    /// Stores a landmark for `key`.
    pub fn set(&mut self, key: LandmarkKey, landmark: Landmark) {
        self.landmarks[key.index()] = Some(landmark);
    }

    /// Builder-style landmark insertion. Convenient for tests and demos.
    pub fn with(mut self, key: LandmarkKey, landmark: Landmark) -> Self {
        self.set(key, landmark);
        self
    }

    /// True if every key in `keys` was detected this frame.
    pub fn has_all(&self, keys: &[LandmarkKey]) -> bool {
        keys.iter().all(|k| self.get(*k).is_some())
    }

    /// Number of landmarks detected this frame.
    pub fn detected_count(&self) -> usize {
        self.landmarks.iter().filter(|l| l.is_some()).count()
    }

    /// Midpoint of two landmarks, if both are present.
    pub fn midpoint(&self, a: LandmarkKey, b: LandmarkKey) -> Option<Landmark> {
        let (la, lb) = (self.get(a)?, self.get(b)?);
        let z = match (la.z, lb.z) {
            (Some(za), Some(zb)) => Some((za + zb) / 2.0),
            _ => None,
        };
        Some(Landmark {
            x: (la.x + lb.x) / 2.0,
            y: (la.y + lb.y) / 2.0,
            z,
            visibility: None,
        })
    }
}

/// The five-way kinematic classification produced by the pose analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KinematicState {
    /// Standing or otherwise uninteresting motion.
    Neutral,
    /// Hips accelerating upward with measured ankle clearance.
    JumpStart,
    /// Near-zero vertical velocity at the top of a jump.
    Apex,
    /// Hips descending after a jump.
    Landing,
    /// Hip-to-ankle distance compressed past the squat threshold.
    Squat,
}

impl KinematicState {
    /// True for any of the three airborne jump phases.
    pub fn is_jump_phase(&self) -> bool {
        matches!(
            self,
            KinematicState::JumpStart | KinematicState::Apex | KinematicState::Landing
        )
    }
}

/// Per-frame kinematic evidence emitted by the pose analyzer.
///
/// Only meaningful if both hip and ankle landmarks were present in the
/// contributing frame; the analyzer returns `None` otherwise rather than
/// guessing. Not persisted beyond the analyzer's rolling trackers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsState {
    /// Kinematic classification for this frame.
    pub state: KinematicState,
    /// Hip midpoint vertical velocity in normalized units per millisecond.
    /// Negative = rising (image y grows downward).
    pub hip_velocity: f32,
    /// Current hip-midpoint to ankle-midpoint distance (normalized units).
    pub hip_ankle_distance: f32,
    /// Standing baseline for the hip-ankle distance, once established.
    pub standing_hip_ankle_distance: Option<f32>,
    /// How far the ankles have risen above their baseline (normalized units,
    /// positive = ankles rose). This is the anti-cheat evidence.
    pub ankle_vertical_movement: f32,
    /// Confidence in the classification [0.0, 1.0].
    pub confidence: f32,
}

/// Horizontal lane occupied by the player, derived from nose X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Left,
    Center,
    Right,
}

impl Lane {
    /// All lanes, in left-to-right order.
    pub const ALL: [Lane; 3] = [Lane::Left, Lane::Center, Lane::Right];

    /// Buckets a normalized nose X coordinate into a lane.
    ///
    /// Bucket lower bounds are inclusive: x = 0.33 is Center, x = 0.66 is
    /// Right. Out-of-range input clamps to the nearest lane.
    pub fn from_nose_x(x: f32) -> Lane {
        if x < 0.33 {
            Lane::Left
        } else if x < 0.66 {
            Lane::Center
        } else {
            Lane::Right
        }
    }
}

/// A called command in the Langit-Lupa reaction game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    /// "Sky": reach up — nose must rise into the top band.
    Langit,
    /// "Ground": get down — squat.
    Lupa,
}

impl Command {
    /// Display string used by the HUD boundary.
    pub fn display(&self) -> &'static str {
        match self {
            Command::Langit => "LANGIT",
            Command::Lupa => "LUPA",
        }
    }

    /// The opposite command.
    pub fn other(&self) -> Command {
        match self {
            Command::Langit => Command::Lupa,
            Command::Lupa => Command::Langit,
        }
    }
}

/// A discrete, game-meaningful interpretation of the landmark stream.
///
/// Detectors emit at most one of these per tick, and only while the owning
/// session is playing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// The player cleared the current hurdle line.
    HurdleCleared,
    /// The player dropped below the hurdle miss line. Fatal.
    MissedBelow,
    /// The player's nose moved into a different lane.
    LaneChanged(Lane),
    /// A knee lift was accepted; payload is the stride speed multiplier.
    KneeLifted { multiplier: f32 },
    /// A hop landed while balancing on one leg; payload is the target cell.
    HopLanded { cell: u8 },
    /// The player performed a recognizable command pose. The session
    /// compares it against the commanded one.
    CommandMatched(Command),
}

/// Which of the five mini-games a session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameType {
    /// Hurdle jumping over a rising line.
    LuksongTinik,
    /// Lane dodging against spawned blockers.
    Patintero,
    /// High-knee sprint race against an autonomous opponent.
    AgawanBase,
    /// One-leg balance hopscotch over a 3×5 grid.
    Piko,
    /// Sky/ground command reaction game.
    LangitLupa,
}

impl GameType {
    /// Stable identifier used in the result-reporting payload.
    pub fn name(&self) -> &'static str {
        match self {
            GameType::LuksongTinik => "luksong-tinik",
            GameType::Patintero => "patintero",
            GameType::AgawanBase => "agawan-base",
            GameType::Piko => "piko",
            GameType::LangitLupa => "langit-lupa",
        }
    }

    /// Estimated energy burn rate while playing, in kcal per minute.
    ///
    /// Coarse MET-style figures; the outcome payload only promises an
    /// estimate, not a measurement.
    pub fn kcal_per_minute(&self) -> f32 {
        match self {
            GameType::LuksongTinik => 8.0,
            GameType::Patintero => 7.0,
            GameType::AgawanBase => 9.0,
            GameType::Piko => 6.0,
            GameType::LangitLupa => 7.0,
        }
    }
}

/// Final result of a play-through, handed to the result-reporting boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    /// Stable game identifier.
    pub game_type: String,
    /// Final score.
    pub score: u32,
    /// Whole-kilocalorie energy estimate for the play duration.
    pub calories_estimate: u32,
    /// True if the session ended by meeting the game's win condition.
    #[serde(skip)]
    pub won: bool,
}
