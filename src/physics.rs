//! Pose physics analysis.
//!
//! Turns two scalar vertical trajectories (hip midpoint, ankle midpoint)
//! and one scalar distance (hip-to-ankle) into a robust five-state
//! kinematic classification.
//!
//! The hard problem here is cheat rejection: upper-body bobbing produces
//! hip velocity profiles indistinguishable from a jump in 2D projection.
//! The analyzer therefore refuses to report any jump phase until the
//! ankles have measurably risen above their calibrated baseline. Velocity
//! can be faked by leaning; ground clearance cannot.
//!
//! All numeric edge cases (zero delta-time, degenerate vectors) are
//! absorbed locally with fallback values. A momentary glitch in the
//! keypoint stream must never end a game.

use std::collections::VecDeque;

use crate::geometry::{angle_between, distance};
use crate::types::{Frame, KinematicState, LandmarkKey, PhysicsState};

/// Thresholds for kinematic classification.
///
/// Velocity units are mixed by design: jump starts are judged in
/// normalized units per second (hip velocity × 1000), while apex and
/// landing are judged on the raw per-millisecond value. The thresholds
/// below are tuned as a set; changing the units of one without retuning
/// the others will break detection.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Relative hip-ankle compression that counts as a squat.
    /// 0.20 = hips dropped 20% of standing distance toward the ankles.
    pub squat_decrease_threshold: f32,

    /// Minimum ankle rise above baseline (normalized units) before any
    /// jump phase may be reported. The anti-cheat gate.
    pub min_ankle_lift: f32,

    /// Confidence reported when the anti-cheat gate blocks a jump.
    pub blocked_confidence: f32,

    /// Hip velocity (normalized units per second) below which a jump
    /// start is reported. Negative = rising.
    pub jump_start_velocity: f32,

    /// Raw hip velocity magnitude (units per ms) under which the player
    /// is at the apex of a jump.
    pub apex_velocity_eps: f32,

    /// Raw hip velocity (units per ms) above which the player is landing.
    pub landing_velocity_min: f32,

    /// Raw hip velocity at which landing confidence saturates at 1.0.
    pub landing_velocity_full: f32,

    /// Knee angle (hip-knee-ankle, degrees) under which a leg counts as
    /// bent for squat posture detection.
    pub squat_knee_angle_max: f32,

    /// Samples in the rolling user-height average. Smooths out depth
    /// jitter from the player stepping forward and back.
    pub height_window: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            squat_decrease_threshold: 0.20,
            min_ankle_lift: 0.05,
            blocked_confidence: 0.3,
            jump_start_velocity: -5.0,
            apex_velocity_eps: 0.001,
            landing_velocity_min: 0.01,
            landing_velocity_full: 0.02,
            squat_knee_angle_max: 150.0,
            height_window: 30,
        }
    }
}

/// Incremental vertical velocity estimator for one trajectory.
///
/// Maintains only the previous sample; O(1) per frame.
#[derive(Debug, Clone, Default)]
pub struct VelocityTracker {
    prev_y: Option<f32>,
    prev_timestamp_ms: Option<u64>,
    last_velocity: f32,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one sample and returns velocity in normalized units per
    /// millisecond. Positive = moving down (image y grows downward).
    ///
    /// Returns 0 for the first sample and whenever delta-time is not
    /// positive; a repeated or reordered timestamp must not produce an
    /// infinite velocity.
    pub fn update(&mut self, y: f32, timestamp_ms: u64) -> f32 {
        let velocity = match (self.prev_y, self.prev_timestamp_ms) {
            (Some(prev_y), Some(prev_ts)) => {
                let dt_ms = timestamp_ms.saturating_sub(prev_ts);
                if dt_ms == 0 {
                    0.0
                } else {
                    (y - prev_y) / dt_ms as f32
                }
            }
            _ => 0.0,
        };

        self.prev_y = Some(y);
        self.prev_timestamp_ms = Some(timestamp_ms);
        self.last_velocity = velocity;
        velocity
    }

    /// The most recently computed velocity.
    pub fn velocity(&self) -> f32 {
        self.last_velocity
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Baselines captured once per session while the player stands still.
#[derive(Debug, Clone, Copy)]
struct Baseline {
    /// Hip-to-ankle distance while standing (normalized units).
    standing_hip_ankle_distance: f32,
    /// Ankle midpoint Y while standing.
    ankle_y: f32,
}

/// Per-session pose physics analyzer.
///
/// Must be created fresh (or `reset()`) for every session; stale baselines
/// silently corrupt all jump and squat judgements.
pub struct PoseAnalyzer {
    config: PhysicsConfig,

    hip_tracker: VelocityTracker,
    ankle_tracker: VelocityTracker,

    baseline: Option<Baseline>,
    /// Minimum (highest) ankle midpoint Y observed since the baseline.
    ankle_peak_y: Option<f32>,

    /// Rolling window of raw nose-to-ankle height samples.
    height_samples: VecDeque<f32>,
}

impl PoseAnalyzer {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            hip_tracker: VelocityTracker::new(),
            ankle_tracker: VelocityTracker::new(),
            baseline: None,
            ankle_peak_y: None,
            height_samples: VecDeque::new(),
        }
    }

    /// Captures the standing baselines from a frame.
    ///
    /// Returns false (and leaves any previous baseline untouched) if the
    /// frame is missing hips or ankles. Should be called at the moment
    /// calibration completes, while the player is known to be standing.
    pub fn establish_baseline(&mut self, frame: &Frame) -> bool {
        let hip = frame.midpoint(LandmarkKey::LeftHip, LandmarkKey::RightHip);
        let ankle = frame.midpoint(LandmarkKey::LeftAnkle, LandmarkKey::RightAnkle);

        let (hip, ankle) = match (hip, ankle) {
            (Some(h), Some(a)) => (h, a),
            _ => return false,
        };

        self.baseline = Some(Baseline {
            standing_hip_ankle_distance: distance(&hip, &ankle),
            ankle_y: ankle.y,
        });
        self.ankle_peak_y = Some(ankle.y);
        true
    }

    /// True once a standing baseline has been captured.
    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// Classifies one frame.
    ///
    /// Returns `None` whenever any of the four hip/ankle landmarks is
    /// missing: no classification is ever guessed from partial evidence.
    pub fn analyze(&mut self, frame: &Frame) -> Option<PhysicsState> {
        let hip = frame.midpoint(LandmarkKey::LeftHip, LandmarkKey::RightHip)?;
        let ankle = frame.midpoint(LandmarkKey::LeftAnkle, LandmarkKey::RightAnkle)?;

        let hip_ankle_distance = distance(&hip, &ankle);
        let hip_velocity = self.hip_tracker.update(hip.y, frame.timestamp_ms);
        self.ankle_tracker.update(ankle.y, frame.timestamp_ms);

        // Track the highest ankle position seen since baseline.
        if let Some(peak) = self.ankle_peak_y {
            self.ankle_peak_y = Some(peak.min(ankle.y));
        }
        let ankle_vertical_movement = match (self.baseline, self.ankle_peak_y) {
            (Some(b), Some(peak)) => b.ankle_y - peak,
            _ => 0.0,
        };

        let standing = self.baseline.map(|b| b.standing_hip_ankle_distance);
        let (state, confidence) = self.classify(
            hip_velocity,
            hip_ankle_distance,
            standing,
            ankle_vertical_movement,
        );

        Some(PhysicsState {
            state,
            hip_velocity,
            hip_ankle_distance,
            standing_hip_ankle_distance: standing,
            ankle_vertical_movement,
            confidence,
        })
    }

    /// Squat first, then anti-cheat-gated jump phases.
    fn classify(
        &self,
        hip_velocity: f32,
        hip_ankle_distance: f32,
        standing: Option<f32>,
        ankle_vertical_movement: f32,
    ) -> (KinematicState, f32) {
        let cfg = &self.config;

        // Squat has priority: a compressed hip-ankle distance can also
        // produce downward hip velocity, which must not read as landing.
        if let Some(standing) = standing {
            if standing > 0.0 {
                let decrease = 1.0 - (hip_ankle_distance / standing);
                if decrease >= cfg.squat_decrease_threshold {
                    let confidence = (decrease / cfg.squat_decrease_threshold).min(1.0);
                    return (KinematicState::Squat, confidence);
                }
            }
        }

        // Anti-cheat gate: without measured ankle clearance the hips may
        // be bobbing from a lean, not a jump.
        if ankle_vertical_movement < cfg.min_ankle_lift {
            return (KinematicState::Neutral, cfg.blocked_confidence);
        }

        let velocity_per_s = hip_velocity * 1000.0;
        if velocity_per_s < cfg.jump_start_velocity {
            let confidence = (velocity_per_s.abs() / cfg.jump_start_velocity.abs()).min(1.0);
            (KinematicState::JumpStart, confidence)
        } else if hip_velocity.abs() < cfg.apex_velocity_eps {
            (KinematicState::Apex, 0.9)
        } else if hip_velocity > cfg.landing_velocity_min {
            let confidence = (hip_velocity / cfg.landing_velocity_full).min(1.0);
            (KinematicState::Landing, confidence)
        } else {
            (KinematicState::Neutral, 0.5)
        }
    }

    /// Posture-based squat check, independent of the baseline.
    ///
    /// True when both knee angles (hip-knee-ankle) are bent under the
    /// configured maximum. Falls back to a single leg when only one is
    /// fully visible; returns false when neither leg is complete.
    pub fn is_squatting(&self, frame: &Frame) -> bool {
        let left = self.knee_angle(frame, LandmarkKey::LeftHip, LandmarkKey::LeftKnee, LandmarkKey::LeftAnkle);
        let right = self.knee_angle(frame, LandmarkKey::RightHip, LandmarkKey::RightKnee, LandmarkKey::RightAnkle);

        let max = self.config.squat_knee_angle_max;
        match (left, right) {
            (Some(l), Some(r)) => l < max && r < max,
            (Some(l), None) => l < max,
            (None, Some(r)) => r < max,
            (None, None) => false,
        }
    }

    fn knee_angle(
        &self,
        frame: &Frame,
        hip: LandmarkKey,
        knee: LandmarkKey,
        ankle: LandmarkKey,
    ) -> Option<f32> {
        Some(angle_between(frame.get(hip)?, frame.get(knee)?, frame.get(ankle)?))
    }

    /// Smoothed nose-to-ankle-midpoint height in normalized units.
    ///
    /// Each call with a usable frame feeds the rolling average; the
    /// smoothing resists depth jitter from the player stepping forward
    /// and back. Returns `None` until at least one sample exists.
    pub fn user_height(&mut self, frame: &Frame) -> Option<f32> {
        let nose = frame.get(LandmarkKey::Nose);
        let ankle = frame.midpoint(LandmarkKey::LeftAnkle, LandmarkKey::RightAnkle);

        if let (Some(nose), Some(ankle)) = (nose, ankle) {
            let raw = distance(nose, &ankle);
            if self.height_samples.len() >= self.config.height_window {
                self.height_samples.pop_front();
            }
            self.height_samples.push_back(raw);
        }

        if self.height_samples.is_empty() {
            return None;
        }
        let sum: f32 = self.height_samples.iter().sum();
        Some(sum / self.height_samples.len() as f32)
    }

    /// The last hip velocity, for detectors that watch for spikes.
    pub fn hip_velocity(&self) -> f32 {
        self.hip_tracker.velocity()
    }

    /// Clears all trackers and baselines for a new session.
    ///
    /// Reusing an analyzer across sessions without this silently corrupts
    /// every baseline-relative judgement.
    pub fn reset(&mut self) {
        self.hip_tracker.reset();
        self.ankle_tracker.reset();
        self.baseline = None;
        self.ankle_peak_y = None;
        self.height_samples.clear();
    }
}

impl Default for PoseAnalyzer {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}
