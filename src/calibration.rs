//! Pre-game framing calibration.
//!
//! Play must not start until the player is correctly framed: fully visible,
//! facing the camera, and standing at a workable distance. Partial
//! visibility is the main cause of false gesture detections, so the gate
//! demands an uninterrupted streak of good frames before it opens.
//!
//! The gate is a per-session object. It fires its completion signal exactly
//! once and then goes inert until `reset()`.

use log::{debug, info};

use crate::geometry::distance;
use crate::types::{Frame, LandmarkKey};

/// Configuration for the calibration gate.
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    /// Minimum visibility score for nose and both shoulders.
    /// Below this the player is probably turned away from the camera.
    pub min_face_visibility: f32,

    /// Minimum ankle-to-ankle distance in pixels. Smaller means the player
    /// is too far from the camera for reliable leg tracking.
    pub min_ankle_gap_px: f32,

    /// Maximum ankle-to-ankle distance in pixels. Larger means the player
    /// is so close that jumps will leave the frame.
    pub max_ankle_gap_px: f32,

    /// Scale applied to the normalized ankle gap when the host never told
    /// us the video pixel dimensions. Approximates a landscape webcam frame.
    pub normalized_fallback_scale: f32,

    /// How long the player must hold a good position (milliseconds).
    pub hold_duration_ms: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_face_visibility: 0.8,
            min_ankle_gap_px: 50.0,
            max_ankle_gap_px: 300.0,
            normalized_fallback_scale: 1000.0,
            hold_duration_ms: 3000,
        }
    }
}

/// Per-frame judgement of the player's framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    /// The landmark source reported an error; nothing can be judged.
    SourceError,
    /// Nose or a shoulder was not detected at all.
    MissingLandmarks,
    /// Face/shoulder visibility below the configured floor.
    LowVisibility,
    /// Ankles not detected; the lower body is out of frame.
    MissingAnkles,
    /// Ankle gap too small; the player is too far away.
    TooFar,
    /// Ankle gap too large; the player is too close.
    TooClose,
    /// Framing is good; the hold timer is accumulating.
    Holding,
    /// The hold completed; the gate is open.
    Complete,
}

impl CalibrationStatus {
    /// Human-readable guidance for the UI boundary.
    pub fn message(&self) -> &'static str {
        match self {
            CalibrationStatus::SourceError => "Camera error - please retry",
            CalibrationStatus::MissingLandmarks => "Position yourself in frame",
            CalibrationStatus::LowVisibility => "Face the camera directly",
            CalibrationStatus::MissingAnkles => "Step back to show full body",
            CalibrationStatus::TooFar => "Step Closer",
            CalibrationStatus::TooClose => "Step Back",
            CalibrationStatus::Holding => "Hold that position",
            CalibrationStatus::Complete => "Ready!",
        }
    }

    /// True when the frame counted toward the hold streak.
    pub fn is_good(&self) -> bool {
        matches!(self, CalibrationStatus::Holding | CalibrationStatus::Complete)
    }
}

/// Gate that validates the player's framing before play begins.
///
/// Consumes frames continuously; any non-good frame resets the hold timer
/// to zero. Only an uninterrupted streak of good frames spanning the
/// configured hold duration opens the gate.
pub struct CalibrationGate {
    config: CalibrationConfig,

    /// Timestamp of the first frame of the current good streak.
    hold_started_ms: Option<u64>,
    /// Milliseconds of good streak accumulated so far.
    held_ms: u64,
    /// Set once the hold completes; the gate is inert afterward.
    complete: bool,
    /// One-shot completion signal, consumed by `take_completion`.
    completion_pending: bool,

    last_status: CalibrationStatus,
}

impl CalibrationGate {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            hold_started_ms: None,
            held_ms: 0,
            complete: false,
            completion_pending: false,
            last_status: CalibrationStatus::MissingLandmarks,
        }
    }

    /// Processes one frame and returns the framing judgement.
    pub fn update(&mut self, frame: &Frame) -> CalibrationStatus {
        if self.complete {
            return CalibrationStatus::Complete;
        }

        let status = self.classify(frame);

        match status {
            CalibrationStatus::Holding => {
                let started = *self.hold_started_ms.get_or_insert(frame.timestamp_ms);
                self.held_ms = frame.timestamp_ms.saturating_sub(started);

                if self.held_ms >= self.config.hold_duration_ms {
                    self.complete = true;
                    self.completion_pending = true;
                    self.last_status = CalibrationStatus::Complete;
                    info!("calibration complete after {} ms hold", self.held_ms);
                    return CalibrationStatus::Complete;
                }
            }
            _ => {
                if self.hold_started_ms.is_some() {
                    debug!("calibration hold reset: {:?}", status);
                }
                self.hold_started_ms = None;
                self.held_ms = 0;
            }
        }

        self.last_status = status;
        status
    }

    /// Returns true exactly once, on the update that completed the hold.
    pub fn take_completion(&mut self) -> bool {
        std::mem::take(&mut self.completion_pending)
    }

    /// True once the gate has opened.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Hold progress in [0, 100] for UI feedback.
    pub fn progress_percent(&self) -> u32 {
        if self.complete {
            return 100;
        }
        let pct = (self.held_ms as f32 / self.config.hold_duration_ms as f32) * 100.0;
        pct.min(100.0) as u32
    }

    /// Whole seconds of hold remaining, rounded up.
    pub fn seconds_remaining(&self) -> u32 {
        if self.complete {
            return 0;
        }
        let remaining = self.config.hold_duration_ms.saturating_sub(self.held_ms);
        remaining.div_ceil(1000) as u32
    }

    /// Most recent judgement, for HUD projection.
    pub fn last_status(&self) -> CalibrationStatus {
        self.last_status
    }

    /// Returns the gate to its initial state for a new session.
    pub fn reset(&mut self) {
        self.hold_started_ms = None;
        self.held_ms = 0;
        self.complete = false;
        self.completion_pending = false;
        self.last_status = CalibrationStatus::MissingLandmarks;
    }

    /// Classifies a single frame without touching the hold timer.
    fn classify(&self, frame: &Frame) -> CalibrationStatus {
        if frame.source_error.is_some() {
            return CalibrationStatus::SourceError;
        }

        let nose = frame.get(LandmarkKey::Nose);
        let left_shoulder = frame.get(LandmarkKey::LeftShoulder);
        let right_shoulder = frame.get(LandmarkKey::RightShoulder);

        let (nose, left_shoulder, right_shoulder) = match (nose, left_shoulder, right_shoulder) {
            (Some(n), Some(l), Some(r)) => (n, l, r),
            _ => return CalibrationStatus::MissingLandmarks,
        };

        let min_vis = self.config.min_face_visibility;
        if nose.visibility_or_max() < min_vis
            || left_shoulder.visibility_or_max() < min_vis
            || right_shoulder.visibility_or_max() < min_vis
        {
            return CalibrationStatus::LowVisibility;
        }

        let left_ankle = frame.get(LandmarkKey::LeftAnkle);
        let right_ankle = frame.get(LandmarkKey::RightAnkle);
        let (left_ankle, right_ankle) = match (left_ankle, right_ankle) {
            (Some(l), Some(r)) => (l, r),
            _ => return CalibrationStatus::MissingAnkles,
        };

        let gap_px = self.ankle_gap_px(frame, left_ankle, right_ankle);
        if gap_px < self.config.min_ankle_gap_px {
            return CalibrationStatus::TooFar;
        }
        if gap_px > self.config.max_ankle_gap_px {
            return CalibrationStatus::TooClose;
        }

        CalibrationStatus::Holding
    }

    /// Ankle-to-ankle distance in pixels.
    ///
    /// Prefers real video dimensions; falls back to scaling the normalized
    /// distance when the host never reported them.
    fn ankle_gap_px(
        &self,
        frame: &Frame,
        left: &crate::types::Landmark,
        right: &crate::types::Landmark,
    ) -> f32 {
        match frame.video_size {
            Some((width, height)) => {
                let dx = (left.x - right.x) * width as f32;
                let dy = (left.y - right.y) * height as f32;
                (dx * dx + dy * dy).sqrt()
            }
            None => distance(left, right) * self.config.normalized_fallback_scale,
        }
    }
}

impl Default for CalibrationGate {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Landmark, SourceError};

    /// A frame with the player well-framed: face visible, ankles a
    /// moderate distance apart.
    fn good_frame(timestamp_ms: u64) -> Frame {
        Frame::new(timestamp_ms)
            .with(LandmarkKey::Nose, Landmark::with_depth(0.5, 0.2, 0.0, 0.95))
            .with(LandmarkKey::LeftShoulder, Landmark::with_depth(0.42, 0.3, 0.0, 0.9))
            .with(LandmarkKey::RightShoulder, Landmark::with_depth(0.58, 0.3, 0.0, 0.9))
            .with(LandmarkKey::LeftAnkle, Landmark::new(0.45, 0.9))
            .with(LandmarkKey::RightAnkle, Landmark::new(0.55, 0.9))
    }

    #[test]
    fn test_missing_landmarks_message() {
        let mut gate = CalibrationGate::default();
        let status = gate.update(&Frame::new(0));
        assert_eq!(status, CalibrationStatus::MissingLandmarks);
        assert_eq!(status.message(), "Position yourself in frame");
    }

    #[test]
    fn test_low_visibility() {
        let mut gate = CalibrationGate::default();
        let mut frame = good_frame(0);
        frame.set(LandmarkKey::Nose, Landmark::with_depth(0.5, 0.2, 0.0, 0.5));
        assert_eq!(gate.update(&frame), CalibrationStatus::LowVisibility);
    }

    #[test]
    fn test_missing_ankles() {
        let mut gate = CalibrationGate::default();
        let frame = Frame::new(0)
            .with(LandmarkKey::Nose, Landmark::with_depth(0.5, 0.2, 0.0, 0.95))
            .with(LandmarkKey::LeftShoulder, Landmark::with_depth(0.42, 0.3, 0.0, 0.9))
            .with(LandmarkKey::RightShoulder, Landmark::with_depth(0.58, 0.3, 0.0, 0.9));
        let status = gate.update(&frame);
        assert_eq!(status, CalibrationStatus::MissingAnkles);
        assert_eq!(status.message(), "Step back to show full body");
    }

    #[test]
    fn test_distance_bounds_with_pixel_dimensions() {
        let mut gate = CalibrationGate::default();

        // 0.10 normalized gap on a 640px-wide video = 64px: in range.
        let mut frame = good_frame(0);
        frame.video_size = Some((640, 480));
        assert_eq!(gate.update(&frame), CalibrationStatus::Holding);

        // Same pose on a 320px video = 32px: too far.
        let mut frame = good_frame(100);
        frame.video_size = Some((320, 240));
        assert_eq!(gate.update(&frame), CalibrationStatus::TooFar);
        assert_eq!(CalibrationStatus::TooFar.message(), "Step Closer");

        // A wide stance on a large video: too close.
        let mut frame = good_frame(200);
        frame.video_size = Some((1920, 1080));
        frame.set(LandmarkKey::LeftAnkle, Landmark::new(0.3, 0.9));
        frame.set(LandmarkKey::RightAnkle, Landmark::new(0.7, 0.9));
        assert_eq!(gate.update(&frame), CalibrationStatus::TooClose);
        assert_eq!(CalibrationStatus::TooClose.message(), "Step Back");
    }

    #[test]
    fn test_normalized_fallback_when_size_unknown() {
        let mut gate = CalibrationGate::default();
        // 0.10 normalized gap × 1000 = 100 "pixels": in range.
        assert_eq!(gate.update(&good_frame(0)), CalibrationStatus::Holding);
    }

    #[test]
    fn test_bad_frame_resets_hold() {
        let mut gate = CalibrationGate::default();

        // 29 good frames at 100 ms spacing: 2.8 s of hold, not enough.
        for i in 0..29 {
            let status = gate.update(&good_frame(i * 100));
            assert_ne!(status, CalibrationStatus::Complete);
        }
        assert!(gate.progress_percent() > 0);

        // One too-close frame resets the streak to zero.
        let mut bad = good_frame(2900);
        bad.set(LandmarkKey::LeftAnkle, Landmark::new(0.2, 0.9));
        bad.set(LandmarkKey::RightAnkle, Landmark::new(0.8, 0.9));
        bad.video_size = Some((1920, 1080));
        assert_eq!(gate.update(&bad), CalibrationStatus::TooClose);
        assert_eq!(gate.progress_percent(), 0);
        assert!(!gate.is_complete());
        assert!(!gate.take_completion());
    }

    #[test]
    fn test_uninterrupted_hold_completes_once() {
        let mut gate = CalibrationGate::default();

        let mut completed = 0;
        for i in 0..=30 {
            gate.update(&good_frame(i * 100));
            if gate.take_completion() {
                completed += 1;
            }
        }

        assert_eq!(completed, 1);
        assert!(gate.is_complete());
        assert_eq!(gate.progress_percent(), 100);
        assert_eq!(gate.seconds_remaining(), 0);

        // Inert afterward: more frames never re-fire the signal.
        gate.update(&good_frame(5000));
        assert!(!gate.take_completion());
        assert_eq!(gate.last_status(), CalibrationStatus::Complete);
    }

    #[test]
    fn test_progress_projection() {
        let mut gate = CalibrationGate::default();
        gate.update(&good_frame(0));
        gate.update(&good_frame(1500));
        assert_eq!(gate.progress_percent(), 50);
        assert_eq!(gate.seconds_remaining(), 2);
    }

    #[test]
    fn test_source_error_short_circuits() {
        let mut gate = CalibrationGate::default();
        gate.update(&good_frame(0));
        gate.update(&good_frame(1000));

        let status = gate.update(&Frame::with_error(
            2000,
            SourceError::Model("inference failed".into()),
        ));
        assert_eq!(status, CalibrationStatus::SourceError);
        assert_eq!(gate.progress_percent(), 0);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut gate = CalibrationGate::default();
        for i in 0..=30 {
            gate.update(&good_frame(i * 100));
        }
        assert!(gate.is_complete());

        gate.reset();
        assert!(!gate.is_complete());
        assert_eq!(gate.progress_percent(), 0);
        assert_eq!(gate.update(&good_frame(10_000)), CalibrationStatus::Holding);
    }
}
