//! Laro Pose Game Engine Library
//!
//! A pose-driven mini-game kernel that converts a noisy per-frame stream
//! of body keypoints into discrete gesture events and drives five
//! traditional Filipino street games from them.
//!
//! # Design Philosophy
//!
//! This library is built on several core principles:
//!
//! - **Crisp events from noisy input**: the raw landmark stream is
//!   continuous, jittery, and frame-rate-variable; the games need binary
//!   decisions. All smoothing and debouncing lives below the game rules.
//! - **Never guess coordinates**: a frame missing the landmarks a check
//!   needs skips that check for the tick. Fabricated positions would turn
//!   tracking loss into phantom gestures.
//! - **Cheat resistance over accuracy**: jumps require measured ankle
//!   clearance, not just upper-body motion. The engine optimizes for fair,
//!   responsive play rather than biomechanical measurement.
//! - **One lifecycle, five games**: every game runs inside the same
//!   session state machine; game rules plug in behind a small trait and
//!   cannot corrupt the lifecycle.
//!
//! # Example
//!
//! ```ignore
//! use laro_engine::{GameSession, SessionPhase};
//! use laro_engine::hurdle_detection::HurdleGame;
//!
//! let mut session = GameSession::new(HurdleGame::new());
//! session.enter_lobby();
//! // feed frames from the landmark source:
//! // session.process_frame(&frame);
//! ```

pub mod calibration;
pub mod command_detection;
pub mod detector;
pub mod geometry;
pub mod hop_detection;
pub mod hurdle_detection;
pub mod lane_detection;
pub mod physics;
pub mod report;
pub mod scheduler;
pub mod session;
pub mod stride_detection;
pub mod types;

mod stress_tests;

// Re-export the types most hosts need.
pub use calibration::{CalibrationGate, CalibrationStatus};
pub use detector::GestureDetector;
pub use physics::{PhysicsConfig, PoseAnalyzer};
pub use report::{MemorySink, ReportError, ResultSink};
pub use session::{GameHud, GameMode, GameSession, SessionHud, SessionPhase, Verdict};
pub use types::{
    Command, Frame, GameType, GestureEvent, KinematicState, Landmark, LandmarkKey, Lane,
    PhysicsState, SessionOutcome, SourceError,
};
