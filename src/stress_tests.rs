/// Production-level stress testing for the pose game engine.
///
/// These tests are designed to expose real-world failure modes that would
/// only appear under extreme, sustained, or pathological conditions:
/// degraded landmark streams, rapid session churn, and timestamp abuse.

#[cfg(test)]
mod stress_tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::hurdle_detection::HurdleGame;
    use crate::lane_detection::PatinteroGame;
    use crate::physics::PoseAnalyzer;
    use crate::session::{GameSession, SessionPhase};
    use crate::stride_detection::AgawanGame;
    use crate::types::{Frame, Landmark, LandmarkKey, SourceError};

    fn standing_frame(timestamp_ms: u64) -> Frame {
        Frame::new(timestamp_ms)
            .with(LandmarkKey::Nose, Landmark::with_depth(0.5, 0.20, 0.0, 0.95))
            .with(LandmarkKey::LeftShoulder, Landmark::with_depth(0.42, 0.30, 0.0, 0.9))
            .with(LandmarkKey::RightShoulder, Landmark::with_depth(0.58, 0.30, 0.0, 0.9))
            .with(LandmarkKey::LeftHip, Landmark::new(0.45, 0.50))
            .with(LandmarkKey::RightHip, Landmark::new(0.55, 0.50))
            .with(LandmarkKey::LeftKnee, Landmark::new(0.45, 0.70))
            .with(LandmarkKey::RightKnee, Landmark::new(0.55, 0.70))
            .with(LandmarkKey::LeftAnkle, Landmark::new(0.45, 0.90))
            .with(LandmarkKey::RightAnkle, Landmark::new(0.55, 0.90))
    }

    /// Frame with a random subset of landmarks at random positions.
    fn garbage_frame(timestamp_ms: u64, rng: &mut StdRng) -> Frame {
        let mut frame = Frame::new(timestamp_ms);
        for key in LandmarkKey::ALL {
            if rng.gen_bool(0.5) {
                frame.set(
                    key,
                    Landmark::with_depth(
                        rng.gen_range(-1.0..2.0),
                        rng.gen_range(-1.0..2.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(0.0..1.0),
                    ),
                );
            }
        }
        frame
    }

    // ========================================================================
    // CATEGORY 1: SUSTAINED THROUGHPUT
    // ========================================================================

    /// Ten minutes of continuous 30 Hz frames through a live session.
    #[test]
    fn stress_ten_minutes_continuous_30hz() {
        let mut session = GameSession::new(HurdleGame::new());
        session.enter_lobby();

        let mut t = 0;
        // Calibrate, then keep standing: the level clock will end the
        // game at 60 s, after which the stream keeps flowing harmlessly.
        for _ in 0..18_000 {
            session.process_frame(&standing_frame(t));
            if session.phase() == SessionPhase::Ready {
                session.start(t);
            }
            t += 33;
        }

        assert_eq!(session.phase(), SessionPhase::Over);
        assert!(!session.outcome().unwrap().won);
    }

    /// The analyzer's rolling state must not grow with stream length.
    #[test]
    fn stress_analyzer_long_stream_bounded() {
        let mut analyzer = PoseAnalyzer::default();
        analyzer.establish_baseline(&standing_frame(0));

        for i in 1..50_000u64 {
            let frame = standing_frame(i * 33);
            let state = analyzer.analyze(&frame);
            assert!(state.is_some());
            let _ = analyzer.user_height(&frame);
        }
    }

    // ========================================================================
    // CATEGORY 2: DEGRADED INPUT
    // ========================================================================

    /// A storm of random garbage frames must never panic or score.
    #[test]
    fn stress_garbage_landmark_storm() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut session = GameSession::new(AgawanGame::new());
        session.enter_lobby();

        // Reach playing first with clean frames.
        let mut t = 0;
        while session.phase() != SessionPhase::Ready {
            session.process_frame(&standing_frame(t));
            t += 100;
        }
        session.start(t);
        t += 5000;
        session.advance_clock(t);
        assert_eq!(session.phase(), SessionPhase::Playing);

        for _ in 0..5000 {
            t += 33;
            session.process_frame(&garbage_frame(t, &mut rng));
            if session.phase() != SessionPhase::Playing {
                break; // the opponent clock can legitimately end the race
            }
        }
        // Either still racing or lost to the clock; never a crash, and
        // random noise can only have produced bounded knee-lift scores.
        assert!(session.score() <= 400);
    }

    /// Alternating error and clean frames: detection must stop and resume
    /// without corrupting the lifecycle.
    #[test]
    fn stress_flapping_source_errors() {
        let mut session = GameSession::new(AgawanGame::new());
        session.enter_lobby();

        let mut t = 0;
        for i in 0..2000 {
            if i % 3 == 0 {
                session.process_frame(&Frame::with_error(t, SourceError::StreamStalled));
            } else {
                session.process_frame(&standing_frame(t));
            }
            if session.phase() == SessionPhase::Ready {
                session.start(t);
            }
            t += 100;
        }

        // Error frames keep resetting the calibration hold, so with a
        // 300 ms error cadence the gate never opens.
        assert_eq!(session.phase(), SessionPhase::Lobby);
    }

    /// Landmark dropout mid-play: frames missing the lower body skip
    /// physics but must not stall the session clock.
    #[test]
    fn stress_lower_body_dropout() {
        let mut session = GameSession::new(AgawanGame::new());
        session.enter_lobby();
        let mut t = 0;
        while session.phase() != SessionPhase::Ready {
            session.process_frame(&standing_frame(t));
            t += 100;
        }
        session.start(t);
        t += 5000;
        session.advance_clock(t);

        let head_only = |ts: u64| {
            Frame::new(ts).with(LandmarkKey::Nose, Landmark::with_depth(0.5, 0.2, 0.0, 0.9))
        };
        for _ in 0..400 {
            t += 33;
            session.process_frame(&head_only(t));
        }

        // ~13 s of dropout: the opponent still finished the race.
        assert_eq!(session.phase(), SessionPhase::Over);
    }

    // ========================================================================
    // CATEGORY 3: TIMESTAMP ABUSE
    // ========================================================================

    /// Repeated identical timestamps must not divide by zero or spin.
    #[test]
    fn stress_frozen_timestamps() {
        let mut analyzer = PoseAnalyzer::default();
        analyzer.establish_baseline(&standing_frame(1000));

        for _ in 0..1000 {
            let state = analyzer.analyze(&standing_frame(1000)).unwrap();
            assert_eq!(state.hip_velocity, 0.0);
            assert!(state.confidence.is_finite());
        }
    }

    /// Out-of-order frames are dropped wholesale, even in long bursts.
    #[test]
    fn stress_reordered_frame_bursts() {
        let mut session = GameSession::new(PatinteroGame::seeded(5));
        session.enter_lobby();

        let mut t = 0;
        while session.phase() != SessionPhase::Ready {
            session.process_frame(&standing_frame(t));
            t += 100;
        }

        // A burst of frames from the past must not regress the clock.
        for old in (0..t).step_by(100) {
            session.process_frame(&standing_frame(old));
        }
        assert_eq!(session.phase(), SessionPhase::Ready);
        session.start(t);
        t += 5000;
        session.advance_clock(t);
        assert_eq!(session.phase(), SessionPhase::Playing);
    }

    // ========================================================================
    // CATEGORY 4: SESSION CHURN
    // ========================================================================

    /// Rapid restart cycles must not leak timers or carry state across
    /// sessions.
    #[test]
    fn stress_rapid_restart_cycles() {
        let mut session = GameSession::new(HurdleGame::new());

        for cycle in 0..200 {
            session.enter_lobby();
            let mut t = 0;
            while session.phase() != SessionPhase::Ready {
                session.process_frame(&standing_frame(t));
                t += 100;
            }
            session.start(t);

            // Restart mid-countdown on odd cycles, mid-play on even.
            if cycle % 2 == 0 {
                session.advance_clock(t + 5000);
                assert_eq!(session.phase(), SessionPhase::Playing);
            }
            session.restart();
            assert_eq!(session.phase(), SessionPhase::Idle);
            assert_eq!(session.score(), 0);
            assert!(session.outcome().is_none());
        }
    }

    /// A stale timer from a previous life must never fire into a new one:
    /// after restart, advancing far past the old deadlines is inert.
    #[test]
    fn stress_no_timer_leak_across_restart() {
        let mut session = GameSession::new(AgawanGame::new());
        session.enter_lobby();
        let mut t = 0;
        while session.phase() != SessionPhase::Ready {
            session.process_frame(&standing_frame(t));
            t += 100;
        }
        session.start(t);
        session.advance_clock(t + 5000);
        assert_eq!(session.phase(), SessionPhase::Playing);

        session.restart();
        // Old opponent ticks and countdowns are gone.
        session.advance_clock(t + 1_000_000);
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.score(), 0);
    }
}
