//! Laro Pose Game Engine
//!
//! Demo binary: drives one Agawan Base session with a synthetic landmark
//! stream, printing the HUD as the race unfolds. For library use, see
//! lib.rs.

use laro_engine::stride_detection::AgawanGame;
use laro_engine::{Frame, GameSession, Landmark, LandmarkKey, MemorySink, SessionPhase};

/// Standing frame with the full body visible at a workable distance.
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

fn main() {
    println!("Laro Pose Game Engine v0.1.0");
    println!("Agawan Base demo: synthetic high-knee sprint\n");

    let mut session = GameSession::new(AgawanGame::new());
    session.enter_lobby();

    // Calibration: hold a good stance for three seconds.
    let mut t = 0;
    while session.phase() != SessionPhase::Ready {
        session.process_frame(&standing_frame(t));
        t += 100;
    }
    println!("calibrated after {} ms", t);

    session.start(t);
    t += 3000;
    session.advance_clock(t);

    // Sprint: a high knee every 350 ms, alternating with a plant.
    while session.phase() == SessionPhase::Playing {
        t += 350;
        let lift = standing_frame(t).with(LandmarkKey::LeftKnee, Landmark::new(0.45, 0.35));
        session.process_frame(&lift);
        t += 50;
        session.process_frame(&standing_frame(t));

        if t % 2000 < 400 {
            if let Ok(hud) = serde_json::to_string(&session.hud()) {
                println!("{}", hud);
            }
        }
    }

    let outcome = session.outcome().expect("session ended");
    println!(
        "\n{}: score {}, ~{} kcal",
        if outcome.won { "WIN" } else { "LOSS" },
        outcome.score,
        outcome.calories_estimate
    );

    let mut sink = MemorySink::new();
    session.report(&mut sink);
    if let Some(payload) = sink.payloads.first() {
        println!("reported: {}", payload);
    }
}
