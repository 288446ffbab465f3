//! Patintero: lane dodging against spawned blockers.
//!
//! The player occupies one of three lanes, chosen by where their nose is
//! horizontally. Blockers spawn at the far end of the track in two of the
//! three lanes and advance toward the player; reaching the player's row
//! while occupying the player's lane is a catch and ends the game. Each
//! wave dodged scores a point, and waves spawn faster as the game goes on.
//!
//! Lane mapping is a pure function of nose x, re-evaluated every frame;
//! the detector only reports transitions.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detector::GestureDetector;
use crate::scheduler::TickScheduler;
use crate::session::{GameHud, GameMode, Verdict};
use crate::types::{Frame, GameType, GestureEvent, Lane, LandmarkKey, PhysicsState};

/// Blockers travel a 100-unit track toward the player.
const TRACK_LENGTH: f32 = 100.0;
/// Progress units per motion tick.
const BLOCKER_SPEED: f32 = 2.0;
/// Motion tick interval.
const MOTION_TICK_MS: u64 = 100;

/// First spawn interval; subsequent spawns come faster.
const INITIAL_SPAWN_MS: u64 = 4000;
/// Spawn interval shrinks by this much per spawn.
const SPAWN_DECAY_MS: u64 = 120;
/// Fastest allowed spawn cadence.
const MIN_SPAWN_MS: u64 = 400;

/// Continuous lane tracker; emits only on lane transitions.
#[derive(Debug, Clone)]
pub struct LaneDetector {
    current: Option<Lane>,
}

impl LaneDetector {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Lane most recently observed, defaulting to center before the
    /// first usable frame.
    pub fn lane(&self) -> Lane {
        self.current.unwrap_or(Lane::Center)
    }
}

impl Default for LaneDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureDetector for LaneDetector {
    fn tick(
        &mut self,
        frame: &Frame,
        _physics: Option<&PhysicsState>,
        _now_ms: u64,
    ) -> Option<GestureEvent> {
        let nose = frame.get(LandmarkKey::Nose)?;
        let lane = Lane::from_nose_x(nose.x);

        if self.current != Some(lane) {
            self.current = Some(lane);
            return Some(GestureEvent::LaneChanged(lane));
        }
        None
    }

    fn reset(&mut self) {
        self.current = None;
    }
}

/// A wave of blockers occupying two of the three lanes.
#[derive(Debug, Clone)]
struct BlockerWave {
    /// The single lane left open.
    open_lane: Lane,
    progress: f32,
}

impl BlockerWave {
    fn blocks(&self, lane: Lane) -> bool {
        lane != self.open_lane
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldTick {
    Motion,
    Spawn,
}

/// Patintero session rules: dodge blocker waves until caught.
pub struct PatinteroGame {
    detector: LaneDetector,
    waves: Vec<BlockerWave>,
    timers: TickScheduler<FieldTick>,
    spawn_interval_ms: u64,
    dodged: u32,
    rng: StdRng,
}

impl PatinteroGame {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic construction for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            detector: LaneDetector::new(),
            waves: Vec::new(),
            timers: TickScheduler::new(),
            spawn_interval_ms: INITIAL_SPAWN_MS,
            dodged: 0,
            rng,
        }
    }

    pub fn lane(&self) -> Lane {
        self.detector.lane()
    }

    /// Open lane of the wave closest to the player, for HUD rendering.
    pub fn front_wave_open_lane(&self) -> Option<Lane> {
        self.waves
            .iter()
            .max_by(|a, b| a.progress.total_cmp(&b.progress))
            .map(|w| w.open_lane)
    }

    fn spawn_wave(&mut self, now_ms: u64) {
        let open_lane = Lane::ALL[self.rng.gen_range(0..Lane::ALL.len())];
        self.waves.push(BlockerWave {
            open_lane,
            progress: 0.0,
        });
        debug!("wave spawned, open lane {:?}", open_lane);

        // Each spawn schedules the next one, faster than the last.
        self.spawn_interval_ms =
            self.spawn_interval_ms.saturating_sub(SPAWN_DECAY_MS).max(MIN_SPAWN_MS);
        self.timers
            .schedule_once(FieldTick::Spawn, now_ms + self.spawn_interval_ms);
    }

    /// Advances every wave one motion step, scoring waves that leave the
    /// track. Returns `Loss` on a catch.
    fn step_waves(&mut self) -> Verdict {
        let player = self.detector.lane();
        let mut caught = false;
        let mut dodged = 0;

        self.waves.retain_mut(|wave| {
            wave.progress += BLOCKER_SPEED;
            if wave.progress < TRACK_LENGTH {
                return true;
            }
            if wave.blocks(player) {
                caught = true;
            } else {
                dodged += 1;
            }
            false
        });

        if caught {
            return Verdict::Loss;
        }
        self.dodged += dodged;
        Verdict::Continue
    }
}

impl Default for PatinteroGame {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMode for PatinteroGame {
    fn game_type(&self) -> GameType {
        GameType::Patintero
    }

    /// Longer countdown so the full body is re-detected before waves move.
    fn countdown_ticks(&self) -> u32 {
        5
    }

    fn on_play_start(&mut self, now_ms: u64) {
        self.timers.cancel_all();
        self.timers
            .schedule_repeating(FieldTick::Motion, now_ms + MOTION_TICK_MS, MOTION_TICK_MS);
        self.timers
            .schedule_once(FieldTick::Spawn, now_ms + self.spawn_interval_ms);
    }

    fn advance_clock(&mut self, now_ms: u64) -> Verdict {
        for tick in self.timers.advance_to(now_ms) {
            match tick {
                FieldTick::Spawn => self.spawn_wave(now_ms),
                FieldTick::Motion => {
                    if self.step_waves() == Verdict::Loss {
                        return Verdict::Loss;
                    }
                }
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
        if let Some(GestureEvent::LaneChanged(lane)) = self.detector.tick(frame, physics, now_ms) {
            debug!("lane change: {:?}", lane);
        }
        Verdict::Continue
    }

    fn score(&self) -> u32 {
        self.dodged
    }

    fn hud(&self) -> GameHud {
        GameHud::Lanes {
            lane: self.detector.lane(),
            dodged: self.dodged,
            incoming: self.waves.len() as u32,
        }
    }

    fn reset(&mut self) {
        self.detector.reset();
        self.waves.clear();
        self.timers.cancel_all();
        self.spawn_interval_ms = INITIAL_SPAWN_MS;
        self.dodged = 0;
    }
}
