//! Piko: one-leg balance hopscotch over a 3×5 grid.
//!
//! The player balances on one leg and hops; each hop that lands while
//! still balanced completes the current target cell, and a new target is
//! drawn from the cells still open. Completing all fifteen wins.
//!
//! Balance tracking is forgiving: landmark jitter routinely collapses
//! the ankle gap for a frame or two, so losing the one-leg pose is only
//! treated as a foot-down after a grace period. Hops are detected from
//! upward hip-velocity spikes and must re-arm (velocity back to
//! non-negative) between hops so one long jump cannot double-count.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detector::GestureDetector;
use crate::session::{GameHud, GameMode, Verdict};
use crate::types::{Frame, GameType, GestureEvent, LandmarkKey, PhysicsState};

/// Ankle-Y separation that counts as standing on one leg.
const ONE_LEG_ANKLE_GAP: f32 = 0.03;
/// How long a lost one-leg pose is forgiven before it is a foot-down.
const BALANCE_GRACE_MS: u64 = 500;
/// Upward hip velocity (normalized/ms) that counts as a hop.
const HOP_VELOCITY: f32 = -0.01;

/// Grid dimensions: 3 columns × 5 rows.
pub const GRID_CELLS: u8 = 15;

/// One-leg balance and hop detector.
#[derive(Debug, Clone)]
pub struct HopDetector {
    /// Target cell attached to the next emitted hop.
    target_cell: u8,
    /// Last time the one-leg pose was directly observed.
    last_one_leg_ms: Option<u64>,
    /// Set after a hop fires; cleared when hip velocity returns
    /// non-negative.
    needs_rearm: bool,
}

impl HopDetector {
    pub fn new() -> Self {
        Self {
            target_cell: 0,
            last_one_leg_ms: None,
            needs_rearm: false,
        }
    }

    /// Sets the cell the next hop will land on.
    pub fn set_target(&mut self, cell: u8) {
        self.target_cell = cell;
    }

    /// True while the player counts as balancing on one leg, including
    /// the grace window after the pose was last seen.
    pub fn in_one_leg_mode(&self, now_ms: u64) -> bool {
        match self.last_one_leg_ms {
            Some(seen) => now_ms.saturating_sub(seen) <= BALANCE_GRACE_MS,
            None => false,
        }
    }

    fn observe_balance(&mut self, frame: &Frame, now_ms: u64) {
        let (Some(left), Some(right)) = (
            frame.get(LandmarkKey::LeftAnkle),
            frame.get(LandmarkKey::RightAnkle),
        ) else {
            return;
        };

        if (left.y - right.y).abs() >= ONE_LEG_ANKLE_GAP {
            self.last_one_leg_ms = Some(now_ms);
        } else if let Some(seen) = self.last_one_leg_ms {
            if now_ms.saturating_sub(seen) > BALANCE_GRACE_MS {
                // Foot down past the grace window.
                self.last_one_leg_ms = None;
            }
        }
    }
}

impl Default for HopDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureDetector for HopDetector {
    fn tick(
        &mut self,
        frame: &Frame,
        physics: Option<&PhysicsState>,
        now_ms: u64,
    ) -> Option<GestureEvent> {
        self.observe_balance(frame, now_ms);

        let physics = physics?;
        if physics.hip_velocity >= 0.0 {
            self.needs_rearm = false;
        }

        if self.needs_rearm || !self.in_one_leg_mode(now_ms) {
            return None;
        }
        if physics.hip_velocity < HOP_VELOCITY {
            self.needs_rearm = true;
            return Some(GestureEvent::HopLanded {
                cell: self.target_cell,
            });
        }
        None
    }

    fn reset(&mut self) {
        self.target_cell = 0;
        self.last_one_leg_ms = None;
        self.needs_rearm = false;
    }
}

/// Piko session rules: hop through all fifteen cells.
pub struct PikoGame {
    detector: HopDetector,
    completed: [bool; GRID_CELLS as usize],
    completed_count: u8,
    last_now_ms: u64,
    rng: StdRng,
}

impl PikoGame {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic construction for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut game = Self {
            detector: HopDetector::new(),
            completed: [false; GRID_CELLS as usize],
            completed_count: 0,
            last_now_ms: 0,
            rng,
        };
        game.draw_target();
        game
    }

    pub fn target_cell(&self) -> u8 {
        self.detector.target_cell
    }

    /// Picks the next target uniformly from the open cells.
    fn draw_target(&mut self) {
        let open: Vec<u8> =
            (0..GRID_CELLS).filter(|&c| !self.completed[c as usize]).collect();
        if open.is_empty() {
            return;
        }
        let cell = open[self.rng.gen_range(0..open.len())];
        self.detector.set_target(cell);
    }

    fn on_hop(&mut self, cell: u8) -> Verdict {
        if self.completed[cell as usize] {
            return Verdict::Continue;
        }
        self.completed[cell as usize] = true;
        self.completed_count += 1;
        debug!("cell {} completed ({}/{})", cell, self.completed_count, GRID_CELLS);

        if self.completed_count == GRID_CELLS {
            return Verdict::Win;
        }
        self.draw_target();
        Verdict::Continue
    }
}

impl Default for PikoGame {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMode for PikoGame {
    fn game_type(&self) -> GameType {
        GameType::Piko
    }

    fn on_play_start(&mut self, now_ms: u64) {
        self.last_now_ms = now_ms;
    }

    fn advance_clock(&mut self, now_ms: u64) -> Verdict {
        self.last_now_ms = now_ms;
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
            Some(GestureEvent::HopLanded { cell }) => self.on_hop(cell),
            _ => Verdict::Continue,
        }
    }

    fn score(&self) -> u32 {
        self.completed_count as u32
    }

    fn hud(&self) -> GameHud {
        GameHud::Hop {
            target_cell: self.target_cell(),
            completed: self.completed_count,
            one_leg: self.detector.in_one_leg_mode(self.last_now_ms),
        }
    }

    fn reset(&mut self) {
        self.detector.reset();
        self.completed = [false; GRID_CELLS as usize];
        self.completed_count = 0;
        self.last_now_ms = 0;
        self.draw_target();
    }
}
