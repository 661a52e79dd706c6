/// Movement interpolator shared by the player and enemies.
///
/// A move is a single tile step. While it runs, the pixel position is a
/// linear blend between the start pixel and the target cell's pixel over
/// `duration_ms`. Grid coordinates follow the pixel position by integer
/// division, so they change the moment the body crosses a tile boundary.
/// No queueing: `begin` is rejected while a move is in flight.

use super::entity::{Body, MoveDir};
use super::grid::TILE_SIZE;

/// Walk-cycle length in frames.
pub const WALK_FRAMES: u8 = 4;

#[derive(Clone, Debug)]
pub struct Motion {
    moving: bool,
    start: (f32, f32),
    target: (f32, f32),
    remaining_ms: u32,
    duration_ms: u32,
    anim_interval_ms: u32,
    anim_timer_ms: u32,
    pub frame: u8,
    pub facing: MoveDir,
}

impl Motion {
    pub fn new() -> Self {
        Motion {
            moving: false,
            start: (0.0, 0.0),
            target: (0.0, 0.0),
            remaining_ms: 0,
            duration_ms: 0,
            anim_interval_ms: 1,
            anim_timer_ms: 0,
            frame: 0,
            facing: MoveDir::Down,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Target cell of the move in flight.
    pub fn target_cell(&self) -> Option<(usize, usize)> {
        if !self.moving { return None; }
        Some(((self.target.0 / TILE_SIZE) as usize, (self.target.1 / TILE_SIZE) as usize))
    }

    /// Start a move from the body's current pixel position to `to`.
    /// Returns false if a move is already running.
    pub fn begin(&mut self, body: &Body, to: (usize, usize), duration_ms: u32) -> bool {
        if self.moving { return false; }

        let dx = to.0 as i32 - body.x as i32;
        let dy = to.1 as i32 - body.y as i32;
        if let Some(dir) = MoveDir::from_delta(dx, dy) {
            self.facing = dir;
        }

        let duration_ms = duration_ms.max(1);
        self.start = (body.px, body.py);
        self.target = (to.0 as f32 * TILE_SIZE, to.1 as f32 * TILE_SIZE);
        self.duration_ms = duration_ms;
        self.remaining_ms = duration_ms;
        self.anim_interval_ms = (duration_ms / WALK_FRAMES as u32).max(1);
        self.anim_timer_ms = 0;
        self.moving = true;
        true
    }

    /// Advance by `dt` ms. Returns true on the frame the move completes.
    pub fn advance(&mut self, body: &mut Body, dt: u32) -> bool {
        if !self.moving { return false; }

        self.remaining_ms = self.remaining_ms.saturating_sub(dt);
        self.anim_timer_ms += dt;
        if self.anim_timer_ms >= self.anim_interval_ms {
            self.anim_timer_ms -= self.anim_interval_ms;
            self.frame = (self.frame + 1) % WALK_FRAMES;
        }

        let arrived = self.remaining_ms == 0;
        if arrived {
            body.px = self.target.0;
            body.py = self.target.1;
            self.moving = false;
            self.frame = 0;
        } else {
            let t = 1.0 - self.remaining_ms as f32 / self.duration_ms as f32;
            body.px = self.start.0 + (self.target.0 - self.start.0) * t;
            body.py = self.start.1 + (self.target.1 - self.start.1) * t;
        }
        body.sync_cell();
        arrived
    }

    /// Complete the move in flight immediately.
    pub fn finish(&mut self, body: &mut Body) {
        if !self.moving { return; }
        body.px = self.target.0;
        body.py = self.target.1;
        body.sync_cell();
        self.halt();
    }

    /// Drop the move in flight without touching the body.
    pub fn halt(&mut self) {
        self.moving = false;
        self.remaining_ms = 0;
        self.anim_timer_ms = 0;
        self.frame = 0;
    }
}

impl Default for Motion {
    fn default() -> Self {
        Motion::new()
    }
}
