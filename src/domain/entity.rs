/// Entities: Player, Enemy, Bomb, Explosion, Item, Block, Portal.
///
/// All share a small `Body` record (grid cell, pixel position, dead flag).
/// Block and Portal never move; Player and Enemy carry a `Motion`.
/// Entities hold no reference to the round. Every update receives its
/// context explicitly.

use std::collections::HashSet;

use super::grid::TILE_SIZE;
use super::motion::Motion;

/// Default per-tile move time for the player, in ms.
pub const PLAYER_MOVE_MS: u32 = 200;
/// Base per-tile move time for enemies before the difficulty multiplier.
pub const ENEMY_MOVE_MS: u32 = 250;
/// Lifetime of one explosion tile.
pub const EXPLOSION_MS: u32 = 300;
/// Invincibility after losing a life.
pub const HIT_INVINCIBILITY_MS: u32 = 1000;
/// Invincibility granted when the shield absorbs a hit.
pub const SHIELD_INVINCIBILITY_MS: u32 = 5000;

/// Movement direction. `ALL` is the fixed expansion order used by
/// pathfinding, ejection and roaming.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MoveDir {
    Up,
    Down,
    Left,
    Right,
}

impl MoveDir {
    pub const ALL: [MoveDir; 4] = [MoveDir::Up, MoveDir::Down, MoveDir::Left, MoveDir::Right];

    pub fn delta(self) -> (i32, i32) {
        match self {
            MoveDir::Up => (0, -1),
            MoveDir::Down => (0, 1),
            MoveDir::Left => (-1, 0),
            MoveDir::Right => (1, 0),
        }
    }

    pub fn from_delta(dx: i32, dy: i32) -> Option<MoveDir> {
        match (dx, dy) {
            (0, -1) => Some(MoveDir::Up),
            (0, 1) => Some(MoveDir::Down),
            (-1, 0) => Some(MoveDir::Left),
            (1, 0) => Some(MoveDir::Right),
            _ => None,
        }
    }
}

// ── Shared position / lifecycle record ──

#[derive(Clone, Debug)]
pub struct Body {
    pub x: usize,
    pub y: usize,
    pub px: f32,
    pub py: f32,
    /// Remove from the owning collection at the next sweep.
    pub dead: bool,
}

impl Body {
    pub fn at(x: usize, y: usize) -> Self {
        Body {
            x, y,
            px: x as f32 * TILE_SIZE,
            py: y as f32 * TILE_SIZE,
            dead: false,
        }
    }

    pub fn cell(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    /// Recompute grid coordinates from the pixel position.
    pub fn sync_cell(&mut self) {
        self.x = (self.px / TILE_SIZE).floor().max(0.0) as usize;
        self.y = (self.py / TILE_SIZE).floor().max(0.0) as usize;
    }

    /// Teleport to a cell, pixel position included.
    pub fn snap_to(&mut self, x: usize, y: usize) {
        self.x = x;
        self.y = y;
        self.px = x as f32 * TILE_SIZE;
        self.py = y as f32 * TILE_SIZE;
    }
}

/// Capability shared by every world object.
pub trait Positioned {
    fn body(&self) -> &Body;

    fn is_at(&self, x: usize, y: usize) -> bool {
        let b = self.body();
        !b.dead && b.x == x && b.y == y
    }
}

/// First live entity of a collection standing on (x, y).
pub fn live_at<T: Positioned>(list: &[T], x: usize, y: usize) -> Option<&T> {
    list.iter().find(|e| e.is_at(x, y))
}

// ── Countdown ──

/// Millisecond down-counter behind every timed flag. Active while > 0.
/// Cancelling is forcing it to 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Countdown {
    pub remaining_ms: u32,
}

impl Countdown {
    pub fn is_active(&self) -> bool {
        self.remaining_ms > 0
    }

    /// Start or refresh (never stacks).
    pub fn start(&mut self, ms: u32) {
        self.remaining_ms = ms;
    }

    pub fn cancel(&mut self) {
        self.remaining_ms = 0;
    }

    /// Advance `dt` ms. Returns true on the tick the counter lapses.
    pub fn tick(&mut self, dt: u32) -> bool {
        if self.remaining_ms == 0 { return false; }
        self.remaining_ms = self.remaining_ms.saturating_sub(dt);
        self.remaining_ms == 0
    }
}

// ── Player ──

/// Four independent held-direction flags.
#[derive(Clone, Copy, Debug, Default)]
pub struct Intent {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Intent {
    pub fn set(&mut self, dir: MoveDir, held: bool) {
        match dir {
            MoveDir::Up => self.up = held,
            MoveDir::Down => self.down = held,
            MoveDir::Left => self.left = held,
            MoveDir::Right => self.right = held,
        }
    }

    /// Resolve held flags into one step. No diagonals: X wins over Y.
    pub fn direction(&self) -> Option<MoveDir> {
        let mut dx = 0;
        let mut dy = 0;
        if self.up { dy = -1; }
        if self.down { dy = 1; }
        if self.left { dx = -1; }
        if self.right { dx = 1; }
        if dx != 0 { dy = 0; }
        MoveDir::from_delta(dx, dy)
    }
}

/// Result of one hazard contact.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Damage {
    /// Invincible: nothing happened.
    Ignored,
    /// Shield consumed, long invincibility granted.
    Shielded,
    /// One life lost; `remaining` lives left.
    LifeLost { remaining: u32 },
}

#[derive(Clone, Debug)]
pub struct Player {
    pub body: Body,
    pub motion: Motion,
    pub intent: Intent,
    pub lives: u32,
    pub bomb_capacity: u32,
    pub bombs_active: u32,
    pub bomb_range: u32,
    pub move_duration_ms: u32,
    pub wall_pass: Countdown,
    pub bomb_pass: Countdown,
    pub invincible: Countdown,
    pub shield: bool,
    pub has_key: bool,
    /// Bomb cells the player may stand on because they just placed them there.
    pub standing_on_bombs: HashSet<(usize, usize)>,
    /// A pass effect lapsed mid-move; check containment when the move lands.
    pub recheck_on_arrival: bool,
}

impl Player {
    pub fn new(x: usize, y: usize, lives: u32, bomb_range: u32) -> Self {
        Player {
            body: Body::at(x, y),
            motion: Motion::new(),
            intent: Intent::default(),
            lives,
            bomb_capacity: 1,
            bombs_active: 0,
            bomb_range,
            move_duration_ms: PLAYER_MOVE_MS,
            wall_pass: Countdown::default(),
            bomb_pass: Countdown::default(),
            invincible: Countdown::default(),
            shield: false,
            has_key: false,
            standing_on_bombs: HashSet::new(),
            recheck_on_arrival: false,
        }
    }

    pub fn can_place_more(&self) -> bool {
        self.bombs_active < self.bomb_capacity
    }

    /// Apply one hazard contact.
    pub fn take_damage(&mut self) -> Damage {
        if self.invincible.is_active() {
            return Damage::Ignored;
        }
        if self.shield {
            self.shield = false;
            self.invincible.start(SHIELD_INVINCIBILITY_MS);
            return Damage::Shielded;
        }
        self.lives = self.lives.saturating_sub(1);
        self.invincible.start(HIT_INVINCIBILITY_MS);
        Damage::LifeLost { remaining: self.lives }
    }
}

impl Positioned for Player {
    fn body(&self) -> &Body { &self.body }
}

// ── Enemy ──

/// AI personality from the difficulty preset. All three currently resolve
/// to the same chase-or-roam behaviour.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AiMode {
    Random,
    AvoidBombs,
    ChasePlayer,
}

impl AiMode {
    pub fn from_tag(tag: &str) -> Option<AiMode> {
        match tag {
            "random" => Some(AiMode::Random),
            "avoid_bombs" => Some(AiMode::AvoidBombs),
            "chase_player" => Some(AiMode::ChasePlayer),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            AiMode::Random => "random",
            AiMode::AvoidBombs => "avoid_bombs",
            AiMode::ChasePlayer => "chase_player",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: usize,
    pub body: Body,
    pub motion: Motion,
    pub move_duration_ms: u32,
    pub ai: AiMode,
    /// Remaining route from the last decision (informational, never reused).
    pub path: Vec<(usize, usize)>,
    /// Last free-roam direction, kept for roam continuity.
    pub last_dir: Option<MoveDir>,
}

impl Enemy {
    pub fn new(id: usize, x: usize, y: usize, speed_multiplier: f32, ai: AiMode) -> Self {
        let scaled = (ENEMY_MOVE_MS as f32 * speed_multiplier).round();
        Enemy {
            id,
            body: Body::at(x, y),
            motion: Motion::new(),
            move_duration_ms: (scaled.max(1.0)) as u32,
            ai,
            path: vec![],
            last_dir: None,
        }
    }
}

impl Positioned for Enemy {
    fn body(&self) -> &Body { &self.body }
}

// ── Bomb ──

/// Who placed a bomb. Back-reference only.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Owner {
    Player,
}

#[derive(Clone, Debug)]
pub struct Bomb {
    pub body: Body,
    pub owner: Owner,
    pub timer_ms: u32,
    pub power: u32,
    pub exploded: bool,
}

impl Bomb {
    pub fn new(x: usize, y: usize, owner: Owner, power: u32, fuse_ms: u32) -> Self {
        Bomb { body: Body::at(x, y), owner, timer_ms: fuse_ms, power, exploded: false }
    }

    /// Chain reaction: detonate on this bomb's own next update.
    pub fn trigger(&mut self) {
        self.timer_ms = 0;
    }
}

impl Positioned for Bomb {
    fn body(&self) -> &Body { &self.body }
}

// ── Explosion ──

#[derive(Clone, Debug)]
pub struct Explosion {
    pub body: Body,
    pub remaining_ms: u32,
    pub max_ms: u32,
}

impl Explosion {
    pub fn new(x: usize, y: usize) -> Self {
        Explosion { body: Body::at(x, y), remaining_ms: EXPLOSION_MS, max_ms: EXPLOSION_MS }
    }

    /// Advance `dt` ms; marks itself dead when spent.
    pub fn update(&mut self, dt: u32) {
        self.remaining_ms = self.remaining_ms.saturating_sub(dt);
        if self.remaining_ms == 0 {
            self.body.dead = true;
        }
    }

    /// 1.0 when fresh, 0.0 when about to vanish.
    pub fn intensity(&self) -> f32 {
        if self.max_ms == 0 { return 0.0; }
        self.remaining_ms as f32 / self.max_ms as f32
    }
}

impl Positioned for Explosion {
    fn body(&self) -> &Body { &self.body }
}

// ── Item ──

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ItemKind {
    Fire,
    Bomb,
    Speed,
    Slow,
    PassWall,
    PassBomb,
    Shield,
    Key,
}

impl ItemKind {
    /// Hidden-item roll table, in the order the dice see it.
    pub const ALL: [ItemKind; 8] = [
        ItemKind::Fire,
        ItemKind::Bomb,
        ItemKind::Speed,
        ItemKind::PassWall,
        ItemKind::PassBomb,
        ItemKind::Shield,
        ItemKind::Key,
        ItemKind::Slow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ItemKind::Fire => "FIRE",
            ItemKind::Bomb => "BOMB",
            ItemKind::Speed => "SPEED",
            ItemKind::Slow => "SLOW",
            ItemKind::PassWall => "PASS_WALL",
            ItemKind::PassBomb => "PASS_BOMB",
            ItemKind::Shield => "SHIELD",
            ItemKind::Key => "KEY",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Item {
    pub body: Body,
    pub kind: ItemKind,
}

impl Item {
    pub fn new(x: usize, y: usize, kind: ItemKind) -> Self {
        Item { body: Body::at(x, y), kind }
    }
}

impl Positioned for Item {
    fn body(&self) -> &Body { &self.body }
}

// ── Block / Portal (stationary) ──

#[derive(Clone, Debug)]
pub struct Block {
    pub body: Body,
    pub hidden: Option<ItemKind>,
}

impl Block {
    pub fn new(x: usize, y: usize, hidden: Option<ItemKind>) -> Self {
        Block { body: Body::at(x, y), hidden }
    }
}

impl Positioned for Block {
    fn body(&self) -> &Body { &self.body }
}

#[derive(Clone, Debug)]
pub struct Portal {
    pub body: Body,
    pub open: bool,
}

impl Portal {
    pub fn new(x: usize, y: usize) -> Self {
        Portal { body: Body::at(x, y), open: false }
    }
}

impl Positioned for Portal {
    fn body(&self) -> &Body { &self.body }
}
