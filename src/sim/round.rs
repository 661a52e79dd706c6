/// Round: the complete state of one playthrough attempt of one level.
///
/// The round exclusively owns the grid and every entity collection. The
/// per-frame `step` borrows it mutably; renderers and the progress tracker
/// only get the read-only accessors below.
///
/// ## Lifecycle
///
///   start ──► Playing ──► Ended(Victory | Defeat | Retreated)
///
/// The transition out of `Playing` happens at most once.

use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{Difficulty, DifficultyConfig};
use crate::domain::entity::{Block, Bomb, Enemy, Explosion, Item, MoveDir, Player, Portal};
use crate::domain::grid::Grid;
use super::level::{self, LevelDef, LevelError};

/// Score for an instant clear; every 5 ms spent costs one point.
pub const MAX_SCORE: u32 = 10_000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DefeatCause {
    LivesExhausted,
    TimeExpired,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Victory { score: u32 },
    Defeat(DefeatCause),
    Retreated,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    Ended(Outcome),
}

/// Timed pass-through effects.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Effect {
    WallPass,
    BombPass,
}

/// Decoded input. The core never sees raw device state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputEvent {
    Press(MoveDir),
    Release(MoveDir),
    PlaceBomb,
    Retreat,
}

/// What the progress collaborator gets once a round is over.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RoundReport {
    pub outcome: Outcome,
    pub difficulty: Difficulty,
    pub level_index: usize,
}

pub struct Round {
    // ── Static occupancy ──
    pub(crate) grid: Grid,

    // ── Entities ──
    pub(crate) player: Player,
    pub(crate) enemies: Vec<Enemy>,
    pub(crate) bombs: Vec<Bomb>,
    pub(crate) explosions: Vec<Explosion>,
    pub(crate) items: Vec<Item>,
    pub(crate) blocks: Vec<Block>,
    pub(crate) portal: Portal,

    // ── Meta ──
    pub(crate) phase: Phase,
    pub(crate) difficulty: Difficulty,
    pub(crate) level_index: usize,
    pub(crate) level_name: String,
    pub(crate) bomb_time_ms: u32,
    pub(crate) time_remaining_ms: Option<u32>,
    pub(crate) elapsed_ms: u64,
    pub(crate) rng: ChaCha8Rng,

    // ── Pending requests, honoured by the next step ──
    pub(crate) bomb_requested: bool,
    pub(crate) retreat_requested: bool,
}

impl Round {
    /// Generate the level's entities and set up a fresh round.
    pub fn start(
        def: &LevelDef,
        difficulty: Difficulty,
        cfg: &DifficultyConfig,
        level_index: usize,
        seed: u64,
    ) -> Result<Round, LevelError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let pop = level::generate(def, cfg, &mut rng)?;
        let (px, py) = pop.player_spawn;

        info!(
            "round start: {} level {} {:?} ({} enemies, seed {})",
            difficulty, level_index + 1, def.name, pop.enemies.len(), seed
        );

        Ok(Round {
            grid: pop.grid,
            player: Player::new(px, py, cfg.player_lives, 1 + cfg.extra_fire),
            enemies: pop.enemies,
            bombs: vec![],
            explosions: vec![],
            items: pop.items,
            blocks: pop.blocks,
            portal: pop.portal,
            phase: Phase::Playing,
            difficulty,
            level_index,
            level_name: def.name.clone(),
            bomb_time_ms: cfg.bomb_time_ms,
            time_remaining_ms: cfg.time_limit_ms,
            elapsed_ms: 0,
            rng,
            bomb_requested: false,
            retreat_requested: false,
        })
    }

    /// Apply one decoded input event. Ignored once the round has ended.
    pub fn handle_input(&mut self, ev: InputEvent) {
        if self.is_over() { return; }
        match ev {
            InputEvent::Press(dir) => self.player.intent.set(dir, true),
            InputEvent::Release(dir) => self.player.intent.set(dir, false),
            InputEvent::PlaceBomb => self.bomb_requested = true,
            InputEvent::Retreat => self.retreat_requested = true,
        }
    }

    /// One-way transition out of `Playing`. Returns false if already ended.
    pub(crate) fn end(&mut self, outcome: Outcome) -> bool {
        if self.is_over() { return false; }
        self.phase = Phase::Ended(outcome);
        info!(
            "round end: {} level {} -> {:?} after {} ms",
            self.difficulty, self.level_index + 1, outcome, self.elapsed_ms
        );
        true
    }

    // ── Read-only snapshot ──

    pub fn grid(&self) -> &Grid { &self.grid }
    pub fn player(&self) -> &Player { &self.player }
    pub fn enemies(&self) -> &[Enemy] { &self.enemies }
    pub fn bombs(&self) -> &[Bomb] { &self.bombs }
    pub fn explosions(&self) -> &[Explosion] { &self.explosions }
    pub fn items(&self) -> &[Item] { &self.items }
    pub fn blocks(&self) -> &[Block] { &self.blocks }
    pub fn portal(&self) -> &Portal { &self.portal }
    pub fn phase(&self) -> Phase { self.phase }
    pub fn difficulty(&self) -> Difficulty { self.difficulty }
    pub fn level_index(&self) -> usize { self.level_index }
    pub fn level_name(&self) -> &str { &self.level_name }
    pub fn lives(&self) -> u32 { self.player.lives }
    pub fn elapsed_ms(&self) -> u64 { self.elapsed_ms }
    pub fn time_remaining_ms(&self) -> Option<u32> { self.time_remaining_ms }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::Ended(_))
    }

    /// Final score after a victory, otherwise the score a victory now would get.
    pub fn score(&self) -> u32 {
        match self.phase {
            Phase::Ended(Outcome::Victory { score }) => score,
            _ => score_for(self.elapsed_ms),
        }
    }

    /// Outcome summary, once the round has ended.
    pub fn report(&self) -> Option<RoundReport> {
        match self.phase {
            Phase::Playing => None,
            Phase::Ended(outcome) => Some(RoundReport {
                outcome,
                difficulty: self.difficulty,
                level_index: self.level_index,
            }),
        }
    }
}

/// Monotonically decreasing with time spent, floored at 0.
pub fn score_for(elapsed_ms: u64) -> u32 {
    let penalty = (elapsed_ms / 5).min(MAX_SCORE as u64) as u32;
    MAX_SCORE - penalty
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a round from a diagram with no hidden drops except the key.
    pub(crate) fn round_from(rows: &[&str]) -> Round {
        round_with(rows, DifficultyConfig::preset(Difficulty::Easy))
    }

    pub(crate) fn round_with(rows: &[&str], cfg: DifficultyConfig) -> Round {
        let cfg = DifficultyConfig { powerup_drop_rate: 0.0, ..cfg };
        Round::start(&LevelDef::from_rows("test", rows), Difficulty::Easy, &cfg, 0, 1)
            .expect("test level is well formed")
    }

    #[test]
    fn start_uses_difficulty() {
        let cfg = DifficultyConfig::preset(Difficulty::Hard);
        let r = round_with(&["P.BO"], cfg);
        assert_eq!(r.lives(), 1);
        assert_eq!(r.player().bomb_range, 2);
        assert_eq!(r.bomb_time_ms, 1500);
        assert_eq!(r.time_remaining_ms(), Some(90_000));
        assert_eq!(r.player().body.cell(), (0, 0));
        assert_eq!(r.phase(), Phase::Playing);
        assert!(r.report().is_none());
    }

    #[test]
    fn bad_level_fails_to_start() {
        let cfg = DifficultyConfig::preset(Difficulty::Easy);
        let r = Round::start(&LevelDef::from_rows("bad", &["..BO"]), Difficulty::Easy, &cfg, 0, 1);
        assert_eq!(r.err(), Some(LevelError::MissingPlayer));
    }

    #[test]
    fn input_sets_intent_and_requests() {
        let mut r = round_from(&["P.BO"]);
        r.handle_input(InputEvent::Press(MoveDir::Right));
        assert!(r.player().intent.right);
        r.handle_input(InputEvent::Release(MoveDir::Right));
        assert!(!r.player().intent.right);
        r.handle_input(InputEvent::PlaceBomb);
        r.handle_input(InputEvent::Retreat);
        assert!(r.bomb_requested && r.retreat_requested);
    }

    #[test]
    fn end_happens_once() {
        let mut r = round_from(&["P.BO"]);
        assert!(r.end(Outcome::Defeat(DefeatCause::LivesExhausted)));
        assert!(!r.end(Outcome::Retreated));
        assert_eq!(r.phase(), Phase::Ended(Outcome::Defeat(DefeatCause::LivesExhausted)));
        let rep = r.report().unwrap();
        assert_eq!(rep.level_index, 0);
        assert_eq!(rep.difficulty, Difficulty::Easy);
    }

    #[test]
    fn score_decreases_and_floors() {
        assert_eq!(score_for(0), 10_000);
        assert_eq!(score_for(5_000), 9_000);
        assert_eq!(score_for(49_999), 1);
        assert_eq!(score_for(50_000), 0);
        assert_eq!(score_for(u64::MAX), 0);
    }
}
