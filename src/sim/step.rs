/// The step function: advances the round by one frame of `dt` ms.
///
/// Processing order:
///   0. Retreat request
///   1. Player: pending bomb, movement, pickups, effect timers / eject
///   2. Bomb countdowns + detonation (sweep dead bombs)
///   3. Explosion fade (sweep spent explosions)
///   4. Enemies: interpolate, or decide chase / roam when idle
///   5. Hazards (explosion / enemy contact)
///   6. Portal open state + victory check
///   7. Time limit
///
/// Every phase reads the results of the phases before it in the same frame.

use log::debug;

use crate::domain::ai::{self, Decision};
use crate::domain::entity::{live_at, MoveDir, Positioned};
use crate::domain::powerup;
use crate::domain::rules::{is_blocked, prune_standing, Passage};
use crate::domain::tile::Tile;
use super::bomb;
use super::event::GameEvent;
use super::hazard;
use super::round::{score_for, DefeatCause, Effect, Outcome, Phase, Round};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(round: &mut Round, dt: u32) -> Vec<GameEvent> {
    if round.phase != Phase::Playing { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    round.elapsed_ms += dt as u64;

    if round.retreat_requested {
        round.retreat_requested = false;
        if round.end(Outcome::Retreated) {
            events.push(GameEvent::Retreated);
        }
        return events;
    }

    resolve_player(round, dt, &mut events);
    bomb::resolve_bombs(round, dt, &mut events);
    bomb::resolve_explosions(round, dt);
    resolve_enemies(round, dt);
    if hazard::resolve_hazards(round, &mut events) { return events; }
    if resolve_portal(round, &mut events) { return events; }
    resolve_time_limit(round, dt, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_player(round: &mut Round, dt: u32, events: &mut Vec<GameEvent>) {
    if round.bomb_requested {
        round.bomb_requested = false;
        bomb::try_place_bomb(round, events);
    }

    let p = &mut round.player;
    let arrived = if p.motion.is_moving() {
        p.motion.advance(&mut p.body, dt)
    } else {
        try_start_move(round);
        false
    };

    resolve_pickups(round, events);
    resolve_effect_timers(round, dt, arrived, events);
}

/// Start a one-tile move from the held intent, if the target is open.
fn try_start_move(round: &mut Round) {
    let dir = match round.player.intent.direction() {
        Some(d) => d,
        None => { round.player.motion.frame = 0; return; }
    };
    round.player.motion.facing = dir;

    let (x, y) = round.player.body.cell();
    let (dx, dy) = dir.delta();
    let (tx, ty) = (x as i32 + dx, y as i32 + dy);
    if is_blocked(&round.grid, &round.bombs, tx, ty, &Passage::of_player(&round.player)) {
        return;
    }

    let target = (tx as usize, ty as usize);
    let p = &mut round.player;
    prune_standing(&mut p.standing_on_bombs, target);
    p.motion.begin(&p.body, target, p.move_duration_ms);
}

/// Items under the player apply immediately and disappear.
fn resolve_pickups(round: &mut Round, events: &mut Vec<GameEvent>) {
    let (x, y) = round.player.body.cell();
    for item in round.items.iter_mut() {
        if !item.is_at(x, y) { continue; }
        powerup::apply(item.kind, &mut round.player);
        item.body.dead = true;
        debug!("picked up {} at ({x}, {y})", item.kind.name());
        events.push(GameEvent::ItemPicked { kind: item.kind });
    }
    round.items.retain(|it| !it.body.dead);

    if round.grid.tile_at(x, y) == Tile::Item && live_at(&round.items, x, y).is_none() {
        round.grid.set_tile(x, y, Tile::Empty);
    }
}

/// Tick invincibility and pass effects. A pass effect that lapses while the
/// player sits in now-solid terrain ejects them to the first open neighbour.
///
/// Mid-move, the move only lands early when its target is no longer
/// enterable; otherwise it keeps interpolating and the check runs on arrival.
fn resolve_effect_timers(round: &mut Round, dt: u32, arrived: bool, events: &mut Vec<GameEvent>) {
    let p = &mut round.player;
    p.invincible.tick(dt);

    let mut lapsed = false;
    if p.wall_pass.tick(dt) {
        events.push(GameEvent::EffectExpired(Effect::WallPass));
        lapsed = true;
    }
    if p.bomb_pass.tick(dt) {
        events.push(GameEvent::EffectExpired(Effect::BombPass));
        lapsed = true;
    }

    if lapsed {
        if let Some((tx, ty)) = round.player.motion.target_cell() {
            let pass = Passage::of_player(&round.player);
            if !is_blocked(&round.grid, &round.bombs, tx as i32, ty as i32, &pass) {
                round.player.recheck_on_arrival = true;
                return;
            }
            let p = &mut round.player;
            p.motion.finish(&mut p.body);
        }
    } else if !(arrived && round.player.recheck_on_arrival) {
        return;
    }
    round.player.recheck_on_arrival = false;

    if is_contained(round) {
        eject_player(round, events);
    }
}

/// Inside a block without wall-pass, or on any live bomb without bomb-pass.
/// The standing set grants no exemption here.
fn is_contained(round: &Round) -> bool {
    let p = &round.player;
    let (x, y) = p.body.cell();
    let in_block = round.grid.tile_at(x, y) == Tile::Breakable && !p.wall_pass.is_active();
    let on_bomb = live_at(&round.bombs, x, y).is_some() && !p.bomb_pass.is_active();
    in_block || on_bomb
}

/// Snap the player to the first unblocked neighbour (Up, Down, Left, Right).
fn eject_player(round: &mut Round, events: &mut Vec<GameEvent>) {
    let (x, y) = round.player.body.cell();
    for dir in MoveDir::ALL {
        let Some((nx, ny)) = round.grid.neighbor(x, y, dir) else { continue };
        if is_blocked(&round.grid, &round.bombs, nx as i32, ny as i32, &Passage::of_player(&round.player)) {
            continue;
        }
        round.player.body.snap_to(nx, ny);
        prune_standing(&mut round.player.standing_on_bombs, (nx, ny));
        debug!("player ejected from ({x}, {y}) to ({nx}, {ny})");
        events.push(GameEvent::PlayerEjected { x: nx, y: ny });
        return;
    }
    debug!("player stuck at ({x}, {y}): no open neighbour");
}

// ══════════════════════════════════════════════════════════════
// Enemies
// ══════════════════════════════════════════════════════════════

fn resolve_enemies(round: &mut Round, dt: u32) {
    let Round { grid, bombs, enemies, player, rng, .. } = round;
    let target = player.body.cell();

    for e in enemies.iter_mut() {
        if e.motion.is_moving() {
            e.motion.advance(&mut e.body, dt);
            continue;
        }

        let at = e.body.cell();
        let (decision, path) = ai::decide(grid, bombs, at, target, e.last_dir, &mut *rng);
        e.path = path;
        match decision {
            Decision::Chase(next) => {
                e.motion.begin(&e.body, next, e.move_duration_ms);
            }
            Decision::Roam(dir) => {
                e.last_dir = Some(dir);
                if let Some(next) = grid.neighbor(at.0, at.1, dir) {
                    e.motion.begin(&e.body, next, e.move_duration_ms);
                }
            }
            Decision::Boxed => e.last_dir = None,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Win / lose
// ══════════════════════════════════════════════════════════════

/// Recompute `open := has_key`; an open portal under the player wins.
fn resolve_portal(round: &mut Round, events: &mut Vec<GameEvent>) -> bool {
    let open = round.player.has_key;
    if open && !round.portal.open {
        events.push(GameEvent::PortalOpened);
    }
    round.portal.open = open;

    let (px, py) = round.player.body.cell();
    if !open || round.portal.body.cell() != (px, py) { return false; }

    let score = score_for(round.elapsed_ms);
    if round.end(Outcome::Victory { score }) {
        events.push(GameEvent::Victory { score });
        return true;
    }
    false
}

fn resolve_time_limit(round: &mut Round, dt: u32, events: &mut Vec<GameEvent>) {
    let Some(left) = round.time_remaining_ms else { return };
    let left = left.saturating_sub(dt);
    round.time_remaining_ms = Some(left);
    if left > 0 { return; }

    let cause = DefeatCause::TimeExpired;
    if round.end(Outcome::Defeat(cause)) {
        events.push(GameEvent::Defeat(cause));
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Difficulty, DifficultyConfig};
    use crate::domain::entity::{Item, ItemKind};
    use crate::domain::powerup::PASS_EFFECT_MS;
    use crate::sim::round::tests::{round_from, round_with};
    use crate::sim::round::InputEvent;

    const DT: u32 = 16;

    /// Run frames until `ms` of game time passed or the round ended.
    fn run(round: &mut Round, ms: u32) -> Vec<GameEvent> {
        let mut all = vec![];
        let mut t = 0;
        while t < ms && !round.is_over() {
            all.extend(step(round, DT));
            t += DT;
        }
        all
    }

    #[test]
    fn held_direction_walks_one_tile_per_move() {
        let mut r = round_from(&["P....BO"]);
        r.handle_input(InputEvent::Press(MoveDir::Right));
        step(&mut r, DT);
        assert!(r.player.motion.is_moving());
        run(&mut r, 200);
        assert!(r.player.body.x >= 1);
        r.handle_input(InputEvent::Release(MoveDir::Right));
        run(&mut r, 400);
        let x = r.player.body.x;
        run(&mut r, 400);
        assert_eq!(r.player.body.x, x);
        assert!(!r.player.motion.is_moving());
    }

    #[test]
    fn diagonal_input_moves_horizontally() {
        let mut r = round_from(&["...", "P.B", "..O"]);
        r.handle_input(InputEvent::Press(MoveDir::Down));
        r.handle_input(InputEvent::Press(MoveDir::Right));
        step(&mut r, DT);
        assert_eq!(r.player.motion.target_cell(), Some((1, 1)));
    }

    #[test]
    fn walls_and_blocks_stop_the_player() {
        let mut r = round_from(&["SPBO"]);
        r.handle_input(InputEvent::Press(MoveDir::Left));
        step(&mut r, DT);
        assert!(!r.player.motion.is_moving());
        r.handle_input(InputEvent::Release(MoveDir::Left));
        r.handle_input(InputEvent::Press(MoveDir::Right));
        step(&mut r, DT);
        assert!(!r.player.motion.is_moving());
        assert_eq!(r.player.motion.facing, MoveDir::Right);
    }

    #[test]
    fn player_can_leave_own_bomb_but_not_return() {
        let mut r = round_from(&["P...BO"]);
        r.handle_input(InputEvent::PlaceBomb);
        step(&mut r, DT);
        assert_eq!(r.bombs.len(), 1);

        r.handle_input(InputEvent::Press(MoveDir::Right));
        step(&mut r, DT);
        r.handle_input(InputEvent::Release(MoveDir::Right));
        run(&mut r, 300);
        assert_eq!(r.player.body.cell(), (1, 0));
        assert!(r.player.standing_on_bombs.is_empty());

        r.handle_input(InputEvent::Press(MoveDir::Left));
        step(&mut r, DT);
        assert!(!r.player.motion.is_moving());
    }

    #[test]
    fn pickup_applies_and_clears_item_tile() {
        let mut r = round_from(&["PI..BO"]);
        r.items[0].kind = ItemKind::Fire;
        r.handle_input(InputEvent::Press(MoveDir::Right));
        let ev = run(&mut r, 300);
        assert_eq!(r.player.bomb_range, 2);
        assert!(r.items.is_empty());
        assert_eq!(r.grid.tile_at(1, 0), Tile::Empty);
        assert!(ev.contains(&GameEvent::ItemPicked { kind: ItemKind::Fire }));
    }

    #[test]
    fn closed_portal_never_ends_the_round() {
        let mut r = round_from(&["PO.B"]);
        r.handle_input(InputEvent::Press(MoveDir::Right));
        step(&mut r, DT);
        r.handle_input(InputEvent::Release(MoveDir::Right));
        run(&mut r, 400);
        assert_eq!(r.player.body.cell(), (1, 0));
        assert!(!r.portal.open);
        assert!(!r.is_over());
    }

    #[test]
    fn portal_tracks_key_and_wins() {
        let mut r = round_from(&["P.O.B"]);
        r.items.push(Item::new(1, 0, ItemKind::Key));
        r.handle_input(InputEvent::Press(MoveDir::Right));

        let mut opened_at = None;
        let mut t = 0;
        while !r.is_over() && t < 2000 {
            for e in step(&mut r, DT) {
                if e == GameEvent::PortalOpened { opened_at = Some(t); }
            }
            assert_eq!(r.portal.open, r.player.has_key);
            t += DT;
        }
        assert!(opened_at.is_some());
        match r.phase() {
            Phase::Ended(Outcome::Victory { score }) => {
                assert_eq!(score, score_for(r.elapsed_ms()));
                assert!(score > 9_000);
                assert_eq!(r.score(), score);
            }
            other => panic!("expected victory, got {other:?}"),
        }
        assert!(step(&mut r, DT).is_empty());
    }

    #[test]
    fn time_limit_defeats() {
        let cfg = DifficultyConfig { time_limit_ms: Some(100), ..DifficultyConfig::preset(Difficulty::Medium) };
        let mut r = round_with(&["P..BO"], cfg);
        let ev = run(&mut r, 1000);
        assert_eq!(r.phase(), Phase::Ended(Outcome::Defeat(DefeatCause::TimeExpired)));
        assert_eq!(ev.last(), Some(&GameEvent::Defeat(DefeatCause::TimeExpired)));
        assert_eq!(r.time_remaining_ms(), Some(0));
    }

    #[test]
    fn retreat_ends_next_step() {
        let mut r = round_from(&["P..BO"]);
        r.handle_input(InputEvent::Retreat);
        assert!(!r.is_over());
        assert_eq!(step(&mut r, DT), vec![GameEvent::Retreated]);
        assert_eq!(r.report().map(|rep| rep.outcome), Some(Outcome::Retreated));
    }

    #[test]
    fn wall_pass_lapse_ejects_from_block() {
        let mut r = round_from(&[
            "SSSSS",
            "SPBBS",
            "SSBOS",
            "SSSSS",
        ]);
        r.player.wall_pass.start(PASS_EFFECT_MS);
        r.handle_input(InputEvent::Press(MoveDir::Right));
        run(&mut r, 200);
        r.handle_input(InputEvent::Release(MoveDir::Right));
        run(&mut r, 100);
        assert_eq!(r.player.body.cell(), (2, 1));
        assert_eq!(r.grid.tile_at(2, 1), Tile::Breakable);

        let ev = run(&mut r, PASS_EFFECT_MS);
        assert!(ev.contains(&GameEvent::EffectExpired(Effect::WallPass)));
        assert!(ev.contains(&GameEvent::PlayerEjected { x: 1, y: 1 }));
        let (x, y) = r.player.body.cell();
        assert!(!is_blocked(&r.grid, &r.bombs, x as i32, y as i32, &Passage::of_player(&r.player)));
    }

    #[test]
    fn lapse_mid_move_lands_then_ejects() {
        let mut r = round_from(&[
            "SSSSSS",
            "SP.BBS",
            "SSSSSO",
        ]);
        r.player.body.snap_to(2, 1);
        r.player.wall_pass.start(50);
        r.player.intent.right = true;
        step(&mut r, DT);
        assert_eq!(r.player.motion.target_cell(), Some((3, 1)));
        r.player.intent.right = false;

        let ev = run(&mut r, 64);
        assert!(ev.contains(&GameEvent::EffectExpired(Effect::WallPass)));
        assert!(!r.player.motion.is_moving());
        assert!(ev.contains(&GameEvent::PlayerEjected { x: 2, y: 1 }));
        assert_eq!(r.player.body.cell(), (2, 1));
    }

    #[test]
    fn bomb_pass_lapse_ejects_from_own_bomb() {
        let mut r = round_from(&[
            "SSSSSS",
            "S.P..S",
            "SSSSBO",
        ]);
        r.player.bomb_pass.start(32);
        r.handle_input(InputEvent::PlaceBomb);
        let ev = run(&mut r, 64);
        assert!(ev.contains(&GameEvent::BombPlaced { x: 2, y: 1 }));
        assert!(ev.contains(&GameEvent::EffectExpired(Effect::BombPass)));
        assert!(ev.contains(&GameEvent::PlayerEjected { x: 1, y: 1 }));
        assert_eq!(r.player.body.cell(), (1, 1));
        assert!(live_at(&r.bombs, 2, 1).is_some());
        assert!(r.player.standing_on_bombs.is_empty());
    }

    #[test]
    fn lapse_over_open_floor_keeps_interpolating() {
        let mut r = round_from(&["P....BO"]);
        r.player.wall_pass.start(32);
        r.handle_input(InputEvent::Press(MoveDir::Right));
        step(&mut r, DT);
        r.handle_input(InputEvent::Release(MoveDir::Right));
        let ev = step(&mut r, DT);
        assert!(ev.contains(&GameEvent::EffectExpired(Effect::WallPass)));
        assert!(r.player.motion.is_moving());
        assert!(r.player.body.px > 0.0 && r.player.body.px < 32.0);

        let ev = run(&mut r, 300);
        assert!(!r.player.motion.is_moving());
        assert_eq!(r.player.body.cell(), (1, 0));
        assert!(!r.player.recheck_on_arrival);
        assert!(!ev.iter().any(|e| matches!(e, GameEvent::PlayerEjected { .. })));
    }

    #[test]
    fn enemy_chases_through_corridor() {
        let mut r = round_from(&["P....EBO"]);
        r.enemies[0].move_duration_ms = 100;
        step(&mut r, DT);
        assert_eq!(r.enemies[0].motion.target_cell(), Some((4, 0)));
        assert_eq!(r.enemies[0].path, vec![(3, 0), (2, 0), (1, 0), (0, 0)]);
    }

    #[test]
    fn enemy_on_player_cell_roams_away() {
        let mut r = round_from(&["PE.BO"]);
        r.enemies[0].body.snap_to(0, 0);
        step(&mut r, DT);
        assert!(r.enemies[0].motion.is_moving());
        assert_eq!(r.enemies[0].motion.target_cell(), Some((1, 0)));
        assert_eq!(r.enemies[0].last_dir, Some(MoveDir::Right));
    }

    #[test]
    fn enemy_contact_costs_a_life() {
        let mut r = round_from(&["PE.BO"]);
        r.enemies[0].move_duration_ms = 32;
        let ev = run(&mut r, 200);
        assert!(ev.contains(&GameEvent::PlayerHit { lives: 4 }));
        assert_eq!(r.lives(), 4);
    }

    #[test]
    fn own_bomb_kills_enemy_and_opens_path() {
        let mut r = round_from(&[
            "SSSSSSS",
            "SP.E.OS",
            "SBSSSSS",
        ]);
        r.enemies[0].move_duration_ms = 10_000;
        r.player.shield = true;
        r.player.bomb_range = 2;
        r.handle_input(InputEvent::PlaceBomb);
        let ev = run(&mut r, 2100);
        assert!(ev.iter().any(|e| matches!(e, GameEvent::EnemyKilled { id: 0, .. })));
        assert!(r.enemies.is_empty());
    }
}
