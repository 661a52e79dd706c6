/// Collision & hazard resolver.
///
/// Runs once per frame after movement, bombs and enemies have updated:
///   (a) player on a live explosion  → damage
///   (b) enemies on a live explosion → removed
///   (c) player on an enemy          → damage
///
/// Damage: invincible → nothing; shield → consumed, long invincibility;
/// otherwise one life lost, short invincibility. Zero lives ends the round.

use log::debug;

use crate::domain::entity::{live_at, Damage};
use super::bomb::explosion_at;
use super::event::GameEvent;
use super::round::{DefeatCause, Outcome, Round};

/// Returns true if the round ended in defeat during this call.
pub fn resolve_hazards(round: &mut Round, events: &mut Vec<GameEvent>) -> bool {
    let (px, py) = round.player.body.cell();

    // (a)
    if explosion_at(round, px, py) && damage_player(round, events) {
        return true;
    }

    // (b)
    for i in 0..round.enemies.len() {
        let (ex, ey) = round.enemies[i].body.cell();
        if explosion_at(round, ex, ey) {
            let e = &mut round.enemies[i];
            e.body.dead = true;
            debug!("enemy {} killed at ({ex}, {ey})", e.id);
            events.push(GameEvent::EnemyKilled { id: e.id, x: ex, y: ey });
        }
    }
    round.enemies.retain(|e| !e.body.dead);

    // (c)
    if live_at(&round.enemies, px, py).is_some() && damage_player(round, events) {
        return true;
    }
    false
}

/// Apply one hazard contact. Returns true if it ended the round.
fn damage_player(round: &mut Round, events: &mut Vec<GameEvent>) -> bool {
    match round.player.take_damage() {
        Damage::Ignored => false,
        Damage::Shielded => {
            debug!("shield absorbed a hit");
            events.push(GameEvent::ShieldAbsorbed);
            false
        }
        Damage::LifeLost { remaining } => {
            debug!("player hit, {remaining} lives left");
            events.push(GameEvent::PlayerHit { lives: remaining });
            if remaining > 0 { return false; }
            let cause = DefeatCause::LivesExhausted;
            if round.end(Outcome::Defeat(cause)) {
                events.push(GameEvent::Defeat(cause));
                return true;
            }
            false
        }
    }
}
