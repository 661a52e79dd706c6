/// Bomb/explosion engine.
///
/// ## Bomb state machine
///
///   Ticking ──(timer reaches 0)──► Exploded (dead, swept)
///
/// A chain reaction only forces another bomb's timer to 0. That bomb then
/// detonates during its own update, never inside the triggering call, so
/// recursion depth stays at zero however long the chain.
///
/// ## Ray walk (per direction, up to `power` tiles)
///
/// ┌──────────────────────────┬───────────────┬──────────────────────────┐
/// │ Tile                      │ Explosion?    │ Then                     │
/// ├──────────────────────────┼───────────────┼──────────────────────────┤
/// │ S (or off-grid)           │ no            │ stop                     │
/// │ any other                 │ yes           │ chain-trigger live bombs │
/// │ item (I tile / live item) │ yes           │ destroy non-KEY, clear,  │
/// │                           │               │ stop                     │
/// │ B                         │ yes           │ reveal hidden item,      │
/// │                           │               │ remove block, clear, stop│
/// │ empty / portal            │ yes           │ continue                 │
/// └──────────────────────────┴───────────────┴──────────────────────────┘

use log::debug;

use crate::domain::entity::{live_at, Bomb, Explosion, Item, ItemKind, MoveDir, Owner, Positioned};
use crate::domain::tile::Tile;
use super::event::GameEvent;
use super::round::Round;

/// Ray order at detonation.
const RAY_DIRS: [MoveDir; 4] = [MoveDir::Down, MoveDir::Up, MoveDir::Right, MoveDir::Left];

// ══════════════════════════════════════════════════════════════
// Placement
// ══════════════════════════════════════════════════════════════

/// Drop a bomb on the player's cell. Rejections are normal control flow:
/// capacity reached, tile is not floor, or a bomb is already there.
pub fn try_place_bomb(round: &mut Round, events: &mut Vec<GameEvent>) -> bool {
    let p = &round.player;
    if !p.can_place_more() { return false; }

    let (x, y) = p.body.cell();
    if !round.grid.tile_at(x, y).accepts_bomb() { return false; }
    if round.bombs.iter().any(|b| b.body.x == x && b.body.y == y && !b.body.dead) {
        return false;
    }

    round.bombs.push(Bomb::new(x, y, Owner::Player, p.bomb_range, round.bomb_time_ms));
    round.player.bombs_active += 1;
    round.player.standing_on_bombs.insert((x, y));
    debug!("bomb placed at ({x}, {y}), {} active", round.player.bombs_active);
    events.push(GameEvent::BombPlaced { x, y });
    true
}

// ══════════════════════════════════════════════════════════════
// Per-frame updates
// ══════════════════════════════════════════════════════════════

/// Count every live bomb down by `dt`, detonate the expired ones, sweep.
pub fn resolve_bombs(round: &mut Round, dt: u32, events: &mut Vec<GameEvent>) {
    for i in 0..round.bombs.len() {
        if round.bombs[i].exploded { continue; }
        let b = &mut round.bombs[i];
        b.timer_ms = b.timer_ms.saturating_sub(dt);
        if b.timer_ms == 0 {
            detonate(round, i, events);
        }
    }
    round.bombs.retain(|b| !b.body.dead);
}

/// Fade explosions and drop the spent ones.
pub fn resolve_explosions(round: &mut Round, dt: u32) {
    for e in round.explosions.iter_mut() {
        e.update(dt);
    }
    round.explosions.retain(|e| !e.body.dead);
}

// ══════════════════════════════════════════════════════════════
// Detonation
// ══════════════════════════════════════════════════════════════

/// Explode bomb `idx`. A second call on the same bomb does nothing.
pub fn detonate(round: &mut Round, idx: usize, events: &mut Vec<GameEvent>) {
    let bomb = &mut round.bombs[idx];
    if bomb.exploded { return; }
    bomb.exploded = true;
    bomb.body.dead = true;
    let (bx, by) = bomb.body.cell();
    let power = bomb.power;

    match bomb.owner {
        Owner::Player => {
            round.player.bombs_active = round.player.bombs_active.saturating_sub(1);
            round.player.standing_on_bombs.remove(&(bx, by));
        }
    }
    round.grid.set_tile(bx, by, Tile::Empty);

    debug!("bomb at ({bx}, {by}) detonates, power {power}");
    events.push(GameEvent::BombDetonated { x: bx, y: by, power });
    round.explosions.push(Explosion::new(bx, by));

    for dir in RAY_DIRS {
        let (dx, dy) = dir.delta();
        for r in 1..=power as i32 {
            let nx = bx as i32 + dx * r;
            let ny = by as i32 + dy * r;
            if round.grid.tile_at_i(nx, ny).is_solid() { break; }
            let (x, y) = (nx as usize, ny as usize);

            round.explosions.push(Explosion::new(x, y));
            chain_trigger(round, idx, x, y, events);

            if hits_item(round, x, y, events) { break; }
            if hits_block(round, x, y, events) { break; }
        }
    }
}

/// Force every other live bomb on (x, y) to go off on its next update.
fn chain_trigger(round: &mut Round, source: usize, x: usize, y: usize, events: &mut Vec<GameEvent>) {
    for (j, other) in round.bombs.iter_mut().enumerate() {
        if j == source || other.exploded || !other.is_at(x, y) { continue; }
        if other.timer_ms > 0 {
            debug!("chain reaction reaches bomb at ({x}, {y})");
            events.push(GameEvent::ChainTriggered { x, y });
        }
        other.trigger();
    }
}

/// Item cell: non-KEY items burn, the tile clears, the ray stops.
fn hits_item(round: &mut Round, x: usize, y: usize, events: &mut Vec<GameEvent>) -> bool {
    let tile_item = round.grid.tile_at(x, y) == Tile::Item;
    let found = round.items.iter_mut().find(|it| it.is_at(x, y));
    if !tile_item && found.is_none() { return false; }

    if let Some(item) = found {
        if item.kind != ItemKind::Key {
            item.body.dead = true;
            debug!("{} at ({x}, {y}) destroyed", item.kind.name());
            events.push(GameEvent::ItemDestroyed { x, y, kind: item.kind });
        }
    }
    round.items.retain(|it| !it.body.dead);
    if tile_item {
        round.grid.set_tile(x, y, Tile::Empty);
    }
    true
}

/// Breakable cell: reveal the hidden item, remove the block, stop the ray.
fn hits_block(round: &mut Round, x: usize, y: usize, events: &mut Vec<GameEvent>) -> bool {
    if !round.grid.tile_at(x, y).is_breakable() { return false; }

    if let Some(block) = round.blocks.iter_mut().find(|b| b.is_at(x, y)) {
        block.body.dead = true;
        if let Some(kind) = block.hidden.take() {
            debug!("{} revealed at ({x}, {y})", kind.name());
            round.items.push(Item::new(x, y, kind));
            events.push(GameEvent::ItemRevealed { x, y, kind });
        }
    }
    round.blocks.retain(|b| !b.body.dead);
    round.grid.set_tile(x, y, Tile::Empty);
    events.push(GameEvent::BlockDestroyed { x, y });
    true
}

/// Live explosion on (x, y)?
pub fn explosion_at(round: &Round, x: usize, y: usize) -> bool {
    live_at(&round.explosions, x, y).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::round::tests::round_from;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn cells(round: &Round) -> BTreeSet<(usize, usize)> {
        round.explosions.iter().map(|e| e.body.cell()).collect()
    }

    fn place(round: &mut Round, x: usize, y: usize, power: u32) {
        round.bombs.push(Bomb::new(x, y, Owner::Player, power, 0));
        round.player.bombs_active += 1;
    }

    const OPEN_11: [&str; 11] = [
        "P..........",
        "...........",
        "...........",
        "...........",
        "...........",
        "...........",
        "...........",
        "...........",
        "...........",
        "...........",
        "B.........O",
    ];

    #[test]
    fn power_two_cross_makes_nine_explosions() {
        let mut r = round_from(&OPEN_11);
        place(&mut r, 5, 5, 2);
        let mut ev = vec![];
        resolve_bombs(&mut r, 16, &mut ev);
        let expect: BTreeSet<_> = [
            (5, 5), (6, 5), (7, 5), (4, 5), (3, 5),
            (5, 6), (5, 7), (5, 4), (5, 3),
        ].into_iter().collect();
        assert_eq!(r.explosions.len(), 9);
        assert_eq!(cells(&r), expect);
        assert!(r.bombs.is_empty());
        assert_eq!(r.player.bombs_active, 0);
        assert!(ev.contains(&GameEvent::BombDetonated { x: 5, y: 5, power: 2 }));
    }

    #[test]
    fn solid_stops_ray_without_explosion() {
        let mut r = round_from(&["P.S..BO", "B......"]);
        place(&mut r, 3, 0, 3);
        detonate(&mut r, 0, &mut vec![]);
        let c = cells(&r);
        assert!(c.contains(&(3, 0)));
        assert!(c.contains(&(4, 0)));
        assert!(!c.contains(&(2, 0)));
        assert!(!c.contains(&(1, 0)));
    }

    #[test]
    fn block_is_hit_inclusive_and_reveals() {
        let mut r = round_from(&["P...BB.O"]);
        // The fallback key lands in one of the two blocks; force a known layout.
        for b in r.blocks.iter_mut() { b.hidden = None; }
        r.blocks[0].hidden = Some(ItemKind::Fire);
        place(&mut r, 2, 0, 5);
        let mut ev = vec![];
        detonate(&mut r, 0, &mut ev);

        let c = cells(&r);
        assert!(c.contains(&(4, 0)));
        assert!(!c.contains(&(5, 0)));
        assert_eq!(r.grid.tile_at(4, 0), Tile::Empty);
        assert_eq!(r.grid.tile_at(5, 0), Tile::Breakable);
        assert_eq!(r.blocks.len(), 1);
        assert!(live_at(&r.items, 4, 0).is_some_and(|i| i.kind == ItemKind::Fire));
        assert!(ev.contains(&GameEvent::ItemRevealed { x: 4, y: 0, kind: ItemKind::Fire }));
        assert!(ev.contains(&GameEvent::BlockDestroyed { x: 4, y: 0 }));
    }

    #[test]
    fn key_survives_blast() {
        let mut r = round_from(&["P..B..O"]);
        r.blocks[0].hidden = None;
        r.items.push(Item::new(4, 0, ItemKind::Key));
        place(&mut r, 2, 0, 1);
        detonate(&mut r, 0, &mut vec![]);
        // Ray toward the key: block at (3,0) stops it first.
        assert!(live_at(&r.items, 4, 0).is_some());

        place(&mut r, 5, 0, 3);
        let idx = r.bombs.len() - 1;
        detonate(&mut r, idx, &mut vec![]);
        assert!(live_at(&r.items, 4, 0).is_some_and(|i| i.kind == ItemKind::Key));
        assert!(cells(&r).contains(&(4, 0)));
        // The second ray stopped on the key: (3,0) only burned in the first blast.
        assert_eq!(r.explosions.iter().filter(|e| e.body.cell() == (3, 0)).count(), 1);
    }

    #[test]
    fn bomb_cell_is_cleared() {
        let mut r = round_from(&["P....BO"]);
        // A picked-up item leaves its `I` tile behind until the next sweep.
        r.grid.set_tile(2, 0, Tile::Item);
        place(&mut r, 2, 0, 1);
        place(&mut r, 4, 0, 1);
        detonate(&mut r, 0, &mut vec![]);
        detonate(&mut r, 1, &mut vec![]);
        assert_eq!(r.grid.tile_at(2, 0), Tile::Empty);
        assert_eq!(r.grid.tile_at(4, 0), Tile::Empty);
    }

    #[test]
    fn ground_item_burns_and_stops_ray() {
        let mut r = round_from(&["P.I..O", "B....."]);
        assert_eq!(r.items.len(), 1);
        place(&mut r, 1, 0, 3);
        let mut ev = vec![];
        detonate(&mut r, 0, &mut ev);
        assert!(r.items.is_empty());
        assert_eq!(r.grid.tile_at(2, 0), Tile::Empty);
        assert!(cells(&r).contains(&(2, 0)));
        assert!(!cells(&r).contains(&(3, 0)));
        assert!(ev.iter().any(|e| matches!(e, GameEvent::ItemDestroyed { x: 2, y: 0, .. })));
    }

    #[test]
    fn chain_detonates_on_its_own_update() {
        let mut r = round_from(&["P.....O", "B......"]);
        // Later bomb triggers an earlier one: the earlier one was already
        // updated this sweep, so it waits for the next frame.
        r.bombs.push(Bomb::new(2, 0, Owner::Player, 1, 5000));
        r.bombs.push(Bomb::new(3, 0, Owner::Player, 1, 10));
        r.player.bombs_active = 2;

        let mut ev = vec![];
        resolve_bombs(&mut r, 16, &mut ev);
        assert_eq!(r.bombs.len(), 1);
        assert_eq!(r.bombs[0].timer_ms, 0);
        assert!(!r.bombs[0].exploded);
        assert!(ev.contains(&GameEvent::ChainTriggered { x: 2, y: 0 }));

        let mut ev = vec![];
        resolve_bombs(&mut r, 16, &mut ev);
        assert!(r.bombs.is_empty());
        assert!(ev.contains(&GameEvent::BombDetonated { x: 2, y: 0, power: 1 }));
        assert_eq!(r.player.bombs_active, 0);
    }

    #[test]
    fn double_detonation_is_guarded() {
        let mut r = round_from(&["P....O", "B....."]);
        place(&mut r, 3, 0, 1);
        let mut ev = vec![];
        detonate(&mut r, 0, &mut ev);
        let n = r.explosions.len();
        detonate(&mut r, 0, &mut ev);
        assert_eq!(r.explosions.len(), n);
        assert_eq!(r.player.bombs_active, 0);
    }

    #[test]
    fn placement_rules() {
        let mut r = round_from(&["P.BO"]);
        let mut ev = vec![];
        assert!(try_place_bomb(&mut r, &mut ev));
        assert!(r.player.standing_on_bombs.contains(&(0, 0)));
        // Capacity 1 reached.
        assert!(!try_place_bomb(&mut r, &mut ev));
        // Same cell already holds a bomb.
        r.player.bomb_capacity = 2;
        assert!(!try_place_bomb(&mut r, &mut ev));
        // Portal is not floor.
        r.player.body.snap_to(3, 0);
        assert!(!try_place_bomb(&mut r, &mut ev));
        assert_eq!(r.bombs.len(), 1);
        assert_eq!(ev, vec![GameEvent::BombPlaced { x: 0, y: 0 }]);
    }

    #[test]
    fn explosions_fade_out() {
        let mut r = round_from(&["P....O", "B....."]);
        place(&mut r, 3, 0, 1);
        resolve_bombs(&mut r, 16, &mut vec![]);
        assert!(explosion_at(&r, 3, 0));
        resolve_explosions(&mut r, 299);
        assert!(explosion_at(&r, 3, 0));
        resolve_explosions(&mut r, 1);
        assert!(r.explosions.is_empty());
    }

    proptest! {
        #[test]
        fn rays_never_pass_a_stopper(
            stop_at in 1usize..6,
            stopper in prop::sample::select(vec!['S', 'B', 'I']),
            power in 1u32..9,
        ) {
            // Bomb at column 0 of a 12-wide corridor, one stopper to the right.
            let mut row: Vec<char> = "............".chars().collect();
            row[stop_at] = stopper;
            let row: String = row.into_iter().collect();
            let mut r = round_from(&[row.as_str(), "P..........B", "O..........."]);
            place(&mut r, 0, 0, power);
            detonate(&mut r, 0, &mut vec![]);

            for (x, y) in cells(&r) {
                if y != 0 { continue; }
                prop_assert!(x <= power as usize);
                if stopper == 'S' {
                    prop_assert!(x < stop_at);
                } else {
                    prop_assert!(x <= stop_at);
                }
            }
            let reach = (power as usize).min(if stopper == 'S' { stop_at - 1 } else { stop_at });
            for x in 0..=reach {
                prop_assert!(cells(&r).contains(&(x, 0)));
            }
        }
    }
}
