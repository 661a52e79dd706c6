/// Power-up effects applied on pickup.

use super::entity::{ItemKind, Player};

/// Duration of PASS_WALL / PASS_BOMB.
pub const PASS_EFFECT_MS: u32 = 5000;
/// Move-duration change per SPEED / SLOW pickup.
pub const SPEED_STEP_MS: u32 = 30;
/// SPEED never drives the per-tile move time below this.
pub const MIN_MOVE_DURATION_MS: u32 = 40;

/// Apply an item's effect to the player. Pass effects refresh, never stack.
pub fn apply(kind: ItemKind, player: &mut Player) {
    match kind {
        ItemKind::Fire => player.bomb_range += 1,
        ItemKind::Bomb => player.bomb_capacity += 1,
        ItemKind::Speed => {
            player.move_duration_ms = player
                .move_duration_ms
                .saturating_sub(SPEED_STEP_MS)
                .max(MIN_MOVE_DURATION_MS);
        }
        ItemKind::Slow => player.move_duration_ms += SPEED_STEP_MS,
        ItemKind::PassWall => player.wall_pass.start(PASS_EFFECT_MS),
        ItemKind::PassBomb => player.bomb_pass.start(PASS_EFFECT_MS),
        ItemKind::Shield => player.shield = true,
        ItemKind::Key => player.has_key = true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        Player::new(1, 1, 3, 1)
    }

    #[test]
    fn permanent_upgrades() {
        let mut p = player();
        apply(ItemKind::Fire, &mut p);
        apply(ItemKind::Bomb, &mut p);
        apply(ItemKind::Key, &mut p);
        apply(ItemKind::Shield, &mut p);
        assert_eq!(p.bomb_range, 2);
        assert_eq!(p.bomb_capacity, 2);
        assert!(p.has_key);
        assert!(p.shield);
    }

    #[test]
    fn speed_is_floored() {
        let mut p = player();
        for _ in 0..20 {
            apply(ItemKind::Speed, &mut p);
        }
        assert_eq!(p.move_duration_ms, MIN_MOVE_DURATION_MS);
        apply(ItemKind::Slow, &mut p);
        assert_eq!(p.move_duration_ms, MIN_MOVE_DURATION_MS + SPEED_STEP_MS);
    }

    #[test]
    fn pass_effects_refresh() {
        let mut p = player();
        apply(ItemKind::PassWall, &mut p);
        p.wall_pass.tick(4000);
        apply(ItemKind::PassWall, &mut p);
        assert_eq!(p.wall_pass.remaining_ms, PASS_EFFECT_MS);
        apply(ItemKind::PassBomb, &mut p);
        assert!(p.bomb_pass.is_active());
    }
}
