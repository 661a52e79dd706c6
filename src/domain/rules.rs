/// Cell admissibility rules, truth-table driven.
///
/// Pure functions over the grid and the live bomb list. They answer
/// "may this mover enter that cell" without performing the move.
///
/// ## Blocking Truth Table
///
/// Rows are checked top to bottom; the first matching row decides.
/// ┌──────────────────────────────────┬─────────┬────────────────────┐
/// │ Condition                         │ Blocked?│ Notes              │
/// ├──────────────────────────────────┼─────────┼────────────────────┤
/// │ Cell out of bounds                │ YES     │ map edge           │
/// │ Tile = S                          │ YES     │ no exception       │
/// │ Tile = B, no wall-pass            │ YES     │ enemies never pass │
/// │ Live bomb on cell, bomb-pass      │ NO      │                    │
/// │ Live bomb on cell, cell in        │ NO      │ own fresh bomb     │
/// │   mover's standing set            │         │                    │
/// │ Live bomb on cell                 │ YES     │                    │
/// │ Otherwise                         │ NO      │ ., I, O            │
/// └──────────────────────────────────┴─────────┴────────────────────┘

use std::collections::HashSet;

use super::entity::{live_at, Bomb, Player};
use super::grid::Grid;
use super::tile::Tile;

/// The mover-specific exceptions to the blocking table.
#[derive(Clone, Copy, Debug)]
pub struct Passage<'a> {
    pub wall_pass: bool,
    pub bomb_pass: bool,
    pub standing_on: Option<&'a HashSet<(usize, usize)>>,
}

impl<'a> Passage<'a> {
    /// Enemies: S, B and every bomb cell block unconditionally.
    pub const NONE: Passage<'static> = Passage { wall_pass: false, bomb_pass: false, standing_on: None };

    pub fn of_player(player: &'a Player) -> Self {
        Passage {
            wall_pass: player.wall_pass.is_active(),
            bomb_pass: player.bomb_pass.is_active(),
            standing_on: Some(&player.standing_on_bombs),
        }
    }
}

/// Shared admissibility test. See truth table above.
pub fn is_blocked(grid: &Grid, bombs: &[Bomb], x: i32, y: i32, pass: &Passage) -> bool {
    if !grid.in_bounds(x, y) { return true; }
    match grid.tile_at_i(x, y) {
        Tile::Solid => return true,
        Tile::Breakable if !pass.wall_pass => return true,
        _ => {}
    }
    let (ux, uy) = (x as usize, y as usize);
    if live_at(bombs, ux, uy).is_some() {
        if pass.bomb_pass { return false; }
        if pass.standing_on.is_some_and(|s| s.contains(&(ux, uy))) { return false; }
        return true;
    }
    false
}

/// Drop every standing-set coordinate other than the cell being entered.
pub fn prune_standing(standing: &mut HashSet<(usize, usize)>, entering: (usize, usize)) {
    standing.retain(|c| *c == entering);
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
