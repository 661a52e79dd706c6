/// Enemy AI: BFS pathfinding plus a free-roam fallback.
///
/// Two modes, chosen on every idle tick:
///   1. **Chase**: shortest path to the player's cell, take its first step.
///   2. **Roam**: no path, or already on the player's cell: keep the last
///      roam direction if it is still open, else try the four directions in
///      shuffled order.
///
/// Paths are never cached. Enemies have no pass-through exceptions, so every
/// query runs with `Passage::NONE`.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;

use super::entity::{Bomb, MoveDir};
use super::grid::Grid;
use super::rules::{is_blocked, Passage};

/// What an idle enemy does this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Decision {
    /// Follow the path: step onto this cell.
    Chase((usize, usize)),
    /// No usable path: roam in this direction.
    Roam(MoveDir),
    /// No path and all four sides blocked.
    Boxed,
}

// ── Chase mode ──

/// Shortest 4-connected route from `start` to `goal`, excluding `start`.
///
/// `Some(vec![])` when start == goal, `None` when the goal is unreachable.
/// Expansion order is `MoveDir::ALL`; the first route to reach the goal wins.
/// The goal itself is tested with the same blocking rule as any other cell.
pub fn find_path(
    grid: &Grid,
    bombs: &[Bomb],
    start: (usize, usize),
    goal: (usize, usize),
) -> Option<Vec<(usize, usize)>> {
    debug_assert!(
        start.0 < grid.width() && start.1 < grid.height(),
        "pathfinder start {:?} outside {}x{} grid", start, grid.width(), grid.height()
    );
    if start == goal { return Some(vec![]); }

    let (w, h) = (grid.width(), grid.height());
    let mut parent: Vec<Vec<Option<(usize, usize)>>> = vec![vec![None; w]; h];
    let mut visited = vec![vec![false; w]; h];
    visited[start.1][start.0] = true;

    let mut queue: VecDeque<(usize, usize)> = VecDeque::with_capacity(w * h);
    queue.push_back(start);

    while let Some((cx, cy)) = queue.pop_front() {
        for dir in MoveDir::ALL {
            let (dx, dy) = dir.delta();
            let (nx, ny) = (cx as i32 + dx, cy as i32 + dy);
            if is_blocked(grid, bombs, nx, ny, &Passage::NONE) { continue; }
            let (nx, ny) = (nx as usize, ny as usize);
            if visited[ny][nx] { continue; }
            visited[ny][nx] = true;
            parent[ny][nx] = Some((cx, cy));
            if (nx, ny) == goal {
                return Some(walk_back(&parent, start, goal));
            }
            queue.push_back((nx, ny));
        }
    }
    None
}

fn walk_back(
    parent: &[Vec<Option<(usize, usize)>>],
    start: (usize, usize),
    goal: (usize, usize),
) -> Vec<(usize, usize)> {
    let mut path = vec![goal];
    let mut cur = goal;
    while let Some(prev) = parent[cur.1][cur.0] {
        if prev == start { break; }
        path.push(prev);
        cur = prev;
    }
    path.reverse();
    path
}

// ── Roam mode ──

/// Direction for a free-roam step, or None if boxed in on all four sides.
pub fn roam_direction<R: Rng + ?Sized>(
    grid: &Grid,
    bombs: &[Bomb],
    at: (usize, usize),
    last_dir: Option<MoveDir>,
    rng: &mut R,
) -> Option<MoveDir> {
    let open = |dir: MoveDir| {
        let (dx, dy) = dir.delta();
        !is_blocked(grid, bombs, at.0 as i32 + dx, at.1 as i32 + dy, &Passage::NONE)
    };

    if let Some(dir) = last_dir {
        if open(dir) { return Some(dir); }
    }
    let mut dirs = MoveDir::ALL;
    dirs.shuffle(rng);
    dirs.into_iter().find(|&d| open(d))
}

/// One idle-tick decision. Returns the decision and the freshly computed
/// path (empty when roaming). An empty path counts as no path.
pub fn decide<R: Rng + ?Sized>(
    grid: &Grid,
    bombs: &[Bomb],
    at: (usize, usize),
    player: (usize, usize),
    last_dir: Option<MoveDir>,
    rng: &mut R,
) -> (Decision, Vec<(usize, usize)>) {
    if let Some(mut path) = find_path(grid, bombs, at, player) {
        if !path.is_empty() {
            let next = path.remove(0);
            return (Decision::Chase(next), path);
        }
    }
    match roam_direction(grid, bombs, at, last_dir, rng) {
        Some(dir) => (Decision::Roam(dir), vec![]),
        None => (Decision::Boxed, vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Owner;
    use crate::domain::tile::Tile;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn map_from(rows: &[&str]) -> Grid {
        Grid::new(
            rows.iter()
                .map(|r| r.chars().map(|c| Tile::from_code(c).unwrap_or(Tile::Empty)).collect())
                .collect(),
        )
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn straight_corridor() {
        let g = map_from(&["SSSSSS", "S....S", "SSSSSS"]);
        let p = find_path(&g, &[], (1, 1), (4, 1));
        assert_eq!(p, Some(vec![(2, 1), (3, 1), (4, 1)]));
    }

    #[test]
    fn path_is_shortest_around_wall() {
        let g = map_from(&[
            ".....",
            ".SSS.",
            ".....",
        ]);
        let p = find_path(&g, &[], (0, 1), (4, 1)).unwrap();
        assert_eq!(p.len(), 6);
        assert_eq!(p.last(), Some(&(4, 1)));
        // Up is expanded before Down.
        assert_eq!(p[0], (0, 0));
    }

    #[test]
    fn same_cell_roams_off_the_player() {
        let g = map_from(&["..."]);
        assert_eq!(find_path(&g, &[], (1, 0), (1, 0)), Some(vec![]));
        let (d, path) = decide(&g, &[], (1, 0), (1, 0), None, &mut rng());
        assert!(matches!(d, Decision::Roam(MoveDir::Left | MoveDir::Right)));
        assert!(path.is_empty());

        let g = map_from(&["SSS", "S.S", "SSS"]);
        let (d, _) = decide(&g, &[], (1, 1), (1, 1), None, &mut rng());
        assert_eq!(d, Decision::Boxed);
    }

    #[test]
    fn breakable_and_bombs_block_enemies() {
        let g = map_from(&["S.B.S"]);
        assert_eq!(find_path(&g, &[], (1, 0), (3, 0)), None);

        let g = map_from(&["S...S"]);
        let bombs = vec![Bomb::new(2, 0, Owner::Player, 1, 2000)];
        assert_eq!(find_path(&g, &bombs, (1, 0), (3, 0)), None);
    }

    #[test]
    fn sealed_player_falls_back_to_roam() {
        let g = map_from(&[
            ".....",
            "..SSS",
            "..S.S",
            "..SSS",
        ]);
        let (d, path) = decide(&g, &[], (0, 0), (3, 2), None, &mut rng());
        assert!(matches!(d, Decision::Roam(_)));
        assert!(path.is_empty());
    }

    #[test]
    fn roam_keeps_last_direction_when_open() {
        let g = map_from(&["....."]);
        for seed in 0..20 {
            let mut r = ChaCha8Rng::seed_from_u64(seed);
            assert_eq!(roam_direction(&g, &[], (2, 0), Some(MoveDir::Left), &mut r), Some(MoveDir::Left));
        }
    }

    #[test]
    fn roam_picks_the_only_open_side() {
        let g = map_from(&["SSS", "S..", "SSS"]);
        let d = roam_direction(&g, &[], (1, 1), Some(MoveDir::Up), &mut rng());
        assert_eq!(d, Some(MoveDir::Right));
    }

    #[test]
    fn boxed_in_enemy_stays() {
        let g = map_from(&["SSS", "S.S", "SSS"]);
        assert_eq!(roam_direction(&g, &[], (1, 1), None, &mut rng()), None);
        let (d, _) = decide(&g, &[], (1, 1), (0, 0), None, &mut rng());
        assert_eq!(d, Decision::Boxed);
    }
}
