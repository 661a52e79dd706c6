/// The mutable tile matrix.
///
/// Row-major, origin top-left, addressed as (column x, row y).
/// The grid is the single source of truth for static occupancy. Bombs and
/// actors are overlaid by the round and never written into it.

use super::entity::MoveDir;
use super::tile::Tile;

/// Pixel edge of one tile, used by the movement interpolator.
pub const TILE_SIZE: f32 = 32.0;

#[derive(Clone, Debug)]
pub struct Grid {
    tiles: Vec<Vec<Tile>>,
    width: usize,
    height: usize,
}

impl Grid {
    /// Build a grid from rectangular rows. Level generation validates shape.
    pub fn new(tiles: Vec<Vec<Tile>>) -> Self {
        let height = tiles.len();
        let width = tiles.first().map_or(0, |r| r.len());
        debug_assert!(tiles.iter().all(|r| r.len() == width), "ragged grid");
        Grid { tiles, width, height }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rows(&self) -> &[Vec<Tile>] {
        &self.tiles
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Tile at (x, y). Out of bounds reads as Solid.
    #[inline]
    pub fn tile_at(&self, x: usize, y: usize) -> Tile {
        if x < self.width && y < self.height {
            self.tiles[y][x]
        } else {
            Tile::Solid
        }
    }

    /// Signed lookup for ray walks and neighbour probes.
    #[inline]
    pub fn tile_at_i(&self, x: i32, y: i32) -> Tile {
        if self.in_bounds(x, y) {
            self.tiles[y as usize][x as usize]
        } else {
            Tile::Solid
        }
    }

    #[inline]
    pub fn set_tile(&mut self, x: usize, y: usize, tile: Tile) {
        if x < self.width && y < self.height {
            self.tiles[y][x] = tile;
        }
    }

    /// Neighbouring cell in `dir`, if it lies on the grid.
    pub fn neighbor(&self, x: usize, y: usize, dir: MoveDir) -> Option<(usize, usize)> {
        let (dx, dy) = dir.delta();
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if self.in_bounds(nx, ny) {
            Some((nx as usize, ny as usize))
        } else {
            None
        }
    }

    /// Position of every cell holding `tile`, in scan order.
    pub fn cells_of(&self, tile: Tile) -> Vec<(usize, usize)> {
        let mut out = vec![];
        for (y, row) in self.tiles.iter().enumerate() {
            for (x, t) in row.iter().enumerate() {
                if *t == tile {
                    out.push((x, y));
                }
            }
        }
        out
    }
}
