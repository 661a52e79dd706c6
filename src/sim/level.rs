/// Level entity generation: level text → grid + entities.
///
/// ## Tile legend:
///   'S' = Solid (indestructible)     'B' = Breakable block
///   '.' = Empty (space also works)   'I' = Item on the ground
///   'O' = Portal                     'P' = Player spawn
///   'E' = Enemy spawn
///
/// Spawn markers become empty floor. Every breakable block independently
/// rolls the difficulty's drop rate to hide a power-up. Exactly one KEY
/// exists after generation: once a roll produces it, KEY leaves the candidate
/// list; if no roll produced it, one block is given the KEY afterwards.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::config::DifficultyConfig;
use crate::domain::entity::{Block, Enemy, Item, ItemKind, Portal};
use crate::domain::grid::Grid;
use crate::domain::tile::Tile;

/// Level text plus a display name.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
}

impl LevelDef {
    pub fn from_rows(name: &str, rows: &[&str]) -> Self {
        LevelDef {
            name: name.to_string(),
            rows: rows.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Malformed level content. Raised at generation time, never mid-round.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LevelError {
    #[error("level has no rows")]
    Empty,
    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedRow { row: usize, expected: usize, found: usize },
    #[error("unknown tile code {code:?} at ({x}, {y})")]
    UnknownTile { code: char, x: usize, y: usize },
    #[error("level has no player marker 'P'")]
    MissingPlayer,
    #[error("second player marker at ({x}, {y})")]
    DuplicatePlayer { x: usize, y: usize },
    #[error("level has no portal 'O'")]
    MissingPortal,
    #[error("second portal at ({x}, {y})")]
    DuplicatePortal { x: usize, y: usize },
    #[error("no breakable block to hold the key")]
    NoKeyHost,
}

/// Everything a round needs from its level.
#[derive(Debug)]
pub struct Population {
    pub grid: Grid,
    pub player_spawn: (usize, usize),
    pub enemies: Vec<Enemy>,
    pub blocks: Vec<Block>,
    pub items: Vec<Item>,
    pub portal: Portal,
}

// ══════════════════════════════════════════════════════════════
// Generation
// ══════════════════════════════════════════════════════════════

/// Scan the level once and instantiate its entities.
pub fn generate<R: Rng + ?Sized>(
    def: &LevelDef,
    cfg: &DifficultyConfig,
    rng: &mut R,
) -> Result<Population, LevelError> {
    let height = def.rows.len();
    if height == 0 { return Err(LevelError::Empty); }
    let width = def.rows[0].chars().count();
    if width == 0 { return Err(LevelError::Empty); }

    // Local roll table: removing KEY here never leaks into another generation.
    let mut candidates: Vec<ItemKind> = ItemKind::ALL.to_vec();
    let ground_kinds: Vec<ItemKind> = ItemKind::ALL.iter().copied().filter(|k| *k != ItemKind::Key).collect();
    let mut key_rolled = false;

    let mut tiles = vec![vec![Tile::Empty; width]; height];
    let mut player_spawn = None;
    let mut portal = None;
    let mut enemies = vec![];
    let mut blocks: Vec<Block> = vec![];
    let mut items = vec![];

    for (y, row) in def.rows.iter().enumerate() {
        let found = row.chars().count();
        if found != width {
            return Err(LevelError::RaggedRow { row: y, expected: width, found });
        }
        for (x, ch) in row.chars().enumerate() {
            match ch {
                'P' => {
                    if player_spawn.is_some() { return Err(LevelError::DuplicatePlayer { x, y }); }
                    player_spawn = Some((x, y));
                }
                'E' => {
                    enemies.push(Enemy::new(enemies.len(), x, y, cfg.enemy_speed, cfg.enemy_ai));
                }
                'O' => {
                    if portal.is_some() { return Err(LevelError::DuplicatePortal { x, y }); }
                    portal = Some(Portal::new(x, y));
                    tiles[y][x] = Tile::Portal;
                }
                'B' => {
                    let mut hidden = None;
                    if rng.gen::<f64>() < cfg.powerup_drop_rate {
                        if let Some(&kind) = candidates.choose(rng) {
                            if kind == ItemKind::Key {
                                key_rolled = true;
                                candidates.retain(|k| *k != ItemKind::Key);
                            }
                            hidden = Some(kind);
                        }
                    }
                    blocks.push(Block::new(x, y, hidden));
                    tiles[y][x] = Tile::Breakable;
                }
                'I' => {
                    if let Some(&kind) = ground_kinds.choose(rng) {
                        items.push(Item::new(x, y, kind));
                    }
                    tiles[y][x] = Tile::Item;
                }
                _ => match Tile::from_code(ch) {
                    Some(t) => tiles[y][x] = t,
                    None => return Err(LevelError::UnknownTile { code: ch, x, y }),
                },
            }
        }
    }

    let player_spawn = player_spawn.ok_or(LevelError::MissingPlayer)?;
    let portal = portal.ok_or(LevelError::MissingPortal)?;

    if !key_rolled {
        place_fallback_key(&mut blocks, rng)?;
    }

    debug!(
        "generated {:?}: {}x{}, {} enemies, {} blocks, {} ground items",
        def.name, width, height, enemies.len(), blocks.len(), items.len()
    );

    Ok(Population {
        grid: Grid::new(tiles),
        player_spawn,
        enemies,
        blocks,
        items,
        portal,
    })
}

/// Give the KEY to a random empty-handed block, or any block if all carry
/// something.
fn place_fallback_key<R: Rng + ?Sized>(blocks: &mut [Block], rng: &mut R) -> Result<(), LevelError> {
    let empty: Vec<usize> = (0..blocks.len()).filter(|&i| blocks[i].hidden.is_none()).collect();
    let pick = match empty.choose(rng) {
        Some(&i) => i,
        None => {
            if blocks.is_empty() { return Err(LevelError::NoKeyHost); }
            rng.gen_range(0..blocks.len())
        }
    };
    let b = &mut blocks[pick];
    debug!("key assigned to block at ({}, {})", b.body.x, b.body.y);
    b.hidden = Some(ItemKind::Key);
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Built-in levels (shared by every difficulty)
// ══════════════════════════════════════════════════════════════

pub fn embedded_levels() -> Vec<LevelDef> {
    vec![
        LevelDef::from_rows("Brickyard", &[
            "SSSSSSSSSSSSSSSSSSSS",
            "SBBBIBBBBIIBBBBIBBBS",
            "SB S B S B S B S B S",
            "SBBBI BBBI BBI BBB S",
            "SB S B S B S B S B S",
            "SBBB PBBB BBBBBIBBBS",
            "SB S B S B S B S B S",
            "SBBBI BBB EBBBIBBB S",
            "SB S B S B S B S B S",
            "SBBBIBBBBIBBBBIBBBBS",
            "SB S B S B S B S B S",
            "SBBBI BBBI BBI BBB S",
            "SB S B S B S B S B S",
            "SBBBIBBBBI O BBBBB S",
            "SSSSSSSSSSSSSSSSSSSS",
        ]),
        LevelDef::from_rows("Open Court", &[
            "SSSSSSSSSSSSSSSSSSS",
            "S.B...E...B....I..S",
            "S.S.B.S.B.S.B.S.B.S",
            "S...B....I....B...S",
            "S.B.S.B.S.B.S.B.S.S",
            "S.P.B.B...E....B..S",
            "S.B.S.B.S.B.S.B.S.S",
            "S..I...B..O....E..S",
            "S.S.B.S.B.S.B.S.B.S",
            "S...B....B.....I..S",
            "S.S.B.S.B.S.B.S.B.S",
            "S..E....B....B....S",
            "S.B.S.B.S.B.S.B.S.S",
            "S....I...E....B...S",
            "SSSSSSSSSSSSSSSSSSS",
        ]),
        LevelDef::from_rows("Crossfire", &[
            "SSSSSSSSSSSSSSSSSSS",
            "S.I....B....E..B..S",
            "S.S.B.S.B.S.B.S.B.S",
            "S..B..E..B.....E..S",
            "S.B.S.B.S.B.S.B.S.S",
            "S.B.B.P.B.B....B..S",
            "S.B.S.B.S.B.S.B.S.S",
            "S..E....I..O....E.S",
            "S.S.B.S.B.S.B.S.B.S",
            "S..B...E....B.....S",
            "S.B.S.B.S.B.S.B.S.S",
            "S....B....E....I..S",
            "S.B.S.B.S.B.S.B.S.S",
            "S..E.....B....B...S",
            "SSSSSSSSSSSSSSSSSSS",
        ]),
        LevelDef::from_rows("Patrol Lines", &[
            "SSSSSSSSSSSSSSSSSSS",
            "S.B...I...B....E..S",
            "S.S.B.S.B.S.B.S.B.S",
            "S.E..B....E....B..S",
            "S.B.S.B.S.B.S.B.S.S",
            "S...B.P.B...E.....S",
            "S.B.S.B.S.B.S.B.S.S",
            "S.I....B..O....E..S",
            "S.S.B.S.B.S.B.S.B.S",
            "S..E....B....E....S",
            "S.B.S.B.S.B.S.B.S.S",
            "S..B....E....B....S",
            "S.B.S.B.S.B.S.B.S.S",
            "S....B....E....B..S",
            "SSSSSSSSSSSSSSSSSSS",
        ]),
        LevelDef::from_rows("Swarm", &[
            "SSSSSSSSSSSSSSSSSSS",
            "S.P..B..I..E....B.S",
            "S.S.B.S.B.S.B.S.B.S",
            "S..E..B..E..B..E..S",
            "S.B.S.B.S.B.S.B.S.S",
            "S.B...B...B....E..S",
            "S.B.S.B.S.B.S.B.S.S",
            "S..I....B..O....E.S",
            "S.S.B.S.B.S.B.S.B.S",
            "S..E....B.....E...S",
            "S.B.S.B.S.B.S.B.S.S",
            "S....B....E....B..S",
            "S.B.S.B.S.B.S.B.S.S",
            "S..E....B...E.B...S",
            "SSSSSSSSSSSSSSSSSSS",
        ]),
    ]
}
