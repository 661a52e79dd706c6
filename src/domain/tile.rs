/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Empty,
    Solid,     // Indestructible, stops blasts
    Breakable, // Destructible block, may hide an item
    Item,      // Item lying on the ground
    Portal,    // Level exit
}

impl Tile {
    /// Decode a static tile code. Spawn markers are not tiles and return None.
    pub fn from_code(code: char) -> Option<Tile> {
        match code {
            'S' => Some(Tile::Solid),
            'B' => Some(Tile::Breakable),
            '.' | ' ' => Some(Tile::Empty),
            'I' => Some(Tile::Item),
            'O' => Some(Tile::Portal),
            _ => None,
        }
    }

    /// Single-character code, as used in level text.
    pub fn code(self) -> char {
        match self {
            Tile::Empty => '.',
            Tile::Solid => 'S',
            Tile::Breakable => 'B',
            Tile::Item => 'I',
            Tile::Portal => 'O',
        }
    }

    /// Nothing ever walks or blasts through this tile.
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Solid)
    }

    /// Can this tile be destroyed by an explosion?
    pub fn is_breakable(self) -> bool {
        matches!(self, Tile::Breakable)
    }

    /// Can a bomb be placed on this tile?
    pub fn accepts_bomb(self) -> bool {
        matches!(self, Tile::Empty | Tile::Item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_decode() {
        assert_eq!(Tile::from_code('S'), Some(Tile::Solid));
        assert_eq!(Tile::from_code('B'), Some(Tile::Breakable));
        assert_eq!(Tile::from_code(' '), Some(Tile::Empty));
        assert_eq!(Tile::from_code('O'), Some(Tile::Portal));
        assert_eq!(Tile::from_code('P'), None);
        assert_eq!(Tile::from_code('E'), None);
    }

    #[test]
    fn bombs_only_on_floor() {
        assert!(Tile::Empty.accepts_bomb());
        assert!(Tile::Item.accepts_bomb());
        assert!(!Tile::Portal.accepts_bomb());
        assert!(!Tile::Breakable.accepts_bomb());
    }
}
