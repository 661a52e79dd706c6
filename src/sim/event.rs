/// Events emitted during a simulation step.
/// The presentation layer turns these into status messages.

use crate::domain::entity::ItemKind;
use super::round::{DefeatCause, Effect};

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    BombPlaced { x: usize, y: usize },
    BombDetonated { x: usize, y: usize, power: u32 },
    ChainTriggered { x: usize, y: usize },
    BlockDestroyed { x: usize, y: usize },
    ItemRevealed { x: usize, y: usize, kind: ItemKind },
    ItemDestroyed { x: usize, y: usize, kind: ItemKind },
    ItemPicked { kind: ItemKind },
    EnemyKilled { id: usize, x: usize, y: usize },
    PlayerHit { lives: u32 },
    ShieldAbsorbed,
    EffectExpired(Effect),
    PlayerEjected { x: usize, y: usize },
    PortalOpened,
    Victory { score: u32 },
    Defeat(DefeatCause),
    Retreated,
}
