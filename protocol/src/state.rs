//! hexabomb game-state payloads as they appear inside GAME_STARTS, TURN and
//! GAME_ENDS messages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Colour of a cell nobody owns.
pub const NEUTRAL_COLOR: i32 = 0;

/// Axial address of a hexagonal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinates {
    pub q: i32,
    pub r: i32,
}

impl Coordinates {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    pub q: i32,
    pub r: i32,
    pub color: i32,
}

impl CellState {
    pub fn coord(&self) -> Coordinates {
        Coordinates::new(self.q, self.r)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    pub id: i32,
    pub color: i32,
    pub q: i32,
    pub r: i32,
    pub alive: bool,
    /// Turns left before a dead character comes back, -1 while alive.
    #[serde(default = "alive_revive_delay")]
    pub revive_delay: i32,
}

impl CharacterState {
    pub fn coord(&self) -> Coordinates {
        Coordinates::new(self.q, self.r)
    }
}

fn alive_revive_delay() -> i32 {
    -1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BombState {
    pub q: i32,
    pub r: i32,
    #[serde(default)]
    pub color: i32,
    #[serde(default)]
    pub range: i32,
    #[serde(default)]
    pub delay: i32,
}

impl BombState {
    pub fn coord(&self) -> Coordinates {
        Coordinates::new(self.q, self.r)
    }
}

/// Cells hit this turn, grouped by the colour of the bomb that caused them.
pub type Explosions = BTreeMap<i32, Vec<Coordinates>>;

/// One full game state as sent by the server. Every collection is optional on
/// the wire; the initial state usually has no score and no explosions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    #[serde(default)]
    pub cells: Vec<CellState>,
    #[serde(default)]
    pub characters: Vec<CharacterState>,
    #[serde(default)]
    pub bombs: Vec<BombState>,
    #[serde(default)]
    pub score: BTreeMap<i32, i64>,
    #[serde(default)]
    pub cell_count: BTreeMap<i32, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explosions: Option<Explosions>,
}
