//! Render-side game state, rebuilt from GAME_STARTS and patched by every
//! following snapshot.
//!
//! The server only ever sends full states. Cells and characters are patched in
//! place so the view keeps stable identities; bombs, explosions, score and cell
//! counts are replaced wholesale. Player connection changes are inferred by
//! comparing the stored roster with the incoming one.

use log::{debug, info, warn};
use protocol::{
    BombState, CharacterState, Coordinates, Explosions, GameSnapshot, PlayerInfo, NEUTRAL_COLOR,
};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub color: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    pub id: i32,
    pub coord: Coordinates,
    pub is_alive: bool,
    pub color: i32,
    pub revive_delay: i32,
}

impl From<CharacterState> for Character {
    fn from(state: CharacterState) -> Self {
        Self {
            id: state.id,
            coord: state.coord(),
            is_alive: state.alive,
            color: state.color,
            revive_delay: state.revive_delay,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bomb {
    pub coord: Coordinates,
    pub color: i32,
    pub range: i32,
    pub delay: i32,
}

impl From<BombState> for Bomb {
    fn from(state: BombState) -> Self {
        Self {
            coord: state.coord(),
            color: state.color,
            range: state.range,
            delay: state.delay,
        }
    }
}

/// What changed in the last applied snapshot beyond plain positions and colours.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transitions {
    /// Players whose connection was lost this turn.
    pub disconnected: Vec<i32>,
    /// Characters that died this turn.
    pub deaths: Vec<i32>,
    /// Characters that came back to life this turn.
    pub revivals: Vec<i32>,
    /// Characters seen for the first time after the game started.
    pub spawned: Vec<i32>,
}

impl Transitions {
    pub fn is_empty(&self) -> bool {
        self.disconnected.is_empty()
            && self.deaths.is_empty()
            && self.revivals.is_empty()
            && self.spawned.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct GameStateModel {
    cells: HashMap<Coordinates, Cell>,
    characters: BTreeMap<i32, Character>,
    bombs: Vec<Bomb>,
    explosions: Option<Explosions>,
    score: BTreeMap<i32, i64>,
    cell_count: BTreeMap<i32, i64>,
    players_info: Vec<PlayerInfo>,
    turn_number: u32,
    neutral_cells: usize,
    transitions: Transitions,
}

impl GameStateModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the model from the initial state carried by GAME_STARTS.
    pub fn from_initial_state(state: GameSnapshot, players_info: Vec<PlayerInfo>) -> Self {
        let cells = state
            .cells
            .into_iter()
            .map(|cell| (cell.coord(), Cell { color: cell.color }))
            .collect();

        let characters = state
            .characters
            .into_iter()
            .map(|character| (character.id, Character::from(character)))
            .collect();

        let mut model = Self {
            cells,
            characters,
            bombs: state.bombs.into_iter().map(Bomb::from).collect(),
            explosions: state.explosions,
            score: state.score,
            cell_count: state.cell_count,
            players_info,
            turn_number: 0,
            neutral_cells: 0,
            transitions: Transitions::default(),
        };
        model.neutral_cells = model.count_neutral_cells();

        info!(
            "Game state initialized: {} cells, {} characters, {} players",
            model.cells.len(),
            model.characters.len(),
            model.players_info.len()
        );
        model
    }

    /// Applies one snapshot on top of the current state.
    ///
    /// An empty `players_info` marks the final update of a game.
    pub fn apply_snapshot(
        &mut self,
        turn_number: u32,
        state: GameSnapshot,
        players_info: Vec<PlayerInfo>,
    ) -> &Transitions {
        let mut transitions = Transitions::default();
        self.turn_number = turn_number;

        let mut unknown_cells = 0;
        for update in state.cells {
            match self.cells.get_mut(&update.coord()) {
                Some(cell) => cell.color = update.color,
                None => unknown_cells += 1,
            }
        }
        if unknown_cells > 0 {
            warn!(
                "Turn {}: ignored {} cells that were not on the initial board",
                turn_number, unknown_cells
            );
        }

        for update in state.characters {
            match self.characters.get_mut(&update.id) {
                Some(character) => {
                    if character.is_alive && !update.alive {
                        transitions.deaths.push(update.id);
                    } else if !character.is_alive && update.alive {
                        transitions.revivals.push(update.id);
                    }
                    character.coord = update.coord();
                    character.is_alive = update.alive;
                    character.color = update.color;
                    character.revive_delay = update.revive_delay;
                }
                None => {
                    transitions.spawned.push(update.id);
                    self.characters.insert(update.id, Character::from(update));
                }
            }
        }

        self.bombs = state.bombs.into_iter().map(Bomb::from).collect();
        self.explosions = state.explosions;
        self.score = state.score;
        self.cell_count = state.cell_count;

        transitions.disconnected =
            reconcile_players(&mut self.players_info, players_info, turn_number);

        self.neutral_cells = self.count_neutral_cells();

        if !transitions.is_empty() {
            debug!("Turn {}: {:?}", turn_number, transitions);
        }
        self.transitions = transitions;
        &self.transitions
    }

    /// Applies the final state of GAME_ENDS. The turn number stays unchanged.
    pub fn apply_final_state(&mut self, state: GameSnapshot) -> &Transitions {
        self.apply_snapshot(self.turn_number, state, Vec::new())
    }

    fn count_neutral_cells(&self) -> usize {
        self.cells
            .values()
            .filter(|cell| cell.color == NEUTRAL_COLOR)
            .count()
    }

    pub fn cells(&self) -> &HashMap<Coordinates, Cell> {
        &self.cells
    }

    pub fn cell(&self, coord: Coordinates) -> Option<&Cell> {
        self.cells.get(&coord)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn character(&self, id: i32) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    pub fn bombs(&self) -> &[Bomb] {
        &self.bombs
    }

    pub fn explosions(&self) -> Option<&Explosions> {
        self.explosions.as_ref()
    }

    pub fn score(&self) -> &BTreeMap<i32, i64> {
        &self.score
    }

    pub fn cell_count(&self) -> &BTreeMap<i32, i64> {
        &self.cell_count
    }

    pub fn players_info(&self) -> &[PlayerInfo] {
        &self.players_info
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    pub fn neutral_cell_count(&self) -> usize {
        self.neutral_cells
    }

    pub fn transitions(&self) -> &Transitions {
        &self.transitions
    }
}

/// Annotation stored as the remote address of a player who dropped mid-game.
pub fn connection_lost_annotation(turn_number: u32) -> String {
    format!("connection lost at turn {}", turn_number)
}

/// Folds the incoming roster into the stored one and returns the ids of
/// players whose connection was lost in this update.
///
/// The roster size tells the cases apart: an empty list ends the game, a list
/// of the same size is compared position by position, anything else replaces
/// the stored list.
pub fn reconcile_players(
    current: &mut Vec<PlayerInfo>,
    incoming: Vec<PlayerInfo>,
    turn_number: u32,
) -> Vec<i32> {
    let mut disconnected = Vec::new();

    if incoming.is_empty() {
        for player in current.iter_mut().filter(|p| !p.is_connected) {
            player.remote_address.clear();
        }
    } else if incoming.len() == current.len() {
        for (stored, update) in current.iter_mut().zip(incoming) {
            if stored.is_connected && !update.is_connected {
                info!(
                    "Player {} ({}) lost connection at turn {}",
                    stored.player_id, stored.nickname, turn_number
                );
                stored.is_connected = false;
                stored.remote_address = connection_lost_annotation(turn_number);
                disconnected.push(stored.player_id);
            }
        }
    } else {
        *current = incoming;
    }

    disconnected
}
