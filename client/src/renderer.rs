//! The render-side sink the reconciler feeds.

use crate::model::GameStateModel;
use protocol::{Explosions, PlayerInfo};

/// Receives reconciled game states and reports when the user wants to leave.
///
/// Every hook gets the model after the update has been applied. `players_info`
/// is the reconciled roster, so a player that dropped mid-game shows up with
/// `is_connected == false` and an annotated address.
pub trait Renderer {
    fn on_init(&mut self, model: &GameStateModel, max_turns: u32, players_info: &[PlayerInfo]);

    fn on_turn(
        &mut self,
        model: &GameStateModel,
        turn_number: u32,
        max_turns: u32,
        explosions: Option<&Explosions>,
        players_info: &[PlayerInfo],
    );

    fn on_end(&mut self, model: &GameStateModel);

    /// `fatal` errors are followed by the end of the render loop.
    fn on_error(&mut self, message: &str, fatal: bool);

    /// Polled once per frame by the render loop.
    fn request_shutdown(&mut self) -> bool;
}
