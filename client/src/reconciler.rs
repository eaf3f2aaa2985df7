//! Render-side consumer: takes at most one message per frame from the forward
//! lane, folds it into the game state and notifies the renderer.

use crate::channel::{Message, RenderEndpoint};
use crate::error::ClientError;
use crate::model::GameStateModel;
use crate::renderer::Renderer;
use log::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingStart,
    Running,
    Over,
    Failed,
}

/// Outcome of one reconciler step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing was waiting.
    Idle,
    Initialized,
    TurnApplied(u32),
    GameOver,
    /// A non-fatal error was handed to the renderer.
    ErrorShown,
    /// A fatal condition was reported; the render loop should stop.
    Close,
}

pub struct StateReconciler {
    endpoint: RenderEndpoint,
    model: Option<GameStateModel>,
    phase: SessionPhase,
    max_turns: u32,
}

impl StateReconciler {
    pub fn new(endpoint: RenderEndpoint) -> Self {
        Self {
            endpoint,
            model: None,
            phase: SessionPhase::AwaitingStart,
            max_turns: 0,
        }
    }

    /// Takes one message off the forward lane, if any, and applies it.
    pub fn poll<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> Step {
        match self.endpoint.next_message() {
            Some(message) => self.handle(message, renderer),
            None => Step::Idle,
        }
    }

    pub fn handle<R: Renderer + ?Sized>(&mut self, message: Message, renderer: &mut R) -> Step {
        match message {
            Message::GameStarts(starts) => {
                if self.phase != SessionPhase::AwaitingStart {
                    return self.precondition_failed("GAME_STARTS", renderer);
                }
                let starts = *starts;
                let model =
                    GameStateModel::from_initial_state(starts.initial_game_state, starts.players_info);
                self.max_turns = starts.nb_turns_max;

                renderer.on_init(&model, self.max_turns, model.players_info());
                self.model = Some(model);
                self.phase = SessionPhase::Running;
                info!("Game started ({} turns max)", self.max_turns);
                Step::Initialized
            }

            Message::Turn(turn) => {
                let turn = *turn;
                let max_turns = self.max_turns;
                let Some(model) = self.running_model() else {
                    return self.precondition_failed("TURN", renderer);
                };

                model.apply_snapshot(turn.turn_number, turn.game_state, turn.players_info);
                renderer.on_turn(
                    model,
                    turn.turn_number,
                    max_turns,
                    model.explosions(),
                    model.players_info(),
                );
                Step::TurnApplied(turn.turn_number)
            }

            Message::GameEnds(ends) => {
                let ends = *ends;
                let Some(model) = self.running_model() else {
                    return self.precondition_failed("GAME_ENDS", renderer);
                };

                model.apply_final_state(ends.game_state);
                renderer.on_end(model);
                self.phase = SessionPhase::Over;
                info!("Game over, winner: {}", ends.winner_player_id);
                Step::GameOver
            }

            Message::Error(err) => {
                let message = err.to_string();
                if self.model.is_none() {
                    error!("Session failed before the game started: {}", message);
                    renderer.on_error(&message, true);
                    self.phase = SessionPhase::Failed;
                    Step::Close
                } else {
                    warn!("Network side stopped: {}", message);
                    renderer.on_error(&message, false);
                    Step::ErrorShown
                }
            }
        }
    }

    fn running_model(&mut self) -> Option<&mut GameStateModel> {
        match self.phase {
            SessionPhase::Running => self.model.as_mut(),
            _ => None,
        }
    }

    fn precondition_failed<R: Renderer + ?Sized>(&mut self, kind: &str, renderer: &mut R) -> Step {
        let err = ClientError::RenderPrecondition(format!(
            "received {} while the session is {:?}",
            kind, self.phase
        ));
        error!("{}", err);
        renderer.on_error(&err.to_string(), true);
        self.phase = SessionPhase::Failed;
        Step::Close
    }

    /// Asks the network thread to stop.
    pub fn request_termination(&self) -> bool {
        self.endpoint.request_termination()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn model(&self) -> Option<&GameStateModel> {
        self.model.as_ref()
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub fn endpoint_mut(&mut self) -> &mut RenderEndpoint {
        &mut self.endpoint
    }
}
