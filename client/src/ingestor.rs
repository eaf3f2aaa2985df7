//! Network-side producer.
//!
//! Drives a [`GameServerConnection`] through login, waits for the game to
//! start, then loops on bounded-timeout receives until the game ends, the
//! server kicks us, the transport fails or the renderer asks us to stop.
//!
//! Every TURN is acknowledged whether or not the renderer had room for it, so
//! a slow renderer never holds the server back. Any failure is published once
//! on the forward lane before the thread exits.

use crate::channel::{Message, NetworkEndpoint};
use crate::connection::GameServerConnection;
use crate::error::ClientError;
use log::{debug, error, info};
use protocol::{decode, GameStarts, ServerMessage, Turn, DEFAULT_PORT, ROLE_VISUALIZATION};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Default poll interval of the receive loop; also the shutdown latency bound.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(50);

/// Games may wait a long time for their players before starting.
pub const DEFAULT_GAME_START_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct IngestorConfig {
    pub host: String,
    pub port: u16,
    pub nickname: String,
    pub receive_timeout: Duration,
    pub game_start_timeout: Duration,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            nickname: "rust-visu".to_string(),
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            game_start_timeout: DEFAULT_GAME_START_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// GAME_ENDS was received and forwarded.
    GameEnded,
    /// The renderer asked us to stop.
    Cancelled,
    /// The session failed; the error was published on the forward lane.
    Failed(String),
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        !matches!(self, Outcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestorState {
    Connecting,
    LoggingIn,
    AwaitingGameStart,
    InTurnLoop,
    AwaitingGameEnd,
    Terminated(Outcome),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestorStats {
    pub turns_received: u32,
    pub turns_forwarded: u32,
    pub turns_dropped: u32,
    pub acks_sent: u32,
}

/// What the network thread hands back when it is done.
#[derive(Debug)]
pub struct IngestorExit {
    pub outcome: Outcome,
    pub stats: IngestorStats,
    /// Returned so the owner can drain the lanes after joining.
    pub endpoint: NetworkEndpoint,
}

pub struct TurnIngestor<C> {
    connection: C,
    endpoint: NetworkEndpoint,
    config: IngestorConfig,
    state: IngestorState,
    stats: IngestorStats,
    nb_turns_max: u32,
}

impl<C: GameServerConnection> TurnIngestor<C> {
    pub fn new(connection: C, endpoint: NetworkEndpoint, config: IngestorConfig) -> Self {
        Self {
            connection,
            endpoint,
            config,
            state: IngestorState::Connecting,
            stats: IngestorStats::default(),
            nb_turns_max: 0,
        }
    }

    /// Runs the session to completion on the calling thread.
    pub fn run(mut self) -> IngestorExit {
        let outcome = match self.drive() {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Network failure: {}", err);
                let reason = err.to_string();
                self.connection.close();
                self.endpoint.publish(Message::Error(err));
                Outcome::Failed(reason)
            }
        };

        self.transition(IngestorState::Terminated(outcome.clone()));
        info!(
            "Network thread done: {} turns received, {} forwarded, {} dropped",
            self.stats.turns_received, self.stats.turns_forwarded, self.stats.turns_dropped
        );

        IngestorExit {
            outcome,
            stats: self.stats,
            endpoint: self.endpoint,
        }
    }

    fn drive(&mut self) -> Result<Outcome, ClientError> {
        info!(
            "Connecting to netorcai at {}:{}...",
            self.config.host, self.config.port
        );
        self.connection
            .connect(&self.config.host, self.config.port)?;

        self.transition(IngestorState::LoggingIn);
        info!("Logging in as '{}'...", self.config.nickname);
        self.connection
            .login(&self.config.nickname, ROLE_VISUALIZATION)?;

        self.transition(IngestorState::AwaitingGameStart);
        info!("Waiting for GAME_STARTS...");
        let Some(starts) = self.await_game_start()? else {
            return Ok(self.cancel());
        };

        self.nb_turns_max = starts.nb_turns_max;
        info!(
            "Game starts: {} players, {} turns max",
            starts.nb_players, starts.nb_turns_max
        );
        self.endpoint.publish(Message::GameStarts(Box::new(starts)));

        self.transition(IngestorState::InTurnLoop);
        self.turn_loop()
    }

    /// Returns `None` when termination was requested before the game started.
    fn await_game_start(&mut self) -> Result<Option<GameStarts>, ClientError> {
        let deadline = Instant::now() + self.config.game_start_timeout;

        loop {
            if let Some(frame) = self.connection.receive_frame(self.config.receive_timeout)? {
                return match decode(&frame)? {
                    ServerMessage::GameStarts(starts) => Ok(Some(starts)),
                    ServerMessage::Kick(kick) => Err(ClientError::Rejected {
                        reason: kick.kick_reason,
                    }),
                    other => Err(ClientError::UnexpectedMessage {
                        received: other.kind(),
                        expected: "waiting for GAME_STARTS",
                    }),
                };
            }

            if self.endpoint.termination_requested() {
                return Ok(None);
            }

            if Instant::now() >= deadline {
                return Err(ClientError::timed_out(format!(
                    "no GAME_STARTS within {:?}",
                    self.config.game_start_timeout
                )));
            }
        }
    }

    fn turn_loop(&mut self) -> Result<Outcome, ClientError> {
        loop {
            if let Some(frame) = self.connection.receive_frame(self.config.receive_timeout)? {
                match decode(&frame)? {
                    ServerMessage::Turn(turn) => self.handle_turn(turn)?,
                    ServerMessage::GameEnds(ends) => {
                        info!("Game ends, winner: {}", ends.winner_player_id);
                        self.endpoint.publish(Message::GameEnds(Box::new(ends)));
                        self.connection.close();
                        return Ok(Outcome::GameEnded);
                    }
                    ServerMessage::Kick(kick) => {
                        return Err(ClientError::Rejected {
                            reason: kick.kick_reason,
                        })
                    }
                    other => {
                        return Err(ClientError::UnexpectedMessage {
                            received: other.kind(),
                            expected: "waiting for TURN",
                        })
                    }
                }
            }

            if self.endpoint.termination_requested() {
                return Ok(self.cancel());
            }
        }
    }

    fn handle_turn(&mut self, turn: Turn) -> Result<(), ClientError> {
        let turn_number = turn.turn_number;
        self.stats.turns_received += 1;

        if self.endpoint.publish_turn(Box::new(turn)) {
            self.stats.turns_forwarded += 1;
        } else {
            self.stats.turns_dropped += 1;
        }

        self.connection
            .send_turn_ack(turn_number, Value::Array(Vec::new()))?;
        self.stats.acks_sent += 1;
        debug!("Acknowledged turn {}", turn_number);

        if self.state == IngestorState::InTurnLoop
            && turn_number.saturating_add(1) >= self.nb_turns_max
        {
            self.transition(IngestorState::AwaitingGameEnd);
            info!("Last turn acknowledged, waiting for GAME_ENDS...");
        }
        Ok(())
    }

    fn cancel(&mut self) -> Outcome {
        info!("Termination requested by the renderer");
        self.connection.close();
        Outcome::Cancelled
    }

    fn transition(&mut self, next: IngestorState) {
        debug!("Ingestor: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
