//! netorcai metaprotocol messages seen by a visualization client.

use crate::error::DecodeError;
use crate::framing::{encode_frame, RawFrame};
use crate::state::GameSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;

/// Identity and connection status of one player, as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: i32,
    pub nickname: String,
    #[serde(default)]
    pub remote_address: String,
    pub is_connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginAck {
    #[serde(default)]
    pub metaprotocol_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStarts {
    /// Always -1 for visualizations.
    #[serde(default = "no_player_id")]
    pub player_id: i32,
    #[serde(default)]
    pub players_info: Vec<PlayerInfo>,
    #[serde(default)]
    pub nb_players: u32,
    #[serde(default)]
    pub nb_special_players: u32,
    pub nb_turns_max: u32,
    #[serde(default)]
    pub milliseconds_before_first_turn: f64,
    #[serde(default)]
    pub milliseconds_between_turns: f64,
    pub initial_game_state: GameSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub turn_number: u32,
    pub game_state: GameSnapshot,
    #[serde(default)]
    pub players_info: Vec<PlayerInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEnds {
    #[serde(default = "no_player_id")]
    pub winner_player_id: i32,
    pub game_state: GameSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kick {
    pub kick_reason: String,
}

fn no_player_id() -> i32 {
    -1
}

/// A decoded server-to-client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    LoginAck(LoginAck),
    GameStarts(GameStarts),
    Turn(Turn),
    GameEnds(GameEnds),
    Kick(Kick),
}

impl ServerMessage {
    /// The `message_type` tag this message travels under.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::LoginAck(_) => "LOGIN_ACK",
            ServerMessage::GameStarts(_) => "GAME_STARTS",
            ServerMessage::Turn(_) => "TURN",
            ServerMessage::GameEnds(_) => "GAME_ENDS",
            ServerMessage::Kick(_) => "KICK",
        }
    }
}

/// Decodes one frame received from the server.
pub fn decode(frame: &RawFrame) -> Result<ServerMessage, DecodeError> {
    let text = std::str::from_utf8(frame.as_bytes())?;
    let mut value: Value = serde_json::from_str(text)?;

    let kind = match value
        .as_object_mut()
        .and_then(|object| object.remove("message_type"))
    {
        Some(Value::String(kind)) => kind,
        _ => return Err(DecodeError::MissingMessageType),
    };

    let message = match kind.as_str() {
        "LOGIN_ACK" => ServerMessage::LoginAck(serde_json::from_value(value)?),
        "GAME_STARTS" => ServerMessage::GameStarts(serde_json::from_value(value)?),
        "TURN" => ServerMessage::Turn(serde_json::from_value(value)?),
        "GAME_ENDS" => ServerMessage::GameEnds(serde_json::from_value(value)?),
        "KICK" => ServerMessage::Kick(serde_json::from_value(value)?),
        _ => return Err(DecodeError::UnknownMessageType(kind)),
    };

    Ok(message)
}

/// Messages a visualization client sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Login {
        nickname: String,
        role: String,
        metaprotocol_version: String,
    },
    TurnAck {
        turn_number: u32,
        actions: Value,
    },
}

impl ClientMessage {
    /// Serializes the message and wraps it into a wire frame.
    pub fn to_frame(&self) -> io::Result<Vec<u8>> {
        let json = serde_json::to_vec(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        encode_frame(&json)
    }
}
