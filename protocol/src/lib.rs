//! # hexabomb / netorcai wire protocol
//!
//! Types shared by everything that talks to a netorcai server about a
//! hexabomb game:
//!
//! - [`framing`]: the length-prefixed frame format and an incremental frame
//!   extractor that survives partial reads.
//! - [`message`]: the metaprotocol messages a visualization sends and
//!   receives, and [`decode`] to turn a raw frame into one of them.
//! - [`state`]: the hexabomb game-state payload (cells, characters, bombs,
//!   explosions, score, cell counts).

pub mod error;
pub mod framing;
pub mod message;
pub mod state;

pub use error::DecodeError;
pub use framing::RawFrame;
pub use message::{
    decode, ClientMessage, GameEnds, GameStarts, Kick, LoginAck, PlayerInfo, ServerMessage, Turn,
};
pub use state::{
    BombState, CellState, CharacterState, Coordinates, Explosions, GameSnapshot, NEUTRAL_COLOR,
};

/// netorcai's default listening port.
pub const DEFAULT_PORT: u16 = 4242;

/// Metaprotocol version announced in LOGIN.
pub const METAPROTOCOL_VERSION: &str = "2.0.0";

/// Role a spectator logs in with.
pub const ROLE_VISUALIZATION: &str = "visualization";
