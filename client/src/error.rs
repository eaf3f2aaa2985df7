use protocol::DecodeError;
use std::io;
use thiserror::Error;

/// Everything that can end a spectating session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure: refused connection, reset, closed stream, timeout.
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    /// The server sent something we could not decode or did not expect.
    #[error("protocol error: {0}")]
    Protocol(#[from] DecodeError),

    #[error("unexpected {received} message while {expected}")]
    UnexpectedMessage {
        received: &'static str,
        expected: &'static str,
    },

    /// Login refused or session kicked by the server.
    #[error("rejected by server: {reason}")]
    Rejected { reason: String },

    /// The network thread died without reporting anything.
    #[error("network thread stopped unexpectedly")]
    NetworkStopped,

    /// The render side got a message the session phase does not allow.
    #[error("render precondition violated: {0}")]
    RenderPrecondition(String),
}

impl ClientError {
    pub fn timed_out(what: impl Into<String>) -> Self {
        ClientError::Connection(io::Error::new(io::ErrorKind::TimedOut, what.into()))
    }

    pub fn closed() -> Self {
        ClientError::Connection(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "server closed the connection",
        ))
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, ClientError::Rejected { .. })
    }
}
