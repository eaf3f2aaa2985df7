use thiserror::Error;

/// Failure to turn a raw frame into a typed protocol message.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },

    #[error("frame content is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame has no message_type field")]
    MissingMessageType,

    #[error("unknown message type '{0}'")]
    UnknownMessageType(String),
}
