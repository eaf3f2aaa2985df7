//! Length-prefixed framing used by the netorcai metaprotocol.
//!
//! Every message travels as a 4-byte little-endian content size followed by
//! that many bytes of UTF-8 JSON. Outgoing content is terminated by a newline,
//! which the server expects and which JSON parsing ignores on the way in.
//!
//! Reading is buffer-oriented: the transport appends whatever bytes it got to
//! an inbox and calls [`take_frame`] until it yields `None`. This keeps partial
//! frames intact across receive timeouts.

use crate::error::DecodeError;
use std::io;

/// Largest accepted frame content. Initial game states of big boards are the
/// largest messages we expect.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Size of the content-length prefix in bytes.
pub const HEADER_SIZE: usize = 4;

/// One complete frame content, still undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    content: Vec<u8>,
}

impl RawFrame {
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl From<&str> for RawFrame {
    fn from(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }
}

/// Builds the bytes to put on the wire for one message content.
pub fn encode_frame(content: &[u8]) -> io::Result<Vec<u8>> {
    let size = content.len() + 1;
    if size > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("message too large: {size} bytes (max {MAX_FRAME_SIZE})"),
        ));
    }

    let mut bytes = Vec::with_capacity(HEADER_SIZE + size);
    bytes.extend_from_slice(&(size as u32).to_le_bytes());
    bytes.extend_from_slice(content);
    bytes.push(b'\n');
    Ok(bytes)
}

/// Removes the first complete frame from `inbox`, if there is one.
///
/// Returns `Ok(None)` while the header or the content is still incomplete and
/// leaves the buffered bytes untouched. An announced size above
/// [`MAX_FRAME_SIZE`] is an error; the stream cannot be resynchronised after it.
pub fn take_frame(inbox: &mut Vec<u8>) -> Result<Option<RawFrame>, DecodeError> {
    if inbox.len() < HEADER_SIZE {
        return Ok(None);
    }

    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&inbox[..HEADER_SIZE]);
    let size = u32::from_le_bytes(header) as usize;

    if size > MAX_FRAME_SIZE {
        return Err(DecodeError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }

    if inbox.len() < HEADER_SIZE + size {
        return Ok(None);
    }

    let content = inbox[HEADER_SIZE..HEADER_SIZE + size].to_vec();
    inbox.drain(..HEADER_SIZE + size);
    Ok(Some(RawFrame::new(content)))
}
