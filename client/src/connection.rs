//! Session with a netorcai server.
//!
//! [`GameServerConnection`] is what the ingestor drives; [`TcpConnection`] is
//! the real implementation. It owns a current-thread tokio runtime so the
//! whole connection lives on the network thread without spawning workers.
//! Received bytes accumulate in an inbox until a full frame is available, so a
//! receive timeout never loses half a frame.

use crate::error::ClientError;
use log::{debug, info, warn};
use protocol::framing::{self, RawFrame};
use protocol::{decode, ClientMessage, ServerMessage, METAPROTOCOL_VERSION};
use serde_json::Value;
use std::future::Future;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio::time::{timeout, timeout_at, Instant};

/// How long establishing the TCP connection may take.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long the server gets to answer LOGIN.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a single outgoing message may take to be written.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// The operations the ingestor needs from a game server session.
pub trait GameServerConnection {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), ClientError>;

    /// Logs in and waits for the server's acknowledgement. A refusal is
    /// reported as [`ClientError::Rejected`].
    fn login(&mut self, nickname: &str, role: &str) -> Result<(), ClientError>;

    /// Waits at most `timeout` for the next complete frame.
    fn receive_frame(&mut self, timeout: Duration) -> Result<Option<RawFrame>, ClientError>;

    fn send_turn_ack(&mut self, turn_number: u32, actions: Value) -> Result<(), ClientError>;

    fn close(&mut self);
}

pub struct TcpConnection {
    runtime: Runtime,
    stream: Option<TcpStream>,
    inbox: Vec<u8>,
    connect_timeout: Duration,
}

impl TcpConnection {
    pub fn new() -> Result<Self, ClientError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        Ok(Self {
            runtime,
            stream: None,
            inbox: Vec::new(),
            connect_timeout: CONNECT_TIMEOUT,
        })
    }

    /// Bounds the whole connection attempt, across every resolved address.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn send(&mut self, message: &ClientMessage) -> Result<(), ClientError> {
        let bytes = message.to_frame()?;
        let Self {
            runtime, stream, ..
        } = self;
        let stream = stream.as_mut().ok_or_else(not_connected)?;

        runtime.block_on(async {
            match timeout(WRITE_TIMEOUT, stream.write_all(&bytes)).await {
                Ok(result) => result.map_err(ClientError::from),
                Err(_) => Err(ClientError::timed_out("writing to the server")),
            }
        })
    }
}

impl GameServerConnection for TcpConnection {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), ClientError> {
        // Resolved here rather than by tokio, which would need a blocking pool thread.
        let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{host}:{port} did not resolve to any address"),
            )
            .into());
        }

        let deadline = Instant::now() + self.connect_timeout;
        let (stream, addr) = self
            .runtime
            .block_on(connect_any(&addrs, deadline, TcpStream::connect))?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Could not disable Nagle on {}: {}", addr, e);
        }
        info!("Connected to {}", addr);
        self.stream = Some(stream);
        self.inbox.clear();
        Ok(())
    }

    fn login(&mut self, nickname: &str, role: &str) -> Result<(), ClientError> {
        self.send(&ClientMessage::Login {
            nickname: nickname.to_string(),
            role: role.to_string(),
            metaprotocol_version: METAPROTOCOL_VERSION.to_string(),
        })?;

        let frame = self
            .receive_frame(HANDSHAKE_TIMEOUT)?
            .ok_or_else(|| ClientError::timed_out("waiting for LOGIN_ACK"))?;

        match decode(&frame)? {
            ServerMessage::LoginAck(ack) => {
                if ack.metaprotocol_version != METAPROTOCOL_VERSION {
                    warn!(
                        "Server speaks metaprotocol {}, we speak {}",
                        ack.metaprotocol_version, METAPROTOCOL_VERSION
                    );
                }
                Ok(())
            }
            ServerMessage::Kick(kick) => Err(ClientError::Rejected {
                reason: kick.kick_reason,
            }),
            other => Err(ClientError::UnexpectedMessage {
                received: other.kind(),
                expected: "waiting for LOGIN_ACK",
            }),
        }
    }

    fn receive_frame(&mut self, timeout: Duration) -> Result<Option<RawFrame>, ClientError> {
        let Self {
            runtime,
            stream,
            inbox,
            ..
        } = self;
        let stream = stream.as_mut().ok_or_else(not_connected)?;
        let deadline = Instant::now() + timeout;

        runtime.block_on(read_frame(stream, inbox, deadline))
    }

    fn send_turn_ack(&mut self, turn_number: u32, actions: Value) -> Result<(), ClientError> {
        self.send(&ClientMessage::TurnAck {
            turn_number,
            actions,
        })
    }

    fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = self.runtime.block_on(stream.shutdown()) {
                debug!("Error while closing the connection: {}", e);
            }
        }
        self.inbox.clear();
    }
}

/// Reads from `reader` into `inbox` until a full frame is buffered or
/// `deadline` passes. Bytes of an incomplete frame stay in `inbox`.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    inbox: &mut Vec<u8>,
    deadline: Instant,
) -> Result<Option<RawFrame>, ClientError> {
    loop {
        if let Some(frame) = framing::take_frame(inbox)? {
            return Ok(Some(frame));
        }

        match timeout_at(deadline, reader.read_buf(inbox)).await {
            Err(_) => return Ok(None),
            Ok(Ok(0)) => return Err(ClientError::closed()),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(e.into()),
        }
    }
}

/// Tries each address in turn until one accepts or `deadline` passes.
pub async fn connect_any<S, F, Fut>(
    addrs: &[SocketAddr],
    deadline: Instant,
    mut connect: F,
) -> Result<(S, SocketAddr), ClientError>
where
    F: FnMut(SocketAddr) -> Fut,
    Fut: Future<Output = io::Result<S>>,
{
    let mut last_error = None;

    for &addr in addrs {
        match timeout_at(deadline, connect(addr)).await {
            Ok(Ok(stream)) => return Ok((stream, addr)),
            Ok(Err(e)) => {
                debug!("Connection to {} failed: {}", addr, e);
                last_error = Some(ClientError::from(e));
            }
            Err(_) => {
                debug!("Connection to {} timed out", addr);
                return Err(ClientError::timed_out(format!("connecting to {addr}")));
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        ClientError::Connection(io::Error::new(
            io::ErrorKind::NotFound,
            "no address to connect to",
        ))
    }))
}

fn not_connected() -> ClientError {
    ClientError::Connection(io::Error::new(
        io::ErrorKind::NotConnected,
        "not connected to a server",
    ))
}
