//! Bounded, non-blocking lanes between the network thread and the render thread.
//!
//! The forward lane carries decoded server messages to the renderer, the
//! reverse lane carries shutdown requests back. Both sides only ever use
//! `try_send` / `try_recv`, so neither thread can be stalled by the other.
//!
//! The forward lane favours freshness: a turn is only enqueued when nothing is
//! waiting, otherwise it is dropped on the spot. Start, end and error messages
//! bypass that check. Since at most one turn is ever buffered, one turn plus
//! one of those control messages is the most the lane can hold.

use crate::error::ClientError;
use log::{debug, error};
use protocol::{GameEnds, GameStarts, Turn};
use tokio::sync::mpsc::{self, error::TrySendError};

/// One pending turn plus one start/end/error message.
pub const FORWARD_CAPACITY: usize = 2;

pub const REVERSE_CAPACITY: usize = 1;

/// Network → renderer payloads. Boxed so moving them through the lane is cheap.
#[derive(Debug)]
pub enum Message {
    GameStarts(Box<GameStarts>),
    Turn(Box<Turn>),
    GameEnds(Box<GameEnds>),
    Error(ClientError),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::GameStarts(_) => "GAME_STARTS",
            Message::Turn(_) => "TURN",
            Message::GameEnds(_) => "GAME_ENDS",
            Message::Error(_) => "ERROR",
        }
    }
}

/// Renderer → network requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Terminate,
}

/// Sending half of a lane.
#[derive(Debug)]
pub struct LaneSender<T> {
    inner: mpsc::Sender<T>,
}

impl<T> LaneSender<T> {
    /// Enqueues `msg` if there is room. A refused message is dropped here.
    pub fn try_send(&self, msg: T) -> bool {
        match self.inner.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => false,
        }
    }

    /// True when nothing sent on this lane is waiting to be received.
    pub fn is_empty(&self) -> bool {
        self.inner.capacity() == self.inner.max_capacity()
    }
}

/// Receiving half of a lane.
#[derive(Debug)]
pub struct LaneReceiver<T> {
    inner: mpsc::Receiver<T>,
}

impl<T> LaneReceiver<T> {
    pub fn try_receive(&mut self) -> Option<T> {
        self.inner.try_recv().ok()
    }

    /// Drops everything still buffered and returns how many messages that was.
    pub fn drain(&mut self) -> usize {
        let mut released = 0;
        while self.inner.try_recv().is_ok() {
            released += 1;
        }
        released
    }
}

pub fn lane<T>(capacity: usize) -> (LaneSender<T>, LaneReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (LaneSender { inner: tx }, LaneReceiver { inner: rx })
}

/// The network thread's side of the pipeline.
#[derive(Debug)]
pub struct NetworkEndpoint {
    to_renderer: LaneSender<Message>,
    from_renderer: LaneReceiver<Control>,
}

impl NetworkEndpoint {
    /// Publishes a message that must not be dropped by the freshness policy.
    pub fn publish(&self, msg: Message) -> bool {
        let kind = msg.kind();
        let sent = self.to_renderer.try_send(msg);
        if !sent {
            error!("Forward lane refused a {} message", kind);
        }
        sent
    }

    /// Publishes a turn unless another message is still waiting, in which case
    /// the turn is dropped. Returns whether the turn was forwarded.
    pub fn publish_turn(&self, turn: Box<Turn>) -> bool {
        if !self.to_renderer.is_empty() {
            debug!("Renderer busy, dropping turn {}", turn.turn_number);
            return false;
        }
        self.to_renderer.try_send(Message::Turn(turn))
    }

    /// Polls the reverse lane once.
    pub fn termination_requested(&mut self) -> bool {
        matches!(self.from_renderer.try_receive(), Some(Control::Terminate))
    }

    pub fn drain(&mut self) -> usize {
        self.from_renderer.drain()
    }
}

/// The render thread's side of the pipeline.
#[derive(Debug)]
pub struct RenderEndpoint {
    from_network: LaneReceiver<Message>,
    to_network: LaneSender<Control>,
}

impl RenderEndpoint {
    pub fn next_message(&mut self) -> Option<Message> {
        self.from_network.try_receive()
    }

    /// Asks the network thread to stop. Returns false if a request is already
    /// pending or the network thread is gone.
    pub fn request_termination(&self) -> bool {
        self.to_network.try_send(Control::Terminate)
    }

    pub fn drain(&mut self) -> usize {
        self.from_network.drain()
    }
}

/// Creates both lanes and hands out one endpoint per thread.
pub fn pipeline() -> (NetworkEndpoint, RenderEndpoint) {
    let (to_renderer, from_network) = lane(FORWARD_CAPACITY);
    let (to_network, from_renderer) = lane(REVERSE_CAPACITY);

    (
        NetworkEndpoint {
            to_renderer,
            from_renderer,
        },
        RenderEndpoint {
            from_network,
            to_network,
        },
    )
}

/// Releases whatever is left in either lane once the network thread is done.
pub fn flush_lanes(network: &mut NetworkEndpoint, render: &mut RenderEndpoint) -> usize {
    let released = network.drain() + render.drain();
    if released > 0 {
        debug!("Released {} undelivered messages", released);
    }
    released
}
