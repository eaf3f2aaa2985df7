//! Wires a connection, the ingestor thread and the reconciler together.
//!
//! The caller owns the render thread: it calls [`Session::tick`] once per frame
//! and [`Session::shutdown`] when the window closes or the reconciler reports
//! [`Step::Close`].

use crate::channel::{flush_lanes, pipeline, Message};
use crate::connection::GameServerConnection;
use crate::error::ClientError;
use crate::ingestor::{IngestorConfig, IngestorExit, IngestorStats, Outcome, TurnIngestor};
use crate::reconciler::{SessionPhase, StateReconciler, Step};
use crate::renderer::Renderer;
use log::{error, info};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// `None` when the network thread panicked.
    pub outcome: Option<Outcome>,
    pub stats: IngestorStats,
    /// Messages still sitting in the lanes when the session was torn down.
    pub released: usize,
    pub phase: SessionPhase,
}

enum NetworkThread {
    Running(JoinHandle<IngestorExit>),
    Exited(IngestorExit),
    Panicked,
}

pub struct Session {
    reconciler: StateReconciler,
    network: Option<NetworkThread>,
}

impl Session {
    /// Starts the network thread. Nothing is received until it has connected.
    pub fn spawn<C>(connection: C, config: IngestorConfig) -> Result<Self, ClientError>
    where
        C: GameServerConnection + Send + 'static,
    {
        let (network, render) = pipeline();
        let ingestor = TurnIngestor::new(connection, network, config);

        let handle = thread::Builder::new()
            .name("network".to_string())
            .spawn(move || ingestor.run())?;

        Ok(Self {
            reconciler: StateReconciler::new(render),
            network: Some(NetworkThread::Running(handle)),
        })
    }

    /// Applies at most one pending message.
    ///
    /// Once the lane is empty and the network thread is gone, a thread that
    /// died without publishing anything is reported to the renderer.
    pub fn tick<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> Step {
        let step = self.reconciler.poll(renderer);
        if step != Step::Idle {
            return step;
        }

        match self.network.take() {
            Some(NetworkThread::Running(handle)) if handle.is_finished() => match handle.join() {
                Ok(exit) => {
                    self.network = Some(NetworkThread::Exited(exit));
                    Step::Idle
                }
                Err(_) => {
                    error!("Network thread panicked");
                    self.network = Some(NetworkThread::Panicked);
                    self.reconciler
                        .handle(Message::Error(ClientError::NetworkStopped), renderer)
                }
            },
            other => {
                self.network = other;
                Step::Idle
            }
        }
    }

    pub fn reconciler(&self) -> &StateReconciler {
        &self.reconciler
    }

    pub fn is_network_finished(&self) -> bool {
        match &self.network {
            Some(NetworkThread::Running(handle)) => handle.is_finished(),
            _ => true,
        }
    }

    /// Stops the network thread, waits for it and releases undelivered messages.
    pub fn shutdown(mut self) -> SessionReport {
        self.stop()
    }

    fn stop(&mut self) -> SessionReport {
        let phase = self.reconciler.phase();

        let exit = match self.network.take() {
            Some(NetworkThread::Running(handle)) => {
                if !handle.is_finished() {
                    info!("Asking the network thread to stop...");
                    self.reconciler.request_termination();
                }
                match handle.join() {
                    Ok(exit) => Some(exit),
                    Err(_) => {
                        error!("Network thread panicked");
                        None
                    }
                }
            }
            Some(NetworkThread::Exited(exit)) => Some(exit),
            Some(NetworkThread::Panicked) | None => None,
        };

        match exit {
            Some(mut exit) => {
                let released = flush_lanes(&mut exit.endpoint, self.reconciler.endpoint_mut());
                info!("Session closed: {:?}", exit.outcome);
                SessionReport {
                    outcome: Some(exit.outcome),
                    stats: exit.stats,
                    released,
                    phase,
                }
            }
            None => SessionReport {
                outcome: None,
                stats: IngestorStats::default(),
                released: self.reconciler.endpoint_mut().drain(),
                phase,
            },
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.network.is_some() {
            self.stop();
        }
    }
}
