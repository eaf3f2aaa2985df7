//! # Hexabomb Spectator Client Library
//!
//! This library connects to a netorcai game server as a visualization, follows
//! a hexabomb game turn by turn and hands every reconciled state to a renderer.
//!
//! ## Architecture Overview
//!
//! The client runs on exactly two threads that never block on each other:
//!
//! ### Network Thread
//! The [`ingestor::TurnIngestor`] owns the server connection. It logs in,
//! waits for GAME_STARTS, then receives frames with a short timeout so it can
//! notice shutdown requests promptly. Every TURN is acknowledged right away,
//! whether or not the renderer had room for it.
//!
//! ### Render Thread
//! The [`reconciler::StateReconciler`] takes at most one message per frame,
//! patches the [`model::GameStateModel`] and notifies the
//! [`renderer::Renderer`]. The window and the macroquad event loop live here.
//!
//! ### Lanes Between Them
//! Two bounded lanes from the [`channel`] module connect the threads. The
//! forward lane keeps at most one turn: while a turn is waiting, newer turns
//! are dropped so the renderer only ever catches up with a fresh state. Start,
//! end and error messages are never dropped. The reverse lane carries a single
//! termination request.
//!
//! ## Module Organization
//!
//! ### Channel Module (`channel`)
//! - Bounded, non-blocking lanes and the freshness drop policy
//! - One endpoint per thread, plus a flush for teardown
//!
//! ### Connection Module (`connection`)
//! - The `GameServerConnection` seam the ingestor drives
//! - A TCP implementation on a current-thread tokio runtime
//!
//! ### Ingestor Module (`ingestor`)
//! - Login, game start wait, turn loop and acknowledgement
//! - Failure publication and cooperative shutdown
//!
//! ### Model Module (`model`)
//! - Cell, character, bomb and roster state
//! - Per-turn transitions such as deaths, revivals and lost connections
//!
//! ### Reconciler and Renderer Modules (`reconciler`, `renderer`, `rendering`)
//! - Message dispatch and session phase checks
//! - The `Renderer` hooks and the macroquad `HexRenderer`
//!
//! ### Session Module (`session`)
//! - Spawns the network thread and tears everything down on exit
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::connection::TcpConnection;
//! use client::ingestor::IngestorConfig;
//! use client::reconciler::Step;
//! use client::renderer::Renderer;
//! use client::session::Session;
//!
//! fn follow(renderer: &mut dyn Renderer) -> Result<(), client::error::ClientError> {
//!     let mut session = Session::spawn(TcpConnection::new()?, IngestorConfig::default())?;
//!
//!     while !renderer.request_shutdown() {
//!         if session.tick(renderer) == Step::Close {
//!             break;
//!         }
//!     }
//!
//!     session.shutdown();
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod connection;
pub mod error;
pub mod ingestor;
pub mod model;
pub mod reconciler;
pub mod renderer;
pub mod rendering;
pub mod session;
