//! Room lifecycle for the faceoff server.
//!
//! Each room runs as an isolated Tokio task (actor model) owning its own
//! game state, player channels, turn timer, and disconnect grace window.
//! All mutations to one room — player actions, timer expiry, connection
//! loss — flow through that task's single command queue, so they are
//! linearized by construction while different rooms proceed fully in
//! parallel.
//!
//! # Key types
//!
//! - [`GameState`] — the pure aggregate and its state machine
//!   (lobby → selecting → playing → game over)
//! - [`RoomActor`](room) — the task wrapping a `GameState`
//! - [`RoomHandle`] — sends commands to a running room actor
//! - [`RoomRegistry`] — mints codes, spawns actors, tracks live rooms
//! - [`DisconnectPolicy`] — grace window vs. immediate termination

mod config;
mod error;
mod registry;
mod room;
mod state;

pub use config::{DisconnectPolicy, RoomConfig};
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{PlayerAction, PlayerSender, RoomHandle};
pub use state::{GameState, Outcome, Player, TimerOp};
