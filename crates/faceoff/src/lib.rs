//! # faceoff
//!
//! Real-time session server for a two-player deduction game: it admits
//! players into code-addressed rooms, drives each room's state machine
//! (lobby → character selection → play → game over), arbitrates turns,
//! times out idle turns, forgives transient disconnects, and fans out
//! authoritative state to both participants.
//!
//! The layers, bottom up: `faceoff-transport` (WebSocket framing),
//! `faceoff-protocol` (tagged wire events), `faceoff-session` (rate
//! limiting + external identity/stats collaborators), `faceoff-timer`
//! (cancellable countdowns), `faceoff-room` (the state machine, one
//! actor task per room), and this crate — the event router and server
//! loop that tie them together.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use faceoff::FaceoffServerBuilder;
//! use faceoff_session::{GuestTokens, InMemoryStats, LogReportSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = FaceoffServerBuilder::new()
//!         .bind("0.0.0.0:3001")
//!         .build(GuestTokens, Arc::new(InMemoryStats::new()), LogReportSink)
//!         .await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

mod error;
mod handler;
mod server;

pub use error::ServerError;
pub use server::{FaceoffServer, FaceoffServerBuilder};
