//! Wire protocol for the faceoff game server.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`RoomSnapshot`], etc.) —
//!   the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Filter** ([`filter::redact`]) — the chat profanity filter, applied
//!   before a message is stored or broadcast.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding or
//!   decoding.
//!
//! The protocol layer sits between transport (raw frames) and the room
//! layer (game rules). It doesn't know about connections or rooms — it
//! only knows how to name and serialize events.

mod codec;
mod error;
pub mod filter;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    Character, ChatEntry, ClientEvent, ClientId, GameResult, GameSettings,
    Phase, PlayerSnapshot, Recipient, RoomCode, RoomSnapshot, ServerEvent,
};
