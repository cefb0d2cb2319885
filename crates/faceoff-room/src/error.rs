//! Error types for the room layer.
//!
//! Every variant is recoverable and local to one action: it is reported
//! to the acting caller only, never broadcast, and never mutates room
//! state. Nothing here crashes a room or the process.

use faceoff_protocol::RoomCode;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The action references a code with no live room behind it.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room already seats two players.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The acting connection is not a participant of this room.
    #[error("not a participant of room {0}")]
    NotInRoom(RoomCode),

    /// The participant may not perform this action — wrong turn,
    /// non-host start, phase mismatch, or a locked-in secret.
    #[error("not allowed: {0}")]
    Unauthorized(String),

    /// The action decoded but carries unusable content (e.g. an empty
    /// character set).
    #[error("malformed action: {0}")]
    Malformed(String),

    /// The room's command channel is closed — the actor is gone.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}
