//! Room configuration: disconnect policy and actor plumbing knobs.

use std::time::Duration;

/// What happens when a player's connection drops mid-session.
///
/// The grace variant is primary: a dropped player keeps their seat for
/// the window and can rejoin with no state loss. Immediate termination
/// is the stricter policy kept as a configuration choice. A voluntary
/// leave always terminates at once, policy regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectPolicy {
    /// Keep the room alive this long waiting for a reconnect.
    Grace(Duration),
    /// Destroy the room on any disconnect.
    Immediate,
}

impl Default for DisconnectPolicy {
    fn default() -> Self {
        Self::Grace(Duration::from_secs(30))
    }
}

/// Configuration shared by every room a registry spawns.
#[derive(Debug, Clone, Copy)]
pub struct RoomConfig {
    /// Disconnect handling for all rooms.
    pub disconnect_policy: DisconnectPolicy,

    /// Command channel capacity per room actor. Bounded so a stuck room
    /// back-pressures its own callers instead of buffering forever.
    pub command_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            disconnect_policy: DisconnectPolicy::default(),
            command_buffer: 64,
        }
    }
}
