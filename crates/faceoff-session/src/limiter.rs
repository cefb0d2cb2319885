//! The rate limiter: a per-connection, per-category cooldown gate.
//!
//! Every inbound action is assigned an [`ActionCategory`]; the limiter
//! remembers the last allowed instant per `(connection, category)` pair
//! and gates anything arriving before the category's minimum interval
//! has elapsed. A denied call performs no state update, so a client
//! hammering an action doesn't push its own window forward.
//!
//! Gated actions are dropped silently — a burst of duplicate clicks is
//! treated as one click, not as an error worth telling the client about.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use faceoff_protocol::ClientId;

/// Coarse action classes with their own cooldowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCategory {
    /// Start / select / restart / end-turn.
    GameAction,
    /// Plain chat messages.
    Chat,
    /// Guess attempts.
    Guess,
    /// Typing indicators.
    Typing,
}

impl ActionCategory {
    /// Minimum interval between allowed actions of this category on one
    /// connection.
    pub fn min_interval(self) -> Duration {
        match self {
            Self::GameAction => Duration::from_millis(500),
            Self::Chat => Duration::from_millis(1000),
            Self::Guess => Duration::from_millis(1000),
            Self::Typing => Duration::from_millis(200),
        }
    }
}

/// Tracks last-allowed instants per `(connection, category)` pair.
///
/// Not thread-safe by itself — the server keeps it behind a mutex held
/// only for the map operation (the same ownership shape the room
/// registry uses).
#[derive(Debug, Default)]
pub struct RateLimiter {
    last_allowed: HashMap<(ClientId, ActionCategory), Instant>,
}

impl RateLimiter {
    /// Creates an empty limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the action may proceed, recording the instant.
    /// Returns `false` (and records nothing) if the category's interval
    /// hasn't elapsed since the last allowed action.
    pub fn allow(
        &mut self,
        client: ClientId,
        category: ActionCategory,
    ) -> bool {
        self.allow_at(client, category, Instant::now())
    }

    fn allow_at(
        &mut self,
        client: ClientId,
        category: ActionCategory,
        now: Instant,
    ) -> bool {
        let key = (client, category);
        if let Some(last) = self.last_allowed.get(&key) {
            if now.duration_since(*last) < category.min_interval() {
                tracing::trace!(%client, ?category, "rate limited");
                return false;
            }
        }
        self.last_allowed.insert(key, now);
        true
    }

    /// Releases all bookkeeping for a connection. Called on teardown so
    /// the map doesn't grow with dead connections.
    pub fn forget(&mut self, client: ClientId) {
        self.last_allowed.retain(|(c, _), _| *c != client);
    }

    /// Number of tracked `(connection, category)` entries.
    pub fn len(&self) -> usize {
        self.last_allowed.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.last_allowed.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
