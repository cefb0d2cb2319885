//! Room registry: mints codes, spawns room actors, tracks live rooms.
//!
//! The registry is the only authority for room lifecycle: `create`
//! reserves a fresh collision-checked code, `get` resolves a code typed
//! by a joining player, `remove` tears a room down. It holds no game
//! state itself — just handles — so the server keeps it behind a mutex
//! held only for map operations, never across room I/O.

use std::collections::HashMap;
use std::sync::Arc;

use faceoff_protocol::RoomCode;
use faceoff_session::StatsStore;
use rand::Rng;

use crate::room::spawn_room;
use crate::{RoomConfig, RoomHandle};

/// Alphabet for generated room codes: uppercase alphanumerics, easy to
/// read aloud and type.
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Tracks every live room, keyed by code.
pub struct RoomRegistry<S: StatsStore> {
    rooms: HashMap<RoomCode, RoomHandle>,
    config: RoomConfig,
    stats: Arc<S>,
}

impl<S: StatsStore> RoomRegistry<S> {
    /// Creates an empty registry. Every room it spawns shares `config`
    /// and the stats collaborator.
    pub fn new(config: RoomConfig, stats: Arc<S>) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            stats,
        }
    }

    /// Creates a new room under a fresh unique code and returns its
    /// handle.
    ///
    /// Collisions are prevented by construction: the code is regenerated
    /// until it misses every live room. With 36^6 codes the retry is
    /// practically never taken, but the contract is regenerate, not
    /// fail.
    pub fn create(&mut self) -> (RoomCode, RoomHandle) {
        self.prune();

        let mut rng = rand::rng();
        let code = loop {
            let candidate = generate_code(&mut rng);
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
            tracing::warn!(code = %candidate, "room code collision, regenerating");
        };

        let handle =
            spawn_room(code.clone(), self.config, Arc::clone(&self.stats));
        self.rooms.insert(code.clone(), handle.clone());
        tracing::info!(%code, rooms = self.rooms.len(), "room created");
        (code, handle)
    }

    /// Resolves a code to a live room handle.
    pub fn get(&mut self, code: &RoomCode) -> Option<RoomHandle> {
        self.prune();
        self.rooms.get(code).cloned()
    }

    /// Drops a room's handle and asks its actor to shut down.
    ///
    /// The shutdown send happens on a detached task: callers hold the
    /// registry lock, and a stuck room's full command queue must not
    /// stall every other caller behind that lock.
    pub fn remove(&mut self, code: &RoomCode) {
        if let Some(handle) = self.rooms.remove(code) {
            tokio::spawn(async move {
                // Best-effort: the actor may already be gone (grace
                // expiry, voluntary leave).
                let _ = handle.shutdown().await;
            });
            tracing::info!(%code, rooms = self.rooms.len(), "room removed");
        }
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if no rooms are live.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Evicts handles whose actor has already exited (self-terminated
    /// rooms), so dead codes don't accumulate and can be reissued.
    fn prune(&mut self) {
        self.rooms.retain(|code, handle| {
            let alive = !handle.is_closed();
            if !alive {
                tracing::debug!(%code, "pruning terminated room");
            }
            alive
        });
    }
}

/// Generates a 6-character uppercase alphanumeric room code.
fn generate_code(rng: &mut impl Rng) -> RoomCode {
    let code: String = (0..RoomCode::LEN)
        .map(|_| {
            let idx = rng.random_range(0..CODE_CHARSET.len());
            CODE_CHARSET[idx] as char
        })
        .collect();
    RoomCode::new(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceoff_session::InMemoryStats;

    fn registry() -> RoomRegistry<InMemoryStats> {
        RoomRegistry::new(RoomConfig::default(), Arc::new(InMemoryStats::new()))
    }

    #[test]
    fn test_generate_code_shape() {
        let mut rng = rand::rng();
        for _ in 0..100 {
            let code = generate_code(&mut rng);
            assert_eq!(code.as_str().len(), RoomCode::LEN);
            assert!(code
                .as_str()
                .bytes()
                .all(|b| CODE_CHARSET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn test_create_mints_unique_codes() {
        let mut reg = registry();
        let (a, _) = reg.create();
        let (b, _) = reg.create();
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
    }

    #[tokio::test]
    async fn test_get_returns_handle_for_live_room() {
        let mut reg = registry();
        let (code, _) = reg.create();
        assert!(reg.get(&code).is_some());
        assert!(reg.get(&RoomCode::new("NOSUCH")).is_none());
    }

    #[tokio::test]
    async fn test_remove_drops_the_room() {
        let mut reg = registry();
        let (code, _) = reg.create();
        reg.remove(&code);
        assert!(reg.get(&code).is_none());
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn test_prune_evicts_self_terminated_rooms() {
        let mut reg = registry();
        let (code, handle) = reg.create();
        handle.shutdown().await.unwrap();
        // Give the actor a moment to exit.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert!(reg.get(&code).is_none());
        assert!(reg.is_empty());
    }
}
