//! Stats hook: the seam to the durable win/loss counter store.
//!
//! Room data lives and dies in process memory; the only thing that
//! survives a restart is the per-identity win/loss record, and that is
//! owned by an external store behind [`StatsStore`]. The room actor
//! records results fire-and-forget at game over and broadcasts
//! `stats_updated` so clients re-fetch.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{SessionError, StableIdentity};

/// A player's persistent record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsRecord {
    pub wins: u64,
    pub losses: u64,
}

/// Durable win/loss counters keyed by stable identity.
///
/// Guests (no stable identity) never reach this store.
pub trait StatsStore: Send + Sync + 'static {
    /// Increments the win counter for an identity.
    fn record_win(
        &self,
        identity: &StableIdentity,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Increments the loss counter for an identity.
    fn record_loss(
        &self,
        identity: &StableIdentity,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Fetches the current record for an identity. Unknown identities
    /// read as all-zero, not as an error.
    fn stats(
        &self,
        identity: &StableIdentity,
    ) -> impl Future<Output = Result<StatsRecord, SessionError>> + Send;
}

/// In-memory store for development and tests.
///
/// The mutex is a plain `std::sync::Mutex`: every operation is a short
/// map touch with no await inside the critical section.
#[derive(Debug, Default)]
pub struct InMemoryStats {
    records: Mutex<HashMap<StableIdentity, StatsRecord>>,
}

impl InMemoryStats {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsStore for InMemoryStats {
    async fn record_win(
        &self,
        identity: &StableIdentity,
    ) -> Result<(), SessionError> {
        let mut records = self.records.lock().expect("stats lock");
        records.entry(identity.clone()).or_default().wins += 1;
        Ok(())
    }

    async fn record_loss(
        &self,
        identity: &StableIdentity,
    ) -> Result<(), SessionError> {
        let mut records = self.records.lock().expect("stats lock");
        records.entry(identity.clone()).or_default().losses += 1;
        Ok(())
    }

    async fn stats(
        &self,
        identity: &StableIdentity,
    ) -> Result<StatsRecord, SessionError> {
        let records = self.records.lock().expect("stats lock");
        Ok(records.get(identity).copied().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> StableIdentity {
        StableIdentity::new(s)
    }

    #[tokio::test]
    async fn test_unknown_identity_reads_as_zero() {
        let store = InMemoryStats::new();
        let record = store.stats(&id("nobody")).await.unwrap();
        assert_eq!(record, StatsRecord::default());
    }

    #[tokio::test]
    async fn test_record_win_and_loss_accumulate() {
        let store = InMemoryStats::new();
        store.record_win(&id("alice")).await.unwrap();
        store.record_win(&id("alice")).await.unwrap();
        store.record_loss(&id("alice")).await.unwrap();

        let record = store.stats(&id("alice")).await.unwrap();
        assert_eq!(record, StatsRecord { wins: 2, losses: 1 });
    }

    #[tokio::test]
    async fn test_identities_are_independent() {
        let store = InMemoryStats::new();
        store.record_win(&id("alice")).await.unwrap();
        store.record_loss(&id("bob")).await.unwrap();

        assert_eq!(store.stats(&id("alice")).await.unwrap().losses, 0);
        assert_eq!(store.stats(&id("bob")).await.unwrap().wins, 0);
    }
}
