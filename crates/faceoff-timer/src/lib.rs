//! Single-shot cancellable countdown for room timers.
//!
//! A [`Countdown`] is a deadline that a room actor owns and awaits inside
//! its `tokio::select!` loop. The room arms it when a turn starts (and for
//! the disconnect grace window), disarms it when the turn resolves, and
//! treats its expiry as just another serialized room event.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* player actions */ }
//!         _ = self.turn_timer.expired() => { /* force-advance the turn */ }
//!     }
//! }
//! ```
//!
//! # Invariants
//!
//! - At most one pending expiry: [`Countdown::arm`] always replaces any
//!   existing deadline.
//! - [`Countdown::disarm`] is idempotent, and is race-free against the
//!   expiry by construction: both happen on the owning actor's task, and
//!   a `select!` iteration that takes another branch drops the incomplete
//!   `expired()` future without side effects.
//! - While disarmed, [`Countdown::expired`] pends forever, so `select!`
//!   simply never takes that branch and the loop stays purely
//!   message-driven.

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::trace;

/// Computes time left on a limit that started at `started`.
///
/// Saturates at zero. Used to surface "seconds remaining on this turn"
/// in snapshots — recomputed on demand, never stored.
pub fn remaining(limit: Duration, started: std::time::Instant) -> Duration {
    limit.saturating_sub(started.elapsed())
}

/// A single-shot deadline owned by one actor task.
#[derive(Debug, Default)]
pub struct Countdown {
    deadline: Option<TokioInstant>,
}

impl Countdown {
    /// Creates a disarmed countdown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules the expiry `after` from now, replacing any pending
    /// deadline. Exactly one expiry is pending afterwards.
    pub fn arm(&mut self, after: Duration) {
        self.deadline = Some(TokioInstant::now() + after);
        trace!(?after, "countdown armed");
    }

    /// Cancels any pending expiry. A no-op when already disarmed.
    pub fn disarm(&mut self) {
        if self.deadline.take().is_some() {
            trace!("countdown disarmed");
        }
    }

    /// Whether an expiry is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time until the pending expiry, saturating at zero. `None` while
    /// disarmed.
    pub fn time_left(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(TokioInstant::now()))
    }

    /// Resolves once when the deadline passes, disarming in the process.
    /// Pends forever while disarmed.
    ///
    /// Cancel-safe: state changes only at completion. If the owning
    /// `select!` takes another branch while the deadline has already
    /// passed, the countdown stays armed and fires on the next loop
    /// iteration — unless that branch disarmed it, which wins.
    pub async fn expired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                time::sleep_until(deadline).await;
                self.deadline = None;
                trace!("countdown fired");
            }
            None => {
                // Never completes; select! keeps serving other branches.
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_countdown_is_disarmed() {
        let cd = Countdown::new();
        assert!(!cd.is_armed());
        assert_eq!(cd.time_left(), None);
    }

    #[test]
    fn test_disarm_when_disarmed_is_noop() {
        let mut cd = Countdown::new();
        cd.disarm();
        cd.disarm();
        assert!(!cd.is_armed());
    }

    #[test]
    fn test_remaining_saturates_at_zero() {
        let started = std::time::Instant::now() - Duration::from_secs(90);
        assert_eq!(remaining(Duration::from_secs(60), started), Duration::ZERO);
    }

    #[test]
    fn test_remaining_counts_down_from_limit() {
        let started = std::time::Instant::now();
        let left = remaining(Duration::from_secs(60), started);
        assert!(left <= Duration::from_secs(60));
        assert!(left > Duration::from_secs(59));
    }
}
