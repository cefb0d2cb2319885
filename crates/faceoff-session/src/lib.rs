//! Per-connection concerns for the faceoff server.
//!
//! This crate covers everything about a caller that is not room state:
//!
//! 1. **Rate limiting** — the per-connection, per-category cooldown gate
//!    every inbound action passes through ([`RateLimiter`]).
//! 2. **Identity** — the seam to the external identity provider that
//!    turns an auth token into a [`StableIdentity`] ([`IdentityProvider`]).
//! 3. **Statistics** — the seam to the durable win/loss counter store
//!    ([`StatsStore`]).
//! 4. **Moderation** — the seam user reports are forwarded through
//!    ([`ReportSink`]).
//!
//! The identity, stats, and moderation collaborators are consumed, not
//! implemented here — the traits define the contract, and the in-memory
//! implementations exist for development and tests.

#![allow(async_fn_in_trait)]

mod error;
mod identity;
mod limiter;
mod report;
mod stats;

pub use error::SessionError;
pub use identity::{GuestTokens, IdentityProvider, Profile, StableIdentity};
pub use limiter::{ActionCategory, RateLimiter};
pub use report::{LogReportSink, ReportSink, UserReport};
pub use stats::{InMemoryStats, StatsRecord, StatsStore};
