//! Identity hook: the seam to the external identity provider.
//!
//! The server doesn't implement authentication — the surrounding
//! application does (its login/signup layer). This module defines the
//! [`IdentityProvider`] trait the event router calls when a create/join
//! event carries an auth token, and the [`StableIdentity`] it yields.
//!
//! A stable identity is the ONLY key allowed to link a player across
//! reconnects and sessions; connection ids are ephemeral and display
//! names are caller-chosen. Guests have no stable identity and no
//! persistent statistics.

use std::fmt;

use crate::SessionError;

/// Durable identifier for an authenticated player.
///
/// Opaque to this server: whatever the identity provider returns
/// (a user id, a subject claim, ...). Never sent back on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StableIdentity(String);

impl StableIdentity {
    /// Wraps an identifier issued by the identity provider.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the identity provider knows about an authenticated caller.
#[derive(Debug, Clone)]
pub struct Profile {
    pub identity: StableIdentity,
    pub display_name: String,
}

/// Validates an auth token and returns who the caller is.
///
/// Implement this against your auth backend (JWT validation, a session
/// cookie lookup, an auth API call). [`GuestTokens`] is the development
/// implementation; tests use it too.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Validates the given token and returns the caller's profile.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the token is invalid or expired.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Profile, SessionError>> + Send;
}

/// Development provider: the token itself becomes the stable identity
/// and the display name. No validation — never use in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuestTokens;

impl IdentityProvider for GuestTokens {
    async fn authenticate(
        &self,
        token: &str,
    ) -> Result<Profile, SessionError> {
        if token.is_empty() {
            return Err(SessionError::AuthFailed("empty token".into()));
        }
        Ok(Profile {
            identity: StableIdentity::new(token),
            display_name: token.to_string(),
        })
    }
}
