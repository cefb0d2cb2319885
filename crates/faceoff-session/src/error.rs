//! Error types for the session layer.

/// Errors from the identity, stats, and moderation collaborators.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The identity provider rejected the token.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The stats store couldn't be reached or refused the operation.
    #[error("stats store error: {0}")]
    Stats(String),

    /// The moderation sink couldn't accept the report.
    #[error("report submission failed: {0}")]
    Report(String),
}
