//! `FaceoffServer` builder and accept loop.
//!
//! This is the entry point for running the session server. It ties the
//! layers together: transport → protocol → session → room. The external
//! collaborators (identity provider, stats store, report sink) are
//! injected here; the dev implementations from `faceoff-session` make a
//! runnable server without any backend.

use std::sync::Arc;

use faceoff_protocol::{Codec, JsonCodec};
use faceoff_room::{DisconnectPolicy, RoomConfig, RoomRegistry};
use faceoff_session::{
    IdentityProvider, RateLimiter, ReportSink, StatsStore,
};
use faceoff_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::ServerError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc`; the mutexes guard only map operations (registry
/// lookups, limiter bookkeeping) and are never held across room I/O, so
/// one slow room can't stall another connection's dispatch.
pub(crate) struct ServerState<I, S, R, C>
where
    I: IdentityProvider,
    S: StatsStore,
    R: ReportSink,
    C: Codec,
{
    pub(crate) registry: Mutex<RoomRegistry<S>>,
    pub(crate) limiter: Mutex<RateLimiter>,
    pub(crate) identity: I,
    pub(crate) reports: R,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a faceoff server.
///
/// # Example
///
/// ```rust,ignore
/// let server = FaceoffServerBuilder::new()
///     .bind("0.0.0.0:3001")
///     .build(GuestTokens, Arc::new(InMemoryStats::new()), LogReportSink)
///     .await?;
/// server.run().await
/// ```
pub struct FaceoffServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl FaceoffServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the disconnect policy for every room (grace window vs.
    /// immediate termination).
    pub fn disconnect_policy(mut self, policy: DisconnectPolicy) -> Self {
        self.room_config.disconnect_policy = policy;
        self
    }

    /// Builds the server with the given external collaborators.
    ///
    /// Uses `JsonCodec` and the WebSocket transport.
    pub async fn build<I, S, R>(
        self,
        identity: I,
        stats: Arc<S>,
        reports: R,
    ) -> Result<FaceoffServer<I, S, R, JsonCodec>, ServerError>
    where
        I: IdentityProvider,
        S: StatsStore,
        R: ReportSink,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: Mutex::new(RoomRegistry::new(self.room_config, stats)),
            limiter: Mutex::new(RateLimiter::new()),
            identity,
            reports,
            codec: JsonCodec,
        });

        Ok(FaceoffServer { transport, state })
    }
}

impl Default for FaceoffServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running faceoff session server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct FaceoffServer<I, S, R, C>
where
    I: IdentityProvider,
    S: StatsStore,
    R: ReportSink,
    C: Codec,
{
    transport: WebSocketTransport,
    state: Arc<ServerState<I, S, R, C>>,
}

impl<I, S, R, C> FaceoffServer<I, S, R, C>
where
    I: IdentityProvider,
    S: StatsStore,
    R: ReportSink,
    C: Codec,
{
    /// Creates a new builder.
    pub fn builder() -> FaceoffServerBuilder {
        FaceoffServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop: every connection gets its own handler task
    /// (the event router). Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!("faceoff server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
