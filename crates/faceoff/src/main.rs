//! faceoff session server binary.
//!
//! Runs the WebSocket session layer with the development collaborators:
//! guest-token identities, in-memory stats, and log-only moderation.
//! A real deployment swaps those for the application's identity and
//! storage backends via [`FaceoffServerBuilder::build`].

use std::sync::Arc;

use faceoff::FaceoffServerBuilder;
use faceoff_session::{GuestTokens, InMemoryStats, LogReportSink};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("FACEOFF_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3001".to_string());

    let server = FaceoffServerBuilder::new()
        .bind(&addr)
        .build(GuestTokens, Arc::new(InMemoryStats::new()), LogReportSink)
        .await?;

    tracing::info!(addr = %server.local_addr()?, "faceoff server listening");
    server.run().await?;
    Ok(())
}
