//! Per-connection event router.
//!
//! Each accepted connection gets its own task running this handler. The
//! flow for every frame is: decode → rate-limit gate → resolve the room
//! → dispatch → reply or rely on the room's broadcast. Outbound events
//! from the room actor arrive on a per-player channel drained by a
//! forwarder task, so broadcasts never wait on this task's read loop.
//!
//! Rejections are reported to this caller only (`error` events) and
//! rate-limited frames are dropped silently, as if they were duplicate
//! clicks.

use std::sync::{Arc, Mutex as StdMutex};

use faceoff_protocol::{
    ClientEvent, ClientId, Codec, RoomCode, ServerEvent,
};
use faceoff_room::{PlayerAction, RoomHandle};
use faceoff_session::{
    ActionCategory, IdentityProvider, ReportSink, SessionError,
    StableIdentity, StatsStore, UserReport,
};
use faceoff_transport::{Connection, WebSocketConnection};

use crate::ServerError;
use crate::server::ServerState;

/// The room this connection is currently bound to. Shared with the
/// drop guard so teardown sees the latest binding.
type RoomBinding = Arc<StdMutex<Option<RoomHandle>>>;

/// Drop guard that reports the connection loss when the handler exits,
/// however it exits. `Drop` is synchronous, so the async cleanup runs in
/// a fire-and-forget task.
struct ConnectionGuard<I, S, R, C>
where
    I: IdentityProvider,
    S: StatsStore,
    R: ReportSink,
    C: Codec,
{
    client: ClientId,
    state: Arc<ServerState<I, S, R, C>>,
    binding: RoomBinding,
}

impl<I, S, R, C> Drop for ConnectionGuard<I, S, R, C>
where
    I: IdentityProvider,
    S: StatsStore,
    R: ReportSink,
    C: Codec,
{
    fn drop(&mut self) {
        let client = self.client;
        let state = Arc::clone(&self.state);
        let handle = self.binding.lock().expect("binding lock").take();
        tokio::spawn(async move {
            state.limiter.lock().await.forget(client);
            if let Some(handle) = handle {
                handle.connection_lost(client).await;
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<I, S, R, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<I, S, R, C>>,
) -> Result<(), ServerError>
where
    I: IdentityProvider,
    S: StatsStore,
    R: ReportSink,
    C: Codec,
{
    let client = ClientId(conn.id().into_inner());
    tracing::debug!(%client, "handling new connection");

    let binding: RoomBinding = Arc::new(StdMutex::new(None));
    let _guard = ConnectionGuard {
        client,
        state: Arc::clone(&state),
        binding: Arc::clone(&binding),
    };

    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!(%client, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%client, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&frame) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%client, error = %e, "malformed event");
                send_error(&conn, &state, "malformed event").await?;
                continue;
            }
        };

        // Rate-limit gate. Gated frames are silent no-ops.
        if let Some(category) = category_of(&event) {
            if !state.limiter.lock().await.allow(client, category) {
                continue;
            }
        }

        dispatch(&conn, &state, client, &binding, event).await?;
    }

    // _guard drops here → connection-loss cleanup fires.
    Ok(())
}

/// Routes one decoded event.
async fn dispatch<I, S, R, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<I, S, R, C>>,
    client: ClientId,
    binding: &RoomBinding,
    event: ClientEvent,
) -> Result<(), ServerError>
where
    I: IdentityProvider,
    S: StatsStore,
    R: ReportSink,
    C: Codec,
{
    match event {
        ClientEvent::CreateRoom {
            player_name,
            identity,
        } => {
            if bound_room(binding).is_some() {
                return send_error(conn, state, "already in a room").await;
            }
            let identity = match resolve_identity(state, identity).await {
                Ok(id) => id,
                Err(e) => return send_error(conn, state, e.to_string()).await,
            };

            let (code, handle) = state.registry.lock().await.create();

            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            if let Err(e) = handle
                .join(client, player_name, identity, tx)
                .await
            {
                // A fresh room refusing its creator means the actor
                // died; don't leave the code reserved.
                state.registry.lock().await.remove(&code);
                return send_error(conn, state, e.to_string()).await;
            }
            spawn_forwarder(conn.clone(), Arc::clone(state), rx);
            *binding.lock().expect("binding lock") = Some(handle.clone());

            match handle.snapshot().await {
                Ok(room) => {
                    send_event(
                        conn,
                        state,
                        &ServerEvent::RoomCreated { code, room },
                    )
                    .await
                }
                Err(e) => send_error(conn, state, e.to_string()).await,
            }
        }

        ClientEvent::JoinRoom {
            code,
            player_name,
            identity,
        } => {
            if bound_room(binding).is_some() {
                return send_error(conn, state, "already in a room").await;
            }
            let identity = match resolve_identity(state, identity).await {
                Ok(id) => id,
                Err(e) => return send_error(conn, state, e.to_string()).await,
            };

            let Some(handle) = state.registry.lock().await.get(&code)
            else {
                let reason =
                    faceoff_room::RoomError::NotFound(code).to_string();
                return send_error(conn, state, reason).await;
            };

            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            match handle.join(client, player_name, identity, tx).await {
                Ok(()) => {
                    // The join (or rebind) broadcast delivers the
                    // snapshot through this player's new channel.
                    spawn_forwarder(conn.clone(), Arc::clone(state), rx);
                    *binding.lock().expect("binding lock") = Some(handle);
                    Ok(())
                }
                Err(e) => send_error(conn, state, e.to_string()).await,
            }
        }

        ClientEvent::LeaveRoom { code } => {
            let handle = {
                let mut bound = binding.lock().expect("binding lock");
                let matches =
                    bound.as_ref().is_some_and(|h| *h.code() == code);
                if matches { bound.take() } else { None }
            };
            let Some(handle) = handle else {
                return send_error(conn, state, "not in that room").await;
            };

            if let Err(e) = handle.leave(client).await {
                tracing::debug!(%client, error = %e, "leave failed");
            }
            state.registry.lock().await.remove(&code);
            Ok(())
        }

        ClientEvent::ReportUser {
            code,
            message,
            reporter_name,
        } => {
            // Forwarded to the moderation collaborator; no in-room
            // effect either way.
            if let Err(e) = state
                .reports
                .submit(UserReport {
                    room: code,
                    message,
                    reporter_name,
                })
                .await
            {
                tracing::warn!(%client, error = %e, "report submission failed");
            }
            Ok(())
        }

        // Everything else is an in-room action arbitrated by the room
        // actor.
        other => {
            let (code, action) = into_room_action(other);
            let Some(handle) = resolve_room(state, binding, &code).await
            else {
                let reason =
                    faceoff_room::RoomError::NotFound(code).to_string();
                return send_error(conn, state, reason).await;
            };

            match handle.action(client, action).await {
                Ok(()) => Ok(()),
                Err(e) => send_error(conn, state, e.to_string()).await,
            }
        }
    }
}

/// The rate-limit category for an inbound event; `None` is ungated.
fn category_of(event: &ClientEvent) -> Option<ActionCategory> {
    match event {
        ClientEvent::StartGame { .. }
        | ClientEvent::SelectCharacter { .. }
        | ClientEvent::RestartGame { .. }
        | ClientEvent::EndTurn { .. } => Some(ActionCategory::GameAction),
        ClientEvent::SendMessage { .. } => Some(ActionCategory::Chat),
        ClientEvent::MakeGuess { .. } => Some(ActionCategory::Guess),
        ClientEvent::Typing { .. } | ClientEvent::StopTyping { .. } => {
            Some(ActionCategory::Typing)
        }
        _ => None,
    }
}

/// Splits an in-room wire event into its routing code and the action the
/// room actor understands.
///
/// Only called for the in-room variants — the lobby-level events are
/// matched out by `dispatch` first.
fn into_room_action(event: ClientEvent) -> (RoomCode, PlayerAction) {
    match event {
        ClientEvent::StartGame {
            code,
            characters,
            settings,
        } => (
            code,
            PlayerAction::StartGame {
                characters,
                settings,
            },
        ),
        ClientEvent::SelectCharacter { code, character } => {
            (code, PlayerAction::SelectCharacter { character })
        }
        ClientEvent::SendMessage { code, text } => {
            (code, PlayerAction::SendMessage { text })
        }
        ClientEvent::Typing { code } => (code, PlayerAction::Typing),
        ClientEvent::StopTyping { code } => (code, PlayerAction::StopTyping),
        ClientEvent::MakeGuess { code, character } => {
            (code, PlayerAction::MakeGuess { character })
        }
        ClientEvent::EndTurn { code } => (code, PlayerAction::EndTurn),
        ClientEvent::RestartGame { code } => {
            (code, PlayerAction::RestartGame)
        }
        ClientEvent::UpdateEliminatedCount { code, count } => {
            (code, PlayerAction::UpdateEliminatedCount { count })
        }
        ClientEvent::CreateRoom { .. }
        | ClientEvent::JoinRoom { .. }
        | ClientEvent::LeaveRoom { .. }
        | ClientEvent::ReportUser { .. } => {
            unreachable!("lobby events are dispatched before this point")
        }
    }
}

/// Resolves the handle for an addressed room: the bound room when the
/// code matches, otherwise a registry lookup (whose seat check will
/// reject strangers).
async fn resolve_room<I, S, R, C>(
    state: &Arc<ServerState<I, S, R, C>>,
    binding: &RoomBinding,
    code: &RoomCode,
) -> Option<RoomHandle>
where
    I: IdentityProvider,
    S: StatsStore,
    R: ReportSink,
    C: Codec,
{
    if let Some(handle) = bound_room(binding) {
        if handle.code() == code {
            return Some(handle);
        }
    }
    state.registry.lock().await.get(code)
}

fn bound_room(binding: &RoomBinding) -> Option<RoomHandle> {
    binding.lock().expect("binding lock").clone()
}

/// Exchanges an optional auth token for a stable identity. `None` in,
/// `None` out: guests carry no identity.
async fn resolve_identity<I, S, R, C>(
    state: &Arc<ServerState<I, S, R, C>>,
    token: Option<String>,
) -> Result<Option<StableIdentity>, SessionError>
where
    I: IdentityProvider,
    S: StatsStore,
    R: ReportSink,
    C: Codec,
{
    match token {
        None => Ok(None),
        Some(token) => {
            let profile = state.identity.authenticate(&token).await?;
            Ok(Some(profile.identity))
        }
    }
}

/// Drains a player's outbound channel onto their socket. Lives until
/// the room drops the sender or the peer goes away.
fn spawn_forwarder<I, S, R, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<I, S, R, C>>,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<ServerEvent>,
) where
    I: IdentityProvider,
    S: StatsStore,
    R: ReportSink,
    C: Codec,
{
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let bytes = match state.codec.encode(&event) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode outbound event");
                    continue;
                }
            };
            if conn.send(&bytes).await.is_err() {
                break;
            }
        }
    });
}

/// Sends an `error` event to this caller only.
async fn send_error<I, S, R, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<I, S, R, C>>,
    reason: impl Into<String>,
) -> Result<(), ServerError>
where
    I: IdentityProvider,
    S: StatsStore,
    R: ReportSink,
    C: Codec,
{
    send_event(
        conn,
        state,
        &ServerEvent::Error {
            reason: reason.into(),
        },
    )
    .await
}

async fn send_event<I, S, R, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<I, S, R, C>>,
    event: &ServerEvent,
) -> Result<(), ServerError>
where
    I: IdentityProvider,
    S: StatsStore,
    R: ReportSink,
    C: Codec,
{
    let bytes = state.codec.encode(event)?;
    conn.send(&bytes).await.map_err(ServerError::Transport)
}
