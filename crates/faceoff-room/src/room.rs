//! Room actor: an isolated Tokio task that owns one match.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel — no shared mutable state, just message
//! passing. That single queue linearizes everything that can touch a
//! room: two players acting at once, a turn timer firing while a guess
//! is in flight, a grace window expiring against a rejoin. The timers
//! are `select!` branches of the same loop, so their expiry is just
//! another serialized room event.

use std::collections::HashMap;
use std::sync::Arc;

use faceoff_protocol::{
    Character, ClientId, GameSettings, Phase, Recipient, RoomCode,
    RoomSnapshot, ServerEvent,
};
use faceoff_session::{StableIdentity, StatsStore};
use faceoff_timer::Countdown;
use tokio::sync::{mpsc, oneshot};

use crate::{
    DisconnectPolicy, GameState, Outcome, RoomConfig, RoomError, TimerOp,
};

/// Channel sender for delivering outbound events to a player's
/// connection handler.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// An in-room action by a seated player. The event router strips the
/// room code off the wire event and routes this to the right actor.
#[derive(Debug, Clone)]
pub enum PlayerAction {
    StartGame {
        characters: Vec<Character>,
        settings: GameSettings,
    },
    SelectCharacter {
        character: Character,
    },
    SendMessage {
        text: String,
    },
    Typing,
    StopTyping,
    MakeGuess {
        character: Character,
    },
    EndTurn,
    RestartGame,
    UpdateEliminatedCount {
        count: u32,
    },
}

/// Commands sent to a room actor through its channel.
///
/// Variants with a `oneshot::Sender` are request/response: the caller
/// awaits the reply so rejections can be reported to that caller only.
pub(crate) enum RoomCommand {
    /// Seat a player — or rebind a disconnected seat that matches.
    Join {
        client: ClientId,
        name: String,
        identity: Option<StableIdentity>,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Voluntary leave: terminates the room for everyone, immediately.
    Leave {
        client: ClientId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// A validated in-room action.
    Action {
        client: ClientId,
        action: PlayerAction,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// The transport saw this connection drop (not a voluntary leave).
    ConnectionLost { client: ClientId },

    /// Request the current room snapshot.
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },

    /// Shut down the room.
    Shutdown,
}

/// Handle to a running room actor. Cheap to clone — it's just an
/// `mpsc::Sender` wrapper. The registry holds one per room.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// The room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Whether the actor behind this handle has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Seats a player (or rebinds a matching disconnected seat).
    pub async fn join(
        &self,
        client: ClientId,
        name: String,
        identity: Option<StableIdentity>,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                client,
                name,
                identity,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Voluntary leave.
    pub async fn leave(&self, client: ClientId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                client,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Delivers an in-room action and awaits its accept/reject verdict.
    pub async fn action(
        &self,
        client: ClientId,
        action: PlayerAction,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Action {
                client,
                action,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Reports a dropped connection (fire-and-forget).
    pub async fn connection_lost(&self, client: ClientId) {
        let _ = self
            .sender
            .send(RoomCommand::ConnectionLost { client })
            .await;
    }

    /// Requests the current room snapshot.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

/// The internal room actor. Runs inside a Tokio task until the room
/// terminates.
struct RoomActor<S: StatsStore> {
    state: GameState,
    /// Per-player outbound channels, keyed by live connection.
    senders: HashMap<ClientId, PlayerSender>,
    policy: DisconnectPolicy,
    turn_timer: Countdown,
    grace_timer: Countdown,
    stats: Arc<S>,
    /// Guards against double-recording one round's result.
    stats_recorded: bool,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<S: StatsStore> RoomActor<S> {
    /// The actor loop. Commands, turn-timer expiry, and grace-window
    /// expiry are mutually exclusive branches — each iteration handles
    /// exactly one room event.
    async fn run(mut self) {
        tracing::info!(code = %self.state.code(), "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => {
                        if self.handle_command(cmd) {
                            break;
                        }
                    }
                    None => break,
                },
                _ = self.turn_timer.expired() => self.handle_turn_expiry(),
                _ = self.grace_timer.expired() => {
                    if self.handle_grace_expiry() {
                        break;
                    }
                }
            }
        }

        tracing::info!(code = %self.state.code(), "room actor stopped");
    }

    /// Returns `true` when the room should terminate.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                client,
                name,
                identity,
                sender,
                reply,
            } => {
                let result = self.handle_join(client, name, identity, sender);
                let _ = reply.send(result);
                false
            }
            RoomCommand::Leave { client, reply } => {
                match self.handle_leave(client) {
                    Ok(()) => {
                        let _ = reply.send(Ok(()));
                        true
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                        false
                    }
                }
            }
            RoomCommand::Action {
                client,
                action,
                reply,
            } => {
                let _ = reply.send(self.handle_action(client, action));
                false
            }
            RoomCommand::ConnectionLost { client } => {
                self.handle_connection_lost(client)
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot());
                false
            }
            RoomCommand::Shutdown => {
                tracing::info!(code = %self.state.code(), "room shutting down");
                true
            }
        }
    }

    fn handle_join(
        &mut self,
        client: ClientId,
        name: String,
        identity: Option<StableIdentity>,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        // Reconnection path first: a matching disconnected seat is
        // reclaimed with all round state intact, including any in-flight
        // turn timer.
        if let Some(seat) =
            self.state.find_reconnect_seat(&name, identity.as_ref())
        {
            let stale = self.state.players()[seat].client;
            self.senders.remove(&stale);
            self.senders.insert(client, sender);
            let outcome = self.state.rebind(seat, client);
            self.apply(outcome);

            // The pending destruction is cancelled; if the *other* seat
            // is still empty-handed, give it a fresh window.
            if self.state.any_disconnected() {
                if let DisconnectPolicy::Grace(window) = self.policy {
                    self.grace_timer.arm(window);
                }
            } else {
                self.grace_timer.disarm();
            }
            return Ok(());
        }

        self.state.join(client, name.clone(), identity)?;
        self.senders.insert(client, sender);
        tracing::info!(
            code = %self.state.code(),
            %client,
            name,
            players = self.state.players().len(),
            "player joined"
        );

        // The creator's own join needs no broadcast — the router replies
        // with room_created. Everyone hears about the second seat.
        if self.state.players().len() > 1 {
            self.broadcast(ServerEvent::RoomUpdated {
                room: self.state.snapshot(),
            });
        }
        Ok(())
    }

    fn handle_leave(&mut self, client: ClientId) -> Result<(), RoomError> {
        let player = self
            .state
            .players()
            .iter()
            .find(|p| p.client == client)
            .ok_or_else(|| RoomError::NotInRoom(self.state.code().clone()))?;

        let name = player.name.clone();
        tracing::info!(
            code = %self.state.code(),
            %client,
            name,
            "player left, terminating room"
        );
        self.broadcast(ServerEvent::RoomTerminated {
            reason: format!("{name} has quit the game."),
        });
        Ok(())
    }

    fn handle_action(
        &mut self,
        client: ClientId,
        action: PlayerAction,
    ) -> Result<(), RoomError> {
        let outcome = match action {
            PlayerAction::StartGame {
                characters,
                settings,
            } => self.state.start_game(client, characters, settings)?,
            PlayerAction::SelectCharacter { character } => {
                self.state.select_character(client, character)?
            }
            PlayerAction::SendMessage { text } => {
                self.state.chat_message(client, text)?
            }
            PlayerAction::Typing => self.state.typing(client, false)?,
            PlayerAction::StopTyping => self.state.typing(client, true)?,
            PlayerAction::MakeGuess { character } => {
                self.state.make_guess(client, character)?
            }
            PlayerAction::EndTurn => self.state.end_turn(client)?,
            PlayerAction::RestartGame => self.state.restart(client)?,
            PlayerAction::UpdateEliminatedCount { count } => {
                self.state.set_eliminated_count(client, count)?
            }
        };
        self.apply(outcome);

        if self.state.phase() == Phase::GameOver {
            self.record_result();
        } else {
            self.stats_recorded = false;
        }
        Ok(())
    }

    /// Returns `true` when the room should terminate (immediate policy).
    fn handle_connection_lost(&mut self, client: ClientId) -> bool {
        let Some(outcome) = self.state.connection_lost(client) else {
            return false;
        };
        self.senders.remove(&client);
        self.apply(outcome);

        match self.policy {
            DisconnectPolicy::Immediate => {
                let name = self
                    .state
                    .players()
                    .iter()
                    .find(|p| p.client == client)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                self.broadcast(ServerEvent::RoomTerminated {
                    reason: format!("{name} has disconnected."),
                });
                true
            }
            DisconnectPolicy::Grace(window) => {
                self.grace_timer.arm(window);
                false
            }
        }
    }

    fn handle_turn_expiry(&mut self) {
        let outcome = self.state.timeout_turn();
        self.apply(outcome);
    }

    /// Returns `true` when the room should terminate.
    fn handle_grace_expiry(&mut self) -> bool {
        if !self.state.any_disconnected() {
            return false;
        }
        let missing: Vec<&str> = self
            .state
            .players()
            .iter()
            .filter(|p| !p.connected)
            .map(|p| p.name.as_str())
            .collect();
        tracing::info!(
            code = %self.state.code(),
            missing = missing.join(", "),
            "grace period expired, terminating room"
        );
        self.broadcast(ServerEvent::RoomTerminated {
            reason: format!(
                "{} did not reconnect in time.",
                missing.join(", ")
            ),
        });
        true
    }

    /// Applies a transition outcome: the timer directive first, then the
    /// outbound events.
    fn apply(&mut self, outcome: Outcome) {
        match outcome.timer {
            TimerOp::Keep => {}
            TimerOp::Arm => match self.state.settings().turn_time_limit() {
                Some(limit) => self.turn_timer.arm(limit),
                None => self.turn_timer.disarm(),
            },
            TimerOp::Disarm => self.turn_timer.disarm(),
        }
        for (recipient, event) in outcome.messages {
            self.dispatch(recipient, event);
        }
    }

    fn dispatch(&self, recipient: Recipient, event: ServerEvent) {
        match recipient {
            Recipient::All => self.broadcast(event),
            Recipient::Player(client) => self.send_to(client, event),
            Recipient::AllExcept(excluded) => {
                for client in self.senders.keys() {
                    if *client != excluded {
                        self.send_to(*client, event.clone());
                    }
                }
            }
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        for client in self.senders.keys() {
            self.send_to(*client, event.clone());
        }
    }

    /// Silently drops if the receiver is gone (connection died; the
    /// ConnectionLost command is on its way).
    fn send_to(&self, client: ClientId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&client) {
            let _ = sender.send(event);
        }
    }

    /// Records the finished round with the stats collaborator,
    /// fire-and-forget, once per round, for players with a stable
    /// identity. Guests have no durable record.
    fn record_result(&mut self) {
        if self.stats_recorded {
            return;
        }
        let Some(result) = self.state.result() else {
            return;
        };
        self.stats_recorded = true;

        let winner = result.winner;
        let mut any_recorded = false;
        for player in self.state.players() {
            let Some(identity) = player.identity.clone() else {
                continue;
            };
            any_recorded = true;
            let won = player.client == winner;
            let stats = Arc::clone(&self.stats);
            let code = self.state.code().clone();
            tokio::spawn(async move {
                let outcome = if won {
                    stats.record_win(&identity).await
                } else {
                    stats.record_loss(&identity).await
                };
                if let Err(e) = outcome {
                    tracing::warn!(
                        %code, %identity, error = %e,
                        "failed to record round result"
                    );
                }
            });
        }

        if any_recorded {
            self.broadcast(ServerEvent::StatsUpdated);
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
pub(crate) fn spawn_room<S: StatsStore>(
    code: RoomCode,
    config: RoomConfig,
    stats: Arc<S>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer);

    let actor = RoomActor {
        state: GameState::new(code.clone()),
        senders: HashMap::new(),
        policy: config.disconnect_policy,
        turn_timer: Countdown::new(),
        grace_timer: Countdown::new(),
        stats,
        stats_recorded: false,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
