//! The room aggregate and its state machine.
//!
//! `GameState` is deliberately synchronous and pure: every transition is
//! a plain method that validates, mutates, and returns the outbound
//! events plus a turn-timer directive. The actor in `room.rs` owns the
//! side effects (channels, timers, stats); everything that makes the
//! game *the game* lives here, where it can be unit-tested without a
//! runtime.
//!
//! ```text
//! Lobby --start_game(host)--> Selecting --both selected--> Playing
//!                                                             |
//!                       +--- correct guess / guesses exhausted +
//!                       v                                      |
//!                    GameOver --restart--> Lobby <---restart---+
//! ```

use std::time::Instant;

use chrono::Utc;
use faceoff_protocol::{
    Character, ChatEntry, ClientId, GameResult, GameSettings, Phase,
    PlayerSnapshot, Recipient, RoomCode, RoomSnapshot, ServerEvent, filter,
};
use faceoff_session::StableIdentity;

use crate::RoomError;

/// Seats per room. Index 0 is the host and, on the first round, first to
/// move.
pub const MAX_PLAYERS: usize = 2;

/// One participant's seat.
#[derive(Debug, Clone)]
pub struct Player {
    /// Current live connection. Rebound on reconnection — never a
    /// stable identity.
    pub client: ClientId,
    /// Durable identity for stats linking; `None` for guests.
    pub identity: Option<StableIdentity>,
    pub name: String,
    pub is_host: bool,
    /// Chosen once per round, then immutable until restart.
    pub secret_character: Option<Character>,
    pub ready: bool,
    pub connected: bool,
    /// Client-tracked eliminations, mirrored for the opponent display.
    pub eliminated_count: u32,
    /// Wrong guesses left, when the round has a guess limit.
    pub guesses_remaining: Option<u32>,
}

impl Player {
    fn new(
        client: ClientId,
        name: String,
        identity: Option<StableIdentity>,
        is_host: bool,
    ) -> Self {
        Self {
            client,
            identity,
            name,
            is_host,
            secret_character: None,
            ready: false,
            connected: true,
            eliminated_count: 0,
            guesses_remaining: None,
        }
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.client,
            name: self.name.clone(),
            is_host: self.is_host,
            ready: self.ready,
            connected: self.connected,
            has_selected: self.secret_character.is_some(),
            eliminated_count: self.eliminated_count,
            guesses_remaining: self.guesses_remaining,
        }
    }
}

/// What a transition wants done with the room's turn timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOp {
    /// Leave the timer as it is.
    Keep,
    /// (Re-)arm for the configured turn limit. Emitted only by
    /// transitions that changed the turn while a limit is configured.
    Arm,
    /// Cancel any pending expiry.
    Disarm,
}

/// The result of a successful transition: events to deliver and a timer
/// directive for the actor to apply.
#[derive(Debug)]
pub struct Outcome {
    pub messages: Vec<(Recipient, ServerEvent)>,
    pub timer: TimerOp,
}

impl Outcome {
    fn new(timer: TimerOp) -> Self {
        Self {
            messages: Vec::new(),
            timer,
        }
    }

    fn with(mut self, to: Recipient, event: ServerEvent) -> Self {
        self.messages.push((to, event));
        self
    }
}

/// One room's entire mutable state.
#[derive(Debug)]
pub struct GameState {
    code: RoomCode,
    players: Vec<Player>,
    phase: Phase,
    characters: Vec<Character>,
    settings: GameSettings,
    /// Index into `players`; meaningful only while `Playing`.
    turn: usize,
    /// Set whenever the turn changes; `Some` iff `Playing`.
    turn_started_at: Option<Instant>,
    /// Append-only; never truncated during a session.
    chat: Vec<ChatEntry>,
    result: Option<GameResult>,
    /// Which seat opened the previous round. `None` until the first
    /// round starts; drives the restart-alternation fairness rule.
    last_first_player: Option<usize>,
}

impl GameState {
    /// Creates an empty room in the lobby phase.
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            players: Vec::new(),
            phase: Phase::Lobby,
            characters: Vec::new(),
            settings: GameSettings::default(),
            turn: 0,
            turn_started_at: None,
            chat: Vec::new(),
            result: None,
            last_first_player: None,
        }
    }

    // -- Accessors --------------------------------------------------------

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    pub fn chat(&self) -> &[ChatEntry] {
        &self.chat
    }

    /// When the current turn started. `Some` iff `Playing`.
    pub fn turn_started_at(&self) -> Option<Instant> {
        self.turn_started_at
    }

    /// The serializable projection broadcast to clients. Remaining turn
    /// time is computed here, on demand, never stored.
    pub fn snapshot(&self) -> RoomSnapshot {
        let turn_time_remaining_secs = match (
            self.phase,
            self.settings.turn_time_limit(),
            self.turn_started_at,
        ) {
            (Phase::Playing, Some(limit), Some(started)) => {
                Some(faceoff_timer::remaining(limit, started).as_secs())
            }
            _ => None,
        };

        RoomSnapshot {
            code: self.code.clone(),
            phase: self.phase,
            players: self.players.iter().map(Player::snapshot).collect(),
            characters: self.characters.clone(),
            settings: self.settings,
            turn: self.turn,
            turn_time_remaining_secs,
            chat: self.chat.clone(),
            result: self.result.clone(),
        }
    }

    // -- Seat management --------------------------------------------------

    /// Seats a new player. The first player in becomes host.
    pub fn join(
        &mut self,
        client: ClientId,
        name: String,
        identity: Option<StableIdentity>,
    ) -> Result<(), RoomError> {
        if self.players.len() >= MAX_PLAYERS {
            return Err(RoomError::RoomFull(self.code.clone()));
        }
        let is_host = self.players.is_empty();
        self.players.push(Player::new(client, name, identity, is_host));
        Ok(())
    }

    /// Finds the seat a dropped player may reclaim: same stable
    /// identity, or — for guests — same display name, in both cases only
    /// while that seat is marked disconnected.
    pub fn find_reconnect_seat(
        &self,
        name: &str,
        identity: Option<&StableIdentity>,
    ) -> Option<usize> {
        if let Some(id) = identity {
            if let Some(seat) = self
                .players
                .iter()
                .position(|p| !p.connected && p.identity.as_ref() == Some(id))
            {
                return Some(seat);
            }
        }
        self.players
            .iter()
            .position(|p| !p.connected && p.identity.is_none() && p.name == name)
    }

    /// Rebinds a reclaimed seat to a new live connection. Everything
    /// else about the seat — secret, readiness, guesses — is untouched.
    pub fn rebind(&mut self, seat: usize, client: ClientId) -> Outcome {
        let player = &mut self.players[seat];
        player.client = client;
        player.connected = true;
        tracing::info!(code = %self.code, %client, seat, "player reconnected");

        Outcome::new(TimerOp::Keep).with(
            Recipient::All,
            ServerEvent::RoomUpdated {
                room: self.snapshot(),
            },
        )
    }

    /// Marks a dropped player disconnected. Returns `None` if the
    /// connection wasn't seated here.
    pub fn connection_lost(&mut self, client: ClientId) -> Option<Outcome> {
        let player = self.players.iter_mut().find(|p| p.client == client)?;
        player.connected = false;
        tracing::info!(code = %self.code, %client, "player disconnected");

        Some(Outcome::new(TimerOp::Keep).with(
            Recipient::All,
            ServerEvent::RoomUpdated {
                room: self.snapshot(),
            },
        ))
    }

    /// Whether any seat is currently marked disconnected.
    pub fn any_disconnected(&self) -> bool {
        self.players.iter().any(|p| !p.connected)
    }

    // -- Transitions ------------------------------------------------------

    /// `Lobby → Selecting`. Host only; requires a non-empty character
    /// set. Settings are fixed for the round from here on.
    pub fn start_game(
        &mut self,
        actor: ClientId,
        characters: Vec<Character>,
        settings: GameSettings,
    ) -> Result<Outcome, RoomError> {
        let seat = self.seat_of(actor)?;
        if !self.players[seat].is_host {
            return Err(RoomError::Unauthorized(
                "only the host can start the game".into(),
            ));
        }
        if self.phase != Phase::Lobby {
            return Err(RoomError::Unauthorized(format!(
                "cannot start from the {} phase",
                self.phase
            )));
        }
        if characters.is_empty() {
            return Err(RoomError::Malformed(
                "character set must not be empty".into(),
            ));
        }

        self.characters = characters;
        self.settings = settings;
        self.phase = Phase::Selecting;
        tracing::info!(code = %self.code, ?settings, "selection started");

        Ok(Outcome::new(TimerOp::Keep).with(
            Recipient::All,
            ServerEvent::GameStarted {
                room: self.snapshot(),
            },
        ))
    }

    /// `Selecting → Selecting | Playing`. Locks in the acting player's
    /// secret; when the second player locks in, play begins with the
    /// starting seat alternated from the previous round.
    pub fn select_character(
        &mut self,
        actor: ClientId,
        character: Character,
    ) -> Result<Outcome, RoomError> {
        let seat = self.seat_of(actor)?;
        if self.phase != Phase::Selecting {
            return Err(RoomError::Unauthorized(
                "characters can only be picked during selection".into(),
            ));
        }
        if self.players[seat].ready {
            return Err(RoomError::Unauthorized(
                "secret character is already locked in".into(),
            ));
        }

        let player = &mut self.players[seat];
        player.secret_character = Some(character);
        player.ready = true;

        let everyone_ready = self.players.len() == MAX_PLAYERS
            && self.players.iter().all(|p| p.ready);
        if !everyone_ready {
            return Ok(Outcome::new(TimerOp::Keep).with(
                Recipient::All,
                ServerEvent::RoomUpdated {
                    room: self.snapshot(),
                },
            ));
        }

        // Both locked in: start playing. The first round seats 0 first;
        // every later round alternates from whoever opened the last one.
        let first = match self.last_first_player {
            None => 0,
            Some(prev) => (prev + 1) % MAX_PLAYERS,
        };
        self.last_first_player = Some(first);
        self.turn = first;
        self.turn_started_at = Some(Instant::now());
        self.phase = Phase::Playing;
        for p in &mut self.players {
            p.guesses_remaining = self.settings.guess_limit;
        }
        tracing::info!(code = %self.code, first, "round started");

        let timer = if self.settings.turn_time_limit().is_some() {
            TimerOp::Arm
        } else {
            TimerOp::Keep
        };
        Ok(Outcome::new(timer).with(
            Recipient::All,
            ServerEvent::StartPlaying {
                room: self.snapshot(),
            },
        ))
    }

    /// `Playing → Playing`. Only the active player may pass the turn.
    pub fn end_turn(&mut self, actor: ClientId) -> Result<Outcome, RoomError> {
        self.require_active_player(actor)?;

        self.advance_turn();

        Ok(Outcome::new(self.rearm_op()).with(
            Recipient::All,
            ServerEvent::RoomUpdated {
                room: self.snapshot(),
            },
        ))
    }

    /// Turn-timer expiry: like [`end_turn`](Self::end_turn) but
    /// system-attributed, with a divider naming the new active player.
    /// Not player-initiated, so it can't be unauthorized — but it can
    /// race a game-ending action, in which case it's a no-op.
    pub fn timeout_turn(&mut self) -> Outcome {
        if self.phase != Phase::Playing {
            return Outcome::new(TimerOp::Disarm);
        }

        self.advance_turn();
        let entry = self.push_divider(format!(
            "Time's up! It's {}'s turn now.",
            self.players[self.turn].name
        ));
        tracing::info!(code = %self.code, turn = self.turn, "turn timed out");

        Outcome::new(self.rearm_op())
            .with(Recipient::All, ServerEvent::ReceiveMessage { entry })
            .with(
                Recipient::All,
                ServerEvent::RoomUpdated {
                    room: self.snapshot(),
                },
            )
    }

    /// `Playing → Playing | GameOver`. Only the active player may guess.
    /// Correctness is name equality against the opponent's secret — the
    /// same named character may be a different object client-side.
    pub fn make_guess(
        &mut self,
        actor: ClientId,
        character: Character,
    ) -> Result<Outcome, RoomError> {
        let seat = self.require_active_player(actor)?;
        let opponent = (seat + 1) % MAX_PLAYERS;

        // Playing implies both players locked a secret in.
        let secret = self.players[opponent]
            .secret_character
            .clone()
            .expect("secret set while playing");

        if character.name == secret.name {
            self.phase = Phase::GameOver;
            self.result = Some(GameResult {
                winner: actor,
                correct_character: secret,
                reason: None,
            });
            self.turn_started_at = None;
            tracing::info!(code = %self.code, winner = %actor, "correct guess");

            return Ok(Outcome::new(TimerOp::Disarm).with(
                Recipient::All,
                ServerEvent::GameOver {
                    room: self.snapshot(),
                },
            ));
        }

        // Wrong guess: only the guesser learns which card to flip; both
        // players see the divider.
        let mut outcome = Outcome::new(TimerOp::Keep).with(
            Recipient::Player(actor),
            ServerEvent::GuessResult {
                is_correct: false,
                character_id: character.id,
            },
        );
        let entry = self.push_divider(format!(
            "{} guessed {}",
            self.players[seat].name, character.name
        ));
        outcome = outcome
            .with(Recipient::All, ServerEvent::ReceiveMessage { entry });

        if let Some(remaining) = self.players[seat].guesses_remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                let loser_name = self.players[seat].name.clone();
                self.phase = Phase::GameOver;
                self.result = Some(GameResult {
                    winner: self.players[opponent].client,
                    correct_character: secret,
                    reason: Some(format!("{loser_name} ran out of guesses")),
                });
                self.turn_started_at = None;
                tracing::info!(code = %self.code, "guesses exhausted");

                outcome.timer = TimerOp::Disarm;
                return Ok(outcome.with(
                    Recipient::All,
                    ServerEvent::GameOver {
                        room: self.snapshot(),
                    },
                ));
            }
        }

        self.advance_turn();
        outcome.timer = self.rearm_op();
        Ok(outcome.with(
            Recipient::All,
            ServerEvent::RoomUpdated {
                room: self.snapshot(),
            },
        ))
    }

    /// `Playing | GameOver → Lobby`. Any participant may trigger.
    /// Clears everything round-scoped but preserves the chat log and the
    /// fairness counter for the next round's starting-seat alternation.
    pub fn restart(&mut self, actor: ClientId) -> Result<Outcome, RoomError> {
        self.seat_of(actor)?;
        if !matches!(self.phase, Phase::Playing | Phase::GameOver) {
            return Err(RoomError::Unauthorized(format!(
                "cannot restart from the {} phase",
                self.phase
            )));
        }

        self.phase = Phase::Lobby;
        self.characters.clear();
        self.settings = GameSettings::default();
        self.result = None;
        self.turn = 0;
        self.turn_started_at = None;
        for p in &mut self.players {
            p.secret_character = None;
            p.ready = false;
            p.eliminated_count = 0;
            p.guesses_remaining = None;
        }
        let entry = self.push_divider("New Round Started".into());
        tracing::info!(code = %self.code, "room restarted");

        Ok(Outcome::new(TimerOp::Disarm)
            .with(Recipient::All, ServerEvent::ReceiveMessage { entry })
            .with(
                Recipient::All,
                ServerEvent::RoomUpdated {
                    room: self.snapshot(),
                },
            ))
    }

    /// Appends a player chat message, redacted before storage and
    /// broadcast.
    pub fn chat_message(
        &mut self,
        actor: ClientId,
        text: String,
    ) -> Result<Outcome, RoomError> {
        let seat = self.seat_of(actor)?;
        let entry = ChatEntry::Message {
            sender: actor,
            sender_name: self.players[seat].name.clone(),
            text: filter::redact(&text),
            timestamp: Utc::now(),
        };
        self.chat.push(entry.clone());

        Ok(Outcome::new(TimerOp::Keep)
            .with(Recipient::All, ServerEvent::ReceiveMessage { entry }))
    }

    /// Typing indicators: relayed to the opponent, never stored.
    pub fn typing(
        &mut self,
        actor: ClientId,
        stopped: bool,
    ) -> Result<Outcome, RoomError> {
        self.seat_of(actor)?;
        let event = if stopped {
            ServerEvent::OpponentStopTyping
        } else {
            ServerEvent::OpponentTyping
        };
        Ok(Outcome::new(TimerOp::Keep)
            .with(Recipient::AllExcept(actor), event))
    }

    /// Informational elimination-count mirror for the opponent display.
    pub fn set_eliminated_count(
        &mut self,
        actor: ClientId,
        count: u32,
    ) -> Result<Outcome, RoomError> {
        let seat = self.seat_of(actor)?;
        self.players[seat].eliminated_count = count;

        Ok(Outcome::new(TimerOp::Keep).with(
            Recipient::All,
            ServerEvent::RoomUpdated {
                room: self.snapshot(),
            },
        ))
    }

    // -- Internals --------------------------------------------------------

    fn seat_of(&self, client: ClientId) -> Result<usize, RoomError> {
        self.players
            .iter()
            .position(|p| p.client == client)
            .ok_or_else(|| RoomError::NotInRoom(self.code.clone()))
    }

    /// Guards turn-gated actions: must be `Playing` and the actor must
    /// hold the current turn. Returns the actor's seat.
    fn require_active_player(
        &self,
        actor: ClientId,
    ) -> Result<usize, RoomError> {
        let seat = self.seat_of(actor)?;
        if self.phase != Phase::Playing {
            return Err(RoomError::Unauthorized(
                "the round is not in play".into(),
            ));
        }
        if seat != self.turn {
            return Err(RoomError::Unauthorized("not your turn".into()));
        }
        Ok(seat)
    }

    fn advance_turn(&mut self) {
        self.turn = (self.turn + 1) % self.players.len();
        self.turn_started_at = Some(Instant::now());
    }

    /// Arm on turn change only when a limit is configured.
    fn rearm_op(&self) -> TimerOp {
        if self.settings.turn_time_limit().is_some() {
            TimerOp::Arm
        } else {
            TimerOp::Keep
        }
    }

    fn push_divider(&mut self, text: String) -> ChatEntry {
        let entry = ChatEntry::Divider {
            text,
            timestamp: Utc::now(),
        };
        self.chat.push(entry.clone());
        entry
    }
}

// =========================================================================
// Tests
// =========================================================================
