//! Core protocol types for the faceoff wire format.
//!
//! Every type here either travels on the wire (serialized as JSON) or
//! addresses a recipient for an outbound event. Events are internally
//! tagged (`#[serde(tag = "type")]`, snake_case tags), so one frame is
//! one `{"type": "...", ...}` object — the same shape the original
//! browser client speaks, and the boundary where unknown tags and
//! missing fields are rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The server-assigned id of one live client connection.
///
/// A newtype over the transport's connection counter. This is a routing
/// handle, not an identity: a player who drops and rejoins is rebound to
/// a *new* `ClientId`, and persistent statistics are keyed by the stable
/// identity from the identity provider instead.
///
/// `#[serde(transparent)]` keeps the wire shape a plain number — a
/// `ClientId(42)` serializes as `42`, which is what the client compares
/// against the `id` fields in room snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A short human-typed room code: 6 uppercase alphanumerics.
///
/// Generated at room creation, collision-checked against the live
/// registry, and used as the routing key for every broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Length of a generated code.
    pub const LEN: usize = 6;

    /// Wraps a code as typed by a client or produced by the generator.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient — who should receive an outbound event?
// ---------------------------------------------------------------------------

/// Specifies who should receive a server event.
///
/// Room transitions return a list of `(Recipient, ServerEvent)` pairs;
/// the room actor delivers each according to this enum. Wrong-guess
/// results go to `Player(guesser)` only, typing indicators go to
/// `AllExcept(typist)`, most everything else goes to `All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every player in the room.
    All,
    /// One specific player.
    Player(ClientId),
    /// Everyone except the specified player.
    AllExcept(ClientId),
}

// ---------------------------------------------------------------------------
// Game data
// ---------------------------------------------------------------------------

/// One guessable character on the shared board.
///
/// The same set is shown to both players for the round. `image` is a URL
/// into the static asset collaborator (presets or uploads) — opaque to
/// the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: u32,
    pub name: String,
    pub image: String,
}

/// Per-round settings, fixed when the host starts selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameSettings {
    /// Turn time limit in seconds. `None` disables the turn timer.
    #[serde(default)]
    pub turn_time_limit_secs: Option<u64>,
    /// Maximum wrong guesses per player. `None` means unlimited.
    #[serde(default)]
    pub guess_limit: Option<u32>,
}

impl GameSettings {
    /// The turn time limit as a [`Duration`], if configured.
    pub fn turn_time_limit(&self) -> Option<Duration> {
        self.turn_time_limit_secs.map(Duration::from_secs)
    }
}

/// The room's game phase.
///
/// ```text
/// Lobby → Selecting → Playing → GameOver
///   ↑__________________________|   (restart)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lobby,
    Selecting,
    Playing,
    GameOver,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "lobby"),
            Self::Selecting => write!(f, "selecting"),
            Self::Playing => write!(f, "playing"),
            Self::GameOver => write!(f, "game_over"),
        }
    }
}

/// One entry in a room's append-only chat log.
///
/// `Message` entries pass through the profanity filter before storage;
/// `Divider` entries are system-generated ("time's up", "new round",
/// guess announcements) and bypass it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatEntry {
    Message {
        sender: ClientId,
        sender_name: String,
        text: String,
        timestamp: DateTime<Utc>,
    },
    Divider {
        text: String,
        timestamp: DateTime<Utc>,
    },
}

/// The outcome of a finished round. Present only in `Phase::GameOver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    /// The winning player's connection.
    pub winner: ClientId,
    /// The character the loser was hiding (revealed at game over).
    pub correct_character: Character,
    /// Why the game ended, when it wasn't a plain correct guess
    /// ("time ran out", "out of guesses", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Snapshots — the authoritative state fanned out to clients
// ---------------------------------------------------------------------------

/// One player as seen by everyone in the room.
///
/// Deliberately does NOT carry the secret character — only whether one
/// has been picked. The secret stays server-side until game over reveals
/// it through [`GameResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: ClientId,
    pub name: String,
    pub is_host: bool,
    pub ready: bool,
    pub connected: bool,
    pub has_selected: bool,
    /// Count of characters this player has flipped down, mirrored for
    /// the opponent's progress display.
    pub eliminated_count: u32,
    /// Wrong guesses this player has left, when a guess limit is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guesses_remaining: Option<u32>,
}

/// Full room state as broadcast to its participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub phase: Phase,
    pub players: Vec<PlayerSnapshot>,
    pub characters: Vec<Character>,
    pub settings: GameSettings,
    /// Index into `players` of whose move it is. Meaningful only while
    /// `phase == Playing`.
    pub turn: usize,
    /// Seconds left on the current turn, computed at snapshot time as
    /// `max(0, limit - elapsed)`. `None` when no timer is configured or
    /// the room isn't playing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_time_remaining_secs: Option<u64>,
    pub chat: Vec<ChatEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GameResult>,
}

// ---------------------------------------------------------------------------
// ClientEvent — inbound actions
// ---------------------------------------------------------------------------

/// Everything a client can ask the server to do.
///
/// One WebSocket frame decodes to exactly one of these. Unknown tags and
/// missing required fields fail decoding and never reach a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Open a fresh room and take the host seat.
    /// `identity` is an auth token for the external identity provider;
    /// absent means guest.
    CreateRoom {
        player_name: String,
        #[serde(default)]
        identity: Option<String>,
    },

    /// Join (or rejoin, within the grace window) an existing room.
    JoinRoom {
        code: RoomCode,
        player_name: String,
        #[serde(default)]
        identity: Option<String>,
    },

    /// Voluntarily leave, terminating the room for everyone.
    LeaveRoom { code: RoomCode },

    /// Host commits the character set and settings; moves the room to
    /// the selection phase.
    StartGame {
        code: RoomCode,
        characters: Vec<Character>,
        settings: GameSettings,
    },

    /// Pick a secret character for the opponent to guess.
    SelectCharacter { code: RoomCode, character: Character },

    /// Plain chat message (filtered before storage and broadcast).
    SendMessage { code: RoomCode, text: String },

    /// Typing indicator for the opponent's chat pane.
    Typing { code: RoomCode },
    StopTyping { code: RoomCode },

    /// Guess the opponent's secret character.
    MakeGuess { code: RoomCode, character: Character },

    /// Pass the turn without guessing.
    EndTurn { code: RoomCode },

    /// Back to the lobby for another round.
    RestartGame { code: RoomCode },

    /// Informational: how many characters this player has flipped down.
    UpdateEliminatedCount { code: RoomCode, count: u32 },

    /// Forwarded to the external moderation collaborator; no in-room
    /// effect.
    ReportUser {
        code: RoomCode,
        message: String,
        reporter_name: String,
    },
}

// ---------------------------------------------------------------------------
// ServerEvent — outbound events
// ---------------------------------------------------------------------------

/// Everything the server can tell a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Reply to the creator: the room exists and you're its host.
    RoomCreated { code: RoomCode, room: RoomSnapshot },

    /// Broadcast whenever room state changes without a phase-specific
    /// event of its own.
    RoomUpdated { room: RoomSnapshot },

    /// Broadcast when the host starts selection.
    GameStarted { room: RoomSnapshot },

    /// Broadcast when both players have selected and play begins.
    StartPlaying { room: RoomSnapshot },

    /// Broadcast when a round ends; `room.result` is populated.
    GameOver { room: RoomSnapshot },

    /// The room is gone (opponent quit, or the grace window expired).
    RoomTerminated { reason: String },

    /// One new chat entry (player message or system divider).
    ReceiveMessage { entry: ChatEntry },

    /// Opponent typing indicators.
    OpponentTyping,
    OpponentStopTyping,

    /// Sent only to the guesser after a wrong guess, so their client can
    /// flip the character down.
    GuessResult { is_correct: bool, character_id: u32 },

    /// An action was rejected; shown as a transient banner client-side.
    Error { reason: String },

    /// Persistent win/loss counters changed — re-fetch from the stats
    /// collaborator.
    StatsUpdated,
}

// =========================================================================
// Tests
// =========================================================================
