//! Full-stack integration tests: a real server, real WebSocket clients,
//! JSON frames on the wire.
//!
//! Each test boots a server on an ephemeral port with the development
//! collaborators and drives it the way the browser client does.

use std::sync::Arc;
use std::time::Duration;

use faceoff::FaceoffServerBuilder;
use faceoff_protocol::{
    Character, ChatEntry, ClientEvent, GameSettings, Phase, RoomCode,
    RoomSnapshot, ServerEvent,
};
use faceoff_session::{GuestTokens, InMemoryStats, LogReportSink};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

// =========================================================================
// Helpers
// =========================================================================

async fn start() -> String {
    let server = FaceoffServerBuilder::new()
        .bind("127.0.0.1:0")
        .build(GuestTokens, Arc::new(InMemoryStats::new()), LogReportSink)
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn ws(addr: &str) -> Ws {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("client should connect");
    ws
}

fn enc(event: &ClientEvent) -> Message {
    Message::Binary(serde_json::to_vec(event).unwrap().into())
}

async fn send(ws: &mut Ws, event: &ClientEvent) {
    ws.send(enc(event)).await.expect("send should succeed");
}

async fn recv(ws: &mut Ws) -> ServerEvent {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for event")
        .expect("stream ended")
        .expect("websocket error");
    serde_json::from_slice(&msg.into_data()).expect("valid server event")
}

fn character(id: u32, name: &str) -> Character {
    Character {
        id,
        name: name.into(),
        image: format!("/presets/{name}.png"),
    }
}

fn roster() -> Vec<Character> {
    (1..=16)
        .map(|i| character(i, &format!("Person {i}")))
        .collect()
}

/// Creates a room as `name`; returns the code and the creation snapshot.
async fn create_room(ws: &mut Ws, name: &str) -> (RoomCode, RoomSnapshot) {
    send(
        ws,
        &ClientEvent::CreateRoom {
            player_name: name.into(),
            identity: None,
        },
    )
    .await;
    let ServerEvent::RoomCreated { code, room } = recv(ws).await else {
        panic!("expected room_created");
    };
    (code, room)
}

/// Host + guest seated in one room; seating broadcasts drained.
async fn seated_pair(addr: &str) -> (Ws, Ws, RoomCode) {
    let mut host = ws(addr).await;
    let (code, _) = create_room(&mut host, "alice").await;

    let mut guest = ws(addr).await;
    send(
        &mut guest,
        &ClientEvent::JoinRoom {
            code: code.clone(),
            player_name: "bob".into(),
            identity: None,
        },
    )
    .await;
    assert!(matches!(
        recv(&mut guest).await,
        ServerEvent::RoomUpdated { .. }
    ));
    assert!(matches!(
        recv(&mut host).await,
        ServerEvent::RoomUpdated { .. }
    ));
    (host, guest, code)
}

/// Drives a seated pair into `Playing`; drains every transition event.
/// Alice hides "Person 1", bob hides "Person 2"; seat 0 (alice) opens.
async fn start_round(
    host: &mut Ws,
    guest: &mut Ws,
    code: &RoomCode,
    settings: GameSettings,
) -> RoomSnapshot {
    send(
        host,
        &ClientEvent::StartGame {
            code: code.clone(),
            characters: roster(),
            settings,
        },
    )
    .await;
    assert!(matches!(recv(host).await, ServerEvent::GameStarted { .. }));
    assert!(matches!(recv(guest).await, ServerEvent::GameStarted { .. }));

    // The host's start and select are both game actions: wait out the
    // 500ms cooldown so the select isn't dropped as a duplicate click.
    tokio::time::sleep(Duration::from_millis(550)).await;

    send(
        host,
        &ClientEvent::SelectCharacter {
            code: code.clone(),
            character: character(1, "Person 1"),
        },
    )
    .await;
    assert!(matches!(recv(host).await, ServerEvent::RoomUpdated { .. }));
    assert!(matches!(recv(guest).await, ServerEvent::RoomUpdated { .. }));

    send(
        guest,
        &ClientEvent::SelectCharacter {
            code: code.clone(),
            character: character(2, "Person 2"),
        },
    )
    .await;
    let ServerEvent::StartPlaying { room } = recv(host).await else {
        panic!("expected start_playing");
    };
    assert!(matches!(
        recv(guest).await,
        ServerEvent::StartPlaying { .. }
    ));
    room
}

// =========================================================================
// Room creation and seating
// =========================================================================

#[tokio::test]
async fn test_create_room_solo_host_in_lobby() {
    let addr = start().await;
    let mut host = ws(&addr).await;

    let (code, room) = create_room(&mut host, "alice").await;

    assert_eq!(code.as_str().len(), 6);
    assert!(code
        .as_str()
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    assert_eq!(room.phase, Phase::Lobby);
    assert_eq!(room.players.len(), 1);
    assert!(room.players[0].is_host);
    assert_eq!(room.players[0].name, "alice");
}

#[tokio::test]
async fn test_join_updates_both_players() {
    let addr = start().await;
    let mut host = ws(&addr).await;
    let (code, _) = create_room(&mut host, "alice").await;

    let mut guest = ws(&addr).await;
    send(
        &mut guest,
        &ClientEvent::JoinRoom {
            code,
            player_name: "bob".into(),
            identity: None,
        },
    )
    .await;

    for ws in [&mut host, &mut guest] {
        let ServerEvent::RoomUpdated { room } = recv(ws).await else {
            panic!("expected room_updated");
        };
        assert_eq!(room.players.len(), 2);
        assert_eq!(room.players[1].name, "bob");
        assert!(!room.players[1].is_host);
    }
}

#[tokio::test]
async fn test_join_unknown_code_errors_caller_only() {
    let addr = start().await;
    let mut client = ws(&addr).await;

    send(
        &mut client,
        &ClientEvent::JoinRoom {
            code: RoomCode::new("NOSUCH"),
            player_name: "bob".into(),
            identity: None,
        },
    )
    .await;

    let ServerEvent::Error { reason } = recv(&mut client).await else {
        panic!("expected error");
    };
    assert!(reason.contains("not found"));
}

#[tokio::test]
async fn test_join_full_room_errors() {
    let addr = start().await;
    let (_host, _guest, code) = seated_pair(&addr).await;

    let mut third = ws(&addr).await;
    send(
        &mut third,
        &ClientEvent::JoinRoom {
            code,
            player_name: "carol".into(),
            identity: None,
        },
    )
    .await;

    let ServerEvent::Error { reason } = recv(&mut third).await else {
        panic!("expected error");
    };
    assert!(reason.contains("full"));
}

#[tokio::test]
async fn test_malformed_frame_errors_without_killing_connection() {
    let addr = start().await;
    let mut client = ws(&addr).await;

    client
        .send(Message::Text(r#"{"type":"fly_to_moon"}"#.into()))
        .await
        .unwrap();
    let ServerEvent::Error { reason } = recv(&mut client).await else {
        panic!("expected error");
    };
    assert!(reason.contains("malformed"));

    // The connection still works.
    let (_, room) = create_room(&mut client, "alice").await;
    assert_eq!(room.phase, Phase::Lobby);
}

// =========================================================================
// The round itself
// =========================================================================

#[tokio::test]
async fn test_full_round_to_game_over() {
    let addr = start().await;
    let (mut host, mut guest, code) = seated_pair(&addr).await;

    let room =
        start_round(&mut host, &mut guest, &code, GameSettings::default())
            .await;
    assert_eq!(room.phase, Phase::Playing);
    assert!(room.turn < 2);
    assert_eq!(room.characters.len(), 16);
    let host_id = room.players[0].id;

    // Bob tries to guess out of turn: rejected, caller only.
    send(
        &mut guest,
        &ClientEvent::MakeGuess {
            code: code.clone(),
            character: character(1, "Person 1"),
        },
    )
    .await;
    let ServerEvent::Error { reason } = recv(&mut guest).await else {
        panic!("expected error");
    };
    assert!(reason.contains("turn"));

    // Alice guesses bob's secret: game over, alice wins, timer-free.
    send(
        &mut host,
        &ClientEvent::MakeGuess {
            code: code.clone(),
            character: character(2, "Person 2"),
        },
    )
    .await;
    for ws in [&mut host, &mut guest] {
        let ServerEvent::GameOver { room } = recv(ws).await else {
            panic!("expected game_over");
        };
        assert_eq!(room.phase, Phase::GameOver);
        let result = room.result.expect("result present");
        assert_eq!(result.winner, host_id);
        assert_eq!(result.correct_character.name, "Person 2");
    }
}

#[tokio::test]
async fn test_wrong_guess_result_goes_to_guesser_only() {
    let addr = start().await;
    let (mut host, mut guest, code) = seated_pair(&addr).await;
    start_round(&mut host, &mut guest, &code, GameSettings::default())
        .await;

    send(
        &mut host,
        &ClientEvent::MakeGuess {
            code: code.clone(),
            character: character(9, "Person 9"),
        },
    )
    .await;

    // Guesser: guess_result, then the divider, then the turn change.
    assert!(matches!(
        recv(&mut host).await,
        ServerEvent::GuessResult {
            is_correct: false,
            character_id: 9
        }
    ));
    assert!(matches!(
        recv(&mut host).await,
        ServerEvent::ReceiveMessage {
            entry: ChatEntry::Divider { .. }
        }
    ));
    let ServerEvent::RoomUpdated { room } = recv(&mut host).await else {
        panic!("expected room_updated");
    };
    assert_eq!(room.turn, 1);

    // Opponent: never a guess_result — divider first.
    assert!(matches!(
        recv(&mut guest).await,
        ServerEvent::ReceiveMessage {
            entry: ChatEntry::Divider { .. }
        }
    ));
    assert!(matches!(
        recv(&mut guest).await,
        ServerEvent::RoomUpdated { .. }
    ));
}

#[tokio::test]
async fn test_guess_limit_exhaustion_ends_round() {
    let addr = start().await;
    let (mut host, mut guest, code) = seated_pair(&addr).await;
    let room = start_round(
        &mut host,
        &mut guest,
        &code,
        GameSettings {
            turn_time_limit_secs: None,
            guess_limit: Some(1),
        },
    )
    .await;
    let guest_id = room.players[1].id;

    send(
        &mut host,
        &ClientEvent::MakeGuess {
            code: code.clone(),
            character: character(9, "Person 9"),
        },
    )
    .await;

    assert!(matches!(
        recv(&mut host).await,
        ServerEvent::GuessResult { .. }
    ));
    assert!(matches!(
        recv(&mut host).await,
        ServerEvent::ReceiveMessage { .. }
    ));
    let ServerEvent::GameOver { room } = recv(&mut host).await else {
        panic!("expected game_over");
    };
    let result = room.result.expect("result present");
    assert_eq!(result.winner, guest_id);
    assert!(result.reason.unwrap().contains("guesses"));
}

#[tokio::test]
async fn test_turn_timer_expiry_force_advances_the_turn() {
    let addr = start().await;
    let (mut host, mut guest, code) = seated_pair(&addr).await;
    start_round(
        &mut host,
        &mut guest,
        &code,
        GameSettings {
            turn_time_limit_secs: Some(1),
            guess_limit: None,
        },
    )
    .await;

    // Nobody acts. After the limit the server force-advances the turn
    // with a system divider naming the new active player.
    let ServerEvent::ReceiveMessage {
        entry: ChatEntry::Divider { text, .. },
    } = recv(&mut guest).await
    else {
        panic!("expected the time's-up divider");
    };
    assert!(text.contains("Time's up"));
    assert!(text.contains("bob"));

    let ServerEvent::RoomUpdated { room } = recv(&mut guest).await else {
        panic!("expected room_updated");
    };
    assert_eq!(room.turn, 1);
    assert_eq!(room.phase, Phase::Playing);
}

// =========================================================================
// Chat, filtering, rate limiting
// =========================================================================

#[tokio::test]
async fn test_chat_profanity_redacted_for_everyone() {
    let addr = start().await;
    let (mut host, mut guest, code) = seated_pair(&addr).await;

    send(
        &mut host,
        &ClientEvent::SendMessage {
            code,
            text: "this is abuse".into(),
        },
    )
    .await;

    for ws in [&mut host, &mut guest] {
        let ServerEvent::ReceiveMessage {
            entry: ChatEntry::Message { text, sender_name, .. },
        } = recv(ws).await
        else {
            panic!("expected chat message");
        };
        assert_eq!(text, "this is *****");
        assert_eq!(sender_name, "alice");
    }
}

#[tokio::test]
async fn test_chat_rate_limit_drops_rapid_messages_silently() {
    let addr = start().await;
    let (mut host, mut guest, code) = seated_pair(&addr).await;

    // Two back-to-back messages: the second lands inside the 1s chat
    // cooldown and is dropped without an error event.
    send(
        &mut host,
        &ClientEvent::SendMessage {
            code: code.clone(),
            text: "one".into(),
        },
    )
    .await;
    send(
        &mut host,
        &ClientEvent::SendMessage {
            code: code.clone(),
            text: "two".into(),
        },
    )
    .await;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    send(
        &mut host,
        &ClientEvent::SendMessage {
            code: code.clone(),
            text: "three".into(),
        },
    )
    .await;

    let mut texts = Vec::new();
    for _ in 0..2 {
        let ServerEvent::ReceiveMessage {
            entry: ChatEntry::Message { text, .. },
        } = recv(&mut guest).await
        else {
            panic!("expected chat message");
        };
        texts.push(text);
    }
    assert_eq!(texts, vec!["one", "three"]);
}

#[tokio::test]
async fn test_typing_indicator_reaches_opponent() {
    let addr = start().await;
    let (mut host, mut guest, code) = seated_pair(&addr).await;

    send(&mut host, &ClientEvent::Typing { code: code.clone() }).await;
    assert!(matches!(
        recv(&mut guest).await,
        ServerEvent::OpponentTyping
    ));

    // 200ms cooldown, then the stop event follows.
    tokio::time::sleep(Duration::from_millis(250)).await;
    send(&mut host, &ClientEvent::StopTyping { code }).await;
    assert!(matches!(
        recv(&mut guest).await,
        ServerEvent::OpponentStopTyping
    ));
}

#[tokio::test]
async fn test_report_user_is_swallowed_by_the_collaborator() {
    let addr = start().await;
    let (mut host, mut guest, code) = seated_pair(&addr).await;

    send(
        &mut host,
        &ClientEvent::ReportUser {
            code: code.clone(),
            message: "rude messages".into(),
            reporter_name: "alice".into(),
        },
    )
    .await;

    // No in-room effect: the next thing either player sees is ordinary
    // room traffic.
    send(&mut guest, &ClientEvent::SendMessage { code, text: "hi".into() })
        .await;
    assert!(matches!(
        recv(&mut host).await,
        ServerEvent::ReceiveMessage { .. }
    ));
}

// =========================================================================
// Leaving, disconnecting, reconnecting
// =========================================================================

#[tokio::test]
async fn test_leave_terminates_room_for_the_other_player() {
    let addr = start().await;
    let (mut host, mut guest, code) = seated_pair(&addr).await;

    send(&mut guest, &ClientEvent::LeaveRoom { code }).await;

    let ServerEvent::RoomTerminated { reason } = recv(&mut host).await
    else {
        panic!("expected room_terminated");
    };
    assert!(reason.contains("bob"));
    assert!(reason.contains("quit"));
}

#[tokio::test]
async fn test_disconnect_marks_player_and_reconnect_restores() {
    let addr = start().await;
    let (mut host, mut guest, code) = seated_pair(&addr).await;
    let host_room =
        start_round(&mut host, &mut guest, &code, GameSettings::default())
            .await;
    assert_eq!(host_room.players.len(), 2);

    // The guest's socket dies mid-round: the server marks the seat
    // disconnected and tells the host.
    drop(guest);
    let ServerEvent::RoomUpdated { room } = recv(&mut host).await else {
        panic!("expected the disconnect indicator");
    };
    assert!(!room.players[1].connected);
    assert_eq!(room.phase, Phase::Playing, "round survives the drop");

    // Same guest name rejoins within the grace window on a fresh socket.
    let mut rejoined = ws(&addr).await;
    send(
        &mut rejoined,
        &ClientEvent::JoinRoom {
            code: code.clone(),
            player_name: "bob".into(),
            identity: None,
        },
    )
    .await;

    let ServerEvent::RoomUpdated { room } = recv(&mut rejoined).await
    else {
        panic!("expected the refreshed room");
    };
    assert!(room.players[1].connected);
    assert_eq!(room.phase, Phase::Playing);
    assert!(room.players[1].has_selected, "secret survived");
    assert_eq!(room.characters.len(), 16, "board survived");
    assert_eq!(room.chat.len(), host_room.chat.len(), "chat survived");

    let ServerEvent::RoomUpdated { room } = recv(&mut host).await else {
        panic!("expected the reconnect broadcast");
    };
    assert!(room.players[1].connected);
    assert_eq!(room.turn, 0, "turn untouched by the reconnect");
}
