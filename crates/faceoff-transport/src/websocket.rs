//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Each accepted socket is split into a read half and a write half. The
//! write half is owned by a dedicated writer task fed through an unbounded
//! channel, so any task holding a clone of the connection can queue frames
//! without ever contending with the read loop. Room broadcasts arrive from
//! the room actor's task; reads happen on the connection handler's task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitStream, StreamExt};
use futures_util::SinkExt;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| {
                TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        Ok(WebSocketConnection::spawn(id, ws))
    }
}

/// A single WebSocket connection.
///
/// Clones share the same socket: the outbound side is the channel into the
/// writer task, the inbound side is the read half behind a mutex (only the
/// connection handler's task reads).
#[derive(Clone)]
pub struct WebSocketConnection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Message>,
    inbound: Arc<Mutex<SplitStream<WsStream>>>,
}

impl WebSocketConnection {
    fn spawn(id: ConnectionId, ws: WsStream) -> Self {
        let (mut sink, stream) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        // Writer task: drains queued frames until the channel closes or
        // the peer goes away. A Close frame ends the task after delivery.
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if sink.send(msg).await.is_err() {
                    tracing::debug!(%id, "writer task: peer gone");
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        Self {
            id,
            outbound: tx,
            inbound: Arc::new(Mutex::new(stream)),
        }
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        self.outbound
            .send(Message::Binary(data.to_vec().into()))
            .map_err(|_| {
                TransportError::ConnectionClosed("writer task gone".into())
            })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.inbound.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.outbound.send(Message::Close(None)).map_err(|_| {
            TransportError::ConnectionClosed("writer task gone".into())
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
