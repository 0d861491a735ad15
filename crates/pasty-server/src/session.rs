//! Per-connection protocol loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket};
use axum::http::HeaderValue;
use futures::{Stream, StreamExt};
use pasty_core::{Command, NewPaste};
use tracing::{debug, info, instrument, trace, warn};

use crate::broadcast::BroadcastCoordinator;
use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::identity::Peer;

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent a close frame.
    PeerClosed,
    /// Inbound stream ended without a close frame.
    PeerGone,
    /// A broadcast could not reach this client and dropped it.
    Evicted,
    /// Undecodable command or binary frame.
    Malformed,
    Transport,
    InitialSendFailed,
}

/// Whether the negotiated sub-protocol is exactly `expected`.
pub fn subprotocol_matches(selected: Option<&HeaderValue>, expected: &str) -> bool {
    selected
        .and_then(|v| v.to_str().ok())
        .is_some_and(|p| p == expected)
}

/// Drive one upgraded socket until it closes.
#[instrument(skip_all, fields(group = %peer.group, device = %peer.device))]
pub async fn serve_socket(
    mut socket: WebSocket,
    peer: Peer,
    coordinator: Arc<BroadcastCoordinator>,
    config: Arc<ServerConfig>,
) {
    if !subprotocol_matches(socket.protocol(), &config.subprotocol) {
        warn!(expected = %config.subprotocol, "rejecting connection: subprotocol mismatch");
        let frame = Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: Utf8Bytes::from_static("unsupported subprotocol"),
        }));
        let _ = tokio::time::timeout(config.send_timeout, socket.send(frame)).await;
        return;
    }

    let (sink, stream) = socket.split();
    let conn = Arc::new(Connection::new(peer.group, peer.device, Box::new(sink)));
    let _ = Session::new(conn, coordinator, config.idle_timeout, config.send_timeout)
        .run(stream)
        .await;
}

/// One client's Active state: registered, reading commands, publishing.
pub struct Session {
    conn: Arc<Connection>,
    coordinator: Arc<BroadcastCoordinator>,
    idle_timeout: Duration,
    send_timeout: Duration,
}

impl Session {
    pub fn new(
        conn: Arc<Connection>,
        coordinator: Arc<BroadcastCoordinator>,
        idle_timeout: Duration,
        send_timeout: Duration,
    ) -> Self {
        Self {
            conn,
            coordinator,
            idle_timeout,
            send_timeout,
        }
    }

    /// Register, send the initial snapshot, then process frames until the
    /// connection ends. Always deregisters before returning.
    pub async fn run<S>(self, mut inbound: S) -> CloseReason
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        self.coordinator.registry().add(Arc::clone(&self.conn));
        info!(conn_id = %self.conn.id(), group = %self.conn.group(), device = %self.conn.device(), "client connected");

        if let Err(e) = self.coordinator.send_snapshot(&self.conn).await {
            warn!(conn_id = %self.conn.id(), error = %e, "initial snapshot failed");
            return self.finish(CloseReason::InitialSendFailed);
        }

        let reason = loop {
            let polled = tokio::select! {
                _ = self.conn.closed() => break CloseReason::Evicted,
                polled = tokio::time::timeout(self.idle_timeout, inbound.next()) => polled,
            };

            let frame = match polled {
                Err(_) => {
                    trace!(conn_id = %self.conn.id(), "idle, still waiting");
                    continue;
                }
                Ok(None) => break CloseReason::PeerGone,
                Ok(Some(Err(e))) => {
                    debug!(conn_id = %self.conn.id(), error = %e, "transport error");
                    break CloseReason::Transport;
                }
                Ok(Some(Ok(frame))) => frame,
            };

            match frame {
                Message::Text(text) => match Command::decode(text.as_str()) {
                    Ok(command) => self.apply(command).await,
                    Err(e) => {
                        warn!(conn_id = %self.conn.id(), kind = e.error_kind(), error = %e, "malformed command");
                        self.reject("malformed command").await;
                        break CloseReason::Malformed;
                    }
                },
                Message::Binary(_) => {
                    warn!(conn_id = %self.conn.id(), "binary frame rejected");
                    self.reject("binary frames not supported").await;
                    break CloseReason::Malformed;
                }
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Close(_) => break CloseReason::PeerClosed,
            }
        };

        self.finish(reason)
    }

    async fn apply(&self, command: Command) {
        let action = command.action();
        let group = self.conn.group();
        let store = self.coordinator.store();

        let outcome = match command {
            Command::Add { user, text } => {
                let paste = NewPaste::now(group.clone(), user, self.conn.device().clone(), text);
                store
                    .insert(paste)
                    .await
                    .map(|id| debug!(conn_id = %self.conn.id(), paste_id = %id, "paste added"))
            }
            Command::Delete { id } => store
                .delete(group, id)
                .await
                .map(|existed| debug!(conn_id = %self.conn.id(), paste_id = %id, existed, "paste deleted")),
        };

        if let Err(e) = outcome {
            warn!(conn_id = %self.conn.id(), %action, error = %e, "mutation dropped");
            return;
        }

        if let Err(e) = self.coordinator.publish(group).await {
            warn!(group = %group, %action, error = %e, "publish failed");
        }
    }

    async fn reject(&self, reason: &str) {
        self.conn
            .close_with(close_code::INVALID, reason, self.send_timeout)
            .await;
    }

    fn finish(&self, reason: CloseReason) -> CloseReason {
        self.conn.close();
        let _ = self.coordinator.registry().remove(&self.conn);
        info!(
            conn_id = %self.conn.id(),
            group = %self.conn.group(),
            ?reason,
            connected_secs = self.conn.connected_for().as_secs(),
            "client disconnected"
        );
        reason
    }
}
