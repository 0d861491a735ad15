use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::stream::SplitSink;
use futures::SinkExt;
use pasty_core::{ConnectionId, Device, Group};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SendError;

/// Outbound half of a client socket.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: &str) -> Result<(), SendError>;
    async fn close(&mut self, code: u16, reason: &str) -> Result<(), SendError>;
}

#[async_trait]
impl FrameSink for SplitSink<WebSocket, Message> {
    async fn send_text(&mut self, text: &str) -> Result<(), SendError> {
        self.send(Message::Text(text.to_owned().into()))
            .await
            .map_err(|e| SendError::Transport(e.to_string()))
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), SendError> {
        self.send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_owned().into(),
        })))
        .await
        .map_err(|e| SendError::Transport(e.to_string()))
    }
}

/// Result of offering a snapshot to a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// A snapshot at least this new was already written; nothing sent.
    Superseded,
}

struct Outbound {
    sink: Box<dyn FrameSink>,
    /// Version of the newest snapshot written to `sink`; 0 before the first.
    sent_version: u64,
}

/// One registered client: its identity plus the shared write half.
///
/// Sessions and the broadcast coordinator both write through here, so sends
/// are serialized by the sink mutex. Snapshots carry a version and an older
/// one never follows a newer one onto the wire. Closing is a one-way latch;
/// the owning session watches it to learn it was evicted.
pub struct Connection {
    id: ConnectionId,
    group: Group,
    device: Device,
    outbound: Mutex<Outbound>,
    closed: CancellationToken,
    connected_at: Instant,
}

impl Connection {
    pub fn new(group: Group, device: Device, sink: Box<dyn FrameSink>) -> Self {
        Self {
            id: ConnectionId::new(),
            group,
            device,
            outbound: Mutex::new(Outbound {
                sink,
                sent_version: 0,
            }),
            closed: CancellationToken::new(),
            connected_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Send snapshot `version`, giving up after `limit`.
    ///
    /// Skipped when this connection already has a snapshot at least as new.
    /// A concurrent `close()` aborts a pending send with `SendError::Closed`.
    pub async fn send_snapshot(
        &self,
        version: u64,
        text: &str,
        limit: Duration,
    ) -> Result<Delivery, SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        let send = async {
            let mut out = self.outbound.lock().await;
            if version <= out.sent_version {
                return Ok(Delivery::Superseded);
            }
            out.sink.send_text(text).await?;
            out.sent_version = version;
            Ok::<_, SendError>(Delivery::Sent)
        };
        tokio::select! {
            _ = self.closed.cancelled() => Err(SendError::Closed),
            result = tokio::time::timeout(limit, send) => match result {
                Ok(sent) => sent,
                Err(_) => Err(SendError::Timeout(limit)),
            },
        }
    }

    /// Best-effort close frame, then mark closed.
    pub async fn close_with(&self, code: u16, reason: &str, limit: Duration) {
        if !self.is_closed() {
            let frame = async {
                let mut out = self.outbound.lock().await;
                out.sink.close(code, reason).await
            };
            match tokio::time::timeout(limit, frame).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(conn_id = %self.id, error = %e, "close frame not delivered"),
                Err(_) => debug!(conn_id = %self.id, "close frame timed out"),
            }
        }
        self.close();
    }

    /// Mark the connection closed. Idempotent.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the connection has been closed from any side.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("group", &self.group)
            .field("device", &self.device)
            .field("closed", &self.is_closed())
            .finish()
    }
}
