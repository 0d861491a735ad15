//! In-process sinks and stores shared by the unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pasty_core::{Group, NewPaste, Paste, PasteId};
use pasty_store::{PasteStore, StoreError};
use tokio::sync::mpsc;

use crate::connection::FrameSink;
use crate::error::SendError;

/// What a test sink observed.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close(u16, String),
}

/// Forwards frames to a channel the test reads.
pub struct ChannelSink(pub mpsc::UnboundedSender<Frame>);

impl ChannelSink {
    pub fn pair() -> (Box<dyn FrameSink>, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Box::new(ChannelSink(tx)), rx)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_text(&mut self, text: &str) -> Result<(), SendError> {
        self.0
            .send(Frame::Text(text.to_string()))
            .map_err(|_| SendError::Transport("receiver dropped".into()))
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), SendError> {
        self.0
            .send(Frame::Close(code, reason.to_string()))
            .map_err(|_| SendError::Transport("receiver dropped".into()))
    }
}

/// A peer that never drains its socket.
pub struct StalledSink;

#[async_trait]
impl FrameSink for StalledSink {
    async fn send_text(&mut self, _text: &str) -> Result<(), SendError> {
        futures::future::pending().await
    }

    async fn close(&mut self, _code: u16, _reason: &str) -> Result<(), SendError> {
        futures::future::pending().await
    }
}

/// Every text frame received so far, oldest first.
pub fn drain_texts(rx: &mut mpsc::UnboundedReceiver<Frame>) -> Vec<serde_json::Value> {
    let mut texts = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        if let Frame::Text(t) = frame {
            texts.push(serde_json::from_str(&t).unwrap());
        }
    }
    texts
}

/// In-memory store with the same ordering and scoping contract as the SQLite repo.
#[derive(Default)]
pub struct MemoryStore {
    rows: parking_lot::Mutex<Vec<Paste>>,
    next_id: parking_lot::Mutex<i64>,
}

impl MemoryStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().len()
    }
}

#[async_trait]
impl PasteStore for MemoryStore {
    async fn insert(&self, paste: NewPaste) -> Result<PasteId, StoreError> {
        let mut next = self.next_id.lock();
        *next += 1;
        let id = PasteId(*next);
        self.rows.lock().push(paste.into_paste(id));
        Ok(id)
    }

    async fn list(&self, group: &Group) -> Result<Vec<Paste>, StoreError> {
        let mut pastes: Vec<Paste> = self
            .rows
            .lock()
            .iter()
            .filter(|p| &p.group == group)
            .cloned()
            .collect();
        pastes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(pastes)
    }

    async fn delete(&self, group: &Group, id: PasteId) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|p| !(p.id == id && &p.group == group));
        Ok(rows.len() != before)
    }
}

/// Wraps a `MemoryStore`; once armed, the next `list` reads and then stalls
/// for `delay` before returning what it read.
pub struct DelayedListStore {
    inner: Arc<MemoryStore>,
    armed: AtomicBool,
    delay: Duration,
}

impl DelayedListStore {
    pub fn new(inner: Arc<MemoryStore>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner,
            armed: AtomicBool::new(false),
            delay,
        })
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PasteStore for DelayedListStore {
    async fn insert(&self, paste: NewPaste) -> Result<PasteId, StoreError> {
        self.inner.insert(paste).await
    }

    async fn list(&self, group: &Group) -> Result<Vec<Paste>, StoreError> {
        let pastes = self.inner.list(group).await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
        }
        Ok(pastes)
    }

    async fn delete(&self, group: &Group, id: PasteId) -> Result<bool, StoreError> {
        self.inner.delete(group, id).await
    }
}

/// Every call fails as if the database were unavailable.
pub struct FailingStore;

#[async_trait]
impl PasteStore for FailingStore {
    async fn insert(&self, _paste: NewPaste) -> Result<PasteId, StoreError> {
        Err(StoreError::Database("disk I/O error".into()))
    }

    async fn list(&self, _group: &Group) -> Result<Vec<Paste>, StoreError> {
        Err(StoreError::Database("disk I/O error".into()))
    }

    async fn delete(&self, _group: &Group, _id: PasteId) -> Result<bool, StoreError> {
        Err(StoreError::Database("disk I/O error".into()))
    }
}
