use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::connection::{Connection, ConnectionId, Liveness, TransportKind};
use crate::transport::FrameReader;

/// A connection without a socket. Every frame sent to it is recorded, which
/// makes it the workhorse of coordinator tests.
pub struct InMemoryConnection {
    id: ConnectionId,
    peer: String,
    live: Arc<Liveness>,
    sent: Mutex<Vec<String>>,
}

impl InMemoryConnection {
    pub fn new(id: ConnectionId) -> Arc<Self> {
        Arc::new(InMemoryConnection {
            id,
            peer: format!("memory{}", id),
            live: Arc::new(Liveness::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// A connection plus a reader fed through the returned sender, for use
    /// with [`crate::transport::drive`]. Dropping the sender ends the stream.
    pub fn pair(
        id: ConnectionId,
    ) -> (Arc<Self>, InMemoryFrames, mpsc::UnboundedSender<String>) {
        let conn = Self::new(id);
        let (tx, rx) = mpsc::unbounded_channel();
        let frames = InMemoryFrames {
            inbound: rx,
            live: conn.live.clone(),
        };
        (conn, frames, tx)
    }

    fn log(&self) -> MutexGuard<'_, Vec<String>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every frame delivered so far.
    pub fn sent(&self) -> Vec<String> {
        self.log().clone()
    }

    /// Frames delivered since the last call.
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut *self.log())
    }

    pub fn last_sent(&self) -> Option<String> {
        self.log().last().cloned()
    }

    /// Whether any recorded frame starts with `prefix`.
    pub fn received(&self, prefix: &str) -> bool {
        self.log().iter().any(|f| f.starts_with(prefix))
    }
}

impl Connection for InMemoryConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer(&self) -> &str {
        &self.peer
    }

    fn kind(&self) -> TransportKind {
        TransportKind::InMemory
    }

    fn send(&self, text: &str) {
        if self.live.is_live() {
            self.log().push(text.to_string());
        }
    }

    fn close(&self) -> bool {
        self.live.kill()
    }

    fn is_live(&self) -> bool {
        self.live.is_live()
    }
}

/// Reading half of an [`InMemoryConnection::pair`].
pub struct InMemoryFrames {
    inbound: mpsc::UnboundedReceiver<String>,
    live: Arc<Liveness>,
}

#[async_trait::async_trait]
impl FrameReader for InMemoryFrames {
    async fn recv_frame(&mut self) -> anyhow::Result<Option<String>> {
        let live = self.live.clone();
        tokio::select! {
            _ = live.closed() => Ok(None),
            frame = self.inbound.recv() => Ok(frame),
        }
    }
}
