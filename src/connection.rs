//! Transport-agnostic connection contract and the coordinator's per-peer record.

use core::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::protocol::ServerMessage;

/// Identity of a connection, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Tcp,
    WebSocket,
    InMemory,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Tcp => write!(f, "tcp"),
            TransportKind::WebSocket => write!(f, "ws"),
            TransportKind::InMemory => write!(f, "mem"),
        }
    }
}

/// What a connection is currently allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Waiting in the lobby (named or not).
    Lobby,
    /// Holds a seat in the running game.
    InGame,
    /// Watching a running game.
    Spectator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Lobby => write!(f, "lobby"),
            Role::InGame => write!(f, "in-game"),
            Role::Spectator => write!(f, "spectator"),
        }
    }
}

/// One network peer, whatever the transport.
///
/// `send` must never block or fail from the caller's point of view: frames to
/// a dead peer are dropped. `close` is idempotent.
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;

    /// Remote address, for logs.
    fn peer(&self) -> &str;

    fn kind(&self) -> TransportKind;

    /// Queue one frame for delivery.
    fn send(&self, text: &str);

    /// Mark the connection dead and release the transport.
    /// Returns `true` for the call that actually closed it.
    fn close(&self) -> bool;

    fn is_live(&self) -> bool;
}

/// Liveness flag shared between a connection and its I/O tasks.
#[derive(Debug)]
pub struct Liveness {
    live: AtomicBool,
    closed: Notify,
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness {
    pub fn new() -> Self {
        Liveness {
            live: AtomicBool::new(true),
            closed: Notify::new(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Flip to dead and wake every task waiting in [`Liveness::closed`].
    /// Only the first caller gets `true`.
    pub fn kill(&self) -> bool {
        let was_live = self.live.swap(false, Ordering::SeqCst);
        if was_live {
            self.closed.notify_waiters();
        }
        was_live
    }

    /// Resolves once the connection has been killed.
    pub async fn closed(&self) {
        loop {
            let notified = self.closed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_live() {
                return;
            }
            notified.await;
        }
    }
}

/// The coordinator's record of a registered connection.
#[derive(Clone)]
pub struct Member {
    pub handle: Arc<dyn Connection>,
    pub name: Option<String>,
    pub role: Role,
    pub game_index: Option<usize>,
}

impl Member {
    pub fn new(handle: Arc<dyn Connection>, role: Role) -> Self {
        Member {
            handle,
            name: None,
            role,
            game_index: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    /// Name for logs and announcements.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Anonymous")
    }

    pub fn send(&self, msg: &ServerMessage) {
        self.handle.send(&msg.to_string());
    }

    /// Back to an unnamed lobby seat, as after a finished game.
    pub fn reset_for_lobby(&mut self) {
        self.name = None;
        self.role = Role::Lobby;
        self.game_index = None;
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("id", &self.id())
            .field("name", &self.name)
            .field("role", &self.role)
            .field("game_index", &self.game_index)
            .finish()
    }
}
