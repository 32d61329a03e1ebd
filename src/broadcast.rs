//! Fan-out of server messages to subsets of the registry.

use crate::connection::{ConnectionId, Member, Role};
use crate::protocol::ServerMessage;

/// Addresses one message to an audience drawn from the registry.
///
/// Each message is rendered once; dead connections drop it silently.
pub struct Broadcaster<'a> {
    members: &'a [Member],
}

impl<'a> Broadcaster<'a> {
    pub fn new(members: &'a [Member]) -> Self {
        Broadcaster { members }
    }

    fn deliver<F>(&self, msg: &ServerMessage, mut include: F) -> usize
    where
        F: FnMut(&Member) -> bool,
    {
        let text = msg.to_string();
        let mut delivered = 0;
        for member in self.members.iter().filter(|m| include(m)) {
            if member.handle.is_live() {
                member.handle.send(&text);
                delivered += 1;
            }
        }
        delivered
    }

    /// Every registered connection, whatever its role.
    pub fn everyone(&self, msg: &ServerMessage) -> usize {
        self.deliver(msg, |_| true)
    }

    /// Only participants seated in the game.
    pub fn players(&self, msg: &ServerMessage) -> usize {
        self.deliver(msg, |m| m.role == Role::InGame)
    }

    /// Seated participants except one.
    pub fn players_except(&self, excluded: ConnectionId, msg: &ServerMessage) -> usize {
        self.deliver(msg, |m| m.role == Role::InGame && m.id() != excluded)
    }

    /// Seated participants and spectators.
    pub fn participants(&self, msg: &ServerMessage) -> usize {
        self.deliver(msg, |m| matches!(m.role, Role::InGame | Role::Spectator))
    }
}
