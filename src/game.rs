//! Shared game state: roster, turn rotation, placement and combat.

use core::fmt;
use log::{debug, info};

use crate::board::ShipBoard;
use crate::common::{BoardError, ShotResult};
use crate::config::SHIPS;
use crate::ship::{Orientation, ShipType};

/// Phase of a running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Placement,
    Combat,
    Done,
}

/// Reasons a placement is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    /// The game is not in the placement phase.
    WrongPhase,
    /// Nobody holds the turn (the game is over).
    NoCurrentPlayer,
    /// The ship is not the head of the current player's queue.
    UnexpectedShip {
        expected: Option<ShipType>,
        got: ShipType,
    },
    /// The board refused the layout.
    Rejected(BoardError),
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::WrongPhase => write!(f, "Not in the placement phase"),
            GameError::NoCurrentPlayer => write!(f, "No player holds the turn"),
            GameError::UnexpectedShip { expected: Some(e), got } => {
                write!(f, "Expected ship {} but got {}", e.name(), got.name())
            }
            GameError::UnexpectedShip { expected: None, got } => {
                write!(f, "No ship left to place (got {})", got.name())
            }
            GameError::Rejected(e) => write!(f, "Placement rejected: {}", e),
        }
    }
}

impl std::error::Error for GameError {}

impl From<BoardError> for GameError {
    fn from(err: BoardError) -> Self {
        GameError::Rejected(err)
    }
}

/// State of one game, from the first placement to the last shot.
///
/// Participants are addressed by their roster index (`0..player_count()`),
/// which never changes during the game. The turn pointer indexes into the
/// active list and is kept in range whenever that list shrinks.
#[derive(Debug, Clone)]
pub struct GameState {
    players: Vec<String>,
    boards: Vec<ShipBoard>,
    pending: Vec<Vec<ShipType>>,
    active: Vec<usize>,
    turn: usize,
    phase: Phase,
    winner: Option<usize>,
}

impl GameState {
    /// Start a game in the placement phase with every participant active.
    pub fn new(players: Vec<String>) -> Self {
        let n = players.len();
        GameState {
            boards: (0..n).map(|_| ShipBoard::new()).collect(),
            pending: (0..n).map(|_| SHIPS.to_vec()).collect(),
            active: (0..n).collect(),
            turn: 0,
            phase: if n <= 1 { Phase::Done } else { Phase::Placement },
            winner: if n == 1 { Some(0) } else { None },
            players,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player_name(&self, index: usize) -> Option<&str> {
        self.players.get(index).map(String::as_str)
    }

    pub fn player_names(&self) -> &[String] {
        &self.players
    }

    pub fn board(&self, index: usize) -> Option<&ShipBoard> {
        self.boards.get(index)
    }

    /// Roster indices still in the game, in turn order.
    pub fn active_indices(&self) -> &[usize] {
        &self.active
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.active.contains(&index)
    }

    /// Winner once the game is over; `None` while running or after a draw.
    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    /// Roster index of the participant whose move is next.
    pub fn current_player(&self) -> Option<usize> {
        if self.phase == Phase::Done || self.active.is_empty() {
            return None;
        }
        Some(self.active[self.turn % self.active.len()])
    }

    /// Ships `index` still has to place, head first.
    pub fn remaining_to_place(&self, index: usize) -> &[ShipType] {
        self.pending.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Next ship the given participant is expected to place.
    pub fn next_ship(&self, index: usize) -> Option<ShipType> {
        self.remaining_to_place(index).first().copied()
    }

    fn all_placed(&self) -> bool {
        self.active.iter().all(|&i| self.pending[i].is_empty())
    }

    /// Move the pointer forward until it rests on a participant that still
    /// has ships to place. Starts with the participant currently pointed at.
    fn seek_placer(&mut self) {
        let len = self.active.len();
        for _ in 0..len {
            if !self.pending[self.active[self.turn]].is_empty() {
                return;
            }
            self.turn = (self.turn + 1) % len;
        }
    }

    fn advance_turn(&mut self) {
        if !self.active.is_empty() {
            self.turn = (self.turn + 1) % self.active.len();
        }
    }

    fn enter_combat(&mut self) {
        info!("All fleets placed, combat begins");
        self.phase = Phase::Combat;
        self.turn = 0;
    }

    /// Drop `index` from the active list, keeping the pointer on the same
    /// participant (or on the one that slid into the vacated slot), and end
    /// the game when at most one participant is left.
    fn remove_active(&mut self, index: usize) -> bool {
        let Some(pos) = self.active.iter().position(|&i| i == index) else {
            return false;
        };
        self.active.remove(pos);
        if pos < self.turn {
            self.turn -= 1;
        }
        if self.active.is_empty() {
            self.turn = 0;
        } else {
            self.turn %= self.active.len();
        }
        debug!(
            "Participant {} eliminated, active now {:?}",
            index, self.active
        );

        if self.active.len() <= 1 {
            self.phase = Phase::Done;
            self.winner = self.active.first().copied();
            match self.winner {
                Some(w) => info!("Game over, winner is {} ({})", self.players[w], w),
                None => info!("Game over, no participant left"),
            }
        }
        true
    }

    /// Place the next ship of the current player.
    ///
    /// On success the turn passes to the next active participant that still
    /// has ships to place; once nobody has, the game enters combat with the
    /// first active participant to shoot.
    pub fn place_next_ship(
        &mut self,
        ship_type: ShipType,
        row: usize,
        col: usize,
        orientation: Orientation,
    ) -> Result<(), GameError> {
        if self.phase != Phase::Placement {
            return Err(GameError::WrongPhase);
        }
        let current = self.current_player().ok_or(GameError::NoCurrentPlayer)?;
        let expected = self.next_ship(current);
        if expected != Some(ship_type) {
            return Err(GameError::UnexpectedShip {
                expected,
                got: ship_type,
            });
        }

        self.boards[current].place_ship(ship_type, row, col, orientation)?;
        self.pending[current].remove(0);
        debug!(
            "{} placed {} at ({}, {}) {:?}",
            self.players[current],
            ship_type.name(),
            row,
            col,
            orientation
        );

        if self.all_placed() {
            self.enter_combat();
        } else {
            self.advance_turn();
            self.seek_placer();
        }
        Ok(())
    }

    /// Fire the current player's shot at `target`.
    ///
    /// Illegal shots (wrong phase, self, eliminated or unknown target,
    /// coordinates off the grid) yield `ShotResult::Error`. `Error` and
    /// `AlreadyShot` leave the turn where it is.
    pub fn fire(&mut self, target: usize, row: usize, col: usize) -> ShotResult {
        if self.phase != Phase::Combat {
            return ShotResult::Error;
        }
        let Some(shooter) = self.current_player() else {
            return ShotResult::Error;
        };
        if target == shooter || !self.is_active(target) {
            return ShotResult::Error;
        }

        let result = self.boards[target].receive_shot(row, col);
        if !result.consumes_turn() {
            return result;
        }

        if matches!(result, ShotResult::Sunk(_)) && self.boards[target].all_ships_sunk() {
            info!("{} has lost their whole fleet", self.players[target]);
            self.remove_active(target);
        }
        if self.phase == Phase::Combat {
            self.advance_turn();
        }
        result
    }

    /// Vacate the seat of a disconnected participant.
    ///
    /// Returns whether the game can continue.
    pub fn handle_disconnect(&mut self, index: usize) -> bool {
        let Some(board) = self.boards.get_mut(index) else {
            return self.phase != Phase::Done;
        };
        board.mark_abandoned();
        if self.phase == Phase::Done || !self.remove_active(index) {
            return self.phase != Phase::Done;
        }

        if self.phase == Phase::Placement {
            if self.all_placed() {
                self.enter_combat();
            } else {
                self.seek_placer();
            }
        }
        self.phase != Phase::Done
    }
}
