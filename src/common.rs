//! Common types for the arena: shot results and board errors.

use core::fmt;

use crate::ship::ShipType;

/// Outcome of a shot against a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotResult {
    /// The cell held no ship.
    Miss,
    /// The shot hit a ship that is still afloat.
    Hit,
    /// The shot completed a ship, carrying its type.
    Sunk(ShipType),
    /// The cell was already resolved by an earlier shot.
    AlreadyShot,
    /// The shot was not legal (bad coordinates, bad target, wrong phase).
    Error,
}

impl ShotResult {
    /// Identifier used in `SHOT_RESULT` frames.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ShotResult::Miss => "MISS",
            ShotResult::Hit => "HIT",
            ShotResult::Sunk(_) => "SUNK",
            ShotResult::AlreadyShot => "ALREADY_SHOT",
            ShotResult::Error => "ERROR",
        }
    }

    /// Whether this result ends the shooter's turn.
    pub fn consumes_turn(&self) -> bool {
        !matches!(self, ShotResult::AlreadyShot | ShotResult::Error)
    }
}

/// Errors returned by board placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    /// At least one segment falls outside the grid.
    ShipOutOfBounds,
    /// Ship placement overlaps another ship.
    ShipOverlaps,
    /// This ship type already sits on the board.
    ShipAlreadyPlaced,
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::ShipOutOfBounds => write!(f, "Ship placement is out of bounds"),
            BoardError::ShipOverlaps => write!(f, "Ship placement overlaps with another ship"),
            BoardError::ShipAlreadyPlaced => write!(f, "Ship is already placed on the board"),
        }
    }
}

impl std::error::Error for BoardError {}
