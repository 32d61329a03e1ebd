//! A participant's grid: ship placement and shot resolution.

use core::fmt;
use rand::Rng;

use crate::common::{BoardError, ShotResult};
use crate::config::GRID_SIZE;
use crate::ship::{Orientation, Ship, ShipType};

/// State of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Ship,
    ShipHit,
    Miss,
}

/// One participant's board: the grid, the placed ships and the shot history.
#[derive(Clone)]
pub struct ShipBoard {
    size: usize,
    cells: Vec<Cell>,
    ships: Vec<Ship>,
    abandoned: bool,
}

impl Default for ShipBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ShipBoard {
    /// Create an empty board of the standard size.
    pub fn new() -> Self {
        Self::with_size(GRID_SIZE)
    }

    pub fn with_size(size: usize) -> Self {
        ShipBoard {
            size,
            cells: vec![Cell::Empty; size * size],
            ships: Vec::new(),
            abandoned: false,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Ships placed so far, in placement order.
    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub fn has_ship(&self, ship_type: ShipType) -> bool {
        self.ships.iter().any(|s| s.ship_type() == ship_type)
    }

    /// State of the cell at (`row`, `col`), or `None` outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        self.index(row, col).map(|i| self.cells[i])
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.size && col < self.size {
            Some(row * self.size + col)
        } else {
            None
        }
    }

    /// Build the ship a placement would produce without touching the board.
    fn layout(
        &self,
        ship_type: ShipType,
        row: usize,
        col: usize,
        orientation: Orientation,
    ) -> Result<Ship, BoardError> {
        if self.has_ship(ship_type) {
            return Err(BoardError::ShipAlreadyPlaced);
        }
        let ship = Ship::new(ship_type, orientation, row, col, self.size)?;
        let overlaps = ship
            .segments()
            .iter()
            .any(|&(r, c)| self.cell(r, c) != Some(Cell::Empty));
        if overlaps {
            return Err(BoardError::ShipOverlaps);
        }
        Ok(ship)
    }

    /// Place `ship_type` at (`row`, `col`).
    ///
    /// Rejected when a segment leaves the grid or lands on another ship; the
    /// board is left untouched in that case.
    pub fn place_ship(
        &mut self,
        ship_type: ShipType,
        row: usize,
        col: usize,
        orientation: Orientation,
    ) -> Result<(), BoardError> {
        let ship = self.layout(ship_type, row, col, orientation)?;
        for &(r, c) in ship.segments() {
            if let Some(i) = self.index(r, c) {
                self.cells[i] = Cell::Ship;
            }
        }
        self.ships.push(ship);
        Ok(())
    }

    /// Returns a random legal (row, col, Orientation) for `ship_type`, or
    /// `None` when the ship no longer fits anywhere.
    pub fn random_placement<R: Rng>(
        &self,
        rng: &mut R,
        ship_type: ShipType,
    ) -> Option<(usize, usize, Orientation)> {
        for _ in 0..100 {
            let orient = if rng.random() {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let r = rng.random_range(0..self.size);
            let c = rng.random_range(0..self.size);
            if self.layout(ship_type, r, c, orient).is_ok() {
                return Some((r, c, orient));
            }
        }
        // crowded board: fall back to the first free slot
        for r in 0..self.size {
            for c in 0..self.size {
                for orient in [Orientation::Horizontal, Orientation::Vertical] {
                    if self.layout(ship_type, r, c, orient).is_ok() {
                        return Some((r, c, orient));
                    }
                }
            }
        }
        None
    }

    /// Resolve a shot at (`row`, `col`).
    pub fn receive_shot(&mut self, row: usize, col: usize) -> ShotResult {
        let Some(i) = self.index(row, col) else {
            return ShotResult::Error;
        };
        if self.abandoned {
            return ShotResult::Error;
        }
        match self.cells[i] {
            Cell::ShipHit | Cell::Miss => ShotResult::AlreadyShot,
            Cell::Empty => {
                self.cells[i] = Cell::Miss;
                ShotResult::Miss
            }
            Cell::Ship => {
                self.cells[i] = Cell::ShipHit;
                let Some(ship) = self.ships.iter_mut().find(|s| s.contains(row, col)) else {
                    return ShotResult::Error;
                };
                ship.register_hit(row, col);
                if ship.is_sunk() {
                    ShotResult::Sunk(ship.ship_type())
                } else {
                    ShotResult::Hit
                }
            }
        }
    }

    /// `true` once the board is abandoned, or when it holds at least one ship
    /// and every ship is sunk.
    pub fn all_ships_sunk(&self) -> bool {
        self.abandoned || (!self.ships.is_empty() && self.ships.iter().all(Ship::is_sunk))
    }

    /// Flag the board as left behind by a disconnected participant.
    pub fn mark_abandoned(&mut self) {
        self.abandoned = true;
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }
}

impl fmt::Debug for ShipBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ShipBoard {{ abandoned: {}, ships: {:?} }}", self.abandoned, self.ships)?;
        for r in 0..self.size {
            for c in 0..self.size {
                let ch = match self.cells[r * self.size + c] {
                    Cell::Empty => '.',
                    Cell::Ship => 'S',
                    Cell::ShipHit => 'X',
                    Cell::Miss => 'o',
                };
                write!(f, "{}", ch)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
