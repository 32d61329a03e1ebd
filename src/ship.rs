//! Ship catalog and placed ships.

use core::fmt;

use crate::common::BoardError;

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Map the wire `horizontal` flag onto an orientation.
    pub fn from_horizontal(horizontal: bool) -> Self {
        if horizontal {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }

    pub fn is_horizontal(self) -> bool {
        self == Orientation::Horizontal
    }
}

/// The fixed fleet every participant has to place, in placement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShipType {
    Carrier,
    Battleship,
    Cruiser,
    Submarine,
    Destroyer,
}

impl ShipType {
    /// Every ship type, in the order participants are asked to place them.
    pub const ALL: [ShipType; 5] = [
        ShipType::Carrier,
        ShipType::Battleship,
        ShipType::Cruiser,
        ShipType::Submarine,
        ShipType::Destroyer,
    ];

    /// Number of cells the ship covers.
    pub const fn length(self) -> usize {
        match self {
            ShipType::Carrier => 5,
            ShipType::Battleship => 4,
            ShipType::Cruiser => 3,
            ShipType::Submarine => 3,
            ShipType::Destroyer => 2,
        }
    }

    /// Human readable name, used in prompts and sink announcements.
    pub const fn name(self) -> &'static str {
        match self {
            ShipType::Carrier => "Carrier",
            ShipType::Battleship => "Battleship",
            ShipType::Cruiser => "Cruiser",
            ShipType::Submarine => "Submarine",
            ShipType::Destroyer => "Destroyer",
        }
    }

    /// Identifier used on the wire (`PLACE_SHIP:<type>:...`).
    pub const fn wire_name(self) -> &'static str {
        match self {
            ShipType::Carrier => "CARRIER",
            ShipType::Battleship => "BATTLESHIP",
            ShipType::Cruiser => "CRUISER",
            ShipType::Submarine => "SUBMARINE",
            ShipType::Destroyer => "DESTROYER",
        }
    }

    /// Case-insensitive lookup by wire identifier.
    pub fn from_wire(token: &str) -> Option<Self> {
        ShipType::ALL
            .iter()
            .copied()
            .find(|t| t.wire_name().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for ShipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A ship placed on a square grid, with one hit flag per segment.
///
/// Segments are fixed at construction; only the hit flags change afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct Ship {
    ship_type: ShipType,
    orientation: Orientation,
    segments: Vec<(usize, usize)>,
    hits: Vec<bool>,
}

impl Ship {
    /// Lay out a ship starting at (`row`, `col`) on a `grid_size`×`grid_size` grid.
    pub fn new(
        ship_type: ShipType,
        orientation: Orientation,
        row: usize,
        col: usize,
        grid_size: usize,
    ) -> Result<Self, BoardError> {
        let len = ship_type.length();
        let fits = match orientation {
            Orientation::Horizontal => row < grid_size && col + len <= grid_size,
            Orientation::Vertical => col < grid_size && row + len <= grid_size,
        };
        if !fits {
            return Err(BoardError::ShipOutOfBounds);
        }

        let segments = (0..len)
            .map(|i| match orientation {
                Orientation::Horizontal => (row, col + i),
                Orientation::Vertical => (row + i, col),
            })
            .collect();
        Ok(Ship {
            ship_type,
            orientation,
            segments,
            hits: vec![false; len],
        })
    }

    pub fn ship_type(&self) -> ShipType {
        self.ship_type
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Origin of the ship (row, col).
    pub fn origin(&self) -> (usize, usize) {
        self.segments[0]
    }

    /// Cells covered by the ship, from the origin outwards.
    pub fn segments(&self) -> &[(usize, usize)] {
        &self.segments
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.segments.contains(&(row, col))
    }

    /// Mark the segment at (`row`, `col`) as hit.
    /// Returns `true` only the first time a segment of this ship is hit there.
    pub fn register_hit(&mut self, row: usize, col: usize) -> bool {
        match self.segments.iter().position(|&s| s == (row, col)) {
            Some(i) if !self.hits[i] => {
                self.hits[i] = true;
                true
            }
            _ => false,
        }
    }

    /// Check if the ship is sunk (all segments hit).
    pub fn is_sunk(&self) -> bool {
        self.hits.iter().all(|&h| h)
    }
}

impl fmt::Debug for Ship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ship {{ name: \"{}\", origin: {:?}, orientation: {:?}, hits: {} }}",
            self.ship_type.name(),
            self.origin(),
            self.orientation,
            self.hits.iter().filter(|&&h| h).count(),
        )
    }
}
