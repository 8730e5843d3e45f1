//! Launchpad Grid
//!
//! The fixed 8×8 board. Column-major, row 0 is the bottom.
//! Pieces fall to the lowest empty row of a column (gravity drop).

use serde::{Deserialize, Serialize};

/// Board width and height.
pub const GRID_SIZE: usize = 8;

/// Pieces in a row needed to win.
pub const WIN_LENGTH: usize = 4;

// =============================================================================
// SEAT
// =============================================================================

/// One of the two seats at a game.
///
/// Cells store a seat instead of a user identifier, so a cell can only
/// ever be empty or owned by one of the two players.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    /// First player (the user whose join created the game).
    One,
    /// Second player (the user who was waiting).
    Two,
}

impl Seat {
    /// The other seat.
    #[inline]
    pub fn opponent(self) -> Seat {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }
}

// =============================================================================
// GRID
// =============================================================================

/// Cell contents.
pub type Cell = Option<Seat>;

/// Where a piece landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Column index.
    pub column: usize,
    /// Row index (0 = bottom).
    pub row: usize,
}

/// Unit step along one of the four win axes, as (column, row) deltas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Same row.
    Horizontal,
    /// Same column, scanned downward only.
    Vertical,
    /// Up-left / down-right.
    Rising,
    /// Up-right / down-left.
    Falling,
}

impl Axis {
    /// Check order used by [`Grid::winning_axis`].
    pub const ORDER: [Axis; 4] = [Axis::Horizontal, Axis::Vertical, Axis::Rising, Axis::Falling];

    fn step(self) -> (isize, isize) {
        match self {
            Axis::Horizontal => (1, 0),
            Axis::Vertical => (0, 1),
            Axis::Rising => (-1, 1),
            Axis::Falling => (1, 1),
        }
    }
}

/// Game board, indexed `cells[column][row]`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Grid {
    cells: [[Cell; GRID_SIZE]; GRID_SIZE],
}

impl Grid {
    /// Empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell at (column, row), `None` when out of bounds.
    pub fn get(&self, column: usize, row: usize) -> Option<Cell> {
        self.cells.get(column)?.get(row).copied()
    }

    /// Column contents, bottom first.
    pub fn column(&self, column: usize) -> Option<&[Cell; GRID_SIZE]> {
        self.cells.get(column)
    }

    /// Iterate columns left to right.
    pub fn columns(&self) -> impl Iterator<Item = &[Cell; GRID_SIZE]> {
        self.cells.iter()
    }

    /// A column is playable when it exists and its top cell is empty.
    pub fn is_playable(&self, column: usize) -> bool {
        matches!(self.get(column, GRID_SIZE - 1), Some(None))
    }

    /// Lowest empty row of a column.
    pub fn landing_row(&self, column: usize) -> Option<usize> {
        self.cells.get(column)?.iter().position(|c| c.is_none())
    }

    /// Drop a piece into a column.
    ///
    /// Returns `None` if the column does not exist or is full.
    pub fn drop_piece(&mut self, column: usize, seat: Seat) -> Option<Placement> {
        let row = self.landing_row(column)?;
        self.cells[column][row] = Some(seat);
        Some(Placement { column, row })
    }

    /// Count pieces in the run through `at` along `axis`, including `at`.
    ///
    /// The vertical axis only scans downward: gravity fills cells below a
    /// piece before it, so nothing above can belong to the run yet.
    pub fn run_length(&self, at: Placement, axis: Axis) -> usize {
        let owner = match self.get(at.column, at.row) {
            Some(Some(seat)) => seat,
            _ => return 0,
        };
        let (dc, dr) = axis.step();

        let forward = if axis == Axis::Vertical {
            0
        } else {
            self.count_from(at, dc, dr, owner)
        };
        1 + forward + self.count_from(at, -dc, -dr, owner)
    }

    fn count_from(&self, at: Placement, dc: isize, dr: isize, owner: Seat) -> usize {
        let mut count = 0;
        let mut column = at.column as isize + dc;
        let mut row = at.row as isize + dr;

        while column >= 0 && row >= 0 {
            match self.get(column as usize, row as usize) {
                Some(Some(seat)) if seat == owner => count += 1,
                _ => break,
            }
            column += dc;
            row += dr;
        }
        count
    }

    /// First axis (in [`Axis::ORDER`]) along which the piece at `at`
    /// completes a run of [`WIN_LENGTH`].
    pub fn winning_axis(&self, at: Placement) -> Option<Axis> {
        Axis::ORDER.into_iter().find(|&axis| {
            // Fewer than three pieces can sit below rows 0..3.
            if axis == Axis::Vertical && at.row < WIN_LENGTH - 1 {
                return false;
            }
            self.run_length(at, axis) >= WIN_LENGTH
        })
    }

    /// Number of pieces on the board.
    pub fn piece_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }
}
