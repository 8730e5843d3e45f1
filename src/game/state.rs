//! Game State
//!
//! A single two-player connect-four game and its wire representation.

use serde::{Deserialize, Serialize, Serializer};

use crate::core::id::{GameId, UserId};
use crate::game::grid::{Grid, Placement, Seat};

/// A connect-four game between two users.
///
/// Serializes to the wire form clients render (see [`GameSnapshot`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Game {
    /// Game identifier.
    pub id: GameId,
    /// First player; the user whose join created the game.
    pub player1: UserId,
    /// Second player; the user who was waiting.
    pub player2: UserId,
    /// Board.
    pub grid: Grid,
    /// Seat to move.
    pub turn: Seat,
    /// Winner, set at most once.
    pub winner: Option<Seat>,
    /// Where the last piece landed.
    pub last_move: Option<Placement>,
}

impl Game {
    /// Create a game with an empty grid.
    pub fn new(id: GameId, player1: UserId, player2: UserId, first: Seat) -> Self {
        Self {
            id,
            player1,
            player2,
            grid: Grid::new(),
            turn: first,
            winner: None,
            last_move: None,
        }
    }

    /// Create a game whose opening turn is decided by a fair coin flip.
    pub fn with_coin_flip(id: GameId, player1: UserId, player2: UserId) -> Self {
        let first = if rand::random::<bool>() { Seat::One } else { Seat::Two };
        Self::new(id, player1, player2, first)
    }

    /// User sitting in a seat.
    pub fn player(&self, seat: Seat) -> &UserId {
        match seat {
            Seat::One => &self.player1,
            Seat::Two => &self.player2,
        }
    }

    /// Seat of a user, if they play in this game.
    pub fn seat_of(&self, user: &UserId) -> Option<Seat> {
        if *user == self.player1 {
            Some(Seat::One)
        } else if *user == self.player2 {
            Some(Seat::Two)
        } else {
            None
        }
    }

    /// User to move.
    pub fn turn_user(&self) -> &UserId {
        self.player(self.turn)
    }

    /// Winning user, if any.
    pub fn winner_user(&self) -> Option<&UserId> {
        self.winner.map(|seat| self.player(seat))
    }

    /// True once a winner is recorded.
    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// Record a winner unless one is already set.
    ///
    /// Returns whether the winner changed.
    pub fn declare_winner(&mut self, seat: Seat) -> bool {
        if self.winner.is_some() {
            return false;
        }
        self.winner = Some(seat);
        true
    }

    /// Wire representation.
    pub fn snapshot(&self) -> GameSnapshot {
        let mark = |cell: Option<Seat>| cell.map(|s| self.player(s).to_string()).unwrap_or_default();

        GameSnapshot {
            uuid: self.id.to_string(),
            player1: self.player1.to_string(),
            player2: self.player2.to_string(),
            grid: self
                .grid
                .columns()
                .map(|column| column.iter().map(|&c| mark(c)).collect())
                .collect(),
            turn: self.turn_user().to_string(),
            winner: self.winner_user().map(|u| u.to_string()).unwrap_or_default(),
            last_play_col: self.last_move.map(|p| p.column as i64).unwrap_or(-1),
            last_play_line: self.last_move.map(|p| p.row as i64).unwrap_or(-1),
        }
    }
}

impl Serialize for Game {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

/// Game as sent to clients.
///
/// Empty cells and a missing winner are `""`; the grid is
/// `grid[column][row]` with row 0 at the bottom; unset last-move
/// coordinates are `-1`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// Game identifier.
    pub uuid: String,
    /// First player.
    pub player1: String,
    /// Second player.
    pub player2: String,
    /// Cell owners.
    pub grid: Vec<Vec<String>>,
    /// User to move.
    pub turn: String,
    /// Winner, or empty.
    pub winner: String,
    /// Column of the last move, or -1.
    pub last_play_col: i64,
    /// Row of the last move, or -1.
    pub last_play_line: i64,
}

impl GameSnapshot {
    /// Number of non-empty cells.
    pub fn piece_count(&self) -> usize {
        self.grid.iter().flatten().filter(|c| !c.is_empty()).count()
    }
}
