//! Move Application
//!
//! Validates a play against the current game, applies the gravity drop,
//! runs win detection and rotates the turn. Pure: no I/O, no locking.

use thiserror::Error;

use crate::core::id::UserId;
use crate::game::grid::GRID_SIZE;
use crate::game::state::Game;

/// Rules that vary between deployments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayPolicy {
    /// Reject plays once a winner is recorded.
    ///
    /// Off by default: after a win the turn still rotates and the next
    /// play is accepted.
    pub reject_after_win: bool,
}

/// Reasons a play is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayError {
    /// Game already has a winner (only with `reject_after_win`).
    #[error("game is over")]
    GameOver,
    /// Requester is not the user to move.
    #[error("not your turn")]
    NotYourTurn,
    /// Column outside the grid or already full.
    #[error("invalid column")]
    InvalidColumn,
}

/// Apply `user`'s play in `column` to a copy of `game`.
///
/// The column is signed because it comes straight off the wire.
pub fn apply_play(
    game: &Game,
    user: &UserId,
    column: i64,
    policy: PlayPolicy,
) -> Result<Game, PlayError> {
    if policy.reject_after_win && game.is_over() {
        return Err(PlayError::GameOver);
    }

    if game.turn_user() != user {
        return Err(PlayError::NotYourTurn);
    }

    let column = usize::try_from(column)
        .ok()
        .filter(|&c| c < GRID_SIZE && game.grid.is_playable(c))
        .ok_or(PlayError::InvalidColumn)?;

    let mut next = game.clone();
    let mover = next.turn;
    let placed = next
        .grid
        .drop_piece(column, mover)
        .ok_or(PlayError::InvalidColumn)?;
    next.last_move = Some(placed);

    if next.grid.winning_axis(placed).is_some() {
        next.declare_winner(mover);
    }

    next.turn = mover.opponent();
    Ok(next)
}
