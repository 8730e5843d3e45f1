//! Game Logic Module
//!
//! Connect-four rules. Pure and synchronous; the network layer owns all
//! locking and I/O.
//!
//! ## Module Structure
//!
//! - `grid`: Board, gravity drop, four-in-a-row detection
//! - `state`: Game record and its wire snapshot
//! - `play`: Move validation and application

pub mod grid;
pub mod state;
pub mod play;

// Re-export key types
pub use grid::{Grid, Seat, Placement, GRID_SIZE, WIN_LENGTH};
pub use state::{Game, GameSnapshot};
pub use play::{apply_play, PlayError, PlayPolicy};
