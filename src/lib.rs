//! # Launchpad Game Server
//!
//! Matchmaking and authoritative game state for two-player connect four
//! over WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LAUNCHPAD SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/              - Shared primitives                      │
//! │  └── id.rs          - User/game identifiers and generators   │
//! │                                                              │
//! │  game/              - Rules (pure, synchronous)              │
//! │  ├── grid.rs        - 8x8 board, gravity, win detection      │
//! │  ├── state.rs       - Game record and wire snapshot          │
//! │  └── play.rs        - Move validation and application        │
//! │                                                              │
//! │  network/           - Connections and shared state           │
//! │  ├── server.rs      - WebSocket server                       │
//! │  ├── protocol.rs    - Frames and response envelope           │
//! │  ├── service.rs     - Event handlers                         │
//! │  ├── presence.rs    - Connected users and heartbeats         │
//! │  ├── matchmaking.rs - Single-slot pairing queue              │
//! │  ├── store.rs       - Per-game locked storage                │
//! │  ├── dispatch.rs    - Pushes and forfeit on absence          │
//! │  └── error.rs       - Error to status mapping                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! - Every game sits behind its own lock; a move is an atomic
//!   read-validate-write on that game only.
//! - The waiting slot is locked before the game store, never the reverse.
//! - Pushes never block: a full or closed connection drops the frame.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::id::{GameId, IdGenerator, UserId, UuidGenerator};
pub use crate::game::state::{Game, GameSnapshot};
pub use crate::game::grid::{Seat, GRID_SIZE, WIN_LENGTH};
pub use crate::network::server::{GameServer, ServerConfig};
pub use crate::network::service::Launchpad;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
