//! Core primitives shared by the game and network layers.

pub mod id;

// Re-export core types
pub use id::{GameId, IdError, IdGenerator, UserId, UuidGenerator};
