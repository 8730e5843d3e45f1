//! Game Store
//!
//! Owns every game. Each game sits behind its own lock, so updates to one
//! game are atomic read-modify-write without serializing unrelated games.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::core::id::GameId;
use crate::game::state::Game;

/// Store failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No game with this identifier.
    #[error("Game not found: {0}")]
    NotFound(GameId),
}

/// Game identifier → game.
pub struct GameStore {
    games: RwLock<BTreeMap<GameId, Arc<Mutex<Game>>>>,
}

impl GameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            games: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert or replace a game.
    pub async fn insert(&self, game: Game) {
        let id = game.id.clone();
        self.games.write().await.insert(id, Arc::new(Mutex::new(game)));
    }

    /// Snapshot of a game.
    pub async fn get(&self, id: &GameId) -> Option<Game> {
        let slot = self.slot(id).await?;
        let game = slot.lock().await;
        Some(game.clone())
    }

    /// Drop a game. Returns whether it existed.
    pub async fn remove(&self, id: &GameId) -> bool {
        self.games.write().await.remove(id).is_some()
    }

    /// Atomically transform a game.
    ///
    /// `transform` sees the current state under the game's lock; its result
    /// is written back only on success. Unknown ids fail before `transform`
    /// runs.
    pub async fn update<F, E>(&self, id: &GameId, transform: F) -> Result<Game, E>
    where
        F: FnOnce(&Game) -> Result<Game, E>,
        E: From<StoreError>,
    {
        let slot = self
            .slot(id)
            .await
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let mut current = slot.lock().await;
        let next = transform(&current)?;
        *current = next.clone();
        Ok(next)
    }

    /// Number of stored games.
    pub async fn game_count(&self) -> usize {
        self.games.read().await.len()
    }

    async fn slot(&self, id: &GameId) -> Option<Arc<Mutex<Game>>> {
        self.games.read().await.get(id).cloned()
    }
}

impl Default for GameStore {
    fn default() -> Self {
        Self::new()
    }
}
