//! Notification Dispatcher
//!
//! Pushes game updates to both participants. A participant that cannot be
//! reached at push time forfeits: the other one is declared winner. This is
//! the only place a disconnect ends a game.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::id::UserId;
use crate::game::grid::Seat;
use crate::game::state::Game;
use crate::network::error::LaunchpadError;
use crate::network::presence::{NotifierRef, PresenceRegistry};
use crate::network::protocol::{event, Response, ServerFrame};
use crate::network::store::GameStore;

/// Delivers game updates and lobby announcements.
pub struct NotificationDispatcher {
    presence: Arc<PresenceRegistry>,
    store: Arc<GameStore>,
}

impl NotificationDispatcher {
    /// Create a dispatcher.
    pub fn new(presence: Arc<PresenceRegistry>, store: Arc<GameStore>) -> Self {
        Self { presence, store }
    }

    /// Push `game` to its participants under the `play` event.
    ///
    /// Returns the game as finally persisted, which differs from the input
    /// when a forfeit was applied.
    pub async fn publish(&self, game: Game, status: u16) -> Game {
        let one = self.presence.lookup(&game.player1).await;
        let two = self.presence.lookup(&game.player2).await;

        match (one, two) {
            (Some(one), Some(two)) => {
                let frame = play_frame(&game, status);
                send(&one.notifier, &one.id, frame.clone());
                send(&two.notifier, &two.id, frame);
                game
            }
            (Some(present), None) => self.forfeit(game, Seat::One, present.notifier, status).await,
            (None, Some(present)) => self.forfeit(game, Seat::Two, present.notifier, status).await,
            (None, None) => {
                debug!("Game {}: no participant reachable", game.id);
                game
            }
        }
    }

    async fn forfeit(&self, game: Game, present: Seat, notifier: NotifierRef, status: u16) -> Game {
        info!(
            "Game {}: {} unreachable, forfeit to {}",
            game.id,
            game.player(present.opponent()),
            game.player(present)
        );

        let result: Result<Game, LaunchpadError> = self
            .store
            .update(&game.id, |current| {
                let mut next = current.clone();
                next.declare_winner(present);
                Ok(next)
            })
            .await;

        let game = match result {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("Game {}: forfeit not persisted: {}", game.id, e);
                let mut local = game;
                local.declare_winner(present);
                local
            }
        };

        send(&notifier, game.player(present), play_frame(&game, status));
        game
    }

    /// Tell every lobby member except `newcomer` that someone is waiting.
    pub async fn announce_waiting(&self, newcomer: &UserId) {
        let notifiers = self.presence.lobby_notifiers(newcomer).await;
        debug!("Announcing waiting user {} to {} lobby members", newcomer, notifiers.len());

        for notifier in notifiers {
            let frame = ServerFrame::push(event::CONNECT4_WAITING, serde_json::Value::Null);
            if let Err(e) = notifier.notify(frame) {
                debug!("Lobby announcement dropped: {}", e);
            }
        }
    }
}

fn play_frame(game: &Game, status: u16) -> ServerFrame {
    ServerFrame::push(event::PLAY, Response::with_game(status, game).to_value())
}

fn send(notifier: &NotifierRef, user: &UserId, frame: ServerFrame) {
    if let Err(e) = notifier.notify(frame) {
        warn!("Push to {} failed: {}", user, e);
    }
}
