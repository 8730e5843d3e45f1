//! Matchmaking
//!
//! Single-slot queue: the first joiner waits, the next one is paired with
//! them and a game is created.
//!
//! Lock order is waiting slot, then game store. Pushes happen only after
//! the slot lock is released.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::core::id::{GameId, IdGenerator, UserId};
use crate::game::state::Game;
use crate::network::dispatch::NotificationDispatcher;
use crate::network::error::LaunchpadError;
use crate::network::presence::PresenceRegistry;
use crate::network::protocol::status;
use crate::network::store::GameStore;

/// Result of a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Requester is now waiting for an opponent.
    Queued,
    /// Requester was paired; the new game as pushed to the players.
    Created(Game),
}

/// What happened under the slot lock.
enum Pairing {
    Queued,
    Created(Game),
}

/// Pairs waiting users into games.
pub struct Matchmaker {
    slot: Mutex<Option<UserId>>,
    presence: Arc<PresenceRegistry>,
    store: Arc<GameStore>,
    dispatcher: Arc<NotificationDispatcher>,
    ids: Arc<dyn IdGenerator>,
}

impl Matchmaker {
    /// Create a matchmaker with an empty waiting slot.
    pub fn new(
        presence: Arc<PresenceRegistry>,
        store: Arc<GameStore>,
        dispatcher: Arc<NotificationDispatcher>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            slot: Mutex::new(None),
            presence,
            store,
            dispatcher,
            ids,
        }
    }

    /// Join the connect-four queue.
    ///
    /// If the waiting user turns out to be unreachable once the game is
    /// created, the game is discarded and the requester joins again, which
    /// normally leaves them waiting in the slot.
    #[instrument(skip(self))]
    pub async fn join(&self, requester: &UserId) -> Result<JoinOutcome, LaunchpadError> {
        loop {
            match self.pair(requester).await? {
                Pairing::Queued => {
                    self.presence.leave_lobby(requester).await;
                    self.dispatcher.announce_waiting(requester).await;
                    debug!("User {} queued", requester);
                    return Ok(JoinOutcome::Queued);
                }
                Pairing::Created(game) => {
                    if self.presence.lookup(&game.player2).await.is_none() {
                        info!(
                            "Waiting user {} unreachable, dropping game {} and requeuing {}",
                            game.player2, game.id, requester
                        );
                        self.store.remove(&game.id).await;
                        continue;
                    }

                    info!("Created game {}: {} vs {}", game.id, game.player1, game.player2);
                    let game = self.dispatcher.publish(game, status::CREATED).await;
                    return Ok(JoinOutcome::Created(game));
                }
            }
        }
    }

    async fn pair(&self, requester: &UserId) -> Result<Pairing, LaunchpadError> {
        let mut slot = self.slot.lock().await;

        let opponent = match slot.take() {
            None => {
                *slot = Some(requester.clone());
                return Ok(Pairing::Queued);
            }
            Some(waiting) if waiting == *requester => {
                *slot = Some(waiting);
                return Err(LaunchpadError::Forbidden("cannot play against yourself".to_string()));
            }
            Some(waiting) => waiting,
        };

        let game_id = match self.ids.generate() {
            Ok(id) => GameId::new(id),
            Err(e) => {
                *slot = Some(opponent);
                return Err(e.into());
            }
        };

        let game = Game::with_coin_flip(game_id, requester.clone(), opponent);
        self.store.insert(game.clone()).await;
        Ok(Pairing::Created(game))
    }

    /// User currently waiting, if any.
    pub async fn waiting(&self) -> Option<UserId> {
        self.slot.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::id::testing::SequentialIds;
    use crate::game::grid::Seat;
    use crate::network::presence::testing::RecordingNotifier;

    struct Fixture {
        presence: Arc<PresenceRegistry>,
        store: Arc<GameStore>,
        game_ids: Arc<SequentialIds>,
        matchmaker: Matchmaker,
    }

    fn fixture() -> Fixture {
        let presence = Arc::new(PresenceRegistry::new(Arc::new(SequentialIds::new("u"))));
        let store = Arc::new(GameStore::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(presence.clone(), store.clone()));
        let game_ids = Arc::new(SequentialIds::new("g"));
        let matchmaker = Matchmaker::new(presence.clone(), store.clone(), dispatcher, game_ids.clone());
        Fixture {
            presence,
            store,
            game_ids,
            matchmaker,
        }
    }

    async fn connect(f: &Fixture) -> (UserId, Arc<RecordingNotifier>) {
        let notifier = RecordingNotifier::new();
        let id = f.presence.register(notifier.clone()).await.unwrap();
        (id, notifier)
    }

    #[tokio::test]
    async fn test_first_joiner_is_queued() {
        let f = fixture();
        let (a, _) = connect(&f).await;
        assert_eq!(f.matchmaker.join(&a).await.unwrap(), JoinOutcome::Queued);
        assert_eq!(f.matchmaker.waiting().await, Some(a));
    }

    #[tokio::test]
    async fn test_self_match_is_forbidden() {
        let f = fixture();
        let (a, _) = connect(&f).await;
        f.matchmaker.join(&a).await.unwrap();

        let err = f.matchmaker.join(&a).await.unwrap_err();
        assert_eq!(err.status(), 403);
        assert_eq!(f.matchmaker.waiting().await, Some(a));
        assert_eq!(f.store.game_count().await, 0);
    }

    #[tokio::test]
    async fn test_second_joiner_creates_game() {
        let f = fixture();
        let (a, na) = connect(&f).await;
        let (b, nb) = connect(&f).await;

        f.matchmaker.join(&a).await.unwrap();
        let game = match f.matchmaker.join(&b).await.unwrap() {
            JoinOutcome::Created(game) => game,
            other => panic!("expected a game, got {:?}", other),
        };

        assert_eq!(game.player1, b);
        assert_eq!(game.player2, a);
        assert!(game.turn_user() == &a || game.turn_user() == &b);
        assert_eq!(game.grid.piece_count(), 0);
        assert!(game.last_move.is_none());
        assert!(game.winner.is_none());
        assert_eq!(f.matchmaker.waiting().await, None);
        assert_eq!(f.store.get(&game.id).await, Some(game.clone()));

        for notifier in [&na, &nb] {
            let plays: Vec<_> = notifier.frames().into_iter().filter(|fr| fr.event == "play").collect();
            assert_eq!(plays.len(), 1);
            assert_eq!(plays[0].data["status"], 201);
            assert_eq!(plays[0].data["game"], "connect4");
        }
    }

    #[tokio::test]
    async fn test_queued_user_leaves_lobby_and_lobby_is_told() {
        let f = fixture();
        let (a, na) = connect(&f).await;
        let (_b, nb) = connect(&f).await;

        f.matchmaker.join(&a).await.unwrap();

        assert!(na.frames().is_empty());
        assert_eq!(nb.events(), vec!["connect4.waiting".to_string()]);
        assert!(!f.presence.lookup(&a).await.unwrap().in_lobby);
    }

    #[tokio::test]
    async fn test_id_failure_keeps_waiting_user() {
        let f = fixture();
        let (a, _) = connect(&f).await;
        let (b, _) = connect(&f).await;
        f.matchmaker.join(&a).await.unwrap();

        f.game_ids.set_failing(true);
        let err = f.matchmaker.join(&b).await.unwrap_err();
        assert_eq!(err.status(), 500);
        assert_eq!(f.matchmaker.waiting().await, Some(a));
        assert_eq!(f.store.game_count().await, 0);
    }

    #[tokio::test]
    async fn test_unreachable_waiting_user_requeues_requester() {
        let f = fixture();
        let (a, na) = connect(&f).await;
        let (b, nb) = connect(&f).await;
        f.matchmaker.join(&a).await.unwrap();
        na.close();

        assert_eq!(f.matchmaker.join(&b).await.unwrap(), JoinOutcome::Queued);
        assert_eq!(f.matchmaker.waiting().await, Some(b));
        assert_eq!(f.store.game_count().await, 0);
        assert!(nb.frames().iter().all(|fr| fr.event != "play"));
    }

    #[tokio::test]
    async fn test_unreachable_requester_forfeits_to_waiting_user() {
        let f = fixture();
        let (a, na) = connect(&f).await;
        f.matchmaker.join(&a).await.unwrap();

        // A join from an identifier that never connected.
        let ghost = UserId::new("ghost");
        let game = match f.matchmaker.join(&ghost).await.unwrap() {
            JoinOutcome::Created(game) => game,
            other => panic!("expected a game, got {:?}", other),
        };
        assert_eq!(game.winner, Some(Seat::Two));
        assert_eq!(na.events(), vec!["play".to_string()]);
    }

    #[tokio::test]
    async fn test_opening_turn_varies_across_pairings() {
        let f = fixture();
        let mut first_is_waiting = 0;
        let rounds = 64;

        for _ in 0..rounds {
            let (a, _) = connect(&f).await;
            let (b, _) = connect(&f).await;
            f.matchmaker.join(&a).await.unwrap();
            if let JoinOutcome::Created(game) = f.matchmaker.join(&b).await.unwrap() {
                if game.turn_user() == &a {
                    first_is_waiting += 1;
                }
            }
        }

        assert!(first_is_waiting > 0 && first_is_waiting < rounds);
    }
}
