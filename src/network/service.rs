//! Launchpad Service
//!
//! Transport-independent request handling. Each inbound event becomes one
//! call here and always yields a response envelope; failures are reported
//! in the envelope, never raised to the connection task.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::id::{GameId, IdGenerator, UserId};
use crate::game::play::{apply_play, PlayPolicy};
use crate::network::dispatch::NotificationDispatcher;
use crate::network::error::LaunchpadError;
use crate::network::matchmaking::{JoinOutcome, Matchmaker};
use crate::network::presence::{NotifierRef, PresenceRegistry};
use crate::network::protocol::{
    decode_payload, event, status, ClientFrame, JoinRequest, PlayRequest, Response, CONNECT4,
};
use crate::network::store::GameStore;

/// Presence, matchmaking, games and notifications wired together.
pub struct Launchpad {
    presence: Arc<PresenceRegistry>,
    store: Arc<GameStore>,
    dispatcher: Arc<NotificationDispatcher>,
    matchmaker: Matchmaker,
    policy: PlayPolicy,
}

impl Launchpad {
    /// Build the service around an identifier source.
    pub fn new(ids: Arc<dyn IdGenerator>, policy: PlayPolicy) -> Self {
        let presence = Arc::new(PresenceRegistry::new(ids.clone()));
        let store = Arc::new(GameStore::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(presence.clone(), store.clone()));
        let matchmaker = Matchmaker::new(presence.clone(), store.clone(), dispatcher.clone(), ids);

        Self {
            presence,
            store,
            dispatcher,
            matchmaker,
            policy,
        }
    }

    /// Route a client frame to its handler.
    pub async fn handle(&self, frame: &ClientFrame) -> Response {
        match frame.event.as_str() {
            event::HEARTBEAT => self.heartbeat(&frame.data).await,
            event::JOIN => self.join(&frame.data).await,
            event::PLAY_CONNECT4 | event::PLAY => self.play(&frame.data).await,
            other => finish(Err(LaunchpadError::Validation(format!("unknown event {}", other)))),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the `connect` envelope and, on success, the new identifier.
    pub async fn connect(&self, notifier: NotifierRef) -> (Response, Option<UserId>) {
        match self.presence.register(notifier).await {
            Ok(id) => (Response::with_data(status::OK, id.as_str()), Some(id)),
            Err(e) => (finish(Err(e)), None),
        }
    }

    /// Forget a closed connection.
    ///
    /// Games it took part in are not touched here; the opponent's next
    /// action discovers the absence and triggers the forfeit.
    pub async fn disconnect(&self, user: &UserId) {
        self.presence.unregister(user).await;
    }

    /// `heartbeat` event; payload is the user identifier.
    pub async fn heartbeat(&self, data: &Value) -> Response {
        let result = match data {
            Value::String(id) => {
                let id = UserId::new(id.as_str());
                self.presence
                    .heartbeat(&id)
                    .await
                    .map(|_| Response::with_data(status::OK, id.as_str()))
            }
            Value::Null => Err(LaunchpadError::Unauthorized),
            other => Err(LaunchpadError::Validation(format!("heartbeat> bad request: {}", other))),
        };
        finish(result)
    }

    /// `join` event.
    pub async fn join(&self, data: &Value) -> Response {
        finish(self.try_join(data).await)
    }

    async fn try_join(&self, data: &Value) -> Result<Response, LaunchpadError> {
        let request: JoinRequest = decode_payload(data)
            .map_err(|e| LaunchpadError::Validation(format!("joinGame> unable to decode {}: {}", data, e)))?;

        if request.game != CONNECT4 {
            return Err(LaunchpadError::Validation(format!("Unknown game {}", request.game)));
        }
        if request.uuid.is_empty() {
            return Err(LaunchpadError::Validation("joinGame> missing uuid".to_string()));
        }

        match self.matchmaker.join(&UserId::new(request.uuid)).await? {
            JoinOutcome::Queued => Ok(Response::status(status::ACCEPTED)),
            JoinOutcome::Created(game) => Ok(Response::with_game(status::CREATED, &game)),
        }
    }

    /// `play.connect4` event.
    pub async fn play(&self, data: &Value) -> Response {
        finish(self.try_play(data).await)
    }

    async fn try_play(&self, data: &Value) -> Result<Response, LaunchpadError> {
        let request: PlayRequest = decode_payload(data)
            .map_err(|e| LaunchpadError::Validation(format!("playConnect4> bad request: {}: {}", data, e)))?;

        let game_id = GameId::new(request.game_uuid);
        let user = UserId::new(request.user_uuid);
        let policy = self.policy;

        let game = self
            .store
            .update(&game_id, |current| {
                apply_play(current, &user, request.col, policy).map_err(LaunchpadError::from)
            })
            .await?;

        debug!("Game {}: {} played column {}", game.id, user, request.col);

        let game = self.dispatcher.publish(game, status::OK).await;
        Ok(Response::with_game(status::OK, &game))
    }

    /// Number of connected users.
    pub async fn user_count(&self) -> usize {
        self.presence.user_count().await
    }

    /// Number of games created so far.
    pub async fn game_count(&self) -> usize {
        self.store.game_count().await
    }

    /// User waiting for an opponent, if any.
    pub async fn waiting(&self) -> Option<UserId> {
        self.matchmaker.waiting().await
    }
}

/// Turn a handler result into an envelope, logging failures.
fn finish(result: Result<Response, LaunchpadError>) -> Response {
    match result {
        Ok(response) => response,
        Err(e) => {
            let response = e.to_response();
            warn!(status = response.status, "{}", response.error);
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::id::testing::SequentialIds;
    use crate::game::state::GameSnapshot;
    use crate::network::presence::testing::RecordingNotifier;
    use serde_json::json;

    struct Client {
        id: UserId,
        notifier: Arc<RecordingNotifier>,
    }

    fn launchpad() -> (Launchpad, Arc<SequentialIds>) {
        let ids = Arc::new(SequentialIds::new("id"));
        (Launchpad::new(ids.clone(), PlayPolicy::default()), ids)
    }

    async fn connect(lp: &Launchpad) -> Client {
        let notifier = RecordingNotifier::new();
        let (response, id) = lp.connect(notifier.clone()).await;
        assert_eq!(response.status, 200);
        let id = id.unwrap();
        assert_eq!(response.data, json!(id.as_str()));
        Client { id, notifier }
    }

    fn join_data(user: &Client) -> Value {
        json!({"game": "connect4", "uuid": user.id.as_str()})
    }

    fn play_data(game: &GameSnapshot, user: &str, col: i64) -> Value {
        json!({"game_uuid": game.uuid, "user_uuid": user, "col": col})
    }

    fn snapshot(response: &Response) -> GameSnapshot {
        serde_json::from_value(response.data.clone()).unwrap()
    }

    /// Connect two users and pair them.
    async fn paired(lp: &Launchpad) -> (Client, Client, GameSnapshot) {
        let a = connect(lp).await;
        let b = connect(lp).await;
        assert_eq!(lp.join(&join_data(&a)).await.status, 202);
        let created = lp.join(&join_data(&b)).await;
        assert_eq!(created.status, 201);
        let game = snapshot(&created);
        (a, b, game)
    }

    #[tokio::test]
    async fn test_connect_then_pair_scenario() {
        let (lp, _) = launchpad();
        let (a, b, game) = paired(&lp).await;

        let players = [game.player1.clone(), game.player2.clone()];
        assert!(players.contains(&a.id.to_string()));
        assert!(players.contains(&b.id.to_string()));
        assert!(game.turn == a.id.as_str() || game.turn == b.id.as_str());
        assert_eq!(game.winner, "");
        assert_eq!(game.last_play_col, -1);
        assert_eq!(game.piece_count(), 0);
        assert_eq!(lp.game_count().await, 1);
        assert_eq!(lp.waiting().await, None);
    }

    #[tokio::test]
    async fn test_connect_fails_when_ids_fail() {
        let (lp, ids) = launchpad();
        ids.set_failing(true);
        let (response, id) = lp.connect(RecordingNotifier::new()).await;
        assert_eq!(response.status, 500);
        assert!(!response.error.is_empty());
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn test_heartbeat_scenarios() {
        let (lp, _) = launchpad();
        let a = connect(&lp).await;

        let ok = lp.heartbeat(&json!(a.id.as_str())).await;
        assert_eq!(ok.status, 200);
        assert_eq!(ok.data, json!(a.id.as_str()));

        assert_eq!(lp.heartbeat(&json!("")).await.status, 401);
        assert_eq!(lp.heartbeat(&json!("never-issued")).await.status, 401);
        assert_eq!(lp.heartbeat(&Value::Null).await.status, 401);
        assert_eq!(lp.heartbeat(&json!({"uuid": 1})).await.status, 400);
    }

    #[tokio::test]
    async fn test_join_validation() {
        let (lp, _) = launchpad();
        let a = connect(&lp).await;

        let unknown = lp.join(&json!({"game": "chess", "uuid": a.id.as_str()})).await;
        assert_eq!(unknown.status, 400);
        assert_eq!(unknown.error, "Unknown game chess");

        assert_eq!(lp.join(&json!("{not json")).await.status, 400);
        assert_eq!(lp.join(&json!({"game": "connect4", "uuid": ""})).await.status, 400);

        let stringified = json!(format!(r#"{{"game":"connect4","uuid":"{}"}}"#, a.id));
        assert_eq!(lp.join(&stringified).await.status, 202);
        assert_eq!(lp.join(&join_data(&a)).await.status, 403);
        assert_eq!(lp.waiting().await, Some(a.id.clone()));
    }

    #[tokio::test]
    async fn test_play_flow_and_push() {
        let (lp, _) = launchpad();
        let (_a, _b, game) = paired(&lp).await;

        let mover = game.turn.clone();
        let other = if mover == game.player1 { game.player2.clone() } else { game.player1.clone() };

        let response = lp.play(&play_data(&game, &mover, 4)).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.game, "connect4");
        assert_eq!(response.game_uuid, game.uuid);

        let after = snapshot(&response);
        assert_eq!(after.grid[4][0], mover);
        assert_eq!(after.turn, other);
        assert_eq!((after.last_play_col, after.last_play_line), (4, 0));

        // Same player again: not their turn.
        assert_eq!(lp.play(&play_data(&game, &mover, 4)).await.status, 403);
    }

    #[tokio::test]
    async fn test_play_pushes_to_both_players() {
        let (lp, _) = launchpad();
        let (a, b, game) = paired(&lp).await;

        let response = lp.play(&play_data(&game, &game.turn, 0)).await;
        for client in [&a, &b] {
            let last = client.notifier.frames().pop().unwrap();
            assert_eq!(last.event, "play");
            assert_eq!(last.data, response.to_value());
        }
    }

    #[tokio::test]
    async fn test_play_errors() {
        let (lp, _) = launchpad();
        let (_a, _b, game) = paired(&lp).await;

        let malformed = lp.play(&json!({"game_uuid": game.uuid})).await;
        assert_eq!(malformed.status, 400);

        let missing = lp
            .play(&json!({"game_uuid": "nope", "user_uuid": game.turn, "col": 0}))
            .await;
        assert_eq!(missing.status, 404);

        let out_of_range = lp.play(&play_data(&game, &game.turn, 8)).await;
        assert_eq!(out_of_range.status, 403);
        assert_eq!(out_of_range.error, "invalid column");

        let negative = lp.play(&play_data(&game, &game.turn, -1)).await;
        assert_eq!(negative.status, 403);
    }

    #[tokio::test]
    async fn test_full_column_is_forbidden() {
        let (lp, _) = launchpad();
        let (_a, _b, game) = paired(&lp).await;

        let mut turn = game.turn.clone();
        for row in 0..8 {
            let response = lp.play(&play_data(&game, &turn, 2)).await;
            assert_eq!(response.status, 200);
            let after = snapshot(&response);
            assert_eq!(after.last_play_line, row);
            turn = after.turn;
        }
        assert_eq!(lp.play(&play_data(&game, &turn, 2)).await.status, 403);
    }

    #[tokio::test]
    async fn test_vertical_win_via_service() {
        let (lp, _) = launchpad();
        let (_a, _b, game) = paired(&lp).await;
        let first = game.turn.clone();
        let second = if first == game.player1 { game.player2.clone() } else { game.player1.clone() };

        for _ in 0..3 {
            assert_eq!(lp.play(&play_data(&game, &first, 3)).await.status, 200);
            assert_eq!(lp.play(&play_data(&game, &second, 5)).await.status, 200);
        }
        let winning = snapshot(&lp.play(&play_data(&game, &first, 3)).await);
        assert_eq!(winning.winner, first);
        assert_eq!(winning.last_play_line, 3);
        // The turn still rotates after a win.
        assert_eq!(winning.turn, second);
    }

    #[tokio::test]
    async fn test_reject_after_win_policy() {
        let ids = Arc::new(SequentialIds::new("id"));
        let lp = Launchpad::new(ids, PlayPolicy { reject_after_win: true });
        let (_a, _b, game) = paired(&lp).await;
        let first = game.turn.clone();
        let second = if first == game.player1 { game.player2.clone() } else { game.player1.clone() };

        for _ in 0..3 {
            lp.play(&play_data(&game, &first, 3)).await;
            lp.play(&play_data(&game, &second, 5)).await;
        }
        lp.play(&play_data(&game, &first, 3)).await;

        let rejected = lp.play(&play_data(&game, &second, 5)).await;
        assert_eq!(rejected.status, 403);
        assert_eq!(rejected.error, "game is over");
    }

    #[tokio::test]
    async fn test_disconnected_opponent_forfeits_on_next_play() {
        let (lp, _) = launchpad();
        let (a, b, game) = paired(&lp).await;
        let (mover, gone) = if game.turn == a.id.as_str() { (&a, &b) } else { (&b, &a) };

        lp.disconnect(&gone.id).await;
        let frames_before = gone.notifier.frames().len();

        let response = lp.play(&play_data(&game, mover.id.as_str(), 1)).await;
        assert_eq!(response.status, 200);
        let after = snapshot(&response);
        assert_eq!(after.winner, mover.id.as_str());

        let pushed = mover.notifier.frames().pop().unwrap();
        assert_eq!(pushed.data["data"]["winner"], mover.id.as_str());
        assert_eq!(gone.notifier.frames().len(), frames_before);
    }

    #[tokio::test]
    async fn test_handle_routes_events() {
        let (lp, _) = launchpad();
        let a = connect(&lp).await;

        let frame = ClientFrame {
            event: "heartbeat".to_string(),
            ack: Some(1),
            data: json!(a.id.as_str()),
        };
        assert_eq!(lp.handle(&frame).await.status, 200);

        let unknown = ClientFrame {
            event: "dance".to_string(),
            ack: None,
            data: Value::Null,
        };
        assert_eq!(lp.handle(&unknown).await.status, 400);
    }
}
