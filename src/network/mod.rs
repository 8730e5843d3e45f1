//! Network Layer
//!
//! WebSocket server, presence, matchmaking and game storage.
//! All shared state lives here; rules are delegated to `game/`.

pub mod dispatch;
pub mod error;
pub mod matchmaking;
pub mod presence;
pub mod protocol;
pub mod server;
pub mod service;
pub mod store;

pub use dispatch::NotificationDispatcher;
pub use error::LaunchpadError;
pub use matchmaking::{JoinOutcome, Matchmaker};
pub use presence::{Notifier, NotifierRef, NotifyError, PresenceRegistry, User};
pub use protocol::{
    ClientFrame, ServerFrame, Response, JoinRequest, PlayRequest, CONNECT4,
};
pub use server::{GameServer, ServerConfig, GameServerError};
pub use service::Launchpad;
pub use store::{GameStore, StoreError};
