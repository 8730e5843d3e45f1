//! Presence Registry
//!
//! Tracks connected users, their last heartbeat, lobby membership and the
//! channel used to push frames to them.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::core::id::{IdGenerator, UserId};
use crate::network::error::LaunchpadError;
use crate::network::protocol::ServerFrame;

// =============================================================================
// NOTIFIER
// =============================================================================

/// Push failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// Connection is gone.
    #[error("connection closed")]
    Closed,
    /// Outbound queue is full.
    #[error("outbound queue full")]
    Full,
}

/// Capability to push a frame to one connection.
///
/// Sends never block, so they are safe to issue from any task.
pub trait Notifier: Send + Sync {
    /// Queue a frame for delivery.
    fn notify(&self, frame: ServerFrame) -> Result<(), NotifyError>;

    /// Whether the connection can still receive frames.
    fn is_connected(&self) -> bool;
}

impl Notifier for mpsc::Sender<ServerFrame> {
    fn notify(&self, frame: ServerFrame) -> Result<(), NotifyError> {
        self.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => NotifyError::Full,
            mpsc::error::TrySendError::Closed(_) => NotifyError::Closed,
        })
    }

    fn is_connected(&self) -> bool {
        !self.is_closed()
    }
}

/// Shared notifier handle.
pub type NotifierRef = Arc<dyn Notifier>;

// =============================================================================
// USER
// =============================================================================

/// A connected user.
#[derive(Clone)]
pub struct User {
    /// Identifier.
    pub id: UserId,
    /// Last heartbeat (or connect) time.
    pub last_heartbeat: DateTime<Utc>,
    /// Still in the lobby (has not queued for a game yet).
    pub in_lobby: bool,
    /// Push channel to the user's connection.
    pub notifier: NotifierRef,
}

impl User {
    /// Whether frames can still reach this user.
    pub fn is_reachable(&self) -> bool {
        self.notifier.is_connected()
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("last_heartbeat", &self.last_heartbeat)
            .field("in_lobby", &self.in_lobby)
            .field("connected", &self.notifier.is_connected())
            .finish()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Connected users keyed by identifier.
pub struct PresenceRegistry {
    users: RwLock<BTreeMap<UserId, User>>,
    ids: Arc<dyn IdGenerator>,
}

impl PresenceRegistry {
    /// Create an empty registry.
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            ids,
        }
    }

    /// Register a new connection and return its identifier.
    pub async fn register(&self, notifier: NotifierRef) -> Result<UserId, LaunchpadError> {
        let id = UserId::new(self.ids.generate()?);
        let user = User {
            id: id.clone(),
            last_heartbeat: Utc::now(),
            in_lobby: true,
            notifier,
        };

        self.users.write().await.insert(id.clone(), user);
        debug!("Registered user {}", id);
        Ok(id)
    }

    /// Refresh a user's heartbeat.
    pub async fn heartbeat(&self, id: &UserId) -> Result<DateTime<Utc>, LaunchpadError> {
        if id.is_empty() {
            return Err(LaunchpadError::Unauthorized);
        }

        let mut users = self.users.write().await;
        let user = users.get_mut(id).ok_or(LaunchpadError::Unauthorized)?;
        user.last_heartbeat = Utc::now();
        Ok(user.last_heartbeat)
    }

    /// Find a reachable user.
    ///
    /// A user whose connection has closed is reported absent even before
    /// the transport unregisters it.
    pub async fn lookup(&self, id: &UserId) -> Option<User> {
        let users = self.users.read().await;
        users.get(id).filter(|u| u.is_reachable()).cloned()
    }

    /// Forget a user. Returns whether it was registered.
    pub async fn unregister(&self, id: &UserId) -> bool {
        let removed = self.users.write().await.remove(id).is_some();
        if removed {
            debug!("Unregistered user {}", id);
        }
        removed
    }

    /// Take a user out of the lobby.
    pub async fn leave_lobby(&self, id: &UserId) {
        if let Some(user) = self.users.write().await.get_mut(id) {
            user.in_lobby = false;
        }
    }

    /// Notifiers of every reachable lobby member except `except`.
    pub async fn lobby_notifiers(&self, except: &UserId) -> Vec<NotifierRef> {
        let users = self.users.read().await;
        users
            .values()
            .filter(|u| u.in_lobby && u.id != *except && u.is_reachable())
            .map(|u| u.notifier.clone())
            .collect()
    }

    /// Number of registered users.
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Notifier that records frames in memory.
    #[derive(Default)]
    pub struct RecordingNotifier {
        frames: Mutex<Vec<ServerFrame>>,
        closed: AtomicBool,
    }

    impl RecordingNotifier {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }

        pub fn frames(&self) -> Vec<ServerFrame> {
            self.frames.lock().unwrap().clone()
        }

        pub fn events(&self) -> Vec<String> {
            self.frames().into_iter().map(|f| f.event).collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, frame: ServerFrame) -> Result<(), NotifyError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(NotifyError::Closed);
            }
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            !self.closed.load(Ordering::SeqCst)
        }
    }
}
