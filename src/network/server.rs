//! WebSocket Game Server
//!
//! Async WebSocket server for client connections.
//! Registers each connection, decodes event frames, forwards them to the
//! [`Launchpad`] service and writes acknowledgements and pushes back.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::core::id::{IdGenerator, UserId, UuidGenerator};
use crate::game::play::PlayPolicy;
use crate::network::protocol::{event, status, ClientFrame, Response, ServerFrame};
use crate::network::service::Launchpad;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Outbound frames buffered per connection before pushes are dropped.
    pub channel_capacity: usize,
    /// Refuse plays on games that already have a winner.
    pub reject_after_win: bool,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            max_connections: 1000,
            channel_capacity: 64,
            reject_after_win: false,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables, falling back to defaults.
    ///
    /// - `LAUNCHPAD_BIND_ADDR`
    /// - `LAUNCHPAD_MAX_CONNECTIONS`
    /// - `LAUNCHPAD_CHANNEL_CAPACITY`
    /// - `LAUNCHPAD_REJECT_AFTER_WIN` (`true` or `1`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: parse_or("LAUNCHPAD_BIND_ADDR", lookup("LAUNCHPAD_BIND_ADDR"), defaults.bind_addr),
            max_connections: parse_or(
                "LAUNCHPAD_MAX_CONNECTIONS",
                lookup("LAUNCHPAD_MAX_CONNECTIONS"),
                defaults.max_connections,
            ),
            channel_capacity: parse_or(
                "LAUNCHPAD_CHANNEL_CAPACITY",
                lookup("LAUNCHPAD_CHANNEL_CAPACITY"),
                defaults.channel_capacity,
            )
            .max(1),
            reject_after_win: lookup("LAUNCHPAD_REJECT_AFTER_WIN")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.reject_after_win),
            version: defaults.version,
        }
    }

    /// Move rules derived from this config.
    pub fn play_policy(&self) -> PlayPolicy {
        PlayPolicy {
            reject_after_win: self.reject_after_win,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Identifier issued on connect (None if registration failed).
    user_id: Option<UserId>,
    /// Connection time.
    connected_at: Instant,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Request handling.
    launchpad: Arc<Launchpad>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server issuing UUID identifiers.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_ids(config, Arc::new(UuidGenerator))
    }

    /// Create a new game server with a custom identifier source.
    pub fn with_ids(config: ServerConfig, ids: Arc<dyn IdGenerator>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let launchpad = Arc::new(Launchpad::new(ids, config.play_policy()));

        Self {
            config,
            launchpad,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Launchpad server v{} listening on {}", self.config.version, listener.local_addr()?);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let launchpad = self.launchpad.clone();
        let capacity = self.config.channel_capacity;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerFrame>(capacity);

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(frame) = msg_rx.recv().await {
                    let text = match frame.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize frame: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Register user and greet
            let (greeting, user_id) = launchpad.connect(Arc::new(msg_tx.clone())).await;
            clients.write().await.insert(addr, ConnectedClient {
                user_id: user_id.clone(),
                connected_at: Instant::now(),
            });
            let _ = msg_tx.send(ServerFrame::push(event::CONNECT, greeting.to_value())).await;

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let frame = match ClientFrame::from_json(&text) {
                                    Ok(f) => f,
                                    Err(e) => {
                                        debug!("Invalid frame from {}: {}", addr, e);
                                        let response = Response::error(
                                            status::BAD_REQUEST,
                                            format!("invalid frame: {}", e),
                                        );
                                        let _ = msg_tx.send(ServerFrame::push("error", response.to_value())).await;
                                        continue;
                                    }
                                };

                                let response = launchpad.handle(&frame).await;
                                let _ = msg_tx.send(ServerFrame::reply(&frame, &response)).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            // Cleanup
            sender_task.abort();
            if let Some(user_id) = &user_id {
                launchpad.disconnect(user_id).await;
            }

            if let Some(client) = clients.write().await.remove(&addr) {
                info!(
                    "Client {} ({:?}) cleaned up after {:.1}s",
                    addr,
                    client.user_id,
                    client.connected_at.elapsed().as_secs_f32()
                );
            }
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get number of registered users.
    pub async fn user_count(&self) -> usize {
        self.launchpad.user_count().await
    }

    /// Get number of games created.
    pub async fn game_count(&self) -> usize {
        self.launchpad.game_count().await
    }

    /// Whether a user is waiting for an opponent.
    pub async fn queue_size(&self) -> usize {
        usize::from(self.launchpad.waiting().await.is_some())
    }

    /// Request handling service.
    pub fn launchpad(&self) -> &Arc<Launchpad> {
        &self.launchpad
    }
}
