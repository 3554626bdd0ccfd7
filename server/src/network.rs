//! Server network layer: TCP accept loop and simulation loop coordination

use crate::config::ServerConfig;
use crate::connection::ConnectionActor;
use crate::dispatcher::Dispatcher;
use crate::error::ServerError;
use crate::game::World;
use crate::registry::{ConnectionId, SessionRegistry};
use log::{debug, error, info};
use shared::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// Why a connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Zero-length read: the peer shut down cleanly
    PeerClosed,
    /// Read error such as a reset or broken pipe
    Transport(String),
    /// The peer sent something the codec could not decode
    Protocol(String),
    /// The server closed the connection
    Closed,
    /// No traffic within the configured idle timeout
    IdleTimeout,
}

/// Messages sent from network tasks to the simulation loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        id: ConnectionId,
        addr: SocketAddr,
    },
    PacketReceived {
        id: ConnectionId,
        message: Message,
    },
    Disconnected {
        id: ConnectionId,
        reason: DisconnectReason,
    },
}

/// Main server coordinating networking and game simulation
pub struct Server {
    listener: Arc<TcpListener>,
    registry: Arc<RwLock<SessionRegistry>>,
    world: World,
    dispatcher: Dispatcher,
    tick_duration: Duration,
    idle_timeout: Option<Duration>,

    // Communication channel from network tasks
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    /// Binds the listening socket. Failing to bind is fatal to the caller.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.addr.clone(),
                source,
            })?;
        info!("Server listening on {}", listener.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let tick_duration = config.tick_duration();

        Ok(Server {
            listener: Arc::new(listener),
            registry: Arc::new(RwLock::new(SessionRegistry::new())),
            world: World::new(Arc::new(config.grid)),
            dispatcher: Dispatcher::new(config.accounts),
            tick_duration,
            idle_timeout: config.idle_timeout,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Spawns the task that accepts connections and starts their actors
    fn spawn_acceptor(&self) {
        let listener = Arc::clone(&self.listener);
        let registry = Arc::clone(&self.registry);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut next_id: ConnectionId = 1;

            loop {
                let (stream, addr) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        continue;
                    }
                };
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("Could not disable Nagle for {}: {}", addr, e);
                }

                let id = next_id;
                next_id = next_id.wrapping_add(1).max(1);

                let (handle, actor) = ConnectionActor::new(id, addr, stream, server_tx.clone());
                {
                    let mut registry = registry.write().await;
                    registry.add(handle);
                    info!("New connection, {} connected", registry.len());
                }

                // Queued before the actor can report any packet from this connection.
                if let Err(e) = server_tx.send(ServerMessage::Connected { id, addr }) {
                    error!("Failed to hand over connection {}: {}", id, e);
                    break;
                }
                actor.spawn();
            }
        });
    }

    /// Applies one event from the network tasks
    async fn handle_event(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Connected { id, addr } => {
                self.world.add_session(id, addr);
            }
            ServerMessage::PacketReceived { id, message } => {
                debug!("Connection {}: {}", id, message.tag());
                let mut registry = self.registry.write().await;
                self.dispatcher
                    .dispatch(&mut self.world, &mut registry, id, message);
            }
            ServerMessage::Disconnected { id, reason } => {
                self.disconnect(id, reason).await;
            }
        }
    }

    /// Removes a connection and its session exactly once
    ///
    /// Every exit path funnels through here; the registry hands the connection
    /// back only on the first call, so repeats are no-ops.
    async fn disconnect(&mut self, id: ConnectionId, reason: DisconnectReason) {
        let mut registry = self.registry.write().await;
        if registry.remove(id).is_none() {
            return;
        }

        let session = self.world.remove_session(id);
        let profile = session.as_ref().and_then(|s| s.profile());
        info!(
            "Connection {} left ({:?}), player {:?}",
            id,
            reason,
            profile.map(|p| &p.nickname)
        );

        if let Some(profile) = profile {
            registry.broadcast(Message::SerOffline {
                uuid: profile.uuid.clone(),
            });
        }
    }

    /// Advances the simulation and enforces the idle timeout
    async fn tick(&mut self) {
        self.world.update();

        if let Some(timeout) = self.idle_timeout {
            for id in self.world.idle_sessions(timeout) {
                self.disconnect(id, DisconnectReason::IdleTimeout).await;
            }
        }

        // Periodic monitoring
        if self.world.tick % 600 == 0 && !self.world.is_empty() {
            debug!(
                "Tick {}: {} session(s)",
                self.world.tick,
                self.world.len()
            );
        }
    }

    /// Main server loop: accepts connections, applies messages and ticks the world
    ///
    /// Runs until the process is stopped.
    pub async fn run(mut self) -> Result<(), ServerError> {
        self.spawn_acceptor();

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(message) => self.handle_event(message).await,
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle simulation ticks
                _ = tick_interval.tick() => {
                    self.tick().await;
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CloseSignal, ConnectionHandle};

    async fn test_server() -> Server {
        Server::bind(ServerConfig::new("127.0.0.1:0")).await.unwrap()
    }

    async fn register(
        server: &mut Server,
        id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<Message> {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        server
            .registry
            .write()
            .await
            .add(ConnectionHandle::new(id, addr, tx, CloseSignal::new()));
        server
            .handle_event(ServerMessage::Connected { id, addr })
            .await;
        rx
    }

    async fn login(server: &mut Server, id: ConnectionId) {
        server
            .handle_event(ServerMessage::PacketReceived {
                id,
                message: Message::CliLogin {
                    username: "admin01".to_string(),
                    password: "123456".to_string(),
                },
            })
            .await;
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let first = test_server().await;
        let addr = first.local_addr().unwrap().to_string();

        match Server::bind(ServerConfig::new(addr.clone())).await {
            Err(ServerError::Bind { addr: failed, .. }) => assert_eq!(failed, addr),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("second bind on {addr} succeeded"),
        }
    }

    #[tokio::test]
    async fn test_disconnect_is_exactly_once() {
        let mut server = test_server().await;
        let mut rx1 = register(&mut server, 1).await;
        let _rx2 = register(&mut server, 2).await;
        login(&mut server, 1).await;
        login(&mut server, 2).await;
        drain(&mut rx1);
        let departed = server.world.session(2).unwrap().profile().unwrap().uuid.clone();

        // A read error and a clean shutdown racing for the same connection.
        server
            .handle_event(ServerMessage::Disconnected {
                id: 2,
                reason: DisconnectReason::Transport("reset".to_string()),
            })
            .await;
        server
            .handle_event(ServerMessage::Disconnected {
                id: 2,
                reason: DisconnectReason::PeerClosed,
            })
            .await;

        assert_eq!(server.registry.read().await.len(), 1);
        assert_eq!(server.world.len(), 1);
        assert_eq!(
            drain(&mut rx1),
            vec![Message::SerOffline { uuid: departed }]
        );
    }

    #[tokio::test]
    async fn test_guest_disconnect_is_not_announced() {
        let mut server = test_server().await;
        let mut rx1 = register(&mut server, 1).await;
        let _rx2 = register(&mut server, 2).await;
        login(&mut server, 1).await;
        drain(&mut rx1);

        server
            .handle_event(ServerMessage::Disconnected {
                id: 2,
                reason: DisconnectReason::PeerClosed,
            })
            .await;

        assert!(drain(&mut rx1).is_empty());
        assert_eq!(server.world.len(), 1);
    }

    #[tokio::test]
    async fn test_idle_timeout_disconnects() {
        let mut server = test_server().await;
        server.idle_timeout = Some(Duration::from_secs(5));
        let _rx1 = register(&mut server, 1).await;
        let _rx2 = register(&mut server, 2).await;
        server.world.session_mut(1).unwrap().last_seen =
            std::time::Instant::now() - Duration::from_secs(30);

        server.tick().await;

        assert!(server.world.session(1).is_none());
        assert!(server.world.session(2).is_some());
        assert_eq!(server.registry.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_tick_advances_world() {
        let mut server = test_server().await;
        server.tick().await;
        server.tick().await;
        assert_eq!(server.world.tick, 2);
    }
}
