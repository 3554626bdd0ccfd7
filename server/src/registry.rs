//! Registry of live connections and the outbound half of every session
//!
//! This module tracks which sockets are currently attached to the server and
//! routes outgoing protocol messages to them:
//! - Connection lifecycle (register on accept, idempotent removal on disconnect)
//! - Unicast and broadcast delivery through per-connection outbound queues
//! - Stable snapshots so a broadcast never observes a half-removed connection
//!
//! The registry is the only structure touched by both the accept loop and the
//! simulation loop, so the server keeps it behind a single lock.

use log::{debug, info};
use shared::Message;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Server-assigned identifier of one accepted socket.
pub type ConnectionId = u32;

/// Latched stop flag shared by a connection's handle and both of its tasks
///
/// Once closed it stays closed, so a task that starts waiting late still sees it.
#[derive(Debug, Clone)]
pub struct CloseSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CloseSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn close(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`close`](Self::close) has been called, immediately if it already was.
    pub async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CloseSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending side of one connection
///
/// Each handle owns:
/// - The queue drained by the connection's writer task, which serializes frames
///   so two senders can never interleave partial frames on the socket
/// - A close signal that stops the connection's reader and writer tasks
/// - Whether the peer has logged in, which decides if it receives broadcasts
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Unique connection identifier assigned by the accept loop
    pub id: ConnectionId,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// Set once the session behind this connection has logged in
    pub authenticated: bool,
    outbound: mpsc::UnboundedSender<Message>,
    close: CloseSignal,
}

impl ConnectionHandle {
    /// Creates a handle around an outbound queue and the tasks' close signal
    pub fn new(
        id: ConnectionId,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Message>,
        close: CloseSignal,
    ) -> Self {
        Self {
            id,
            addr,
            authenticated: false,
            outbound,
            close,
        }
    }

    /// Queues a message for this connection
    ///
    /// Returns false when the writer task is already gone, which only happens
    /// while the connection is being torn down.
    pub fn send(&self, message: Message) -> bool {
        self.outbound.send(message).is_ok()
    }

    /// Tells both connection tasks to stop, which closes the socket
    ///
    /// Queued frames that have not been written are dropped.
    pub fn close(&self) {
        self.close.close();
    }
}

/// Every connection currently attached to the server
///
/// Mutations happen from the accept loop (`add`) and the simulation loop
/// (`remove`, `authenticate`), always under the server's registry lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Live connections indexed by their identifier
    connections: HashMap<ConnectionId, ConnectionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection
    ///
    /// A handle reusing a live identifier replaces the old one, which is closed.
    pub fn add(&mut self, handle: ConnectionHandle) {
        info!("Connection {} registered from {}", handle.id, handle.addr);
        if let Some(previous) = self.connections.insert(handle.id, handle) {
            previous.close();
        }
    }

    /// Removes a connection and closes it
    ///
    /// Returns the handle if it was still registered and None if it was already
    /// gone. Racing disconnect paths rely on this: only the caller that gets
    /// `Some` performs the follow-up cleanup.
    pub fn remove(&mut self, id: ConnectionId) -> Option<ConnectionHandle> {
        let handle = self.connections.remove(&id)?;
        handle.close();
        info!(
            "Connection {} removed, {} remaining",
            id,
            self.connections.len()
        );
        Some(handle)
    }

    /// Marks a connection as logged in so it starts receiving broadcasts
    pub fn authenticate(&mut self, id: ConnectionId) -> bool {
        match self.connections.get_mut(&id) {
            Some(handle) => {
                handle.authenticated = true;
                true
            }
            None => false,
        }
    }

    pub fn is_authenticated(&self, id: ConnectionId) -> bool {
        self.connections
            .get(&id)
            .is_some_and(|handle| handle.authenticated)
    }

    /// Sends a message to a single connection, returning false if it is unknown or closing
    pub fn send_to(&self, id: ConnectionId, message: Message) -> bool {
        match self.connections.get(&id) {
            Some(handle) => handle.send(message),
            None => false,
        }
    }

    /// Sends to every logged-in connection, the originator included
    pub fn broadcast(&self, message: Message) -> usize {
        self.deliver(message, None)
    }

    /// Sends to every logged-in connection except `exclude`
    pub fn broadcast_except(&self, message: Message, exclude: ConnectionId) -> usize {
        self.deliver(message, Some(exclude))
    }

    /// Copies the current connection set, ordered by identifier
    ///
    /// The copy stays valid while the registry changes underneath it; sending
    /// to a handle removed in the meantime is a harmless no-op.
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        let mut handles: Vec<ConnectionHandle> = self.connections.values().cloned().collect();
        handles.sort_by_key(|handle| handle.id);
        handles
    }

    /// Returns the number of registered connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if no connections are registered
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn deliver(&self, message: Message, exclude: Option<ConnectionId>) -> usize {
        let tag = message.tag();
        let mut delivered = 0;
        for handle in self.snapshot() {
            if !handle.authenticated || Some(handle.id) == exclude {
                continue;
            }
            if handle.send(message.clone()) {
                delivered += 1;
            }
        }
        debug!("Delivered {} to {} connection(s)", tag, delivered);
        delivered
    }
}
