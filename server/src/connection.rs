//! One actor per accepted socket.
//!
//! The actor splits its stream into a reader task, which decodes frames and hands
//! them to the simulation loop, and a writer task, which drains the connection's
//! outbound queue. The reader reports exactly one [`ServerMessage::Disconnected`]
//! however it ends. Both tasks stop on the connection's [`CloseSignal`], and the
//! socket closes once both halves are dropped.

use crate::network::{DisconnectReason, ServerMessage};
use crate::registry::{CloseSignal, ConnectionHandle, ConnectionId};
use log::{debug, error, warn};
use shared::{FrameCodec, Message};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

const READ_BUFFER_SIZE: usize = 4096;

pub struct ConnectionActor {
    id: ConnectionId,
    addr: SocketAddr,
    stream: TcpStream,
    events: mpsc::UnboundedSender<ServerMessage>,
    outbound: mpsc::UnboundedReceiver<Message>,
    close: CloseSignal,
}

impl ConnectionActor {
    /// Wraps an accepted stream. The returned handle is what gets registered.
    pub fn new(
        id: ConnectionId,
        addr: SocketAddr,
        stream: TcpStream,
        events: mpsc::UnboundedSender<ServerMessage>,
    ) -> (ConnectionHandle, Self) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let close = CloseSignal::new();
        let handle = ConnectionHandle::new(id, addr, outbound_tx, close.clone());
        let actor = Self {
            id,
            addr,
            stream,
            events,
            outbound: outbound_rx,
            close,
        };
        (handle, actor)
    }

    /// Starts the reader and writer tasks.
    pub fn spawn(self) {
        let Self {
            id,
            addr,
            stream,
            events,
            outbound,
            close,
        } = self;
        let (reader, writer) = stream.into_split();

        tokio::spawn(write_loop(id, writer, outbound, close.clone()));
        tokio::spawn(async move {
            let reason = read_loop(id, reader, &events, &close).await;
            debug!("Connection {} ({}) reader finished: {:?}", id, addr, reason);
            if let Err(e) = events.send(ServerMessage::Disconnected { id, reason }) {
                error!("Failed to report disconnect of {}: {}", id, e);
            }
        });
    }
}

async fn read_loop(
    id: ConnectionId,
    mut reader: OwnedReadHalf,
    events: &mpsc::UnboundedSender<ServerMessage>,
    close: &CloseSignal,
) -> DisconnectReason {
    let mut codec = FrameCodec::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    loop {
        let read = tokio::select! {
            _ = close.closed() => return DisconnectReason::Closed,
            read = reader.read(&mut buffer) => read,
        };

        let len = match read {
            Ok(0) => return DisconnectReason::PeerClosed,
            Ok(len) => len,
            Err(e) => return DisconnectReason::Transport(e.to_string()),
        };

        codec.push(&buffer[..len]);
        loop {
            match codec.next_message() {
                Ok(Some(message)) => {
                    if events
                        .send(ServerMessage::PacketReceived { id, message })
                        .is_err()
                    {
                        return DisconnectReason::Closed;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Connection {} sent a malformed frame: {}", id, e);
                    return DisconnectReason::Protocol(e.to_string());
                }
            }
        }
    }
}

async fn write_loop(
    id: ConnectionId,
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    close: CloseSignal,
) {
    loop {
        let message = tokio::select! {
            _ = close.closed() => break,
            message = outbound.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let frame = match FrameCodec::encode(&message) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Connection {}: {}", id, e);
                continue;
            }
        };

        // One write_all per frame from a single task keeps frames whole. A peer that
        // stops reading blocks it, so closing must be able to interrupt it.
        let written = tokio::select! {
            _ = close.closed() => break,
            written = writer.write_all(&frame) => written,
        };
        if let Err(e) = written {
            warn!("Connection {}: write failed: {}", id, e);
            close.close();
            break;
        }
    }

    debug!("Connection {} writer finished", id);
    let _ = writer.shutdown().await;
}
