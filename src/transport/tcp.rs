//! Stream (TCP) command server.
//!
//! Serves exactly one master connection at a time: accept, dispatch every
//! received chunk until the peer disconnects or errors, then return to
//! accepting. While a connection is up its write half doubles as the
//! stream-side feedback path.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::{FeedbackLink, PeerRegistry, SocketConfig};
use crate::error::{Result, TransportError};
use crate::protocol::dispatch::Dispatcher;
use crate::MAX_FRAME_SIZE;

/// Connection-oriented command server.
pub struct TcpCommandServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    /// Write half of the active connection (if any).
    writer: RwLock<Option<Arc<tokio::sync::Mutex<OwnedWriteHalf>>>>,
    peers: PeerRegistry,
    dispatcher: Dispatcher,
}

impl TcpCommandServer {
    /// Bind the listening socket.
    pub fn bind(
        addr: SocketAddr,
        config: &SocketConfig,
        dispatcher: Dispatcher,
        peers: PeerRegistry,
    ) -> Result<Self> {
        let std_listener = super::create_tcp_listener(addr, config)?;
        let listener = TcpListener::from_std(std_listener).map_err(|e| TransportError::BindFailed {
            addr,
            reason: e.to_string(),
        })?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::SocketError(e.to_string()))?;

        Ok(Self {
            listener,
            local_addr,
            writer: RwLock::new(None),
            peers,
            dispatcher,
        })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether a master connection is currently up.
    pub fn is_connected(&self) -> bool {
        self.writer.read().is_some()
    }

    /// Accept loop; runs for the process lifetime.
    pub async fn run(self: Arc<Self>) {
        info!(addr = %self.local_addr, "TCP command server listening");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    self.serve_connection(stream, addr).await;
                }
                Err(e) => {
                    warn!("TCP accept failed: {e}");
                }
            }
        }
    }

    /// Serve one master connection until it closes or errors.
    async fn serve_connection(&self, stream: TcpStream, addr: SocketAddr) {
        info!(peer = %addr, "master connected");

        if let Err(e) = stream.set_nodelay(true) {
            debug!("failed to set TCP_NODELAY: {e}");
        }

        let (mut reader, writer) = stream.into_split();
        *self.writer.write() = Some(Arc::new(tokio::sync::Mutex::new(writer)));
        self.peers.stream_connected(addr);

        let mut buf = [0u8; MAX_FRAME_SIZE];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    info!(peer = %addr, "master disconnected");
                    break;
                }
                Ok(n) => {
                    // One received chunk is one frame; validation failures
                    // are already counted and logged by the dispatcher.
                    let _ = self.dispatcher.dispatch(&buf[..n]);
                }
                Err(e) => {
                    warn!(peer = %addr, "TCP receive failed: {e}");
                    break;
                }
            }
        }

        *self.writer.write() = None;
        self.peers.stream_disconnected();
    }
}

#[async_trait]
impl FeedbackLink for TcpCommandServer {
    async fn send_feedback(&self, frame: &[u8]) -> Result<bool> {
        // Clone the handle out so the slot lock is not held across I/O.
        let writer = { self.writer.read().clone() };

        let Some(writer) = writer else {
            return Ok(false);
        };

        let mut guard = writer.lock().await;
        match guard.write_all(frame).await {
            Ok(()) => Ok(true),
            Err(e) => {
                debug!("TCP feedback send failed: {e}");
                Ok(false)
            }
        }
    }

    fn transport_type(&self) -> &'static str {
        "tcp"
    }
}
