//! Datagram (UDP) command server.
//!
//! No connection concept: every received datagram is one command frame.
//! The first datagram source becomes the remembered master endpoint for
//! datagram feedback unless the stream server already knows the master.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use super::{FeedbackLink, PeerRegistry, SocketConfig};
use crate::error::{Result, TransportError};
use crate::protocol::dispatch::Dispatcher;
use crate::MAX_FRAME_SIZE;

/// Connectionless command server.
pub struct UdpCommandServer {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    peers: PeerRegistry,
    dispatcher: Dispatcher,
}

impl UdpCommandServer {
    /// Bind the datagram socket.
    pub fn bind(
        addr: SocketAddr,
        config: &SocketConfig,
        dispatcher: Dispatcher,
        peers: PeerRegistry,
    ) -> Result<Self> {
        let std_socket = super::create_udp_socket(addr, config)?;
        let socket = UdpSocket::from_std(std_socket).map_err(|e| TransportError::BindFailed {
            addr,
            reason: e.to_string(),
        })?;

        let local_addr = socket
            .local_addr()
            .map_err(|e| TransportError::SocketError(e.to_string()))?;

        Ok(Self {
            socket: Arc::new(socket),
            local_addr,
            peers,
            dispatcher,
        })
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Receive loop; runs for the process lifetime. Receive errors are
    /// logged and the loop continues.
    pub async fn run(self: Arc<Self>) {
        info!(addr = %self.local_addr, "UDP command server listening");

        let mut buf = [0u8; MAX_FRAME_SIZE];
        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((n, addr)) => {
                    self.peers.observe_datagram(addr);
                    let _ = self.dispatcher.dispatch(&buf[..n]);
                }
                Err(e) => {
                    warn!("UDP receive failed: {e}");
                }
            }
        }
    }
}

#[async_trait]
impl FeedbackLink for UdpCommandServer {
    async fn send_feedback(&self, frame: &[u8]) -> Result<bool> {
        let Some(peer) = self.peers.datagram_peer() else {
            return Ok(false);
        };

        match self.socket.send_to(frame, peer).await {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!(peer = %peer, "UDP feedback send failed: {e}");
                Ok(false)
            }
        }
    }

    fn transport_type(&self) -> &'static str {
        "udp"
    }
}
