//! Transport servers for the command link.
//!
//! Two independent server loops feed the dispatcher: a TCP server that
//! serves one master connection at a time, and a connectionless UDP server.
//! Whichever transport last identified the master remembers its address in
//! the shared [`PeerRegistry`] so feedback can be sent back, preferring the
//! stream connection when one is up.

mod socket;
mod tcp;
mod udp;

pub use socket::{create_tcp_listener, create_udp_socket, SocketConfig};
pub use tcp::TcpCommandServer;
pub use udp::UdpCommandServer;

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;

/// Best-effort outbound feedback path.
#[async_trait]
pub trait FeedbackLink: Send + Sync {
    /// Send a feedback frame to the remembered master endpoint.
    ///
    /// Returns `Ok(false)` when no peer is currently known on this
    /// transport; the frame is dropped silently. Send failures on a dying
    /// connection are logged and also report `Ok(false)`.
    async fn send_feedback(&self, frame: &[u8]) -> Result<bool>;

    /// Transport name for logs.
    fn transport_type(&self) -> &'static str;
}

#[derive(Debug, Default)]
struct PeerSlots {
    stream: RwLock<Option<SocketAddr>>,
    datagram: RwLock<Option<SocketAddr>>,
}

/// Memory of the most recently observed master endpoint, shared by both
/// servers. Not persisted across restarts.
#[derive(Debug, Default, Clone)]
pub struct PeerRegistry {
    slots: Arc<PeerSlots>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the master's address when its stream connection is accepted.
    pub fn stream_connected(&self, addr: SocketAddr) {
        *self.slots.stream.write() = Some(addr);
    }

    /// Forget the stream peer when its connection closes.
    pub fn stream_disconnected(&self) {
        *self.slots.stream.write() = None;
    }

    /// Record a datagram source as the master, unless the stream server
    /// already knows who the master is.
    pub fn observe_datagram(&self, addr: SocketAddr) {
        if self.slots.stream.read().is_none() {
            *self.slots.datagram.write() = Some(addr);
        }
    }

    /// Address of the connected stream peer, if any.
    pub fn stream_peer(&self) -> Option<SocketAddr> {
        *self.slots.stream.read()
    }

    /// Last observed datagram peer, if any was ever seen.
    pub fn datagram_peer(&self) -> Option<SocketAddr> {
        *self.slots.datagram.read()
    }
}
