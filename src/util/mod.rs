//! Utility helpers: network bring-up queries.

use std::net::{IpAddr, SocketAddr, UdpSocket};

use crate::error::{Result, TransportError};

/// Check whether the network is up far enough to talk to the master:
/// a non-loopback local address can be determined.
pub fn network_is_ready() -> bool {
    local_ip_address().is_ok()
}

/// Determine the local IP address the segment would use to reach the LAN.
///
/// Route discovery via a connected UDP socket; no packets are sent.
pub fn local_ip_address() -> Result<IpAddr> {
    let probe: SocketAddr = ([192, 168, 1, 1], 80).into();

    let socket = UdpSocket::bind(("0.0.0.0", 0))
        .map_err(|e| TransportError::SocketError(e.to_string()))?;
    socket
        .connect(probe)
        .map_err(|e| TransportError::SocketError(e.to_string()))?;

    let addr = socket
        .local_addr()
        .map_err(|e| TransportError::SocketError(e.to_string()))?
        .ip();

    if addr.is_loopback() || addr.is_unspecified() {
        return Err(TransportError::SocketError("no routable local address".into()).into());
    }

    Ok(addr)
}

/// Format an uptime in milliseconds for log lines.
pub fn format_uptime(uptime_ms: u32) -> String {
    let secs = uptime_ms / 1000;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "00:00:00");
        assert_eq!(format_uptime(61_500), "00:01:01");
        assert_eq!(format_uptime(3_600_000 + 125_000), "01:02:05");
    }
}
