//! Error types for segmentd.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Result type alias for segmentd operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for segmentd.
#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    // Transport errors
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // General errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Frame validation and parsing errors.
///
/// Every variant reports the same error code on the wire (the diagnostics
/// `last_error` byte stays `CRC_ERROR` for all of them); the distinction
/// exists for logs and tests only.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame too short: {len} bytes")]
    FrameTooShort { len: usize },

    #[error("invalid magic header 0x{got:04X}")]
    BadMagic { got: u16 },

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("unknown command type 0x{0:02X}")]
    UnknownType(u8),

    #[error("size mismatch: expected {expected} bytes, got {got}")]
    SizeMismatch { expected: usize, got: usize },
}

/// Transport layer errors.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("bind failed on {addr}: {reason}")]
    BindFailed { addr: SocketAddr, reason: String },

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("socket error: {0}")]
    SocketError(String),

    #[error("no peer known")]
    NoPeer,
}

impl Error {
    /// Check if this error came from frame validation (malformed input from
    /// the master) rather than from a local fault.
    pub fn is_frame_error(&self) -> bool {
        matches!(self, Error::Protocol(_))
    }
}
