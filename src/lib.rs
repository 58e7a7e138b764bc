//! # Segmentd
//!
//! Control daemon for one segment of a multi-segment motion rig.
//!
//! Each segment receives binary command frames from a single upstream master
//! controller over the LAN, validates and dispatches them, maintains a small
//! operating-mode state machine with an emergency-stop latch, and streams
//! telemetry frames back to the master over the same link.
//!
//! ## Architecture
//!
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Master Controller (LAN)                    │
//! ├───────────────────────────┬─────────────────────────────────────┤
//! │   TCP command server      │        UDP command server           │
//! │   (one peer at a time)    │        (connectionless)             │
//! ├───────────────────────────┴─────────────────────────────────────┤
//! │              Frame validation (magic / length / CRC16)          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │        Command dispatcher → mode & emergency-stop state         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   Telemetry builders (motor state 100 Hz / diagnostics 1 Hz)    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │     Collaborators: IMU fusion · motor driver bus · health       │
//! └─────────────────────────────────────────────────────────────────┘

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)] // Wire fields are deliberately narrow
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)] // ASCII diagrams in docs

pub mod config;
pub mod error;
pub mod protocol;
pub mod sensors;
pub mod state;
pub mod telemetry;
pub mod transport;
pub mod util;

pub use config::Config;
pub use error::{Error, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Well-known port for the stream (TCP) command server.
pub const TCP_COMMAND_PORT: u16 = 5000;

/// Well-known port for the datagram (UDP) command server.
pub const UDP_COMMAND_PORT: u16 = 6000;

/// Upper bound on any frame in either direction, with headroom.
pub const MAX_FRAME_SIZE: usize = 512;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::protocol::dispatch::Dispatcher;
    pub use crate::protocol::{CommandType, ErrorCode, FeedbackType, Mode};
    pub use crate::state::SharedState;
    pub use crate::telemetry::Telemetry;
    pub use crate::transport::{FeedbackLink, PeerRegistry, TcpCommandServer, UdpCommandServer};
}
