//! Wire protocol between the master controller and this segment.
//!
//! Defines the frame formats, type tags, and the checksum used to
//! authenticate every frame in both directions.
//!
//! ## Frame Format
//!
//! ```text
//! ┌───────────┬──────────┬─────────────┬───────────────┬─────────────┐
//! │ Magic (2) │ Type (1) │ Segment (1) │ Payload (0..) │ CRC16 (2)   │
//! └───────────┴──────────┴─────────────┴───────────────┴─────────────┘
//! ```
//!
//! All multi-byte fields are little-endian. Commands (master → segment)
//! carry magic `0xAA55`; feedback (segment → master) carries `0xBB55`.
//! The CRC16-CCITT trailer covers every preceding byte. Each frame type
//! has an exact fixed length; there is no length field on the wire.

pub mod command;
pub mod crc;
pub mod dispatch;
pub mod feedback;

pub use command::{Command, CommandType};
pub use feedback::{Diagnostics, FeedbackType, MotorState, StatusFlags};

use serde::{Deserialize, Serialize};

/// Magic header on command frames (master → segment).
pub const COMMAND_MAGIC: u16 = 0xAA55;

/// Magic header on feedback frames (segment → master).
pub const FEEDBACK_MAGIC: u16 = 0xBB55;

/// Smallest possible command frame (magic + type + segment + CRC).
pub const MIN_COMMAND_LEN: usize = 6;

/// Segment id addressing every segment at once.
pub const BROADCAST_SEGMENT_ID: u8 = 0xFF;

/// Highest assignable segment id (0 means unconfigured).
pub const MAX_SEGMENT_ID: u8 = 8;

/// Operating mode of the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Mode {
    /// Motors idle, commands accepted.
    Idle = 0x01,
    /// Homing sequence in progress.
    Homing = 0x02,
    /// Normal trajectory execution.
    Operation = 0x03,
}

impl Mode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::Idle),
            0x02 => Some(Self::Homing),
            0x03 => Some(Self::Operation),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Homing => write!(f, "HOMING"),
            Self::Operation => write!(f, "OPERATION"),
        }
    }
}

/// Error classification reported in the diagnostics frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorCode {
    NoError = 0x00,
    EStopTriggered = 0x01,
    MotorOvercurrent = 0x02,
    PositionLimit = 0x03,
    CommunicationTimeout = 0x04,
    CrcError = 0x05,
    InvalidTrajectory = 0x06,
    EncoderFault = 0x07,
    DriverFault = 0x08,
    ImuFault = 0x09,
    CapacitiveFault = 0x0A,
    StorageFault = 0x0B,
    BufferOverrun = 0x0C,
    TemperatureHigh = 0x0D,
}

impl ErrorCode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(Self::NoError),
            0x01 => Some(Self::EStopTriggered),
            0x02 => Some(Self::MotorOvercurrent),
            0x03 => Some(Self::PositionLimit),
            0x04 => Some(Self::CommunicationTimeout),
            0x05 => Some(Self::CrcError),
            0x06 => Some(Self::InvalidTrajectory),
            0x07 => Some(Self::EncoderFault),
            0x08 => Some(Self::DriverFault),
            0x09 => Some(Self::ImuFault),
            0x0A => Some(Self::CapacitiveFault),
            0x0B => Some(Self::StorageFault),
            0x0C => Some(Self::BufferOverrun),
            0x0D => Some(Self::TemperatureHigh),
            _ => None,
        }
    }

    /// Wire value for the diagnostics `last_error` byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip() {
        for mode in [Mode::Idle, Mode::Homing, Mode::Operation] {
            assert_eq!(Mode::from_u8(mode as u8), Some(mode));
        }
        assert_eq!(Mode::from_u8(0x00), None);
        assert_eq!(Mode::from_u8(0x04), None);
    }

    #[test]
    fn test_error_code_round_trip() {
        for v in 0x00..=0x0D {
            let code = ErrorCode::from_u8(v).unwrap();
            assert_eq!(code.as_u8(), v);
        }
        assert_eq!(ErrorCode::from_u8(0x0E), None);
    }
}
