//! Feedback frames (segment → master).

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use super::command::MOTOR_COUNT;
use super::{crc, FEEDBACK_MAGIC};
use crate::error::{ProtocolError, Result};

/// Feedback type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FeedbackType {
    /// Full per-axis motion state plus orientation, 100 Hz.
    MotorState = 0x01,
    /// Temperatures, error counters, CPU load, 1 Hz.
    Diagnostics = 0x03,
}

/// Tag 0x02 is reserved for the capacitive-grid sensor frame, which this
/// firmware revision does not emit.
pub const FEEDBACK_CAPACITIVE_GRID: u8 = 0x02;

impl FeedbackType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::MotorState),
            0x03 => Some(Self::Diagnostics),
            _ => None,
        }
    }
}

/// Status bitfield in the motor-state frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFlags(u8);

impl StatusFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);

    /// Emergency stop latched.
    pub const E_STOP_ACTIVE: u8 = 1 << 0;

    /// Homing sequence in progress.
    pub const HOMING_IN_PROGRESS: u8 = 1 << 1;

    /// A motor reached its position limit.
    pub const POSITION_LIMIT_HIT: u8 = 1 << 2;

    /// Measured force exceeded the configured limit.
    pub const FORCE_LIMIT_EXCEEDED: u8 = 1 << 3;

    /// Trajectory buffer ran empty.
    pub const BUFFER_EMPTY: u8 = 1 << 4;

    /// Trajectory execution active (OPERATION mode).
    pub const TRAJECTORY_EXECUTING: u8 = 1 << 5;

    /// Stored calibration is valid.
    pub const CALIBRATION_VALID: u8 = 1 << 6;

    /// An error code other than NO_ERROR is latched.
    pub const ERROR_PRESENT: u8 = 1 << 7;

    /// Create from raw bits.
    pub fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Check if a flag is set.
    pub fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// Set a flag.
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    /// Get raw bits.
    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Motion state of one motor axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisState {
    /// mm
    pub position: f32,
    /// mm/s
    pub velocity: f32,
    /// mm/s²
    pub acceleration: f32,
    /// mm/s³
    pub jerk: f32,
    /// Amps
    pub current: f32,
}

/// Fused orientation angles, radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// Motor-state frame (0x01), 83 bytes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MotorState {
    pub segment_id: u8,
    /// Milliseconds since boot, wrapping.
    pub timestamp: u32,
    pub axes: [AxisState; MOTOR_COUNT],
    pub orientation: Orientation,
    pub status: StatusFlags,
}

impl MotorState {
    pub const FRAME_LEN: usize = 83;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::FRAME_LEN);
        buf.extend_from_slice(&FEEDBACK_MAGIC.to_le_bytes());
        buf.push(FeedbackType::MotorState as u8);
        buf.push(self.segment_id);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());

        for axis in &self.axes {
            for v in [
                axis.position,
                axis.velocity,
                axis.acceleration,
                axis.jerk,
                axis.current,
            ] {
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }

        for v in [
            self.orientation.roll,
            self.orientation.pitch,
            self.orientation.yaw,
        ] {
            buf.extend_from_slice(&v.to_le_bytes());
        }

        buf.push(self.status.bits());
        crc::append(&mut buf);
        buf
    }

    /// Decode a frame, verifying length and checksum. Used by the test
    /// harness and master-side tooling.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        if frame.len() != Self::FRAME_LEN {
            return Err(ProtocolError::SizeMismatch {
                expected: Self::FRAME_LEN,
                got: frame.len(),
            }
            .into());
        }
        if !crc::verify(frame) {
            return Err(ProtocolError::ChecksumMismatch.into());
        }

        let mut axes = [AxisState::default(); MOTOR_COUNT];
        for (m, axis) in axes.iter_mut().enumerate() {
            let base = 8 + m * 20;
            axis.position = LittleEndian::read_f32(&frame[base..base + 4]);
            axis.velocity = LittleEndian::read_f32(&frame[base + 4..base + 8]);
            axis.acceleration = LittleEndian::read_f32(&frame[base + 8..base + 12]);
            axis.jerk = LittleEndian::read_f32(&frame[base + 12..base + 16]);
            axis.current = LittleEndian::read_f32(&frame[base + 16..base + 20]);
        }

        Ok(Self {
            segment_id: frame[3],
            timestamp: LittleEndian::read_u32(&frame[4..8]),
            axes,
            orientation: Orientation {
                roll: LittleEndian::read_f32(&frame[68..72]),
                pitch: LittleEndian::read_f32(&frame[72..76]),
                yaw: LittleEndian::read_f32(&frame[76..80]),
            },
            status: StatusFlags::new(frame[80]),
        })
    }
}

/// Diagnostics frame (0x03), 22 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Diagnostics {
    pub segment_id: u8,
    /// Milliseconds since boot, wrapping.
    pub timestamp: u32,
    /// Average motor-driver temperature, °C.
    pub driver_temp: f32,
    /// Controller board temperature, °C.
    pub board_temp: f32,
    pub error_count: u16,
    /// Wire value of the most recent [`super::ErrorCode`].
    pub last_error: u8,
    /// 0–100 %.
    pub cpu_usage: u8,
}

impl Diagnostics {
    pub const FRAME_LEN: usize = 22;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::FRAME_LEN);
        buf.extend_from_slice(&FEEDBACK_MAGIC.to_le_bytes());
        buf.push(FeedbackType::Diagnostics as u8);
        buf.push(self.segment_id);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.driver_temp.to_le_bytes());
        buf.extend_from_slice(&self.board_temp.to_le_bytes());
        buf.extend_from_slice(&self.error_count.to_le_bytes());
        buf.push(self.last_error);
        buf.push(self.cpu_usage);
        crc::append(&mut buf);
        buf
    }

    /// Decode a frame, verifying length and checksum.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        if frame.len() != Self::FRAME_LEN {
            return Err(ProtocolError::SizeMismatch {
                expected: Self::FRAME_LEN,
                got: frame.len(),
            }
            .into());
        }
        if !crc::verify(frame) {
            return Err(ProtocolError::ChecksumMismatch.into());
        }

        Ok(Self {
            segment_id: frame[3],
            timestamp: LittleEndian::read_u32(&frame[4..8]),
            driver_temp: LittleEndian::read_f32(&frame[8..12]),
            board_temp: LittleEndian::read_f32(&frame[12..16]),
            error_count: LittleEndian::read_u16(&frame[16..18]),
            last_error: frame[18],
            cpu_usage: frame[19],
        })
    }
}
