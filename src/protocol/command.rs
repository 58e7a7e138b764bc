//! Command frames (master → segment).
//!
//! One struct per command with an explicit encode/decode pair. Layouts are
//! written out field-by-field so the wire image never depends on native
//! struct layout.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use super::{crc, COMMAND_MAGIC};
use crate::error::{ProtocolError, Result};

/// Motors driven by one segment.
pub const MOTOR_COUNT: usize = 3;

/// Polynomial coefficients per motor in a trajectory frame.
pub const COEFFS_PER_MOTOR: usize = 8;

/// Command type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CommandType {
    /// Motion-coefficient upload for all three motors.
    Trajectory = 0x01,
    /// Safety override; forces IDLE and latches the e-stop flag.
    EmergencyStop = 0x02,
    /// Begin the homing sequence.
    StartHoming = 0x03,
    /// Manual single-motor move for calibration.
    JogMotor = 0x07,
    /// Operating-mode change.
    SetMode = 0x08,
    /// Capture current positions as the zero reference.
    SetZeroOffset = 0x09,
}

impl CommandType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::Trajectory),
            0x02 => Some(Self::EmergencyStop),
            0x03 => Some(Self::StartHoming),
            0x07 => Some(Self::JogMotor),
            0x08 => Some(Self::SetMode),
            0x09 => Some(Self::SetZeroOffset),
            _ => None,
        }
    }

    /// Exact frame length for this command type, trailer included.
    pub fn frame_len(self) -> usize {
        match self {
            Self::Trajectory => Trajectory::FRAME_LEN,
            Self::EmergencyStop => EmergencyStop::FRAME_LEN,
            Self::StartHoming => StartHoming::FRAME_LEN,
            Self::JogMotor => JogMotor::FRAME_LEN,
            Self::SetMode => SetMode::FRAME_LEN,
            Self::SetZeroOffset => SetZeroOffset::FRAME_LEN,
        }
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trajectory => write!(f, "TRAJECTORY"),
            Self::EmergencyStop => write!(f, "EMERGENCY_STOP"),
            Self::StartHoming => write!(f, "START_HOMING"),
            Self::JogMotor => write!(f, "JOG_MOTOR"),
            Self::SetMode => write!(f, "SET_MODE"),
            Self::SetZeroOffset => write!(f, "SET_ZERO_OFFSET"),
        }
    }
}

fn check_len(frame: &[u8], expected: usize) -> Result<()> {
    if frame.len() != expected {
        return Err(ProtocolError::SizeMismatch {
            expected,
            got: frame.len(),
        }
        .into());
    }
    Ok(())
}

fn frame_header(ty: CommandType, segment_id: u8, capacity: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(capacity);
    buf.extend_from_slice(&COMMAND_MAGIC.to_le_bytes());
    buf.push(ty as u8);
    buf.push(segment_id);
    buf
}

/// Trajectory upload (0x01): one septic polynomial per motor.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub segment_id: u8,
    pub trajectory_id: u32,
    /// Execution start, milliseconds on the master's clock.
    pub start_timestamp: u32,
    pub duration_ms: u16,
    pub coeffs: [[f32; COEFFS_PER_MOTOR]; MOTOR_COUNT],
}

impl Trajectory {
    pub const FRAME_LEN: usize = 112;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = frame_header(CommandType::Trajectory, self.segment_id, Self::FRAME_LEN);

        let mut scratch = [0u8; 10];
        LittleEndian::write_u32(&mut scratch[0..4], self.trajectory_id);
        LittleEndian::write_u32(&mut scratch[4..8], self.start_timestamp);
        LittleEndian::write_u16(&mut scratch[8..10], self.duration_ms);
        buf.extend_from_slice(&scratch);

        for motor in &self.coeffs {
            for &c in motor {
                buf.extend_from_slice(&c.to_le_bytes());
            }
        }

        crc::append(&mut buf);
        buf
    }

    /// Decode the fields of a frame whose magic and checksum were already
    /// verified.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        check_len(frame, Self::FRAME_LEN)?;

        let mut coeffs = [[0.0f32; COEFFS_PER_MOTOR]; MOTOR_COUNT];
        for (m, motor) in coeffs.iter_mut().enumerate() {
            let base = 14 + m * COEFFS_PER_MOTOR * 4;
            for (i, c) in motor.iter_mut().enumerate() {
                *c = LittleEndian::read_f32(&frame[base + i * 4..base + i * 4 + 4]);
            }
        }

        Ok(Self {
            segment_id: frame[3],
            trajectory_id: LittleEndian::read_u32(&frame[4..8]),
            start_timestamp: LittleEndian::read_u32(&frame[8..12]),
            duration_ms: LittleEndian::read_u16(&frame[12..14]),
            coeffs,
        })
    }
}

/// Emergency stop (0x02): targeted or broadcast (segment id 0xFF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyStop {
    pub segment_id: u8,
    pub stop_reason: u8,
}

impl EmergencyStop {
    pub const FRAME_LEN: usize = 7;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = frame_header(CommandType::EmergencyStop, self.segment_id, Self::FRAME_LEN);
        buf.push(self.stop_reason);
        crc::append(&mut buf);
        buf
    }

    pub fn decode(frame: &[u8]) -> Result<Self> {
        check_len(frame, Self::FRAME_LEN)?;
        Ok(Self {
            segment_id: frame[3],
            stop_reason: frame[4],
        })
    }
}

/// Start homing (0x03). Mode 0x01 = full sequence, 0x02 = quick verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartHoming {
    pub segment_id: u8,
    pub homing_mode: u8,
}

impl StartHoming {
    pub const FRAME_LEN: usize = 7;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = frame_header(CommandType::StartHoming, self.segment_id, Self::FRAME_LEN);
        buf.push(self.homing_mode);
        crc::append(&mut buf);
        buf
    }

    pub fn decode(frame: &[u8]) -> Result<Self> {
        check_len(frame, Self::FRAME_LEN)?;
        Ok(Self {
            segment_id: frame[3],
            homing_mode: frame[4],
        })
    }
}

/// Manual jog (0x07). Jog mode 0x01 = millimeters, 0x02 = encoder ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JogMotor {
    pub segment_id: u8,
    /// Motor index, 1 through 3.
    pub motor_id: u8,
    pub mode: u8,
    pub value: f32,
    pub speed_percent: u8,
}

impl JogMotor {
    pub const FRAME_LEN: usize = 13;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = frame_header(CommandType::JogMotor, self.segment_id, Self::FRAME_LEN);
        buf.push(self.motor_id);
        buf.push(self.mode);
        buf.extend_from_slice(&self.value.to_le_bytes());
        buf.push(self.speed_percent);
        crc::append(&mut buf);
        buf
    }

    pub fn decode(frame: &[u8]) -> Result<Self> {
        check_len(frame, Self::FRAME_LEN)?;
        Ok(Self {
            segment_id: frame[3],
            motor_id: frame[4],
            mode: frame[5],
            value: LittleEndian::read_f32(&frame[6..10]),
            speed_percent: frame[10],
        })
    }
}

/// Mode change (0x08). The mode byte uses the wire values of [`super::Mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetMode {
    pub segment_id: u8,
    pub mode: u8,
}

impl SetMode {
    pub const FRAME_LEN: usize = 7;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = frame_header(CommandType::SetMode, self.segment_id, Self::FRAME_LEN);
        buf.push(self.mode);
        crc::append(&mut buf);
        buf
    }

    pub fn decode(frame: &[u8]) -> Result<Self> {
        check_len(frame, Self::FRAME_LEN)?;
        Ok(Self {
            segment_id: frame[3],
            mode: frame[4],
        })
    }
}

/// Zero-offset capture (0x09). Header and trailer only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetZeroOffset {
    pub segment_id: u8,
}

impl SetZeroOffset {
    pub const FRAME_LEN: usize = 6;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = frame_header(CommandType::SetZeroOffset, self.segment_id, Self::FRAME_LEN);
        crc::append(&mut buf);
        buf
    }

    pub fn decode(frame: &[u8]) -> Result<Self> {
        check_len(frame, Self::FRAME_LEN)?;
        Ok(Self {
            segment_id: frame[3],
        })
    }
}

/// A decoded command of any type.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Trajectory(Trajectory),
    EmergencyStop(EmergencyStop),
    StartHoming(StartHoming),
    JogMotor(JogMotor),
    SetMode(SetMode),
    SetZeroOffset(SetZeroOffset),
}

impl Command {
    /// Decode the payload of a frame whose type tag, magic, checksum, and
    /// exact length were already validated.
    pub fn decode(ty: CommandType, frame: &[u8]) -> Result<Self> {
        Ok(match ty {
            CommandType::Trajectory => Self::Trajectory(Trajectory::decode(frame)?),
            CommandType::EmergencyStop => Self::EmergencyStop(EmergencyStop::decode(frame)?),
            CommandType::StartHoming => Self::StartHoming(StartHoming::decode(frame)?),
            CommandType::JogMotor => Self::JogMotor(JogMotor::decode(frame)?),
            CommandType::SetMode => Self::SetMode(SetMode::decode(frame)?),
            CommandType::SetZeroOffset => Self::SetZeroOffset(SetZeroOffset::decode(frame)?),
        })
    }

    pub fn command_type(&self) -> CommandType {
        match self {
            Self::Trajectory(_) => CommandType::Trajectory,
            Self::EmergencyStop(_) => CommandType::EmergencyStop,
            Self::StartHoming(_) => CommandType::StartHoming,
            Self::JogMotor(_) => CommandType::JogMotor,
            Self::SetMode(_) => CommandType::SetMode,
            Self::SetZeroOffset(_) => CommandType::SetZeroOffset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crc;

    #[test]
    fn test_emergency_stop_layout() {
        let cmd = EmergencyStop {
            segment_id: 0xFF,
            stop_reason: 0x01,
        };
        let frame = cmd.encode();

        assert_eq!(frame.len(), EmergencyStop::FRAME_LEN);
        assert_eq!(&frame[..5], &[0x55, 0xAA, 0x02, 0xFF, 0x01]);
        assert!(crc::verify(&frame));
    }

    #[test]
    fn test_trajectory_round_trip() {
        let mut coeffs = [[0.0f32; COEFFS_PER_MOTOR]; MOTOR_COUNT];
        for (m, motor) in coeffs.iter_mut().enumerate() {
            for (i, c) in motor.iter_mut().enumerate() {
                *c = (m * 10 + i) as f32 * 0.25;
            }
        }

        let cmd = Trajectory {
            segment_id: 3,
            trajectory_id: 42,
            start_timestamp: 1_000_000,
            duration_ms: 2500,
            coeffs,
        };
        let frame = cmd.encode();

        assert_eq!(frame.len(), Trajectory::FRAME_LEN);
        assert!(crc::verify(&frame));

        let decoded = Trajectory::decode(&frame).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn test_jog_motor_round_trip() {
        let cmd = JogMotor {
            segment_id: 1,
            motor_id: 2,
            mode: 0x01,
            value: -12.5,
            speed_percent: 60,
        };
        let frame = cmd.encode();

        assert_eq!(frame.len(), JogMotor::FRAME_LEN);
        let decoded = JogMotor::decode(&frame).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn test_set_zero_offset_is_header_only() {
        let frame = SetZeroOffset { segment_id: 7 }.encode();
        assert_eq!(frame.len(), SetZeroOffset::FRAME_LEN);
        assert_eq!(frame[2], CommandType::SetZeroOffset as u8);
        assert_eq!(frame[3], 7);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let frame = SetMode {
            segment_id: 1,
            mode: 0x02,
        }
        .encode();

        assert!(SetMode::decode(&frame[..frame.len() - 1]).is_err());
        assert!(Trajectory::decode(&frame).is_err());
    }

    #[test]
    fn test_command_type_lengths() {
        assert_eq!(CommandType::Trajectory.frame_len(), 112);
        assert_eq!(CommandType::EmergencyStop.frame_len(), 7);
        assert_eq!(CommandType::StartHoming.frame_len(), 7);
        assert_eq!(CommandType::JogMotor.frame_len(), 13);
        assert_eq!(CommandType::SetMode.frame_len(), 7);
        assert_eq!(CommandType::SetZeroOffset.frame_len(), 6);
    }
}
