//! Inbound frame validation and routing.

use tracing::{debug, info, warn};

use super::command::{
    Command, CommandType, EmergencyStop, JogMotor, SetMode, StartHoming, Trajectory,
};
use super::{crc, ErrorCode, Mode, BROADCAST_SEGMENT_ID, COMMAND_MAGIC, MIN_COMMAND_LEN};
use crate::error::{ProtocolError, Result};
use crate::state::SharedState;

/// Validates raw command frames and applies them to the shared state.
///
/// Both transport servers feed received buffers through one dispatcher
/// clone; every frame is processed to completion before the next, per
/// transport. A malformed frame is counted, logged, and discarded; no reply
/// is ever sent for it.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    state: SharedState,
}

impl Dispatcher {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Validate one received buffer and route it to its handler.
    ///
    /// Returns the command type on success. On any validation failure the
    /// error counter is incremented, the error classification is latched
    /// (every failure class reports `CRC_ERROR` on the wire), and the
    /// offending frame is dropped.
    pub fn dispatch(&self, frame: &[u8]) -> Result<CommandType> {
        match self.validate_and_route(frame) {
            Ok(ty) => Ok(ty),
            Err(e) => {
                if e.is_frame_error() {
                    warn!(len = frame.len(), "rejected command frame: {e}");
                    self.state.record_error(ErrorCode::CrcError);
                }
                Err(e)
            }
        }
    }

    fn validate_and_route(&self, frame: &[u8]) -> Result<CommandType> {
        if frame.len() < MIN_COMMAND_LEN {
            return Err(ProtocolError::FrameTooShort { len: frame.len() }.into());
        }

        let magic = u16::from_le_bytes([frame[0], frame[1]]);
        if magic != COMMAND_MAGIC {
            return Err(ProtocolError::BadMagic { got: magic }.into());
        }

        if !crc::verify(frame) {
            return Err(ProtocolError::ChecksumMismatch.into());
        }

        let ty = CommandType::from_u8(frame[2]).ok_or(ProtocolError::UnknownType(frame[2]))?;

        if frame.len() != ty.frame_len() {
            return Err(ProtocolError::SizeMismatch {
                expected: ty.frame_len(),
                got: frame.len(),
            }
            .into());
        }

        debug!(%ty, len = frame.len(), "received valid command");

        match Command::decode(ty, frame)? {
            Command::Trajectory(cmd) => self.handle_trajectory(&cmd),
            Command::EmergencyStop(cmd) => self.handle_emergency_stop(&cmd),
            Command::StartHoming(cmd) => self.handle_start_homing(&cmd),
            Command::JogMotor(cmd) => self.handle_jog_motor(&cmd),
            Command::SetMode(cmd) => self.handle_set_mode(&cmd),
            Command::SetZeroOffset(_) => {
                info!("SET_ZERO_OFFSET received; offsets are captured by the motor subsystem");
            }
        }

        Ok(ty)
    }

    fn handle_emergency_stop(&self, cmd: &EmergencyStop) {
        warn!(
            reason = cmd.stop_reason,
            target = cmd.segment_id,
            "EMERGENCY STOP received"
        );

        // Act only on broadcast or on our own id; a stop addressed to
        // another segment is valid traffic but not ours to execute.
        if cmd.segment_id == BROADCAST_SEGMENT_ID || cmd.segment_id == self.state.segment_id() {
            self.state.trigger_emergency_stop();
            warn!("motors disabled, mode forced to IDLE");
        }
    }

    fn handle_set_mode(&self, cmd: &SetMode) {
        match Mode::from_u8(cmd.mode) {
            Some(mode) => {
                info!(%mode, "SET_MODE");
                self.state.set_mode(mode);
            }
            None => {
                warn!(mode = cmd.mode, "SET_MODE with unrecognized mode byte, ignoring");
            }
        }
    }

    fn handle_start_homing(&self, cmd: &StartHoming) {
        info!(mode = cmd.homing_mode, "START_HOMING");
        self.state.set_mode(Mode::Homing);
    }

    fn handle_trajectory(&self, cmd: &Trajectory) {
        info!(
            id = cmd.trajectory_id,
            start = cmd.start_timestamp,
            duration_ms = cmd.duration_ms,
            "TRAJECTORY accepted"
        );
        debug!(
            a0_motor1 = f64::from(cmd.coeffs[0][0]),
            a0_motor2 = f64::from(cmd.coeffs[1][0]),
            a0_motor3 = f64::from(cmd.coeffs[2][0]),
            "trajectory leading coefficients"
        );
        // Buffering and interpolation happen in the motor subsystem.
    }

    fn handle_jog_motor(&self, cmd: &JogMotor) {
        info!(
            motor = cmd.motor_id,
            mode = cmd.mode,
            value = f64::from(cmd.value),
            speed = cmd.speed_percent,
            "JOG_MOTOR accepted"
        );
    }
}
