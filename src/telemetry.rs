//! Feedback frame builders and the periodic telemetry loop.
//!
//! Builders read the shared state and the hardware collaborators fresh on
//! every call; nothing is cached between frames. The loop paces motor-state
//! frames over the datagram path and diagnostics over the stream path
//! (falling back to the datagram path when no master connection is up).
//! Sends are best effort: without a known peer the frame is dropped.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::TelemetryConfig;
use crate::protocol::feedback::{Diagnostics, MotorState, Orientation};
use crate::sensors::{AttitudeSource, HealthMonitor, MotorBus, StubHealth, StubImu, StubMotorBus};
use crate::state::SharedState;
use crate::transport::FeedbackLink;

/// Assembles outbound feedback frames from state and collaborator queries.
pub struct Telemetry {
    state: SharedState,
    imu: Arc<dyn AttitudeSource>,
    motors: Arc<dyn MotorBus>,
    health: Arc<dyn HealthMonitor>,
}

impl Telemetry {
    pub fn new(
        state: SharedState,
        imu: Arc<dyn AttitudeSource>,
        motors: Arc<dyn MotorBus>,
        health: Arc<dyn HealthMonitor>,
    ) -> Self {
        Self {
            state,
            imu,
            motors,
            health,
        }
    }

    /// Wire up the bring-up stubs for every collaborator.
    pub fn with_stubs(state: SharedState) -> Self {
        Self::new(
            state,
            Arc::new(StubImu),
            Arc::new(StubMotorBus),
            Arc::new(StubHealth),
        )
    }

    /// Build a motor-state frame from the current state.
    pub fn build_motor_state(&self) -> MotorState {
        let mut frame = MotorState {
            segment_id: self.state.segment_id(),
            timestamp: self.state.uptime_ms(),
            ..Default::default()
        };

        for (axis, slot) in frame.axes.iter_mut().enumerate() {
            *slot = self.motors.axis(axis);
        }

        // Orientation only when the fusion filter vouches for it.
        if self.imu.is_valid() {
            frame.orientation = self.imu.orientation();
        } else {
            frame.orientation = Orientation::default();
        }

        frame.status = self.state.status_flags();
        frame
    }

    /// Build a diagnostics frame from the current state.
    pub fn build_diagnostics(&self) -> Diagnostics {
        let snap = self.state.snapshot();

        Diagnostics {
            segment_id: self.state.segment_id(),
            timestamp: self.state.uptime_ms(),
            driver_temp: self.motors.driver_temperature(),
            board_temp: self.health.board_temperature(),
            error_count: snap.error_count,
            last_error: snap.last_error.as_u8(),
            cpu_usage: self.health.cpu_usage_percent(),
        }
    }

    /// Periodic feedback loop; runs until shutdown is signalled.
    pub async fn run(
        self,
        datagram_link: Arc<dyn FeedbackLink>,
        stream_link: Arc<dyn FeedbackLink>,
        config: &TelemetryConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut motor_tick = tokio::time::interval(config.motor_state_interval);
        motor_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut diag_tick = tokio::time::interval(config.diagnostics_interval);
        diag_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            motor_state_interval = ?config.motor_state_interval,
            diagnostics_interval = ?config.diagnostics_interval,
            "telemetry loop started"
        );

        loop {
            tokio::select! {
                _ = motor_tick.tick() => {
                    let frame = self.build_motor_state().encode();
                    let _ = datagram_link.send_feedback(&frame).await;
                }
                _ = diag_tick.tick() => {
                    let frame = self.build_diagnostics().encode();
                    // Prefer the stream connection; fall back to the last
                    // datagram peer when the master is not connected.
                    if !stream_link.send_feedback(&frame).await.unwrap_or(false) {
                        let sent = datagram_link.send_feedback(&frame).await.unwrap_or(false);
                        if !sent {
                            debug!(
                                stream = stream_link.transport_type(),
                                datagram = datagram_link.transport_type(),
                                "diagnostics dropped, no peer known"
                            );
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("telemetry loop stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::feedback::StatusFlags;
    use crate::protocol::{crc, ErrorCode, Mode, FEEDBACK_MAGIC};

    #[test]
    fn test_motor_state_zero_filled_with_stubs() {
        let telemetry = Telemetry::with_stubs(SharedState::new(5));

        let frame = telemetry.build_motor_state();

        assert_eq!(frame.segment_id, 5);
        for axis in &frame.axes {
            assert_eq!(axis.position, 0.0);
            assert_eq!(axis.current, 0.0);
        }
        assert_eq!(frame.orientation, Orientation::default());
        assert_eq!(frame.status.bits(), 0);

        let bytes = frame.encode();
        assert_eq!(bytes.len(), MotorState::FRAME_LEN);
        assert_eq!(
            u16::from_le_bytes([bytes[0], bytes[1]]),
            FEEDBACK_MAGIC
        );
        assert!(crc::verify(&bytes));
    }

    #[test]
    fn test_motor_state_reflects_estop() {
        let state = SharedState::new(2);
        let telemetry = Telemetry::with_stubs(state.clone());

        state.trigger_emergency_stop();
        let frame = telemetry.build_motor_state();

        assert!(frame.status.has(StatusFlags::E_STOP_ACTIVE));
        assert!(!frame.status.has(StatusFlags::TRAJECTORY_EXECUTING));

        // The bitfield is derived fresh: clearing the latch clears the bit.
        state.set_mode(Mode::Operation);
        let frame = telemetry.build_motor_state();
        assert!(!frame.status.has(StatusFlags::E_STOP_ACTIVE));
        assert!(frame.status.has(StatusFlags::TRAJECTORY_EXECUTING));
    }

    #[test]
    fn test_diagnostics_carries_error_state() {
        let state = SharedState::new(3);
        let telemetry = Telemetry::with_stubs(state.clone());

        state.record_error(ErrorCode::CrcError);
        state.record_error(ErrorCode::CrcError);

        let frame = telemetry.build_diagnostics();
        assert_eq!(frame.segment_id, 3);
        assert_eq!(frame.error_count, 2);
        assert_eq!(frame.last_error, ErrorCode::CrcError.as_u8());
        assert_eq!(frame.driver_temp, 25.0);
        assert_eq!(frame.board_temp, 30.0);
        assert_eq!(frame.cpu_usage, 10);
    }

    #[test]
    fn test_diagnostics_idempotent_modulo_timestamp() {
        let telemetry = Telemetry::with_stubs(SharedState::new(1));

        let a = telemetry.build_diagnostics().encode();
        let b = telemetry.build_diagnostics().encode();

        assert_eq!(a.len(), Diagnostics::FRAME_LEN);
        // Identical payloads apart from the timestamp field and the trailer
        // it feeds into.
        assert_eq!(a[..4], b[..4]);
        assert_eq!(a[8..20], b[8..20]);
    }
}
