//! Feedback builder tests - byte layouts, collaborator plumbing, and the
//! status bitfield as seen by the master.

use std::sync::Arc;

use segmentd::protocol::feedback::{
    AxisState, Diagnostics, MotorState, Orientation, StatusFlags,
};
use segmentd::protocol::{crc, ErrorCode, Mode, FEEDBACK_MAGIC};
use segmentd::sensors::{AttitudeSource, MotorBus, StubHealth};
use segmentd::state::SharedState;
use segmentd::telemetry::Telemetry;

/// IMU double with a switchable validity flag.
struct FixedImu {
    orientation: Orientation,
    valid: bool,
}

impl AttitudeSource for FixedImu {
    fn orientation(&self) -> Orientation {
        self.orientation
    }

    fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Motor-bus double reporting distinct values per axis.
struct RampMotorBus;

impl MotorBus for RampMotorBus {
    fn axis(&self, axis: usize) -> AxisState {
        let base = (axis as f32 + 1.0) * 100.0;
        AxisState {
            position: base,
            velocity: base + 1.0,
            acceleration: base + 2.0,
            jerk: base + 3.0,
            current: base + 4.0,
        }
    }

    fn driver_temperature(&self) -> f32 {
        40.0
    }
}

fn telemetry_with(imu: FixedImu, state: SharedState) -> Telemetry {
    Telemetry::new(
        state,
        Arc::new(imu),
        Arc::new(RampMotorBus),
        Arc::new(StubHealth),
    )
}

#[test]
fn motor_state_copies_orientation_when_imu_valid() {
    let imu = FixedImu {
        orientation: Orientation {
            roll: 0.25,
            pitch: -0.5,
            yaw: 1.5,
        },
        valid: true,
    };
    let telemetry = telemetry_with(imu, SharedState::new(6));

    let frame = telemetry.build_motor_state();

    assert_eq!(frame.orientation.roll, 0.25);
    assert_eq!(frame.orientation.pitch, -0.5);
    assert_eq!(frame.orientation.yaw, 1.5);
    assert_eq!(frame.axes[0].position, 100.0);
    assert_eq!(frame.axes[2].current, 304.0);
}

#[test]
fn motor_state_zeroes_orientation_when_imu_invalid() {
    let imu = FixedImu {
        orientation: Orientation {
            roll: 9.0,
            pitch: 9.0,
            yaw: 9.0,
        },
        valid: false,
    };
    let telemetry = telemetry_with(imu, SharedState::new(6));

    let frame = telemetry.build_motor_state();

    assert_eq!(frame.orientation, Orientation::default());
}

#[test]
fn motor_state_wire_layout() {
    let state = SharedState::new(7);
    state.set_mode(Mode::Operation);
    let telemetry = telemetry_with(
        FixedImu {
            orientation: Orientation::default(),
            valid: false,
        },
        state,
    );

    let bytes = telemetry.build_motor_state().encode();

    assert_eq!(bytes.len(), MotorState::FRAME_LEN);
    assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), FEEDBACK_MAGIC);
    assert_eq!(bytes[2], 0x01);
    assert_eq!(bytes[3], 7);
    // Motor 1 position at offset 8.
    assert_eq!(f32::from_le_bytes(bytes[8..12].try_into().unwrap()), 100.0);
    // Status byte sits just before the trailer.
    assert_eq!(bytes[80], StatusFlags::TRAJECTORY_EXECUTING);
    assert!(crc::verify(&bytes));

    let decoded = MotorState::decode(&bytes).unwrap();
    assert_eq!(decoded.segment_id, 7);
}

#[test]
fn status_bits_cover_the_reported_conditions_only() {
    let state = SharedState::new(1);
    let telemetry = Telemetry::with_stubs(state.clone());

    state.set_mode(Mode::Homing);
    state.trigger_emergency_stop(); // Forces IDLE, latches the flag.
    state.record_error(ErrorCode::CrcError);

    let status = telemetry.build_motor_state().status;

    assert!(status.has(StatusFlags::E_STOP_ACTIVE));
    assert!(status.has(StatusFlags::ERROR_PRESENT));
    assert!(!status.has(StatusFlags::HOMING_IN_PROGRESS));
    // Reserved bits stay clear.
    assert!(!status.has(StatusFlags::POSITION_LIMIT_HIT));
    assert!(!status.has(StatusFlags::FORCE_LIMIT_EXCEEDED));
    assert!(!status.has(StatusFlags::BUFFER_EMPTY));
    assert!(!status.has(StatusFlags::CALIBRATION_VALID));
}

#[test]
fn diagnostics_wire_layout() {
    let state = SharedState::new(3);
    state.record_error(ErrorCode::CrcError);
    let telemetry = Telemetry::with_stubs(state);

    let bytes = telemetry.build_diagnostics().encode();

    assert_eq!(bytes.len(), Diagnostics::FRAME_LEN);
    assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), FEEDBACK_MAGIC);
    assert_eq!(bytes[2], 0x03);
    assert_eq!(bytes[3], 3);
    assert_eq!(f32::from_le_bytes(bytes[8..12].try_into().unwrap()), 25.0);
    assert_eq!(f32::from_le_bytes(bytes[12..16].try_into().unwrap()), 30.0);
    assert_eq!(u16::from_le_bytes([bytes[16], bytes[17]]), 1);
    assert_eq!(bytes[18], ErrorCode::CrcError.as_u8());
    assert_eq!(bytes[19], 10);
    assert!(crc::verify(&bytes));
}

#[test]
fn diagnostics_unchanged_state_differs_only_in_timestamp() {
    let telemetry = Telemetry::with_stubs(SharedState::new(2));

    let a = telemetry.build_diagnostics().encode();
    let b = telemetry.build_diagnostics().encode();

    // Header and everything after the timestamp match byte for byte;
    // timestamp and trailer are allowed to differ.
    assert_eq!(a[..4], b[..4]);
    assert_eq!(a[8..20], b[8..20]);
}
