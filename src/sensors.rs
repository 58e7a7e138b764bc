//! Collaborator interfaces for hardware the protocol engine reports on.
//!
//! The telemetry builders only need narrow queries: fused orientation from
//! the IMU filter, per-axis motion data from the motor-driver bus, and
//! board-level health numbers. Each seam is a trait so the real drivers can
//! slot in behind the same telemetry path; until then the stubs carry the
//! bring-up placeholder values.

use crate::protocol::command::MOTOR_COUNT;
use crate::protocol::feedback::{AxisState, Orientation};

/// Fused orientation provider (IMU + filter).
pub trait AttitudeSource: Send + Sync {
    /// Current roll/pitch/yaw in radians.
    fn orientation(&self) -> Orientation;

    /// Whether the sensor is initialized and producing fresh data.
    fn is_valid(&self) -> bool;
}

/// Motor-driver bus queries.
pub trait MotorBus: Send + Sync {
    /// Motion state of one axis (0-based, `< MOTOR_COUNT`).
    fn axis(&self, axis: usize) -> AxisState;

    /// Average driver temperature across all axes, °C.
    fn driver_temperature(&self) -> f32;
}

/// Board-level health queries.
pub trait HealthMonitor: Send + Sync {
    /// Controller board temperature, °C.
    fn board_temperature(&self) -> f32;

    /// CPU load estimate, 0–100 %.
    fn cpu_usage_percent(&self) -> u8;
}

/// IMU stub used until the sensor-fusion task is wired up. Reports invalid,
/// so telemetry emits zeroed orientation.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubImu;

impl AttitudeSource for StubImu {
    fn orientation(&self) -> Orientation {
        Orientation::default()
    }

    fn is_valid(&self) -> bool {
        false
    }
}

/// Motor-bus stub: all axes at rest, nominal driver temperature.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubMotorBus;

impl MotorBus for StubMotorBus {
    fn axis(&self, axis: usize) -> AxisState {
        debug_assert!(axis < MOTOR_COUNT);
        AxisState::default()
    }

    fn driver_temperature(&self) -> f32 {
        25.0
    }
}

/// Health stub with the bring-up placeholder numbers.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubHealth;

impl HealthMonitor for StubHealth {
    fn board_temperature(&self) -> f32 {
        30.0
    }

    fn cpu_usage_percent(&self) -> u8 {
        10
    }
}
