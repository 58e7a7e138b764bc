//! Shared controller state.
//!
//! One instance lives for the whole process. Both command servers mutate it
//! through the dispatcher and the telemetry builders read it, so every field
//! sits behind a single coarse lock; critical sections are a few loads and
//! stores, and the lock is never held across I/O.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::protocol::{ErrorCode, Mode, StatusFlags};

/// Point-in-time copy of the mutable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub mode: Mode,
    pub emergency_stop: bool,
    pub error_count: u16,
    pub last_error: ErrorCode,
}

#[derive(Debug)]
struct Registers {
    mode: Mode,
    emergency_stop: bool,
    error_count: u16,
    last_error: ErrorCode,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            mode: Mode::Idle,
            emergency_stop: false,
            error_count: 0,
            last_error: ErrorCode::NoError,
        }
    }
}

#[derive(Debug)]
struct Inner {
    segment_id: u8,
    started: Instant,
    registers: Mutex<Registers>,
}

/// Cloneable handle to the process-wide controller state.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Inner>,
}

impl SharedState {
    /// Create the state for a segment. The id is fixed for the process
    /// lifetime; 0 means unconfigured.
    pub fn new(segment_id: u8) -> Self {
        Self {
            inner: Arc::new(Inner {
                segment_id,
                started: Instant::now(),
                registers: Mutex::new(Registers::default()),
            }),
        }
    }

    /// This segment's id.
    pub fn segment_id(&self) -> u8 {
        self.inner.segment_id
    }

    /// Milliseconds since process start, wrapping at the u32 boundary.
    pub fn uptime_ms(&self) -> u32 {
        self.inner.started.elapsed().as_millis() as u32
    }

    /// Current operating mode.
    pub fn mode(&self) -> Mode {
        self.inner.registers.lock().mode
    }

    /// Apply a requested mode. Entering OPERATION is the only transition
    /// that clears a latched emergency stop.
    pub fn set_mode(&self, mode: Mode) {
        let mut reg = self.inner.registers.lock();
        reg.mode = mode;
        if mode == Mode::Operation {
            reg.emergency_stop = false;
        }
    }

    /// Whether the emergency stop is latched.
    pub fn emergency_stop(&self) -> bool {
        self.inner.registers.lock().emergency_stop
    }

    /// Latch the emergency stop and force IDLE.
    pub fn trigger_emergency_stop(&self) {
        let mut reg = self.inner.registers.lock();
        reg.emergency_stop = true;
        reg.mode = Mode::Idle;
    }

    /// Count a rejected frame and latch its classification.
    pub fn record_error(&self, code: ErrorCode) {
        let mut reg = self.inner.registers.lock();
        reg.error_count = reg.error_count.wrapping_add(1);
        reg.last_error = code;
    }

    /// Rejected-frame counter, wrapping.
    pub fn error_count(&self) -> u16 {
        self.inner.registers.lock().error_count
    }

    /// Most recent error classification.
    pub fn last_error(&self) -> ErrorCode {
        self.inner.registers.lock().last_error
    }

    /// Copy all mutable fields under one lock acquisition.
    pub fn snapshot(&self) -> StateSnapshot {
        let reg = self.inner.registers.lock();
        StateSnapshot {
            mode: reg.mode,
            emergency_stop: reg.emergency_stop,
            error_count: reg.error_count,
            last_error: reg.last_error,
        }
    }

    /// Derive the motor-state status bitfield from the current state.
    ///
    /// Evaluated fresh on every call. Bits 2–4 and 6 belong to subsystems
    /// not wired up yet and stay zero.
    pub fn status_flags(&self) -> StatusFlags {
        let snap = self.snapshot();
        let mut flags = StatusFlags::NONE;

        if snap.emergency_stop {
            flags.set(StatusFlags::E_STOP_ACTIVE);
        }
        if snap.mode == Mode::Homing {
            flags.set(StatusFlags::HOMING_IN_PROGRESS);
        }
        if snap.mode == Mode::Operation {
            flags.set(StatusFlags::TRAJECTORY_EXECUTING);
        }
        if snap.last_error != ErrorCode::NoError {
            flags.set(StatusFlags::ERROR_PRESENT);
        }

        flags
    }
}
