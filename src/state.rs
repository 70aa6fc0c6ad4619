//! Shared state types for inter-task communication via Embassy channels,
//! plus the atomic snapshots read across task boundaries.
//!
//! All channel payloads are `Copy` to minimise overhead when sent through
//! channels.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::settings::ACCESSORY_COUNT;

/// Depth of the accel/gyro sample queues. The driver outruns the consumer
/// by design; overflow drops the newest sample instead of blocking.
pub const SENSOR_QUEUE_DEPTH: usize = 2;

// ── Queue payloads ────────────────────────────────────────────────────────────

/// One scaled accelerometer sample, board frame, m/s².
#[derive(Clone, Copy, Default)]
pub struct AccelSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub temp_c: f32,
}

/// One scaled gyro sample, board frame, °/s.
#[derive(Clone, Copy, Default)]
pub struct GyroSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub temp_c: f32,
}

/// Attitude estimate in degrees, as published by the upstream estimator.
#[derive(Clone, Copy, Default)]
pub struct AttitudeEstimate {
    pub roll_deg: f32,
    pub pitch_deg: f32,
    pub yaw_deg: f32,
}

/// Normalized gimbal output, one value per axis in [-1, 1].
#[derive(Clone, Copy, Default)]
pub struct CameraCommand {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// Snapshot of the accessory input channels, each normalized to [-1, 1].
#[derive(Clone, Copy, Default)]
pub struct AccessoryState {
    pub values: [f32; ACCESSORY_COUNT],
}

// ── Cross-task snapshots ──────────────────────────────────────────────────────
//  The attitude estimator and the accessory receiver live outside this core;
//  they publish through word-sized atomics so the filter bank can take a
//  snapshot without locking.

/// Latest attitude estimate, written by the estimator, read by the stab task.
pub struct SharedAttitude {
    roll: AtomicU32,
    pitch: AtomicU32,
    yaw: AtomicU32,
}

impl SharedAttitude {
    pub const fn new() -> Self {
        Self {
            roll: AtomicU32::new(0),
            pitch: AtomicU32::new(0),
            yaw: AtomicU32::new(0),
        }
    }

    pub fn store(&self, attitude: AttitudeEstimate) {
        self.roll.store(attitude.roll_deg.to_bits(), Ordering::Relaxed);
        self.pitch.store(attitude.pitch_deg.to_bits(), Ordering::Relaxed);
        self.yaw.store(attitude.yaw_deg.to_bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> AttitudeEstimate {
        AttitudeEstimate {
            roll_deg: f32::from_bits(self.roll.load(Ordering::Relaxed)),
            pitch_deg: f32::from_bits(self.pitch.load(Ordering::Relaxed)),
            yaw_deg: f32::from_bits(self.yaw.load(Ordering::Relaxed)),
        }
    }
}

/// Latest accessory input values, written by the receiver path.
pub struct SharedAccessories {
    values: [AtomicU32; ACCESSORY_COUNT],
}

impl SharedAccessories {
    pub const fn new() -> Self {
        const ZERO: AtomicU32 = AtomicU32::new(0);
        Self {
            values: [ZERO; ACCESSORY_COUNT],
        }
    }

    pub fn set(&self, channel: usize, value: f32) {
        if channel < ACCESSORY_COUNT {
            self.values[channel].store(value.clamp(-1.0, 1.0).to_bits(), Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> AccessoryState {
        let mut state = AccessoryState::default();
        for (slot, value) in state.values.iter_mut().zip(self.values.iter()) {
            *slot = f32::from_bits(value.load(Ordering::Relaxed));
        }
        state
    }
}
