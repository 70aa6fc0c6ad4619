//! Camera stabilization settings snapshot.
//!
//! The whole block is replaced atomically when the configuration side
//! signals a new snapshot; the filter bank never sees a half-updated set.

/// Number of accessory input channels the receiver path exposes.
pub const ACCESSORY_COUNT: usize = 4;

/// Number of stabilized axes (roll, pitch, yaw).
pub const AXES: usize = 3;

/// Accessory channel feeding an axis, if any.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputChannel {
    #[default]
    None,
    Accessory0,
    Accessory1,
    Accessory2,
    Accessory3,
}

impl InputChannel {
    /// Index into the accessory snapshot, `None` when the axis is unmapped.
    pub fn accessory_index(self) -> Option<usize> {
        match self {
            InputChannel::None => None,
            InputChannel::Accessory0 => Some(0),
            InputChannel::Accessory1 => Some(1),
            InputChannel::Accessory2 => Some(2),
            InputChannel::Accessory3 => Some(3),
        }
    }
}

/// How a mapped accessory input shapes its axis.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StabilizationMode {
    /// Input shaping disabled; the held shaped value is left untouched.
    None,
    /// The input commands an angle offset, low-pass filtered.
    #[default]
    Attitude,
    /// The input commands a rate, integrated into a held angle with a
    /// deadband below which the accumulator freezes.
    AxisLock,
}

/// Filter bank configuration, replaced as one block on change notification.
#[derive(Clone, Copy)]
pub struct CameraStabSettings {
    /// Accessory channel mapped to each axis.
    pub input: [InputChannel; AXES],
    /// Shaping mode for each axis's input.
    pub stabilization_mode: [StabilizationMode; AXES],
    /// Attitude low-pass time constant, milliseconds. 0 disables filtering.
    pub attitude_filter_ms: f32,
    /// Input low-pass time constant (Attitude mode), milliseconds.
    pub input_filter_ms: f32,
    /// Angular span commanded by a full-scale input, degrees per axis.
    pub input_range: [f32; AXES],
    /// Rate commanded by a full-scale input (AxisLock mode), °/s per axis.
    pub input_rate: [f32; AXES],
    /// Attitude that maps to a full-scale output, degrees per axis.
    pub output_range: [f32; AXES],
    /// Feed-forward gain per axis.
    pub feed_forward: [f32; AXES],
    /// Feed-forward accumulator decay time constant, milliseconds.
    pub feed_forward_time_ms: f32,
    /// Output acceleration limit, °/s.
    pub max_accel: f32,
    /// AxisLock deadband: rates at or below this freeze the accumulator, °/s.
    pub max_axis_lock_rate: f32,
}

impl Default for CameraStabSettings {
    fn default() -> Self {
        Self {
            input: [InputChannel::None; AXES],
            stabilization_mode: [StabilizationMode::Attitude; AXES],
            attitude_filter_ms: 0.0,
            input_filter_ms: 0.0,
            input_range: [20.0; AXES],
            input_rate: [50.0; AXES],
            output_range: [20.0; AXES],
            feed_forward: [0.0; AXES],
            feed_forward_time_ms: 0.0,
            max_accel: 500.0,
            max_axis_lock_rate: 1.0,
        }
    }
}
