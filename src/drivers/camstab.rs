//! Camera stabilization filter bank.
//!
//! Runs once per sample period for each of roll/pitch/yaw: low-pass the
//! attitude estimate, shape any mapped accessory input, add feed-forward
//! boost with slew limiting, and compose a normalized output per axis.
//! Output emission is withheld during the startup window so transient
//! filter states never reach the actuators.

use micromath::F32Ext;

use crate::drivers::filter::{bound_sym, low_pass, slew_limit};
use crate::settings::{CameraStabSettings, StabilizationMode, AXES};
use crate::state::{AccessoryState, AttitudeEstimate, CameraCommand};

/// Filter bank tick period. The periodic task drives updates at this rate.
pub const SAMPLE_PERIOD_MS: u64 = 10;

/// No output is emitted until this much uptime has elapsed.
pub const STARTUP_DELAY_MS: i64 = 7000;

pub struct CameraStab {
    settings: CameraStabSettings,
    last_sys_time_ms: i64,
    attitude_filtered: [f32; AXES],
    inputs: [f32; AXES],
    ff_last_attitude: [f32; AXES],
    ff_last_filtered_attitude: [f32; AXES],
    ff_accumulator: [f32; AXES],
}

impl CameraStab {
    pub fn new(settings: CameraStabSettings, now_ms: i64) -> Self {
        Self {
            settings,
            last_sys_time_ms: now_ms - SAMPLE_PERIOD_MS as i64,
            attitude_filtered: [0.0; AXES],
            inputs: [0.0; AXES],
            ff_last_attitude: [0.0; AXES],
            ff_last_filtered_attitude: [0.0; AXES],
            ff_accumulator: [0.0; AXES],
        }
    }

    /// Swap in a freshly fetched settings block between ticks.
    pub fn apply_settings(&mut self, settings: CameraStabSettings) {
        self.settings = settings;
    }

    /// Process one tick. Returns the per-axis output, or `None` when the
    /// measured interval is invalid (tick skipped, no state touched) or
    /// the startup suppression window has not elapsed yet.
    pub fn update(
        &mut self,
        now_ms: i64,
        attitude: AttitudeEstimate,
        accessories: &AccessoryState,
    ) -> Option<CameraCommand> {
        let dt_ms = (now_ms - self.last_sys_time_ms) as f32;
        if dt_ms <= 0.0 {
            return None;
        }
        self.last_sys_time_ms = now_ms;

        let raw = [attitude.roll_deg, attitude.pitch_deg, attitude.yaw_deg];
        let mut output = [0.0f32; AXES];

        for i in 0..AXES {
            // Attitude low-pass
            self.attitude_filtered[i] = low_pass(
                self.attitude_filtered[i],
                raw[i],
                self.settings.attitude_filter_ms,
                dt_ms,
            );
            let mut attitude = self.attitude_filtered[i];

            // Accessory input shaping
            if let Some(channel) = self.settings.input[i].accessory_index() {
                let value = accessories.values[channel];
                match self.settings.stabilization_mode[i] {
                    StabilizationMode::Attitude => {
                        let input = value * self.settings.input_range[i];
                        self.inputs[i] =
                            low_pass(self.inputs[i], input, self.settings.input_filter_ms, dt_ms);
                    }
                    StabilizationMode::AxisLock => {
                        let input_rate = value * self.settings.input_rate[i];
                        if input_rate.abs() > self.settings.max_axis_lock_rate {
                            self.inputs[i] = bound_sym(
                                self.inputs[i] + input_rate * dt_ms / 1000.0,
                                self.settings.input_range[i],
                            );
                        }
                    }
                    StabilizationMode::None => {}
                }
            }

            attitude = self.apply_feed_forward(i, dt_ms, attitude);

            output[i] = bound_sym(
                (attitude + self.inputs[i]) / self.settings.output_range[i],
                1.0,
            );
        }

        if now_ms <= STARTUP_DELAY_MS {
            return None;
        }
        Some(CameraCommand {
            roll: output[0],
            pitch: output[1],
            yaw: output[2],
        })
    }

    /// Feed-forward boost: the accumulator tracks scaled attitude deltas
    /// and is applied both before and after its decay step, then the
    /// result is slew-limited against the acceleration ceiling.
    fn apply_feed_forward(&mut self, i: usize, dt_ms: f32, mut attitude: f32) -> f32 {
        let mut accumulator = self.ff_accumulator[i];

        accumulator += (attitude - self.ff_last_attitude[i]) * self.settings.feed_forward[i];
        self.ff_last_attitude[i] = attitude;
        attitude += accumulator;

        let filter = self.settings.feed_forward_time_ms / dt_ms;
        if filter > 1.0 {
            accumulator -= accumulator / filter;
        } else {
            accumulator = 0.0;
        }
        self.ff_accumulator[i] = accumulator;
        attitude += accumulator;

        let max_delta = self.settings.max_accel * dt_ms / 1000.0;
        attitude = slew_limit(attitude, self.ff_last_filtered_attitude[i], max_delta);
        self.ff_last_filtered_attitude[i] = attitude;
        attitude
    }
}
