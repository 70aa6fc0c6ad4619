use micromath::F32Ext;

/// Single-pole low-pass in time-constant form: blends the previous output
/// with the new input weighted `τ/(τ+dt)` vs `dt/(τ+dt)`. A zero time
/// constant passes the input straight through.
pub fn low_pass(prev: f32, input: f32, tau_ms: f32, dt_ms: f32) -> f32 {
    (tau_ms / (tau_ms + dt_ms)) * prev + (dt_ms / (tau_ms + dt_ms)) * input
}

/// Clamp `value` to the symmetric band `[-range, range]`. `range` must be
/// non-negative.
pub fn bound_sym(value: f32, range: f32) -> f32 {
    value.clamp(-range, range)
}

/// Limit the step from `last` toward `target` to `max_delta` per call.
pub fn slew_limit(target: f32, last: f32, max_delta: f32) -> f32 {
    let delta = target - last;
    if delta.abs() > max_delta {
        last + if delta > 0.0 { max_delta } else { -max_delta }
    } else {
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_pass_converges_monotonically_without_overshoot() {
        let target = 10.0;
        let mut filtered = 0.0;
        let mut last_error = target;
        for _ in 0..200 {
            filtered = low_pass(filtered, target, 50.0, 10.0);
            let error = target - filtered;
            assert!(error >= 0.0, "overshot target: filtered = {}", filtered);
            assert!(error <= last_error, "error grew: {} > {}", error, last_error);
            last_error = error;
        }
        assert!(last_error < 0.01, "did not converge, error = {}", last_error);
    }

    #[test]
    fn low_pass_is_identity_at_steady_state() {
        let filtered = low_pass(5.0, 5.0, 100.0, 10.0);
        assert!((filtered - 5.0).abs() < 1e-6);
    }

    #[test]
    fn low_pass_with_zero_tau_passes_through() {
        let filtered = low_pass(0.0, 42.0, 0.0, 10.0);
        assert_eq!(filtered, 42.0);
    }

    #[test]
    fn bound_sym_clamps_both_sides() {
        assert_eq!(bound_sym(5.0, 2.0), 2.0);
        assert_eq!(bound_sym(-5.0, 2.0), -2.0);
        assert_eq!(bound_sym(1.5, 2.0), 1.5);
    }

    #[test]
    fn slew_limit_caps_step_in_both_directions() {
        assert_eq!(slew_limit(10.0, 0.0, 3.0), 3.0);
        assert_eq!(slew_limit(-10.0, 0.0, 3.0), -3.0);
        assert_eq!(slew_limit(2.0, 0.0, 3.0), 2.0);
    }
}
