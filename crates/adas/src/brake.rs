//! Brake ramps

/// Speeds written by a stepwise brake from `current` down to `target`.
///
/// Each step removes `reduction_rate`, clamped at zero. Returns an empty ramp
/// when the speed is already at or below the target or the rate is not
/// positive.
pub fn brake_ramp(current: f64, target: f64, reduction_rate: f64) -> Vec<f64> {
    let mut ramp = Vec::new();
    if reduction_rate <= 0.0 || !current.is_finite() {
        return ramp;
    }

    let mut speed = current;
    while speed > target {
        speed = (speed - reduction_rate).max(0.0);
        ramp.push(speed);
        if speed == 0.0 {
            break;
        }
    }
    ramp
}

/// One simulation step of constant deceleration
pub fn decelerate(speed_mps: f64, decel_mps2: f64, dt_s: f64) -> f64 {
    (speed_mps - decel_mps2 * dt_s).max(0.0)
}
