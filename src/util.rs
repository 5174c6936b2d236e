//! Miscellaneous utility functions.

/// Gets the median of three values.
pub fn mid(a: f64, b: f64, c: f64) -> f64 {
    f64::max(f64::min(a, b), f64::min(f64::max(a, b), c))
}

/// The difference between two values, relative to their magnitude.
/// Magnitudes below one are treated as one, so values near zero are
/// compared absolutely.
pub fn relative_difference(a: f64, b: f64) -> f64 {
    if a == b {
        return 0.0;
    }
    let scale = f64::max(1.0, f64::max(a.abs(), b.abs()));
    (a - b).abs() / scale
}

/// Converts a speed from km/h to m/s.
pub fn kmh_to_ms(speed: f64) -> f64 {
    speed / 3.6
}

/// Converts a flow from veh/h to vehicles per time step of `time_step` seconds.
pub fn per_hour_to_per_step(flow: f64, time_step: f64) -> f64 {
    flow / 3600.0 * time_step
}
