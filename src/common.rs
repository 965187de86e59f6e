//! Small numeric helpers shared by the pulse pipeline.

/// Clamp `value` into `[low, high]`. NaN collapses to `low`.
#[inline]
pub fn clamp(value: f64, low: f64, high: f64) -> f64 {
    if value.is_nan() {
        return low;
    }
    value.max(low).min(high)
}

/// Position of `value` inside `limits`, clamped to `[0, 1]`.
///
/// A degenerate or inverted range maps everything to 0.
pub fn normalize(value: f64, limits: (f64, f64)) -> f64 {
    let (low, high) = limits;
    let span = high - low;
    if span.is_nan() || span <= 0.0 {
        return 0.0;
    }
    clamp((value - low) / span, 0.0, 1.0)
}

/// Linear interpolation between `a` and `b` by `t`.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Split a non-negative second count into `(hours, minutes, seconds, millis)`.
pub fn split_seconds(total_s: f64) -> (u64, u64, u64, u64) {
    let total_ms = (total_s.max(0.0) * 1000.0).round() as u64;
    let millis = total_ms % 1000;
    let total_secs = total_ms / 1000;
    (total_secs / 3600, (total_secs / 60) % 60, total_secs % 60, millis)
}
