//! Hardware limits of the Coyote 3.0 pulse generator.
//!
//! The device takes pulse durations as integer milliseconds in the
//! 5..=240 range (documented as 10..=240, but 5 ms is accepted), and the
//! frequency of a pulse is simply `1000 / duration_ms`.

/// Shortest pulse the device accepts, in ms.
pub const MIN_PULSE_DURATION_MS: u32 = 5;

/// Longest pulse the device accepts, in ms.
pub const MAX_PULSE_DURATION_MS: u32 = 240;

/// Lowest pulse frequency the device can render (240 ms pulses).
pub const HARDWARE_MIN_FREQ_HZ: f64 = 1000.0 / MAX_PULSE_DURATION_MS as f64;

/// Highest pulse frequency the device can render (5 ms pulses).
pub const HARDWARE_MAX_FREQ_HZ: f64 = 1000.0 / MIN_PULSE_DURATION_MS as f64;

/// Pulses per channel in one B0 packet.
pub const PULSES_PER_PACKET: usize = 4;

/// Upper bound of the per-pulse intensity field (percent).
pub const MAX_PULSE_INTENSITY: u8 = 100;

/// Default amount of buffered pulse time each channel keeps queued.
pub const QUEUE_HORIZON_MS: f64 = 750.0;

/// Fixed packet cadence, in seconds.
pub const UPDATE_INTERVAL_S: f64 = 0.1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_bounds_match_durations() {
        assert!((HARDWARE_MIN_FREQ_HZ - 4.1666).abs() < 1e-3);
        assert_eq!(HARDWARE_MAX_FREQ_HZ, 200.0);
        // A full packet of the longest pulses must still fit past the horizon.
        assert!((PULSES_PER_PACKET as f64) * (MAX_PULSE_DURATION_MS as f64) > QUEUE_HORIZON_MS);
    }
}
