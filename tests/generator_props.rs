use coyote_pulse::channel::ChannelId;
use coyote_pulse::constants::{MAX_PULSE_DURATION_MS, MAX_PULSE_INTENSITY, MIN_PULSE_DURATION_MS};
use coyote_pulse::generator::{duration_limits, PulseGenerator};
use coyote_pulse::params::{ChannelParams, ConstantCurve, KeyframeCurve};
use coyote_pulse::pulse::derived_frequency;
use proptest::prelude::*;
use std::sync::Arc;

fn generator(window: (f64, f64), pulse_hz: f64) -> PulseGenerator {
    PulseGenerator::new(
        ChannelId::A,
        ChannelParams::fixed(window.0, window.1),
        Arc::new(ConstantCurve(pulse_hz)),
        (10.0, 100.0),
        0.5,
    )
}

proptest! {
    #[test]
    fn pulses_respect_hardware_and_channel_limits(
        min_hz in 0.5f64..150.0,
        span in 0.0f64..200.0,
        pulse_hz in -50.0f64..300.0,
        intensity in 0u8..=255,
    ) {
        let window = (min_hz, min_hz + span);
        let mut gen = generator(window, pulse_hz);
        let (lo, hi) = gen.frequency_window(0.0);
        let limits = duration_limits(lo, hi);
        for i in 0..64u64 {
            let (pulse, debug) = gen.create_pulse(i as f64 * 0.025, intensity, i);
            prop_assert!(pulse.duration_ms >= MIN_PULSE_DURATION_MS);
            prop_assert!(pulse.duration_ms <= MAX_PULSE_DURATION_MS);
            prop_assert!(pulse.duration_ms >= limits.0 && pulse.duration_ms <= limits.1);
            prop_assert!(pulse.intensity <= MAX_PULSE_INTENSITY);
            prop_assert_eq!(pulse.frequency_hz, derived_frequency(pulse.duration_ms));
            prop_assert!(debug.residual_ms.abs() <= 0.5 + 1e-9);
        }
    }

    #[test]
    fn residual_stays_bounded_on_a_moving_curve(
        points in prop::collection::vec((0.0f64..10.0, 0.0f64..120.0), 1..8),
    ) {
        let mut gen = PulseGenerator::new(
            ChannelId::B,
            ChannelParams::fixed(1.0, 100.0),
            Arc::new(KeyframeCurve::new(points)),
            (1.0, 100.0),
            0.5,
        );
        for i in 0..200u64 {
            gen.create_pulse(i as f64 * 0.05, 50, i);
            prop_assert!(gen.residual_ms().abs() <= 0.5 + 1e-9);
        }
    }
}

#[test]
fn average_frequency_converges_to_target() {
    // 33 Hz maps onto itself with a (10, 100) window and (10, 100) limits.
    let mut gen = generator((10.0, 100.0), 33.0);
    let count = 3000;
    let total_ms: u64 = (0..count)
        .map(|i| gen.create_pulse(0.0, 100, i).0.duration_ms as u64)
        .sum();
    let mean_ms = total_ms as f64 / count as f64;
    let target_ms = 1000.0 / 33.0;
    assert!(
        (mean_ms - target_ms).abs() < 0.01,
        "mean {} ms vs target {} ms",
        mean_ms,
        target_ms
    );
    // Individual pulses only ever take the neighbouring integers.
    let (pulse, _) = gen.create_pulse(0.0, 100, count);
    assert!(pulse.duration_ms == 30 || pulse.duration_ms == 31);
}

#[test]
fn rounding_past_the_long_limit_is_clamped_and_drops_carry() {
    // 30 Hz is 33.3 ms; the window's long limit rounds to 33 ms.
    let mut gen = generator((30.0, 100.0), 10.0);
    let (first, debug) = gen.create_pulse(0.0, 80, 0);
    assert_eq!(first.duration_ms, 33);
    assert!(!debug.clamped);
    assert!(gen.residual_ms() > 0.3);

    // The carry pushes the next one to 34 ms, over the limit.
    let (second, debug) = gen.create_pulse(0.0, 80, 1);
    assert_eq!(second.duration_ms, 33);
    assert!(debug.clamped);
    assert_eq!(debug.rounded_duration_ms, 34);
    assert_eq!(gen.residual_ms(), 0.0);
}

#[test]
fn inverted_window_falls_back_to_hardware_range() {
    let gen = generator((150.0, 20.0), 40.0);
    let (lo, hi) = gen.frequency_window(0.0);
    assert!((lo - 1000.0 / 240.0).abs() < 1e-9);
    assert_eq!(hi, 200.0);
}
