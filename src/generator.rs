//! Per-channel pulse generator.
//!
//! The device only takes integer-millisecond durations, so a continuous
//! target frequency can't be hit on every pulse. The generator rounds each
//! desired duration with first-order error feedback: the rounding error of
//! one pulse is carried into the next, which keeps the long-run average
//! frequency on target even where 1 ms is a large relative error.

use crate::channel::ChannelId;
use crate::common::{clamp, lerp, normalize};
use crate::constants::{
    HARDWARE_MAX_FREQ_HZ, HARDWARE_MIN_FREQ_HZ, MAX_PULSE_DURATION_MS, MAX_PULSE_INTENSITY,
    MIN_PULSE_DURATION_MS,
};
use crate::invariant_ppt::{
    assert_invariant, PULSE_FREQUENCY_DERIVED, PULSE_WITHIN_LIMITS, RESIDUAL_BOUNDED,
};
use crate::params::{ChannelParams, Curve};
use crate::pulse::Pulse;
use std::f64::consts::TAU;
use std::sync::Arc;

/// Slack for float comparisons against the residual bound.
const RESIDUAL_EPSILON: f64 = 1e-9;

/// Error-feedback rounding state of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationQuantizer {
    residual_ms: f64,
    bound: f64,
}

impl DurationQuantizer {
    pub fn new(bound: f64) -> Self {
        Self {
            residual_ms: 0.0,
            bound: bound.abs(),
        }
    }

    /// Round `desired_ms` plus the carried residual to whole milliseconds.
    ///
    /// Returns the rounded duration (at least 1 ms) and the new residual.
    pub fn quantize(&mut self, desired_ms: f64) -> (u32, f64) {
        let accum = desired_ms + self.residual_ms;
        let rounded = accum.round();
        let residual = clamp(accum - rounded, -self.bound, self.bound);
        self.residual_ms = residual;
        let rounded = if rounded.is_finite() { rounded.max(1.0) } else { 1.0 };
        (rounded.min(u32::MAX as f64) as u32, residual)
    }

    /// Clamp a rounded duration into `limits`.
    ///
    /// Crossing a hard limit invalidates the carry, so it is dropped.
    pub fn clamp_duration(&mut self, duration_ms: u32, limits: (u32, u32)) -> (u32, bool) {
        let (low, high) = limits;
        let clamped = duration_ms.clamp(low, high);
        let hit = clamped != duration_ms;
        if hit {
            self.residual_ms = 0.0;
        }
        (clamped, hit)
    }

    pub fn residual_ms(&self) -> f64 {
        self.residual_ms
    }

    pub fn bound(&self) -> f64 {
        self.bound
    }

    pub fn reset(&mut self) {
        self.residual_ms = 0.0;
    }
}

/// Texture oscillator phase, wrapped into `[0, 2π)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TexturePhase {
    phase: f64,
}

impl TexturePhase {
    /// Advance by `delta_time_s · texture_speed_hz` cycles.
    /// Non-positive speed or time leaves the phase untouched.
    pub fn advance(&mut self, texture_speed_hz: f64, delta_time_s: f64) {
        if !(delta_time_s > 0.0 && texture_speed_hz > 0.0) {
            return;
        }
        let delta = delta_time_s * texture_speed_hz * TAU;
        self.phase = (self.phase + delta).rem_euclid(TAU);
        if self.phase >= TAU {
            self.phase = 0.0;
        }
    }

    pub fn radians(&self) -> f64 {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Texture modulation applied to a pulse. Currently always [`TextureInfo::none`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureInfo {
    pub offset_ms: f64,
    pub mode: &'static str,
    pub headroom_up_ms: f64,
    pub headroom_down_ms: f64,
}

impl TextureInfo {
    pub const fn none() -> Self {
        Self {
            offset_ms: 0.0,
            mode: "none",
            headroom_up_ms: 0.0,
            headroom_down_ms: 0.0,
        }
    }
}

/// Every intermediate quantity of one [`PulseGenerator::create_pulse`] call.
///
/// Observability only; nothing downstream makes decisions from it.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseDebug {
    pub channel: ChannelId,
    pub sequence_index: u64,
    pub raw_frequency_hz: f64,
    pub normalised_frequency: f64,
    pub mapped_frequency_hz: f64,
    pub frequency_limits: (f64, f64),
    pub base_duration_ms: f64,
    pub duration_limits: (u32, u32),
    pub jitter_fraction: f64,
    pub jitter_factor: f64,
    pub width_normalised: f64,
    pub texture: TextureInfo,
    pub texture_phase: f64,
    pub desired_duration_ms: f64,
    pub rounded_duration_ms: u32,
    pub clamped: bool,
    pub residual_ms: f64,
}

/// Builds hardware-friendly pulses for one channel.
pub struct PulseGenerator {
    channel: ChannelId,
    channel_params: ChannelParams,
    pulse_frequency: Arc<dyn Curve>,
    pulse_freq_limits: (f64, f64),
    quantizer: DurationQuantizer,
    texture: TexturePhase,
}

impl PulseGenerator {
    pub fn new(
        channel: ChannelId,
        channel_params: ChannelParams,
        pulse_frequency: Arc<dyn Curve>,
        pulse_freq_limits: (f64, f64),
        residual_bound: f64,
    ) -> Self {
        Self {
            channel,
            channel_params,
            pulse_frequency,
            pulse_freq_limits,
            quantizer: DurationQuantizer::new(residual_bound),
            texture: TexturePhase::default(),
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn advance_phase(&mut self, texture_speed_hz: f64, delta_time_s: f64) {
        self.texture.advance(texture_speed_hz, delta_time_s);
    }

    pub fn phase(&self) -> f64 {
        self.texture.radians()
    }

    pub fn residual_ms(&self) -> f64 {
        self.quantizer.residual_ms()
    }

    /// Effective `(min, max)` frequency window at `time_s`.
    pub fn frequency_window(&self, time_s: f64) -> (f64, f64) {
        channel_frequency_window(self.channel_params.window(time_s))
    }

    /// Produce one pulse for `time_s` at the given intensity.
    pub fn create_pulse(
        &mut self,
        time_s: f64,
        intensity: u8,
        sequence_index: u64,
    ) -> (Pulse, PulseDebug) {
        let (min_freq, max_freq) = self.frequency_window(time_s);
        let duration_limits = duration_limits(min_freq, max_freq);

        let raw_frequency = self.pulse_frequency.interpolate(time_s);
        let normalised = normalize(raw_frequency, self.pulse_freq_limits);
        let mut mapped_frequency = lerp(min_freq, max_freq, normalised);
        if !(mapped_frequency > 0.0) {
            mapped_frequency = 1000.0 / duration_limits.1 as f64;
        }
        let base_duration = 1000.0 / mapped_frequency;

        let jitter_fraction = self.jitter_fraction(time_s);
        let jitter_factor = 1.0 + jitter_fraction;
        let width_normalised = self.pulse_width_normalised(time_s);
        let texture = self.texture_offset(base_duration, width_normalised, min_freq, max_freq);

        let desired_ms = base_duration * jitter_factor + texture.offset_ms;
        let (rounded, _) = self.quantizer.quantize(desired_ms);
        let (duration, clamped) = self.quantizer.clamp_duration(rounded, duration_limits);
        let residual = self.quantizer.residual_ms();

        let final_duration = duration.max(MIN_PULSE_DURATION_MS);
        let final_intensity = intensity.min(MAX_PULSE_INTENSITY);
        let pulse = Pulse::new(final_duration, final_intensity);

        assert_invariant(
            RESIDUAL_BOUNDED,
            residual.abs() <= self.quantizer.bound() + RESIDUAL_EPSILON,
            "Residual carry exceeds bound",
            Some(self.channel.name()),
        );
        assert_invariant(
            PULSE_FREQUENCY_DERIVED,
            pulse.frequency_hz == crate::pulse::derived_frequency(pulse.duration_ms),
            "Pulse frequency not derived from duration",
            Some(self.channel.name()),
        );
        assert_invariant(
            PULSE_WITHIN_LIMITS,
            pulse.duration_ms >= duration_limits.0 && pulse.duration_ms <= duration_limits.1,
            "Pulse duration outside channel limits",
            Some(self.channel.name()),
        );

        let debug = PulseDebug {
            channel: self.channel,
            sequence_index,
            raw_frequency_hz: raw_frequency,
            normalised_frequency: normalised,
            mapped_frequency_hz: mapped_frequency,
            frequency_limits: (min_freq, max_freq),
            base_duration_ms: base_duration,
            duration_limits,
            jitter_fraction,
            jitter_factor,
            width_normalised,
            texture,
            texture_phase: self.texture.radians(),
            desired_duration_ms: desired_ms,
            rounded_duration_ms: rounded,
            clamped,
            residual_ms: residual,
        };
        (pulse, debug)
    }

    /// Drop the rounding carry and texture phase.
    pub fn reset(&mut self) {
        self.quantizer.reset();
        self.texture.reset();
    }

    // Jitter, pulse width and texture are disabled extension points; they
    // feed `PulseDebug` but never move the duration.

    fn jitter_fraction(&self, _time_s: f64) -> f64 {
        0.0
    }

    fn pulse_width_normalised(&self, _time_s: f64) -> f64 {
        0.0
    }

    fn texture_offset(
        &self,
        _base_duration_ms: f64,
        _width_normalised: f64,
        _min_freq: f64,
        _max_freq: f64,
    ) -> TextureInfo {
        TextureInfo::none()
    }
}

impl std::fmt::Debug for PulseGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulseGenerator")
            .field("channel", &self.channel)
            .field("channel_params", &self.channel_params)
            .field("pulse_freq_limits", &self.pulse_freq_limits)
            .field("quantizer", &self.quantizer)
            .field("texture", &self.texture)
            .finish()
    }
}

/// Clamp a configured window into the hardware range. An empty or inverted
/// result falls back to the full hardware range.
pub fn channel_frequency_window(configured: (f64, f64)) -> (f64, f64) {
    let minimum = configured.0.max(HARDWARE_MIN_FREQ_HZ);
    let maximum = configured.1.min(HARDWARE_MAX_FREQ_HZ);
    if !(minimum < maximum) {
        return (HARDWARE_MIN_FREQ_HZ, HARDWARE_MAX_FREQ_HZ);
    }
    (minimum, maximum)
}

/// Integer-ms duration limits for a frequency window. The high frequency
/// sets the short limit.
pub fn duration_limits(min_freq: f64, max_freq: f64) -> (u32, u32) {
    let shortest = (1000.0 / max_freq).round();
    let longest = (1000.0 / min_freq).round();
    let minimum = if shortest.is_finite() {
        (shortest.max(0.0) as u32).max(MIN_PULSE_DURATION_MS)
    } else {
        MIN_PULSE_DURATION_MS
    };
    let maximum = if longest.is_finite() {
        (longest.max(0.0).min(u32::MAX as f64) as u32).min(MAX_PULSE_DURATION_MS)
    } else {
        MAX_PULSE_DURATION_MS
    };
    if minimum > maximum {
        return (MIN_PULSE_DURATION_MS, MAX_PULSE_DURATION_MS);
    }
    (minimum, maximum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ConstantCurve;

    fn generator(window: (f64, f64), pulse_hz: f64) -> PulseGenerator {
        PulseGenerator::new(
            ChannelId::A,
            ChannelParams::fixed(window.0, window.1),
            Arc::new(ConstantCurve(pulse_hz)),
            (1.0, 100.0),
            0.5,
        )
    }

    #[test]
    fn window_clamps_to_hardware() {
        assert_eq!(channel_frequency_window((1.0, 500.0)), (HARDWARE_MIN_FREQ_HZ, 200.0));
        assert_eq!(channel_frequency_window((10.0, 80.0)), (10.0, 80.0));
    }

    #[test]
    fn inverted_window_falls_back_to_hardware_range() {
        assert_eq!(
            channel_frequency_window((90.0, 20.0)),
            (HARDWARE_MIN_FREQ_HZ, HARDWARE_MAX_FREQ_HZ)
        );
        assert_eq!(
            channel_frequency_window((50.0, 50.0)),
            (HARDWARE_MIN_FREQ_HZ, HARDWARE_MAX_FREQ_HZ)
        );
    }

    #[test]
    fn duration_limits_swap_with_frequency() {
        assert_eq!(duration_limits(10.0, 100.0), (10, 100));
        assert_eq!(duration_limits(HARDWARE_MIN_FREQ_HZ, HARDWARE_MAX_FREQ_HZ), (5, 240));
    }

    #[test]
    fn quantizer_carries_error() {
        let mut q = DurationQuantizer::new(0.5);
        // 1000 / 30 Hz = 33.33 ms
        let (d1, r1) = q.quantize(33.333);
        assert_eq!(d1, 33);
        assert!((r1 - 0.333).abs() < 1e-9);
        let (d2, _) = q.quantize(33.333);
        assert_eq!(d2, 34);
    }

    #[test]
    fn quantizer_clamp_drops_residual() {
        let mut q = DurationQuantizer::new(0.5);
        q.quantize(10.4);
        assert!(q.residual_ms() > 0.0);
        let (d, hit) = q.clamp_duration(10, (20, 40));
        assert_eq!((d, hit), (20, true));
        assert_eq!(q.residual_ms(), 0.0);
    }

    #[test]
    fn quantizer_respects_tighter_bound() {
        let mut q = DurationQuantizer::new(0.1);
        let (_, r) = q.quantize(10.4);
        assert_eq!(r, 0.1);
    }

    #[test]
    fn phase_wraps() {
        let mut phase = TexturePhase::default();
        phase.advance(1.0, 1.25);
        assert!((phase.radians() - TAU * 0.25).abs() < 1e-9);
        phase.advance(-1.0, 1.0);
        phase.advance(1.0, 0.0);
        assert!((phase.radians() - TAU * 0.25).abs() < 1e-9);
    }

    #[test]
    fn pulse_maps_into_channel_window() {
        // 40 Hz raw in (1, 100) normalises to ~0.394, remapped into (10, 100).
        let mut gen = generator((10.0, 100.0), 40.0);
        let (pulse, debug) = gen.create_pulse(0.0, 60, 0);
        let expected = 10.0 + 90.0 * (39.0 / 99.0);
        assert!((debug.mapped_frequency_hz - expected).abs() < 1e-9);
        assert_eq!(pulse.intensity, 60);
        assert!(pulse.is_valid());
        assert_eq!(debug.texture, TextureInfo::none());
        assert_eq!(debug.jitter_factor, 1.0);
    }

    #[test]
    fn low_frequency_clamps_to_longest_duration() {
        let mut gen = generator((HARDWARE_MIN_FREQ_HZ, HARDWARE_MAX_FREQ_HZ), 1.0);
        let (pulse, debug) = gen.create_pulse(0.0, 10, 0);
        assert_eq!(pulse.duration_ms, 240);
        assert_eq!(pulse.frequency_hz, 4);
        assert!(!debug.clamped || gen.residual_ms() == 0.0);
    }

    #[test]
    fn intensity_is_capped_at_hundred() {
        let mut gen = generator((10.0, 100.0), 50.0);
        let (pulse, _) = gen.create_pulse(0.0, 200, 0);
        assert_eq!(pulse.intensity, 100);
    }
}
