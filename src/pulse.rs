//! Pulse and packet types handed to the transport layer.

use crate::constants::{
    MAX_PULSE_DURATION_MS, MAX_PULSE_INTENSITY, MIN_PULSE_DURATION_MS, PULSES_PER_PACKET,
};

/// One square pulse as the device understands it.
///
/// `frequency_hz` is always derived from `duration_ms`; construct through
/// [`Pulse::new`] to keep the two in step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    /// Pulse duration in whole milliseconds.
    pub duration_ms: u32,
    /// Pulse intensity, 0..=100 percent.
    pub intensity: u8,
    /// `round(1000 / duration_ms)`, at least 1.
    pub frequency_hz: u32,
}

impl Pulse {
    /// Build a pulse, deriving its frequency from the duration.
    pub fn new(duration_ms: u32, intensity: u8) -> Self {
        let duration_ms = duration_ms.max(1);
        Self {
            duration_ms,
            intensity: intensity.min(MAX_PULSE_INTENSITY),
            frequency_hz: derived_frequency(duration_ms),
        }
    }

    /// Silent pulse of the given duration.
    pub fn silent(duration_ms: u32) -> Self {
        Self::new(duration_ms, 0)
    }

    /// Same timing, zero intensity.
    pub fn silenced(self) -> Self {
        Self { intensity: 0, ..self }
    }

    /// Whether the device would accept this pulse.
    pub fn is_valid(&self) -> bool {
        (MIN_PULSE_DURATION_MS..=MAX_PULSE_DURATION_MS).contains(&self.duration_ms)
            && self.intensity <= MAX_PULSE_INTENSITY
            && self.frequency_hz == derived_frequency(self.duration_ms)
    }
}

/// `round(1000 / duration_ms)`, never below 1 Hz.
pub fn derived_frequency(duration_ms: u32) -> u32 {
    let hz = (1000.0 / duration_ms.max(1) as f64).round() as u32;
    hz.max(1)
}

/// Total duration of a run of pulses, in ms.
pub fn total_duration_ms(pulses: &[Pulse]) -> u32 {
    pulses.iter().map(|p| p.duration_ms).sum()
}

/// A full two-channel packet: four pulses for A and four for B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoyotePacket {
    pub channel_a: [Pulse; PULSES_PER_PACKET],
    pub channel_b: [Pulse; PULSES_PER_PACKET],
}

impl CoyotePacket {
    pub fn duration_a_ms(&self) -> u32 {
        total_duration_ms(&self.channel_a)
    }

    pub fn duration_b_ms(&self) -> u32 {
        total_duration_ms(&self.channel_b)
    }

    /// The device drops a channel's whole group on any malformed pulse,
    /// so a packet is only sendable when all eight pulses are valid.
    pub fn is_valid(&self) -> bool {
        self.channel_a.iter().chain(self.channel_b.iter()).all(Pulse::is_valid)
    }
}
