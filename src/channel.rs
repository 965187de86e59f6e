//! Channel pipeline pieces: the pulse queue and the on-device packet clock.

use crate::constants::{MAX_PULSE_DURATION_MS, PULSES_PER_PACKET};
use crate::generator::{PulseDebug, PulseGenerator};
use crate::pulse::{total_duration_ms, Pulse};
use std::collections::VecDeque;
use std::fmt;

/// Pulses kept queued by a refill: the packet about to go out plus the next.
const MIN_QUEUED_PULSES: usize = 2 * PULSES_PER_PACKET;

/// One of the two output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelId {
    A,
    B,
}

impl ChannelId {
    pub const ALL: [ChannelId; 2] = [ChannelId::A, ChannelId::B];

    pub fn name(&self) -> &'static str {
        match self {
            ChannelId::A => "A",
            ChannelId::B => "B",
        }
    }

    /// Pick this channel's half of an `(a, b)` pair.
    pub fn select<T>(&self, pair: (T, T)) -> T {
        match self {
            ChannelId::A => pair.0,
            ChannelId::B => pair.1,
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tracks how much of the last dispatched packet the device still has to play.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelState {
    remaining_ms: f64,
    last_packet_ms: f64,
    last_packet_time_s: Option<f64>,
    margin: f64,
    packets_loaded: u64,
}

impl ChannelState {
    /// `margin` is the fraction of the last packet left pending when the
    /// channel asks for the next one.
    pub fn new(margin: f64) -> Self {
        Self {
            remaining_ms: 0.0,
            last_packet_ms: 0.0,
            last_packet_time_s: None,
            margin: margin.clamp(0.0, 1.0),
            packets_loaded: 0,
        }
    }

    /// Let `delta_ms` of playback pass. Never goes below zero.
    pub fn advance(&mut self, delta_ms: f64) {
        if !(delta_ms > 0.0) {
            return;
        }
        self.remaining_ms = (self.remaining_ms - delta_ms).max(0.0);
    }

    /// Whether the device needs fresh data now.
    pub fn ready(&self) -> bool {
        if self.last_packet_time_s.is_none() {
            return true;
        }
        self.remaining_ms <= self.last_packet_ms * self.margin
    }

    /// Record a dispatched packet; its pulses are now playing.
    pub fn load_packet(&mut self, time_s: f64, pulses: &[Pulse]) {
        let duration = total_duration_ms(pulses) as f64;
        self.remaining_ms = duration;
        self.last_packet_ms = duration;
        self.last_packet_time_s = Some(time_s);
        self.packets_loaded += 1;
    }

    pub fn remaining_ms(&self) -> f64 {
        self.remaining_ms
    }

    pub fn last_packet_ms(&self) -> f64 {
        self.last_packet_ms
    }

    pub fn last_packet_time_s(&self) -> Option<f64> {
        self.last_packet_time_s
    }

    pub fn packets_loaded(&self) -> u64 {
        self.packets_loaded
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.margin);
    }
}

/// Queue of generated-but-unsent pulses for one channel.
#[derive(Debug, Clone)]
pub struct ChannelController {
    channel: ChannelId,
    queue: VecDeque<Pulse>,
    horizon_ms: f64,
    sequence: u64,
    last_debug: Option<PulseDebug>,
}

impl ChannelController {
    pub fn new(channel: ChannelId, horizon_ms: f64) -> Self {
        Self {
            channel,
            queue: VecDeque::with_capacity(64),
            horizon_ms,
            sequence: 0,
            last_debug: None,
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// At least `n` pulses are queued.
    pub fn has_pulses(&self, n: usize) -> bool {
        self.queue.len() >= n
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Buffered pulse time.
    pub fn queued_ms(&self) -> f64 {
        self.queue.iter().map(|p| p.duration_ms as f64).sum()
    }

    /// Generate pulses until the horizon is covered and two packets' worth
    /// are queued, so a full packet remains after the next dispatch. Each pulse is stamped with the time it will start playing,
    /// and `intensity` is sampled at that time.
    ///
    /// Returns how many pulses were added.
    pub fn fill_queue<F>(&mut self, time_s: f64, generator: &mut PulseGenerator, mut intensity: F) -> usize
    where
        F: FnMut(f64) -> u8,
    {
        let mut queued_ms = self.queued_ms();
        let mut added = 0;
        while queued_ms < self.horizon_ms || self.queue.len() < MIN_QUEUED_PULSES {
            let pulse_time = time_s + queued_ms / 1000.0;
            let level = intensity(pulse_time);
            let (pulse, diag) = generator.create_pulse(pulse_time, level, self.sequence);
            tracing::trace!(
                target: "coyote",
                channel = self.channel.name(),
                seq = diag.sequence_index,
                time_s = pulse_time,
                raw_hz = diag.raw_frequency_hz,
                mapped_hz = diag.mapped_frequency_hz,
                desired_ms = diag.desired_duration_ms,
                duration_ms = pulse.duration_ms,
                residual_ms = diag.residual_ms,
                clamped = diag.clamped,
                intensity = pulse.intensity,
                "pulse queued"
            );
            self.sequence += 1;
            queued_ms += pulse.duration_ms as f64;
            self.queue.push_back(pulse);
            self.last_debug = Some(diag);
            added += 1;
        }
        added
    }

    /// Dequeue one packet's worth of pulses.
    ///
    /// Missing slots repeat the last real pulse silently, or a silent
    /// longest pulse when nothing was queued.
    pub fn next_packet(&mut self) -> [Pulse; PULSES_PER_PACKET] {
        let mut packet = [Pulse::silent(MAX_PULSE_DURATION_MS); PULSES_PER_PACKET];
        let mut filler = None;
        for slot in packet.iter_mut() {
            match self.queue.pop_front() {
                Some(pulse) => {
                    *slot = pulse;
                    filler = Some(pulse.silenced());
                }
                None => {
                    if let Some(pad) = filler {
                        *slot = pad;
                    }
                }
            }
        }
        packet
    }

    /// Most recent generator diagnostics for this channel.
    pub fn last_debug(&self) -> Option<&PulseDebug> {
        self.last_debug.as_ref()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.sequence = 0;
        self.last_debug = None;
    }
}
