//! Offline preview: render an emitted packet stream as a stereo WAV.
//!
//! Channel A goes left, channel B right. Every pulse becomes a rectangular
//! burst at its intensity for the first half of its duration, then silence.
//! Each packet starts at its tick time, overwriting whatever the previous
//! packet still had pending.

use crate::egress::TimedPacket;
use crate::error::RenderError;
use crate::pulse::Pulse;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Fraction of a pulse's duration spent "on".
const DUTY_CYCLE: f64 = 0.5;

/// Render packets into interleaved stereo frames at `sample_rate`.
///
/// Time zero is the first packet's tick time.
pub fn render_packets(packets: &[TimedPacket], sample_rate: u32) -> Result<Vec<[f32; 2]>, RenderError> {
    if sample_rate == 0 {
        return Err(RenderError::InvalidSampleRate);
    }
    let Some(first) = packets.first() else {
        return Ok(Vec::new());
    };
    let origin = first.time_s;
    let rate = sample_rate as f64;

    let end_s = packets
        .iter()
        .map(|p| {
            let longest = p.packet.duration_a_ms().max(p.packet.duration_b_ms());
            (p.time_s - origin) + longest as f64 / 1000.0
        })
        .fold(0.0, f64::max);
    let mut frames = vec![[0.0f32; 2]; (end_s * rate).ceil() as usize];

    for timed in packets {
        let start = ((timed.time_s - origin).max(0.0) * rate).round() as usize;
        write_channel(&mut frames, 0, start, &timed.packet.channel_a, rate);
        write_channel(&mut frames, 1, start, &timed.packet.channel_b, rate);
    }
    Ok(frames)
}

fn write_channel(frames: &mut [[f32; 2]], lane: usize, start: usize, pulses: &[Pulse], rate: f64) {
    let mut cursor = start;
    for pulse in pulses {
        let len = (pulse.duration_ms as f64 / 1000.0 * rate).round() as usize;
        let on = (len as f64 * DUTY_CYCLE).round() as usize;
        let level = pulse.intensity as f32 / 100.0;
        for (i, frame) in frames.iter_mut().skip(cursor).take(len).enumerate() {
            frame[lane] = if i < on { level } else { 0.0 };
        }
        cursor += len;
    }
}

/// Write frames as a 16-bit stereo WAV.
pub fn write_wav(path: impl AsRef<Path>, frames: &[[f32; 2]], sample_rate: u32) -> Result<(), RenderError> {
    if sample_rate == 0 {
        return Err(RenderError::InvalidSampleRate);
    }
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for frame in frames {
        for &s in frame {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(v)?;
        }
    }
    writer.finalize()?;
    Ok(())
}
