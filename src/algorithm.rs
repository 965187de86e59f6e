//! Coyote algorithm: the per-tick orchestrator.
//!
//! An external real-time driver calls [`CoyoteAlgorithm::generate_packet`]
//! with the current time. The first call only starts the clocks. Every later
//! call lets the elapsed time pass on both channels, advances the texture
//! phase, and emits a two-channel packet whenever a channel's queue runs low
//! or the device is about to run out of the last packet.
//!
//! The driver is told when to call again through
//! [`CoyoteAlgorithm::get_next_update_time`]; the cadence is a fixed
//! `update_interval_s` (100 ms by default) after each call.
//!
//! Calls must be serialised by the caller: one timing thread, or a lock
//! around the instance.

use crate::channel::{ChannelController, ChannelId, ChannelState};
use crate::common::{lerp, normalize, split_seconds};
use crate::constants::PULSES_PER_PACKET;
use crate::error::BuildError;
use crate::generator::PulseGenerator;
use crate::intensity::{CalibrationScale, CenterCalibration, PositionalIntensity};
use crate::invariant_ppt::{
    assert_invariant, CADENCE_SCHEDULED, FIRST_TICK_IDLE, PACKET_COMPLETE, PACKET_VALID,
};
use crate::params::{CoyoteParams, ParamLimits};
use crate::pulse::{total_duration_ms, CoyotePacket, Pulse};
use crate::tuning::PulseTuning;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::Level;

/// Generator, queue and packet clock of one channel, owned together.
#[derive(Debug)]
pub struct ChannelPipeline {
    pub id: ChannelId,
    pub generator: PulseGenerator,
    pub controller: ChannelController,
    pub state: ChannelState,
}

/// Snapshot of the last emitted packet, for observers.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketReport {
    pub time_s: f64,
    /// Time since the first tick.
    pub session_time_s: f64,
    pub alpha: f64,
    pub beta: f64,
    pub volume: f64,
    pub duration_a_ms: u32,
    pub duration_b_ms: u32,
    pub next_update_s: f64,
    pub packet_margin: f64,
    pub texture_speed_hz: f64,
}

/// Builder for [`CoyoteAlgorithm`].
///
/// Selecting an intensity strategy is mandatory; building without one is
/// rejected before any tick can run.
#[derive(Default)]
pub struct CoyoteAlgorithmBuilder {
    params: Option<CoyoteParams>,
    limits: Option<ParamLimits>,
    tuning: Option<PulseTuning>,
    strategy: Option<PositionalIntensity>,
    calibration: Option<Arc<dyn CalibrationScale>>,
}

impl CoyoteAlgorithmBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(mut self, params: CoyoteParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn limits(mut self, limits: ParamLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn tuning(mut self, tuning: PulseTuning) -> Self {
        self.tuning = Some(tuning);
        self
    }

    pub fn strategy(mut self, strategy: PositionalIntensity) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Override the center calibration scale used by the barycentric mode.
    pub fn calibration(mut self, calibration: Arc<dyn CalibrationScale>) -> Self {
        self.calibration = Some(calibration);
        self
    }

    pub fn build(self) -> Result<CoyoteAlgorithm, BuildError> {
        let strategy = self.strategy.ok_or(BuildError::MissingStrategy)?;
        let params = self.params.ok_or(BuildError::MissingParameter("params"))?;
        let tuning = self.tuning.unwrap_or_default();
        tuning.validate()?;
        let limits = self.limits.unwrap_or_default();
        let calibration = self
            .calibration
            .unwrap_or_else(|| Arc::new(CenterCalibration));

        let channels = ChannelId::ALL.map(|id| {
            let channel_params = id.select((params.channel_a.clone(), params.channel_b.clone()));
            ChannelPipeline {
                id,
                generator: PulseGenerator::new(
                    id,
                    channel_params,
                    Arc::clone(&params.pulse_frequency),
                    limits.pulse_frequency_hz,
                    tuning.residual_bound,
                ),
                controller: ChannelController::new(id, tuning.queue_horizon_ms),
                state: ChannelState::new(tuning.packet_margin),
            }
        });

        Ok(CoyoteAlgorithm {
            params,
            limits,
            tuning,
            strategy,
            calibration,
            channels,
            last_update_time: None,
            next_update_time: 0.0,
            start_time: None,
            texture_speed_hz: 0.0,
            last_report: None,
        })
    }
}

/// Turns the continuous stimulation signal into Coyote B0 packets.
pub struct CoyoteAlgorithm {
    params: CoyoteParams,
    limits: ParamLimits,
    tuning: PulseTuning,
    strategy: PositionalIntensity,
    calibration: Arc<dyn CalibrationScale>,
    channels: [ChannelPipeline; 2],
    last_update_time: Option<f64>,
    next_update_time: f64,
    start_time: Option<f64>,
    texture_speed_hz: f64,
    last_report: Option<PacketReport>,
}

impl CoyoteAlgorithm {
    pub fn builder() -> CoyoteAlgorithmBuilder {
        CoyoteAlgorithmBuilder::new()
    }

    /// Run one tick. Returns a packet when the device needs one.
    pub fn generate_packet(&mut self, current_time: f64) -> Option<CoyotePacket> {
        let last = match self.last_update_time {
            Some(last) => last,
            None => {
                self.last_update_time = Some(current_time);
                self.start_time = Some(current_time);
                self.schedule_next(current_time);
                assert_invariant(
                    FIRST_TICK_IDLE,
                    self.channels.iter().all(|c| c.controller.is_empty()),
                    "First tick produced pulses",
                    None,
                );
                return None;
            }
        };

        let delta_ms = ((current_time - last) * 1000.0).max(0.0);
        self.last_update_time = Some(current_time);
        self.advance_state(current_time, delta_ms);

        if !self.needs_packet() {
            self.schedule_next(current_time);
            return None;
        }

        let params = &self.params;
        let strategy = self.strategy;
        let calibration: &dyn CalibrationScale = &*self.calibration;
        for channel in self.channels.iter_mut() {
            let id = channel.id;
            channel
                .controller
                .fill_queue(current_time, &mut channel.generator, |t| {
                    id.select(positional_intensity(params, strategy, calibration, t))
                });
        }

        let [pipeline_a, pipeline_b] = &mut self.channels;
        let packet = CoyotePacket {
            channel_a: dispatch(pipeline_a, current_time),
            channel_b: dispatch(pipeline_b, current_time),
        };

        assert_invariant(PACKET_VALID, packet.is_valid(), "Packet holds a malformed pulse", None);

        self.schedule_next(current_time);
        self.record_report(current_time, &packet);
        Some(packet)
    }

    /// When the driver should call [`generate_packet`](Self::generate_packet) next.
    pub fn get_next_update_time(&self) -> f64 {
        self.next_update_time
    }

    /// Channel intensities for `time_s` at the given volume.
    pub fn positional_intensity(&self, time_s: f64, volume: f64) -> (u8, u8) {
        let position = self.params.position.position(time_s);
        let center_db = self.params.calibrate_center.last_value();
        self.strategy
            .compute(position, volume, center_db, self.calibration.as_ref())
    }

    pub fn strategy(&self) -> PositionalIntensity {
        self.strategy
    }

    pub fn tuning(&self) -> &PulseTuning {
        &self.tuning
    }

    pub fn limits(&self) -> &ParamLimits {
        &self.limits
    }

    pub fn channel(&self, id: ChannelId) -> &ChannelPipeline {
        id.select((&self.channels[0], &self.channels[1]))
    }

    /// Texture speed derived on the last tick that moved time forward.
    pub fn texture_speed_hz(&self) -> f64 {
        self.texture_speed_hz
    }

    pub fn last_report(&self) -> Option<&PacketReport> {
        self.last_report.as_ref()
    }

    /// Back to idle: the next call starts a new session.
    pub fn reset(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.generator.reset();
            channel.controller.clear();
            channel.state.reset();
        }
        self.last_update_time = None;
        self.next_update_time = 0.0;
        self.start_time = None;
        self.texture_speed_hz = 0.0;
        self.last_report = None;
    }

    fn needs_packet(&self) -> bool {
        let queue_low = self
            .channels
            .iter()
            .any(|c| !c.controller.has_pulses(PULSES_PER_PACKET));
        let ready = self.channels.iter().any(|c| c.state.ready());
        queue_low || ready
    }

    fn advance_state(&mut self, current_time: f64, delta_ms: f64) {
        for channel in self.channels.iter_mut() {
            channel.state.advance(delta_ms);
        }

        let delta_s = delta_ms / 1000.0;
        if !(delta_s > 0.0) {
            return;
        }

        let carrier_hz = self.params.carrier_frequency.interpolate(current_time);
        let carrier_norm = normalize(carrier_hz, self.limits.carrier_hz);
        let texture_speed = lerp(
            self.tuning.texture_min_hz,
            self.tuning.texture_max_hz,
            carrier_norm,
        );
        self.texture_speed_hz = texture_speed;

        for channel in self.channels.iter_mut() {
            channel.generator.advance_phase(texture_speed, delta_s);
        }
    }

    fn schedule_next(&mut self, current_time: f64) {
        self.next_update_time = current_time + self.tuning.update_interval_s;
        assert_invariant(
            CADENCE_SCHEDULED,
            !(self.next_update_time < current_time),
            "Next update scheduled in the past",
            None,
        );
    }

    fn record_report(&mut self, current_time: f64, packet: &CoyotePacket) {
        let (alpha, beta) = self.params.position.position(current_time);
        let volume = self.params.volume.volume_at(current_time);
        let report = PacketReport {
            time_s: current_time,
            session_time_s: current_time - self.start_time.unwrap_or(current_time),
            alpha,
            beta,
            volume,
            duration_a_ms: packet.duration_a_ms(),
            duration_b_ms: packet.duration_b_ms(),
            next_update_s: self.next_update_time,
            packet_margin: self.tuning.packet_margin,
            texture_speed_hz: self.texture_speed_hz,
        };
        if tracing::enabled!(target: "coyote", Level::DEBUG) {
            log_packet(&report, packet);
        }
        self.last_report = Some(report);
    }
}

impl std::fmt::Debug for CoyoteAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoyoteAlgorithm")
            .field("strategy", &self.strategy)
            .field("tuning", &self.tuning)
            .field("limits", &self.limits)
            .field("channels", &self.channels)
            .field("last_update_time", &self.last_update_time)
            .field("next_update_time", &self.next_update_time)
            .finish()
    }
}

/// Dequeue the next packet of a channel and start its device clock.
fn dispatch(channel: &mut ChannelPipeline, current_time: f64) -> [Pulse; PULSES_PER_PACKET] {
    assert_invariant(
        PACKET_COMPLETE,
        channel.controller.has_pulses(PULSES_PER_PACKET),
        "Packet would need padding after a refill",
        Some(channel.id.name()),
    );
    let pulses = channel.controller.next_packet();
    channel.state.load_packet(current_time, &pulses);
    pulses
}

fn positional_intensity(
    params: &CoyoteParams,
    strategy: PositionalIntensity,
    calibration: &dyn CalibrationScale,
    time_s: f64,
) -> (u8, u8) {
    let volume = params.volume.volume_at(time_s);
    let position = params.position.position(time_s);
    let center_db = params.calibrate_center.last_value();
    strategy.compute(position, volume, center_db, calibration)
}

fn log_packet(report: &PacketReport, packet: &CoyotePacket) {
    let (h, m, s, ms) = split_seconds(report.session_time_s);
    let next_ms = ((report.next_update_s - report.time_s) * 1000.0).max(0.0);
    let rule = "=".repeat(72);

    let mut text = String::with_capacity(1024);
    let _ = writeln!(text, "{rule}");
    let _ = writeln!(text, "Packet Generated @ {h:02}:{m:02}:{s:02}.{ms:03}");
    let _ = writeln!(text, "{rule}");
    let _ = writeln!(
        text,
        "Position: alpha={:+.2}, beta={:+.2}, volume={:.0}%",
        report.alpha,
        report.beta,
        report.volume * 100.0
    );
    for (name, pulses) in [("A", &packet.channel_a), ("B", &packet.channel_b)] {
        let _ = writeln!(text);
        let _ = writeln!(text, "Channel {name}: duration={} ms", total_duration_ms(pulses));
        write_pulses(&mut text, pulses);
    }
    let _ = writeln!(text);
    let _ = writeln!(
        text,
        "Next update: {next_ms:.0} ms (packet_dur_a={} ms, packet_dur_b={} ms, margin={:.0}%)",
        report.duration_a_ms,
        report.duration_b_ms,
        report.packet_margin * 100.0
    );
    let _ = write!(text, "{rule}");

    tracing::debug!(
        target: "coyote",
        session_time_s = report.session_time_s,
        alpha = report.alpha,
        beta = report.beta,
        volume = report.volume,
        duration_a_ms = report.duration_a_ms,
        duration_b_ms = report.duration_b_ms,
        next_ms,
        "\n{text}"
    );
}

fn write_pulses(text: &mut String, pulses: &[Pulse]) {
    for (idx, pulse) in pulses.iter().enumerate() {
        let _ = writeln!(
            text,
            "  Pulse {}: {} ms @ {} Hz ({}%)",
            idx + 1,
            pulse.duration_ms,
            pulse.frequency_hz,
            pulse.intensity
        );
    }
}
