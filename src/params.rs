//! Read-only collaborators the pulse pipeline samples every tick.
//!
//! Curve evaluation, position transforms and calibration live outside this
//! crate; the pipeline only needs these narrow accessors. All of them are
//! synchronous and expected to return immediately.

use std::sync::Arc;

/// A time-indexed parameter (carrier frequency, pulse frequency, volume...).
pub trait Curve: Send + Sync {
    /// Value of the parameter at `time_s`.
    fn interpolate(&self, time_s: f64) -> f64;
}

/// Position in the two-dimensional intensity space, both axes in `[-1, 1]`.
pub trait PositionSource: Send + Sync {
    /// `(alpha, beta)` at `time_s`.
    fn position(&self, time_s: f64) -> (f64, f64);
}

/// Latest calibration value, in decibels.
pub trait CalibrationSource: Send + Sync {
    fn last_value(&self) -> f64;
}

/// Volume scalar in `[0, 1]` at a given time.
pub trait VolumeSource: Send + Sync {
    fn volume_at(&self, time_s: f64) -> f64;
}

/// Any curve can drive the volume.
impl<C: Curve + ?Sized> VolumeSource for C {
    fn volume_at(&self, time_s: f64) -> f64 {
        self.interpolate(time_s)
    }
}

/// A parameter that never changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantCurve(pub f64);

impl Curve for ConstantCurve {
    fn interpolate(&self, _time_s: f64) -> f64 {
        self.0
    }
}

/// Piecewise-linear curve through `(time_s, value)` keyframes.
///
/// Values are held flat before the first and after the last keyframe.
/// An empty curve evaluates to 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyframeCurve {
    points: Vec<(f64, f64)>,
}

impl KeyframeCurve {
    /// Build from keyframes in any order; non-finite points are dropped.
    pub fn new(mut points: Vec<(f64, f64)>) -> Self {
        points.retain(|(t, v)| t.is_finite() && v.is_finite());
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }
}

impl Curve for KeyframeCurve {
    fn interpolate(&self, time_s: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 0.0,
        };
        if time_s.is_nan() || time_s <= first.0 {
            return first.1;
        }
        if time_s >= last.0 {
            return last.1;
        }
        // First keyframe strictly after `time_s`; `time_s` is inside the
        // keyframe span here, so this is never 0.
        let idx = self.points.partition_point(|(t, _)| *t <= time_s);
        let (t0, v0) = self.points[idx - 1];
        let (t1, v1) = self.points[idx];
        let span = t1 - t0;
        if span <= 0.0 {
            return v1;
        }
        v0 + (v1 - v0) * (time_s - t0) / span
    }
}

/// A fixed position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPosition {
    pub alpha: f64,
    pub beta: f64,
}

impl ConstantPosition {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }
}

impl PositionSource for ConstantPosition {
    fn position(&self, _time_s: f64) -> (f64, f64) {
        (self.alpha, self.beta)
    }
}

/// Position driven by one curve per axis.
#[derive(Clone)]
pub struct CurvePosition {
    pub alpha: Arc<dyn Curve>,
    pub beta: Arc<dyn Curve>,
}

impl PositionSource for CurvePosition {
    fn position(&self, time_s: f64) -> (f64, f64) {
        (
            self.alpha.interpolate(time_s).clamp(-1.0, 1.0),
            self.beta.interpolate(time_s).clamp(-1.0, 1.0),
        )
    }
}

/// A calibration value that never changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantCalibration(pub f64);

impl CalibrationSource for ConstantCalibration {
    fn last_value(&self) -> f64 {
        self.0
    }
}

/// Live frequency window settings of one channel.
#[derive(Clone)]
pub struct ChannelParams {
    pub minimum_frequency: Arc<dyn Curve>,
    pub maximum_frequency: Arc<dyn Curve>,
}

impl ChannelParams {
    /// Fixed `[min_hz, max_hz]` window.
    pub fn fixed(min_hz: f64, max_hz: f64) -> Self {
        Self {
            minimum_frequency: Arc::new(ConstantCurve(min_hz)),
            maximum_frequency: Arc::new(ConstantCurve(max_hz)),
        }
    }

    /// `(min, max)` settings at `time_s`, unclamped.
    pub fn window(&self, time_s: f64) -> (f64, f64) {
        (
            self.minimum_frequency.interpolate(time_s),
            self.maximum_frequency.interpolate(time_s),
        )
    }
}

impl std::fmt::Debug for ChannelParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (min, max) = self.window(0.0);
        f.debug_struct("ChannelParams")
            .field("minimum_frequency", &min)
            .field("maximum_frequency", &max)
            .finish()
    }
}

/// Configured ranges the raw parameter curves are normalised against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamLimits {
    /// Carrier frequency range, Hz.
    pub carrier_hz: (f64, f64),
    /// Global pulse frequency range, Hz.
    pub pulse_frequency_hz: (f64, f64),
}

impl Default for ParamLimits {
    fn default() -> Self {
        Self {
            carrier_hz: (500.0, 1000.0),
            pulse_frequency_hz: (1.0, 100.0),
        }
    }
}

/// Everything the algorithm samples while ticking.
#[derive(Clone)]
pub struct CoyoteParams {
    pub carrier_frequency: Arc<dyn Curve>,
    pub pulse_frequency: Arc<dyn Curve>,
    pub volume: Arc<dyn VolumeSource>,
    pub position: Arc<dyn PositionSource>,
    pub calibrate_center: Arc<dyn CalibrationSource>,
    pub channel_a: ChannelParams,
    pub channel_b: ChannelParams,
}

impl CoyoteParams {
    /// Constant parameters, handy for tests and previews.
    pub fn constant(
        carrier_hz: f64,
        pulse_frequency_hz: f64,
        volume: f64,
        position: (f64, f64),
        center_db: f64,
    ) -> Self {
        Self {
            carrier_frequency: Arc::new(ConstantCurve(carrier_hz)),
            pulse_frequency: Arc::new(ConstantCurve(pulse_frequency_hz)),
            volume: Arc::new(ConstantCurve(volume)),
            position: Arc::new(ConstantPosition::new(position.0, position.1)),
            calibrate_center: Arc::new(ConstantCalibration(center_db)),
            channel_a: ChannelParams::fixed(1.0, 100.0),
            channel_b: ChannelParams::fixed(1.0, 100.0),
        }
    }

    pub fn with_channel_windows(mut self, a: (f64, f64), b: (f64, f64)) -> Self {
        self.channel_a = ChannelParams::fixed(a.0, a.1);
        self.channel_b = ChannelParams::fixed(b.0, b.1);
        self
    }
}
