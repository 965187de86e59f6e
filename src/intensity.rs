//! Positional intensity: maps a point in the 2-D position space plus a
//! volume into one intensity per channel.
//!
//! Two strategies ship. [`PositionalIntensity::ThreePhasePowerLaw`] simulates
//! the three-phase crossfade along alpha with a power-law curve whose
//! steepness comes from the center calibration. [`PositionalIntensity::TwoChannelBarycentric`]
//! splits the position into left/right/neutral weights and scales them with
//! a [`CalibrationScale`].

use crate::constants::MAX_PULSE_INTENSITY;
use serde::{Deserialize, Serialize};

/// Center calibration limits accepted by the power-law mapping, dB.
pub const CENTER_DB_RANGE: (f64, f64) = (-10.0, -0.1);

/// Turns a calibration value and a position into an intensity factor.
pub trait CalibrationScale: Send + Sync {
    fn scale(&self, center_db: f64, alpha: f64, beta: f64) -> f64;
}

/// Three-phase center calibration.
///
/// Unity on the rim of the position disc, `center_db` of attenuation at the
/// center, interpolated in dB along the radius.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CenterCalibration;

impl CalibrationScale for CenterCalibration {
    fn scale(&self, center_db: f64, alpha: f64, beta: f64) -> f64 {
        let r = (alpha * alpha + beta * beta).sqrt().min(1.0);
        if !center_db.is_finite() || r.is_nan() {
            return 1.0;
        }
        10f64.powf(center_db * (1.0 - r) / 20.0)
    }
}

/// The selectable intensity strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionalIntensity {
    /// Simulated three-phase output via power-law crossfade along alpha.
    ThreePhasePowerLaw,
    /// Barycentric left/right/neutral weighting.
    TwoChannelBarycentric,
}

impl PositionalIntensity {
    /// Intensity for channels A and B, each in `0..=100`.
    pub fn compute(
        &self,
        position: (f64, f64),
        volume: f64,
        center_db: f64,
        calibration: &dyn CalibrationScale,
    ) -> (u8, u8) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        match self {
            PositionalIntensity::ThreePhasePowerLaw => {
                let (gain_a, gain_b) = power_law_gains(position.0, center_db);
                (to_intensity(gain_a * volume), to_intensity(gain_b * volume))
            }
            PositionalIntensity::TwoChannelBarycentric => {
                let (alpha, beta) = position;
                let weights = BarycentricWeights::from_position(alpha, beta);
                let scale = calibration.scale(center_db, alpha, beta);
                (
                    to_intensity((weights.left + weights.neutral) * volume * scale),
                    to_intensity((weights.right + weights.neutral) * volume * scale),
                )
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PositionalIntensity::ThreePhasePowerLaw => "three-phase",
            PositionalIntensity::TwoChannelBarycentric => "two-channel",
        }
    }
}

/// Power-law exponent for a center calibration value.
///
/// `-3 dB` gives an exponent of ~1 (linear crossfade); more negative values
/// sharpen the crossfade.
pub fn power_law_exponent(center_db: f64) -> f64 {
    let center = if center_db.is_nan() { CENTER_DB_RANGE.1 } else { center_db };
    let center = center.clamp(CENTER_DB_RANGE.0, CENTER_DB_RANGE.1);
    10f64.powf(center / 10.0).ln() / 0.5f64.ln()
}

/// Unscaled `(a, b)` gains of the power-law crossfade for a given alpha.
pub fn power_law_gains(alpha: f64, center_db: f64) -> (f64, f64) {
    let p = ((alpha + 1.0) / 2.0).clamp(0.0, 1.0);
    let exponent = power_law_exponent(center_db);
    (p.powf(exponent), (1.0 - p).powf(exponent))
}

/// Normalised left/right/neutral weights of a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarycentricWeights {
    pub left: f64,
    pub right: f64,
    pub neutral: f64,
}

impl BarycentricWeights {
    /// Weights summing to 1, or all zero when nothing carries weight.
    pub fn from_position(alpha: f64, beta: f64) -> Self {
        let left = ((beta + 1.0) / 2.0).max(0.0);
        let right = ((1.0 - beta) / 2.0).max(0.0);
        let neutral = alpha.max(0.0);
        let total = left + right + neutral;
        if total > 0.0 && total.is_finite() {
            Self {
                left: left / total,
                right: right / total,
                neutral: neutral / total,
            }
        } else {
            Self { left: 0.0, right: 0.0, neutral: 0.0 }
        }
    }

    pub fn sum(&self) -> f64 {
        self.left + self.right + self.neutral
    }
}

fn to_intensity(gain: f64) -> u8 {
    if gain.is_nan() {
        return 0;
    }
    (gain * 100.0).round().clamp(0.0, MAX_PULSE_INTENSITY as f64) as u8
}
