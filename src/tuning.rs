//! Pulse tuning: the immutable knob bundle of one algorithm instance.

use crate::constants::{QUEUE_HORIZON_MS, UPDATE_INTERVAL_S};
use crate::error::TuningError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Round-to-nearest never carries more than half a millisecond; larger
/// configured bounds are capped to this.
pub const MAX_RESIDUAL_BOUND: f64 = 0.5;

/// Tuning parameters, loaded once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseTuning {
    /// Texture oscillator speed at the bottom of the carrier range.
    #[serde(default = "PulseTuning::default_texture_min_hz")]
    pub texture_min_hz: f64,
    /// Texture oscillator speed at the top of the carrier range.
    #[serde(default = "PulseTuning::default_texture_max_hz")]
    pub texture_max_hz: f64,
    /// Largest rounding carry (ms) the duration quantizer may hold.
    #[serde(default = "PulseTuning::default_residual_bound")]
    pub residual_bound: f64,
    /// Fraction of the last packet still pending at which a channel asks
    /// for the next one.
    #[serde(default = "PulseTuning::default_packet_margin")]
    pub packet_margin: f64,
    /// Buffered pulse time each channel keeps queued.
    #[serde(default = "PulseTuning::default_queue_horizon_ms")]
    pub queue_horizon_ms: f64,
    /// Delay between two driver calls, in seconds.
    #[serde(default = "PulseTuning::default_update_interval_s")]
    pub update_interval_s: f64,
}

impl PulseTuning {
    fn default_texture_min_hz() -> f64 {
        0.5
    }
    fn default_texture_max_hz() -> f64 {
        4.0
    }
    fn default_residual_bound() -> f64 {
        0.5
    }
    fn default_packet_margin() -> f64 {
        0.05
    }
    fn default_queue_horizon_ms() -> f64 {
        QUEUE_HORIZON_MS
    }
    fn default_update_interval_s() -> f64 {
        UPDATE_INTERVAL_S
    }

    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, TuningError> {
        let mut tuning: Self =
            toml::from_str(text).map_err(|source| TuningError::Parse { source })?;
        tuning.validate()?;
        if tuning.residual_bound > MAX_RESIDUAL_BOUND {
            tracing::warn!(
                target: "coyote",
                residual_bound = tuning.residual_bound,
                "residual_bound capped at {} ms",
                MAX_RESIDUAL_BOUND
            );
            tuning.residual_bound = MAX_RESIDUAL_BOUND;
        }
        Ok(tuning)
    }

    /// Read and validate a tuning file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Like [`load`](Self::load), but any failure yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(tuning) => tuning,
            Err(err) => {
                tracing::warn!(target: "coyote", path = %path.display(), error = %err, "using default pulse tuning");
                Self::default()
            }
        }
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Check the ranges the pipeline relies on.
    pub fn validate(&self) -> Result<(), TuningError> {
        let finite = [
            self.texture_min_hz,
            self.texture_max_hz,
            self.residual_bound,
            self.packet_margin,
            self.queue_horizon_ms,
            self.update_interval_s,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(TuningError::Invalid("all values must be finite".into()));
        }
        if self.texture_min_hz < 0.0 || self.texture_min_hz > self.texture_max_hz {
            return Err(TuningError::Invalid(format!(
                "texture speed range {}..{} Hz is inverted or negative",
                self.texture_min_hz, self.texture_max_hz
            )));
        }
        if self.residual_bound < 0.0 {
            return Err(TuningError::Invalid(format!(
                "residual_bound {} ms is negative",
                self.residual_bound
            )));
        }
        if !(0.0..1.0).contains(&self.packet_margin) {
            return Err(TuningError::Invalid(format!(
                "packet_margin {} outside 0..1",
                self.packet_margin
            )));
        }
        if self.queue_horizon_ms <= 0.0 {
            return Err(TuningError::Invalid("queue_horizon_ms must be positive".into()));
        }
        if self.update_interval_s <= 0.0 {
            return Err(TuningError::Invalid("update_interval_s must be positive".into()));
        }
        Ok(())
    }
}

impl Default for PulseTuning {
    fn default() -> Self {
        Self {
            texture_min_hz: Self::default_texture_min_hz(),
            texture_max_hz: Self::default_texture_max_hz(),
            residual_bound: Self::default_residual_bound(),
            packet_margin: Self::default_packet_margin(),
            queue_horizon_ms: Self::default_queue_horizon_ms(),
            update_interval_s: Self::default_update_interval_s(),
        }
    }
}
