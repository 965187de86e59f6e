//! Pulse-packet core for a two-channel square-pulse stimulation device.
//!
//! A continuous position/volume/frequency signal goes in; fixed-size packets
//! of four integer-millisecond pulses per channel come out. See
//! [`CoyoteAlgorithm`] for the per-tick entry point.

pub mod algorithm;
pub mod channel;
pub mod common;
pub mod constants;
pub mod egress;
pub mod error;
pub mod generator;
#[doc(hidden)]
pub mod harness;
pub mod intensity;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod params;
pub mod pulse;
pub mod render;
pub mod tuning;

pub use algorithm::{CoyoteAlgorithm, CoyoteAlgorithmBuilder, PacketReport};
pub use channel::{ChannelController, ChannelId, ChannelState};
pub use error::{BuildError, RenderError, TuningError};
pub use generator::{PulseDebug, PulseGenerator};
pub use intensity::{CalibrationScale, CenterCalibration, PositionalIntensity};
pub use params::{ChannelParams, CoyoteParams, Curve, ParamLimits};
pub use pulse::{CoyotePacket, Pulse};
pub use tuning::PulseTuning;
