//! Error types for configuration, construction and previews.
//!
//! Steady-state ticking has no error path; everything here is raised before
//! the first tick or outside the tick loop.

use std::path::PathBuf;

/// Problems loading or validating [`PulseTuning`](crate::tuning::PulseTuning).
#[derive(Debug, thiserror::Error)]
pub enum TuningError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse tuning TOML: {source}")]
    Parse {
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid tuning: {0}")]
    Invalid(String),
}

/// Rejections from [`CoyoteAlgorithmBuilder`](crate::algorithm::CoyoteAlgorithmBuilder).
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// No positional intensity strategy was selected.
    #[error("no positional intensity strategy selected")]
    MissingStrategy,
    #[error("missing parameter source: {0}")]
    MissingParameter(&'static str),
    #[error(transparent)]
    Tuning(#[from] TuningError),
}

/// WAV preview failures.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("sample rate must be positive")]
    InvalidSampleRate,
    #[error(transparent)]
    Wav(#[from] hound::Error),
}
