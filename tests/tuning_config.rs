use coyote_pulse::{PulseTuning, TuningError};
use std::fs;

#[test]
fn tuning_file_overrides_only_given_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pulse.toml");
    fs::write(&path, "packet_margin = 0.2\nqueue_horizon_ms = 500.0\n").unwrap();

    let tuning = PulseTuning::load(&path).unwrap();
    assert_eq!(tuning.packet_margin, 0.2);
    assert_eq!(tuning.queue_horizon_ms, 500.0);
    assert_eq!(tuning.update_interval_s, PulseTuning::default().update_interval_s);
}

#[test]
fn missing_file_is_an_io_error_but_defaults_on_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(matches!(PulseTuning::load(&path), Err(TuningError::Io { .. })));
    assert_eq!(PulseTuning::load_or_default(&path), PulseTuning::default());
}

#[test]
fn invalid_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "packet_margin = 1.5\n").unwrap();
    assert!(matches!(PulseTuning::load(&path), Err(TuningError::Invalid(_))));
    assert_eq!(PulseTuning::load_or_default(&path), PulseTuning::default());
}

#[test]
fn saved_tuning_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saved.toml");
    let tuning = PulseTuning {
        texture_max_hz: 6.0,
        ..PulseTuning::default()
    };
    fs::write(&path, tuning.to_toml_string().unwrap()).unwrap();
    assert_eq!(PulseTuning::load(&path).unwrap(), tuning);
}

#[test]
fn oversized_residual_bound_keeps_the_rest_of_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.toml");
    fs::write(&path, "residual_bound = 3.0\nqueue_horizon_ms = 400.0\n").unwrap();

    let tuning = PulseTuning::load_or_default(&path);
    assert_eq!(tuning.residual_bound, 0.5);
    assert_eq!(tuning.queue_horizon_ms, 400.0);
}
