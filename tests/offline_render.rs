use coyote_pulse::harness::TickHarness;
use coyote_pulse::params::CoyoteParams;
use coyote_pulse::render::{render_packets, write_wav};
use coyote_pulse::{CoyoteAlgorithm, PositionalIntensity};

fn session() -> TickHarness {
    let params = CoyoteParams::constant(600.0, 50.0, 1.0, (-1.0, 0.0), -3.0);
    let algorithm = CoyoteAlgorithm::builder()
        .params(params)
        .strategy(PositionalIntensity::TwoChannelBarycentric)
        .build()
        .unwrap();
    let mut harness = TickHarness::new(algorithm);
    harness.run_fixed_step(0.0, 1.0, 0.01);
    harness
}

#[test]
fn offline_render_determinism() {
    let a = render_packets(session().packets(), 8000).unwrap();
    let b = render_packets(session().packets(), 8000).unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b, "Offline renders should be identical");
}

#[test]
fn offline_render_levels_follow_intensity() {
    let frames = render_packets(session().packets(), 8000).unwrap();
    // Both channels sit at 50% intensity with a 50% duty cycle.
    for lane in 0..2 {
        let peak = frames.iter().map(|f| f[lane]).fold(0.0f32, f32::max);
        assert!((peak - 0.5).abs() < 1e-6);
        let on = frames.iter().filter(|f| f[lane] > 0.0).count() as f64;
        let duty = on / frames.len() as f64;
        assert!((duty - 0.5).abs() < 0.05, "duty {}", duty);
    }
}

#[test]
fn offline_render_writes_stereo_wav() {
    let frames = render_packets(session().packets(), 8000).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preview.wav");
    write_wav(&path, &frames, 8000).unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len() as usize, frames.len() * 2);
}
