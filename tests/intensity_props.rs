use coyote_pulse::intensity::{
    power_law_gains, BarycentricWeights, CalibrationScale, CenterCalibration, PositionalIntensity,
};
use proptest::prelude::*;

/// Calibration that never attenuates.
struct Unity;

impl CalibrationScale for Unity {
    fn scale(&self, _center_db: f64, _alpha: f64, _beta: f64) -> f64 {
        1.0
    }
}

proptest! {
    #[test]
    fn barycentric_weights_sum_to_one(alpha in -1.0f64..=1.0, beta in -1.0f64..=1.0) {
        let w = BarycentricWeights::from_position(alpha, beta);
        prop_assert!((w.sum() - 1.0).abs() < 1e-9);
        prop_assert!(w.left >= 0.0 && w.right >= 0.0 && w.neutral >= 0.0);
    }

    #[test]
    fn power_law_is_monotonic_in_alpha(
        a in -1.0f64..=1.0,
        b in -1.0f64..=1.0,
        center_db in -10.0f64..=-0.1,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (a_lo, b_lo) = power_law_gains(lo, center_db);
        let (a_hi, b_hi) = power_law_gains(hi, center_db);
        prop_assert!(a_hi >= a_lo - 1e-12);
        prop_assert!(b_hi <= b_lo + 1e-12);
    }

    #[test]
    fn intensities_stay_in_range(
        alpha in -3.0f64..3.0,
        beta in -3.0f64..3.0,
        volume in -1.0f64..2.0,
        center_db in -20.0f64..5.0,
    ) {
        for strategy in [PositionalIntensity::ThreePhasePowerLaw, PositionalIntensity::TwoChannelBarycentric] {
            let (a, b) = strategy.compute((alpha, beta), volume, center_db, &CenterCalibration);
            prop_assert!(a <= 100 && b <= 100);
        }
    }

    #[test]
    fn zero_volume_is_silent(alpha in -1.0f64..=1.0, beta in -1.0f64..=1.0) {
        for strategy in [PositionalIntensity::ThreePhasePowerLaw, PositionalIntensity::TwoChannelBarycentric] {
            prop_assert_eq!(strategy.compute((alpha, beta), 0.0, -3.0, &Unity), (0, 0));
        }
    }
}

#[test]
fn strategy_is_swappable_behind_one_call() {
    let position = (1.0, 0.0);
    let power = PositionalIntensity::ThreePhasePowerLaw.compute(position, 1.0, -3.0, &Unity);
    let bary = PositionalIntensity::TwoChannelBarycentric.compute(position, 1.0, -3.0, &Unity);
    assert_eq!(power, (100, 0));
    assert_eq!(bary, (75, 75));
}

#[test]
fn calibration_attenuates_toward_the_center() {
    let cal = CenterCalibration;
    assert!((cal.scale(-6.0, 1.0, 0.0) - 1.0).abs() < 1e-12);
    let center = cal.scale(-6.0, 0.0, 0.0);
    assert!((center - 10f64.powf(-6.0 / 20.0)).abs() < 1e-12);
}

#[test]
fn strategy_parses_from_config_names() {
    #[derive(serde::Deserialize)]
    struct Wrapper {
        strategy: PositionalIntensity,
    }
    let parsed: Wrapper = toml::from_str("strategy = \"two-channel-barycentric\"").unwrap();
    assert_eq!(parsed.strategy, PositionalIntensity::TwoChannelBarycentric);
}
