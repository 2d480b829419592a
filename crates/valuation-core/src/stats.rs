//! Statistics and growth-rate helpers shared by the valuation methods.
//!
//! Standard deviation is always the sample (n - 1) form, and every series is
//! read oldest-first.

use statrs::statistics::Statistics;

/// Growth used whenever no estimation method yields a usable figure.
pub const DEFAULT_GROWTH_PCT: f64 = 10.0;

/// Bounds applied to consensus and blended growth rates.
pub const GROWTH_FLOOR_PCT: f64 = -50.0;
pub const GROWTH_CEILING_PCT: f64 = 200.0;

/// Tighter ceiling for growth derived from a historical EPS CAGR.
pub const EPS_CAGR_CEILING_PCT: f64 = 100.0;

/// Mean of a slice. Empty input yields 0.0.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.mean()
}

/// Sample standard deviation. Fewer than two points yields 0.0.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    data.std_dev()
}

/// Clamp a growth rate (in percent) to `[floor, ceiling]`.
///
/// NaN collapses to the default growth so it cannot leak into a blend.
pub fn clamp_growth(value: f64, floor: f64, ceiling: f64) -> f64 {
    if value.is_nan() {
        return DEFAULT_GROWTH_PCT;
    }
    value.clamp(floor, ceiling)
}

/// Clamp to the standard consensus range [-50, 200].
pub fn clamp_consensus(value: f64) -> f64 {
    clamp_growth(value, GROWTH_FLOOR_PCT, GROWTH_CEILING_PCT)
}

/// Compound annual growth rate in percent.
///
/// `None` when either endpoint is not strictly positive or `years` is not a
/// positive finite number, so a negative base never reaches `powf`.
pub fn cagr(start: f64, end: f64, years: f64) -> Option<f64> {
    if start <= 0.0 || end <= 0.0 || !years.is_finite() || years <= 0.0 {
        return None;
    }
    let rate = ((end / start).powf(1.0 / years) - 1.0) * 100.0;
    rate.is_finite().then_some(rate)
}

/// Linear blend of consensus and historical growth.
///
/// `weight` is the share given to consensus and is expected in [0, 1].
pub fn blend(consensus: f64, historical: f64, weight: f64) -> f64 {
    consensus * weight + historical * (1.0 - weight)
}

/// Percentage distance of `value` from `reference`, relative to `reference`.
pub fn pct_diff(value: f64, reference: f64) -> Option<f64> {
    if reference.abs() < f64::EPSILON {
        return None;
    }
    Some((value - reference) / reference * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_sample_std() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&data), 5.0);
        // sample variance = 32 / 7
        assert_relative_eq!(std_dev(&data), (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[3.0]), 0.0);
    }

    #[test]
    fn test_cagr_round_trip() {
        let rate = cagr(100.0, 161.051, 5.0).unwrap();
        assert_relative_eq!(rate, 10.0, epsilon = 1e-6);

        let rate = cagr(100.0, 161.05, 5.0).unwrap();
        assert_relative_eq!(rate, 10.0, epsilon = 1e-3);
    }

    #[test]
    fn test_cagr_rejects_non_positive_inputs() {
        assert!(cagr(-1.0, 10.0, 2.0).is_none());
        assert!(cagr(10.0, 0.0, 2.0).is_none());
        assert!(cagr(10.0, 20.0, 0.0).is_none());
        assert!(cagr(10.0, 20.0, f64::NAN).is_none());
    }

    #[test]
    fn test_clamp_is_idempotent() {
        for x in [-500.0, -50.0, -12.5, 0.0, 37.0, 200.0, 1e9] {
            let once = clamp_consensus(x);
            assert_eq!(clamp_consensus(once), once);
            let eps = clamp_growth(x, GROWTH_FLOOR_PCT, EPS_CAGR_CEILING_PCT);
            assert_eq!(clamp_growth(eps, GROWTH_FLOOR_PCT, EPS_CAGR_CEILING_PCT), eps);
        }
        assert_eq!(clamp_consensus(f64::NAN), DEFAULT_GROWTH_PCT);
    }

    #[test]
    fn test_blend_endpoints_and_linearity() {
        assert_eq!(blend(30.0, 8.0, 0.0), 8.0);
        assert_eq!(blend(30.0, 8.0, 1.0), 30.0);
        for w in [0.0, 0.25, 0.5, 0.7, 1.0] {
            assert_relative_eq!(blend(30.0, 8.0, w), 30.0 * w + 8.0 * (1.0 - w));
        }
    }

    #[test]
    fn test_pct_diff() {
        assert_relative_eq!(pct_diff(110.0, 100.0).unwrap(), 10.0);
        assert!(pct_diff(5.0, 0.0).is_none());
    }
}
