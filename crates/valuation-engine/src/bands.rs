//! Valuation band calculator: historical P/E band, PEG band, aggregate.

use serde::{Deserialize, Serialize};
use valuation_core::stats::{mean, std_dev};
use valuation_core::{AggregateBand, HistoricalSeries, ValuationBand, ValuationError, ValuationMethod};

/// Fewest P/E observations the historical method will work from.
pub const MIN_PE_OBSERVATIONS: usize = 4;

/// Standard deviations either side of the mean for the conservative band.
pub const CONSERVATIVE_SIGMA: f64 = 0.75;

/// Standard deviations either side of the mean for the extended band.
pub const EXTENDED_SIGMA: f64 = 1.5;

/// Plausible window for P/E values synthesized from price ratios.
pub const SYNTHETIC_PE_FLOOR: f64 = 5.0;
pub const SYNTHETIC_PE_CEILING: f64 = 200.0;

/// PEG multiples applied to `growth × EPS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PegPolicy {
    /// 0.8 / 1.0 / 1.5
    #[default]
    ThreeTier,
    /// 0.5 / 0.8 / 1.0 / 1.2 / 2.0, outer tiers filling the extended bounds.
    FiveTier,
}

impl PegPolicy {
    /// (very_low, low, mid, high, very_high) PEG multiples.
    fn multiples(&self) -> (Option<f64>, f64, f64, f64, Option<f64>) {
        match self {
            PegPolicy::ThreeTier => (None, 0.8, 1.0, 1.5, None),
            PegPolicy::FiveTier => (Some(0.5), 0.8, 1.0, 1.2, Some(2.0)),
        }
    }
}

fn require_positive(value: f64, field: &str) -> Result<f64, ValuationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValuationError::MissingField(field.to_string()))
    }
}

/// Band from P/E statistics. Low bounds are floored at zero.
pub fn pe_band_from_stats(mean_pe: f64, std_pe: f64, eps: f64) -> ValuationBand {
    ValuationBand {
        method: ValuationMethod::HistoricalPe,
        low: (mean_pe - CONSERVATIVE_SIGMA * std_pe).max(0.0) * eps,
        mid: mean_pe * eps,
        high: (mean_pe + CONSERVATIVE_SIGMA * std_pe) * eps,
        very_low: Some((mean_pe - EXTENDED_SIGMA * std_pe).max(0.0) * eps),
        very_high: Some((mean_pe + EXTENDED_SIGMA * std_pe) * eps),
    }
}

/// Historical P/E band: mean ± 0.75σ (conservative) and ± 1.5σ (extended)
/// of the P/E history, times trailing EPS.
///
/// Non-positive P/E observations carry no valuation signal and are ignored.
pub fn historical_pe_band(pe_series: &[f64], trailing_eps: f64) -> Result<ValuationBand, ValuationError> {
    let eps = require_positive(trailing_eps, "trailing EPS")?;

    let observations: Vec<f64> = pe_series
        .iter()
        .copied()
        .filter(|pe| pe.is_finite() && *pe > 0.0)
        .collect();
    if observations.len() < MIN_PE_OBSERVATIONS {
        return Err(ValuationError::InsufficientHistory {
            required: MIN_PE_OBSERVATIONS,
            actual: observations.len(),
        });
    }

    let mean_pe = mean(&observations);
    let std_pe = std_dev(&observations);
    tracing::debug!(mean_pe, std_pe, n = observations.len(), "historical P/E statistics");

    Ok(pe_band_from_stats(mean_pe, std_pe, eps))
}

/// P/E history rebuilt from prices: each price scaled by its ratio to the
/// current price, times the current trailing P/E, keeping only values
/// strictly inside (5, 200).
pub fn synthesize_pe_series(prices: &HistoricalSeries, current_price: f64, trailing_pe: f64) -> Vec<f64> {
    if current_price.is_nan() || trailing_pe.is_nan() || current_price <= 0.0 || trailing_pe <= 0.0 {
        return Vec::new();
    }
    prices
        .points()
        .iter()
        .map(|p| p.value / current_price * trailing_pe)
        .filter(|pe| *pe > SYNTHETIC_PE_FLOOR && *pe < SYNTHETIC_PE_CEILING)
        .collect()
}

/// P/E over blended growth. `None` unless both are positive.
pub fn current_peg(pe: f64, blended_growth: f64) -> Option<f64> {
    (pe > 0.0 && blended_growth > 0.0).then(|| pe / blended_growth)
}

/// PEG band: `multiple × growth × EPS` for each tier of `policy`.
pub fn peg_band(
    pe: f64,
    blended_growth: f64,
    eps: f64,
    policy: PegPolicy,
) -> Result<ValuationBand, ValuationError> {
    if blended_growth.is_nan() || blended_growth <= 0.0 {
        return Err(ValuationError::NonPositiveGrowth(blended_growth));
    }
    require_positive(pe, "P/E")?;
    let eps = require_positive(eps, "EPS")?;

    let price_at = |multiple: f64| multiple * blended_growth * eps;
    let (very_low, low, mid, high, very_high) = policy.multiples();

    Ok(ValuationBand {
        method: ValuationMethod::Peg,
        low: price_at(low),
        mid: price_at(mid),
        high: price_at(high),
        very_low: very_low.map(price_at),
        very_high: very_high.map(price_at),
    })
}

/// PEG band on forward P/E and forward EPS, for when trailing earnings are
/// distorted.
pub fn forward_peg_band(
    forward_pe: f64,
    blended_growth: f64,
    forward_eps: f64,
    policy: PegPolicy,
) -> Result<ValuationBand, ValuationError> {
    peg_band(forward_pe, blended_growth, forward_eps, policy).map(|band| ValuationBand {
        method: ValuationMethod::ForwardPeg,
        ..band
    })
}

/// Arithmetic mean of the supplied bands. `None` when there is nothing to
/// average.
pub fn aggregate(bands: &[ValuationBand]) -> Option<AggregateBand> {
    if bands.is_empty() {
        return None;
    }
    let n = bands.len() as f64;
    let avg = |f: fn(&ValuationBand) -> f64| bands.iter().map(f).sum::<f64>() / n;

    Some(AggregateBand {
        low: avg(|b| b.low),
        mid: avg(|b| b.mid),
        high: avg(|b| b.high),
        methods: bands.iter().map(|b| b.method).collect(),
    })
}
