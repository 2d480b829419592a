//! Growth estimator: consensus, historical and blended growth rates.

use serde::{Deserialize, Serialize};
use valuation_core::stats::{
    blend, cagr, clamp_consensus, clamp_growth, DEFAULT_GROWTH_PCT, EPS_CAGR_CEILING_PCT,
    GROWTH_CEILING_PCT, GROWTH_FLOOR_PCT,
};
use valuation_core::{
    positive, ConsensusSource, GrowthEstimate, HistoricalSeries, HistoricalSource, StockSnapshot,
    ValuationError,
};

/// Consensus share of the blend unless the caller picks otherwise.
pub const DEFAULT_CONSENSUS_WEIGHT: f64 = 0.7;

/// Two years of quarterly EPS.
pub const MIN_EPS_OBSERVATIONS: usize = 8;

/// Roughly one trading year of daily closes.
pub const MIN_PRICE_OBSERVATIONS: usize = 252;

/// Forward-vs-trailing growth beyond this magnitude is treated as polluted.
pub const IMPLAUSIBLE_CONSENSUS_PCT: f64 = 100.0;

/// How the historical half of the blend is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "value", rename_all = "snake_case")]
pub enum HistoricalGrowthMethod {
    #[default]
    EpsCagr,
    PriceCagr,
    /// User-entered figure in percent.
    Manual(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthOptions {
    pub weight: f64,
    pub historical: HistoricalGrowthMethod,
}

impl Default for GrowthOptions {
    fn default() -> Self {
        Self {
            weight: DEFAULT_CONSENSUS_WEIGHT,
            historical: HistoricalGrowthMethod::default(),
        }
    }
}

fn eps_growth(base: f64, target: f64) -> f64 {
    (target - base) / base * 100.0
}

fn forward_eps_growth(s: &StockSnapshot) -> Option<f64> {
    let trailing = s.trailing_eps()?;
    let forward = s.forward_eps()?;
    let growth = eps_growth(trailing, forward);
    if growth.abs() > IMPLAUSIBLE_CONSENSUS_PCT {
        tracing::warn!(
            ticker = %s.ticker,
            growth,
            "forward EPS growth implausible, trying next source"
        );
        return None;
    }
    Some(growth)
}

fn analyst_estimate_growth(s: &StockSnapshot) -> Option<f64> {
    let trailing = s.trailing_eps()?;
    let estimate = positive(s.analyst_estimated_eps)?;
    Some(eps_growth(trailing, estimate))
}

fn quarterly_earnings_growth(s: &StockSnapshot) -> Option<f64> {
    s.quarterly_earnings_growth
        .filter(|g| g.is_finite())
        .map(|g| g * 100.0)
}

type ConsensusStrategy = fn(&StockSnapshot) -> Option<f64>;

const CONSENSUS_CHAIN: [(ConsensusSource, ConsensusStrategy); 3] = [
    (ConsensusSource::ForwardEps, forward_eps_growth),
    (ConsensusSource::AnalystEstimate, analyst_estimate_growth),
    (ConsensusSource::QuarterlyEarningsGrowth, quarterly_earnings_growth),
];

/// Consensus growth in percent, clamped to [-50, 200], with the source that
/// produced it.
pub fn consensus_growth(snapshot: &StockSnapshot) -> (f64, ConsensusSource) {
    let (raw, source) = CONSENSUS_CHAIN
        .iter()
        .find_map(|(source, strategy)| strategy(snapshot).map(|g| (g, *source)))
        .unwrap_or((DEFAULT_GROWTH_PCT, ConsensusSource::Default));
    tracing::debug!(ticker = %snapshot.ticker, raw, source = source.to_label(), "consensus growth");
    (clamp_consensus(raw), source)
}

/// EPS CAGR over a quarterly series, in percent, clamped to [-50, 100].
///
/// `years` is the number of observations over four.
pub fn eps_cagr(series: &HistoricalSeries) -> Result<f64, ValuationError> {
    if series.len() < MIN_EPS_OBSERVATIONS {
        return Err(ValuationError::InsufficientHistory {
            required: MIN_EPS_OBSERVATIONS,
            actual: series.len(),
        });
    }
    let (first, last) = endpoints(series)?;
    let years = series.len() as f64 / 4.0;
    let rate = cagr(first, last, years).ok_or_else(|| {
        ValuationError::MissingField("positive EPS at both ends of history".to_string())
    })?;
    Ok(clamp_growth(rate, GROWTH_FLOOR_PCT, EPS_CAGR_CEILING_PCT))
}

/// Price CAGR over a daily series, in percent, clamped to [-50, 200].
///
/// `years` is the calendar span over 365.25 days.
pub fn price_cagr(series: &HistoricalSeries) -> Result<f64, ValuationError> {
    if series.len() < MIN_PRICE_OBSERVATIONS {
        return Err(ValuationError::InsufficientHistory {
            required: MIN_PRICE_OBSERVATIONS,
            actual: series.len(),
        });
    }
    let (first, last) = endpoints(series)?;
    let years = series.span_years().unwrap_or(0.0);
    let rate = cagr(first, last, years).ok_or_else(|| {
        ValuationError::MissingField("positive prices spanning a positive period".to_string())
    })?;
    Ok(clamp_growth(rate, GROWTH_FLOOR_PCT, GROWTH_CEILING_PCT))
}

fn endpoints(series: &HistoricalSeries) -> Result<(f64, f64), ValuationError> {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) => Ok((first.value, last.value)),
        _ => Err(ValuationError::InsufficientHistory {
            required: 2,
            actual: series.len(),
        }),
    }
}

/// Historical growth in percent. Never fails: any missing precondition falls
/// back to the default growth.
pub fn historical_growth(
    method: HistoricalGrowthMethod,
    eps_history: Option<&HistoricalSeries>,
    price_history: Option<&HistoricalSeries>,
) -> (f64, HistoricalSource) {
    let attempt = match method {
        HistoricalGrowthMethod::Manual(value) => {
            return (clamp_consensus(value), HistoricalSource::Manual);
        }
        HistoricalGrowthMethod::EpsCagr => eps_history
            .ok_or_else(|| ValuationError::MissingField("EPS history".to_string()))
            .and_then(eps_cagr)
            .map(|g| (g, HistoricalSource::EpsCagr)),
        HistoricalGrowthMethod::PriceCagr => price_history
            .ok_or_else(|| ValuationError::MissingField("price history".to_string()))
            .and_then(price_cagr)
            .map(|g| (g, HistoricalSource::PriceCagr)),
    };

    attempt.unwrap_or_else(|e| {
        tracing::debug!(error = %e, "historical growth unavailable, using default");
        (DEFAULT_GROWTH_PCT, HistoricalSource::Default)
    })
}

/// Consensus, historical and blended growth for one snapshot.
pub fn estimate_growth(
    snapshot: &StockSnapshot,
    eps_history: Option<&HistoricalSeries>,
    price_history: Option<&HistoricalSeries>,
    options: &GrowthOptions,
) -> GrowthEstimate {
    let weight = if options.weight.is_nan() {
        tracing::warn!("growth weight is NaN, using default");
        DEFAULT_CONSENSUS_WEIGHT
    } else if !(0.0..=1.0).contains(&options.weight) {
        tracing::warn!(weight = options.weight, "growth weight outside [0, 1], clamping");
        options.weight.clamp(0.0, 1.0)
    } else {
        options.weight
    };

    let (consensus_pct, consensus_source) = consensus_growth(snapshot);
    let (historical_pct, historical_source) =
        historical_growth(options.historical, eps_history, price_history);

    GrowthEstimate {
        consensus_pct,
        consensus_source,
        historical_pct,
        historical_source,
        weight,
        blended_pct: blend(consensus_pct, historical_pct, weight),
    }
}
