//! Reliability classifier: where the price sits against a band, and whether
//! trailing earnings can be trusted at all.

use valuation_core::stats::pct_diff;
use valuation_core::{
    EarningsQuality, PollutionSignal, PriceRange, ReliabilityVerdict, StockSnapshot, ValuationBand,
};

/// Forward EPS above this multiple of trailing EPS flags a distorted base.
pub const FORWARD_EPS_JUMP_RATIO: f64 = 1.5;

/// Trailing P/E above this while forward P/E sits below
/// [`DISTORTED_FORWARD_PE_MAX`] flags a distorted base.
pub const DISTORTED_TRAILING_PE_MIN: f64 = 100.0;
pub const DISTORTED_FORWARD_PE_MAX: f64 = 50.0;

/// Map the current price onto a band.
pub fn classify<R: PriceRange>(price: f64, band: &R) -> ReliabilityVerdict {
    let (low, mid, high) = (band.low(), band.mid(), band.high());

    if price < low {
        ReliabilityVerdict::FarBelowBand {
            upside_to_mid_pct: pct_diff(mid, price).unwrap_or(0.0),
        }
    } else if price < mid {
        ReliabilityVerdict::BelowMid {
            discount_to_mid_pct: -pct_diff(price, mid).unwrap_or(0.0),
        }
    } else if price <= high {
        ReliabilityVerdict::WithinBandBelowHigh {
            premium_to_mid_pct: pct_diff(price, mid).unwrap_or(0.0),
        }
    } else {
        ReliabilityVerdict::AboveBand {
            premium_to_high_pct: pct_diff(price, high).unwrap_or(0.0),
        }
    }
}

/// Like [`classify`], but a band built on polluted trailing earnings is
/// reported as unreliable instead of placed.
pub fn classify_with_quality(
    price: f64,
    band: &ValuationBand,
    quality: &EarningsQuality,
) -> ReliabilityVerdict {
    if quality.is_polluted() && band.method.uses_trailing_earnings() {
        return ReliabilityVerdict::PollutionFlaggedUnreliable;
    }
    classify(price, band)
}

/// Data-quality check on trailing earnings.
///
/// Fires when forward EPS is more than 1.5x trailing EPS, or when trailing
/// P/E is above 100 while forward P/E is below 50. Either usually means a
/// one-off charge has crushed the trailing figure.
pub fn earnings_quality(snapshot: &StockSnapshot) -> EarningsQuality {
    if let (Some(trailing), Some(forward)) = (snapshot.trailing_eps(), snapshot.forward_eps()) {
        let ratio = forward / trailing;
        if ratio > FORWARD_EPS_JUMP_RATIO {
            tracing::warn!(ticker = %snapshot.ticker, ratio, "trailing earnings look polluted");
            return EarningsQuality::Polluted {
                signal: PollutionSignal::ForwardEpsJump { ratio },
            };
        }
    }

    if let (Some(trailing_pe), Some(forward_pe)) = (snapshot.trailing_pe(), snapshot.forward_pe()) {
        if trailing_pe > DISTORTED_TRAILING_PE_MIN && forward_pe < DISTORTED_FORWARD_PE_MAX {
            tracing::warn!(
                ticker = %snapshot.ticker,
                trailing_pe,
                forward_pe,
                "trailing P/E looks distorted"
            );
            return EarningsQuality::Polluted {
                signal: PollutionSignal::TrailingPeDistorted {
                    trailing_pe,
                    forward_pe,
                },
            };
        }
    }

    EarningsQuality::Clean
}
