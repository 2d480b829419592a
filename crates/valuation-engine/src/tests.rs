use std::collections::HashMap;

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use serde_json::json;
use valuation_core::{
    EarningsQuality, FetchedData, FundamentalsSource, HistoricalSeries, HistoricalSource,
    MethodOutcome, PegTier, RawFundamentals, ReliabilityVerdict, SeriesPoint, ValuationError,
    ValuationMethod,
};

use crate::engine::{EngineConfig, ValuationEngine};
use crate::growth::HistoricalGrowthMethod;
use crate::recent::RecentSearches;

/// Helper: evenly spaced series starting at `start`.
fn series(start: NaiveDate, step_days: i64, values: &[f64]) -> HistoricalSeries {
    HistoricalSeries::new(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| SeriesPoint::new(start + Duration::days(step_days * i as i64), *v)),
    )
}

fn quarterly(values: &[f64]) -> HistoricalSeries {
    series(NaiveDate::from_ymd_opt(2022, 3, 31).unwrap(), 91, values)
}

/// Helper: a well-covered ticker trading at 100 on 5.00 of trailing EPS.
fn full_data() -> FetchedData {
    FetchedData {
        fundamentals: RawFundamentals::from_value(json!({
            "symbol": "ACME",
            "longName": "Acme Corporation",
            "currentPrice": 100.0,
            "trailingEps": 5.0,
            "forwardEps": 5.5,
            "trailingPE": 20.0,
            "forwardPE": 18.0,
            "targetMeanPrice": 110.0,
            "marketCap": 2.0e10,
            "freeCashflow": 1.0e9,
        })),
        eps_history: Some(quarterly(&[1.0, 1.02, 1.05, 1.08, 1.1, 1.13, 1.17, 1.21])),
        price_history: None,
        pe_history: Some(quarterly(&[14.0, 14.0, 18.0, 22.0, 22.0])),
    }
}

struct FixtureSource {
    tickers: HashMap<String, FetchedData>,
}

impl FundamentalsSource for FixtureSource {
    fn fetch(&self, ticker: &str) -> Result<FetchedData, ValuationError> {
        self.tickers
            .get(ticker)
            .cloned()
            .ok_or_else(|| ValuationError::UpstreamFailure(format!("no fixture for {ticker}")))
    }
}

#[test]
fn test_full_pipeline() {
    let engine = ValuationEngine::default();
    let report = engine.evaluate("acme", &full_data()).unwrap();

    assert_eq!(report.ticker, "ACME");
    assert_eq!(report.name, "Acme Corporation");
    assert_eq!(report.earnings_quality, EarningsQuality::Clean);
    assert_eq!(report.snapshot.price_to_fcf, Some(20.0));

    assert_relative_eq!(report.growth.consensus_pct, 10.0, epsilon = 1e-9);
    assert_eq!(report.growth.historical_source, HistoricalSource::EpsCagr);
    assert_relative_eq!(report.growth.historical_pct, 10.0, epsilon = 1e-9);
    assert_relative_eq!(report.growth.blended_pct, 10.0, epsilon = 1e-9);

    let pe = report.historical_pe.band().unwrap();
    assert_relative_eq!(pe.low, 75.0, epsilon = 1e-9);
    assert_relative_eq!(pe.mid, 90.0, epsilon = 1e-9);
    assert_relative_eq!(pe.high, 105.0, epsilon = 1e-9);

    let peg = report.peg.band().unwrap();
    assert_eq!(peg.method, ValuationMethod::Peg);
    assert_relative_eq!(peg.mid, 50.0, epsilon = 1e-6);

    let agg = report.aggregate.as_ref().unwrap();
    assert_relative_eq!(agg.mid, 70.0, epsilon = 1e-6);
    assert!(matches!(report.verdict, Some(ReliabilityVerdict::AboveBand { .. })));
    assert_eq!(report.method_verdicts.len(), 2);

    assert_relative_eq!(report.current_peg.unwrap(), 2.0, epsilon = 1e-9);
    assert_relative_eq!(report.analyst_upside_pct.unwrap(), 10.0, epsilon = 1e-9);
    assert!(!report.insufficient_data());
}

#[test]
fn test_peg_of_two_is_severely_overvalued() {
    // consensus only: 5.00 -> 5.50 is exactly 10%, on a trailing P/E of 20
    let config = EngineConfig {
        growth_weight: 1.0,
        ..Default::default()
    };
    let report = ValuationEngine::new(config).evaluate("ACME", &full_data()).unwrap();
    assert_eq!(report.growth.blended_pct, 10.0);
    assert_eq!(report.current_peg, Some(2.0));
    assert_eq!(report.peg_tier, Some(PegTier::SeverelyOvervalued));
}

#[test]
fn test_missing_price_is_the_only_hard_stop() {
    let mut data = full_data();
    data.fundamentals = RawFundamentals::from_value(json!({"symbol": "ACME", "trailingEps": 5.0}));

    let result = ValuationEngine::default().evaluate("ACME", &data);
    assert_eq!(result, Err(ValuationError::MissingPrice("ACME".to_string())));
}

#[test]
fn test_zero_eps_degrades_to_insufficient_data() {
    let mut data = full_data();
    data.fundamentals = RawFundamentals::from_value(json!({
        "symbol": "ACME",
        "currentPrice": 100.0,
        "trailingEps": 0,
        "trailingPE": 0,
    }));

    let report = ValuationEngine::default().evaluate("ACME", &data).unwrap();
    assert!(matches!(report.historical_pe, MethodOutcome::NotApplicable { .. }));
    assert!(matches!(report.peg, MethodOutcome::NotApplicable { .. }));
    assert!(report.aggregate.is_none());
    assert!(report.verdict.is_none());
    assert!(report.insufficient_data());
    assert!(report.notes.iter().any(|n| n.contains("Insufficient data")));
    assert_eq!(report.recent_entry().valuation_mid, None);
}

#[test]
fn test_short_eps_history_uses_default_growth() {
    let mut data = full_data();
    data.eps_history = Some(quarterly(&[1.0, 1.1, 1.2, 1.3, 1.4, 1.5]));

    let report = ValuationEngine::default().evaluate("ACME", &data).unwrap();
    assert_eq!(report.growth.historical_source, HistoricalSource::Default);
    assert_eq!(report.growth.historical_pct, 10.0);
}

#[test]
fn test_single_method_aggregate_equals_that_band() {
    let mut data = full_data();
    data.pe_history = None;

    let report = ValuationEngine::default().evaluate("ACME", &data).unwrap();
    assert!(matches!(report.historical_pe, MethodOutcome::NotApplicable { .. }));
    let peg = report.peg.band().unwrap();
    let agg = report.aggregate.as_ref().unwrap();
    assert_eq!((agg.low, agg.mid, agg.high), (peg.low, peg.mid, peg.high));
    assert_eq!(agg.methods, vec![ValuationMethod::Peg]);
}

#[test]
fn test_polluted_earnings_switch_to_forward_peg() {
    let data = FetchedData {
        fundamentals: RawFundamentals::from_value(json!({
            "symbol": "TURN",
            "currentPrice": 150.0,
            "trailingEps": 1.0,
            "forwardEps": 2.5,
            "trailingPE": 150.0,
            "forwardPE": 60.0,
        })),
        eps_history: None,
        price_history: None,
        pe_history: Some(quarterly(&[20.0, 25.0, 30.0, 35.0])),
    };
    let config = EngineConfig {
        historical_growth: HistoricalGrowthMethod::Manual(10.0),
        ..Default::default()
    };

    let report = ValuationEngine::new(config).evaluate("TURN", &data).unwrap();
    assert!(report.earnings_quality.is_polluted());

    // forward growth of +150% is discarded, nothing else available
    assert_eq!(report.growth.consensus_pct, 10.0);

    let peg = report.peg.band().unwrap();
    assert_eq!(peg.method, ValuationMethod::ForwardPeg);
    assert_relative_eq!(peg.mid, 25.0, epsilon = 1e-9);

    let pe_verdict = report
        .method_verdicts
        .iter()
        .find(|v| v.method == ValuationMethod::HistoricalPe)
        .unwrap();
    assert_eq!(pe_verdict.verdict, ReliabilityVerdict::PollutionFlaggedUnreliable);

    // the trailing band stays out of the average; the forward band places the price
    let agg = report.aggregate.as_ref().unwrap();
    assert_eq!(agg.methods, vec![ValuationMethod::ForwardPeg]);
    assert_relative_eq!(agg.mid, peg.mid, epsilon = 1e-9);
    assert!(matches!(report.verdict, Some(ReliabilityVerdict::AboveBand { .. })));
    assert!(report
        .notes
        .iter()
        .any(|n| n.starts_with("Historical P/E band excluded from the average")));
    assert_eq!(report.bands().len(), 2);
}

#[test]
fn test_polluted_earnings_without_forward_band_flag_the_aggregate() {
    let data = FetchedData {
        fundamentals: RawFundamentals::from_value(json!({
            "symbol": "TURN",
            "currentPrice": 150.0,
            "trailingEps": 1.0,
            "forwardEps": 2.5,
            "trailingPE": 150.0,
            "forwardPE": 60.0,
        })),
        eps_history: None,
        price_history: None,
        pe_history: Some(quarterly(&[20.0, 25.0, 30.0, 35.0])),
    };
    // negative growth rules out both PEG bands, leaving only the trailing P/E band
    let config = EngineConfig {
        growth_weight: 0.0,
        historical_growth: HistoricalGrowthMethod::Manual(-20.0),
        ..Default::default()
    };

    let report = ValuationEngine::new(config).evaluate("TURN", &data).unwrap();
    let agg = report.aggregate.as_ref().unwrap();
    assert_eq!(agg.methods, vec![ValuationMethod::HistoricalPe]);
    assert_eq!(report.verdict, Some(ReliabilityVerdict::PollutionFlaggedUnreliable));
    assert!(!report.notes.iter().any(|n| n.contains("excluded from the average")));
}

#[test]
fn test_pe_history_synthesized_from_prices() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let prices: Vec<f64> = (0..300).map(|i| 80.0 + (i % 40) as f64).collect();

    let mut data = full_data();
    data.pe_history = None;
    data.price_history = Some(series(start, 1, &prices));

    let report = ValuationEngine::default().evaluate("ACME", &data).unwrap();
    let band = report.historical_pe.band().unwrap();
    assert!(band.low <= band.mid && band.mid <= band.high);
    // prices 80..=119 at P/E 20 on a 100 price -> P/E 16..=23.8
    assert!(band.mid > 16.0 * 5.0 && band.mid < 23.8 * 5.0);
}

#[test]
fn test_short_pe_history_falls_back_to_prices() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let prices: Vec<f64> = (0..300).map(|i| 80.0 + (i % 40) as f64).collect();

    let mut data = full_data();
    data.pe_history = Some(quarterly(&[18.0, 22.0]));
    data.price_history = Some(series(start, 1, &prices));

    let report = ValuationEngine::default().evaluate("ACME", &data).unwrap();
    let band = report.historical_pe.band().unwrap();
    assert!(band.mid > 16.0 * 5.0 && band.mid < 23.8 * 5.0);

    // without prices the short history is reported as such
    data.price_history = None;
    let report = ValuationEngine::default().evaluate("ACME", &data).unwrap();
    assert!(matches!(report.historical_pe, MethodOutcome::NotApplicable { .. }));
}

#[test]
fn test_explicit_pe_history_preferred_over_prices() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let prices: Vec<f64> = (0..300).map(|i| 80.0 + (i % 40) as f64).collect();

    let mut data = full_data();
    data.price_history = Some(series(start, 1, &prices));

    let report = ValuationEngine::default().evaluate("ACME", &data).unwrap();
    // mean of [14, 14, 18, 22, 22] is 18
    assert_relative_eq!(report.historical_pe.band().unwrap().mid, 90.0, epsilon = 1e-9);
}

#[test]
fn test_price_cagr_feeds_historical_growth() {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let prices: Vec<f64> = (0..=730).map(|d| 100.0 + 21.0 * d as f64 / 730.0).collect();

    let mut data = full_data();
    data.price_history = Some(series(start, 1, &prices));
    let config = EngineConfig {
        historical_growth: HistoricalGrowthMethod::PriceCagr,
        ..Default::default()
    };

    let report = ValuationEngine::new(config.clone()).evaluate("ACME", &data).unwrap();
    assert_eq!(report.growth.historical_source, HistoricalSource::PriceCagr);
    let years = 730.0 / 365.25;
    let expected = ((121.0_f64 / 100.0).powf(1.0 / years) - 1.0) * 100.0;
    assert_relative_eq!(report.growth.historical_pct, expected, epsilon = 1e-9);

    // a quarter of prices is not enough
    data.price_history = Some(series(start, 1, &prices[..90]));
    let report = ValuationEngine::new(config.clone()).evaluate("ACME", &data).unwrap();
    assert_eq!(report.growth.historical_source, HistoricalSource::Default);
    assert_eq!(report.growth.historical_pct, 10.0);

    data.price_history = None;
    let report = ValuationEngine::new(config).evaluate("ACME", &data).unwrap();
    assert_eq!(report.growth.historical_source, HistoricalSource::Default);
    assert_eq!(report.growth.historical_pct, 10.0);
}

#[test]
fn test_negative_blended_growth_disables_peg() {
    let mut data = full_data();
    data.fundamentals.insert("forwardEps", 3.0); // -40%
    let config = EngineConfig {
        growth_weight: 1.0,
        ..Default::default()
    };

    let report = ValuationEngine::new(config).evaluate("ACME", &data).unwrap();
    assert!(report.growth.blended_pct < 0.0);
    assert!(matches!(report.peg, MethodOutcome::NotApplicable { .. }));
    assert!(report.current_peg.is_none());
    assert!(report.peg_tier.is_none());
    assert!(report.historical_pe.band().is_some());
}

#[test]
fn test_search_updates_recent_list() {
    let source = FixtureSource {
        tickers: HashMap::from([("AAPL".to_string(), full_data()), ("MSFT".to_string(), full_data())]),
    };
    let engine = ValuationEngine::default();
    let recent = engine.recent_searches();

    let (result, recent) = engine.search(&source, "AAPL", recent);
    assert!(result.is_ok());
    let (_, recent) = engine.search(&source, "MSFT", recent);
    let (_, recent) = engine.search(&source, "AAPL", recent);

    assert_eq!(recent.len(), 2);
    assert_eq!(recent.entries()[0].ticker, "AAPL");
    assert!(recent.entries()[0].valuation_mid.is_some());
}

#[test]
fn test_failed_fetch_leaves_recent_list_alone() {
    let source = FixtureSource { tickers: HashMap::new() };
    let engine = ValuationEngine::default();

    let (result, recent) = engine.search(&source, "NOPE", RecentSearches::new());
    assert_eq!(result, Err(ValuationError::MissingPrice("NOPE".to_string())));
    assert!(recent.is_empty());
}
