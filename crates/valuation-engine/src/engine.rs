use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use valuation_core::{
    AggregateBand, EarningsQuality, FetchedData, FundamentalsSource, GrowthEstimate,
    MethodOutcome, PegTier, RecentSearchEntry, ReliabilityVerdict, StockSnapshot,
    ValuationBand, ValuationError, ValuationMethod,
};

use crate::bands::{
    aggregate, current_peg as peg_ratio, forward_peg_band, historical_pe_band, peg_band, synthesize_pe_series,
    PegPolicy,
};
use crate::classifier::{classify, classify_with_quality, earnings_quality};
use crate::growth::{estimate_growth, GrowthOptions, HistoricalGrowthMethod, DEFAULT_CONSENSUS_WEIGHT};
use crate::normalizer::normalize;
use crate::recent::{RecentSearches, RECENT_SEARCH_CAPACITY};

/// Tunables for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Consensus share of blended growth (0..=1).
    pub growth_weight: f64,
    pub historical_growth: HistoricalGrowthMethod,
    pub peg_policy: PegPolicy,
    pub recent_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            growth_weight: DEFAULT_CONSENSUS_WEIGHT,
            historical_growth: HistoricalGrowthMethod::EpsCagr,
            peg_policy: PegPolicy::ThreeTier,
            recent_capacity: RECENT_SEARCH_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn growth_options(&self) -> GrowthOptions {
        GrowthOptions {
            weight: self.growth_weight,
            historical: self.historical_growth,
        }
    }
}

/// Per-method placement of the current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodVerdict {
    pub method: ValuationMethod,
    pub verdict: ReliabilityVerdict,
}

/// Everything the presentation layer needs for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationReport {
    pub ticker: String,
    pub name: String,
    pub price: f64,
    pub evaluated_at: DateTime<Utc>,
    pub snapshot: StockSnapshot,
    pub growth: GrowthEstimate,
    pub earnings_quality: EarningsQuality,
    /// Trailing P/E over blended growth.
    pub current_peg: Option<f64>,
    /// Forward P/E over blended growth.
    pub forward_peg: Option<f64>,
    pub peg_tier: Option<PegTier>,
    pub historical_pe: MethodOutcome,
    pub peg: MethodOutcome,
    pub aggregate: Option<AggregateBand>,
    pub verdict: Option<ReliabilityVerdict>,
    pub method_verdicts: Vec<MethodVerdict>,
    pub analyst_upside_pct: Option<f64>,
    pub notes: Vec<String>,
}

impl ValuationReport {
    pub fn bands(&self) -> Vec<&ValuationBand> {
        [&self.historical_pe, &self.peg]
            .into_iter()
            .filter_map(MethodOutcome::band)
            .collect()
    }

    /// True when no method produced a band.
    pub fn insufficient_data(&self) -> bool {
        self.aggregate.is_none()
    }

    pub fn recent_entry(&self) -> RecentSearchEntry {
        RecentSearchEntry {
            ticker: self.ticker.clone(),
            name: self.name.clone(),
            price: Some(self.price),
            trailing_pe: self.snapshot.trailing_pe(),
            valuation_mid: self.aggregate.as_ref().map(|a| a.mid),
        }
    }
}

/// Normalize -> estimate growth -> band -> classify, for one ticker at a
/// time.
#[derive(Debug, Clone, Default)]
pub struct ValuationEngine {
    config: EngineConfig,
}

impl ValuationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn recent_searches(&self) -> RecentSearches {
        RecentSearches::with_capacity(self.config.recent_capacity)
    }

    /// Fetch `ticker` through `source`, evaluate it, and record it in
    /// `recent` on success.
    ///
    /// A failed fetch is treated as an empty record, so it surfaces as
    /// [`ValuationError::MissingPrice`] like any other ticker without data.
    pub fn search<S: FundamentalsSource + ?Sized>(
        &self,
        source: &S,
        ticker: &str,
        recent: RecentSearches,
    ) -> (Result<ValuationReport, ValuationError>, RecentSearches) {
        let data = source.fetch(ticker).unwrap_or_else(|e| {
            tracing::warn!(ticker, error = %e, "fetch failed, continuing with no data");
            FetchedData::default()
        });

        match self.evaluate(ticker, &data) {
            Ok(report) => {
                let recent = crate::recent::upsert_recent_search(recent, report.recent_entry());
                (Ok(report), recent)
            }
            Err(e) => (Err(e), recent),
        }
    }

    /// Run the full pipeline over already-fetched data.
    ///
    /// Only a missing price is an error. Every other gap narrows the report.
    pub fn evaluate(&self, ticker: &str, data: &FetchedData) -> Result<ValuationReport, ValuationError> {
        let ticker = ticker.trim().to_uppercase();
        let mut raw = data.fundamentals.clone();
        if raw.text("symbol").is_none() {
            raw.insert("symbol", ticker.clone());
        }

        let snapshot = normalize(&raw);
        let price = snapshot
            .price()
            .ok_or_else(|| ValuationError::MissingPrice(ticker.clone()))?;

        let mut notes = Vec::new();
        let quality = earnings_quality(&snapshot);
        if quality.is_polluted() {
            notes.push(
                "Trailing earnings look distorted; trailing-based ratios are unreliable, prefer forward figures"
                    .to_string(),
            );
        }

        let growth = estimate_growth(
            &snapshot,
            data.eps_history.as_ref(),
            data.price_history.as_ref(),
            &self.config.growth_options(),
        );
        notes.push(format!(
            "Consensus growth {:.2}% ({}), historical growth {:.2}% ({}), blended {:.2}% at weight {:.2}",
            growth.consensus_pct,
            growth.consensus_source.to_label(),
            growth.historical_pct,
            growth.historical_source.to_label(),
            growth.blended_pct,
            growth.weight,
        ));

        let historical_pe: MethodOutcome = self.historical_pe_method(&snapshot, price, data).into();
        let peg: MethodOutcome = self.peg_method(&snapshot, &growth, &quality).into();

        for (label, outcome) in [("Historical P/E", &historical_pe), ("PEG", &peg)] {
            if let MethodOutcome::NotApplicable { reason } = outcome {
                notes.push(format!("{label} method not applicable: {reason}"));
            }
        }

        let current_peg = snapshot
            .trailing_pe()
            .and_then(|pe| peg_ratio(pe, growth.blended_pct));
        let forward_peg = snapshot
            .forward_pe()
            .and_then(|pe| peg_ratio(pe, growth.blended_pct));
        let tier_basis = if quality.is_polluted() {
            forward_peg.or(current_peg)
        } else {
            current_peg
        };
        let peg_tier = tier_basis.and_then(PegTier::from_peg);
        if growth.blended_pct <= 0.0 {
            notes.push("Blended growth is zero or negative; PEG is meaningless".to_string());
        }

        let bands: Vec<ValuationBand> = [&historical_pe, &peg]
            .into_iter()
            .filter_map(MethodOutcome::band)
            .cloned()
            .collect();

        let method_verdicts: Vec<MethodVerdict> = bands
            .iter()
            .map(|band| MethodVerdict {
                method: band.method,
                verdict: classify_with_quality(price, band, &quality),
            })
            .collect();

        // Polluted trailing bands stay out of the average when a forward band can stand in.
        let has_forward_band = bands.iter().any(|b| !b.method.uses_trailing_earnings());
        let averaged: Vec<ValuationBand> = if quality.is_polluted() && has_forward_band {
            let (kept, flagged): (Vec<_>, Vec<_>) = bands
                .iter()
                .cloned()
                .partition(|b| !b.method.uses_trailing_earnings());
            for band in &flagged {
                notes.push(format!(
                    "{} band excluded from the average: built on distorted trailing earnings",
                    band.method.to_label()
                ));
            }
            kept
        } else {
            bands.clone()
        };

        let aggregate = aggregate(&averaged);
        let verdict = aggregate.as_ref().map(|agg| {
            let all_trailing = agg.methods.iter().all(ValuationMethod::uses_trailing_earnings);
            if quality.is_polluted() && all_trailing {
                ReliabilityVerdict::PollutionFlaggedUnreliable
            } else {
                classify(price, agg)
            }
        });
        match &verdict {
            Some(v) => notes.push(v.describe()),
            None => notes.push("Insufficient data to produce a valuation range".to_string()),
        }

        let analyst_upside_pct = snapshot.analyst_upside_pct();
        if let Some(upside) = analyst_upside_pct {
            notes.push(format!("Mean analyst target implies {upside:.1}% from current price"));
        }

        tracing::info!(
            ticker = %ticker,
            price,
            blended_growth = growth.blended_pct,
            bands = bands.len(),
            verdict = verdict.as_ref().map(ReliabilityVerdict::to_label).unwrap_or("insufficient data"),
            "valuation complete"
        );

        Ok(ValuationReport {
            name: snapshot.name.clone(),
            ticker,
            price,
            evaluated_at: Utc::now(),
            growth,
            earnings_quality: quality,
            current_peg,
            forward_peg,
            peg_tier,
            historical_pe,
            peg,
            aggregate,
            verdict,
            method_verdicts,
            analyst_upside_pct,
            notes,
            snapshot,
        })
    }

    /// Explicit P/E history when the provider has enough of one, otherwise
    /// P/E synthesized from the price history.
    fn historical_pe_method(
        &self,
        snapshot: &StockSnapshot,
        price: f64,
        data: &FetchedData,
    ) -> Result<ValuationBand, ValuationError> {
        let eps = snapshot.trailing_eps.unwrap_or(0.0);
        let explicit = data
            .pe_history
            .as_ref()
            .map(|pe| historical_pe_band(&pe.values(), eps));

        let too_short = matches!(
            explicit,
            None | Some(Err(ValuationError::InsufficientHistory { .. }))
        );
        if too_short {
            if let (Some(prices), Some(trailing_pe)) = (&data.price_history, snapshot.trailing_pe()) {
                let series = synthesize_pe_series(prices, price, trailing_pe);
                tracing::debug!(points = series.len(), "using P/E synthesized from prices");
                return historical_pe_band(&series, eps);
            }
        }
        explicit.unwrap_or_else(|| historical_pe_band(&[], eps))
    }

    /// Trailing PEG, or forward PEG when trailing earnings are polluted and
    /// forward figures exist.
    fn peg_method(
        &self,
        snapshot: &StockSnapshot,
        growth: &GrowthEstimate,
        quality: &EarningsQuality,
    ) -> Result<ValuationBand, ValuationError> {
        let policy = self.config.peg_policy;
        if quality.is_polluted() {
            if let (Some(forward_pe), Some(forward_eps)) = (snapshot.forward_pe(), snapshot.forward_eps()) {
                return forward_peg_band(forward_pe, growth.blended_pct, forward_eps, policy);
            }
        }
        peg_band(
            snapshot.trailing_pe.unwrap_or(0.0),
            growth.blended_pct,
            snapshot.trailing_eps.unwrap_or(0.0),
            policy,
        )
    }
}
