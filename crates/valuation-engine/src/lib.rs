//! Valuation engine: turns raw fundamentals into price bands and a verdict.
//!
//! Pipeline: [`normalizer`] -> [`growth`] -> [`bands`] -> [`classifier`],
//! driven by [`ValuationEngine`].

pub mod bands;
pub mod classifier;
pub mod engine;
pub mod growth;
pub mod normalizer;
pub mod recent;

#[cfg(test)]
mod tests;

pub use bands::{aggregate, historical_pe_band, peg_band, synthesize_pe_series, PegPolicy};
pub use classifier::{classify, classify_with_quality, earnings_quality};
pub use engine::{EngineConfig, MethodVerdict, ValuationEngine, ValuationReport};
pub use growth::{estimate_growth, GrowthOptions, HistoricalGrowthMethod};
pub use normalizer::normalize;
pub use recent::{upsert_recent_search, RecentSearches};
