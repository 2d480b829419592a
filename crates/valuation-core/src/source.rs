use crate::{HistoricalSeries, RawFundamentals, ValuationError};

/// Everything a data provider hands over for one ticker search.
///
/// The engine treats these as already materialized. A provider that timed out
/// or returned garbage for a piece should leave that piece empty rather than
/// fail the whole fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchedData {
    pub fundamentals: RawFundamentals,
    pub eps_history: Option<HistoricalSeries>,
    pub price_history: Option<HistoricalSeries>,
    pub pe_history: Option<HistoricalSeries>,
}

/// Seam for the I/O layer (market data client, fundamentals API, fixtures).
pub trait FundamentalsSource {
    fn fetch(&self, ticker: &str) -> Result<FetchedData, ValuationError>;
}
