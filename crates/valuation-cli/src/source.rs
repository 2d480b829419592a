use serde::Deserialize;
use std::path::PathBuf;
use valuation_core::{FetchedData, FundamentalsSource, HistoricalSeries, RawFundamentals, ValuationError};

/// On-disk layout of a `<TICKER>.json` fixture.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TickerFile {
    fundamentals: RawFundamentals,
    eps_history: Option<HistoricalSeries>,
    price_history: Option<HistoricalSeries>,
    pe_history: Option<HistoricalSeries>,
}

/// Reads pre-fetched provider data from a directory of JSON files.
pub struct FileSource {
    data_dir: PathBuf,
}

impl FileSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn path_for(&self, ticker: &str) -> Result<PathBuf, ValuationError> {
        let valid = !ticker.is_empty()
            && ticker
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
            && !ticker.starts_with('.');
        if !valid {
            return Err(ValuationError::UpstreamFailure(format!("invalid ticker '{ticker}'")));
        }
        Ok(self.data_dir.join(format!("{}.json", ticker.to_uppercase())))
    }
}

impl FundamentalsSource for FileSource {
    fn fetch(&self, ticker: &str) -> Result<FetchedData, ValuationError> {
        let path = self.path_for(ticker.trim())?;
        let body = std::fs::read_to_string(&path).map_err(|e| {
            ValuationError::UpstreamFailure(format!("{}: {e}", path.display()))
        })?;
        let file: TickerFile = serde_json::from_str(&body).map_err(|e| {
            ValuationError::UpstreamFailure(format!("{}: {e}", path.display()))
        })?;

        tracing::debug!(path = %path.display(), "loaded ticker data");
        Ok(FetchedData {
            fundamentals: file.fundamentals,
            eps_history: file.eps_history,
            price_history: file.price_history,
            pe_history: file.pe_history,
        })
    }
}
