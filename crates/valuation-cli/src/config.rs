use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use valuation_engine::{EngineConfig, HistoricalGrowthMethod, PegPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Directory holding one `<TICKER>.json` file per ticker.
    pub data_dir: PathBuf,
    pub output: OutputFormat,
    pub engine: EngineConfig,
}

impl CliConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = EngineConfig::default();

        let growth_weight = match lookup("VALUATION_GROWTH_WEIGHT") {
            Some(v) => v
                .trim()
                .parse::<f64>()
                .context("VALUATION_GROWTH_WEIGHT must be a number")?,
            None => defaults.growth_weight,
        };
        if !(0.0..=1.0).contains(&growth_weight) {
            bail!("VALUATION_GROWTH_WEIGHT must be between 0 and 1, got {growth_weight}");
        }

        let historical_growth = match lookup("VALUATION_HISTORICAL_GROWTH") {
            Some(v) => parse_historical_growth(&v)?,
            None => defaults.historical_growth,
        };

        let peg_policy = match lookup("VALUATION_PEG_TIERS").as_deref().map(str::trim) {
            None | Some("three") | Some("3") => PegPolicy::ThreeTier,
            Some("five") | Some("5") => PegPolicy::FiveTier,
            Some(other) => bail!("VALUATION_PEG_TIERS must be 'three' or 'five', got '{other}'"),
        };

        let output = match lookup("VALUATION_OUTPUT").as_deref().map(str::trim) {
            None | Some("text") => OutputFormat::Text,
            Some("json") => OutputFormat::Json,
            Some(other) => bail!("VALUATION_OUTPUT must be 'text' or 'json', got '{other}'"),
        };

        let data_dir = lookup("VALUATION_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));

        Ok(Self {
            data_dir,
            output,
            engine: EngineConfig {
                growth_weight,
                historical_growth,
                peg_policy,
                ..defaults
            },
        })
    }
}

/// `eps`, `price`, or a number taken as a manual growth figure in percent.
fn parse_historical_growth(value: &str) -> Result<HistoricalGrowthMethod> {
    match value.trim().to_lowercase().as_str() {
        "eps" => Ok(HistoricalGrowthMethod::EpsCagr),
        "price" => Ok(HistoricalGrowthMethod::PriceCagr),
        other => other
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(HistoricalGrowthMethod::Manual)
            .with_context(|| {
                format!("VALUATION_HISTORICAL_GROWTH must be 'eps', 'price' or a number, got '{other}'")
            }),
    }
}
