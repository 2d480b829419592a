use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keep a value only when it is strictly positive.
///
/// Providers report "unknown" as 0 often enough that a zero EPS or P/E can
/// never be trusted as a real figure.
pub fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Provider-agnostic fundamentals record, keyed by the provider's field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawFundamentals(Map<String, Value>);

impl RawFundamentals {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value. Anything but an object yields an empty record.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Numeric field. Accepts JSON numbers and numeric strings; anything else,
    /// including non-finite values, is absent.
    pub fn number(&self, key: &str) -> Option<f64> {
        let parsed = match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|v| v.is_finite())
    }

    /// Non-empty, trimmed string field.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then_some(s)
            }
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fully-defaulted view of one ticker's fundamentals.
///
/// Every numeric field is optional; `None` means unknown, never zero
/// performance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub ticker: String,
    pub name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub currency: Option<String>,

    pub current_price: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,

    pub trailing_eps: Option<f64>,
    pub forward_eps: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub beta: Option<f64>,
    pub market_cap: Option<f64>,

    pub revenue: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub profit_margin: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub dividend_yield: Option<f64>,

    pub operating_cash_flow: Option<f64>,
    pub free_cash_flow: Option<f64>,
    /// Market cap over free cash flow, only when both are positive.
    pub price_to_fcf: Option<f64>,

    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,

    pub target_mean_price: Option<f64>,
    pub target_high_price: Option<f64>,
    pub target_low_price: Option<f64>,
    pub analyst_count: Option<u32>,

    /// Analyst consensus EPS for the next fiscal period, from the
    /// fundamentals API rather than the market-data client.
    pub analyst_estimated_eps: Option<f64>,
    /// Year-over-year quarterly earnings growth as a fraction (0.12 = 12%).
    pub quarterly_earnings_growth: Option<f64>,
}

impl StockSnapshot {
    pub fn price(&self) -> Option<f64> {
        positive(self.current_price)
    }

    pub fn trailing_eps(&self) -> Option<f64> {
        positive(self.trailing_eps)
    }

    pub fn forward_eps(&self) -> Option<f64> {
        positive(self.forward_eps)
    }

    pub fn trailing_pe(&self) -> Option<f64> {
        positive(self.trailing_pe)
    }

    pub fn forward_pe(&self) -> Option<f64> {
        positive(self.forward_pe)
    }

    /// Upside from the current price to the mean analyst target, in percent.
    pub fn analyst_upside_pct(&self) -> Option<f64> {
        let price = self.price()?;
        let target = positive(self.target_mean_price)?;
        Some((target - price) / price * 100.0)
    }
}

/// One observation in a historical series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Wire form of a series point; `value` may be null for a missing period.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSeriesPoint {
    pub date: NaiveDate,
    #[serde(default)]
    pub value: Option<f64>,
}

/// Chronologically ascending series of (date, value) observations.
///
/// Gaps are tolerated: missing or non-finite values are dropped on
/// construction, and input order does not matter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<RawSeriesPoint>", into = "Vec<SeriesPoint>")]
pub struct HistoricalSeries {
    points: Vec<SeriesPoint>,
}

impl HistoricalSeries {
    pub fn new(points: impl IntoIterator<Item = SeriesPoint>) -> Self {
        let mut points: Vec<SeriesPoint> = points
            .into_iter()
            .filter(|p| p.value.is_finite())
            .collect();
        points.sort_by_key(|p| p.date);
        Self { points }
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&SeriesPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// Calendar span between first and last observation, in years.
    pub fn span_years(&self) -> Option<f64> {
        let first = self.first()?;
        let last = self.last()?;
        let days = (last.date - first.date).num_days();
        Some(days as f64 / 365.25)
    }
}

impl From<Vec<RawSeriesPoint>> for HistoricalSeries {
    fn from(raw: Vec<RawSeriesPoint>) -> Self {
        Self::new(
            raw.into_iter()
                .filter_map(|p| p.value.map(|value| SeriesPoint::new(p.date, value))),
        )
    }
}

impl From<HistoricalSeries> for Vec<SeriesPoint> {
    fn from(series: HistoricalSeries) -> Self {
        series.points
    }
}

/// Where the consensus growth figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusSource {
    ForwardEps,
    AnalystEstimate,
    QuarterlyEarningsGrowth,
    Default,
}

impl ConsensusSource {
    pub fn to_label(&self) -> &'static str {
        match self {
            ConsensusSource::ForwardEps => "forward vs trailing EPS",
            ConsensusSource::AnalystEstimate => "analyst estimated EPS",
            ConsensusSource::QuarterlyEarningsGrowth => "quarterly earnings growth",
            ConsensusSource::Default => "default",
        }
    }
}

/// Where the historical growth figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoricalSource {
    EpsCagr,
    PriceCagr,
    Manual,
    Default,
}

impl HistoricalSource {
    pub fn to_label(&self) -> &'static str {
        match self {
            HistoricalSource::EpsCagr => "EPS CAGR",
            HistoricalSource::PriceCagr => "price CAGR",
            HistoricalSource::Manual => "manual input",
            HistoricalSource::Default => "default",
        }
    }
}

/// Consensus, historical and blended growth rates, all in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthEstimate {
    pub consensus_pct: f64,
    pub consensus_source: ConsensusSource,
    pub historical_pct: f64,
    pub historical_source: HistoricalSource,
    /// Share of the blend given to consensus growth (0..=1).
    pub weight: f64,
    pub blended_pct: f64,
}

/// Method that produced a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationMethod {
    HistoricalPe,
    Peg,
    ForwardPeg,
}

impl ValuationMethod {
    pub fn to_label(&self) -> &'static str {
        match self {
            ValuationMethod::HistoricalPe => "Historical P/E",
            ValuationMethod::Peg => "PEG",
            ValuationMethod::ForwardPeg => "Forward PEG",
        }
    }

    /// Whether the method leans on trailing earnings.
    pub fn uses_trailing_earnings(&self) -> bool {
        matches!(self, ValuationMethod::HistoricalPe | ValuationMethod::Peg)
    }
}

/// Anything with a low/mid/high price range.
pub trait PriceRange {
    fn low(&self) -> f64;
    fn mid(&self) -> f64;
    fn high(&self) -> f64;
}

/// Low / mid / high price range from one method, with optional extended
/// bounds for deep-value and extreme flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationBand {
    pub method: ValuationMethod,
    pub low: f64,
    pub mid: f64,
    pub high: f64,
    pub very_low: Option<f64>,
    pub very_high: Option<f64>,
}

impl PriceRange for ValuationBand {
    fn low(&self) -> f64 {
        self.low
    }
    fn mid(&self) -> f64 {
        self.mid
    }
    fn high(&self) -> f64 {
        self.high
    }
}

/// Mean of the bands that were applicable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateBand {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
    pub methods: Vec<ValuationMethod>,
}

impl PriceRange for AggregateBand {
    fn low(&self) -> f64 {
        self.low
    }
    fn mid(&self) -> f64 {
        self.mid
    }
    fn high(&self) -> f64 {
        self.high
    }
}

/// Result of one valuation method as surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodOutcome {
    Applicable { band: ValuationBand },
    NotApplicable { reason: String },
}

impl MethodOutcome {
    pub fn band(&self) -> Option<&ValuationBand> {
        match self {
            MethodOutcome::Applicable { band } => Some(band),
            MethodOutcome::NotApplicable { .. } => None,
        }
    }
}

impl From<Result<ValuationBand, crate::ValuationError>> for MethodOutcome {
    fn from(result: Result<ValuationBand, crate::ValuationError>) -> Self {
        match result {
            Ok(band) => MethodOutcome::Applicable { band },
            Err(e) => MethodOutcome::NotApplicable {
                reason: e.to_string(),
            },
        }
    }
}

/// Why trailing earnings look distorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum PollutionSignal {
    /// Forward EPS more than 1.5x trailing EPS.
    ForwardEpsJump { ratio: f64 },
    /// Trailing P/E above 100 while forward P/E is below 50.
    TrailingPeDistorted { trailing_pe: f64, forward_pe: f64 },
}

/// Data-quality verdict on trailing earnings, independent of any band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "quality", rename_all = "snake_case")]
pub enum EarningsQuality {
    Clean,
    Polluted { signal: PollutionSignal },
}

impl EarningsQuality {
    pub fn is_polluted(&self) -> bool {
        matches!(self, EarningsQuality::Polluted { .. })
    }
}

/// Where the current price sits relative to a band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ReliabilityVerdict {
    /// Price below the low bound.
    FarBelowBand { upside_to_mid_pct: f64 },
    /// Between low and mid.
    BelowMid { discount_to_mid_pct: f64 },
    /// Between mid and high, inclusive.
    WithinBandBelowHigh { premium_to_mid_pct: f64 },
    /// Price above the high bound.
    AboveBand { premium_to_high_pct: f64 },
    /// The band rests on trailing earnings that were flagged as polluted.
    PollutionFlaggedUnreliable,
}

impl ReliabilityVerdict {
    pub fn to_label(&self) -> &'static str {
        match self {
            ReliabilityVerdict::FarBelowBand { .. } => "Undervalued",
            ReliabilityVerdict::BelowMid { .. } => "Fair value (below mid)",
            ReliabilityVerdict::WithinBandBelowHigh { .. } => "Fair value (above mid)",
            ReliabilityVerdict::AboveBand { .. } => "Overvalued",
            ReliabilityVerdict::PollutionFlaggedUnreliable => "Unreliable",
        }
    }

    /// One-line narrative for display.
    pub fn describe(&self) -> String {
        match self {
            ReliabilityVerdict::FarBelowBand { upside_to_mid_pct } => format!(
                "Undervalued: price is below the band, {upside_to_mid_pct:.1}% upside to mid (buy signal)"
            ),
            ReliabilityVerdict::BelowMid { discount_to_mid_pct } => format!(
                "Fair value: price is {discount_to_mid_pct:.1}% below mid"
            ),
            ReliabilityVerdict::WithinBandBelowHigh { premium_to_mid_pct } => format!(
                "Fair value: price is {premium_to_mid_pct:.1}% above mid, still within band"
            ),
            ReliabilityVerdict::AboveBand { premium_to_high_pct } => format!(
                "Overvalued: price is {premium_to_high_pct:.1}% above the band"
            ),
            ReliabilityVerdict::PollutionFlaggedUnreliable => {
                "Unreliable: trailing earnings look distorted, prefer forward ratios".to_string()
            }
        }
    }
}

/// Five-tier reading of a PEG ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PegTier {
    DeeplyUndervalued,
    Undervalued,
    Fair,
    Overvalued,
    SeverelyOvervalued,
}

impl PegTier {
    /// `None` for a non-positive PEG, which carries no meaning.
    pub fn from_peg(peg: f64) -> Option<Self> {
        if !peg.is_finite() || peg <= 0.0 {
            return None;
        }
        Some(match peg {
            p if p < 0.5 => PegTier::DeeplyUndervalued,
            p if p < 0.8 => PegTier::Undervalued,
            p if p < 1.2 => PegTier::Fair,
            p if p < 2.0 => PegTier::Overvalued,
            _ => PegTier::SeverelyOvervalued,
        })
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            PegTier::DeeplyUndervalued => "Deeply undervalued",
            PegTier::Undervalued => "Undervalued",
            PegTier::Fair => "Fair",
            PegTier::Overvalued => "Overvalued",
            PegTier::SeverelyOvervalued => "Severely overvalued",
        }
    }
}

/// Row of the recent-searches list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentSearchEntry {
    pub ticker: String,
    pub name: String,
    pub price: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub valuation_mid: Option<f64>,
}
