//! Field normalizer: raw provider record -> [`StockSnapshot`].
//!
//! Each field that providers spell several ways is resolved by an ordered
//! list of extraction strategies; the first one that yields a value wins.

use valuation_core::{positive, RawFundamentals, StockSnapshot};

type Strategy<T> = fn(&RawFundamentals) -> Option<T>;

/// Evaluate strategies left to right, first hit wins.
pub fn first_of<T>(raw: &RawFundamentals, strategies: &[Strategy<T>]) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(raw))
}

const NAME_CHAIN: [Strategy<String>; 3] = [
    |r| r.text("longName").map(str::to_string),
    |r| r.text("shortName").map(str::to_string),
    |r| r.text("symbol").map(str::to_uppercase),
];

const PRICE_CHAIN: [Strategy<f64>; 2] = [
    |r| positive(r.number("currentPrice")),
    |r| positive(r.number("regularMarketPrice")),
];

const TRAILING_PE_CHAIN: [Strategy<f64>; 2] = [
    |r| positive(r.number("trailingPE")),
    |r| implied_pe(r, "trailingEps"),
];

const FORWARD_PE_CHAIN: [Strategy<f64>; 2] = [
    |r| positive(r.number("forwardPE")),
    |r| implied_pe(r, "forwardEps"),
];

fn implied_pe(raw: &RawFundamentals, eps_key: &str) -> Option<f64> {
    let price = first_of(raw, &PRICE_CHAIN)?;
    let eps = positive(raw.number(eps_key))?;
    Some(price / eps)
}

/// Market cap over free cash flow; only meaningful when both are positive.
pub fn price_to_fcf(market_cap: Option<f64>, free_cash_flow: Option<f64>) -> Option<f64> {
    let cap = positive(market_cap)?;
    let fcf = positive(free_cash_flow)?;
    Some(cap / fcf)
}

/// Produce a fully-defaulted snapshot from a raw fundamentals record.
///
/// A snapshot without a price is still returned; callers must treat
/// `price() == None` as "no usable data" and stop there.
pub fn normalize(raw: &RawFundamentals) -> StockSnapshot {
    let ticker = raw
        .text("symbol")
        .map(str::to_uppercase)
        .unwrap_or_default();
    let name = first_of(raw, &NAME_CHAIN).unwrap_or_else(|| ticker.clone());

    let market_cap = raw.number("marketCap");
    let free_cash_flow = raw.number("freeCashflow");

    let snapshot = StockSnapshot {
        ticker,
        name,
        sector: raw.text("sector").map(str::to_string),
        industry: raw.text("industry").map(str::to_string),
        currency: raw.text("currency").map(str::to_string),

        current_price: first_of(raw, &PRICE_CHAIN),
        fifty_two_week_high: raw.number("fiftyTwoWeekHigh"),
        fifty_two_week_low: raw.number("fiftyTwoWeekLow"),

        trailing_eps: raw.number("trailingEps"),
        forward_eps: raw.number("forwardEps"),
        trailing_pe: first_of(raw, &TRAILING_PE_CHAIN),
        forward_pe: first_of(raw, &FORWARD_PE_CHAIN),
        beta: raw.number("beta"),
        market_cap,

        revenue: raw.number("totalRevenue"),
        gross_margin: raw.number("grossMargins"),
        operating_margin: raw.number("operatingMargins"),
        profit_margin: raw.number("profitMargins"),
        return_on_equity: raw.number("returnOnEquity"),
        dividend_yield: raw.number("dividendYield"),

        operating_cash_flow: raw.number("operatingCashflow"),
        free_cash_flow,
        price_to_fcf: price_to_fcf(market_cap, free_cash_flow),

        debt_to_equity: raw.number("debtToEquity"),
        current_ratio: raw.number("currentRatio"),
        quick_ratio: raw.number("quickRatio"),

        target_mean_price: raw.number("targetMeanPrice"),
        target_high_price: raw.number("targetHighPrice"),
        target_low_price: raw.number("targetLowPrice"),
        analyst_count: raw
            .number("numberOfAnalystOpinions")
            .filter(|n| *n >= 0.0 && *n <= u32::MAX as f64)
            .map(|n| n.round() as u32),

        analyst_estimated_eps: raw.number("estimatedEpsAvg"),
        quarterly_earnings_growth: raw.number("earningsQuarterlyGrowth"),
    };

    tracing::debug!(
        ticker = %snapshot.ticker,
        has_price = snapshot.price().is_some(),
        "normalized fundamentals"
    );
    snapshot
}
