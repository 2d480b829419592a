use std::fmt::Write;

use valuation_core::{MethodOutcome, ValuationBand};
use valuation_engine::{RecentSearches, ValuationReport};

fn money(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("${v:.2}"))
}

fn ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.2}"))
}

fn band_line(band: &ValuationBand) -> String {
    let mut line = format!(
        "{}: ${:.2} - ${:.2} (mid ${:.2})",
        band.method.to_label(),
        band.low,
        band.high,
        band.mid
    );
    if let (Some(vl), Some(vh)) = (band.very_low, band.very_high) {
        let _ = write!(line, ", extended ${vl:.2} - ${vh:.2}");
    }
    line
}

/// Human-readable report for the terminal.
pub fn report_text(report: &ValuationReport) -> String {
    let s = &report.snapshot;
    let mut out = String::new();

    let _ = writeln!(out, "{} ({})", report.name, report.ticker);
    let _ = writeln!(out, "  Price:        ${:.2}", report.price);
    let _ = writeln!(out, "  EPS (TTM):    {}", ratio(s.trailing_eps()));
    let _ = writeln!(out, "  EPS (fwd):    {}", ratio(s.forward_eps()));
    let _ = writeln!(out, "  P/E (TTM):    {}", ratio(s.trailing_pe()));
    let _ = writeln!(out, "  P/E (fwd):    {}", ratio(s.forward_pe()));
    let _ = writeln!(out, "  P/FCF:        {}", ratio(s.price_to_fcf));
    let _ = writeln!(out, "  Target (mean): {}", money(s.target_mean_price));
    let _ = writeln!(out, "  PEG:          {}", ratio(report.current_peg));
    if let Some(tier) = report.peg_tier {
        let _ = writeln!(out, "  PEG tier:     {}", tier.to_label());
    }

    let _ = writeln!(out, "  Valuation:");
    for outcome in [&report.historical_pe, &report.peg] {
        match outcome {
            MethodOutcome::Applicable { band } => {
                let _ = writeln!(out, "    {}", band_line(band));
            }
            MethodOutcome::NotApplicable { reason } => {
                let _ = writeln!(out, "    N/A: {reason}");
            }
        }
    }
    match &report.aggregate {
        Some(agg) => {
            let _ = writeln!(
                out,
                "    Average: ${:.2} - ${:.2} (mid ${:.2})",
                agg.low, agg.high, agg.mid
            );
        }
        None => {
            let _ = writeln!(out, "    Average: insufficient data");
        }
    }

    let _ = writeln!(out, "  Notes:");
    for note in &report.notes {
        let _ = writeln!(out, "    - {note}");
    }
    out
}

/// Recent-search table, most recent first.
pub fn recent_text(recent: &RecentSearches) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Recent searches:");
    let _ = writeln!(out, "  {:<8} {:<28} {:>10} {:>8} {:>10}", "Ticker", "Name", "Price", "P/E", "Mid");
    for e in recent.entries() {
        let _ = writeln!(
            out,
            "  {:<8} {:<28} {:>10} {:>8} {:>10}",
            e.ticker,
            e.name.chars().take(28).collect::<String>(),
            money(e.price),
            ratio(e.trailing_pe),
            money(e.valuation_mid)
        );
    }
    out
}
