use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use valuation_core::ValuationError;
use valuation_engine::ValuationEngine;

mod config;
mod render;
mod source;

use config::{CliConfig, OutputFormat};
use source::FileSource;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let config = CliConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Data dir: {}", config.data_dir.display());
    tracing::info!("  Growth weight: {:.2}", config.engine.growth_weight);
    tracing::info!("  Historical growth: {:?}", config.engine.historical_growth);
    tracing::info!("  PEG tiers: {:?}", config.engine.peg_policy);

    let source = FileSource::new(&config.data_dir);
    let engine = ValuationEngine::new(config.engine.clone());
    let mut recent = engine.recent_searches();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "ticker> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("reading ticker")? == 0 {
            break;
        }
        let ticker = line.trim();
        if ticker.is_empty() {
            continue;
        }
        if ticker.eq_ignore_ascii_case("quit") || ticker.eq_ignore_ascii_case("exit") {
            break;
        }

        let (result, updated) = engine.search(&source, ticker, recent);
        recent = updated;

        match result {
            Ok(report) => match config.output {
                OutputFormat::Json => {
                    writeln!(stdout, "{}", serde_json::to_string_pretty(&report)?)?;
                }
                OutputFormat::Text => {
                    writeln!(stdout, "{}", render::report_text(&report))?;
                    writeln!(stdout, "{}", render::recent_text(&recent))?;
                }
            },
            Err(e @ ValuationError::MissingPrice(_)) => {
                tracing::error!("{e}");
                writeln!(stdout, "Could not get data for {ticker}: no usable price.")?;
            }
            Err(e) => {
                tracing::error!("valuation failed: {e}");
                writeln!(stdout, "Valuation failed for {ticker}: {e}")?;
            }
        }
    }

    tracing::info!("Exiting");
    Ok(())
}
