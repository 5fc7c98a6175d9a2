mod collector;
mod config;
mod errors;
mod exchanges;
mod models;
mod sink;

use collector::{KlinePaginator, fetch_funding_history};
use config::Config;
use exchanges::MarketData;
use exchanges::mexc::Mexc;
use models::{CollectedDataset, TimeRange};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` when it parses, otherwise per-request outcomes at info.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .init();

    let config = Config::from_env()?;
    let today = chrono::Utc::now().date_naive();
    let range = TimeRange::days_back(today, config.days_back)?;

    tracing::info!(
        "Collector starting: symbols {:?}, day {} [{}, {})",
        config.symbols,
        range.label(),
        range.start(),
        range.end()
    );

    let exchange = Mexc::new(&config);

    let mut written = 0;
    for symbol in &config.symbols {
        let report = collect_symbol(&exchange, &config, symbol, range).await;
        written += [report.funding_file, report.kline_file].iter().flatten().count();
    }

    tracing::info!("Collector finished: {written} files written to {}", config.output_dir.display());
    Ok(())
}

/// What one symbol's run produced; `None` paths mean nothing was written.
#[derive(Debug, Default)]
struct SymbolReport {
    funding_file: Option<PathBuf>,
    kline_file: Option<PathBuf>,
}

/// Funding fetch, then the kline walk, then the writes. Never fails:
/// exchange and disk problems are logged and show up as missing files.
async fn collect_symbol(
    source: &dyn MarketData,
    config: &Config,
    symbol: &str,
    range: TimeRange,
) -> SymbolReport {
    // ── 1. Funding history (single request) ────────────────────────
    let funding = fetch_funding_history(source, symbol, range, &config.retry).await;
    let funding = CollectedDataset::new(symbol, range, funding);

    // ── 2. One-minute klines (paginated) ───────────────────────────
    let candles = KlinePaginator::from_config(config)
        .fetch(source, symbol, range)
        .await;
    let candles = CollectedDataset::new(symbol, range, candles);

    // ── 3. Persist whatever came back ──────────────────────────────
    let report = SymbolReport {
        funding_file: persist(config, &format!("{symbol}_funding_history"), &funding),
        kline_file: persist(config, &format!("{symbol}_kline_1m"), &candles),
    };

    tracing::info!(
        "[{symbol}] {}: {} funding events, {} candles",
        range.label(),
        funding.len(),
        candles.len()
    );
    report
}

fn persist<T: Serialize>(config: &Config, name: &str, dataset: &CollectedDataset<T>) -> Option<PathBuf> {
    if dataset.is_empty() {
        tracing::warn!("[{}] no records for {}, skipping {name}", dataset.symbol, dataset.range.label());
        return None;
    }

    match sink::write_records(&config.output_dir, name, &dataset.records) {
        Ok(path) => {
            if let Some(path) = &path {
                tracing::info!("[{}] wrote {} records to {}", dataset.symbol, dataset.len(), path.display());
            }
            path
        }
        Err(e) => {
            tracing::error!("[{}] failed to write {name}: {e}", dataset.symbol);
            None
        }
    }
}
