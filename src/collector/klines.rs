use super::RetryPolicy;
use crate::config::Config;
use crate::errors::ExchangeError;
use crate::exchanges::MarketData;
use crate::models::{Candle, MINUTE_MS, TimeRange};

/// Walks a time range one bounded kline request at a time.
///
/// Each request starts at the cursor, the minute after the last candle
/// received, and runs to the end of the range. The walk stops when the
/// cursor reaches the end, the exchange reports no more data, any call
/// fails, the cursor stops moving forward, or `max_pages` is spent.
/// Failures never surface: the caller gets whatever was collected.
#[derive(Debug, Clone)]
pub struct KlinePaginator {
    max_pages: u32,
    retry: RetryPolicy,
    /// Exchange's per-call ceiling, reported with each page.
    page_limit: u32,
}

impl KlinePaginator {
    pub fn new(max_pages: u32, retry: RetryPolicy) -> Self {
        Self {
            max_pages,
            retry,
            page_limit: 1000,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            page_limit: config.kline_page_limit,
            ..Self::new(config.max_pages, config.retry)
        }
    }

    pub async fn fetch(&self, source: &dyn MarketData, symbol: &str, range: TimeRange) -> Vec<Candle> {
        let name = source.name();
        let end = range.end();
        let end_secs = end.div_euclid(1000);

        let mut candles: Vec<Candle> = Vec::new();
        let mut cursor = range.start();
        let mut pages = 0;

        while cursor < end {
            if pages == self.max_pages {
                tracing::warn!(
                    "[{name}] {symbol} klines: stopping after {pages} pages with cursor {cursor} < end {end}"
                );
                break;
            }
            pages += 1;

            let start_secs = cursor.div_euclid(1000);
            let label = format!("[{name}] {symbol} klines from {start_secs}");

            let page = match self
                .retry
                .run(&label, || source.fetch_kline_page(symbol, start_secs, end_secs))
                .await
            {
                Ok(Some(page)) => page,
                Ok(None) => {
                    tracing::info!("[{name}] {symbol} klines: no more data after {cursor}");
                    break;
                }
                Err(e) => {
                    log_page_failure(name, symbol, cursor, &e);
                    break;
                }
            };

            let received = page.len();
            let rows = match page.transpose() {
                Ok(rows) => rows,
                Err(e) => {
                    log_page_failure(name, symbol, cursor, &e);
                    break;
                }
            };
            let Some(last_ts) = rows.last().map(|c| c.timestamp) else {
                tracing::info!("[{name}] {symbol} klines: empty page at {cursor}, stopping");
                break;
            };

            let before = candles.len();
            for candle in rows {
                let ts = candle.timestamp;
                let fresh = candles.last().is_none_or(|prev| ts > prev.timestamp);
                if ts >= cursor && ts < end && fresh {
                    candles.push(candle);
                }
            }
            tracing::info!(
                "[{name}] {symbol} klines page {pages}: {received}/{} received, {} kept, {} total",
                self.page_limit,
                candles.len() - before,
                candles.len()
            );

            let next = last_ts.saturating_add(MINUTE_MS);
            if next <= cursor {
                tracing::warn!(
                    "[{name}] {symbol} klines: cursor would not advance past {cursor}, stopping"
                );
                break;
            }
            cursor = next;
        }

        candles
    }
}

fn log_page_failure(name: &str, symbol: &str, cursor: i64, e: &ExchangeError) {
    match e {
        ExchangeError::Api { .. } => {
            tracing::warn!("[{name}] {symbol} klines stopped at {cursor}: {e}")
        }
        ExchangeError::UnexpectedData(_) | ExchangeError::Parse(_) => {
            tracing::error!("[{name}] {symbol} klines stopped at {cursor}, malformed page: {e}")
        }
        ExchangeError::Http(_) => {
            tracing::error!("[{name}] {symbol} klines stopped at {cursor}, request failed: {e}")
        }
    }
}
