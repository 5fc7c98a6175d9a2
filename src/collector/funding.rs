use super::RetryPolicy;
use crate::errors::ExchangeError;
use crate::exchanges::MarketData;
use crate::models::{FundingEvent, TimeRange};

/// One bounded request for the funding events in `range`.
/// Any failure is logged and yields an empty list.
pub async fn fetch_funding_history(
    source: &dyn MarketData,
    symbol: &str,
    range: TimeRange,
    retry: &RetryPolicy,
) -> Vec<FundingEvent> {
    let name = source.name();
    let label = format!("[{name}] {symbol} funding history");

    match retry
        .run(&label, || source.fetch_funding_history(symbol, range))
        .await
    {
        Ok(events) => {
            tracing::info!("[{name}] {symbol}: {} funding events for {}", events.len(), range.label());
            for event in &events {
                tracing::debug!(
                    "[{name}] {} funding rate {:?} at {:?}",
                    event.symbol().unwrap_or(symbol),
                    event.funding_rate(),
                    event.funding_time()
                );
            }
            events
        }
        Err(ExchangeError::Api { code, message }) => {
            tracing::warn!("[{name}] {symbol} funding history rejected (code {code}): {message}");
            Vec::new()
        }
        Err(e) => {
            tracing::error!("[{name}] {symbol} funding history failed: {e}");
            Vec::new()
        }
    }
}
