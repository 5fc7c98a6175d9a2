use crate::errors::ExchangeError;
use crate::models::{FundingEvent, KlineColumns, TimeRange};
use async_trait::async_trait;

pub mod mexc;

/// Read-only market data endpoints the collector walks.
#[async_trait]
pub trait MarketData: Send + Sync {
    fn name(&self) -> &'static str;

    /// One bounded request for funding events inside `range`.
    async fn fetch_funding_history(
        &self,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<FundingEvent>, ExchangeError>;

    /// One page of one-minute klines between two second-resolution bounds.
    /// `Ok(None)` means the exchange has nothing more for this window.
    async fn fetch_kline_page(
        &self,
        symbol: &str,
        start_secs: i64,
        end_secs: i64,
    ) -> Result<Option<KlineColumns>, ExchangeError>;
}
