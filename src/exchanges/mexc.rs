use super::MarketData;
use crate::config::Config;
use crate::errors::ExchangeError;
use crate::models::{FundingEvent, KlineColumns, TimeRange};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Envelope shared by every contract API response.
/// Failures arrive as HTTP 200 with `success: false`.
#[derive(Debug, Deserialize)]
struct MexcResponse<T> {
    success: bool,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> MexcResponse<T> {
    fn into_data(self) -> Result<Option<T>, ExchangeError> {
        if !self.success {
            return Err(ExchangeError::Api {
                code: self.code,
                message: self.message.unwrap_or_else(|| "no message".to_string()),
            });
        }
        Ok(self.data)
    }
}

pub struct Mexc {
    client: reqwest::Client,
    base_url: String,
    funding_page_size: u32,
    funding_timeout: Duration,
    kline_timeout: Duration,
}

impl Mexc {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            funding_page_size: config.funding_page_size,
            funding_timeout: config.funding_timeout,
            kline_timeout: config.kline_timeout,
        }
    }

    /// Funding bounds stay in milliseconds.
    fn funding_url(&self, symbol: &str, range: TimeRange) -> String {
        format!(
            "{}/api/v1/contract/funding_rate/history?symbol={}&page_size={}&start_time={}&end_time={}",
            self.base_url,
            symbol,
            self.funding_page_size,
            range.start(),
            range.end()
        )
    }

    /// Kline bounds are in seconds; the symbol goes in the path as well.
    fn kline_url(&self, symbol: &str, start_secs: i64, end_secs: i64) -> String {
        format!(
            "{}/api/v1/contract/kline/{symbol}?symbol={symbol}&interval=Min1&start={start_secs}&end={end_secs}",
            self.base_url
        )
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<MexcResponse<T>, ExchangeError> {
        let body = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(serde_json::from_str(&body)?)
    }
}

/// `data` is either the bare list or a page object wrapping it in `resultList`.
fn funding_records(data: Option<Value>) -> Result<Vec<FundingEvent>, ExchangeError> {
    let items = match data {
        Some(Value::Array(items)) => items,
        Some(Value::Object(mut page)) => match page.remove("resultList") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ExchangeError::UnexpectedData(
                    "funding page has no resultList".to_string(),
                ));
            }
        },
        Some(other) => {
            return Err(ExchangeError::UnexpectedData(format!(
                "funding data is neither list nor page: {other}"
            )));
        }
        None => {
            return Err(ExchangeError::UnexpectedData(
                "funding response has no data".to_string(),
            ));
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(fields) => Ok(FundingEvent(fields)),
            other => Err(ExchangeError::UnexpectedData(format!(
                "funding record is not an object: {other}"
            ))),
        })
        .collect()
}

/// An absent `data` or an empty `time` column is the end-of-data signal.
fn kline_page(data: Option<KlineColumns>) -> Option<KlineColumns> {
    data.filter(|columns| !columns.is_empty())
}

#[async_trait]
impl MarketData for Mexc {
    fn name(&self) -> &'static str {
        "mexc"
    }

    /// Hits the funding_rate/history endpoint once for the whole range.
    async fn fetch_funding_history(
        &self,
        symbol: &str,
        range: TimeRange,
    ) -> Result<Vec<FundingEvent>, ExchangeError> {
        let url = self.funding_url(symbol, range);
        tracing::debug!("[{}] GET {url}", self.name());

        let response: MexcResponse<Value> = self.get(&url, self.funding_timeout).await?;
        funding_records(response.into_data()?)
    }

    async fn fetch_kline_page(
        &self,
        symbol: &str,
        start_secs: i64,
        end_secs: i64,
    ) -> Result<Option<KlineColumns>, ExchangeError> {
        let url = self.kline_url(symbol, start_secs, end_secs);
        tracing::debug!("[{}] GET {url}", self.name());

        let response: MexcResponse<KlineColumns> = self.get(&url, self.kline_timeout).await?;
        Ok(kline_page(response.into_data()?))
    }
}
