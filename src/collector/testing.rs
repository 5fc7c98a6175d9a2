//! In-memory exchange doubles for collector tests.

use crate::errors::ExchangeError;
use crate::exchanges::MarketData;
use crate::models::{FundingEvent, KlineColumns, TimeRange};
use async_trait::async_trait;
use serde_json::Number;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A genuine reqwest transport error: connect to a port nobody listens on.
pub async fn connection_refused() -> ExchangeError {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let err = reqwest::Client::new()
        .get(format!("http://127.0.0.1:{port}/"))
        .send()
        .await
        .unwrap_err();
    ExchangeError::Http(err)
}

pub fn number(text: &str) -> Number {
    serde_json::from_str(text).unwrap()
}

/// Columns for the given open times (seconds); prices derive from the minute index.
pub fn columns(times: &[i64]) -> KlineColumns {
    let price = |t: &i64, offset: i64| number(&format!("{}.{:02}", 40_000 + (t / 60) % 500 + offset, t % 97));
    KlineColumns {
        time: times.to_vec(),
        open: times.iter().map(|t| price(t, 0)).collect(),
        high: times.iter().map(|t| price(t, 5)).collect(),
        low: times.iter().map(|t| price(t, -5)).collect(),
        close: times.iter().map(|t| price(t, 1)).collect(),
        vol: times.iter().map(|t| number(&format!("{}.125", t % 13))).collect(),
    }
}

/// Replays a fixed list of kline replies, recording every request.
/// Once the script runs out it answers with the end-of-data signal.
#[derive(Default)]
pub struct ScriptedExchange {
    funding: Mutex<Option<Result<Vec<FundingEvent>, ExchangeError>>>,
    pages: Mutex<VecDeque<Result<Option<KlineColumns>, ExchangeError>>>,
    pub funding_calls: Mutex<u32>,
    pub kline_calls: Mutex<Vec<(i64, i64)>>,
}

impl ScriptedExchange {
    pub fn with_funding(reply: Result<Vec<FundingEvent>, ExchangeError>) -> Self {
        let exchange = Self::default();
        *exchange.funding.lock().unwrap() = Some(reply);
        exchange
    }

    pub fn with_pages(pages: Vec<Result<Option<KlineColumns>, ExchangeError>>) -> Self {
        let exchange = Self::default();
        *exchange.pages.lock().unwrap() = pages.into();
        exchange
    }

    pub fn calls(&self) -> Vec<(i64, i64)> {
        self.kline_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketData for ScriptedExchange {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_funding_history(
        &self,
        _symbol: &str,
        _range: TimeRange,
    ) -> Result<Vec<FundingEvent>, ExchangeError> {
        *self.funding_calls.lock().unwrap() += 1;
        self.funding.lock().unwrap().take().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_kline_page(
        &self,
        _symbol: &str,
        start_secs: i64,
        end_secs: i64,
    ) -> Result<Option<KlineColumns>, ExchangeError> {
        self.kline_calls.lock().unwrap().push((start_secs, end_secs));
        self.pages.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }
}

/// Serves a continuous minute series over `[first_secs, last_secs]`,
/// at most `page_size` candles per call, like the real endpoint.
pub struct SyntheticExchange {
    pub page_size: usize,
    pub first_secs: i64,
    pub last_secs: i64,
    pub kline_calls: Mutex<Vec<(i64, i64)>>,
}

impl SyntheticExchange {
    pub fn new(page_size: usize, first_secs: i64, last_secs: i64) -> Self {
        Self {
            page_size,
            first_secs,
            last_secs,
            kline_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(i64, i64)> {
        self.kline_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketData for SyntheticExchange {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn fetch_funding_history(
        &self,
        _symbol: &str,
        _range: TimeRange,
    ) -> Result<Vec<FundingEvent>, ExchangeError> {
        Ok(Vec::new())
    }

    async fn fetch_kline_page(
        &self,
        _symbol: &str,
        start_secs: i64,
        end_secs: i64,
    ) -> Result<Option<KlineColumns>, ExchangeError> {
        self.kline_calls.lock().unwrap().push((start_secs, end_secs));

        // Buckets are minute-aligned; round the lower bound up to the next one.
        let first = start_secs.max(self.first_secs);
        let first = first + (60 - first.rem_euclid(60)) % 60;
        let last = end_secs.min(self.last_secs);

        let times: Vec<i64> = (first..=last)
            .step_by(60)
            .take(self.page_size)
            .collect();

        if times.is_empty() {
            return Ok(None);
        }
        Ok(Some(columns(&times)))
    }
}
