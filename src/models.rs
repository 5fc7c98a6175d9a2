use crate::errors::{ExchangeError, RangeError};
use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::str::FromStr;

pub const MINUTE_MS: i64 = 60_000;

/// Half-open window `[start, end)` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    start: i64,
    end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Result<Self, RangeError> {
        if start >= end {
            return Err(RangeError::Empty { start, end });
        }
        Ok(Self { start, end })
    }

    /// The whole UTC day, ending one millisecond before the next midnight.
    pub fn for_day(day: NaiveDate) -> Result<Self, RangeError> {
        let start = day.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
        Self::new(start, start + 24 * 60 * MINUTE_MS - 1)
    }

    /// The day `days` before `today`.
    pub fn days_back(today: NaiveDate, days: u32) -> Result<Self, RangeError> {
        let day = today
            .checked_sub_days(Days::new(u64::from(days)))
            .ok_or(RangeError::OutOfCalendar { days })?;
        Self::for_day(day)
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn label(&self) -> String {
        DateTime::from_timestamp_millis(self.start)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| self.start.to_string())
    }
}

/// One-minute OHLCV bar. Decimals are written as strings so they round-trip exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub open: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub close: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub volume: Decimal,
}

/// A funding record exactly as the exchange sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FundingEvent(pub Map<String, Value>);

impl FundingEvent {
    pub fn symbol(&self) -> Option<&str> {
        self.0.get("symbol").and_then(Value::as_str)
    }

    pub fn funding_rate(&self) -> Option<Decimal> {
        match self.0.get("fundingRate")? {
            Value::Number(n) => parse_decimal(n).ok(),
            Value::String(s) => Decimal::from_str(s).ok(),
            _ => None,
        }
    }

    /// Settlement time in ms; the contract API calls it `settleTime`.
    pub fn funding_time(&self) -> Option<i64> {
        let value = self.0.get("fundingTime").or_else(|| self.0.get("settleTime"))?;
        match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Column-oriented kline page as the contract API returns it.
/// Every column must be as long as `time`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KlineColumns {
    /// Bucket open times in seconds.
    #[serde(default)]
    pub time: Vec<i64>,
    #[serde(default)]
    pub open: Vec<Number>,
    #[serde(default)]
    pub high: Vec<Number>,
    #[serde(default)]
    pub low: Vec<Number>,
    #[serde(default)]
    pub close: Vec<Number>,
    #[serde(default)]
    pub vol: Vec<Number>,
}

impl KlineColumns {
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Turns the parallel arrays into rows, converting seconds to ms.
    pub fn transpose(self) -> Result<Vec<Candle>, ExchangeError> {
        let rows = self.time.len();
        let columns = [
            ("open", self.open.len()),
            ("high", self.high.len()),
            ("low", self.low.len()),
            ("close", self.close.len()),
            ("vol", self.vol.len()),
        ];
        for (name, len) in columns {
            if len != rows {
                return Err(ExchangeError::UnexpectedData(format!(
                    "kline column {name} has {len} entries, time has {rows}"
                )));
            }
        }

        let mut candles = Vec::with_capacity(rows);
        for i in 0..rows {
            candles.push(Candle {
                timestamp: self.time[i].checked_mul(1000).ok_or_else(|| {
                    ExchangeError::UnexpectedData(format!("kline time out of range: {}", self.time[i]))
                })?,
                open: parse_decimal(&self.open[i])?,
                high: parse_decimal(&self.high[i])?,
                low: parse_decimal(&self.low[i])?,
                close: parse_decimal(&self.close[i])?,
                volume: parse_decimal(&self.vol[i])?,
            });
        }
        Ok(candles)
    }
}

/// Reads the number's original digits, so nothing passes through f64.
pub fn parse_decimal(n: &Number) -> Result<Decimal, ExchangeError> {
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| ExchangeError::UnexpectedData(format!("invalid decimal {text}: {e}")))
}

/// Everything one run collected for a symbol.
#[derive(Debug, Clone)]
pub struct CollectedDataset<T> {
    pub symbol: String,
    pub range: TimeRange,
    pub records: Vec<T>,
}

impl<T> CollectedDataset<T> {
    pub fn new(symbol: &str, range: TimeRange, records: Vec<T>) -> Self {
        Self {
            symbol: symbol.to_string(),
            range,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
