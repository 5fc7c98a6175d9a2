use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The exchange answered but reported `success: false`.
    #[error("Exchange rejected request (code {code}): {message}")]
    Api { code: i64, message: String },

    #[error("Unexpected data from exchange: {0}")]
    UnexpectedData(String),
}

impl ExchangeError {
    /// Connection, timeout and status failures. Only these are worth retrying.
    pub fn is_transport(&self) -> bool {
        matches!(self, ExchangeError::Http(e) if !e.is_decode())
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("empty time range: start {start} >= end {end}")]
    Empty { start: i64, end: i64 },

    #[error("{days} days back falls outside the calendar")]
    OutOfCalendar { days: u32 },
}
