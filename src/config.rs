use crate::collector::RetryPolicy;
use crate::errors::ConfigError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub symbols: Vec<String>,
    /// Whole days before today (UTC) that select the target day.
    pub days_back: u32,
    pub base_url: String,
    pub funding_page_size: u32,
    /// Most candles the exchange hands back per kline call.
    pub kline_page_limit: u32,
    pub funding_timeout: Duration,
    pub kline_timeout: Duration,
    pub retry: RetryPolicy,
    pub max_pages: u32,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let kline_page_limit = 1000;
        Self {
            symbols: vec!["BTC_USDT".to_string()],
            days_back: 1,
            base_url: "https://contract.mexc.com".to_string(),
            funding_page_size: 100,
            kline_page_limit,
            funding_timeout: Duration::from_secs(10),
            kline_timeout: Duration::from_secs(20),
            retry: RetryPolicy::default(),
            max_pages: default_max_pages(kline_page_limit),
            output_dir: PathBuf::from("data"),
        }
    }
}

/// Enough iterations to walk one day twice over at the page limit.
fn default_max_pages(kline_page_limit: u32) -> u32 {
    (2 * MINUTES_PER_DAY).div_ceil(kline_page_limit.max(1)).max(16)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let symbols = match lookup("SYMBOLS") {
            Some(raw) => {
                let symbols: Vec<String> = raw
                    .split(',')
                    .map(|s| s.trim().to_uppercase())
                    .filter(|s| !s.is_empty())
                    .collect();
                if symbols.is_empty() {
                    return Err(ConfigError::Invalid {
                        name: "SYMBOLS",
                        expected: "a comma-separated list of instruments",
                        value: raw,
                    });
                }
                symbols
            }
            None => defaults.symbols,
        };

        let kline_page_limit = parse_positive(&lookup, "KLINE_PAGE_LIMIT", defaults.kline_page_limit)?;
        let max_pages = parse_positive(&lookup, "MAX_PAGES", default_max_pages(kline_page_limit))?;

        let retry = RetryPolicy {
            max_retries: parse_var(&lookup, "MAX_RETRIES", defaults.retry.max_retries)?,
            backoff: Duration::from_millis(parse_var(
                &lookup,
                "RETRY_BACKOFF_MS",
                defaults.retry.backoff.as_millis() as u64,
            )?),
        };

        Ok(Self {
            symbols,
            days_back: parse_var(&lookup, "DAYS_BACK", defaults.days_back)?,
            base_url: lookup("BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            funding_page_size: parse_positive(&lookup, "FUNDING_PAGE_SIZE", defaults.funding_page_size)?,
            kline_page_limit,
            funding_timeout: Duration::from_secs(parse_positive(
                &lookup,
                "FUNDING_TIMEOUT_SECS",
                defaults.funding_timeout.as_secs(),
            )?),
            kline_timeout: Duration::from_secs(parse_positive(
                &lookup,
                "KLINE_TIMEOUT_SECS",
                defaults.kline_timeout.as_secs(),
            )?),
            retry,
            max_pages,
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            name,
            expected: "a non-negative integer",
            value: raw,
        }),
        None => Ok(default),
    }
}

fn parse_positive<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default,
{
    let value = parse_var(lookup, name, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            name,
            expected: "greater than zero",
            value: "0".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(|_| None).unwrap();

        assert_eq!(config.symbols, vec!["BTC_USDT"]);
        assert_eq!(config.days_back, 1);
        assert_eq!(config.funding_page_size, 100);
        assert_eq!(config.kline_page_limit, 1000);
        assert_eq!(config.funding_timeout, Duration::from_secs(10));
        assert_eq!(config.kline_timeout, Duration::from_secs(20));
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.max_pages, 16);
    }

    #[test]
    fn symbols_are_trimmed_and_uppercased() {
        let config = Config::from_lookup(lookup_from(&[("SYMBOLS", " eth_usdt, btc_usdt ,")])).unwrap();
        assert_eq!(config.symbols, vec!["ETH_USDT", "BTC_USDT"]);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("DAYS_BACK", "3"),
            ("BASE_URL", "http://localhost:8080/"),
            ("KLINE_PAGE_LIMIT", "10"),
            ("MAX_RETRIES", "2"),
            ("RETRY_BACKOFF_MS", "0"),
            ("OUTPUT_DIR", "/tmp/out"),
        ]))
        .unwrap();

        assert_eq!(config.days_back, 3);
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.max_pages, 288);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.backoff, Duration::ZERO);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn garbage_numbers_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[("DAYS_BACK", "yesterday")])).unwrap_err();
        assert!(err.to_string().contains("DAYS_BACK"));

        assert!(Config::from_lookup(lookup_from(&[("KLINE_PAGE_LIMIT", "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("SYMBOLS", " , ")])).is_err());
    }
}
