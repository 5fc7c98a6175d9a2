pub mod funding;
pub mod klines;
pub mod retry;

pub use funding::fetch_funding_history;
pub use klines::KlinePaginator;
pub use retry::RetryPolicy;

#[cfg(test)]
pub(crate) mod testing;
