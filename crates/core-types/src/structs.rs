use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single monthly OHLCV observation as returned by the market data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// The exact-match key of a cached price series.
///
/// Dates are kept as the caller supplied them. Two requests that spell the
/// same day differently are two different cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub ticker: String,
    pub start_date: String,
    pub end_date: String,
}

impl SeriesKey {
    /// Builds a key, rejecting blank components.
    pub fn new(
        ticker: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let key = Self {
            ticker: ticker.into().trim().to_string(),
            start_date: start_date.into().trim().to_string(),
            end_date: end_date.into().trim().to_string(),
        };

        if key.ticker.is_empty() {
            return Err(CoreError::MissingValue("ticker"));
        }
        if key.start_date.is_empty() {
            return Err(CoreError::MissingValue("start_date"));
        }
        if key.end_date.is_empty() {
            return Err(CoreError::MissingValue("end_date"));
        }

        Ok(key)
    }

    /// The same date range for a different ticker.
    pub fn with_ticker(&self, ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} .. {}]", self.ticker, self.start_date, self.end_date)
    }
}

/// A price series document as stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPriceSeries {
    #[serde(flatten)]
    pub key: SeriesKey,
    pub records: Vec<PriceBar>,
    pub fetched_at: DateTime<Utc>,
}

impl CachedPriceSeries {
    pub fn new(key: SeriesKey, records: Vec<PriceBar>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            key,
            records,
            fetched_at,
        }
    }
}

/// A registered account as persisted by the credential store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    /// A salted bcrypt hash in modular crypt format. Never the raw password.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The data required to create a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn into_user(self, created_at: DateTime<Utc>) -> User {
        User {
            user_id: Uuid::new_v4(),
            username: self.username,
            password_hash: self.password_hash,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_key_rejects_blank_parts() {
        assert_eq!(
            SeriesKey::new("", "2023-01-01", "2024-01-01"),
            Err(CoreError::MissingValue("ticker"))
        );
        assert_eq!(
            SeriesKey::new("AAPL", "  ", "2024-01-01"),
            Err(CoreError::MissingValue("start_date"))
        );
        assert_eq!(
            SeriesKey::new("AAPL", "2023-01-01", ""),
            Err(CoreError::MissingValue("end_date"))
        );
    }

    #[test]
    fn with_ticker_keeps_the_date_range() {
        let key = SeriesKey::new("AAPL", "2023-01-01", "2024-01-01").unwrap();
        let other = key.with_ticker("^NDX");
        assert_eq!(other.ticker, "^NDX");
        assert_eq!(other.start_date, key.start_date);
        assert_eq!(other.end_date, key.end_date);
    }

    #[test]
    fn cached_series_serializes_key_inline() {
        let key = SeriesKey::new("MSFT", "2023-01-01", "2023-03-01").unwrap();
        let series = CachedPriceSeries::new(key, vec![], Utc::now());
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json["ticker"], "MSFT");
        assert_eq!(json["start_date"], "2023-01-01");
        assert!(json["records"].as_array().unwrap().is_empty());
    }
}
