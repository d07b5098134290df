use crate::error::ApiError;
use async_trait::async_trait;
use chrono::NaiveDate;
use configuration::MarketDataSettings;
use core_types::PriceBar;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

pub mod error;
pub mod responses;

// --- Public API ---
pub use responses::ChartEnvelope;

/// The abstract interface for an upstream market data source.
/// Allows the stock data service to be exercised against a scripted provider.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches the monthly price history of `symbol` between two `YYYY-MM-DD` dates.
    /// The end date is exclusive.
    async fn fetch_monthly_history(
        &self,
        symbol: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<PriceBar>, ApiError>;
}

/// A concrete `MarketDataProvider` backed by the Yahoo Finance chart API.
#[derive(Clone)]
pub struct YahooFinanceClient {
    client: reqwest::Client,
    base_url: String,
    interval: String,
}

impl YahooFinanceClient {
    pub fn new(settings: &MarketDataSettings) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|e| ApiError::InvalidData(format!("Invalid user agent: {e}")))?,
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            interval: settings.interval.clone(),
        })
    }
}

/// Parses a caller-supplied date into unix seconds at midnight UTC.
fn unix_midnight(field: &str, value: &str) -> Result<i64, ApiError> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| ApiError::InvalidData(format!("{field} '{value}': {e}")))?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default())
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn fetch_monthly_history(
        &self,
        symbol: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<PriceBar>, ApiError> {
        let period1 = unix_midnight("start_date", start_date)?;
        let period2 = unix_midnight("end_date", end_date)?;
        if period2 <= period1 {
            return Err(ApiError::InvalidData(format!(
                "end_date {end_date} must be after start_date {start_date}"
            )));
        }

        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        tracing::debug!(%symbol, %start_date, %end_date, "Requesting price history.");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", self.interval.clone()),
                ("events", "history".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // The chart endpoint reports unknown symbols with a 404 and a chart.error body.
        let envelope = serde_json::from_str::<ChartEnvelope>(&text).map_err(|e| {
            if status.is_success() {
                ApiError::Deserialization(e.to_string())
            } else {
                ApiError::ApiError(format!("HTTP {status}: {text}"))
            }
        })?;

        envelope.into_bars(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_must_be_iso() {
        assert_eq!(unix_midnight("start_date", "2023-01-01").unwrap(), 1_672_531_200);
        assert!(matches!(
            unix_midnight("start_date", "01/01/2023"),
            Err(ApiError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn inverted_range_fails_before_any_request() {
        let settings = MarketDataSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            ..MarketDataSettings::default()
        };
        let client = YahooFinanceClient::new(&settings).unwrap();
        let err = client
            .fetch_monthly_history("AAPL", "2024-01-01", "2023-01-01")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidData(_)));
    }
}
