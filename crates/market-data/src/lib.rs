//! # TickerLens Market Data
//!
//! The read-through path for monthly price series: look the exact
//! (ticker, start, end) key up in the document cache, and on a miss fetch it
//! from the upstream provider and store the full response before returning it.
//!
//! Concurrent misses for the same key are not deduplicated; both fetch and
//! both write, and the cache keeps one document.

use api_client::MarketDataProvider;
use chrono::{Duration, Utc};
use core_types::{CacheStatus, CachedPriceSeries, SeriesKey};
use database::PriceCache;
use futures::future::try_join_all;
use std::sync::Arc;

pub mod error;

pub use error::MarketDataError;

/// Serves price series through the document cache.
#[derive(Clone)]
pub struct StockDataService {
    cache: Arc<dyn PriceCache>,
    provider: Arc<dyn MarketDataProvider>,
    ttl: Option<Duration>,
}

impl StockDataService {
    /// Creates a service whose cached entries never expire.
    pub fn new(cache: Arc<dyn PriceCache>, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            cache,
            provider,
            ttl: None,
        }
    }

    /// Refetch cached entries once they are older than `ttl`.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the series for `key`, fetching and caching it on a miss.
    pub async fn fetch(&self, key: &SeriesKey) -> Result<CachedPriceSeries, MarketDataError> {
        let (series, _) = self.fetch_with_status(key).await?;
        Ok(series)
    }

    /// Like `fetch`, but also reports whether the cache satisfied the request.
    pub async fn fetch_with_status(
        &self,
        key: &SeriesKey,
    ) -> Result<(CachedPriceSeries, CacheStatus), MarketDataError> {
        let status = match self.cache.find_series(key).await? {
            Some(cached) if !self.is_stale(&cached) => {
                tracing::debug!(%key, "Price series cache hit.");
                return Ok((cached, CacheStatus::Hit));
            }
            Some(_) => CacheStatus::Refreshed,
            None => CacheStatus::Miss,
        };

        let records = self
            .provider
            .fetch_monthly_history(&key.ticker, &key.start_date, &key.end_date)
            .await?;

        let series = CachedPriceSeries::new(key.clone(), records, Utc::now());
        self.cache.store_series(&series).await?;

        tracing::info!(%key, bars = series.records.len(), %status, "Fetched price series from provider.");
        Ok((series, status))
    }

    /// Fetches the same date range for every ticker, in the order given.
    /// One request per ticker, issued concurrently; the first failure wins.
    pub async fn fetch_many(
        &self,
        range: &SeriesKey,
        tickers: &[String],
    ) -> Result<Vec<CachedPriceSeries>, MarketDataError> {
        let keys: Vec<SeriesKey> = tickers.iter().map(|t| range.with_ticker(t)).collect();
        try_join_all(keys.iter().map(|key| self.fetch(key))).await
    }

    fn is_stale(&self, cached: &CachedPriceSeries) -> bool {
        match self.ttl {
            Some(ttl) => Utc::now() - cached.fetched_at > ttl,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::error::ApiError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use core_types::PriceBar;
    use database::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a single bar whose close is the number of calls made so far,
    /// so every upstream response differs from the previous one.
    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataProvider for CountingProvider {
        async fn fetch_monthly_history(
            &self,
            symbol: &str,
            _start_date: &str,
            _end_date: &str,
        ) -> Result<Vec<PriceBar>, ApiError> {
            if symbol == "DELISTED" {
                return Err(ApiError::NoData(symbol.to_string()));
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(vec![PriceBar {
                date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                open: n as f64,
                high: n as f64,
                low: n as f64,
                close: n as f64,
                volume: 10,
            }])
        }
    }

    fn service(ttl: Option<Duration>) -> (StockDataService, Arc<MemoryStore>, Arc<CountingProvider>) {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(CountingProvider::default());
        let service = StockDataService::new(store.clone(), provider.clone()).with_ttl(ttl);
        (service, store, provider)
    }

    fn key(ticker: &str) -> SeriesKey {
        SeriesKey::new(ticker, "2023-01-01", "2024-01-01").unwrap()
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let (service, store, provider) = service(None);

        let (first, status) = service.fetch_with_status(&key("AAPL")).await.unwrap();
        assert_eq!(status, CacheStatus::Miss);

        // The provider would now answer differently; the cache must win.
        let (second, status) = service.fetch_with_status(&key("AAPL")).await.unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.cached_series_count().await, 1);
    }

    #[tokio::test]
    async fn different_date_range_is_a_separate_entry() {
        let (service, store, provider) = service(None);
        service.fetch(&key("AAPL")).await.unwrap();
        service
            .fetch(&SeriesKey::new("AAPL", "2023-01-01", "2023-12-31").unwrap())
            .await
            .unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.cached_series_count().await, 2);
    }

    #[tokio::test]
    async fn stale_entry_is_refreshed_when_ttl_is_set() {
        let (service, store, provider) = service(Some(Duration::hours(1)));

        let old = CachedPriceSeries::new(key("NVDA"), vec![], Utc::now() - Duration::hours(2));
        store.store_series(&old).await.unwrap();

        let (fresh, status) = service.fetch_with_status(&key("NVDA")).await.unwrap();
        assert_eq!(status, CacheStatus::Refreshed);
        assert_eq!(fresh.records.len(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.find_series(&key("NVDA")).await.unwrap(), Some(fresh));
    }

    #[tokio::test]
    async fn without_ttl_old_entries_are_served_forever() {
        let (service, store, provider) = service(None);

        let old = CachedPriceSeries::new(key("META"), vec![], Utc::now() - Duration::days(3650));
        store.store_series(&old).await.unwrap();

        let (served, status) = service.fetch_with_status(&key("META")).await.unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(served, old);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_failure_is_surfaced_and_nothing_is_cached() {
        let (service, store, _) = service(None);

        let err = service.fetch(&key("DELISTED")).await.unwrap_err();
        assert!(matches!(err, MarketDataError::Provider(ApiError::NoData(_))));
        assert_eq!(store.cached_series_count().await, 0);
    }

    #[tokio::test]
    async fn fetch_many_preserves_ticker_order() {
        let (service, _, _) = service(None);
        let tickers = vec!["MSFT".to_string(), "AAPL".to_string(), "^NDX".to_string()];

        let all = service.fetch_many(&key("AAPL"), &tickers).await.unwrap();
        let order: Vec<&str> = all.iter().map(|s| s.key.ticker.as_str()).collect();
        assert_eq!(order, vec!["MSFT", "AAPL", "^NDX"]);
    }
}
