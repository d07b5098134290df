use crate::error::DbError;
use async_trait::async_trait;
use core_types::{CachedPriceSeries, NewUser, SeriesKey, User};

/// Persistence for registered accounts.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Looks a user up by exact username.
    async fn find_user(&self, username: &str) -> Result<Option<User>, DbError>;

    /// Creates a user. Returns `DbError::Conflict` if the username is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, DbError>;
}

/// The document cache sitting in front of the market data provider.
#[async_trait]
pub trait PriceCache: Send + Sync {
    /// Exact-match lookup on (ticker, start_date, end_date).
    async fn find_series(&self, key: &SeriesKey) -> Result<Option<CachedPriceSeries>, DbError>;

    /// Stores a series, replacing any existing document under the same key.
    async fn store_series(&self, series: &CachedPriceSeries) -> Result<(), DbError>;
}
