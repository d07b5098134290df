use crate::error::DbError;
use crate::store::{CredentialStore, PriceCache};
use async_trait::async_trait;
use chrono::Utc;
use core_types::{CachedPriceSeries, NewUser, SeriesKey, User};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A process-local implementation of both stores.
///
/// Used by `tickerlens serve --in-memory` and by tests. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    series: RwLock<HashMap<SeriesKey, CachedPriceSeries>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached price series documents.
    pub async fn cached_series_count(&self) -> usize {
        self.series.read().await.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>, DbError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(DbError::Conflict(format!("username '{}'", user.username)));
        }
        let user = user.into_user(Utc::now());
        users.insert(user.username.clone(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl PriceCache for MemoryStore {
    async fn find_series(&self, key: &SeriesKey) -> Result<Option<CachedPriceSeries>, DbError> {
        Ok(self.series.read().await.get(key).cloned())
    }

    async fn store_series(&self, series: &CachedPriceSeries) -> Result<(), DbError> {
        self.series
            .write()
            .await
            .insert(series.key.clone(), series.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_types::PriceBar;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            password_hash: "$2b$04$hash".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.insert_user(new_user("alice")).await.unwrap();

        let err = store.insert_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        assert!(store.find_user("alice").await.unwrap().is_some());
        assert!(store.find_user("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn series_lookup_is_exact_match() {
        let store = MemoryStore::new();
        let key = SeriesKey::new("AAPL", "2023-01-01", "2023-06-01").unwrap();
        let bar = PriceBar {
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 100,
        };
        store
            .store_series(&CachedPriceSeries::new(key.clone(), vec![bar], Utc::now()))
            .await
            .unwrap();

        assert!(store.find_series(&key).await.unwrap().is_some());
        let wider = SeriesKey::new("AAPL", "2023-01-01", "2023-07-01").unwrap();
        assert!(store.find_series(&wider).await.unwrap().is_none());
        assert_eq!(store.cached_series_count().await, 1);
    }
}
