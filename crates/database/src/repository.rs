use crate::error::DbError;
use crate::store::{CredentialStore, PriceCache};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{CachedPriceSeries, NewUser, PriceBar, SeriesKey, User};
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow)]
struct DbUser {
    user_id: Uuid,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        User {
            user_id: row.user_id,
            username: row.username,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

/// A row from the `price_series_cache` table.
#[derive(Debug, Clone, FromRow)]
struct DbPriceSeries {
    ticker: String,
    start_date: String,
    end_date: String,
    records: Json<Vec<PriceBar>>,
    fetched_at: DateTime<Utc>,
}

impl From<DbPriceSeries> for CachedPriceSeries {
    fn from(row: DbPriceSeries) -> Self {
        CachedPriceSeries {
            key: SeriesKey {
                ticker: row.ticker,
                start_date: row.start_date,
                end_date: row.end_date,
            },
            records: row.records.0,
            fetched_at: row.fetched_at,
        }
    }
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for DbRepository {
    async fn find_user(&self, username: &str) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, DbUser>(
            "SELECT user_id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let user = user.into_user(Utc::now());

        sqlx::query(
            "INSERT INTO users (user_id, username, password_hash, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.user_id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Conflict(format!("username '{}'", user.username))
            }
            other => other.into(),
        })?;

        Ok(user)
    }
}

#[async_trait]
impl PriceCache for DbRepository {
    async fn find_series(&self, key: &SeriesKey) -> Result<Option<CachedPriceSeries>, DbError> {
        let row = sqlx::query_as::<_, DbPriceSeries>(
            r#"
            SELECT ticker, start_date, end_date, records, fetched_at
            FROM price_series_cache
            WHERE ticker = $1 AND start_date = $2 AND end_date = $3
            "#,
        )
        .bind(&key.ticker)
        .bind(&key.start_date)
        .bind(&key.end_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CachedPriceSeries::from))
    }

    /// Upserts the document. Racing writers for the same key leave a single row.
    async fn store_series(&self, series: &CachedPriceSeries) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO price_series_cache (ticker, start_date, end_date, records, fetched_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (ticker, start_date, end_date)
            DO UPDATE SET records = EXCLUDED.records, fetched_at = EXCLUDED.fetched_at
            "#,
        )
        .bind(&series.key.ticker)
        .bind(&series.key.start_date)
        .bind(&series.key.end_date)
        .bind(Json(&series.records))
        .bind(series.fetched_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(key = %series.key, bars = series.records.len(), "Stored price series.");
        Ok(())
    }
}
