use crate::error::ConfigError;
use chrono::Duration;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub market_data: MarketDataSettings,
    #[serde(default)]
    pub tickers: TickerUniverse,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub analytics: AnalyticsSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where the HTTP server listens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Token signing and password hashing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HMAC secret for access tokens. Usually supplied via `JWT_SECRET_KEY`.
    pub jwt_secret: String,
    /// Lifetime of an access token, in seconds.
    pub token_ttl_secs: i64,
    /// bcrypt work factor (4..=31).
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// PostgreSQL connection string. Usually supplied via `DATABASE_URL`.
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Upstream market data provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketDataSettings {
    pub base_url: String,
    /// Bar interval requested from the provider (e.g., "1mo").
    pub interval: String,
    pub user_agent: String,
    /// Optional HTTP timeout. Unset means requests wait indefinitely.
    pub timeout_secs: Option<u64>,
}

/// The fixed set of symbols the service will serve.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TickerUniverse {
    pub allowed: Vec<String>,
    pub benchmark: String,
}

/// Read-through cache policy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    /// Maximum age of a cached series before it is refetched.
    /// Unset means cached entries are served forever.
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Annual risk-free rate used by the Sharpe ratio (0.03 = 3%).
    pub risk_free_rate: f64,
    /// Number of return periods per year (12 for monthly bars).
    pub periods_per_year: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`.
    pub filter: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

/// Upper bound for `auth.token_ttl_secs` (one year).
pub const MAX_TOKEN_TTL_SECS: i64 = 366 * 24 * 60 * 60;
/// Upper bound for `cache.ttl_secs` (ten years).
pub const MAX_CACHE_TTL_SECS: u64 = 10 * 366 * 24 * 60 * 60;

// --- Default Implementations ---
// Every section except the token secret can be omitted from config.toml.

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: 3600,
            bcrypt_cost: 12,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

impl Default for MarketDataSettings {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            interval: "1mo".to_string(),
            user_agent: "Mozilla/5.0 (compatible; tickerlens/0.1)".to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for TickerUniverse {
    fn default() -> Self {
        Self {
            allowed: ["AAPL", "NVDA", "MSFT", "AMZN", "META"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            benchmark: "^NDX".to_string(),
        }
    }
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.03,
            periods_per_year: 12,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            directory: None,
            file_prefix: "tickerlens.log".to_string(),
        }
    }
}

impl AuthSettings {
    /// Token lifetime as a duration.
    pub fn token_ttl(&self) -> Result<Duration, ConfigError> {
        Duration::try_seconds(self.token_ttl_secs).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "auth.token_ttl_secs {} is out of range",
                self.token_ttl_secs
            ))
        })
    }
}

impl CacheSettings {
    /// Maximum cache entry age as a duration, `None` when entries never expire.
    pub fn ttl(&self) -> Result<Option<Duration>, ConfigError> {
        self.ttl_secs
            .map(|secs| {
                i64::try_from(secs)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .ok_or_else(|| {
                        ConfigError::ValidationError(format!("cache.ttl_secs {secs} is out of range"))
                    })
            })
            .transpose()
    }
}

impl TickerUniverse {
    /// True for any allowed ticker or the benchmark.
    pub fn contains(&self, ticker: &str) -> bool {
        self.benchmark == ticker || self.allowed.iter().any(|t| t == ticker)
    }

    /// The allowed tickers followed by the benchmark, in configuration order.
    pub fn all(&self) -> Vec<String> {
        let mut all = self.allowed.clone();
        all.push(self.benchmark.clone());
        all
    }
}

impl Settings {
    /// Checks invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must be set (or JWT_SECRET_KEY exported)".to_string(),
            ));
        }
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&self.auth.token_ttl_secs) {
            return Err(ConfigError::ValidationError(format!(
                "auth.token_ttl_secs must be between 1 and {MAX_TOKEN_TTL_SECS}, got {}",
                self.auth.token_ttl_secs
            )));
        }
        if let Some(secs) = self.cache.ttl_secs.filter(|secs| *secs > MAX_CACHE_TTL_SECS) {
            return Err(ConfigError::ValidationError(format!(
                "cache.ttl_secs must be at most {MAX_CACHE_TTL_SECS}, got {secs}"
            )));
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::ValidationError(format!(
                "auth.bcrypt_cost must be between 4 and 31, got {}",
                self.auth.bcrypt_cost
            )));
        }
        if self.tickers.allowed.is_empty() {
            return Err(ConfigError::ValidationError(
                "tickers.allowed must list at least one ticker".to_string(),
            ));
        }
        if self.tickers.benchmark.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "tickers.benchmark must be set".to_string(),
            ));
        }
        if self.tickers.allowed.contains(&self.tickers.benchmark) {
            return Err(ConfigError::ValidationError(format!(
                "benchmark {} must not also appear in tickers.allowed",
                self.tickers.benchmark
            )));
        }
        if self.analytics.periods_per_year == 0 {
            return Err(ConfigError::ValidationError(
                "analytics.periods_per_year must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
