use crate::error::ConfigError;
use std::env;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    AnalyticsSettings, AuthSettings, CacheSettings, DatabaseSettings, LoggingSettings,
    MarketDataSettings, ServerSettings, Settings, TickerUniverse, MAX_CACHE_TTL_SECS,
    MAX_TOKEN_TTL_SECS,
};

/// Loads the application configuration.
///
/// Sources, later ones winning:
/// 1. `config.toml` in the working directory (optional), or `path` if given (required).
/// 2. Environment variables prefixed `TICKERLENS_`, nested with `__`
///    (e.g. `TICKERLENS_SERVER__PORT=8080`).
/// 3. `JWT_SECRET_KEY` and `DATABASE_URL`.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path.to_path_buf()).required(true),
        None => config::File::with_name("config").required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("TICKERLENS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("auth.jwt_secret", env::var("JWT_SECRET_KEY").ok())?
        .set_override_option("database.url", env::var("DATABASE_URL").ok())?;

    settings_from_builder(builder)
}

/// Builds and validates `Settings` from an already assembled builder.
pub fn settings_from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<Settings, ConfigError> {
    let settings = builder.build()?.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}
