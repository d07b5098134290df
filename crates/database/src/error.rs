use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load configuration for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Database query failed: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("A record with the same key already exists: {0}")]
    Conflict(String),
}
