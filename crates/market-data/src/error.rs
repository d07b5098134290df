use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Price cache error: {0}")]
    Cache(#[from] database::DbError),

    #[error("Market data provider error: {0}")]
    Provider(#[from] api_client::error::ApiError),
}
