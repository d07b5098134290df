use analytics::AnalyticsError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use database::DbError;
use market_data::MarketDataError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),
    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The error-kind to HTTP status table.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::MarketData(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Analytics(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message sent to the client. Server-side failures get a fixed
    /// message; their detail only goes to the log.
    fn client_message(&self) -> String {
        match self {
            AppError::Validation(message)
            | AppError::Unauthorized(message)
            | AppError::Conflict(message) => message.clone(),
            AppError::MarketData(_) => "Failed to retrieve market data".to_string(),
            AppError::Analytics(_) => "Failed to compute analytics".to_string(),
            AppError::Database(_) => "An internal database error occurred".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed.");
        } else {
            tracing::debug!(error = %self, %status, "Request rejected.");
        }

        let body = Json(json!({ "error": self.client_message() }));
        (status, body).into_response()
    }
}
