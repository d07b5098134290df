use crate::auth::{hash_password, verify_password, AuthUser};
use crate::{error::AppError, AppState};
use analytics::{correlation_matrix, scatter, ClosePrices, CorrelationMatrix, ScatterData, SharpeReport};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::Utc;
use core_types::{NewUser, SeriesKey};
use database::DbError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `POST /api/login` and `POST /api/register`.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Both fields present and non-empty.
    fn require(self) -> Result<(String, String), AppError> {
        match (self.username, self.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok((username, password))
            }
            _ => Err(missing_credentials()),
        }
    }
}

fn missing_credentials() -> AppError {
    AppError::Validation("Missing username or password".to_string())
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Query string shared by the market data endpoints.
#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub ticker: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn missing_parameters() -> AppError {
    AppError::Validation("Missing parameters".to_string())
}

impl StockQuery {
    /// Validates presence of every parameter and membership of the ticker.
    /// An unparseable query string counts as missing parameters.
    fn extract(
        query: Result<Query<StockQuery>, QueryRejection>,
        state: &AppState,
    ) -> Result<SeriesKey, AppError> {
        let Query(query) = query.map_err(|_| missing_parameters())?;
        query.into_key(state)
    }

    fn into_key(self, state: &AppState) -> Result<SeriesKey, AppError> {
        let key = SeriesKey::new(
            self.ticker.unwrap_or_default(),
            self.start_date.unwrap_or_default(),
            self.end_date.unwrap_or_default(),
        )
        .map_err(|_| missing_parameters())?;

        if !state.tickers.contains(&key.ticker) {
            return Err(AppError::Validation("Invalid ticker".to_string()));
        }
        Ok(key)
    }
}

#[derive(Debug, Serialize)]
pub struct FetchStockResponse {
    pub data: ClosePrices,
}

#[derive(Debug, Serialize)]
pub struct CorrelationResponse {
    pub scatter_data: ScatterData,
    pub heatmap_data: CorrelationMatrix,
}

/// # POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(credentials) = payload.map_err(|_| missing_credentials())?;
    let (username, password) = credentials.require()?;

    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());
    let user = state.users.find_user(&username).await?.ok_or_else(invalid)?;
    if !verify_password(password, user.password_hash).await? {
        tracing::info!(%username, "Login rejected.");
        return Err(invalid());
    }

    let access_token = state.tokens.issue(&username, Utc::now())?;
    tracing::info!(%username, "Issued access token.");
    Ok(Json(TokenResponse { access_token }))
}

/// # POST /api/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let Json(credentials) = payload.map_err(|_| missing_credentials())?;
    let (username, password) = credentials.require()?;

    let taken = || AppError::Conflict("Username already exists".to_string());
    if state.users.find_user(&username).await?.is_some() {
        return Err(taken());
    }

    let password_hash = hash_password(password, state.bcrypt_cost).await?;
    // A concurrent registration can still win between the check and the insert.
    state
        .users
        .insert_user(NewUser {
            username: username.clone(),
            password_hash,
        })
        .await
        .map_err(|e| match e {
            DbError::Conflict(_) => taken(),
            other => other.into(),
        })?;

    tracing::info!(%username, "Registered user.");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully".to_string(),
        }),
    ))
}

/// # GET /api/fetch-stock
/// Monthly closes for one ticker, keyed by date.
pub async fn fetch_stock(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    query: Result<Query<StockQuery>, QueryRejection>,
) -> Result<Json<FetchStockResponse>, AppError> {
    let key = StockQuery::extract(query, &state)?;
    tracing::info!(username = %user.username, %key, "Fetching stock closes.");
    let series = state.stock_data.fetch(&key).await?;
    Ok(Json(FetchStockResponse {
        data: ClosePrices::from_bars(&series.records),
    }))
}

/// # GET /api/correlation
/// Scatter of the ticker against the benchmark plus the full universe heatmap.
/// Fetches every ticker in the universe on each call.
pub async fn correlation(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    query: Result<Query<StockQuery>, QueryRejection>,
) -> Result<Json<CorrelationResponse>, AppError> {
    let key = StockQuery::extract(query, &state)?;
    tracing::info!(username = %user.username, %key, "Computing correlations.");
    let universe = state.tickers.all();

    let closes: Vec<(String, ClosePrices)> = state
        .stock_data
        .fetch_many(&key, &universe)
        .await?
        .into_iter()
        .map(|series| (series.key.ticker, ClosePrices::from_bars(&series.records)))
        .collect();

    let lookup = |ticker: &str| {
        closes
            .iter()
            .find(|(name, _)| name == ticker)
            .map(|(_, c)| c)
            .ok_or_else(|| AppError::Internal(format!("{ticker} missing from universe fetch")))
    };
    let scatter_data = scatter(lookup(&key.ticker)?, lookup(&state.tickers.benchmark)?);
    let heatmap_data = correlation_matrix(&closes);

    Ok(Json(CorrelationResponse {
        scatter_data,
        heatmap_data,
    }))
}

/// # GET /api/sharpe-ratio
pub async fn sharpe_ratio(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    query: Result<Query<StockQuery>, QueryRejection>,
) -> Result<Json<SharpeReport>, AppError> {
    let key = StockQuery::extract(query, &state)?;
    tracing::info!(username = %user.username, %key, "Computing Sharpe ratio.");
    let series = state.stock_data.fetch(&key).await?;
    let report = state
        .sharpe
        .calculate(&ClosePrices::from_bars(&series.records))?;
    Ok(Json(report))
}
