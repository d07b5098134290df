use analytics::SharpeCalculator;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use configuration::{error::ConfigError, Settings, TickerUniverse};
use database::CredentialStore;
use market_data::StockDataService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod auth;
pub mod error;
pub mod handlers;

pub use auth::{AuthUser, Claims, TokenIssuer};
pub use error::AppError;

/// The shared application state that all handlers can access.
/// Every external collaborator is injected here; handlers hold no globals.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn CredentialStore>,
    pub stock_data: StockDataService,
    pub tokens: TokenIssuer,
    pub tickers: TickerUniverse,
    pub sharpe: SharpeCalculator,
    pub bcrypt_cost: u32,
}

impl AppState {
    pub fn new(
        settings: &Settings,
        users: Arc<dyn CredentialStore>,
        stock_data: StockDataService,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            users,
            stock_data,
            tokens: TokenIssuer::new(&settings.auth.jwt_secret, settings.auth.token_ttl()?),
            tickers: settings.tickers.clone(),
            sharpe: SharpeCalculator::new(
                settings.analytics.risk_free_rate,
                settings.analytics.periods_per_year,
            ),
            bcrypt_cost: settings.auth.bcrypt_cost,
        })
    }
}

/// Builds the application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/login", post(handlers::login))
        .route("/api/register", post(handlers::register))
        .route("/api/fetch-stock", get(handlers::fetch_stock))
        .route("/api/correlation", get(handlers::correlation))
        .route("/api/sharpe-ratio", get(handlers::sharpe_ratio))
        .with_state(state)
        .layer(cors)
        // Logs every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(64 * 1024))
}

/// Binds `addr` and serves the API until the process is stopped.
pub async fn run_server(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
