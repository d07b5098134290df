use anyhow::Context;
use api_client::YahooFinanceClient;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use configuration::{load_settings, Settings};
use core_types::SeriesKey;
use database::{connect, run_migrations, CredentialStore, DbRepository, MemoryStore, PriceCache};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use market_data::StockDataService;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use web_server::{run_server, AppState};

/// The main entry point for the TickerLens application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets usually come from a local .env file during development.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref()).context("Failed to load configuration")?;
    // Dropping the guard flushes the file appender, so it lives as long as main.
    let _log_guard = configuration::init_tracing(&settings.logging)?;

    match cli.command {
        Commands::Serve(args) => handle_serve(args, settings).await,
        Commands::Prefetch(args) => handle_prefetch(args, settings).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Stock analytics API: cached monthly prices, correlations and Sharpe ratios.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults to ./config.toml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Warm the price series cache for a date range.
    Prefetch(PrefetchArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Keep users and cached series in process memory instead of PostgreSQL.
    #[arg(long)]
    in_memory: bool,
}

#[derive(Parser)]
struct PrefetchArgs {
    /// The start date of the range (format: YYYY-MM-DD).
    #[arg(long)]
    from: NaiveDate,

    /// The exclusive end date of the range (format: YYYY-MM-DD).
    #[arg(long)]
    to: NaiveDate,

    /// Tickers to fetch. Defaults to the whole configured universe.
    #[arg(long = "ticker")]
    tickers: Vec<String>,
}

// ==============================================================================
// Wiring
// ==============================================================================

struct Stores {
    users: Arc<dyn CredentialStore>,
    cache: Arc<dyn PriceCache>,
}

async fn open_stores(settings: &Settings, in_memory: bool) -> anyhow::Result<Stores> {
    if in_memory {
        tracing::warn!("Using the in-memory store; users and cached series are lost on exit.");
        let store = Arc::new(MemoryStore::new());
        return Ok(Stores {
            users: store.clone(),
            cache: store,
        });
    }

    let pool = connect(&settings.database)
        .await
        .context("Failed to connect to the database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database connected and migrations applied.");

    let repo = Arc::new(DbRepository::new(pool));
    Ok(Stores {
        users: repo.clone(),
        cache: repo,
    })
}

fn stock_data_service(settings: &Settings, cache: Arc<dyn PriceCache>) -> anyhow::Result<StockDataService> {
    let provider = Arc::new(YahooFinanceClient::new(&settings.market_data)?);
    Ok(StockDataService::new(cache, provider).with_ttl(settings.cache.ttl()?))
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_serve(args: ServeArgs, settings: Settings) -> anyhow::Result<()> {
    let stores = open_stores(&settings, args.in_memory).await?;
    let stock_data = stock_data_service(&settings, stores.cache)?;
    let state = Arc::new(AppState::new(&settings, stores.users, stock_data)?);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;
    run_server(addr, state).await
}

/// Fetches every requested ticker concurrently through the cache and prints
/// whether each one was already cached.
async fn handle_prefetch(args: PrefetchArgs, settings: Settings) -> anyhow::Result<()> {
    if args.from >= args.to {
        anyhow::bail!("--from ({}) must be before --to ({})", args.from, args.to);
    }

    let tickers = if args.tickers.is_empty() {
        settings.tickers.all()
    } else {
        args.tickers
    };
    if let Some(unknown) = tickers.iter().find(|t| !settings.tickers.contains(t)) {
        anyhow::bail!("{unknown} is not in the configured ticker universe");
    }

    let stores = open_stores(&settings, false).await?;
    let service = stock_data_service(&settings, stores.cache)?;
    let range = SeriesKey::new("range", args.from.to_string(), args.to.to_string())?;

    let progress_bar = ProgressBar::new(tickers.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let tasks = tickers.iter().map(|ticker| {
        let key = range.with_ticker(ticker);
        let service = service.clone();
        let pb = progress_bar.clone();
        async move {
            let result = service.fetch_with_status(&key).await;
            pb.inc(1);
            pb.set_message(format!("{} done", key.ticker));
            (key, result)
        }
    });
    let results = join_all(tasks).await;
    progress_bar.finish_with_message("Prefetch complete!");

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Ticker", "Bars", "Cache"]);

    let mut failures = 0;
    let mut upstream_calls = 0;
    for (key, result) in results {
        match result {
            Ok((series, status)) => {
                if status.fetched_upstream() {
                    upstream_calls += 1;
                }
                table.add_row(vec![
                    Cell::new(&key.ticker),
                    Cell::new(series.records.len()),
                    Cell::new(status),
                ]);
            }
            Err(e) => {
                failures += 1;
                tracing::error!(%key, error = %e, "Prefetch failed.");
                table.add_row(vec![Cell::new(&key.ticker), Cell::new("-"), Cell::new("failed")]);
            }
        }
    }
    println!("{table}");
    println!(
        "{upstream_calls} of {} tickers fetched from the provider.",
        tickers.len()
    );

    if failures > 0 {
        anyhow::bail!("{failures} of {} tickers failed to prefetch", tickers.len());
    }
    Ok(())
}
