use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

mod api;
mod config;
mod dashboard;
mod db;
mod leagues;
mod predictor;
mod report;
mod telegram;

use api::{ApiError, FootballApiClient};
use config::{Config, Mode};
use dashboard::AppState;
use db::Database;
use predictor::MatchPredictor;
use telegram::{BotHandler, TelegramClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;
    let leagues = leagues::select(&config.leagues)?;

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    if config.mode == Mode::Serve {
        return serve(&config, db, leagues).await;
    }

    let api_key = config.resolve_api_key().context("No API key found")?;
    let client = FootballApiClient::new(
        &config.football_api_url,
        &config.football_api_host,
        &api_key,
        config.max_retries,
    )?;
    if config.skip_verify {
        warn!("Skipping API connection check");
    } else if let Err(e) = client.verify_connection().await {
        if let Some(ApiError::AccessDenied) = e.downcast_ref::<ApiError>() {
            error!("Check that the API key is valid and the subscription is active");
        }
        return Err(e);
    }

    let predictor = MatchPredictor::new(
        Arc::new(client),
        predictor::model_for(config.model),
        config.h2h_limit,
    );
    info!("Using the {} prediction model", predictor.model_name());

    if config.mode == Mode::Bot {
        run_bot(&config, db, predictor, leagues).await
    } else {
        run_predictions(&config, &db, &predictor, &leagues).await
    }
}

/// One-shot analysis: save JSON, store rows, print the console summary.
async fn run_predictions(
    config: &Config,
    db: &Database,
    predictor: &MatchPredictor,
    leagues: &[leagues::League],
) -> Result<()> {
    let today = Utc::now().date_naive();
    let predictions = predictor.analyze(leagues, config.days_ahead, today).await;
    let reports = report::build_reports(&predictions);

    if !reports.is_empty() {
        report::save_predictions(&reports, &config.output_file)?;
        let stored = db.store_all(&reports)?;
        info!("Stored {} prediction(s)", stored);
    }
    report::print_summary(&reports);
    Ok(())
}

async fn run_bot(
    config: &Config,
    db: Database,
    predictor: MatchPredictor,
    leagues: Vec<leagues::League>,
) -> Result<()> {
    let token = config
        .telegram_bot_token
        .as_deref()
        .context("TELEGRAM_BOT_TOKEN is required in bot mode")?;
    let client = TelegramClient::new(
        &config.telegram_api_url,
        token,
        config.telegram_poll_timeout_secs,
    )?;

    let username = match client.get_me().await {
        Ok(name) => name,
        Err(e) => {
            warn!("Could not fetch bot username: {:#}", e);
            String::new()
        }
    };
    info!("Starting bot @{}", username);

    let handler = BotHandler::new(
        Arc::new(client.clone()),
        Arc::new(predictor),
        leagues,
        config.days_ahead,
        Some(db),
    )
    .with_username(username);

    telegram::run_bot(client, Arc::new(handler), config.telegram_poll_timeout_secs).await;
    Ok(())
}

async fn serve(config: &Config, db: Database, leagues: Vec<leagues::League>) -> Result<()> {
    let app = dashboard::router(AppState { db, leagues });
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
