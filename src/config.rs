use clap::{Parser, ValueEnum};

use crate::leagues;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Analyse upcoming fixtures once, save and print the results
    Predictions,
    /// Run the Telegram chat bot
    Bot,
    /// Serve stored predictions over HTTP
    Serve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    /// Weighted goal averages and form heuristics
    Basic,
    /// Attack/defence strengths with Poisson score grids
    Enhanced,
}

/// Football match predictor with a Telegram front end
#[derive(Parser, Debug, Clone)]
#[command(name = "football-predictor", version, about)]
pub struct Config {
    /// Run mode
    #[arg(long, env = "PREDICTOR_MODE", value_enum, default_value = "predictions")]
    pub mode: Mode,

    /// Prediction model
    #[arg(long, env = "PREDICTOR_MODEL", value_enum, default_value = "basic")]
    pub model: ModelKind,

    /// API-Football key (RAPIDAPI_KEY and API_KEY are also accepted)
    #[arg(long, env = "FOOTBALL_API_KEY")]
    pub football_api_key: Option<String>,

    /// API-Football base URL
    #[arg(
        long,
        env = "FOOTBALL_API_URL",
        default_value = "https://v3.football.api-sports.io"
    )]
    pub football_api_url: String,

    /// Value sent in the x-rapidapi-host header
    #[arg(
        long,
        env = "FOOTBALL_API_HOST",
        default_value = "v3.football.api-sports.io"
    )]
    pub football_api_host: String,

    /// Attempts per API request before giving up
    #[arg(long, env = "MAX_RETRIES", default_value = "3")]
    pub max_retries: u32,

    /// Skip the start-up connectivity check against the API
    #[arg(long, env = "SKIP_VERIFY", default_value = "false")]
    pub skip_verify: bool,

    /// Telegram bot token (required in bot mode)
    #[arg(long, env = "TELEGRAM_BOT_TOKEN")]
    pub telegram_bot_token: Option<String>,

    /// Telegram Bot API base URL
    #[arg(
        long,
        env = "TELEGRAM_API_URL",
        default_value = "https://api.telegram.org"
    )]
    pub telegram_api_url: String,

    /// Long-poll timeout for Telegram getUpdates, in seconds
    #[arg(long, env = "TELEGRAM_POLL_TIMEOUT_SECS", default_value = "30")]
    pub telegram_poll_timeout_secs: u64,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "predictions.db")]
    pub database_path: String,

    /// JSON file written in predictions mode
    #[arg(long, env = "OUTPUT_FILE", default_value = "predictions.json")]
    pub output_file: String,

    /// How many days ahead to look for fixtures
    #[arg(long, env = "DAYS_AHEAD", default_value = "7")]
    pub days_ahead: u32,

    /// Number of past meetings to request for head-to-head stats
    #[arg(long, env = "H2H_LIMIT", default_value = "20")]
    pub h2h_limit: u32,

    /// Comma-separated league keys to analyse (default: all)
    #[arg(long, env = "LEAGUES", value_delimiter = ',')]
    pub leagues: Vec<String>,

    /// Dashboard listen address (serve mode)
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.resolve_api_key().is_none() && self.mode != Mode::Serve {
            anyhow::bail!(
                "No API key found. Set FOOTBALL_API_KEY (or RAPIDAPI_KEY / API_KEY)."
            );
        }
        if self.mode == Mode::Bot
            && self
                .telegram_bot_token
                .as_deref()
                .map_or(true, |t| t.trim().is_empty())
        {
            anyhow::bail!("TELEGRAM_BOT_TOKEN is required in bot mode.");
        }
        if !(1..=30).contains(&self.days_ahead) {
            anyhow::bail!("days_ahead must be between 1 and 30");
        }
        if self.max_retries == 0 {
            anyhow::bail!("max_retries must be at least 1");
        }
        if self.h2h_limit == 0 {
            anyhow::bail!("h2h_limit must be at least 1");
        }
        leagues::select(&self.leagues)?;
        Ok(())
    }

    /// First non-empty key among the flag/FOOTBALL_API_KEY, RAPIDAPI_KEY and API_KEY.
    pub fn resolve_api_key(&self) -> Option<String> {
        let from_env = |name: &str| std::env::var(name).ok();
        [
            self.football_api_key.clone(),
            from_env("RAPIDAPI_KEY"),
            from_env("API_KEY"),
        ]
        .into_iter()
        .flatten()
        .map(|k| k.trim().to_string())
        .find(|k| !k.is_empty())
    }
}
