use crate::error::{AppError, Result};

pub const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";

/// Default number of events requested from Gamma per run.
pub const DEFAULT_FETCH_LIMIT: usize = 500;

/// Default cap on concurrent per-market detail requests within one comparison.
pub const DEFAULT_DETAIL_CONCURRENCY: usize = 8;

/// Absolute thresholds a field change must reach to be recorded.
pub mod diff_thresholds {
    pub const MARKET_VOLUME: f64 = 100.0;
    pub const MARKET_VOLUME_24HR: f64 = 100.0;
    pub const MARKET_LIQUIDITY: f64 = 100.0;
    pub const MARKET_OPEN_INTEREST: f64 = 100.0;
    pub const MARKET_BEST_BID: f64 = 0.0001;
    pub const MARKET_BEST_ASK: f64 = 0.0001;

    pub const EVENT_VOLUME: f64 = 1000.0;
    pub const EVENT_VOLUME_24HR: f64 = 1000.0;
    pub const EVENT_LIQUIDITY: f64 = 1000.0;
    pub const EVENT_LIQUIDITY_CLOB: f64 = 1000.0;

    /// Applies to every outcome key; a key is recorded only when its move exceeds this.
    pub const OUTCOME_PRICE: f64 = 0.0001;
}

/// Fixed floors an event/market must clear to be kept during a sync.
pub mod retention {
    /// Events below this total volume are dropped before classification.
    pub const MIN_EVENT_VOLUME: f64 = 5_000_000.0;
    /// Markets below this 24h volume are dropped from a retained event.
    pub const MIN_MARKET_VOLUME_24HR: f64 = 5_000_000.0;
    /// Markets below this total volume are dropped from a retained event.
    pub const MIN_MARKET_VOLUME: f64 = 100.0;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gamma_api_url: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Events requested per fetch (FETCH_LIMIT)
    pub fetch_limit: usize,
    /// Concurrent market detail requests (DETAIL_CONCURRENCY), never below 1
    pub detail_concurrency: usize,
    /// Per-request HTTP timeout (HTTP_TIMEOUT_SECS)
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            gamma_api_url: std::env::var("GAMMA_API_URL")
                .unwrap_or_else(|_| GAMMA_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "tracker.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            fetch_limit: std::env::var("FETCH_LIMIT")
                .unwrap_or_else(|_| DEFAULT_FETCH_LIMIT.to_string())
                .parse::<usize>()
                .unwrap_or(DEFAULT_FETCH_LIMIT),
            detail_concurrency: std::env::var("DETAIL_CONCURRENCY")
                .unwrap_or_else(|_| DEFAULT_DETAIL_CONCURRENCY.to_string())
                .parse::<usize>()
                .unwrap_or(DEFAULT_DETAIL_CONCURRENCY)
                .max(1),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .unwrap_or(30),
        })
    }
}
