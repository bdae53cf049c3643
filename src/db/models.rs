//! Database row types matching `migrations/`. Used by sqlx for typed queries.

use serde::Serialize;

#[derive(Debug, sqlx::FromRow)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub end_date: Option<String>,
    pub resolution_source: Option<String>,
    pub active: bool,
    pub volume: Option<f64>,
    pub volume24hr: Option<f64>,
    pub liquidity: Option<f64>,
    pub liquidity_clob: Option<f64>,
    pub is_financial: bool,
    pub is_crypto: bool,
    pub is_big_event: bool,
    pub is_excluded: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub struct MarketRow {
    pub id: String,
    pub event_id: String,
    pub question: String,
    pub description: Option<String>,
    pub end_date: Option<String>,
    pub active: bool,
    pub volume: Option<f64>,
    pub volume24hr: Option<f64>,
    pub liquidity: Option<f64>,
    /// JSON-encoded label list.
    pub outcomes: Option<String>,
    /// JSON-encoded outcome → price map.
    pub outcome_prices: Option<String>,
    pub open_interest: Option<f64>,
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DifferenceRow {
    pub id: i64,
    pub event_id: String,
    pub differences_data: String,
    pub compared_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MarketDifferenceRow {
    pub id: i64,
    pub market_id: String,
    pub event_id: String,
    pub differences_data: String,
    pub compared_at: i64,
    pub updated_at: i64,
}
