use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::diff::MarketDetailSource;
use crate::error::Result;
use crate::normalize::{coerce_number, optional_number, parse_id, parse_outcome_prices, parse_string_list};
use crate::types::{ClassificationResult, Event, Market, MarketDetail, Snapshot};

/// Client for the Gamma REST API. One `reqwest::Client` per run.
#[derive(Debug, Clone)]
pub struct GammaClient {
    client: reqwest::Client,
    base_url: String,
}

impl GammaClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.gamma_api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Open events ordered by volume, descending. Transport, status and decode
    /// failures are logged and yield an empty list.
    pub async fn fetch_events(&self, limit: usize) -> Vec<Value> {
        let url = format!(
            "{}/events?limit={}&closed=false&order=volume&ascending=false",
            self.base_url, limit
        );
        match self.get_json(&url).await {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                error!("GAMMA /events response was not an array");
                Vec::new()
            }
            Err(e) => {
                error!("Error fetching events: {e}");
                Vec::new()
            }
        }
    }

    /// Fetch and parse the current event listing. Unparseable events are skipped.
    pub async fn fetch_fresh_snapshot(&self, limit: usize) -> Snapshot {
        let raw = self.fetch_events(limit).await;
        Snapshot::new(parse_gamma_events(&raw))
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}

impl MarketDetailSource for GammaClient {
    fn fetch_market_detail(
        &self,
        market_id: &str,
    ) -> impl Future<Output = Option<MarketDetail>> + Send {
        let url = format!("{}/markets/{}", self.base_url, market_id);
        async move {
            match self.get_json(&url).await {
                Ok(v) => Some(parse_market_detail(&v)),
                Err(e) => {
                    debug!("Error fetching market detail {url}: {e}");
                    None
                }
            }
        }
    }
}

/// Parse every event in a raw listing, logging and dropping the ones without an id.
pub fn parse_gamma_events(raw: &[Value]) -> Vec<Event> {
    let mut events = Vec::with_capacity(raw.len());
    for item in raw {
        match parse_gamma_event(item) {
            Some(e) => events.push(e),
            None => warn!("Skipping event without usable id: {}", truncate(&item.to_string(), 80)),
        }
    }
    events
}

pub fn parse_gamma_event(v: &Value) -> Option<Event> {
    let id = parse_id(v.get("id"))?;

    let markets = v
        .get("markets")
        .and_then(|m| m.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|m| {
                    let parsed = parse_gamma_market(m, &id);
                    if parsed.is_none() {
                        debug!(event_id = %id, "Skipping market without id");
                    }
                    parsed
                })
                .collect()
        })
        .unwrap_or_default();

    Some(Event {
        title: str_field(v, "title").unwrap_or_default(),
        description: str_field(v, "description").unwrap_or_default(),
        category: str_field(v, "category"),
        end_date: str_field(v, "endDate"),
        resolution_source: str_field(v, "resolutionSource"),
        active: v.get("active").and_then(|a| a.as_bool()).unwrap_or(true),
        volume: coerce_number(v.get("volume")),
        volume_24hr: coerce_number(v.get("volume24hr")),
        liquidity: coerce_number(v.get("liquidity")),
        liquidity_clob: coerce_number(v.get("liquidityClob")),
        markets,
        classification: ClassificationResult::default(),
        id,
    })
}

pub fn parse_gamma_market(v: &Value, event_id: &str) -> Option<Market> {
    Some(Market {
        id: parse_id(v.get("id"))?,
        event_id: event_id.to_string(),
        question: str_field(v, "question").unwrap_or_default(),
        description: str_field(v, "description"),
        end_date: str_field(v, "endDate"),
        active: v.get("active").and_then(|a| a.as_bool()).unwrap_or(true),
        volume: coerce_number(v.get("volume")),
        volume_24hr: coerce_number(v.get("volume24hr")),
        liquidity: coerce_number(v.get("liquidity")),
        outcomes: parse_string_list(v.get("outcomes")),
        outcome_prices: parse_outcome_prices(v.get("outcomePrices")),
        open_interest: optional_number(v.get("openInterest")),
        best_bid: optional_number(v.get("bestBid")),
        best_ask: optional_number(v.get("bestAsk")),
    })
}

/// Detail payloads use camelCase on Gamma but snake_case on some mirrors.
pub fn parse_market_detail(v: &Value) -> MarketDetail {
    let either = |camel: &str, snake: &str| {
        optional_number(v.get(camel)).or_else(|| optional_number(v.get(snake)))
    };
    MarketDetail {
        open_interest: either("openInterest", "open_interest"),
        best_bid: either("bestBid", "best_bid"),
        best_ask: either("bestAsk", "best_ask"),
    }
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(|s| s.as_str()).map(|s| s.to_string())
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
