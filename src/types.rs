use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Snapshot entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub end_date: Option<String>,
    pub resolution_source: Option<String>,
    pub active: bool,
    pub volume: f64,
    pub volume_24hr: f64,
    pub liquidity: f64,
    pub liquidity_clob: f64,
    pub markets: Vec<Market>,
    #[serde(default)]
    pub classification: ClassificationResult,
}

impl Event {
    /// Text fields the classifier looks at.
    pub fn attributes(&self) -> EventAttributes<'_> {
        EventAttributes {
            title: &self.title,
            description: &self.description,
            category: self.category.as_deref().unwrap_or(""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub event_id: String,
    pub question: String,
    pub description: Option<String>,
    pub end_date: Option<String>,
    pub active: bool,
    pub volume: f64,
    pub volume_24hr: f64,
    pub liquidity: f64,
    /// Ordered outcome labels, e.g. `["Yes", "No"]`.
    pub outcomes: Vec<String>,
    /// Outcome key (label or stringified index) → probability.
    pub outcome_prices: BTreeMap<String, f64>,
    pub open_interest: Option<f64>,
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
}

/// Per-market enrichment fetched separately from the event listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketDetail {
    pub open_interest: Option<f64>,
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
}

/// Point-in-time collection of events. Two snapshots are only ever compared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    events: Vec<Event>,
}

impl Snapshot {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

// ---------------------------------------------------------------------------
// Difference records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldDelta {
    pub old: f64,
    pub new: f64,
    pub difference: f64,
    /// `difference / old * 100`, or 0 when `old` is 0.
    pub percent_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDelta {
    pub old: BTreeMap<String, f64>,
    pub new: BTreeMap<String, f64>,
    /// Only the keys whose move exceeded the outcome price threshold.
    pub differences: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDifferenceRecord {
    pub market_id: String,
    pub event_id: String,
    pub fields: BTreeMap<String, FieldDelta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prices: Option<PriceDelta>,
    /// Nanosecond UTC epoch of the comparison batch.
    pub compared_at: i64,
}

impl MarketDifferenceRecord {
    /// JSON stored in `market_differences.differences_data`.
    pub fn payload(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, delta) in &self.fields {
            map.insert(name.clone(), serde_json::json!(delta));
        }
        if let Some(prices) = &self.prices {
            map.insert("prices".to_string(), serde_json::json!(prices));
        }
        serde_json::Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDifferenceRecord {
    pub event_id: String,
    pub fields: BTreeMap<String, FieldDelta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markets: Vec<MarketDifferenceRecord>,
    pub compared_at: i64,
}

impl EventDifferenceRecord {
    /// JSON stored in `data_differences.differences_data`.
    pub fn payload(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, delta) in &self.fields {
            map.insert(name.clone(), serde_json::json!(delta));
        }
        if !self.markets.is_empty() {
            map.insert("markets".to_string(), serde_json::json!(self.markets));
        }
        serde_json::Value::Object(map)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Borrowed view of the text the classifier matches against.
#[derive(Debug, Clone, Copy)]
pub struct EventAttributes<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_financial: bool,
    pub is_crypto: bool,
    pub is_big_event: bool,
    pub is_excluded: bool,
    /// Passed the exclusion check and the eligibility predicate.
    pub is_relevant: bool,
}

impl ClassificationResult {
    /// Single display label. Flags may overlap; crypto wins, then financial, then big event.
    pub fn category(&self) -> Category {
        if self.is_crypto {
            Category::Crypto
        } else if self.is_financial {
            Category::Financial
        } else if self.is_big_event {
            Category::PoliticsWar
        } else {
            Category::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Crypto,
    Financial,
    PoliticsWar,
    Other,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Crypto => "crypto",
            Category::Financial => "financial",
            Category::PoliticsWar => "politics_war",
            Category::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "crypto" => Ok(Category::Crypto),
            "financial" => Ok(Category::Financial),
            "politics_war" => Ok(Category::PoliticsWar),
            "other" => Ok(Category::Other),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(financial: bool, crypto: bool, big_event: bool) -> ClassificationResult {
        ClassificationResult {
            is_financial: financial,
            is_crypto: crypto,
            is_big_event: big_event,
            is_excluded: false,
            is_relevant: true,
        }
    }

    #[test]
    fn display_category_precedence() {
        assert_eq!(flags(true, true, true).category(), Category::Crypto);
        assert_eq!(flags(true, false, true).category(), Category::Financial);
        assert_eq!(flags(false, false, true).category(), Category::PoliticsWar);
        assert_eq!(flags(false, false, false).category(), Category::Other);
    }

    #[test]
    fn category_parses_its_display_form() {
        for c in [Category::Crypto, Category::Financial, Category::PoliticsWar, Category::Other] {
            assert_eq!(c.to_string().parse::<Category>(), Ok(c));
        }
        assert!("sports".parse::<Category>().is_err());
    }

    #[test]
    fn event_payload_nests_markets_only_when_present() {
        let delta = FieldDelta { old: 1.0, new: 2.0, difference: 1.0, percent_change: 100.0 };
        let mut record = EventDifferenceRecord {
            event_id: "e1".to_string(),
            fields: BTreeMap::from([("volume".to_string(), delta)]),
            markets: Vec::new(),
            compared_at: 7,
        };
        let payload = record.payload();
        assert_eq!(payload["volume"]["difference"], 1.0);
        assert!(payload.get("markets").is_none());

        record.markets.push(MarketDifferenceRecord {
            market_id: "m1".to_string(),
            event_id: "e1".to_string(),
            fields: BTreeMap::new(),
            prices: None,
            compared_at: 7,
        });
        let payload = record.payload();
        assert_eq!(payload["markets"][0]["market_id"], "m1");
    }
}
