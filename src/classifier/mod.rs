pub mod keywords;

use tracing::debug;

use crate::config::retention;
use crate::types::{ClassificationResult, Event, EventAttributes, Market};

pub use keywords::KeywordRules;
use keywords::matches_any;

/// Keyword classifier over an event's title, description and category.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: KeywordRules,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(KeywordRules::default())
    }
}

impl Classifier {
    pub fn new(rules: KeywordRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &KeywordRules {
        &self.rules
    }

    /// Exclusion is checked first and wins over every other match. Events that
    /// are not excluded must also match one of the us/fed/crypto/war lists to
    /// be relevant; only relevant events get topical flags.
    pub fn classify(&self, attrs: &EventAttributes<'_>) -> ClassificationResult {
        let text = format!("{} {} {}", attrs.title, attrs.description, attrs.category).to_lowercase();

        if matches_any(&text, &self.rules.exclude) {
            return ClassificationResult {
                is_excluded: true,
                ..ClassificationResult::default()
            };
        }

        if !self.is_eligible(&text) {
            return ClassificationResult::default();
        }

        ClassificationResult {
            is_financial: matches_any(&text, &self.rules.financial),
            is_crypto: matches_any(&text, &self.rules.crypto),
            is_big_event: matches_any(&text, &self.rules.big_event),
            is_excluded: false,
            is_relevant: true,
        }
    }

    /// US-specific, Fed, crypto or war/conflict vocabulary. `text` is already lowercase.
    fn is_eligible(&self, text: &str) -> bool {
        matches_any(text, &self.rules.us)
            || matches_any(text, &self.rules.fed)
            || matches_any(text, &self.rules.crypto)
            || matches_any(text, &self.rules.war)
    }

    /// Filters a raw fetch down to the events worth storing: active, at or
    /// above the volume floor, not excluded and eligible. Retained events carry
    /// their flags and only the markets clearing the market floors.
    pub fn retain_events(&self, events: Vec<Event>) -> (Vec<Event>, RetentionStats) {
        let mut stats = RetentionStats {
            fetched: events.len(),
            ..RetentionStats::default()
        };
        let mut retained = Vec::new();

        for mut event in events {
            if !event.active {
                stats.inactive += 1;
                continue;
            }
            if event.volume < retention::MIN_EVENT_VOLUME {
                stats.below_floor += 1;
                continue;
            }

            let result = self.classify(&event.attributes());
            if result.is_excluded {
                debug!(event_id = %event.id, title = %event.title, "Excluded by keyword");
                stats.excluded += 1;
                continue;
            }
            if !result.is_relevant {
                stats.ineligible += 1;
                continue;
            }

            let before = event.markets.len();
            event.markets.retain(market_clears_floor);
            stats.markets_dropped += before - event.markets.len();
            aggregate_market_totals(&mut event);

            event.classification = result;
            retained.push(event);
        }

        stats.retained = retained.len();
        (retained, stats)
    }
}

fn market_clears_floor(m: &Market) -> bool {
    m.volume_24hr >= retention::MIN_MARKET_VOLUME_24HR && m.volume >= retention::MIN_MARKET_VOLUME
}

/// Replace event volume/liquidity with the sums over its kept markets when positive.
fn aggregate_market_totals(event: &mut Event) {
    let volume: f64 = event.markets.iter().map(|m| m.volume).sum();
    let liquidity: f64 = event.markets.iter().map(|m| m.liquidity).sum();
    if volume > 0.0 {
        event.volume = volume;
    }
    if liquidity > 0.0 {
        event.liquidity = liquidity;
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetentionStats {
    pub fetched: usize,
    pub inactive: usize,
    pub below_floor: usize,
    pub excluded: usize,
    pub ineligible: usize,
    pub retained: usize,
    pub markets_dropped: usize,
}

/// Totals over one retained batch, written to `sync_log`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SyncSummary {
    pub total_events: usize,
    pub financial_events: usize,
    pub crypto_events: usize,
    pub politics_war_events: usize,
    pub total_volume: f64,
    pub total_liquidity: f64,
}

impl SyncSummary {
    pub fn from_events(events: &[Event]) -> Self {
        events.iter().fold(Self::default(), |mut s, e| {
            s.total_events += 1;
            s.financial_events += usize::from(e.classification.is_financial);
            s.crypto_events += usize::from(e.classification.is_crypto);
            s.politics_war_events += usize::from(e.classification.is_big_event);
            s.total_volume += e.volume;
            s.total_liquidity += e.liquidity;
            s
        })
    }
}
