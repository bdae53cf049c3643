pub mod event;
pub mod field;
pub mod market;

use std::collections::HashMap;
use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::types::{Event, EventDifferenceRecord, MarketDetail, Snapshot};

pub use event::diff_event;
pub use field::compare_field;
pub use market::{diff_market, diff_outcome_prices};

/// Optional per-market enrichment used for open interest and best bid/ask.
pub trait MarketDetailSource {
    /// `None` means no detail is available; the optional comparisons are skipped.
    fn fetch_market_detail(
        &self,
        market_id: &str,
    ) -> impl Future<Output = Option<MarketDetail>> + Send;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonStats {
    pub stored: usize,
    pub fresh: usize,
    /// Events present in both snapshots.
    pub compared: usize,
    /// Compared events that produced a record.
    pub changed: usize,
}

/// Compare two snapshots, stamping every record with the current time.
pub fn compare(stored: &Snapshot, fresh: &Snapshot) -> Vec<EventDifferenceRecord> {
    compare_at(stored, fresh, now_ns()).0
}

/// Compare two snapshots without market detail enrichment.
pub fn compare_at(
    stored: &Snapshot,
    fresh: &Snapshot,
    compared_at: i64,
) -> (Vec<EventDifferenceRecord>, ComparisonStats) {
    let no_details = HashMap::new();
    let fresh_index = index_events(fresh);
    let mut stats = base_stats(stored, fresh);

    let mut records = Vec::new();
    for (s, f) in matched_events(stored, &fresh_index) {
        stats.compared += 1;
        if let Some(rec) = diff_event(s, f, &no_details, compared_at) {
            records.push(rec);
        }
    }
    stats.changed = records.len();
    log_stats(&stats);
    (records, stats)
}

/// Compare two snapshots, fetching market detail for every market present on
/// both sides of each matched event. At most `concurrency` requests are in
/// flight at once.
pub async fn compare_with_details<S>(
    stored: &Snapshot,
    fresh: &Snapshot,
    source: &S,
    concurrency: usize,
    compared_at: i64,
) -> (Vec<EventDifferenceRecord>, ComparisonStats)
where
    S: MarketDetailSource + Sync,
{
    let fresh_index = index_events(fresh);
    let mut stats = base_stats(stored, fresh);

    let mut records = Vec::new();
    for (s, f) in matched_events(stored, &fresh_index) {
        stats.compared += 1;
        let details = fetch_details(s, f, source, concurrency).await;
        if let Some(rec) = diff_event(s, f, &details, compared_at) {
            records.push(rec);
        }
    }
    stats.changed = records.len();
    log_stats(&stats);
    (records, stats)
}

async fn fetch_details<S>(
    stored: &Event,
    fresh: &Event,
    source: &S,
    concurrency: usize,
) -> HashMap<String, MarketDetail>
where
    S: MarketDetailSource + Sync,
{
    let fresh_markets = event::index_markets(&fresh.markets);
    let ids: Vec<String> = event::matched_markets(&stored.markets, &fresh_markets)
        .map(|(s, _)| s.id.clone())
        .collect();
    if ids.is_empty() {
        return HashMap::new();
    }

    let details: HashMap<String, MarketDetail> = stream::iter(ids)
        .map(|id| async move {
            let detail = source.fetch_market_detail(&id).await;
            detail.map(|d| (id, d))
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|d| async move { d })
        .collect()
        .await;

    debug!(event_id = %stored.id, details = details.len(), "Fetched market details");
    details
}

fn index_events(snapshot: &Snapshot) -> HashMap<&str, &Event> {
    let mut index = HashMap::with_capacity(snapshot.len());
    for e in snapshot.events() {
        index.entry(e.id.as_str()).or_insert(e);
    }
    index
}

/// Stored events with a fresh counterpart, in stored order.
fn matched_events<'a>(
    stored: &'a Snapshot,
    fresh: &'a HashMap<&'a str, &'a Event>,
) -> impl Iterator<Item = (&'a Event, &'a Event)> + 'a {
    stored
        .events()
        .iter()
        .filter_map(move |s| fresh.get(s.id.as_str()).map(|f| (s, *f)))
}

fn base_stats(stored: &Snapshot, fresh: &Snapshot) -> ComparisonStats {
    ComparisonStats {
        stored: stored.len(),
        fresh: fresh.len(),
        ..ComparisonStats::default()
    }
}

fn log_stats(stats: &ComparisonStats) {
    info!(
        stored = stats.stored,
        fresh = stats.fresh,
        compared = stats.compared,
        changed = stats.changed,
        "Compared {} events, found {} with changes",
        stats.compared,
        stats.changed,
    );
}

pub fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::types::{ClassificationResult, Market};

    fn market(id: &str, volume: f64) -> Market {
        Market {
            id: id.to_string(),
            event_id: "e".to_string(),
            question: String::new(),
            description: None,
            end_date: None,
            active: true,
            volume,
            volume_24hr: 0.0,
            liquidity: 0.0,
            outcomes: Vec::new(),
            outcome_prices: BTreeMap::new(),
            open_interest: Some(1_000.0),
            best_bid: Some(0.40),
            best_ask: Some(0.45),
        }
    }

    fn event(id: &str, volume: f64, markets: Vec<Market>) -> Event {
        Event {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            category: None,
            end_date: None,
            resolution_source: None,
            active: true,
            volume,
            volume_24hr: 0.0,
            liquidity: 0.0,
            liquidity_clob: 0.0,
            markets,
            classification: ClassificationResult::default(),
        }
    }

    struct FixedDetails {
        details: HashMap<String, MarketDetail>,
        calls: AtomicUsize,
    }

    impl MarketDetailSource for FixedDetails {
        fn fetch_market_detail(
            &self,
            market_id: &str,
        ) -> impl Future<Output = Option<MarketDetail>> + Send {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let detail = self.details.get(market_id).cloned();
            async move { detail }
        }
    }

    #[test]
    fn unmatched_events_produce_nothing() {
        let stored = Snapshot::new(vec![event("a", 0.0, vec![]), event("b", 0.0, vec![])]);
        let fresh = Snapshot::new(vec![event("b", 50_000.0, vec![]), event("c", 90_000.0, vec![])]);
        let (records, stats) = compare_at(&stored, &fresh, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_id, "b");
        assert_eq!(stats, ComparisonStats { stored: 2, fresh: 2, compared: 1, changed: 1 });
    }

    #[test]
    fn empty_fresh_snapshot_compares_nothing() {
        let stored = Snapshot::new(vec![event("a", 0.0, vec![])]);
        let (records, stats) = compare_at(&stored, &Snapshot::empty(), 1);
        assert!(records.is_empty());
        assert_eq!(stats.compared, 0);
    }

    #[test]
    fn records_share_the_batch_timestamp() {
        let stored = Snapshot::new(vec![event("a", 0.0, vec![market("m", 0.0)]), event("b", 0.0, vec![])]);
        let fresh = Snapshot::new(vec![
            event("a", 5_000.0, vec![market("m", 500.0)]),
            event("b", 5_000.0, vec![]),
        ]);
        let (records, _) = compare_at(&stored, &fresh, 42);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.compared_at == 42));
        assert_eq!(records[0].markets[0].compared_at, 42);
    }

    #[test]
    fn compare_is_deterministic_for_fixed_timestamp() {
        let stored = Snapshot::new(vec![event("a", 0.0, vec![market("m", 0.0)])]);
        let fresh = Snapshot::new(vec![event("a", 5_000.0, vec![market("m", 500.0)])]);
        assert_eq!(compare_at(&stored, &fresh, 3).0, compare_at(&stored, &fresh, 3).0);
    }

    #[tokio::test]
    async fn details_fetched_only_for_matched_markets() {
        let stored = Snapshot::new(vec![event("a", 0.0, vec![market("m1", 0.0), market("gone", 0.0)])]);
        let fresh = Snapshot::new(vec![event("a", 0.0, vec![market("m1", 0.0), market("new", 0.0)])]);
        let source = FixedDetails {
            details: HashMap::from([(
                "m1".to_string(),
                MarketDetail { open_interest: Some(1_000.0), best_bid: Some(0.40), best_ask: Some(0.50) },
            )]),
            calls: AtomicUsize::new(0),
        };

        let (records, stats) = compare_with_details(&stored, &fresh, &source, 4, 5).await;
        assert_eq!(source.calls.load(Ordering::Relaxed), 1);
        assert_eq!(stats.changed, 1);
        let m = &records[0].markets[0];
        assert_eq!(m.market_id, "m1");
        assert_eq!(m.fields.keys().collect::<Vec<_>>(), vec!["best_ask"]);
    }

    #[tokio::test]
    async fn missing_detail_skips_optional_fields() {
        let stored = Snapshot::new(vec![event("a", 0.0, vec![market("m1", 0.0)])]);
        let fresh = stored.clone();
        let source = FixedDetails { details: HashMap::new(), calls: AtomicUsize::new(0) };
        let (records, stats) = compare_with_details(&stored, &fresh, &source, 0, 5).await;
        assert!(records.is_empty());
        assert_eq!(stats.compared, 1);
    }
}
