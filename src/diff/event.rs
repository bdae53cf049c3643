use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::diff_thresholds;
use crate::diff::field::compare_field;
use crate::diff::market::diff_market;
use crate::types::{Event, EventDifferenceRecord, FieldDelta, Market, MarketDetail};

/// Diff one event pair and every market present on both sides.
/// Returns a record when any event field or any nested market changed.
pub fn diff_event(
    stored: &Event,
    fresh: &Event,
    details: &HashMap<String, MarketDetail>,
    compared_at: i64,
) -> Option<EventDifferenceRecord> {
    if stored.id != fresh.id {
        return None;
    }

    let event_fields = [
        ("volume", stored.volume, fresh.volume, diff_thresholds::EVENT_VOLUME),
        ("volume24hr", stored.volume_24hr, fresh.volume_24hr, diff_thresholds::EVENT_VOLUME_24HR),
        ("liquidity", stored.liquidity, fresh.liquidity, diff_thresholds::EVENT_LIQUIDITY),
        (
            "liquidity_clob",
            stored.liquidity_clob,
            fresh.liquidity_clob,
            diff_thresholds::EVENT_LIQUIDITY_CLOB,
        ),
    ];
    let fields: BTreeMap<String, FieldDelta> = event_fields
        .into_iter()
        .filter_map(|(name, old, new, threshold)| {
            compare_field(Some(old), Some(new), threshold).map(|d| (name.to_string(), d))
        })
        .collect();

    let fresh_markets = index_markets(&fresh.markets);
    let markets: Vec<_> = matched_markets(&stored.markets, &fresh_markets)
        .filter_map(|(s, f)| diff_market(s, f, details.get(&s.id), compared_at))
        .collect();

    if fields.is_empty() && markets.is_empty() {
        return None;
    }

    Some(EventDifferenceRecord {
        event_id: stored.id.clone(),
        fields,
        markets,
        compared_at,
    })
}

/// Market id → market. A repeated id keeps its first occurrence.
pub(crate) fn index_markets(markets: &[Market]) -> HashMap<&str, &Market> {
    let mut index = HashMap::with_capacity(markets.len());
    for m in markets {
        index.entry(m.id.as_str()).or_insert(m);
    }
    index
}

/// Stored/fresh market pairs sharing an id, in stored order. One-sided markets are skipped.
pub(crate) fn matched_markets<'a>(
    stored: &'a [Market],
    fresh: &'a HashMap<&'a str, &'a Market>,
) -> impl Iterator<Item = (&'a Market, &'a Market)> + 'a {
    let mut seen: HashSet<&'a str> = HashSet::new();
    stored.iter().filter_map(move |s| {
        if !seen.insert(s.id.as_str()) {
            return None;
        }
        fresh.get(s.id.as_str()).map(|f| (s, *f))
    })
}
