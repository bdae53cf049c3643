use std::collections::{BTreeMap, BTreeSet};

use crate::config::diff_thresholds;
use crate::diff::field::compare_field;
use crate::types::{FieldDelta, Market, MarketDetail, MarketDifferenceRecord, PriceDelta};

/// Diff one market pair. `detail` carries the fresh optional fields; when it is
/// `None`, or a value is missing on either side, that comparison is skipped.
pub fn diff_market(
    stored: &Market,
    fresh: &Market,
    detail: Option<&MarketDetail>,
    compared_at: i64,
) -> Option<MarketDifferenceRecord> {
    if stored.id != fresh.id {
        return None;
    }

    let mut fields: BTreeMap<String, FieldDelta> = BTreeMap::new();
    let mut record = |name: &str, delta: Option<FieldDelta>| {
        if let Some(d) = delta {
            fields.insert(name.to_string(), d);
        }
    };

    record(
        "volume",
        compare_field(Some(stored.volume), Some(fresh.volume), diff_thresholds::MARKET_VOLUME),
    );
    record(
        "volume24hr",
        compare_field(
            Some(stored.volume_24hr),
            Some(fresh.volume_24hr),
            diff_thresholds::MARKET_VOLUME_24HR,
        ),
    );
    record(
        "liquidity",
        compare_field(
            Some(stored.liquidity),
            Some(fresh.liquidity),
            diff_thresholds::MARKET_LIQUIDITY,
        ),
    );

    if let Some(detail) = detail {
        let optional = [
            ("open_interest", stored.open_interest, detail.open_interest, diff_thresholds::MARKET_OPEN_INTEREST),
            ("best_bid", stored.best_bid, detail.best_bid, diff_thresholds::MARKET_BEST_BID),
            ("best_ask", stored.best_ask, detail.best_ask, diff_thresholds::MARKET_BEST_ASK),
        ];
        for (name, old, new, threshold) in optional {
            if let (Some(old), Some(new)) = (old, new) {
                record(name, compare_field(Some(old), Some(new), threshold));
            }
        }
    }

    let differences = diff_outcome_prices(&stored.outcome_prices, &fresh.outcome_prices);
    let prices = (!differences.is_empty()).then(|| PriceDelta {
        old: stored.outcome_prices.clone(),
        new: fresh.outcome_prices.clone(),
        differences,
    });

    if fields.is_empty() && prices.is_none() {
        return None;
    }

    Some(MarketDifferenceRecord {
        market_id: stored.id.clone(),
        event_id: stored.event_id.clone(),
        fields,
        prices,
        compared_at,
    })
}

/// Per-key price moves over the union of outcome keys. A key missing on one
/// side reads as 0. Only moves strictly above the threshold are kept.
pub fn diff_outcome_prices(
    old: &BTreeMap<String, f64>,
    new: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let diff = new.get(key).copied().unwrap_or(0.0) - old.get(key).copied().unwrap_or(0.0);
            (diff.abs() > diff_thresholds::OUTCOME_PRICE).then(|| (key.clone(), diff))
        })
        .collect()
}
