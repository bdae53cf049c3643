use std::collections::HashMap;

use serde_json::Value;
use sqlx::SqlitePool;
use tracing::info;

use crate::classifier::SyncSummary;
use crate::db::models::{EventRow, MarketRow};
use crate::diff::now_ns;
use crate::error::Result;
use crate::normalize::{parse_outcome_prices, parse_string_list};
use crate::types::{ClassificationResult, Event, Market, Snapshot};

/// Reads and writes the stored side of a comparison.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    pool: SqlitePool,
}

impl SnapshotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert events and their markets. Each event is written with its markets
    /// in one transaction.
    pub async fn save_snapshot(&self, events: &[Event]) -> Result<usize> {
        let now = now_ns();
        let mut markets = 0usize;

        for event in events {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                r#"
                INSERT INTO events (
                    id, title, description, category, end_date, resolution_source, active,
                    volume, volume24hr, liquidity, liquidity_clob,
                    is_financial, is_crypto, is_big_event, is_excluded,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    category = excluded.category,
                    end_date = excluded.end_date,
                    resolution_source = excluded.resolution_source,
                    active = excluded.active,
                    volume = excluded.volume,
                    volume24hr = excluded.volume24hr,
                    liquidity = excluded.liquidity,
                    liquidity_clob = excluded.liquidity_clob,
                    is_financial = excluded.is_financial,
                    is_crypto = excluded.is_crypto,
                    is_big_event = excluded.is_big_event,
                    is_excluded = excluded.is_excluded,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&event.id)
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.category)
            .bind(&event.end_date)
            .bind(&event.resolution_source)
            .bind(event.active)
            .bind(event.volume)
            .bind(event.volume_24hr)
            .bind(event.liquidity)
            .bind(event.liquidity_clob)
            .bind(event.classification.is_financial)
            .bind(event.classification.is_crypto)
            .bind(event.classification.is_big_event)
            .bind(event.classification.is_excluded)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            for market in &event.markets {
                let outcomes = serde_json::to_string(&market.outcomes)?;
                let prices = serde_json::to_string(&market.outcome_prices)?;

                sqlx::query(
                    r#"
                    INSERT INTO markets (
                        id, event_id, question, description, end_date, active,
                        volume, volume24hr, liquidity, outcomes, outcome_prices,
                        open_interest, best_bid, best_ask, created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(id) DO UPDATE SET
                        event_id = excluded.event_id,
                        question = excluded.question,
                        description = excluded.description,
                        end_date = excluded.end_date,
                        active = excluded.active,
                        volume = excluded.volume,
                        volume24hr = excluded.volume24hr,
                        liquidity = excluded.liquidity,
                        outcomes = excluded.outcomes,
                        outcome_prices = excluded.outcome_prices,
                        open_interest = excluded.open_interest,
                        best_bid = excluded.best_bid,
                        best_ask = excluded.best_ask,
                        updated_at = excluded.updated_at
                    "#,
                )
                .bind(&market.id)
                .bind(&event.id)
                .bind(&market.question)
                .bind(&market.description)
                .bind(&market.end_date)
                .bind(market.active)
                .bind(market.volume)
                .bind(market.volume_24hr)
                .bind(market.liquidity)
                .bind(outcomes)
                .bind(prices)
                .bind(market.open_interest)
                .bind(market.best_bid)
                .bind(market.best_ask)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                markets += 1;
            }

            tx.commit().await?;
        }

        info!(events = events.len(), markets, "Saved snapshot");
        Ok(events.len())
    }

    /// Active stored events by volume descending, each with its markets.
    pub async fn fetch_stored_snapshot(&self) -> Result<Snapshot> {
        let event_rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT id, title, description, category, end_date, resolution_source, active,
                   volume, volume24hr, liquidity, liquidity_clob,
                   is_financial, is_crypto, is_big_event, is_excluded
            FROM events
            WHERE active = 1
            ORDER BY volume DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let market_rows: Vec<MarketRow> = sqlx::query_as(
            r#"
            SELECT m.id, m.event_id, m.question, m.description, m.end_date, m.active,
                   m.volume, m.volume24hr, m.liquidity, m.outcomes, m.outcome_prices,
                   m.open_interest, m.best_bid, m.best_ask
            FROM markets m
            JOIN events e ON e.id = m.event_id
            WHERE e.active = 1
            ORDER BY m.rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut markets_by_event: HashMap<String, Vec<Market>> = HashMap::new();
        for row in market_rows {
            markets_by_event
                .entry(row.event_id.clone())
                .or_default()
                .push(market_from_row(row));
        }

        let events = event_rows
            .into_iter()
            .map(|row| {
                let markets = markets_by_event.remove(&row.id).unwrap_or_default();
                event_from_row(row, markets)
            })
            .collect();

        Ok(Snapshot::new(events))
    }

    pub async fn record_sync(&self, summary: &SyncSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_log (
                total_events, financial_events, crypto_events, politics_war_events,
                total_volume, total_liquidity, synced_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(summary.total_events as i64)
        .bind(summary.financial_events as i64)
        .bind(summary.crypto_events as i64)
        .bind(summary.politics_war_events as i64)
        .bind(summary.total_volume)
        .bind(summary.total_liquidity)
        .bind(now_ns())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn event_from_row(row: EventRow, markets: Vec<Market>) -> Event {
    Event {
        id: row.id,
        title: row.title,
        description: row.description.unwrap_or_default(),
        category: row.category,
        end_date: row.end_date,
        resolution_source: row.resolution_source,
        active: row.active,
        volume: row.volume.unwrap_or(0.0),
        volume_24hr: row.volume24hr.unwrap_or(0.0),
        liquidity: row.liquidity.unwrap_or(0.0),
        liquidity_clob: row.liquidity_clob.unwrap_or(0.0),
        markets,
        classification: ClassificationResult {
            is_financial: row.is_financial,
            is_crypto: row.is_crypto,
            is_big_event: row.is_big_event,
            is_excluded: row.is_excluded,
            is_relevant: !row.is_excluded,
        },
    }
}

/// Stored JSON columns go through the same coercion as upstream payloads.
fn market_from_row(row: MarketRow) -> Market {
    let outcomes = row.outcomes.map(Value::String);
    let prices = row.outcome_prices.map(Value::String);
    Market {
        id: row.id,
        event_id: row.event_id,
        question: row.question,
        description: row.description,
        end_date: row.end_date,
        active: row.active,
        volume: row.volume.unwrap_or(0.0),
        volume_24hr: row.volume24hr.unwrap_or(0.0),
        liquidity: row.liquidity.unwrap_or(0.0),
        outcomes: parse_string_list(outcomes.as_ref()),
        outcome_prices: parse_outcome_prices(prices.as_ref()),
        open_interest: row.open_interest,
        best_bid: row.best_bid,
        best_ask: row.best_ask,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::db::Store;

    fn market(id: &str, event_id: &str) -> Market {
        Market {
            id: id.to_string(),
            event_id: event_id.to_string(),
            question: format!("{id}?"),
            description: None,
            end_date: None,
            active: true,
            volume: 6_000_000.0,
            volume_24hr: 5_500_000.0,
            liquidity: 10_000.0,
            outcomes: vec!["Yes".to_string(), "No".to_string()],
            outcome_prices: BTreeMap::from([("0".to_string(), 0.3), ("1".to_string(), 0.7)]),
            open_interest: Some(1_000.0),
            best_bid: None,
            best_ask: Some(0.31),
        }
    }

    fn event(id: &str, volume: f64, markets: Vec<Market>) -> Event {
        Event {
            id: id.to_string(),
            title: format!("Event {id}"),
            description: "desc".to_string(),
            category: Some("Crypto".to_string()),
            end_date: None,
            resolution_source: None,
            active: true,
            volume,
            volume_24hr: 1.0,
            liquidity: 2.0,
            liquidity_clob: 3.0,
            markets,
            classification: ClassificationResult {
                is_crypto: true,
                is_relevant: true,
                ..ClassificationResult::default()
            },
        }
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_store() {
        let store = Store::in_memory().await;
        let snapshots = store.snapshots();
        let events = vec![
            event("small", 6_000_000.0, vec![market("m2", "small")]),
            event("big", 9_000_000.0, vec![market("m1", "big"), market("m3", "big")]),
        ];
        snapshots.save_snapshot(&events).await.expect("save");

        let stored = snapshots.fetch_stored_snapshot().await.expect("load");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored.events()[0].id, "big");
        assert_eq!(stored.events()[0].markets.len(), 2);
        assert_eq!(stored.events()[0], events[1]);
    }

    #[tokio::test]
    async fn resaving_overwrites_and_skips_inactive_on_load() {
        let store = Store::in_memory().await;
        let snapshots = store.snapshots();
        snapshots.save_snapshot(&[event("e", 6_000_000.0, vec![])]).await.expect("save");

        let mut updated = event("e", 7_000_000.0, vec![]);
        updated.active = false;
        snapshots.save_snapshot(&[updated]).await.expect("resave");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(store.pool())
            .await
            .expect("count");
        assert_eq!(count, 1);
        assert!(snapshots.fetch_stored_snapshot().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn malformed_stored_prices_become_empty() {
        let store = Store::in_memory().await;
        let snapshots = store.snapshots();
        snapshots.save_snapshot(&[event("e", 6_000_000.0, vec![market("m", "e")])]).await.expect("save");
        sqlx::query("UPDATE markets SET outcome_prices = 'garbage' WHERE id = 'm'")
            .execute(store.pool())
            .await
            .expect("corrupt");

        let stored = snapshots.fetch_stored_snapshot().await.expect("load");
        assert!(stored.events()[0].markets[0].outcome_prices.is_empty());
    }

    #[tokio::test]
    async fn sync_summary_is_appended() {
        let store = Store::in_memory().await;
        let summary = SyncSummary { total_events: 3, crypto_events: 1, ..SyncSummary::default() };
        store.snapshots().record_sync(&summary).await.expect("first");
        store.snapshots().record_sync(&summary).await.expect("second");
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_log")
            .fetch_one(store.pool())
            .await
            .expect("count");
        assert_eq!(count, 2);
    }
}
